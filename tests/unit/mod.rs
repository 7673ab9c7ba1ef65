// Unit tests organized by module

#[path = "../common/mod.rs"]
mod common;

mod test_engine;
mod test_jwks_client;
mod test_validator;
