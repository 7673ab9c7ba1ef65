// Token authorization

pub mod audit_logger;
pub mod auth_middleware;
pub mod claims;
pub mod engine;
pub mod jwks;
pub mod scopes;
pub mod validator;
