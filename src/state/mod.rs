// Shared state backends

pub mod image_store;
pub mod key_set_cache;
pub mod user_alias_store;
pub mod user_image_store;
