//! Core domain kernel.
//!
//! Error taxonomy, domain models and the business rules behind the HTTP
//! routes: aliases, the image catalog and the user image inventory.

pub mod errors;
pub mod image;
pub mod models;
pub mod user_alias;
pub mod user_image;
