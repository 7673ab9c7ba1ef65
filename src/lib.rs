// Library root for the gacha API

pub mod api;
pub mod auth;
pub mod config;
pub mod core;
pub mod state;
