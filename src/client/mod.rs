// File: ./src/client/mod.rs
pub mod cert;
pub mod core;

pub use crate::client::core::ApiClient;
