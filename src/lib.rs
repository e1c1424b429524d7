// Crate root library declaration and module exports.
pub mod cache;
pub mod client;
pub mod config;
pub mod context;
pub mod error;
pub mod model;
pub mod storage;
pub mod workflow;
