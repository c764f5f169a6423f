pub mod commands;
pub mod config;
pub mod document;
pub mod error;
pub mod host;
pub mod server;

// Re-export commonly used types
pub use error::{Result, ServerError};
pub use server::Backend;
