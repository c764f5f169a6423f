//! Document management module.
//!
//! - `state`: composite document and server state
//! - `lifecycle`: open/change/close event handling
//! - `loader`: disk-based loading for cold start support

mod lifecycle;
mod loader;
mod state;

pub use lifecycle::{
    ensure_document_loaded, handle_document_change, handle_document_close, handle_document_open,
};
pub use loader::load_document_from_disk;
pub use state::{DocumentState, Engine, ServerState};
