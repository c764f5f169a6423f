//! Core engine for vdoc.
//!
//! Composite documents (Markdown, Quarto, R Markdown) embed fenced blocks of
//! other languages. This crate turns those blocks into standalone virtual
//! documents that an ordinary language backend can analyze, and maps
//! positions between the two coordinate spaces.
//!
//! # Architecture
//!
//! vdoc-core defines:
//! - **Traits**: `CodeBlock`, `Tokenizer` (document parsing) and `HostEditor`
//!   (document operations on the editor side)
//! - **Projection**: `LanguageRegistry`, block location, `project`, position mapping
//! - **Backing cache**: `ProjectionCache`, which decides between in-memory
//!   addresses, one live file per extension, and request-scoped files
//! - **Error Types**: `VdocError`
//!
//! # Examples
//!
//! ```no_run
//! use vdoc_core::{
//!     ActionKind, CacheOptions, CodeBlock, CompositeDocument, HostEditor, LanguageRegistry,
//!     ProjectionCache, project_virtual_document, to_virtual, with_handle,
//! };
//! use std::sync::Arc;
//! use tower_lsp_server::ls_types::{Position, Uri};
//!
//! # async fn example<B: CodeBlock>(host: Arc<dyn HostEditor>, tokens: Vec<B>) -> vdoc_core::Result<()> {
//! let registry = LanguageRegistry::builtin();
//! let cache = ProjectionCache::new(host, CacheOptions::default());
//!
//! let uri = Uri::from_file_path("/project/report.qmd").unwrap();
//! let document = CompositeDocument::new(uri.clone(), "```{python}\nimport os\n```\n");
//! let position = Position::new(1, 9);
//!
//! if let Some(vdoc) = project_virtual_document(&document, position, &tokens, &registry, None) {
//!     let handle = cache.resolve(&vdoc, &uri, ActionKind::Completion).await?;
//!     let at = to_virtual(&vdoc.language, position);
//!     with_handle(handle, |address| async move {
//!         // ask the python backend for completions at `at` in `address`
//!         let _ = (address, at);
//!     })
//!     .await;
//! }
//! # Ok(())
//! # }
//! ```

pub mod action;
pub mod block;
pub mod cache;
pub mod document;
pub mod error;
pub mod handle;
pub mod host;
pub mod language;
pub mod locator;
pub mod position;
pub mod projector;
pub mod storage;

#[cfg(test)]
pub(crate) mod test_utils;

// Re-export commonly used types
pub use action::ActionKind;
pub use block::{CodeBlock, Tokenizer};
pub use cache::{CacheOptions, CacheStats, EMBEDDED_SCHEME, ProjectionCache, content_uri};
pub use document::{CompositeDocument, local_path};
pub use error::{Result, VdocError};
pub use handle::{Cleanup, VirtualDocumentAddress, VirtualDocumentHandle, with_handle};
pub use host::{DocumentRef, HostEditor};
pub use language::{BackingKind, EmbeddedLanguage, LanguageRegistry};
pub use locator::{dominant_language, language_at, language_of, locate_all, locate_at};
pub use position::{to_composite, to_composite_range, to_virtual, to_virtual_range};
pub use projector::{
    TRAILING_PADDING_LINES, VirtualDocument, project, project_block, project_virtual_document,
};
pub use storage::VirtualDocStorage;
