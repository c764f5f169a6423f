//! Host editor collaborator.
//!
//! The cache never touches editor state directly. Opening, editing, saving
//! and deleting backing documents all go through [`HostEditor`], which lets
//! the language server back it with the filesystem and the LSP client, and
//! lets tests record every call.

use crate::error::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tower_lsp_server::ls_types::{Position, Uri};

/// A document opened in the host editor.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentRef {
    pub uri: Uri,
    pub path: PathBuf,
}

impl DocumentRef {
    pub fn new(uri: Uri, path: impl Into<PathBuf>) -> Self {
        Self {
            uri,
            path: path.into(),
        }
    }
}

/// Document operations the cache needs from the host editor.
///
/// Implementations must be safe to call concurrently; the cache serializes
/// calls per language extension but not across extensions.
#[async_trait]
pub trait HostEditor: Send + Sync {
    /// Opens the file at `path` (already written to disk) as a document.
    async fn open_document(&self, path: &Path) -> Result<DocumentRef>;

    /// Returns `true` if the document was closed behind the cache's back.
    async fn is_closed(&self, document: &DocumentRef) -> bool;

    /// Replaces the full document text in one edit.
    async fn replace_all(&self, document: &DocumentRef, content: &str) -> Result<()>;

    async fn save(&self, document: &DocumentRef) -> Result<()>;

    async fn delete_file(&self, path: &Path) -> Result<()>;

    /// Issues a harmless request against a freshly opened document so the
    /// backend finishes initializing before the first real request.
    async fn probe(&self, uri: &Uri, position: Position) -> Result<()>;
}
