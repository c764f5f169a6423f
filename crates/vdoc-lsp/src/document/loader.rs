//! Document loading from filesystem for cold start scenarios.
//!
//! A client may issue `vdoc.virtualDocument` for a composite document it
//! never sent `didOpen` for (e.g. the server restarted while the editor kept
//! the file open). Such documents are loaded from disk on demand.

use crate::error::{Result, ServerError};
use tower_lsp_server::ls_types::Uri;
use vdoc_core::{VdocError, local_path};

/// Maximum allowed file size in bytes (10MB).
const MAX_FILE_SIZE: u64 = 10_000_000;

/// Loads document content from disk.
///
/// # Errors
///
/// - `ServerError::UnknownDocument` - URI is not a file:// URI
/// - `VdocError::Io` - file missing, unreadable, too large or not UTF-8
pub async fn load_document_from_disk(uri: &Uri) -> Result<String> {
    let Some(path) = local_path(uri) else {
        tracing::debug!("Cannot load non-file URI: {:?}", uri);
        return Err(ServerError::UnknownDocument(uri.clone()));
    };

    tracing::debug!("Loading document from disk: {:?}", path);

    let metadata = tokio::fs::metadata(&path).await.map_err(VdocError::Io)?;
    if metadata.len() > MAX_FILE_SIZE {
        tracing::error!(
            "Document exceeds maximum size: {} bytes (limit: {} bytes)",
            metadata.len(),
            MAX_FILE_SIZE
        );
        return Err(VdocError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("file too large: {} bytes", metadata.len()),
        ))
        .into());
    }

    let content = tokio::fs::read_to_string(&path)
        .await
        .map_err(VdocError::Io)?;
    tracing::debug!("Loaded document: {:?} ({} bytes)", path, content.len());
    Ok(content)
}
