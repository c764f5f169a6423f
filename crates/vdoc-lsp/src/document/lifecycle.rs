//! Document open/change/close handling.

use super::loader::load_document_from_disk;
use super::state::{DocumentState, ServerState};
use crate::error::Result;
use tower_lsp_server::ls_types::Uri;
use vdoc_core::local_path;

/// Tokenizes and stores a composite document.
///
/// Returns `false` (and stores nothing) when the URI's extension is not a
/// configured composite document extension.
pub async fn handle_document_open(
    state: &ServerState,
    uri: Uri,
    text: String,
    version: Option<i32>,
) -> bool {
    let engine = state.engine().await;
    if !engine.documents.accepts(&uri) {
        tracing::debug!("not a composite document: {:?}", uri);
        return false;
    }

    let doc = DocumentState::new(uri.clone(), text, version, &engine.tokenizer);
    tracing::debug!("tracking {:?} with {} fenced blocks", uri, doc.blocks.len());
    state.update_document(uri, doc);
    true
}

/// Full-sync change: re-tokenizes the new text.
pub async fn handle_document_change(
    state: &ServerState,
    uri: Uri,
    text: String,
    version: Option<i32>,
) -> bool {
    handle_document_open(state, uri, text, version).await
}

/// Forgets a composite document and releases its unreleased transient
/// files, or marks a live virtual document closed so the cache reopens it
/// on next use.
pub async fn handle_document_close(state: &ServerState, uri: &Uri) {
    if state.remove_document(uri).is_some() {
        let released = state.release_handles_of(uri).await;
        if released > 0 {
            tracing::debug!("released {} transient files of {:?}", released, uri);
        }
        return;
    }

    if let Some(path) = local_path(uri) {
        let engine = state.engine().await;
        if engine.host.mark_closed(&path) {
            tracing::debug!("virtual document closed by client: {:?}", uri);
        }
    }
}

/// Returns the document, loading it from disk when the client never opened
/// it.
pub async fn ensure_document_loaded(state: &ServerState, uri: &Uri) -> Result<DocumentState> {
    if let Some(doc) = state.get_document_clone(uri) {
        return Ok(doc);
    }

    tracing::info!("cold start: loading {:?} from disk", uri);
    let text = load_document_from_disk(uri).await?;
    let engine = state.engine().await;
    let doc = DocumentState::new(uri.clone(), text, None, &engine.tokenizer);
    state.update_document(uri.clone(), doc.clone());
    Ok(doc)
}
