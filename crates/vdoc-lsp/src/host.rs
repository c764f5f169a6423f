//! Filesystem-backed [`HostEditor`].
//!
//! The server has no editor buffers of its own: a live virtual document is a
//! file on disk that the server tracks as open until the client reports it
//! closed or the file disappears. Warm-up probes are forwarded to the client
//! as a `vdoc/warmup` request, and the client pokes the relevant backend.

use async_trait::async_trait;
use dashmap::DashSet;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tower_lsp_server::Client;
use tower_lsp_server::ls_types::request::Request;
use tower_lsp_server::ls_types::{Position, Uri};
use vdoc_core::{DocumentRef, HostEditor, Result, VdocError};

/// Parameters of the `vdoc/warmup` client request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarmupParams {
    pub uri: Uri,
    pub position: Position,
}

/// Server → client request asking the client to issue a harmless request
/// against a freshly opened virtual document.
#[derive(Debug)]
pub enum WarmupRequest {}

impl Request for WarmupRequest {
    type Params = WarmupParams;
    type Result = serde_json::Value;
    const METHOD: &'static str = "vdoc/warmup";
}

pub struct FsHost {
    client: Option<Client>,
    open: DashSet<PathBuf>,
    probe_timeout: Duration,
}

impl FsHost {
    pub fn new(client: Option<Client>, probe_timeout: Duration) -> Self {
        Self {
            client,
            open: DashSet::new(),
            probe_timeout,
        }
    }

    /// Stops tracking `path` as open. The next resolution for its extension
    /// reopens it.
    pub fn mark_closed(&self, path: &Path) -> bool {
        self.open.remove(path).is_some()
    }

    pub fn is_tracked(&self, path: &Path) -> bool {
        self.open.contains(path)
    }

    pub fn tracked_count(&self) -> usize {
        self.open.len()
    }
}

#[async_trait]
impl HostEditor for FsHost {
    async fn open_document(&self, path: &Path) -> Result<DocumentRef> {
        tokio::fs::metadata(path)
            .await
            .map_err(|e| VdocError::backing_io(path, e))?;
        let uri = Uri::from_file_path(path)
            .ok_or_else(|| VdocError::InvalidUri(path.display().to_string()))?;

        self.open.insert(path.to_path_buf());
        tracing::debug!("tracking virtual document {}", path.display());
        Ok(DocumentRef::new(uri, path))
    }

    async fn is_closed(&self, document: &DocumentRef) -> bool {
        if !self.open.contains(&document.path) {
            return true;
        }
        !tokio::fs::try_exists(&document.path).await.unwrap_or(false)
    }

    async fn replace_all(&self, document: &DocumentRef, content: &str) -> Result<()> {
        tokio::fs::write(&document.path, content)
            .await
            .map_err(|e| VdocError::backing_io(&document.path, e))
    }

    async fn save(&self, document: &DocumentRef) -> Result<()> {
        let file = tokio::fs::File::open(&document.path)
            .await
            .map_err(|e| VdocError::backing_io(&document.path, e))?;
        file.sync_all()
            .await
            .map_err(|e| VdocError::backing_io(&document.path, e))
    }

    async fn delete_file(&self, path: &Path) -> Result<()> {
        self.open.remove(path);
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("{} already gone", path.display());
                Ok(())
            }
            Err(e) => Err(VdocError::backing_io(path, e)),
        }
    }

    async fn probe(&self, uri: &Uri, position: Position) -> Result<()> {
        let Some(client) = &self.client else {
            return Ok(());
        };

        let request = client.send_request::<WarmupRequest>(WarmupParams {
            uri: uri.clone(),
            position,
        });

        match tokio::time::timeout(self.probe_timeout, request).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(VdocError::Host(format!("warm-up request failed: {}", e))),
            Err(_) => Err(VdocError::Host(format!(
                "warm-up request timed out after {:?}",
                self.probe_timeout
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn host() -> FsHost {
        FsHost::new(None, Duration::from_millis(10))
    }

    #[tokio::test]
    async fn test_open_tracks_existing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("intellisense.py");
        tokio::fs::write(&path, "x = 1\n").await.unwrap();

        let host = host();
        let doc = host.open_document(&path).await.unwrap();

        assert_eq!(doc.path, path);
        assert!(host.is_tracked(&path));
        assert!(!host.is_closed(&doc).await);
    }

    #[tokio::test]
    async fn test_open_missing_file_fails() {
        let host = host();
        let err = host
            .open_document(Path::new("/no/such/intellisense.py"))
            .await
            .unwrap_err();
        assert!(err.is_user_visible());
    }

    #[tokio::test]
    async fn test_closed_when_untracked_or_deleted() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("intellisense.r");
        tokio::fs::write(&path, "x <- 1\n").await.unwrap();

        let host = host();
        let doc = host.open_document(&path).await.unwrap();

        assert!(host.mark_closed(&path));
        assert!(host.is_closed(&doc).await);

        let doc = host.open_document(&path).await.unwrap();
        tokio::fs::remove_file(&path).await.unwrap();
        assert!(host.is_closed(&doc).await);
    }

    #[tokio::test]
    async fn test_replace_and_save() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("intellisense.jl");
        tokio::fs::write(&path, "a = 1\n").await.unwrap();

        let host = host();
        let doc = host.open_document(&path).await.unwrap();
        host.replace_all(&doc, "a = 2\n").await.unwrap();
        host.save(&doc).await.unwrap();

        assert_eq!(tokio::fs::read_to_string(&path).await.unwrap(), "a = 2\n");
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".vdoc.abc.py");
        tokio::fs::write(&path, "").await.unwrap();

        let host = host();
        host.open_document(&path).await.unwrap();
        host.delete_file(&path).await.unwrap();
        host.delete_file(&path).await.unwrap();

        assert!(!path.exists());
        assert_eq!(host.tracked_count(), 0);
    }

    #[test]
    fn test_probe_without_client_is_noop() {
        let host = host();
        let uri = Uri::from_file_path("/tmp/intellisense.py").unwrap();
        let result = tokio_test::block_on(host.probe(&uri, Position::new(0, 0)));
        assert!(result.is_ok());
    }

    #[test]
    fn test_warmup_params_serialization() {
        let params = WarmupParams {
            uri: "file:///tmp/intellisense.py".parse().unwrap(),
            position: Position::new(0, 0),
        };
        let json = serde_json::to_value(&params).unwrap();
        assert_eq!(json["uri"], "file:///tmp/intellisense.py");
        assert_eq!(json["position"]["line"], 0);
        assert_eq!(WarmupRequest::METHOD, "vdoc/warmup");
    }
}
