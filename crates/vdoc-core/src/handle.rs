//! Handles to resolved virtual documents and their cleanup.

use crate::error::Result;
use futures::FutureExt;
use futures::future::BoxFuture;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::path::Path;
use tower_lsp_server::ls_types::Uri;

/// Where a backend can find a virtual document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VirtualDocumentAddress {
    /// In-memory buffer, addressed by a synthetic URI.
    Content(Uri),
    /// Real file on disk.
    File { uri: Uri, path: std::path::PathBuf },
}

impl VirtualDocumentAddress {
    pub fn uri(&self) -> &Uri {
        match self {
            Self::Content(uri) | Self::File { uri, .. } => uri,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Content(_) => None,
            Self::File { path, .. } => Some(path),
        }
    }
}

/// One-shot asynchronous release action.
pub type Cleanup = Box<dyn FnOnce() -> BoxFuture<'static, Result<()>> + Send + Sync>;

/// A resolved virtual document, possibly owning a transient file.
///
/// When [`cleanup`](Self::has_cleanup) is present it must run exactly once:
/// through [`release`](Self::release), [`with_handle`], or, as a last
/// resort, on drop.
pub struct VirtualDocumentHandle {
    address: VirtualDocumentAddress,
    cleanup: Option<Cleanup>,
}

impl VirtualDocumentHandle {
    pub fn new(address: VirtualDocumentAddress) -> Self {
        Self {
            address,
            cleanup: None,
        }
    }

    pub fn with_cleanup(address: VirtualDocumentAddress, cleanup: Cleanup) -> Self {
        Self {
            address,
            cleanup: Some(cleanup),
        }
    }

    pub fn address(&self) -> &VirtualDocumentAddress {
        &self.address
    }

    pub fn uri(&self) -> &Uri {
        self.address.uri()
    }

    pub fn has_cleanup(&self) -> bool {
        self.cleanup.is_some()
    }

    /// Runs the pending cleanup, if any, and consumes the handle.
    pub async fn release(mut self) -> Result<()> {
        match self.cleanup.take() {
            Some(cleanup) => cleanup().await,
            None => Ok(()),
        }
    }
}

impl fmt::Debug for VirtualDocumentHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VirtualDocumentHandle")
            .field("address", &self.address)
            .field("has_cleanup", &self.cleanup.is_some())
            .finish()
    }
}

impl Drop for VirtualDocumentHandle {
    fn drop(&mut self) {
        let Some(cleanup) = self.cleanup.take() else {
            return;
        };

        tracing::warn!(
            "virtual document {:?} dropped without release, cleaning up in background",
            self.address.uri()
        );

        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(async move {
                    if let Err(e) = cleanup().await {
                        tracing::warn!("background cleanup failed: {}", e);
                    }
                });
            }
            Err(_) => {
                tracing::warn!("no runtime available, transient file left behind");
            }
        }
    }
}

/// Runs `f` against the handle's address, then runs the handle's cleanup.
///
/// The cleanup runs whether `f` completes or panics; a panic is resumed
/// once cleanup has finished. Cleanup failures are logged, not returned.
pub async fn with_handle<F, Fut, R>(mut handle: VirtualDocumentHandle, f: F) -> R
where
    F: FnOnce(VirtualDocumentAddress) -> Fut,
    Fut: Future<Output = R>,
{
    let cleanup = handle.cleanup.take();
    let address = handle.address.clone();

    let outcome = AssertUnwindSafe(async move { f(address).await })
        .catch_unwind()
        .await;

    if let Some(cleanup) = cleanup
        && let Err(e) = cleanup().await
    {
        tracing::warn!("failed to clean up {:?}: {}", handle.uri(), e);
    }

    match outcome {
        Ok(value) => value,
        Err(payload) => std::panic::resume_unwind(payload),
    }
}
