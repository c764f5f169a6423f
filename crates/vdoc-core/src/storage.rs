//! On-disk layout for file-backed virtual documents.
//!
//! ```text
//! <root>/                    temp directory, removed recursively on drop
//!   <ext>/intellisense.<ext>  live cache file, one per extension
//!   <ext>/.vdoc.<rand>.<ext>  request-scoped files for non-file parents
//! ```

use crate::error::{Result, VdocError};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tokio::sync::OnceCell;

const ROOT_PREFIX: &str = "vdoc-";
const EPHEMERAL_PREFIX: &str = ".vdoc.";
const CANONICAL_STEM: &str = "intellisense";

/// Owner of the process-wide temporary root.
///
/// The root is created on first use, so content-only workloads never touch
/// the filesystem.
#[derive(Debug)]
pub struct VirtualDocStorage {
    base: Option<PathBuf>,
    root: OnceCell<TempDir>,
}

impl VirtualDocStorage {
    /// Creates storage rooted under `base`, or the system temp directory.
    pub fn new(base: Option<PathBuf>) -> Self {
        Self {
            base,
            root: OnceCell::new(),
        }
    }

    /// The root directory, if it has been created yet.
    pub fn root_path(&self) -> Option<&Path> {
        self.root.get().map(TempDir::path)
    }

    async fn root(&self) -> Result<&Path> {
        let dir = self
            .root
            .get_or_try_init(|| async {
                let mut builder = tempfile::Builder::new();
                builder.prefix(ROOT_PREFIX);

                let created = match &self.base {
                    Some(base) => {
                        tokio::fs::create_dir_all(base)
                            .await
                            .map_err(|e| VdocError::backing_io(base, e))?;
                        builder.tempdir_in(base)
                    }
                    None => builder.tempdir(),
                };

                let dir = created.map_err(|e| {
                    VdocError::backing_io(
                        self.base.clone().unwrap_or_else(std::env::temp_dir),
                        e,
                    )
                })?;
                tracing::debug!("created virtual document root at {}", dir.path().display());
                Ok::<_, VdocError>(dir)
            })
            .await?;
        Ok(dir.path())
    }

    /// `<root>/<ext>`, created on demand.
    pub async fn extension_dir(&self, extension: &str) -> Result<PathBuf> {
        let dir = self.root().await?.join(extension);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| VdocError::backing_io(&dir, e))?;
        Ok(dir)
    }

    /// `<root>/<ext>/intellisense.<ext>`: the only path a live cache entry
    /// for `extension` ever uses.
    pub async fn canonical_path(&self, extension: &str) -> Result<PathBuf> {
        Ok(self
            .extension_dir(extension)
            .await?
            .join(format!("{CANONICAL_STEM}.{extension}")))
    }

    /// Creates an empty, uniquely named `.vdoc.<rand>.<ext>` file.
    ///
    /// The file goes next to the composite document when `near` is given
    /// and is an absolute, writable directory, so tooling configured for
    /// that directory applies to it. Otherwise it goes in `<root>/<ext>`.
    pub async fn ephemeral_path(&self, extension: &str, near: Option<&Path>) -> Result<PathBuf> {
        if let Some(dir) = near.filter(|dir| dir.is_absolute()) {
            match create_unique(dir, extension).await {
                Ok(path) => return Ok(path),
                Err(e) => tracing::debug!(
                    "cannot create transient file in {}, using storage root: {}",
                    dir.display(),
                    e
                ),
            }
        }

        let dir = self.extension_dir(extension).await?;
        create_unique(&dir, extension)
            .await
            .map_err(|e| VdocError::backing_io(&dir, e))
    }
}

async fn create_unique(dir: &Path, extension: &str) -> std::io::Result<PathBuf> {
    let dir = dir.to_path_buf();
    let suffix = format!(".{extension}");

    tokio::task::spawn_blocking(move || {
        tempfile::Builder::new()
            .prefix(EPHEMERAL_PREFIX)
            .suffix(&suffix)
            .tempfile_in(&dir)?
            .into_temp_path()
            .keep()
            .map_err(|e| e.error)
    })
    .await
    .map_err(std::io::Error::other)?
}
