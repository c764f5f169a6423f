use std::path::PathBuf;
use thiserror::Error;

/// Core error types for vdoc.
///
/// Only [`VdocError::BackingIo`] is meant to reach the user: it aborts the
/// action that needed an analysis buffer. Malformed block ranges, failed
/// warm-up probes and stale cache entries are recovered inside the engine
/// and never produce an error value.
///
/// # Examples
///
/// ```
/// use vdoc_core::error::{VdocError, Result};
/// use std::path::Path;
///
/// fn prepare(path: &Path) -> Result<()> {
///     std::fs::metadata(path).map_err(|source| VdocError::BackingIo {
///         path: path.to_path_buf(),
///         source,
///     })?;
///     Ok(())
/// }
///
/// let err = prepare(Path::new("/definitely/not/here")).unwrap_err();
/// assert!(err.to_string().starts_with("could not prepare analysis buffer"));
/// ```
#[derive(Error, Debug)]
pub enum VdocError {
    #[error("could not prepare analysis buffer at {}: {source}", path.display())]
    BackingIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("host editor error: {0}")]
    Host(String),

    #[error("unknown embedded language: {0}")]
    UnknownLanguage(String),

    #[error("invalid URI: {0}")]
    InvalidUri(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl VdocError {
    /// Wraps an I/O failure on a backing path.
    pub fn backing_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::BackingIo {
            path: path.into(),
            source,
        }
    }

    /// Re-labels a failure from a mutating backing operation as `BackingIo`.
    ///
    /// Host failures carry no `io::Error`, so one is synthesized with
    /// `ErrorKind::Other` around the host's message.
    pub(crate) fn into_backing(self, path: impl Into<PathBuf>) -> Self {
        match self {
            Self::BackingIo { .. } => self,
            Self::Io(source) => Self::backing_io(path, source),
            other => Self::backing_io(path, std::io::Error::other(other.to_string())),
        }
    }

    /// Returns `true` for errors that should be shown to the end user.
    pub fn is_user_visible(&self) -> bool {
        matches!(self, Self::BackingIo { .. })
    }
}

/// Convenience type alias for `Result<T, VdocError>`.
///
/// # Examples
///
/// ```
/// use vdoc_core::error::Result;
///
/// fn extension(name: &str) -> Result<&str> {
///     if name.is_empty() {
///         return Err(vdoc_core::error::VdocError::UnknownLanguage(name.into()));
///     }
///     Ok(name)
/// }
/// ```
pub type Result<T> = std::result::Result<T, VdocError>;
