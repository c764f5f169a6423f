//! Backing resolution and the per-extension live document cache.
//!
//! # Policy
//!
//! | backing               | action needs fresh file | result                                  |
//! |-----------------------|-------------------------|-----------------------------------------|
//! | `Content`             | any                     | synthetic `vdoc-embedded://` URI, no I/O |
//! | `File { reuse: false }` | yes                   | request-scoped file, deleted on release  |
//! | `File { .. }`         | otherwise               | live entry `<root>/<ext>/intellisense.<ext>` |
//!
//! A live entry is rewritten only when the projected content changed. Reuse
//! languages get an in-place edit of the open document; the others get the
//! file deleted and recreated. Every read and write of an entry happens
//! under that extension's async mutex.

use crate::action::ActionKind;
use crate::document::local_path;
use crate::error::{Result, VdocError};
use crate::handle::{Cleanup, VirtualDocumentAddress, VirtualDocumentHandle};
use crate::host::{DocumentRef, HostEditor};
use crate::language::BackingKind;
use crate::projector::VirtualDocument;
use crate::storage::VirtualDocStorage;
use dashmap::{DashMap, DashSet};
use futures::FutureExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;
use tower_lsp_server::ls_types::{Position, Uri};

/// URI scheme of content-backed virtual documents.
pub const EMBEDDED_SCHEME: &str = "vdoc-embedded";

/// Engine-side settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheOptions {
    /// Directory the temp root is created under (system temp dir if `None`).
    pub storage_root: Option<PathBuf>,
    /// Issue a warm-up probe the first time an extension is opened.
    pub warmup: bool,
    /// Also probe after a stale entry was re-opened.
    pub rewarm_after_self_heal: bool,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            storage_root: None,
            warmup: true,
            rewarm_after_self_heal: false,
        }
    }
}

/// Snapshot of cache operation counters.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    /// Live cache files written to disk (first open, self-heal, recreation).
    pub files_written: u64,
    pub in_place_updates: u64,
    pub recreations: u64,
    /// Resolutions answered from an unchanged live entry.
    pub short_circuits: u64,
    pub ephemeral_files: u64,
    pub probes: u64,
}

#[derive(Debug, Default)]
struct Counters {
    files_written: AtomicU64,
    in_place_updates: AtomicU64,
    recreations: AtomicU64,
    short_circuits: AtomicU64,
    ephemeral_files: AtomicU64,
    probes: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> CacheStats {
        CacheStats {
            files_written: self.files_written.load(Ordering::Relaxed),
            in_place_updates: self.in_place_updates.load(Ordering::Relaxed),
            recreations: self.recreations.load(Ordering::Relaxed),
            short_circuits: self.short_circuits.load(Ordering::Relaxed),
            ephemeral_files: self.ephemeral_files.load(Ordering::Relaxed),
            probes: self.probes.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug)]
struct LiveEntry {
    document: DocumentRef,
    last_content: String,
}

impl LiveEntry {
    fn handle(&self) -> VirtualDocumentHandle {
        VirtualDocumentHandle::new(VirtualDocumentAddress::File {
            uri: self.document.uri.clone(),
            path: self.document.path.clone(),
        })
    }
}

type Slot = Arc<Mutex<Option<LiveEntry>>>;

/// Resolves virtual documents to addresses a backend can consume.
///
/// Each instance owns its storage root and live entries, so several caches
/// (e.g. one per test) never share files.
pub struct ProjectionCache {
    host: Arc<dyn HostEditor>,
    storage: VirtualDocStorage,
    options: CacheOptions,
    slots: DashMap<String, Slot>,
    warmed: DashSet<String>,
    counters: Counters,
}

impl ProjectionCache {
    pub fn new(host: Arc<dyn HostEditor>, options: CacheOptions) -> Self {
        Self {
            host,
            storage: VirtualDocStorage::new(options.storage_root.clone()),
            options,
            slots: DashMap::new(),
            warmed: DashSet::new(),
            counters: Counters::default(),
        }
    }

    pub fn storage(&self) -> &VirtualDocStorage {
        &self.storage
    }

    pub fn stats(&self) -> CacheStats {
        self.counters.snapshot()
    }

    /// Extensions that currently have a live entry.
    pub async fn live_extensions(&self) -> Vec<String> {
        let slots: Vec<(String, Slot)> = self
            .slots
            .iter()
            .map(|e| (e.key().clone(), Arc::clone(e.value())))
            .collect();

        let mut live = Vec::new();
        for (extension, slot) in slots {
            if slot.lock().await.is_some() {
                live.push(extension);
            }
        }
        live.sort();
        live
    }

    /// Resolves `vdoc` to an address for `action`.
    ///
    /// `parent` is the composite document the projection came from. It names
    /// content-backed documents and decides where request-scoped files go.
    ///
    /// # Errors
    ///
    /// Returns [`VdocError::BackingIo`] when a backing file cannot be
    /// written, opened, edited, saved or deleted.
    pub async fn resolve(
        &self,
        vdoc: &VirtualDocument,
        parent: &Uri,
        action: ActionKind,
    ) -> Result<VirtualDocumentHandle> {
        let extension = vdoc.language.extension.as_str();

        match vdoc.language.backing {
            BackingKind::Content => {
                let uri = content_uri(extension, parent)?;
                Ok(VirtualDocumentHandle::new(VirtualDocumentAddress::Content(uri)))
            }
            BackingKind::File { reuse } if action.requires_fresh_file() && !reuse => {
                self.resolve_ephemeral(vdoc, parent).await
            }
            BackingKind::File { reuse } => self.resolve_live(vdoc, reuse).await,
        }
    }

    async fn resolve_ephemeral(
        &self,
        vdoc: &VirtualDocument,
        parent: &Uri,
    ) -> Result<VirtualDocumentHandle> {
        let extension = vdoc.language.extension.as_str();
        let near = local_path(parent).and_then(|path| path.parent().map(Path::to_path_buf));

        let path = self
            .storage
            .ephemeral_path(extension, near.as_deref())
            .await?;
        tokio::fs::write(&path, &vdoc.content)
            .await
            .map_err(|e| VdocError::backing_io(&path, e))?;
        let uri = file_uri(&path)?;

        Counters::bump(&self.counters.ephemeral_files);
        tracing::debug!("created transient {} file {}", extension, path.display());

        let host = Arc::clone(&self.host);
        let cleanup_path = path.clone();
        let cleanup: Cleanup = Box::new(move || {
            async move {
                host.delete_file(&cleanup_path)
                    .await
                    .map_err(|e| e.into_backing(&cleanup_path))
            }
            .boxed()
        });

        Ok(VirtualDocumentHandle::with_cleanup(
            VirtualDocumentAddress::File { uri, path },
            cleanup,
        ))
    }

    async fn resolve_live(&self, vdoc: &VirtualDocument, reuse: bool) -> Result<VirtualDocumentHandle> {
        let extension = vdoc.language.extension.as_str();
        let slot = self.slot(extension);
        let mut entry = slot.lock().await;

        let mut self_healed = false;
        if let Some(live) = entry.as_ref()
            && self.host.is_closed(&live.document).await
        {
            tracing::debug!(
                "live {} document {} was closed externally, reopening",
                extension,
                live.document.path.display()
            );
            *entry = None;
            self_healed = true;
        }

        if let Some(live) = entry.as_mut() {
            if live.last_content == vdoc.content {
                Counters::bump(&self.counters.short_circuits);
                tracing::trace!("{} content unchanged, reusing live entry", extension);
                return Ok(live.handle());
            }

            if reuse {
                let path = live.document.path.clone();
                self.host
                    .replace_all(&live.document, &vdoc.content)
                    .await
                    .map_err(|e| e.into_backing(&path))?;
                self.host
                    .save(&live.document)
                    .await
                    .map_err(|e| e.into_backing(&path))?;
                live.last_content.clone_from(&vdoc.content);

                Counters::bump(&self.counters.in_place_updates);
                tracing::debug!("updated live {} document in place", extension);
                return Ok(live.handle());
            }
        }

        if let Some(old) = entry.take() {
            tracing::debug!("recreating live {} document", extension);
            self.host
                .delete_file(&old.document.path)
                .await
                .map_err(|e| e.into_backing(&old.document.path))?;
            Counters::bump(&self.counters.recreations);
        }

        let live = self.open_live(extension, &vdoc.content, self_healed).await?;
        let handle = live.handle();
        *entry = Some(live);
        Ok(handle)
    }

    async fn open_live(&self, extension: &str, content: &str, self_healed: bool) -> Result<LiveEntry> {
        let path = self.storage.canonical_path(extension).await?;
        tokio::fs::write(&path, content)
            .await
            .map_err(|e| VdocError::backing_io(&path, e))?;
        Counters::bump(&self.counters.files_written);

        let document = self
            .host
            .open_document(&path)
            .await
            .map_err(|e| e.into_backing(&path))?;

        let first_open = self.warmed.insert(extension.to_string());
        let rewarm = self_healed && self.options.rewarm_after_self_heal;
        if self.options.warmup && (first_open || rewarm) {
            Counters::bump(&self.counters.probes);
            if let Err(e) = self.host.probe(&document.uri, Position::new(0, 0)).await {
                tracing::warn!("warm-up probe for {} failed: {}", extension, e);
            }
        }

        tracing::debug!("opened live {} document {}", extension, path.display());
        Ok(LiveEntry {
            document,
            last_content: content.to_string(),
        })
    }

    /// Deletes every live document and forgets all entries.
    ///
    /// Deletion is best-effort: a failing entry is logged and the sweep
    /// continues. Slots stay in the map so a request already waiting on one
    /// installs its entry where a later sweep finds it. The storage root
    /// itself lives until the cache is dropped.
    pub async fn deactivate(&self) {
        let slots: Vec<(String, Slot)> = self
            .slots
            .iter()
            .map(|e| (e.key().clone(), Arc::clone(e.value())))
            .collect();

        let mut removed = 0usize;
        for (extension, slot) in slots {
            let mut entry = slot.lock().await;
            let Some(live) = entry.take() else {
                continue;
            };
            match self.host.delete_file(&live.document.path).await {
                Ok(()) => removed += 1,
                Err(e) => tracing::warn!(
                    "failed to delete live {} document {}: {}",
                    extension,
                    live.document.path.display(),
                    e
                ),
            }
        }

        tracing::info!("deactivated projection cache, removed {} live documents", removed);
    }

    fn slot(&self, extension: &str) -> Slot {
        Arc::clone(
            self.slots
                .entry(extension.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(None)))
                .value(),
        )
    }
}

/// `vdoc-embedded://<ext>/<percent-encoded parent>.<ext>`
pub fn content_uri(extension: &str, parent: &Uri) -> Result<Uri> {
    let raw = format!(
        "{EMBEDDED_SCHEME}://{extension}/{}.{extension}",
        urlencoding::encode(parent.as_str())
    );
    raw.parse().map_err(|_| VdocError::InvalidUri(raw))
}

fn file_uri(path: &Path) -> Result<Uri> {
    Uri::from_file_path(path).ok_or_else(|| VdocError::InvalidUri(path.display().to_string()))
}
