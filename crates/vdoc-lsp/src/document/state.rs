use crate::config::{DocumentsConfig, VdocConfig};
use crate::host::FsHost;
use dashmap::DashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;
use tower_lsp_server::Client;
use tower_lsp_server::ls_types::Uri;
use vdoc_core::{CompositeDocument, LanguageRegistry, ProjectionCache, Tokenizer, VirtualDocumentHandle};
use vdoc_markdown::{FencedBlock, MarkdownTokenizer};

/// State for a single open composite document.
///
/// Holds the text snapshot and its tokenized fenced blocks. Both are
/// replaced wholesale on every change (full document sync).
#[derive(Debug, Clone)]
pub struct DocumentState {
    pub document: CompositeDocument,
    pub blocks: Vec<FencedBlock>,
    pub version: Option<i32>,
}

impl DocumentState {
    pub fn new(
        uri: Uri,
        text: String,
        version: Option<i32>,
        tokenizer: &MarkdownTokenizer,
    ) -> Self {
        let blocks = tokenizer.parse(&text);
        Self {
            document: CompositeDocument::new(uri, text),
            blocks,
            version,
        }
    }
}

/// Everything derived from configuration: language table, tokenizer and the
/// projection cache with its filesystem host.
///
/// Replaced as a unit when the client sends initialization options.
pub struct Engine {
    pub registry: LanguageRegistry,
    pub tokenizer: MarkdownTokenizer,
    pub cache: ProjectionCache,
    pub host: Arc<FsHost>,
    pub documents: DocumentsConfig,
}

impl Engine {
    pub fn new(config: &VdocConfig, client: Option<Client>) -> Self {
        let host = Arc::new(FsHost::new(
            client,
            Duration::from_millis(config.warmup.timeout_ms),
        ));
        let cache = ProjectionCache::new(host.clone(), config.cache_options());

        Self {
            registry: LanguageRegistry::with_overrides(config.languages.iter().cloned()),
            tokenizer: MarkdownTokenizer::new(config.documents.markdown),
            cache,
            host,
            documents: config.documents.clone(),
        }
    }
}

/// Global LSP server state.
///
/// Shared across all LSP handlers via `Arc`; uses concurrent maps so
/// handlers never hold a lock across an await.
///
/// # Examples
///
/// ```
/// use vdoc_lsp::document::ServerState;
///
/// let state = ServerState::new(None);
/// assert_eq!(state.document_count(), 0);
/// ```
pub struct ServerState {
    /// Open composite documents by URI
    pub documents: DashMap<Uri, DocumentState>,
    engine: RwLock<Arc<Engine>>,
    /// Request-scoped virtual documents awaiting `vdoc.release`, with the
    /// composite document they were projected from
    pending: DashMap<u64, (Uri, VirtualDocumentHandle)>,
    next_handle_id: AtomicU64,
}

impl ServerState {
    /// Creates server state with the default configuration.
    pub fn new(client: Option<Client>) -> Self {
        Self::with_engine(Engine::new(&VdocConfig::default(), client))
    }

    pub fn with_engine(engine: Engine) -> Self {
        Self {
            documents: DashMap::new(),
            engine: RwLock::new(Arc::new(engine)),
            pending: DashMap::new(),
            next_handle_id: AtomicU64::new(1),
        }
    }

    pub async fn engine(&self) -> Arc<Engine> {
        Arc::clone(&*self.engine.read().await)
    }

    /// Installs a new engine, retiring the live documents of the old one.
    pub async fn replace_engine(&self, engine: Engine) {
        let old = {
            let mut guard = self.engine.write().await;
            std::mem::replace(&mut *guard, Arc::new(engine))
        };
        old.cache.deactivate().await;
    }

    pub fn get_document_clone(&self, uri: &Uri) -> Option<DocumentState> {
        self.documents.get(uri).map(|doc| doc.clone())
    }

    pub fn update_document(&self, uri: Uri, state: DocumentState) {
        self.documents.insert(uri, state);
    }

    pub fn remove_document(&self, uri: &Uri) -> Option<(Uri, DocumentState)> {
        self.documents.remove(uri)
    }

    pub fn document_count(&self) -> usize {
        self.documents.len()
    }

    /// Parks a handle until the client releases it and returns its id.
    pub fn park_handle(&self, parent: Uri, handle: VirtualDocumentHandle) -> u64 {
        let id = self.next_handle_id.fetch_add(1, Ordering::Relaxed);
        self.pending.insert(id, (parent, handle));
        id
    }

    pub fn take_handle(&self, id: u64) -> Option<VirtualDocumentHandle> {
        self.pending.remove(&id).map(|(_, (_, handle))| handle)
    }

    /// Releases the parked handles projected from `parent`.
    pub async fn release_handles_of(&self, parent: &Uri) -> usize {
        let ids: Vec<u64> = self
            .pending
            .iter()
            .filter(|e| &e.value().0 == parent)
            .map(|e| *e.key())
            .collect();

        let mut released = 0;
        for id in ids {
            let Some(handle) = self.take_handle(id) else {
                continue;
            };
            match handle.release().await {
                Ok(()) => released += 1,
                Err(e) => tracing::warn!("failed to release virtual document {}: {}", id, e),
            }
        }
        released
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Releases every parked handle and deactivates the cache.
    pub async fn shutdown(&self) {
        let ids: Vec<u64> = self.pending.iter().map(|e| *e.key()).collect();
        for id in ids {
            if let Some(handle) = self.take_handle(id)
                && let Err(e) = handle.release().await
            {
                tracing::warn!("failed to release virtual document {}: {}", id, e);
            }
        }
        self.engine().await.cache.deactivate().await;
    }
}
