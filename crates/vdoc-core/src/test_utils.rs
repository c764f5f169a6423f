//! Test doubles shared by the unit tests of this crate.

use crate::block::CodeBlock;
use crate::document::CompositeDocument;
use crate::error::{Result, VdocError};
use crate::host::{DocumentRef, HostEditor};
use async_trait::async_trait;
use std::collections::HashSet;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicBool, Ordering};
use tower_lsp_server::ls_types::{Position, Uri};

/// Hand-built tokenizer output.
#[derive(Debug, Clone)]
pub struct TestBlock {
    range: Range<usize>,
    executable: bool,
    language: Option<String>,
}

impl TestBlock {
    /// Executable block in `language`.
    pub fn code(range: Range<usize>, language: &str) -> Self {
        Self {
            range,
            executable: true,
            language: Some(language.to_string()),
        }
    }

    /// Non-executable block that still names a language (e.g. `{=html}`).
    pub fn raw(range: Range<usize>, language: &str) -> Self {
        Self {
            range,
            executable: false,
            language: Some(language.to_string()),
        }
    }

    /// Any other token (paragraph, heading, front matter).
    pub fn other(range: Range<usize>) -> Self {
        Self {
            range,
            executable: false,
            language: None,
        }
    }
}

impl CodeBlock for TestBlock {
    fn line_range(&self) -> Range<usize> {
        self.range.clone()
    }

    fn is_executable(&self) -> bool {
        self.executable
    }

    fn language_name(&self) -> Option<&str> {
        self.language.as_deref()
    }
}

pub fn test_document(text: &str) -> CompositeDocument {
    CompositeDocument::new(Uri::from_file_path("/test/doc.qmd").unwrap(), text)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostCall {
    Open(PathBuf),
    ReplaceAll(PathBuf, String),
    Save(PathBuf),
    Delete(PathBuf),
    Probe(Uri),
}

/// `HostEditor` that performs real file operations and records each call.
#[derive(Debug, Default)]
pub struct RecordingHost {
    calls: Mutex<Vec<HostCall>>,
    open: Mutex<HashSet<PathBuf>>,
    failing_deletes: Mutex<HashSet<PathBuf>>,
    fail_opens: AtomicBool,
    fail_probes: AtomicBool,
    open_gate: Mutex<Option<Arc<tokio::sync::Semaphore>>>,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<HostCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Simulates the user closing the document.
    pub fn close(&self, path: &Path) {
        self.open.lock().unwrap().remove(path);
    }

    pub fn is_closed_path(&self, path: &Path) -> bool {
        !self.open.lock().unwrap().contains(path)
    }

    pub fn fail_opens(&self) {
        self.fail_opens.store(true, Ordering::SeqCst);
    }

    pub fn fail_probes(&self) {
        self.fail_probes.store(true, Ordering::SeqCst);
    }

    pub fn fail_delete_of(&self, path: &Path) {
        self.failing_deletes
            .lock()
            .unwrap()
            .insert(path.to_path_buf());
    }

    /// Makes `open_document` wait for a permit on the returned semaphore.
    pub fn hold_opens(&self) -> Arc<tokio::sync::Semaphore> {
        let gate = Arc::new(tokio::sync::Semaphore::new(0));
        *self.open_gate.lock().unwrap() = Some(Arc::clone(&gate));
        gate
    }

    fn record(&self, call: HostCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl HostEditor for RecordingHost {
    async fn open_document(&self, path: &Path) -> Result<DocumentRef> {
        self.record(HostCall::Open(path.to_path_buf()));
        let gate = self.open_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            let _permit = gate.acquire().await.unwrap();
        }
        if self.fail_opens.load(Ordering::SeqCst) {
            return Err(VdocError::Host("open refused".into()));
        }
        self.open.lock().unwrap().insert(path.to_path_buf());
        let uri = Uri::from_file_path(path).unwrap();
        Ok(DocumentRef::new(uri, path))
    }

    async fn is_closed(&self, document: &DocumentRef) -> bool {
        self.is_closed_path(&document.path)
    }

    async fn replace_all(&self, document: &DocumentRef, content: &str) -> Result<()> {
        self.record(HostCall::ReplaceAll(
            document.path.clone(),
            content.to_string(),
        ));
        tokio::fs::write(&document.path, content).await?;
        Ok(())
    }

    async fn save(&self, document: &DocumentRef) -> Result<()> {
        self.record(HostCall::Save(document.path.clone()));
        Ok(())
    }

    async fn delete_file(&self, path: &Path) -> Result<()> {
        self.record(HostCall::Delete(path.to_path_buf()));
        if self.failing_deletes.lock().unwrap().contains(path) {
            return Err(VdocError::Host("delete refused".into()));
        }
        self.open.lock().unwrap().remove(path);
        tokio::fs::remove_file(path).await?;
        Ok(())
    }

    async fn probe(&self, uri: &Uri, _position: Position) -> Result<()> {
        self.record(HostCall::Probe(uri.clone()));
        if self.fail_probes.load(Ordering::SeqCst) {
            return Err(VdocError::Host("backend not ready".into()));
        }
        Ok(())
    }
}
