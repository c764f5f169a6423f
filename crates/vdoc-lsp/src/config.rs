use serde::Deserialize;
use std::path::PathBuf;
use tower_lsp_server::ls_types::Uri;
use vdoc_core::{CacheOptions, EmbeddedLanguage};
use vdoc_markdown::MarkdownOptions;

/// Root configuration for the vdoc-lsp server.
///
/// Provided by the LSP client via initialization options. All fields use
/// sensible defaults if not specified.
///
/// # Examples
///
/// ```
/// use vdoc_lsp::config::VdocConfig;
///
/// let json = r##"{
///     "warmup": { "enabled": false },
///     "languages": [
///         { "ids": ["nim"], "extension": "nim", "backing": { "kind": "file" }, "filler_line": "#" }
///     ]
/// }"##;
///
/// let config: VdocConfig = serde_json::from_str(json).unwrap();
/// assert!(!config.warmup.enabled);
/// assert_eq!(config.languages[0].extension, "nim");
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
pub struct VdocConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub warmup: WarmupConfig,
    /// Extra or overriding embedded language descriptors.
    #[serde(default)]
    pub languages: Vec<EmbeddedLanguage>,
    #[serde(default)]
    pub documents: DocumentsConfig,
}

impl VdocConfig {
    /// The subset of settings the projection cache needs.
    pub fn cache_options(&self) -> CacheOptions {
        CacheOptions {
            storage_root: self.storage.root.clone(),
            warmup: self.warmup.enabled,
            rewarm_after_self_heal: self.warmup.rewarm_after_self_heal,
        }
    }
}

/// Where file-backed virtual documents live.
///
/// # Defaults
///
/// - `root`: `None` (system temp directory)
#[derive(Debug, Clone, Deserialize, Default)]
pub struct StorageConfig {
    #[serde(default)]
    pub root: Option<PathBuf>,
}

/// Cold-start warm-up of analysis backends.
///
/// # Defaults
///
/// - `enabled`: `true`
/// - `rewarm_after_self_heal`: `false`
/// - `timeout_ms`: `5000`
#[derive(Debug, Clone, Deserialize)]
pub struct WarmupConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Probe again when a live document had to be reopened after the user
    /// closed it.
    #[serde(default)]
    pub rewarm_after_self_heal: bool,
    /// How long to wait for the client to answer a `vdoc/warmup` request.
    #[serde(default = "default_warmup_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for WarmupConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            rewarm_after_self_heal: false,
            timeout_ms: default_warmup_timeout_ms(),
        }
    }
}

/// Which documents are treated as composite documents.
///
/// # Defaults
///
/// - `extensions`: `["qmd", "md", "rmd"]`
/// - `markdown.bare_fences_executable`: `true`
#[derive(Debug, Clone, Deserialize)]
pub struct DocumentsConfig {
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
    #[serde(default)]
    pub markdown: MarkdownOptions,
}

impl Default for DocumentsConfig {
    fn default() -> Self {
        Self {
            extensions: default_extensions(),
            markdown: MarkdownOptions::default(),
        }
    }
}

impl DocumentsConfig {
    /// Returns `true` if the URI's file extension is a configured composite
    /// document extension (case-insensitive).
    pub fn accepts(&self, uri: &Uri) -> bool {
        let path = uri.path();
        let Some(filename) = path.as_str().split('/').next_back() else {
            return false;
        };
        let Some((_, extension)) = filename.rsplit_once('.') else {
            return false;
        };
        self.extensions
            .iter()
            .any(|accepted| accepted.eq_ignore_ascii_case(extension))
    }
}

// Default value functions
const fn default_true() -> bool {
    true
}

const fn default_warmup_timeout_ms() -> u64 {
    5000
}

fn default_extensions() -> Vec<String> {
    vec!["qmd".into(), "md".into(), "rmd".into()]
}
