//! Embedded language descriptors and the alias registry.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// How a virtual document is exposed to its analysis backend.
///
/// # Examples
///
/// ```
/// use vdoc_core::BackingKind;
///
/// let kind: BackingKind = serde_json::from_str(r#"{"kind": "file", "reuse": true}"#).unwrap();
/// assert_eq!(kind, BackingKind::File { reuse: true });
///
/// let kind: BackingKind = serde_json::from_str(r#"{"kind": "content"}"#).unwrap();
/// assert_eq!(kind, BackingKind::Content);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum BackingKind {
    /// In-memory addressable buffer; never written to disk.
    Content,
    /// Real file on disk.
    ///
    /// `reuse` marks backends that must keep seeing the same file identity:
    /// changed content is edited into the open document instead of deleting
    /// and recreating it.
    File {
        #[serde(default)]
        reuse: bool,
    },
}

/// Descriptor of a sub-language that can appear in fenced blocks.
///
/// Descriptors are immutable once registered and shared via `Arc`.
///
/// # Examples
///
/// ```
/// use vdoc_core::{BackingKind, EmbeddedLanguage};
///
/// let lang = EmbeddedLanguage::new(&["python", "py"], "py", BackingKind::File { reuse: false })
///     .with_filler("#")
///     .with_preamble(&["# type: ignore"]);
///
/// assert!(lang.matches("PY"));
/// assert_eq!(lang.preamble_len(), 1);
/// assert!(!lang.requires_document_reuse());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbeddedLanguage {
    /// Language aliases as they appear in fence info strings.
    pub ids: Vec<String>,
    /// Canonical file extension, without the dot.
    pub extension: String,
    pub backing: BackingKind,
    /// Text used for every line that is not projected block content.
    #[serde(default)]
    pub filler_line: String,
    /// Synthetic lines prepended before the projected canvas.
    #[serde(default)]
    pub preamble: Vec<String>,
}

impl EmbeddedLanguage {
    pub fn new(ids: &[&str], extension: &str, backing: BackingKind) -> Self {
        Self {
            ids: ids.iter().map(|id| (*id).to_string()).collect(),
            extension: extension.to_string(),
            backing,
            filler_line: String::new(),
            preamble: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_filler(mut self, filler: &str) -> Self {
        self.filler_line = filler.to_string();
        self
    }

    #[must_use]
    pub fn with_preamble(mut self, lines: &[&str]) -> Self {
        self.preamble = lines.iter().map(|l| (*l).to_string()).collect();
        self
    }

    /// The name used for display and logging (first alias).
    pub fn name(&self) -> &str {
        self.ids.first().map_or(self.extension.as_str(), String::as_str)
    }

    pub fn preamble_len(&self) -> u32 {
        self.preamble.len() as u32
    }

    pub fn is_file_backed(&self) -> bool {
        matches!(self.backing, BackingKind::File { .. })
    }

    pub fn requires_document_reuse(&self) -> bool {
        matches!(self.backing, BackingKind::File { reuse: true })
    }

    /// Case-insensitive alias check.
    pub fn matches(&self, alias: &str) -> bool {
        self.ids.iter().any(|id| id.eq_ignore_ascii_case(alias))
    }

    /// Returns `true` if the two descriptors share at least one alias.
    pub fn shares_alias_with(&self, other: &Self) -> bool {
        self.ids.iter().any(|id| other.matches(id))
    }
}

/// Alias → descriptor lookup table.
///
/// Built once at startup (builtins plus configured overrides) and read
/// concurrently afterwards, so it needs no interior locking.
///
/// # Examples
///
/// ```
/// use vdoc_core::LanguageRegistry;
///
/// let registry = LanguageRegistry::builtin();
/// let python = registry.get("Python").unwrap();
/// assert_eq!(python.extension, "py");
/// assert!(registry.get("cobol").is_none());
/// ```
#[derive(Debug, Default, Clone)]
pub struct LanguageRegistry {
    languages: Vec<Arc<EmbeddedLanguage>>,
    by_alias: HashMap<String, Arc<EmbeddedLanguage>>,
}

impl LanguageRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding the built-in language table.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for language in builtin_languages() {
            registry.register(language);
        }
        registry
    }

    /// Builtins with `overrides` registered on top.
    ///
    /// An override wins for every alias it declares; builtins keep the
    /// aliases it does not mention.
    pub fn with_overrides(overrides: impl IntoIterator<Item = EmbeddedLanguage>) -> Self {
        let mut registry = Self::builtin();
        for language in overrides {
            tracing::debug!(
                "registering language override: {} (.{})",
                language.name(),
                language.extension
            );
            registry.register(language);
        }
        registry
    }

    /// Registers a descriptor under all of its aliases.
    pub fn register(&mut self, language: EmbeddedLanguage) {
        let language = Arc::new(language);
        for id in &language.ids {
            self.by_alias
                .insert(id.to_ascii_lowercase(), Arc::clone(&language));
        }
        self.languages.push(language);
    }

    /// Looks up a descriptor by alias (case-insensitive).
    pub fn get(&self, alias: &str) -> Option<Arc<EmbeddedLanguage>> {
        self.by_alias
            .get(&alias.to_ascii_lowercase())
            .map(Arc::clone)
    }

    /// Registered descriptors that are still reachable by at least one alias,
    /// in registration order.
    pub fn languages(&self) -> Vec<Arc<EmbeddedLanguage>> {
        self.languages
            .iter()
            .filter(|lang| {
                self.by_alias
                    .values()
                    .any(|registered| Arc::ptr_eq(registered, lang))
            })
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.languages().len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_alias.is_empty()
    }
}

fn builtin_languages() -> Vec<EmbeddedLanguage> {
    let file = BackingKind::File { reuse: false };
    let reused_file = BackingKind::File { reuse: true };

    vec![
        EmbeddedLanguage::new(&["python", "py"], "py", file)
            .with_filler("#")
            .with_preamble(&["# type: ignore", "# flake8: noqa"]),
        EmbeddedLanguage::new(&["r"], "r", reused_file)
            .with_filler("#")
            .with_preamble(&["# !diagnostics off"]),
        EmbeddedLanguage::new(&["julia", "jl"], "jl", reused_file).with_filler("#"),
        EmbeddedLanguage::new(&["sql"], "sql", file).with_filler("--"),
        EmbeddedLanguage::new(&["bash", "sh", "shell", "zsh"], "sh", file).with_filler("#"),
        EmbeddedLanguage::new(&["lua"], "lua", file).with_filler("--"),
        EmbeddedLanguage::new(&["typescript", "ts"], "ts", BackingKind::Content),
        EmbeddedLanguage::new(&["javascript", "js", "ojs", "d3"], "js", BackingKind::Content),
        EmbeddedLanguage::new(&["html"], "html", BackingKind::Content),
        EmbeddedLanguage::new(&["css"], "css", BackingKind::Content),
        EmbeddedLanguage::new(&["tex", "latex"], "tex", BackingKind::Content).with_filler("%"),
        EmbeddedLanguage::new(&["dot"], "dot", BackingKind::Content),
        EmbeddedLanguage::new(&["mermaid"], "mmd", BackingKind::Content),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_lookup_is_case_insensitive() {
        let registry = LanguageRegistry::builtin();
        assert_eq!(registry.get("R").unwrap().extension, "r");
        assert_eq!(registry.get("JavaScript").unwrap().extension, "js");
        assert_eq!(registry.get("ojs").unwrap().extension, "js");
    }

    #[test]
    fn test_builtin_backing_kinds() {
        let registry = LanguageRegistry::builtin();

        let python = registry.get("python").unwrap();
        assert!(python.is_file_backed());
        assert!(!python.requires_document_reuse());
        assert_eq!(python.preamble_len(), 2);
        assert_eq!(python.filler_line, "#");

        let r = registry.get("r").unwrap();
        assert!(r.requires_document_reuse());

        let ts = registry.get("ts").unwrap();
        assert_eq!(ts.backing, BackingKind::Content);
        assert!(ts.preamble.is_empty());
    }

    #[test]
    fn test_aliases_share_descriptor() {
        let registry = LanguageRegistry::builtin();
        let bash = registry.get("bash").unwrap();
        let sh = registry.get("sh").unwrap();
        assert!(Arc::ptr_eq(&bash, &sh));
    }

    #[test]
    fn test_unknown_alias() {
        let registry = LanguageRegistry::builtin();
        assert!(registry.get("brainfuck").is_none());
        assert!(registry.get("").is_none());
    }

    #[test]
    fn test_empty_registry() {
        let registry = LanguageRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn test_override_replaces_alias() {
        let custom = EmbeddedLanguage::new(&["python"], "py", BackingKind::Content);
        let registry = LanguageRegistry::with_overrides(vec![custom]);

        assert_eq!(registry.get("python").unwrap().backing, BackingKind::Content);
        // "py" was not mentioned by the override and keeps the builtin
        assert!(registry.get("py").unwrap().is_file_backed());
        assert_eq!(registry.len(), LanguageRegistry::builtin().len() + 1);
    }

    #[test]
    fn test_full_override_hides_builtin() {
        let custom = EmbeddedLanguage::new(&["dot"], "gv", BackingKind::Content);
        let registry = LanguageRegistry::with_overrides(vec![custom]);

        assert_eq!(registry.get("dot").unwrap().extension, "gv");
        assert_eq!(registry.len(), LanguageRegistry::builtin().len());
    }

    #[test]
    fn test_shares_alias_with() {
        let a = EmbeddedLanguage::new(&["js", "javascript"], "js", BackingKind::Content);
        let b = EmbeddedLanguage::new(&["JS"], "mjs", BackingKind::Content);
        let c = EmbeddedLanguage::new(&["ts"], "ts", BackingKind::Content);
        assert!(a.shares_alias_with(&b));
        assert!(!a.shares_alias_with(&c));
    }

    #[test]
    fn test_deserialize_defaults() {
        let json = r#"{"ids": ["nim"], "extension": "nim", "backing": {"kind": "file"}}"#;
        let lang: EmbeddedLanguage = serde_json::from_str(json).unwrap();
        assert_eq!(lang.backing, BackingKind::File { reuse: false });
        assert_eq!(lang.filler_line, "");
        assert!(lang.preamble.is_empty());
        assert_eq!(lang.name(), "nim");
    }
}
