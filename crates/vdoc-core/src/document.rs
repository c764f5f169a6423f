//! Read-only snapshot of a composite document.

use std::path::PathBuf;
use tower_lsp_server::ls_types::Uri;

/// Absolute filesystem path of a `file:` URI.
///
/// Other schemes (`untitled:`, `vdoc-embedded:`) and URIs that do not map to
/// an absolute path give `None`.
///
/// ```
/// use vdoc_core::local_path;
/// use tower_lsp_server::ls_types::Uri;
///
/// let uri: Uri = "file:///notes/report.qmd".parse().unwrap();
/// assert_eq!(local_path(&uri), Some("/notes/report.qmd".into()));
///
/// let untitled: Uri = "untitled:Untitled-1".parse().unwrap();
/// assert_eq!(local_path(&untitled), None);
/// ```
pub fn local_path(uri: &Uri) -> Option<PathBuf> {
    let is_file = uri
        .as_str()
        .split_once(':')
        .is_some_and(|(scheme, _)| scheme.eq_ignore_ascii_case("file"));
    if !is_file {
        return None;
    }

    uri.to_file_path()
        .map(|path| path.to_path_buf())
        .filter(|path| path.is_absolute())
}

/// Immutable line view of a composite document.
///
/// Lines are split on `\n` the way editors count them, so text ending in a
/// newline has a trailing empty line. A trailing `\r` is stripped from each
/// line.
///
/// # Examples
///
/// ```
/// use vdoc_core::CompositeDocument;
/// use tower_lsp_server::ls_types::Uri;
///
/// let uri = Uri::from_file_path("/notes/report.qmd").unwrap();
/// let doc = CompositeDocument::new(uri, "# Title\r\n\nbody\n");
///
/// assert_eq!(doc.line_count(), 4);
/// assert_eq!(doc.line(0), Some("# Title"));
/// assert_eq!(doc.line(3), Some(""));
/// assert_eq!(doc.line(4), None);
/// ```
#[derive(Debug, Clone)]
pub struct CompositeDocument {
    uri: Uri,
    text: String,
    lines: Vec<String>,
}

impl CompositeDocument {
    pub fn new(uri: Uri, text: impl Into<String>) -> Self {
        let text = text.into();
        let lines = text
            .split('\n')
            .map(|line| line.strip_suffix('\r').unwrap_or(line).to_string())
            .collect();
        Self { uri, text, lines }
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn line(&self, index: usize) -> Option<&str> {
        self.lines.get(index).map(String::as_str)
    }
}
