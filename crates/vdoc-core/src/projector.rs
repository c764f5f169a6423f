//! Projection of sub-language blocks into standalone virtual documents.
//!
//! The projected canvas keeps every block line at its original line index,
//! so the only offset between composite and virtual coordinates is the
//! language preamble (see [`crate::position`]).

use crate::block::CodeBlock;
use crate::document::CompositeDocument;
use crate::language::{EmbeddedLanguage, LanguageRegistry};
use crate::locator::{language_of, locate_all, locate_at};
use std::sync::Arc;
use tower_lsp_server::ls_types::Position;

/// Filler lines appended after the canvas so completion at end-of-buffer
/// always has somewhere to land.
pub const TRAILING_PADDING_LINES: usize = 2;

/// Synthesized standalone text for one language of a composite document.
///
/// A value type: two projections with equal content for the same language
/// are interchangeable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VirtualDocument {
    pub language: Arc<EmbeddedLanguage>,
    pub content: String,
}

impl VirtualDocument {
    /// Number of lines in `content` (the trailing newline terminates the
    /// last line rather than starting a new one).
    pub fn line_count(&self) -> usize {
        self.content.lines().count()
    }
}

/// Projects `blocks` of `document` onto a canvas for `language`.
///
/// Lines strictly between each block's delimiters are copied to the same
/// line index; every other line becomes `language.filler_line`. The result
/// has exactly `line_count + preamble + 2` lines and ends with a newline.
///
/// # Examples
///
/// ```
/// use vdoc_core::{BackingKind, CodeBlock, CompositeDocument, EmbeddedLanguage, project};
/// use std::ops::Range;
/// use tower_lsp_server::ls_types::Uri;
///
/// struct Fence(Range<usize>);
///
/// impl CodeBlock for Fence {
///     fn line_range(&self) -> Range<usize> { self.0.clone() }
///     fn is_executable(&self) -> bool { true }
///     fn language_name(&self) -> Option<&str> { Some("python") }
/// }
///
/// let uri = Uri::from_file_path("/doc.qmd").unwrap();
/// let doc = CompositeDocument::new(uri, "text\n```{python}\nx = 1\n```\nmore");
/// let lang = EmbeddedLanguage::new(&["python"], "py", BackingKind::File { reuse: false })
///     .with_filler("#");
///
/// let vdoc = project(&doc, &[Fence(1..4)], &std::sync::Arc::new(lang));
/// assert_eq!(vdoc.content, "#\n#\nx = 1\n#\n#\n#\n#\n");
/// ```
pub fn project<T: CodeBlock>(
    document: &CompositeDocument,
    blocks: &[T],
    language: &Arc<EmbeddedLanguage>,
) -> VirtualDocument {
    let line_count = document.line_count();
    let mut canvas: Vec<&str> = vec![language.filler_line.as_str(); line_count];

    for block in blocks {
        let range = block.line_range();
        let first = range.start.saturating_add(1);
        let last = range.end.saturating_sub(1).min(line_count);

        if range.end < range.start {
            tracing::debug!(
                "skipping malformed block range {}..{} ({})",
                range.start,
                range.end,
                language.name()
            );
            continue;
        }

        for line in first..last {
            if let Some(text) = document.line(line) {
                canvas[line] = text;
            }
        }
    }

    let filler = language.filler_line.as_str();
    let mut lines: Vec<&str> =
        Vec::with_capacity(language.preamble.len() + line_count + TRAILING_PADDING_LINES);
    lines.extend(language.preamble.iter().map(String::as_str));
    lines.extend(canvas);
    lines.extend(std::iter::repeat_n(filler, TRAILING_PADDING_LINES));

    let mut content = lines.join("\n");
    content.push('\n');

    VirtualDocument {
        language: Arc::clone(language),
        content,
    }
}

/// Projects a single explicitly chosen block.
pub fn project_block<T: CodeBlock>(
    document: &CompositeDocument,
    block: &T,
    language: &Arc<EmbeddedLanguage>,
) -> VirtualDocument {
    project(document, std::slice::from_ref(block), language)
}

/// Builds the virtual document for the block under `position`.
///
/// Returns `None` when `position` is not inside an executable block or the
/// block's language is not registered. With `explicit_block`, only that
/// block is projected (in the language found at `position`); otherwise
/// every block of that language is.
pub fn project_virtual_document<T: CodeBlock>(
    document: &CompositeDocument,
    position: Position,
    tokens: &[T],
    registry: &LanguageRegistry,
    explicit_block: Option<&T>,
) -> Option<VirtualDocument> {
    let block = locate_at(tokens, position)?;
    let language = language_of(block, registry)?;

    let vdoc = match explicit_block {
        Some(explicit) => project_block(document, explicit, &language),
        None => project(document, &locate_all(tokens, registry, &language), &language),
    };

    tracing::trace!(
        "projected {} lines of {} for {:?}",
        vdoc.line_count(),
        language.name(),
        document.uri()
    );

    Some(vdoc)
}
