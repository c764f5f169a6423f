//! Finding sub-language blocks in tokenizer output.

use crate::block::CodeBlock;
use crate::language::{EmbeddedLanguage, LanguageRegistry};
use std::sync::Arc;
use tower_lsp_server::ls_types::Position;

/// Returns the innermost executable block containing `position`.
///
/// The whole `[start, end)` range counts, delimiter lines included. When
/// several blocks contain the line, the shortest range wins, and among
/// equal lengths the one starting later.
pub fn locate_at<T: CodeBlock>(tokens: &[T], position: Position) -> Option<&T> {
    let line = position.line as usize;
    tokens
        .iter()
        .filter(|block| block.is_executable() && block.contains_line(line))
        .min_by(|a, b| {
            let (ra, rb) = (a.line_range(), b.line_range());
            ra.len()
                .cmp(&rb.len())
                .then_with(|| rb.start.cmp(&ra.start))
        })
}

/// Resolves the embedded language of a block through the registry.
pub fn language_of<T: CodeBlock>(
    block: &T,
    registry: &LanguageRegistry,
) -> Option<Arc<EmbeddedLanguage>> {
    block.language_name().and_then(|name| registry.get(name))
}

/// Language of the block at `position`, if any.
pub fn language_at<T: CodeBlock>(
    tokens: &[T],
    registry: &LanguageRegistry,
    position: Position,
) -> Option<Arc<EmbeddedLanguage>> {
    locate_at(tokens, position).and_then(|block| language_of(block, registry))
}

/// Every executable block whose language shares an alias with `language`,
/// in document order.
pub fn locate_all<'a, T: CodeBlock>(
    tokens: &'a [T],
    registry: &LanguageRegistry,
    language: &EmbeddedLanguage,
) -> Vec<&'a T> {
    tokens
        .iter()
        .filter(|block| block.is_executable())
        .filter(|block| {
            language_of(*block, registry).is_some_and(|lang| lang.shares_alias_with(language))
        })
        .collect()
}

/// Most frequent embedded language among the executable blocks.
///
/// Blocks are tallied by language name as written in the document, after
/// dropping names the registry does not know and names rejected by
/// `filter`. Ties go to the name encountered first.
///
/// # Examples
///
/// ```
/// use vdoc_core::{CodeBlock, LanguageRegistry, dominant_language};
/// use std::ops::Range;
///
/// struct Fence(Range<usize>, &'static str);
///
/// impl CodeBlock for Fence {
///     fn line_range(&self) -> Range<usize> { self.0.clone() }
///     fn is_executable(&self) -> bool { true }
///     fn language_name(&self) -> Option<&str> { Some(self.1) }
/// }
///
/// let registry = LanguageRegistry::builtin();
/// let tokens = vec![Fence(0..3, "r"), Fence(4..7, "python"), Fence(8..11, "python")];
///
/// let lang = dominant_language(&tokens, &registry, None).unwrap();
/// assert_eq!(lang.extension, "py");
///
/// let only_r: &dyn Fn(&vdoc_core::EmbeddedLanguage) -> bool = &|l| l.extension == "r";
/// let lang = dominant_language(&tokens, &registry, Some(only_r)).unwrap();
/// assert_eq!(lang.extension, "r");
/// ```
pub fn dominant_language<T: CodeBlock>(
    tokens: &[T],
    registry: &LanguageRegistry,
    filter: Option<&dyn Fn(&EmbeddedLanguage) -> bool>,
) -> Option<Arc<EmbeddedLanguage>> {
    let mut tally: Vec<(&str, usize)> = Vec::new();

    for block in tokens.iter().filter(|block| block.is_executable()) {
        let Some(name) = block.language_name() else {
            continue;
        };
        let Some(language) = registry.get(name) else {
            continue;
        };
        if filter.is_some_and(|accept| !accept(language.as_ref())) {
            continue;
        }

        match tally.iter_mut().find(|(seen, _)| *seen == name) {
            Some((_, count)) => *count += 1,
            None => tally.push((name, 1)),
        }
    }

    // `max_by_key` keeps the last maximum, so fold to keep the first
    let (name, _) = tally
        .into_iter()
        .fold(None::<(&str, usize)>, |best, candidate| match best {
            Some(best) if best.1 >= candidate.1 => Some(best),
            _ => Some(candidate),
        })?;

    registry.get(name)
}
