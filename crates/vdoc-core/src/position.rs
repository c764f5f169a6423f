//! Composite ↔ virtual coordinate mapping.
//!
//! Projection keeps every line at its composite index, so the two coordinate
//! spaces differ only by the preamble length. Characters are never shifted.

use crate::language::EmbeddedLanguage;
use tower_lsp_server::ls_types::{Position, Range};

/// Maps a composite position into the virtual document.
pub fn to_virtual(language: &EmbeddedLanguage, position: Position) -> Position {
    Position::new(
        position.line.saturating_add(language.preamble_len()),
        position.character,
    )
}

/// Maps a virtual position back into the composite document.
///
/// Positions inside the preamble clamp to line 0.
pub fn to_composite(language: &EmbeddedLanguage, position: Position) -> Position {
    Position::new(
        position.line.saturating_sub(language.preamble_len()),
        position.character,
    )
}

/// Maps a virtual range (e.g. a definition or edit span reported by a
/// backend) back into the composite document.
pub fn to_composite_range(language: &EmbeddedLanguage, range: Range) -> Range {
    Range::new(
        to_composite(language, range.start),
        to_composite(language, range.end),
    )
}

pub fn to_virtual_range(language: &EmbeddedLanguage, range: Range) -> Range {
    Range::new(
        to_virtual(language, range.start),
        to_virtual(language, range.end),
    )
}
