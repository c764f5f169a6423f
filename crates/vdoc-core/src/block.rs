//! Tokenizer abstractions consumed by the locator and projector.
//!
//! The engine never parses composite documents itself. A tokenizer turns
//! document text into blocks, and each block reports its line span, whether
//! it is an executable sub-language block, and its language name.

use std::ops::Range;

/// A block produced by a [`Tokenizer`].
///
/// `line_range` is half-open: `start` is the opening delimiter line and
/// `end` is one past the closing delimiter line. The projector copies the
/// lines strictly between the delimiters, i.e. `start + 1 .. end - 1`.
pub trait CodeBlock {
    fn line_range(&self) -> Range<usize>;

    fn is_executable(&self) -> bool;

    fn language_name(&self) -> Option<&str>;

    /// Returns `true` if `line` falls inside `line_range`, delimiters included.
    fn contains_line(&self, line: usize) -> bool {
        self.line_range().contains(&line)
    }
}

impl<T: CodeBlock + ?Sized> CodeBlock for &T {
    fn line_range(&self) -> Range<usize> {
        (**self).line_range()
    }

    fn is_executable(&self) -> bool {
        (**self).is_executable()
    }

    fn language_name(&self) -> Option<&str> {
        (**self).language_name()
    }
}

/// Parses composite document text into blocks.
pub trait Tokenizer: Send + Sync {
    type Block: CodeBlock;

    fn parse(&self, text: &str) -> Vec<Self::Block>;
}
