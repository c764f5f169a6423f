//! Line scanner for fenced code blocks.
//!
//! Recognizes CommonMark fences (three or more backticks or tildes, indented
//! by at most three spaces) and classifies their info strings the way
//! Quarto and R Markdown do:
//!
//! - `{python}` / `{r echo=FALSE}`: executable block
//! - `{=html}`: raw block, passed through untouched, never executable
//! - `{{python}}`: escaped block shown verbatim, never executable
//! - `python`: plain Markdown code block, executable only when
//!   [`MarkdownOptions::bare_fences_executable`] is set

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::ops::Range;
use vdoc_core::{CodeBlock, Tokenizer};

static OPEN_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^ {0,3}(`{3,}|~{3,})[ \t]*(.*?)[ \t]*$").unwrap());
static CLOSE_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^ {0,3}(`{3,}|~{3,})[ \t]*$").unwrap());

/// Tokenizer settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MarkdownOptions {
    /// Treat ```` ```python ```` (no braces) as an executable block.
    pub bare_fences_executable: bool,
}

impl Default for MarkdownOptions {
    fn default() -> Self {
        Self {
            bare_fences_executable: true,
        }
    }
}

/// A fenced code block.
///
/// `line_range` spans from the opening fence to one past the closing fence.
/// An unclosed fence runs to the end of the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FencedBlock {
    range: Range<usize>,
    info: String,
    language: Option<String>,
    executable: bool,
    closed: bool,
}

impl FencedBlock {
    /// The raw info string after the opening fence.
    pub fn info(&self) -> &str {
        &self.info
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl CodeBlock for FencedBlock {
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

/// Fenced code block tokenizer for Markdown-family documents.
///
/// # Examples
///
/// ```
/// use vdoc_core::{CodeBlock, Tokenizer};
/// use vdoc_markdown::MarkdownTokenizer;
///
/// let text = "# Title\n\n```{r}\nx <- 1\n```\n";
/// let blocks = MarkdownTokenizer::default().parse(text);
///
/// assert_eq!(blocks.len(), 1);
/// assert_eq!(blocks[0].line_range(), 2..5);
/// assert_eq!(blocks[0].language_name(), Some("r"));
/// assert!(blocks[0].is_executable());
/// ```
#[derive(Debug, Clone, Default)]
pub struct MarkdownTokenizer {
    options: MarkdownOptions,
}

impl MarkdownTokenizer {
    pub fn new(options: MarkdownOptions) -> Self {
        Self { options }
    }

    fn classify(&self, info: &str) -> (Option<String>, bool) {
        if let Some(rest) = info.strip_prefix("{{") {
            return (first_word(rest.trim_end_matches('}')), false);
        }

        if let Some(rest) = info.strip_prefix('{') {
            let inner = rest.split('}').next().unwrap_or(rest).trim();
            if let Some(raw) = inner.strip_prefix('=') {
                return (first_word(raw), false);
            }
            let language = first_word(inner);
            let executable = language.is_some();
            return (language, executable);
        }

        let language = first_word(info);
        let executable = language.is_some() && self.options.bare_fences_executable;
        (language, executable)
    }
}

impl Tokenizer for MarkdownTokenizer {
    type Block = FencedBlock;

    fn parse(&self, text: &str) -> Vec<FencedBlock> {
        let lines: Vec<&str> = text
            .split('\n')
            .map(|line| line.strip_suffix('\r').unwrap_or(line))
            .collect();

        let mut blocks = Vec::new();
        let mut index = skip_front_matter(&lines);

        while index < lines.len() {
            let Some(caps) = OPEN_FENCE.captures(lines[index]) else {
                index += 1;
                continue;
            };

            let fence = &caps[1];
            let info = caps[2].to_string();
            // backtick fences may not carry backticks in their info string
            if fence.starts_with('`') && info.contains('`') {
                index += 1;
                continue;
            }

            let open = index;
            let close = lines[open + 1..]
                .iter()
                .position(|line| closes(line, fence))
                .map(|offset| open + 1 + offset);

            let (language, executable) = self.classify(&info);
            let (end, closed) = match close {
                Some(close) => (close + 1, true),
                None => {
                    tracing::trace!("unclosed fence at line {}", open);
                    (lines.len() + 1, false)
                }
            };

            blocks.push(FencedBlock {
                range: open..end,
                info,
                language,
                executable,
                closed,
            });
            index = end;
        }

        blocks
    }
}

fn closes(line: &str, fence: &str) -> bool {
    CLOSE_FENCE.captures(line).is_some_and(|caps| {
        let candidate = &caps[1];
        candidate.as_bytes()[0] == fence.as_bytes()[0] && candidate.len() >= fence.len()
    })
}

/// Index of the first line after a YAML front matter block at line 0.
fn skip_front_matter(lines: &[&str]) -> usize {
    if lines.first().is_none_or(|line| line.trim_end() != "---") {
        return 0;
    }

    lines
        .iter()
        .skip(1)
        .position(|line| matches!(line.trim_end(), "---" | "..."))
        .map_or(0, |offset| offset + 2)
}

/// First word of an info string, without a leading `.` (pandoc class syntax).
fn first_word(info: &str) -> Option<String> {
    info.split(|c: char| c.is_whitespace() || c == ',' || c == '{' || c == '}')
        .find(|word| !word.is_empty())
        .map(|word| word.trim_start_matches('.'))
        .filter(|word| !word.is_empty())
        .map(str::to_string)
}
