//! Markdown-family tokenizer for vdoc.
//!
//! Provides [`MarkdownTokenizer`], a [`vdoc_core::Tokenizer`] that finds fenced
//! code blocks in Markdown, Quarto (`.qmd`) and R Markdown (`.rmd`)
//! documents.
//!
//! # Examples
//!
//! ```
//! use vdoc_core::{LanguageRegistry, Tokenizer, dominant_language};
//! use vdoc_markdown::MarkdownTokenizer;
//!
//! let text = "```{r}\nx <- 1\n```\n\n```{python}\ny = 2\n```\n\n```{r}\nz <- 3\n```\n";
//! let blocks = MarkdownTokenizer::default().parse(text);
//!
//! let registry = LanguageRegistry::builtin();
//! let language = dominant_language(&blocks, &registry, None).unwrap();
//! assert_eq!(language.extension, "r");
//! ```

pub mod parser;

pub use parser::{FencedBlock, MarkdownOptions, MarkdownTokenizer};
