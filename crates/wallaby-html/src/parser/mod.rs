//! HTML tree construction.
//!
//! Implements [§ 13.2.6 Tree construction](https://html.spec.whatwg.org/multipage/parsing.html#tree-construction)
//! of the WHATWG HTML Living Standard: the insertion-mode state machine,
//! the open-element and active-formatting stacks, foster parenting, the
//! adoption agency algorithm, foreign content, templates, and
//! fragment-context parsing.

/// The tree-builder state machine and its supporting algorithms.
pub mod core;
/// Typed tree-builder parse errors.
pub mod error;
/// Foreign content (SVG / MathML) adjustment tables.
pub mod foreign_content;
/// Fragment-context parsing setup and teardown.
pub mod fragment;
/// Per-insertion-mode token handlers.
mod modes;
/// Doctype classification tables.
pub mod quirks;

pub use core::{InsertionMode, Parser, ParserResult};
pub use error::{TreeBuilderError, TreeBuilderErrorKind};
pub use fragment::FragmentContext;
pub use quirks::QuirksMode;
