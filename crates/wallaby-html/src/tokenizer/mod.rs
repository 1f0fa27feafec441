//! HTML tokenizer module.
//!
//! Implements [§ 13.2.5 Tokenization](https://html.spec.whatwg.org/multipage/parsing.html#tokenization)
//! of the WHATWG HTML Living Standard.

/// HTML tokenizer state machine implementation.
pub mod core;
/// Typed tokenizer parse errors.
pub mod error;
/// Helper methods for tokenizer state transitions.
pub mod helpers;
/// Token types produced by the tokenizer.
pub mod token;

pub use core::{Tokenizer, TokenizerState};
pub use error::{TokenizerError, TokenizerErrorKind};
pub use token::Token;

/// Options controlling a [`Tokenizer`].
#[derive(Debug, Clone)]
pub struct TokenizerOptions {
    /// Starting state; `None` means the data state. Used for fragment
    /// parsing and by conformance tests.
    pub initial_state: Option<TokenizerState>,
    /// Pre-latched "last start tag" name for RCDATA / raw-text end tag
    /// matching (fragment parsing inside `<textarea>`, `<title>`, ...).
    pub initial_rawtext_tag: Option<String>,
    /// Discard a leading U+FEFF.
    pub discard_bom: bool,
    /// Rewrite output so it stays legal XML (code points, and `--` inside
    /// comment data).
    pub coerce_to_xml: bool,
}

impl Default for TokenizerOptions {
    fn default() -> Self {
        Self {
            initial_state: None,
            initial_rawtext_tag: None,
            discard_bom: true,
            coerce_to_xml: false,
        }
    }
}
