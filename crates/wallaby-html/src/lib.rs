//! HTML5 parsing for the wallaby library.
//!
//! # Scope
//!
//! This crate implements the WHATWG HTML Living Standard's parsing
//! pipeline:
//!
//! - **Encoding resolution** ([§ 13.2.3](https://html.spec.whatwg.org/multipage/parsing.html#the-input-byte-stream)):
//!   transport hints, byte order marks, and the `<meta>` prescan, decoding
//!   through `encoding_rs`.
//! - **HTML Tokenizer** ([§ 13.2.5](https://html.spec.whatwg.org/multipage/parsing.html#tokenization)):
//!   the full state machine including RCDATA, RAWTEXT, script data,
//!   PLAINTEXT, CDATA, and character reference resolution.
//! - **Tree construction** ([§ 13.2.6](https://html.spec.whatwg.org/multipage/parsing.html#tree-construction)):
//!   all insertion modes, foster parenting, the adoption agency algorithm,
//!   foreign content, templates, and fragment parsing.
//!
//! Callers parse whole documents with [`parse_document`] / [`parse_bytes`],
//! or stream tokenizer output lazily with [`events`]. Trees serialize to
//! the html5lib-tests conformance format through
//! [`test_format::to_test_format`].

use std::error::Error;
use std::fmt;

/// Encoding sniffing and byte decoding.
pub mod encoding;
/// Character reference (entity) decoding.
pub mod entities;
/// Tree construction.
pub mod parser;
/// Lazy token-event streaming.
pub mod stream;
/// html5lib-tests tree format serialization.
pub mod test_format;
/// Tokenization.
pub mod tokenizer;

pub use parser::{
    FragmentContext, InsertionMode, Parser, QuirksMode, TreeBuilderError, TreeBuilderErrorKind,
};
pub use stream::{Event, Events};
pub use tokenizer::{
    Token, Tokenizer, TokenizerError, TokenizerErrorKind, TokenizerOptions, TokenizerState,
};
pub use wallaby_dom as dom;

/// Options for [`parse_document`].
#[derive(Debug, Clone, Default)]
pub struct ParseOptions {
    /// Parse as a fragment inside this context element.
    pub fragment_context: Option<FragmentContext>,
    /// The document is an iframe `srcdoc` document: a missing doctype does
    /// not trigger quirks mode.
    pub iframe_srcdoc: bool,
    /// Keep the collected parse errors in the output. When unset the tree
    /// is still built with full error recovery, but the error list comes
    /// back empty.
    pub collect_errors: bool,
    /// Fail on the first parse error instead of recovering.
    pub strict: bool,
    /// Tokenizer-level options.
    pub tokenizer: TokenizerOptions,
}

impl ParseOptions {
    /// Options that keep the error list (the common case in tests).
    #[must_use]
    pub fn collecting_errors() -> Self {
        Self {
            collect_errors: true,
            ..Self::default()
        }
    }

    /// Builder-style strict mode toggle.
    #[must_use]
    pub fn with_strict_mode(mut self) -> Self {
        self.strict = true;
        self.collect_errors = true;
        self
    }
}

/// Options for [`parse_bytes`].
#[derive(Debug, Clone, Default)]
pub struct ByteParseOptions {
    /// A transport-layer encoding label (e.g. from a Content-Type header);
    /// takes priority over in-stream detection.
    pub transport_encoding: Option<String>,
    /// Options for the parse itself.
    pub parse: ParseOptions,
}

/// One collected parse error from either stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Reported by the tokenizer, with a character offset.
    Tokenizer(TokenizerError),
    /// Reported by the tree builder, with a tag name where applicable.
    TreeBuilder(TreeBuilderError),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tokenizer(error) => {
                write!(f, "{} at offset {}", error.kind, error.offset)
            }
            Self::TreeBuilder(error) => match &error.tag {
                Some(tag) => write!(f, "{} ({tag})", error.kind),
                None => write!(f, "{}", error.kind),
            },
        }
    }
}

/// The first parse error, surfaced as a failure in strict mode.
#[derive(Debug, Clone)]
pub struct StrictModeViolation {
    /// The error that aborted the parse.
    pub error: ParseError,
}

impl fmt::Display for StrictModeViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "parse error in strict mode: {}", self.error)
    }
}

impl Error for StrictModeViolation {}

/// The result of a successful parse.
#[derive(Debug)]
pub struct ParseOutput {
    /// The document (or fragment) tree.
    pub tree: dom::DomTree,
    /// Collected parse errors, tokenizer first.
    pub errors: Vec<ParseError>,
    /// The document mode derived from the doctype.
    pub quirks_mode: QuirksMode,
    /// The encoding used to decode the input, for byte parses.
    pub encoding_name: Option<&'static str>,
}

/// Parse a complete document (or a fragment, when
/// [`ParseOptions::fragment_context`] is set) from text.
///
/// # Errors
///
/// Fails only in strict mode, on the first parse error. With strict mode
/// off the tree is always a best-effort reconstruction and the call
/// succeeds.
pub fn parse_document(
    input: &str,
    opts: &ParseOptions,
) -> Result<ParseOutput, StrictModeViolation> {
    // Empty input short-circuits to an empty document: no synthesized
    // html/head/body skeleton and no missing-doctype error.
    if input.is_empty() {
        let tree = if opts.fragment_context.is_some() {
            dom::DomTree::new_fragment()
        } else {
            dom::DomTree::new()
        };
        return Ok(ParseOutput {
            tree,
            errors: Vec::new(),
            quirks_mode: QuirksMode::NoQuirks,
            encoding_name: None,
        });
    }

    let parser = match &opts.fragment_context {
        Some(context) => {
            Parser::new_fragment(input, &opts.tokenizer, context, opts.iframe_srcdoc)
        }
        None => Parser::new(input, &opts.tokenizer, opts.iframe_srcdoc),
    };
    let result = parser.run();

    let mut errors: Vec<ParseError> = Vec::new();
    if opts.collect_errors || opts.strict {
        errors.extend(result.tokenizer_errors.into_iter().map(ParseError::Tokenizer));
        errors.extend(result.errors.into_iter().map(ParseError::TreeBuilder));
    }

    if opts.strict
        && let Some(first) = errors.first()
    {
        return Err(StrictModeViolation {
            error: first.clone(),
        });
    }

    Ok(ParseOutput {
        tree: result.tree,
        errors: if opts.collect_errors { errors } else { Vec::new() },
        quirks_mode: result.quirks_mode,
        encoding_name: None,
    })
}

/// Decode a byte stream (transport hint → BOM → `<meta>` prescan →
/// windows-1252) and parse the result.
///
/// # Errors
///
/// Fails only in strict mode, on the first parse error.
pub fn parse_bytes(
    bytes: &[u8],
    opts: &ByteParseOptions,
) -> Result<ParseOutput, StrictModeViolation> {
    let decoded = encoding::decode_bytes(bytes, opts.transport_encoding.as_deref());
    let mut output = parse_document(&decoded.text, &opts.parse)?;
    output.encoding_name = Some(decoded.encoding.name());
    Ok(output)
}

/// Create a lazy event stream over `input`; see [`stream::events`].
#[must_use]
pub fn events(input: &str, opts: &TokenizerOptions) -> Events {
    stream::events(input, opts)
}
