//! Typed tree-builder parse errors.
//!
//! [§ 13.2.2 Parse errors](https://html.spec.whatwg.org/multipage/parsing.html#parse-errors)
//!
//! Tree-builder errors carry the offending tag name where one applies.
//! They are observational: the tree is always a best-effort reconstruction
//! and parsing continues.

use strum_macros::Display;

/// The closed set of tree-construction error conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum TreeBuilderErrorKind {
    /// A DOCTYPE token anywhere but the "initial" insertion mode (or in
    /// foreign content).
    UnexpectedDoctype,
    /// A doctype other than plain `<!DOCTYPE html>`.
    UnknownDoctype,
    /// Content before any doctype; the document is committed to quirks
    /// mode.
    ExpectedDoctype,
    /// A start tag this insertion mode ignores or rewrites.
    UnexpectedStartTag,
    /// An end tag this insertion mode ignores or rewrites.
    UnexpectedEndTag,
    /// An end tag closed an element whose subtree was still open.
    EndTagTooEarly,
    /// A character token in a mode with nowhere to put it.
    UnexpectedCharacter,
    /// A U+0000 in content; the character is dropped.
    NullCharacter,
    /// End of input with open constructs.
    UnexpectedEof,
    /// Mis-nested formatting elements rewritten by the adoption agency
    /// algorithm.
    AdoptionAgencyMisnesting,
    /// Character data relocated out of a table by foster parenting.
    FosterParentingCharacter,
    /// An HTML-only tag inside SVG or MathML content.
    HtmlElementInForeignContent,
    /// An `</html>` in fragment-context parsing.
    EndTagInFragmentContext,
    /// End of input inside an unclosed `<template>`.
    UnclosedTemplate,
    /// A second `<body>` start tag.
    DuplicateBody,
    /// A second `<head>` start tag.
    DuplicateHead,
    /// A trailing solidus on a non-void HTML start tag.
    SelfClosingNonVoid,
}

/// A tree-builder parse error, optionally naming the tag that caused it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeBuilderError {
    /// What went wrong.
    pub kind: TreeBuilderErrorKind,
    /// The tag name involved, when one applies.
    pub tag: Option<String>,
}
