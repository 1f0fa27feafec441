//! Helper functions for the HTML tokenizer.
//!
//! [§ 13.2.5 Tokenization](https://html.spec.whatwg.org/multipage/parsing.html#tokenization)
//!
//! This module contains the machinery shared by the state handlers:
//! - State transitions ("Switch to", "Reconsume in")
//! - Input handling with newline normalization and BOM discard
//! - Token emission, attribute finalization, and the raw-text auto-switch
//! - The shared end-tag-name handler for RCDATA / RAWTEXT / script data
//! - Error recording

use wallaby_common::warning::warn_once;

use super::core::{Tokenizer, TokenizerState, is_noncharacter};
use super::error::{TokenizerError, TokenizerErrorKind};
use super::token::Token;

// =============================================================================
// State Transition Helpers
// =============================================================================

impl Tokenizer {
    /// "Switch to the X state": the next character is consumed on the next
    /// iteration of the main loop.
    pub(super) const fn switch_to(&mut self, new_state: TokenizerState) {
        self.state = new_state;
    }

    /// "Reconsume in the X state": transition without consuming; the same
    /// character is processed again in the new state.
    pub(super) const fn reconsume_in(&mut self, new_state: TokenizerState) {
        self.reconsume = true;
        self.state = new_state;
    }

    /// Take the stashed return state for a character reference.
    ///
    /// # Panics
    ///
    /// Panics if no return state was set, indicating a tokenizer bug: the
    /// character reference states are only reachable after setting it.
    pub(super) fn take_return_state(&mut self) -> TokenizerState {
        self.return_state
            .take()
            .expect("character reference handled without a return state")
    }
}

// =============================================================================
// Input/Character Helpers
// =============================================================================

impl Tokenizer {
    /// "Consume the next input character."
    ///
    /// Applies the input preprocessing rules: a U+FEFF at the very start is
    /// discarded when `discard_bom` is set, and newlines are normalized
    /// (`\r\n` and a lone `\r` both become `\n`).
    pub(super) fn consume(&mut self) -> Option<char> {
        if !self.bom_handled {
            self.bom_handled = true;
            if self.discard_bom && self.input[self.current_pos..].starts_with('\u{FEFF}') {
                self.current_pos += '\u{FEFF}'.len_utf8();
            }
        }

        let c = self.input[self.current_pos..].chars().next()?;
        self.current_pos += c.len_utf8();

        if c == '\r' {
            // "U+000D CARRIAGE RETURN (CR) characters and U+000A LINE FEED
            // (LF) characters are treated specially... any CR characters
            // that are followed by LF characters must be removed, and any
            // CR characters not followed by LF characters must be converted
            // to LF characters."
            if self.input[self.current_pos..].starts_with('\n') {
                self.current_pos += 1;
            }
            return Some('\n');
        }
        Some(c)
    }

    /// Peek at a codepoint at the given offset from the current position
    /// without consuming it. Used for lookahead operations like "the next
    /// few characters are".
    #[must_use]
    pub fn peek_codepoint(&self, offset: usize) -> Option<char> {
        self.input[self.current_pos..].chars().nth(offset)
    }

    /// "If the next few characters are..." (case-sensitive).
    #[must_use]
    pub fn next_few_characters_are(&self, target: &str) -> bool {
        self.input[self.current_pos..].starts_with(target)
    }

    /// ASCII case-insensitive variant, for `DOCTYPE` / `PUBLIC` / `SYSTEM`.
    #[must_use]
    pub fn next_few_characters_are_case_insensitive(&self, target: &str) -> bool {
        let rest = self.input[self.current_pos..].as_bytes();
        let target = target.as_bytes();
        rest.len() >= target.len() && rest[..target.len()].eq_ignore_ascii_case(target)
    }

    /// Consume the given string from the input.
    /// Caller must have already verified the characters are present; only
    /// ASCII strings ("DOCTYPE", "--", "[CDATA[") are ever passed.
    pub(super) const fn consume_string(&mut self, target: &str) {
        self.current_pos += target.len();
    }

    /// [§ 12.1.4 ASCII whitespace](https://infra.spec.whatwg.org/#ascii-whitespace)
    ///
    /// The tokenizer's whitespace set excludes CR, which input
    /// preprocessing already normalized away.
    pub(super) const fn is_whitespace_char(input_char: char) -> bool {
        matches!(input_char, ' ' | '\t' | '\n' | '\x0C')
    }
}

// =============================================================================
// Token Emission Helpers
// =============================================================================

impl Tokenizer {
    /// "Emit the current token."
    ///
    /// Tag tokens are finalized here: duplicate attributes are dropped
    /// (first wins, with a parse error), end tags with attributes or a
    /// trailing solidus raise parse errors, and a start tag naming a
    /// raw-text element switches the state machine when the tree builder's
    /// adjusted current node is in the HTML namespace.
    pub(super) fn emit_token(&mut self) {
        let Some(mut token) = self.current_token.take() else {
            return;
        };

        match token {
            Token::StartTag { .. } => {
                self.finalize_tag_attributes(&mut token);
                if let Token::StartTag { ref name, .. } = token {
                    // Track the last start tag name for RCDATA/RAWTEXT end
                    // tag detection.
                    self.last_start_tag_name = Some(name.clone());

                    // [§ 13.2.6.2 / 13.2.6.3] The generic RCDATA / raw text
                    // element parsing algorithms switch the tokenizer when
                    // the parser inserts these elements. The switch only
                    // applies when the element would land in the HTML
                    // namespace.
                    if self.in_html_namespace {
                        let switch = match name.as_str() {
                            "title" | "textarea" => Some(TokenizerState::RCDATA),
                            "style" | "xmp" | "iframe" | "noembed" | "noframes" => {
                                Some(TokenizerState::RAWTEXT)
                            }
                            "script" => Some(TokenizerState::ScriptData),
                            "plaintext" => Some(TokenizerState::PLAINTEXT),
                            _ => None,
                        };
                        if let Some(state) = switch {
                            self.switch_to(state);
                        }
                    }
                }
            }
            Token::EndTag { .. } => {
                if let Token::EndTag {
                    self_closing,
                    ref attributes,
                    ..
                } = token
                {
                    if !attributes.is_empty() {
                        self.log_parse_error(TokenizerErrorKind::EndTagWithAttributes);
                    }
                    if self_closing {
                        self.log_parse_error(TokenizerErrorKind::EndTagWithTrailingSolidus);
                    }
                }
                self.finalize_tag_attributes(&mut token);
            }
            Token::Comment { ref mut data } => {
                if self.coerce_to_xml {
                    *data = coerce_comment_data(data);
                }
            }
            _ => {}
        }

        self.pending_tokens.push_back(token);
    }

    /// "Emit the current input character as a character token."
    pub(super) fn emit_character_token(&mut self, c: char) {
        let c = if self.coerce_to_xml { coerce_char(c) } else { c };
        self.pending_tokens.push_back(Token::new_character(c));
    }

    /// "Emit an end-of-file token." The machine is inert afterwards.
    pub(super) fn emit_eof_token(&mut self) {
        self.pending_tokens.push_back(Token::new_eof());
        self.at_eof = true;
    }

    /// "If there is already an attribute on the token with the exact same
    /// name, then this is a duplicate-attribute parse error and the new
    /// attribute must be removed from the token." First occurrence wins.
    fn finalize_tag_attributes(&mut self, token: &mut Token) {
        let (Token::StartTag { attributes, .. } | Token::EndTag { attributes, .. }) = token else {
            return;
        };
        let mut seen: Vec<String> = Vec::with_capacity(attributes.len());
        let mut duplicates = 0usize;
        attributes.retain(|attr| {
            if seen.iter().any(|name| *name == attr.name) {
                duplicates += 1;
                false
            } else {
                seen.push(attr.name.clone());
                true
            }
        });
        for _ in 0..duplicates {
            self.log_parse_error(TokenizerErrorKind::DuplicateAttribute);
        }
    }
}

// =============================================================================
// RCDATA/RAWTEXT/Script Data End Tag Helpers
// =============================================================================

impl Tokenizer {
    /// "An appropriate end tag token is an end tag token whose tag name
    /// matches the tag name of the last start tag to have been emitted from
    /// this tokenizer, if any."
    pub(super) fn is_appropriate_end_tag_token(&self) -> bool {
        if let (Some(last_start_tag), Some(Token::EndTag { name, .. })) =
            (&self.last_start_tag_name, &self.current_token)
        {
            return name == last_start_tag;
        }
        false
    }

    /// [§ 13.2.5.11 / 14 / 17 / 25] The shared body of the RCDATA, RAWTEXT,
    /// script data, and script data escaped end tag name states; they only
    /// differ in the state reconsumed on a failed match.
    pub(super) fn handle_raw_end_tag_name_state(&mut self, return_state: TokenizerState) {
        match self.current_input_character {
            // "If the current end tag token is an appropriate end tag token,
            // then switch to the before attribute name state. Otherwise,
            // treat it as per the 'anything else' entry below."
            Some(c) if Self::is_whitespace_char(c) => {
                if self.is_appropriate_end_tag_token() {
                    self.switch_to(TokenizerState::BeforeAttributeName);
                } else {
                    self.abandon_raw_end_tag(return_state);
                }
            }
            Some('/') => {
                if self.is_appropriate_end_tag_token() {
                    self.switch_to(TokenizerState::SelfClosingStartTag);
                } else {
                    self.abandon_raw_end_tag(return_state);
                }
            }
            Some('>') => {
                if self.is_appropriate_end_tag_token() {
                    self.switch_to(TokenizerState::Data);
                    self.emit_token();
                } else {
                    self.abandon_raw_end_tag(return_state);
                }
            }
            // "Append the lowercase version of the current input character
            // to the current tag token's tag name. Append the current input
            // character to the temporary buffer."
            Some(c) if c.is_ascii_uppercase() => {
                if let Some(ref mut token) = self.current_token {
                    token.append_to_tag_name(c.to_ascii_lowercase());
                }
                self.temporary_buffer.push(c);
            }
            Some(c) if c.is_ascii_lowercase() => {
                if let Some(ref mut token) = self.current_token {
                    token.append_to_tag_name(c);
                }
                self.temporary_buffer.push(c);
            }
            _ => {
                self.abandon_raw_end_tag(return_state);
            }
        }
    }

    /// "Anything else": "Emit a U+003C LESS-THAN SIGN character token, a
    /// U+002F SOLIDUS character token, and a character token for each of
    /// the characters in the temporary buffer (in the order they were added
    /// to the buffer). Reconsume in the [return] state."
    fn abandon_raw_end_tag(&mut self, return_state: TokenizerState) {
        self.emit_character_token('<');
        self.emit_character_token('/');
        let buffer = std::mem::take(&mut self.temporary_buffer);
        for c in buffer.chars() {
            self.emit_character_token(c);
        }
        // The partial end tag token is discarded.
        self.current_token = None;
        self.reconsume_in(return_state);
    }
}

// =============================================================================
// Character Reference Helpers
// =============================================================================

impl Tokenizer {
    /// "Consumed as part of an attribute": the return state is one of the
    /// attribute value states.
    pub(super) const fn is_consumed_as_part_of_attribute(&self) -> bool {
        matches!(
            self.return_state,
            Some(
                TokenizerState::AttributeValueDoubleQuoted
                    | TokenizerState::AttributeValueSingleQuoted
                    | TokenizerState::AttributeValueUnquoted
            )
        )
    }

    /// "Flush code points consumed as a character reference": append each
    /// character of the temporary buffer to the current attribute's value,
    /// or emit them as character tokens.
    pub(super) fn flush_code_points_consumed_as_character_reference(&mut self) {
        let buffer = self.temporary_buffer.clone();
        if self.is_consumed_as_part_of_attribute() {
            for c in buffer.chars() {
                if let Some(ref mut token) = self.current_token {
                    token.append_to_current_attribute_value(c);
                }
            }
        } else {
            for c in buffer.chars() {
                self.emit_character_token(c);
            }
        }
    }
}

// =============================================================================
// Error Handling
// =============================================================================

impl Tokenizer {
    /// [§ 13.2.2 Parse errors](https://html.spec.whatwg.org/multipage/parsing.html#parse-errors)
    ///
    /// Record a typed parse error at the last-consumed position. Parse
    /// errors in HTML are not fatal; the tokenizer recovers and continues.
    pub(super) fn log_parse_error(&mut self, kind: TokenizerErrorKind) {
        let offset = self.current_pos;
        self.errors.push(TokenizerError { kind, offset });
        warn_once("HTML Tokenizer", &format!("{kind} at position {offset}"));
    }

    /// Shared EOF-in-DOCTYPE path: force quirks, emit the token, emit EOF.
    pub(super) fn eof_in_doctype(&mut self) {
        self.log_parse_error(TokenizerErrorKind::EofInDoctype);
        if let Some(ref mut token) = self.current_token {
            token.set_force_quirks();
        }
        self.emit_token();
        self.emit_eof_token();
    }
}

// =============================================================================
// XML Coercion
// =============================================================================

/// Replace code points that are illegal in XML output: U+000C becomes a
/// space, noncharacters become U+FFFD.
fn coerce_char(c: char) -> char {
    match c {
        '\u{0C}' => ' ',
        c if is_noncharacter(c as u32) => '\u{FFFD}',
        c => c,
    }
}

/// XML comments may not contain `--`; rewrite each occurrence as `- -`.
fn coerce_comment_data(data: &str) -> String {
    let mut coerced: String = data.chars().map(coerce_char).collect();
    while coerced.contains("--") {
        coerced = coerced.replace("--", "- -");
    }
    coerced
}
