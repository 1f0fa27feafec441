//! A lazy event view over the tokenizer output.
//!
//! The adapter drives the tokenizer one step at a time, coalesces adjacent
//! character tokens into one text event, and never constructs a tree.

use wallaby_dom::Attribute;

use crate::tokenizer::{Token, Tokenizer, TokenizerError, TokenizerOptions};

/// A simplified, tree-free view of the token stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A start tag with its attributes.
    Start {
        /// The (lowercased) tag name.
        name: String,
        /// Attributes in source order.
        attrs: Vec<Attribute>,
        /// Whether the tag carried a trailing solidus.
        self_closing: bool,
    },
    /// An end tag.
    End {
        /// The (lowercased) tag name.
        name: String,
    },
    /// A run of character data; adjacent character tokens are coalesced.
    Text(String),
    /// A comment with its body.
    Comment(String),
    /// A doctype declaration.
    Doctype {
        /// The doctype name, if present.
        name: Option<String>,
        /// The public identifier, if present.
        public_id: Option<String>,
        /// The system identifier, if present.
        system_id: Option<String>,
    },
}

/// Create a lazy event iterator over `input`.
#[must_use]
pub fn events(input: &str, opts: &TokenizerOptions) -> Events {
    Events {
        tokenizer: Tokenizer::with_options(input, opts),
        text_buffer: String::new(),
        queued: None,
    }
}

/// Iterator produced by [`events`]. Tokenization happens on demand as the
/// caller pulls events.
pub struct Events {
    tokenizer: Tokenizer,
    text_buffer: String,
    // A non-text event held back while the preceding text flushes.
    queued: Option<Event>,
}

impl Events {
    /// The tokenizer errors recorded so far. Complete once the iterator
    /// has returned `None`.
    #[must_use]
    pub fn errors(&self) -> &[TokenizerError] {
        self.tokenizer.errors()
    }

    /// Consume the adapter and return the collected tokenizer errors.
    #[must_use]
    pub fn into_errors(self) -> Vec<TokenizerError> {
        self.tokenizer.into_errors()
    }

    fn flush_text(&mut self) -> Option<Event> {
        if self.text_buffer.is_empty() {
            None
        } else {
            Some(Event::Text(std::mem::take(&mut self.text_buffer)))
        }
    }
}

impl Iterator for Events {
    type Item = Event;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(event) = self.queued.take() {
            return Some(event);
        }

        loop {
            let Some(token) = self.tokenizer.next_token() else {
                return self.flush_text();
            };
            let event = match token {
                Token::Character { data } => {
                    self.text_buffer.push(data);
                    continue;
                }
                Token::EndOfFile => return self.flush_text(),
                Token::StartTag {
                    name,
                    attributes,
                    self_closing,
                } => Event::Start {
                    name,
                    attrs: attributes,
                    self_closing,
                },
                Token::EndTag { name, .. } => Event::End { name },
                Token::Comment { data } => Event::Comment(data),
                Token::Doctype {
                    name,
                    public_identifier,
                    system_identifier,
                    ..
                } => Event::Doctype {
                    name,
                    public_id: public_identifier,
                    system_id: system_identifier,
                },
            };

            // Accumulated text goes out first; the event waits its turn.
            if let Some(text) = self.flush_text() {
                self.queued = Some(event);
                return Some(text);
            }
            return Some(event);
        }
    }
}
