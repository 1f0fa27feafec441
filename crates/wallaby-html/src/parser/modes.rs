//! The per-insertion-mode token handlers.
//!
//! [§ 13.2.6.4 The rules for parsing tokens in HTML content](https://html.spec.whatwg.org/multipage/parsing.html#parsing-main-inhtml)
//!
//! Each handler consumes one token under one insertion mode and reports
//! whether the dispatch loop should reprocess it ([`ModeOutcome`]). The
//! shared algorithms (scopes, reconstruction, adoption agency, foster
//! parenting) live in `core`.

use wallaby_dom::{DoctypeData, Namespace, NodeId, NodeType};

use super::core::{ActiveFormattingElement, InsertionMode, ModeOutcome, Parser};
use super::error::TreeBuilderErrorKind;
use super::quirks::{QuirksMode, classify_doctype};
use crate::tokenizer::Token;

impl Parser {
    /// [§ 13.2.6.4.1 The "initial" insertion mode](https://html.spec.whatwg.org/multipage/parsing.html#the-initial-insertion-mode)
    pub(super) fn handle_initial_mode(&mut self, token: &Token) -> ModeOutcome {
        match token {
            Token::Character { data } if Self::is_parser_whitespace(*data) => {
                // "Ignore the token."
                ModeOutcome::Done
            }
            Token::Comment { data } => {
                self.insert_comment_on_document(data);
                ModeOutcome::Done
            }
            Token::Doctype {
                name,
                public_identifier,
                system_identifier,
                force_quirks,
            } => {
                // Anything but plain `<!DOCTYPE html>` (or the
                // about:legacy-compat form) is reported.
                if name.as_deref() != Some("html")
                    || public_identifier.is_some()
                    || system_identifier
                        .as_deref()
                        .is_some_and(|id| id != "about:legacy-compat")
                {
                    self.parse_error(TreeBuilderErrorKind::UnknownDoctype, None);
                }

                let doctype = self.tree.alloc(NodeType::Doctype(DoctypeData {
                    name: name.clone(),
                    public_id: public_identifier.clone(),
                    system_id: system_identifier.clone(),
                    force_quirks: *force_quirks,
                }));
                let root = self.tree.root();
                self.tree.append_child(root, doctype);

                self.quirks_mode = classify_doctype(
                    name.as_deref(),
                    public_identifier.as_deref(),
                    system_identifier.as_deref(),
                    *force_quirks,
                    self.iframe_srcdoc,
                );
                self.mode = InsertionMode::BeforeHtml;
                ModeOutcome::Done
            }
            _ => {
                // "If the document is not an iframe srcdoc document, then
                // this is a parse error; set the Document to quirks mode."
                if !self.iframe_srcdoc {
                    self.parse_error(TreeBuilderErrorKind::ExpectedDoctype, None);
                    self.quirks_mode = QuirksMode::Quirks;
                }
                ModeOutcome::reprocess_in(InsertionMode::BeforeHtml)
            }
        }
    }

    /// [§ 13.2.6.4.2 The "before html" insertion mode](https://html.spec.whatwg.org/multipage/parsing.html#the-before-html-insertion-mode)
    pub(super) fn handle_before_html_mode(&mut self, token: &Token) -> ModeOutcome {
        match token {
            Token::Doctype { .. } => {
                self.parse_error(TreeBuilderErrorKind::UnexpectedDoctype, None);
                ModeOutcome::Done
            }
            Token::Comment { data } => {
                self.insert_comment_on_document(data);
                ModeOutcome::Done
            }
            Token::Character { data } if Self::is_parser_whitespace(*data) => ModeOutcome::Done,
            Token::StartTag {
                name, attributes, ..
            } if name == "html" => {
                let element = self.create_element_for_token(name, attributes, Namespace::Html);
                let root = self.tree.root();
                self.tree.append_child(root, element);
                self.open_elements.push(element);
                self.mode = InsertionMode::BeforeHead;
                ModeOutcome::Done
            }
            Token::EndTag { name, .. }
                if !matches!(name.as_str(), "head" | "body" | "html" | "br") =>
            {
                self.parse_error(TreeBuilderErrorKind::UnexpectedEndTag, Some(name));
                ModeOutcome::Done
            }
            _ => {
                // "Create an html element whose node document is the
                // Document object. Append it to the Document object."
                let element = self.create_element_for_token("html", &[], Namespace::Html);
                let root = self.tree.root();
                self.tree.append_child(root, element);
                self.open_elements.push(element);
                ModeOutcome::reprocess_in(InsertionMode::BeforeHead)
            }
        }
    }

    /// [§ 13.2.6.4.3 The "before head" insertion mode](https://html.spec.whatwg.org/multipage/parsing.html#the-before-head-insertion-mode)
    pub(super) fn handle_before_head_mode(&mut self, token: &Token) -> ModeOutcome {
        match token {
            Token::Character { data } if Self::is_parser_whitespace(*data) => ModeOutcome::Done,
            Token::Comment { data } => {
                self.insert_comment(data);
                ModeOutcome::Done
            }
            Token::Doctype { .. } => {
                self.parse_error(TreeBuilderErrorKind::UnexpectedDoctype, None);
                ModeOutcome::Done
            }
            Token::StartTag { name, .. } if name == "html" => self.handle_in_body_mode(token),
            Token::StartTag { name, .. } if name == "head" => {
                let head = self.insert_html_element(token);
                self.head_element = Some(head);
                self.mode = InsertionMode::InHead;
                ModeOutcome::Done
            }
            Token::EndTag { name, .. }
                if !matches!(name.as_str(), "head" | "body" | "html" | "br") =>
            {
                self.parse_error(TreeBuilderErrorKind::UnexpectedEndTag, Some(name));
                ModeOutcome::Done
            }
            _ => {
                let head = self.insert_phantom_element("head");
                self.head_element = Some(head);
                ModeOutcome::reprocess_in(InsertionMode::InHead)
            }
        }
    }

    /// [§ 13.2.6.4.4 The "in head" insertion mode](https://html.spec.whatwg.org/multipage/parsing.html#parsing-main-inhead)
    pub(super) fn handle_in_head_mode(&mut self, token: &Token) -> ModeOutcome {
        match token {
            Token::Character { data } if Self::is_parser_whitespace(*data) => {
                self.insert_character(*data);
                ModeOutcome::Done
            }
            Token::Comment { data } => {
                self.insert_comment(data);
                ModeOutcome::Done
            }
            Token::Doctype { .. } => {
                self.parse_error(TreeBuilderErrorKind::UnexpectedDoctype, None);
                ModeOutcome::Done
            }
            Token::StartTag { name, .. } => match name.as_str() {
                "html" => self.handle_in_body_mode(token),
                "base" | "basefont" | "bgsound" | "link" | "meta" => {
                    let _ = self.insert_html_element(token);
                    let _ = self.open_elements.pop();
                    ModeOutcome::Done
                }
                // "Follow the generic RCDATA element parsing algorithm."
                "title" => {
                    self.parse_generic_text_element(token);
                    ModeOutcome::Done
                }
                // Scripting is off, so noscript children are parsed
                // normally, in their own mode.
                "noscript" => {
                    let _ = self.insert_html_element(token);
                    self.mode = InsertionMode::InHeadNoscript;
                    ModeOutcome::Done
                }
                "noframes" | "style" => {
                    self.parse_generic_text_element(token);
                    ModeOutcome::Done
                }
                "script" => {
                    self.parse_generic_text_element(token);
                    ModeOutcome::Done
                }
                "template" => {
                    let _ = self.insert_html_element(token);
                    self.push_formatting_marker();
                    self.frameset_ok = false;
                    self.mode = InsertionMode::InTemplate;
                    self.template_modes.push(InsertionMode::InTemplate);
                    ModeOutcome::Done
                }
                "head" => {
                    self.parse_error(TreeBuilderErrorKind::DuplicateHead, Some(name));
                    ModeOutcome::Done
                }
                _ => self.in_head_anything_else(),
            },
            Token::EndTag { name, .. } => match name.as_str() {
                "head" => {
                    let _ = self.open_elements.pop();
                    self.mode = InsertionMode::AfterHead;
                    ModeOutcome::Done
                }
                "template" => {
                    if !self
                        .open_elements
                        .iter()
                        .any(|&id| self.is_html_element(id, "template"))
                    {
                        self.parse_error(TreeBuilderErrorKind::UnexpectedEndTag, Some(name));
                        return ModeOutcome::Done;
                    }
                    self.generate_implied_end_tags_thoroughly();
                    if !self
                        .current_node()
                        .is_some_and(|id| self.is_html_element(id, "template"))
                    {
                        self.parse_error(TreeBuilderErrorKind::EndTagTooEarly, Some(name));
                    }
                    self.pop_until_html_tag("template");
                    self.clear_active_formatting_to_last_marker();
                    let _ = self.template_modes.pop();
                    self.reset_insertion_mode();
                    ModeOutcome::Done
                }
                "body" | "html" | "br" => self.in_head_anything_else(),
                _ => {
                    self.parse_error(TreeBuilderErrorKind::UnexpectedEndTag, Some(name));
                    ModeOutcome::Done
                }
            },
            _ => self.in_head_anything_else(),
        }
    }

    /// "Anything else": pop the head and let the after-head mode deal
    /// with it.
    fn in_head_anything_else(&mut self) -> ModeOutcome {
        let _ = self.open_elements.pop();
        ModeOutcome::reprocess_in(InsertionMode::AfterHead)
    }

    /// [§ 13.2.6.4.5 The "in head noscript" insertion mode](https://html.spec.whatwg.org/multipage/parsing.html#parsing-main-inheadnoscript)
    pub(super) fn handle_in_head_noscript_mode(&mut self, token: &Token) -> ModeOutcome {
        match token {
            Token::Doctype { .. } => {
                self.parse_error(TreeBuilderErrorKind::UnexpectedDoctype, None);
                ModeOutcome::Done
            }
            Token::StartTag { name, .. } if name == "html" => self.handle_in_body_mode(token),
            Token::EndTag { name, .. } if name == "noscript" => {
                let _ = self.open_elements.pop();
                self.mode = InsertionMode::InHead;
                ModeOutcome::Done
            }
            Token::Character { data } if Self::is_parser_whitespace(*data) => {
                self.handle_in_head_mode(token)
            }
            Token::Comment { .. } => self.handle_in_head_mode(token),
            Token::StartTag { name, .. }
                if matches!(
                    name.as_str(),
                    "basefont" | "bgsound" | "link" | "meta" | "noframes" | "style"
                ) =>
            {
                self.handle_in_head_mode(token)
            }
            Token::StartTag { name, .. } if matches!(name.as_str(), "head" | "noscript") => {
                self.parse_error(TreeBuilderErrorKind::UnexpectedStartTag, Some(name));
                ModeOutcome::Done
            }
            Token::EndTag { name, .. } if name != "br" => {
                self.parse_error(TreeBuilderErrorKind::UnexpectedEndTag, Some(name));
                ModeOutcome::Done
            }
            _ => {
                self.parse_error(TreeBuilderErrorKind::UnexpectedStartTag, None);
                let _ = self.open_elements.pop();
                ModeOutcome::reprocess_in(InsertionMode::InHead)
            }
        }
    }

    /// [§ 13.2.6.4.6 The "after head" insertion mode](https://html.spec.whatwg.org/multipage/parsing.html#the-after-head-insertion-mode)
    pub(super) fn handle_after_head_mode(&mut self, token: &Token) -> ModeOutcome {
        match token {
            // Form feeds are dropped here rather than inserted.
            Token::Character { data: '\x0C' } => ModeOutcome::Done,
            Token::Character { data } if Self::is_parser_whitespace(*data) => {
                self.insert_character(*data);
                ModeOutcome::Done
            }
            Token::Comment { data } => {
                self.insert_comment(data);
                ModeOutcome::Done
            }
            Token::Doctype { .. } => {
                self.parse_error(TreeBuilderErrorKind::UnexpectedDoctype, None);
                ModeOutcome::Done
            }
            Token::StartTag { name, .. } => match name.as_str() {
                "html" => self.handle_in_body_mode(token),
                "body" => {
                    let _ = self.insert_html_element(token);
                    self.frameset_ok = false;
                    self.mode = InsertionMode::InBody;
                    ModeOutcome::Done
                }
                "frameset" => {
                    let _ = self.insert_html_element(token);
                    self.mode = InsertionMode::InFrameset;
                    ModeOutcome::Done
                }
                // "Push the node pointed to by the head element pointer
                // onto the stack of open elements. Process the token using
                // the rules for the 'in head' insertion mode. Remove the
                // node... from the stack."
                "base" | "basefont" | "bgsound" | "link" | "meta" | "noframes" | "script"
                | "style" | "template" | "title" => {
                    self.parse_error(TreeBuilderErrorKind::UnexpectedStartTag, Some(name));
                    let Some(head) = self.head_element else {
                        return ModeOutcome::Done;
                    };
                    self.open_elements.push(head);
                    let outcome = self.handle_in_head_mode(token);
                    if let Some(pos) = self.open_elements.iter().position(|&id| id == head) {
                        let _ = self.open_elements.remove(pos);
                    }
                    outcome
                }
                "head" => {
                    self.parse_error(TreeBuilderErrorKind::DuplicateHead, Some(name));
                    ModeOutcome::Done
                }
                _ => self.after_head_anything_else(),
            },
            Token::EndTag { name, .. } => match name.as_str() {
                "template" => self.handle_in_head_mode(token),
                "body" | "html" | "br" => self.after_head_anything_else(),
                _ => {
                    self.parse_error(TreeBuilderErrorKind::UnexpectedEndTag, Some(name));
                    ModeOutcome::Done
                }
            },
            _ => self.after_head_anything_else(),
        }
    }

    fn after_head_anything_else(&mut self) -> ModeOutcome {
        let _ = self.insert_phantom_element("body");
        ModeOutcome::reprocess_in(InsertionMode::InBody)
    }

    /// [§ 13.2.6.4.7 The "in body" insertion mode](https://html.spec.whatwg.org/multipage/parsing.html#parsing-main-inbody)
    #[allow(clippy::too_many_lines)]
    pub(super) fn handle_in_body_mode(&mut self, token: &Token) -> ModeOutcome {
        match token {
            Token::Character { data } => {
                self.handle_in_body_character(*data);
                ModeOutcome::Done
            }
            Token::Comment { data } => {
                self.insert_comment(data);
                ModeOutcome::Done
            }
            Token::Doctype { .. } => {
                self.parse_error(TreeBuilderErrorKind::UnexpectedDoctype, None);
                ModeOutcome::Done
            }
            Token::StartTag {
                name,
                attributes,
                self_closing,
            } => {
                match name.as_str() {
                    "html" => {
                        self.parse_error(TreeBuilderErrorKind::UnexpectedStartTag, Some(name));
                        // "If there is a template element on the stack,
                        // ignore the token."
                        if self
                            .open_elements
                            .iter()
                            .any(|&id| self.is_html_element(id, "template"))
                        {
                            return ModeOutcome::Done;
                        }
                        if let Some(&root) = self.open_elements.first() {
                            self.merge_attributes_into(root, attributes);
                        }
                        ModeOutcome::Done
                    }
                    "base" | "basefont" | "bgsound" | "link" | "meta" | "noframes" | "script"
                    | "style" | "template" | "title" => self.handle_in_head_mode(token),
                    "body" => {
                        self.parse_error(TreeBuilderErrorKind::DuplicateBody, Some(name));
                        let second = self.open_elements.get(1).copied();
                        let body_ok = second.is_some_and(|id| self.is_html_element(id, "body"));
                        if !body_ok
                            || self
                                .open_elements
                                .iter()
                                .any(|&id| self.is_html_element(id, "template"))
                        {
                            return ModeOutcome::Done;
                        }
                        self.frameset_ok = false;
                        if let Some(body) = second {
                            self.merge_attributes_into(body, attributes);
                        }
                        ModeOutcome::Done
                    }
                    "frameset" => {
                        self.parse_error(TreeBuilderErrorKind::UnexpectedStartTag, Some(name));
                        let second = self.open_elements.get(1).copied();
                        let body_ok = second.is_some_and(|id| self.is_html_element(id, "body"));
                        if !body_ok || !self.frameset_ok {
                            return ModeOutcome::Done;
                        }
                        // "Remove the second element on the stack from its
                        // parent node... pop all the nodes from the bottom
                        // of the stack, from the current node up to, but
                        // not including, the root html element."
                        if let Some(body) = second {
                            self.tree.detach(body);
                        }
                        self.open_elements.truncate(1);
                        let _ = self.insert_html_element(token);
                        self.mode = InsertionMode::InFrameset;
                        ModeOutcome::Done
                    }
                    "address" | "article" | "aside" | "blockquote" | "center" | "details"
                    | "dialog" | "dir" | "div" | "dl" | "fieldset" | "figcaption" | "figure"
                    | "footer" | "header" | "hgroup" | "main" | "menu" | "nav" | "ol" | "p"
                    | "search" | "section" | "summary" | "ul" => {
                        if self.has_element_in_button_scope("p") {
                            self.close_p_element();
                        }
                        let _ = self.insert_html_element(token);
                        ModeOutcome::Done
                    }
                    "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                        if self.has_element_in_button_scope("p") {
                            self.close_p_element();
                        }
                        // "If the current node is an HTML element whose tag
                        // name is one of h1-h6, then this is a parse error;
                        // pop the current node."
                        if self.current_node().is_some_and(|id| {
                            self.tree.as_element(id).is_some_and(|e| {
                                e.namespace == Namespace::Html
                                    && matches!(
                                        e.tag_name.as_str(),
                                        "h1" | "h2" | "h3" | "h4" | "h5" | "h6"
                                    )
                            })
                        }) {
                            self.parse_error(TreeBuilderErrorKind::UnexpectedStartTag, Some(name));
                            let _ = self.open_elements.pop();
                        }
                        let _ = self.insert_html_element(token);
                        ModeOutcome::Done
                    }
                    "pre" | "listing" => {
                        if self.has_element_in_button_scope("p") {
                            self.close_p_element();
                        }
                        let _ = self.insert_html_element(token);
                        // "If the next token is a LF character token, then
                        // ignore that token."
                        self.ignore_lf = true;
                        self.frameset_ok = false;
                        ModeOutcome::Done
                    }
                    "form" => {
                        let template_open = self
                            .open_elements
                            .iter()
                            .any(|&id| self.is_html_element(id, "template"));
                        if self.form_element.is_some() && !template_open {
                            self.parse_error(TreeBuilderErrorKind::UnexpectedStartTag, Some(name));
                            return ModeOutcome::Done;
                        }
                        if self.has_element_in_button_scope("p") {
                            self.close_p_element();
                        }
                        let form = self.insert_html_element(token);
                        if !template_open {
                            self.form_element = Some(form);
                        }
                        ModeOutcome::Done
                    }
                    "li" => {
                        self.frameset_ok = false;
                        self.close_open_list_item(&["li"]);
                        if self.has_element_in_button_scope("p") {
                            self.close_p_element();
                        }
                        let _ = self.insert_html_element(token);
                        ModeOutcome::Done
                    }
                    "dd" | "dt" => {
                        self.frameset_ok = false;
                        self.close_open_list_item(&["dd", "dt"]);
                        if self.has_element_in_button_scope("p") {
                            self.close_p_element();
                        }
                        let _ = self.insert_html_element(token);
                        ModeOutcome::Done
                    }
                    "plaintext" => {
                        if self.has_element_in_button_scope("p") {
                            self.close_p_element();
                        }
                        let _ = self.insert_html_element(token);
                        // The tokenizer latched PLAINTEXT when it emitted
                        // this tag; make sure externally-driven tokenizers
                        // agree.
                        self.request_plaintext();
                        ModeOutcome::Done
                    }
                    "button" => {
                        if self.has_element_in_scope("button") {
                            self.parse_error(TreeBuilderErrorKind::UnexpectedStartTag, Some(name));
                            self.generate_implied_end_tags(None);
                            self.pop_until_html_tag("button");
                        }
                        self.reconstruct_active_formatting_elements();
                        let _ = self.insert_html_element(token);
                        self.frameset_ok = false;
                        ModeOutcome::Done
                    }
                    "a" => {
                        // "If the list of active formatting elements
                        // contains an a element between the end of the list
                        // and the last marker..."
                        let existing = self.find_formatting_element_after_marker("a");
                        if let Some(node_id) = existing {
                            self.parse_error(TreeBuilderErrorKind::UnexpectedStartTag, Some(name));
                            self.run_adoption_agency("a");
                            self.remove_from_active_formatting(node_id);
                            if let Some(pos) =
                                self.open_elements.iter().position(|&id| id == node_id)
                            {
                                let _ = self.open_elements.remove(pos);
                            }
                        }
                        self.reconstruct_active_formatting_elements();
                        let element = self.insert_html_element(token);
                        self.push_active_formatting_element(element, token);
                        ModeOutcome::Done
                    }
                    "b" | "big" | "code" | "em" | "font" | "i" | "s" | "small" | "strike"
                    | "strong" | "tt" | "u" => {
                        self.reconstruct_active_formatting_elements();
                        let element = self.insert_html_element(token);
                        self.push_active_formatting_element(element, token);
                        ModeOutcome::Done
                    }
                    "nobr" => {
                        self.reconstruct_active_formatting_elements();
                        if self.has_element_in_scope("nobr") {
                            self.parse_error(TreeBuilderErrorKind::UnexpectedStartTag, Some(name));
                            self.run_adoption_agency("nobr");
                            self.reconstruct_active_formatting_elements();
                        }
                        let element = self.insert_html_element(token);
                        self.push_active_formatting_element(element, token);
                        ModeOutcome::Done
                    }
                    "applet" | "marquee" | "object" => {
                        self.reconstruct_active_formatting_elements();
                        let _ = self.insert_html_element(token);
                        self.push_formatting_marker();
                        self.frameset_ok = false;
                        ModeOutcome::Done
                    }
                    "table" => {
                        // In quirks mode the table does not close an open p.
                        if self.quirks_mode != super::quirks::QuirksMode::Quirks
                            && self.has_element_in_button_scope("p")
                        {
                            self.close_p_element();
                        }
                        let _ = self.insert_html_element(token);
                        self.frameset_ok = false;
                        self.mode = InsertionMode::InTable;
                        ModeOutcome::Done
                    }
                    "area" | "br" | "embed" | "img" | "keygen" | "wbr" => {
                        self.reconstruct_active_formatting_elements();
                        let _ = self.insert_html_element(token);
                        let _ = self.open_elements.pop();
                        self.frameset_ok = false;
                        ModeOutcome::Done
                    }
                    "input" => {
                        self.reconstruct_active_formatting_elements();
                        let _ = self.insert_html_element(token);
                        let _ = self.open_elements.pop();
                        let hidden = attributes
                            .iter()
                            .find(|attr| attr.name == "type")
                            .is_some_and(|attr| attr.value.eq_ignore_ascii_case("hidden"));
                        if !hidden {
                            self.frameset_ok = false;
                        }
                        ModeOutcome::Done
                    }
                    "param" | "source" | "track" => {
                        let _ = self.insert_html_element(token);
                        let _ = self.open_elements.pop();
                        ModeOutcome::Done
                    }
                    "hr" => {
                        if self.has_element_in_button_scope("p") {
                            self.close_p_element();
                        }
                        let _ = self.insert_html_element(token);
                        let _ = self.open_elements.pop();
                        self.frameset_ok = false;
                        ModeOutcome::Done
                    }
                    // "Parse error. Act as described in the 'anything else'
                    // entry, but with the tag name 'img'."
                    "image" => {
                        self.parse_error(TreeBuilderErrorKind::UnexpectedStartTag, Some(name));
                        ModeOutcome::reprocess_token(Token::StartTag {
                            name: "img".to_string(),
                            self_closing: *self_closing,
                            attributes: attributes.clone(),
                        })
                    }
                    "textarea" => {
                        let _ = self.insert_html_element(token);
                        self.ignore_lf = true;
                        self.frameset_ok = false;
                        // Tokenizer is already in RCDATA; park in text mode.
                        self.original_mode = Some(self.mode);
                        self.mode = InsertionMode::Text;
                        ModeOutcome::Done
                    }
                    "xmp" => {
                        if self.has_element_in_button_scope("p") {
                            self.close_p_element();
                        }
                        self.reconstruct_active_formatting_elements();
                        self.frameset_ok = false;
                        self.parse_generic_text_element(token);
                        ModeOutcome::Done
                    }
                    "iframe" => {
                        self.frameset_ok = false;
                        self.parse_generic_text_element(token);
                        ModeOutcome::Done
                    }
                    "noembed" => {
                        self.parse_generic_text_element(token);
                        ModeOutcome::Done
                    }
                    "select" => {
                        self.reconstruct_active_formatting_elements();
                        let _ = self.insert_html_element(token);
                        self.frameset_ok = false;
                        self.mode = InsertionMode::InSelect;
                        ModeOutcome::Done
                    }
                    "option" | "optgroup" => {
                        if self
                            .current_node()
                            .is_some_and(|id| self.is_html_element(id, "option"))
                        {
                            let _ = self.open_elements.pop();
                        }
                        self.reconstruct_active_formatting_elements();
                        let _ = self.insert_html_element(token);
                        ModeOutcome::Done
                    }
                    "rb" | "rtc" => {
                        if self.has_element_in_scope("ruby") {
                            self.generate_implied_end_tags(None);
                            if !self
                                .current_node()
                                .is_some_and(|id| self.is_html_element(id, "ruby"))
                            {
                                self.parse_error(
                                    TreeBuilderErrorKind::UnexpectedStartTag,
                                    Some(name),
                                );
                            }
                        }
                        let _ = self.insert_html_element(token);
                        ModeOutcome::Done
                    }
                    "rp" | "rt" => {
                        if self.has_element_in_scope("ruby") {
                            self.generate_implied_end_tags(Some("rtc"));
                            if !self.current_node().is_some_and(|id| {
                                self.is_html_element(id, "ruby")
                                    || self.is_html_element(id, "rtc")
                            }) {
                                self.parse_error(
                                    TreeBuilderErrorKind::UnexpectedStartTag,
                                    Some(name),
                                );
                            }
                        }
                        let _ = self.insert_html_element(token);
                        ModeOutcome::Done
                    }
                    "math" => {
                        self.reconstruct_active_formatting_elements();
                        let _ = self.insert_foreign_element(name, attributes, Namespace::MathMl);
                        if *self_closing {
                            let _ = self.open_elements.pop();
                        }
                        ModeOutcome::Done
                    }
                    "svg" => {
                        self.reconstruct_active_formatting_elements();
                        let _ = self.insert_foreign_element(name, attributes, Namespace::Svg);
                        if *self_closing {
                            let _ = self.open_elements.pop();
                        }
                        ModeOutcome::Done
                    }
                    "caption" | "col" | "colgroup" | "frame" | "head" | "tbody" | "td"
                    | "tfoot" | "th" | "thead" | "tr" => {
                        self.parse_error(TreeBuilderErrorKind::UnexpectedStartTag, Some(name));
                        ModeOutcome::Done
                    }
                    _ => {
                        self.reconstruct_active_formatting_elements();
                        let _ = self.insert_html_element(token);
                        ModeOutcome::Done
                    }
                }
            }
            Token::EndTag { name, .. } => match name.as_str() {
                "template" => self.handle_in_head_mode(token),
                "body" => {
                    if !self.has_element_in_scope("body") {
                        self.parse_error(TreeBuilderErrorKind::UnexpectedEndTag, Some(name));
                        return ModeOutcome::Done;
                    }
                    self.check_for_open_elements_at_body_end();
                    self.mode = InsertionMode::AfterBody;
                    ModeOutcome::Done
                }
                "html" => {
                    if !self.has_element_in_scope("body") {
                        self.parse_error(TreeBuilderErrorKind::UnexpectedEndTag, Some(name));
                        return ModeOutcome::Done;
                    }
                    self.check_for_open_elements_at_body_end();
                    ModeOutcome::reprocess_in(InsertionMode::AfterBody)
                }
                "address" | "article" | "aside" | "blockquote" | "button" | "center"
                | "details" | "dialog" | "dir" | "div" | "dl" | "fieldset" | "figcaption"
                | "figure" | "footer" | "header" | "hgroup" | "listing" | "main" | "menu"
                | "nav" | "ol" | "pre" | "search" | "section" | "summary" | "ul" => {
                    if !self.has_element_in_scope(name) {
                        self.parse_error(TreeBuilderErrorKind::UnexpectedEndTag, Some(name));
                        return ModeOutcome::Done;
                    }
                    self.generate_implied_end_tags(None);
                    if !self
                        .current_node()
                        .is_some_and(|id| self.is_html_element(id, name))
                    {
                        self.parse_error(TreeBuilderErrorKind::EndTagTooEarly, Some(name));
                    }
                    self.pop_until_html_tag(name);
                    ModeOutcome::Done
                }
                "form" => {
                    self.handle_form_end_tag();
                    ModeOutcome::Done
                }
                "p" => {
                    if !self.has_element_in_button_scope("p") {
                        self.parse_error(TreeBuilderErrorKind::UnexpectedEndTag, Some(name));
                        let _ = self.insert_phantom_element("p");
                    }
                    self.close_p_element();
                    ModeOutcome::Done
                }
                "li" => {
                    if !self.has_element_in_list_item_scope("li") {
                        self.parse_error(TreeBuilderErrorKind::UnexpectedEndTag, Some(name));
                        return ModeOutcome::Done;
                    }
                    self.generate_implied_end_tags(Some("li"));
                    if !self
                        .current_node()
                        .is_some_and(|id| self.is_html_element(id, "li"))
                    {
                        self.parse_error(TreeBuilderErrorKind::EndTagTooEarly, Some(name));
                    }
                    self.pop_until_html_tag("li");
                    ModeOutcome::Done
                }
                "dd" | "dt" => {
                    if !self.has_element_in_scope(name) {
                        self.parse_error(TreeBuilderErrorKind::UnexpectedEndTag, Some(name));
                        return ModeOutcome::Done;
                    }
                    self.generate_implied_end_tags(Some(name));
                    if !self
                        .current_node()
                        .is_some_and(|id| self.is_html_element(id, name))
                    {
                        self.parse_error(TreeBuilderErrorKind::EndTagTooEarly, Some(name));
                    }
                    self.pop_until_html_tag(name);
                    ModeOutcome::Done
                }
                "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                    if !self.has_any_element_in_scope(&["h1", "h2", "h3", "h4", "h5", "h6"]) {
                        self.parse_error(TreeBuilderErrorKind::UnexpectedEndTag, Some(name));
                        return ModeOutcome::Done;
                    }
                    self.generate_implied_end_tags(None);
                    if !self
                        .current_node()
                        .is_some_and(|id| self.is_html_element(id, name))
                    {
                        self.parse_error(TreeBuilderErrorKind::EndTagTooEarly, Some(name));
                    }
                    self.pop_until_one_of(&["h1", "h2", "h3", "h4", "h5", "h6"]);
                    ModeOutcome::Done
                }
                "a" | "b" | "big" | "code" | "em" | "font" | "i" | "nobr" | "s" | "small"
                | "strike" | "strong" | "tt" | "u" => {
                    self.run_adoption_agency(name);
                    ModeOutcome::Done
                }
                "applet" | "marquee" | "object" => {
                    if !self.has_element_in_scope(name) {
                        self.parse_error(TreeBuilderErrorKind::UnexpectedEndTag, Some(name));
                        return ModeOutcome::Done;
                    }
                    self.generate_implied_end_tags(None);
                    if !self
                        .current_node()
                        .is_some_and(|id| self.is_html_element(id, name))
                    {
                        self.parse_error(TreeBuilderErrorKind::EndTagTooEarly, Some(name));
                    }
                    self.pop_until_html_tag(name);
                    self.clear_active_formatting_to_last_marker();
                    ModeOutcome::Done
                }
                // "Parse error. Drop the attributes from the token, and act
                // as described in the next entry; i.e. act as if this was a
                // 'br' start tag token with no attributes."
                "br" => {
                    self.parse_error(TreeBuilderErrorKind::UnexpectedEndTag, Some(name));
                    self.reconstruct_active_formatting_elements();
                    let _ = self.insert_phantom_element("br");
                    let _ = self.open_elements.pop();
                    self.frameset_ok = false;
                    ModeOutcome::Done
                }
                _ => {
                    self.any_other_end_tag(name);
                    ModeOutcome::Done
                }
            },
            Token::EndOfFile => {
                if !self.template_modes.is_empty() {
                    return self.handle_in_template_mode(token);
                }
                self.check_for_open_elements_at_body_end();
                self.stop_parsing();
                ModeOutcome::Done
            }
        }
    }

    /// The in-body character rule, shared with the table-text flush.
    pub(super) fn handle_in_body_character(&mut self, c: char) {
        if c == '\0' {
            self.parse_error(TreeBuilderErrorKind::NullCharacter, None);
            return;
        }
        self.reconstruct_active_formatting_elements();
        self.insert_character(c);
        if !Self::is_parser_whitespace(c) {
            self.frameset_ok = false;
        }
    }

    /// "If there is a node in the stack of open elements that is not
    /// either a dd element, a dt element, ... then this is a parse error."
    fn check_for_open_elements_at_body_end(&mut self) {
        let offending = self.open_elements.iter().any(|&id| {
            !matches!(
                self.tree.as_element(id),
                Some(element)
                    if element.namespace == Namespace::Html
                        && matches!(
                            element.tag_name.as_str(),
                            "dd" | "dt" | "li" | "optgroup" | "option" | "p" | "rb" | "rp"
                                | "rt" | "rtc" | "tbody" | "td" | "tfoot" | "th" | "thead"
                                | "tr" | "body" | "html"
                        )
            )
        });
        if offending {
            self.parse_error(TreeBuilderErrorKind::UnexpectedEof, None);
        }
    }

    /// The shared li / dd / dt start tag loop: close an open item of the
    /// same family, stopping at special elements other than address, div,
    /// and p.
    fn close_open_list_item(&mut self, family: &[&str]) {
        for index in (0..self.open_elements.len()).rev() {
            let node_id = self.open_elements[index];
            let Some(element) = self.tree.as_element(node_id) else {
                continue;
            };
            let namespace = element.namespace;
            let name = element.tag_name.clone();
            if namespace == Namespace::Html && family.contains(&name.as_str()) {
                self.generate_implied_end_tags(Some(&name));
                if !self
                    .current_node()
                    .is_some_and(|id| self.is_html_element(id, &name))
                {
                    self.parse_error(TreeBuilderErrorKind::EndTagTooEarly, Some(&name));
                }
                self.pop_until_html_tag(&name);
                return;
            }
            if Self::is_special_element(namespace, &name)
                && !matches!(name.as_str(), "address" | "div" | "p")
            {
                return;
            }
        }
    }

    fn find_formatting_element_after_marker(&self, tag: &str) -> Option<NodeId> {
        for entry in self.active_formatting.iter().rev() {
            match entry {
                ActiveFormattingElement::Marker => return None,
                ActiveFormattingElement::Element { node_id, token } => {
                    if token.tag_name() == Some(tag) {
                        return Some(*node_id);
                    }
                }
            }
        }
        None
    }

    fn remove_from_active_formatting(&mut self, node_id: NodeId) {
        self.active_formatting.retain(|entry| {
            !matches!(
                entry,
                ActiveFormattingElement::Element { node_id: id, .. } if *id == node_id
            )
        });
    }

    /// The two `</form>` flavors: pointer-based outside templates,
    /// scope-based inside.
    fn handle_form_end_tag(&mut self) {
        let template_open = self
            .open_elements
            .iter()
            .any(|&id| self.is_html_element(id, "template"));

        if template_open {
            if !self.has_element_in_scope("form") {
                self.parse_error(TreeBuilderErrorKind::UnexpectedEndTag, Some("form"));
                return;
            }
            self.generate_implied_end_tags(None);
            if !self
                .current_node()
                .is_some_and(|id| self.is_html_element(id, "form"))
            {
                self.parse_error(TreeBuilderErrorKind::EndTagTooEarly, Some("form"));
            }
            self.pop_until_html_tag("form");
            return;
        }

        let node = self.form_element.take();
        let Some(node) = node else {
            self.parse_error(TreeBuilderErrorKind::UnexpectedEndTag, Some("form"));
            return;
        };
        if !self.has_element_in_scope("form") {
            self.parse_error(TreeBuilderErrorKind::UnexpectedEndTag, Some("form"));
            return;
        }
        self.generate_implied_end_tags(None);
        if self.current_node() != Some(node) {
            self.parse_error(TreeBuilderErrorKind::EndTagTooEarly, Some("form"));
        }
        // The form element is removed from the stack wherever it sits; the
        // elements above it stay open.
        if let Some(pos) = self.open_elements.iter().position(|&id| id == node) {
            let _ = self.open_elements.remove(pos);
        }
    }

    /// [§ 13.2.6.4.8 The "text" insertion mode](https://html.spec.whatwg.org/multipage/parsing.html#parsing-main-incdata)
    pub(super) fn handle_text_mode(&mut self, token: &Token) -> ModeOutcome {
        match token {
            Token::Character { data } => {
                self.insert_character(*data);
                ModeOutcome::Done
            }
            Token::EndOfFile => {
                self.parse_error(TreeBuilderErrorKind::UnexpectedEof, None);
                let _ = self.open_elements.pop();
                let mode = self.original_mode.take().unwrap_or(InsertionMode::InBody);
                ModeOutcome::reprocess_in(mode)
            }
            Token::EndTag { .. } => {
                let _ = self.open_elements.pop();
                self.mode = self.original_mode.take().unwrap_or(InsertionMode::InBody);
                ModeOutcome::Done
            }
            _ => ModeOutcome::Done,
        }
    }

    /// [§ 13.2.6.4.9 The "in table" insertion mode](https://html.spec.whatwg.org/multipage/parsing.html#parsing-main-intable)
    pub(super) fn handle_in_table_mode(&mut self, token: &Token) -> ModeOutcome {
        match token {
            Token::Character { .. } => {
                // "If the current node is table, tbody, template, tfoot,
                // thead, or tr: let the pending table character tokens be
                // an empty list... switch the insertion mode to 'in table
                // text' and reprocess the token."
                if matches!(
                    self.current_node()
                        .and_then(|id| self.tree.as_element(id))
                        .filter(|e| e.namespace == Namespace::Html)
                        .map(|e| e.tag_name.as_str()),
                    Some("table" | "tbody" | "template" | "tfoot" | "thead" | "tr")
                ) {
                    self.pending_table_text.clear();
                    self.table_text_original_mode = Some(self.mode);
                    return ModeOutcome::reprocess_in(InsertionMode::InTableText);
                }
                self.in_table_anything_else(token)
            }
            Token::Comment { data } => {
                self.insert_comment(data);
                ModeOutcome::Done
            }
            Token::Doctype { .. } => {
                self.parse_error(TreeBuilderErrorKind::UnexpectedDoctype, None);
                ModeOutcome::Done
            }
            Token::StartTag {
                name, attributes, ..
            } => match name.as_str() {
                "caption" => {
                    self.clear_stack_back_to_table_context();
                    self.push_formatting_marker();
                    let _ = self.insert_html_element(token);
                    self.mode = InsertionMode::InCaption;
                    ModeOutcome::Done
                }
                "colgroup" => {
                    self.clear_stack_back_to_table_context();
                    let _ = self.insert_html_element(token);
                    self.mode = InsertionMode::InColumnGroup;
                    ModeOutcome::Done
                }
                "col" => {
                    self.clear_stack_back_to_table_context();
                    let _ = self.insert_phantom_element("colgroup");
                    ModeOutcome::reprocess_in(InsertionMode::InColumnGroup)
                }
                "tbody" | "tfoot" | "thead" => {
                    self.clear_stack_back_to_table_context();
                    let _ = self.insert_html_element(token);
                    self.mode = InsertionMode::InTableBody;
                    ModeOutcome::Done
                }
                "td" | "th" | "tr" => {
                    self.clear_stack_back_to_table_context();
                    let _ = self.insert_phantom_element("tbody");
                    ModeOutcome::reprocess_in(InsertionMode::InTableBody)
                }
                "table" => {
                    self.parse_error(TreeBuilderErrorKind::UnexpectedStartTag, Some(name));
                    if !self.has_element_in_table_scope("table") {
                        return ModeOutcome::Done;
                    }
                    self.pop_until_html_tag("table");
                    self.reset_insertion_mode();
                    ModeOutcome::reprocess()
                }
                "style" | "script" | "template" => self.handle_in_head_mode(token),
                "input" => {
                    let hidden = attributes
                        .iter()
                        .find(|attr| attr.name == "type")
                        .is_some_and(|attr| attr.value.eq_ignore_ascii_case("hidden"));
                    if hidden {
                        self.parse_error(TreeBuilderErrorKind::UnexpectedStartTag, Some(name));
                        let _ = self.insert_html_element(token);
                        let _ = self.open_elements.pop();
                        ModeOutcome::Done
                    } else {
                        self.in_table_anything_else(token)
                    }
                }
                "form" => {
                    self.parse_error(TreeBuilderErrorKind::UnexpectedStartTag, Some(name));
                    let template_open = self
                        .open_elements
                        .iter()
                        .any(|&id| self.is_html_element(id, "template"));
                    if template_open || self.form_element.is_some() {
                        return ModeOutcome::Done;
                    }
                    let form = self.insert_html_element(token);
                    self.form_element = Some(form);
                    let _ = self.open_elements.pop();
                    ModeOutcome::Done
                }
                _ => self.in_table_anything_else(token),
            },
            Token::EndTag { name, .. } => match name.as_str() {
                "table" => {
                    if !self.has_element_in_table_scope("table") {
                        self.parse_error(TreeBuilderErrorKind::UnexpectedEndTag, Some(name));
                        return ModeOutcome::Done;
                    }
                    self.pop_until_html_tag("table");
                    self.reset_insertion_mode();
                    ModeOutcome::Done
                }
                "body" | "caption" | "col" | "colgroup" | "html" | "tbody" | "td" | "tfoot"
                | "th" | "thead" | "tr" => {
                    self.parse_error(TreeBuilderErrorKind::UnexpectedEndTag, Some(name));
                    ModeOutcome::Done
                }
                "template" => self.handle_in_head_mode(token),
                _ => self.in_table_anything_else(token),
            },
            Token::EndOfFile => self.handle_in_body_mode(token),
        }
    }

    /// "Anything else": parse error; enable foster parenting, process the
    /// token using the rules for the 'in body' insertion mode, and then
    /// disable it again.
    fn in_table_anything_else(&mut self, token: &Token) -> ModeOutcome {
        match token {
            Token::StartTag { name, .. } => {
                self.parse_error(TreeBuilderErrorKind::UnexpectedStartTag, Some(name));
            }
            Token::EndTag { name, .. } => {
                self.parse_error(TreeBuilderErrorKind::UnexpectedEndTag, Some(name));
            }
            _ => self.parse_error(TreeBuilderErrorKind::UnexpectedCharacter, None),
        }
        self.foster_parenting = true;
        let outcome = self.handle_in_body_mode(token);
        self.foster_parenting = false;
        outcome
    }

    /// [§ 13.2.6.4.10 The "in table text" insertion mode](https://html.spec.whatwg.org/multipage/parsing.html#parsing-main-intabletext)
    pub(super) fn handle_in_table_text_mode(&mut self, token: &Token) -> ModeOutcome {
        match token {
            Token::Character { data: '\0' } => {
                self.parse_error(TreeBuilderErrorKind::NullCharacter, None);
                ModeOutcome::Done
            }
            // Form feeds in table text are dropped outright.
            Token::Character { data: '\x0C' } => ModeOutcome::Done,
            Token::Character { data } => {
                self.pending_table_text.push(*data);
                ModeOutcome::Done
            }
            _ => {
                self.flush_pending_table_text();
                let mode = self
                    .table_text_original_mode
                    .take()
                    .unwrap_or(InsertionMode::InTable);
                ModeOutcome::reprocess_in(mode)
            }
        }
    }

    /// "If any of the tokens in the pending table character tokens list
    /// are character tokens that are not ASCII whitespace, then this is a
    /// parse error: reprocess [them] using the rules given in the
    /// 'anything else' entry in the 'in table' insertion mode" (foster
    /// parenting). "Otherwise, insert the characters."
    fn flush_pending_table_text(&mut self) {
        let chars = std::mem::take(&mut self.pending_table_text);
        if chars.is_empty() {
            return;
        }
        if chars.iter().copied().all(Self::is_parser_whitespace) {
            for c in chars {
                self.insert_character(c);
            }
        } else {
            self.parse_error(TreeBuilderErrorKind::FosterParentingCharacter, None);
            self.foster_parenting = true;
            for c in chars {
                self.handle_in_body_character(c);
            }
            self.foster_parenting = false;
        }
    }

    /// [§ 13.2.6.4.11 The "in caption" insertion mode](https://html.spec.whatwg.org/multipage/parsing.html#parsing-main-incaption)
    pub(super) fn handle_in_caption_mode(&mut self, token: &Token) -> ModeOutcome {
        match token {
            Token::EndTag { name, .. } if name == "caption" => {
                let _ = self.close_caption();
                ModeOutcome::Done
            }
            Token::StartTag { name, .. }
                if matches!(
                    name.as_str(),
                    "caption" | "col" | "colgroup" | "tbody" | "td" | "tfoot" | "th" | "thead"
                        | "tr"
                ) =>
            {
                if self.close_caption() {
                    ModeOutcome::reprocess()
                } else {
                    ModeOutcome::Done
                }
            }
            Token::EndTag { name, .. } if name == "table" => {
                if self.close_caption() {
                    ModeOutcome::reprocess()
                } else {
                    ModeOutcome::Done
                }
            }
            Token::EndTag { name, .. }
                if matches!(
                    name.as_str(),
                    "body" | "col" | "colgroup" | "html" | "tbody" | "td" | "tfoot" | "th"
                        | "thead" | "tr"
                ) =>
            {
                self.parse_error(TreeBuilderErrorKind::UnexpectedEndTag, Some(name));
                ModeOutcome::Done
            }
            _ => self.handle_in_body_mode(token),
        }
    }

    /// Close an open caption; false when there is none in table scope.
    fn close_caption(&mut self) -> bool {
        if !self.has_element_in_table_scope("caption") {
            self.parse_error(TreeBuilderErrorKind::UnexpectedEndTag, Some("caption"));
            return false;
        }
        self.generate_implied_end_tags(None);
        if !self
            .current_node()
            .is_some_and(|id| self.is_html_element(id, "caption"))
        {
            self.parse_error(TreeBuilderErrorKind::EndTagTooEarly, Some("caption"));
        }
        self.pop_until_html_tag("caption");
        self.clear_active_formatting_to_last_marker();
        self.mode = InsertionMode::InTable;
        true
    }

    /// [§ 13.2.6.4.12 The "in column group" insertion mode](https://html.spec.whatwg.org/multipage/parsing.html#parsing-main-incolumngroup)
    pub(super) fn handle_in_column_group_mode(&mut self, token: &Token) -> ModeOutcome {
        match token {
            Token::Character { data } if Self::is_parser_whitespace(*data) => {
                self.insert_character(*data);
                ModeOutcome::Done
            }
            Token::Comment { data } => {
                self.insert_comment(data);
                ModeOutcome::Done
            }
            Token::Doctype { .. } => {
                self.parse_error(TreeBuilderErrorKind::UnexpectedDoctype, None);
                ModeOutcome::Done
            }
            Token::StartTag { name, .. } if name == "html" => self.handle_in_body_mode(token),
            Token::StartTag { name, .. } if name == "col" => {
                let _ = self.insert_html_element(token);
                let _ = self.open_elements.pop();
                ModeOutcome::Done
            }
            Token::EndTag { name, .. } if name == "colgroup" => {
                if !self
                    .current_node()
                    .is_some_and(|id| self.is_html_element(id, "colgroup"))
                {
                    self.parse_error(TreeBuilderErrorKind::UnexpectedEndTag, Some(name));
                    return ModeOutcome::Done;
                }
                let _ = self.open_elements.pop();
                self.mode = InsertionMode::InTable;
                ModeOutcome::Done
            }
            Token::EndTag { name, .. } if name == "col" => {
                self.parse_error(TreeBuilderErrorKind::UnexpectedEndTag, Some(name));
                ModeOutcome::Done
            }
            Token::StartTag { name, .. } if name == "template" => self.handle_in_head_mode(token),
            Token::EndTag { name, .. } if name == "template" => self.handle_in_head_mode(token),
            Token::EndOfFile => self.handle_in_body_mode(token),
            _ => {
                if !self
                    .current_node()
                    .is_some_and(|id| self.is_html_element(id, "colgroup"))
                {
                    self.parse_error(TreeBuilderErrorKind::UnexpectedStartTag, None);
                    return ModeOutcome::Done;
                }
                let _ = self.open_elements.pop();
                ModeOutcome::reprocess_in(InsertionMode::InTable)
            }
        }
    }

    /// [§ 13.2.6.4.13 The "in table body" insertion mode](https://html.spec.whatwg.org/multipage/parsing.html#parsing-main-intablebody)
    pub(super) fn handle_in_table_body_mode(&mut self, token: &Token) -> ModeOutcome {
        match token {
            Token::StartTag { name, .. } if name == "tr" => {
                self.clear_stack_back_to_table_body_context();
                let _ = self.insert_html_element(token);
                self.mode = InsertionMode::InRow;
                ModeOutcome::Done
            }
            Token::StartTag { name, .. } if matches!(name.as_str(), "th" | "td") => {
                self.parse_error(TreeBuilderErrorKind::UnexpectedStartTag, Some(name));
                self.clear_stack_back_to_table_body_context();
                let _ = self.insert_phantom_element("tr");
                ModeOutcome::reprocess_in(InsertionMode::InRow)
            }
            Token::EndTag { name, .. }
                if matches!(name.as_str(), "tbody" | "tfoot" | "thead") =>
            {
                if !self.has_element_in_table_scope(name) {
                    self.parse_error(TreeBuilderErrorKind::UnexpectedEndTag, Some(name));
                    return ModeOutcome::Done;
                }
                self.clear_stack_back_to_table_body_context();
                let _ = self.open_elements.pop();
                self.mode = InsertionMode::InTable;
                ModeOutcome::Done
            }
            Token::StartTag { name, .. }
                if matches!(
                    name.as_str(),
                    "caption" | "col" | "colgroup" | "tbody" | "tfoot" | "thead"
                ) =>
            {
                self.close_table_body_for_reprocess(token)
            }
            Token::EndTag { name, .. } if name == "table" => {
                self.close_table_body_for_reprocess(token)
            }
            Token::EndTag { name, .. }
                if matches!(
                    name.as_str(),
                    "body" | "caption" | "col" | "colgroup" | "html" | "td" | "th" | "tr"
                ) =>
            {
                self.parse_error(TreeBuilderErrorKind::UnexpectedEndTag, Some(name));
                ModeOutcome::Done
            }
            _ => self.handle_in_table_mode(token),
        }
    }

    fn close_table_body_for_reprocess(&mut self, token: &Token) -> ModeOutcome {
        if !self.has_element_in_table_scope("tbody")
            && !self.has_element_in_table_scope("thead")
            && !self.has_element_in_table_scope("tfoot")
        {
            self.parse_error(
                TreeBuilderErrorKind::UnexpectedEndTag,
                token.tag_name(),
            );
            return ModeOutcome::Done;
        }
        self.clear_stack_back_to_table_body_context();
        let _ = self.open_elements.pop();
        ModeOutcome::reprocess_in(InsertionMode::InTable)
    }

    /// [§ 13.2.6.4.14 The "in row" insertion mode](https://html.spec.whatwg.org/multipage/parsing.html#parsing-main-inrow)
    pub(super) fn handle_in_row_mode(&mut self, token: &Token) -> ModeOutcome {
        match token {
            Token::StartTag { name, .. } if matches!(name.as_str(), "th" | "td") => {
                self.clear_stack_back_to_table_row_context();
                let _ = self.insert_html_element(token);
                self.mode = InsertionMode::InCell;
                self.push_formatting_marker();
                ModeOutcome::Done
            }
            Token::EndTag { name, .. } if name == "tr" => {
                if !self.has_element_in_table_scope("tr") {
                    self.parse_error(TreeBuilderErrorKind::UnexpectedEndTag, Some(name));
                    return ModeOutcome::Done;
                }
                self.clear_stack_back_to_table_row_context();
                let _ = self.open_elements.pop();
                self.mode = InsertionMode::InTableBody;
                ModeOutcome::Done
            }
            Token::StartTag { name, .. }
                if matches!(
                    name.as_str(),
                    "caption" | "col" | "colgroup" | "tbody" | "tfoot" | "thead" | "tr"
                ) =>
            {
                self.close_row_for_reprocess(token)
            }
            Token::EndTag { name, .. } if name == "table" => self.close_row_for_reprocess(token),
            Token::EndTag { name, .. }
                if matches!(name.as_str(), "tbody" | "tfoot" | "thead") =>
            {
                if !self.has_element_in_table_scope(name) {
                    self.parse_error(TreeBuilderErrorKind::UnexpectedEndTag, Some(name));
                    return ModeOutcome::Done;
                }
                self.close_row_for_reprocess(token)
            }
            Token::EndTag { name, .. }
                if matches!(
                    name.as_str(),
                    "body" | "caption" | "col" | "colgroup" | "html" | "td" | "th"
                ) =>
            {
                self.parse_error(TreeBuilderErrorKind::UnexpectedEndTag, Some(name));
                ModeOutcome::Done
            }
            _ => self.handle_in_table_mode(token),
        }
    }

    fn close_row_for_reprocess(&mut self, token: &Token) -> ModeOutcome {
        if !self.has_element_in_table_scope("tr") {
            self.parse_error(TreeBuilderErrorKind::UnexpectedEndTag, token.tag_name());
            return ModeOutcome::Done;
        }
        self.clear_stack_back_to_table_row_context();
        let _ = self.open_elements.pop();
        ModeOutcome::reprocess_in(InsertionMode::InTableBody)
    }

    /// [§ 13.2.6.4.15 The "in cell" insertion mode](https://html.spec.whatwg.org/multipage/parsing.html#parsing-main-incell)
    pub(super) fn handle_in_cell_mode(&mut self, token: &Token) -> ModeOutcome {
        match token {
            Token::EndTag { name, .. } if matches!(name.as_str(), "td" | "th") => {
                if !self.has_element_in_table_scope(name) {
                    self.parse_error(TreeBuilderErrorKind::UnexpectedEndTag, Some(name));
                    return ModeOutcome::Done;
                }
                self.generate_implied_end_tags(None);
                if !self
                    .current_node()
                    .is_some_and(|id| self.is_html_element(id, name))
                {
                    self.parse_error(TreeBuilderErrorKind::EndTagTooEarly, Some(name));
                }
                self.pop_until_html_tag(name);
                self.clear_active_formatting_to_last_marker();
                self.mode = InsertionMode::InRow;
                ModeOutcome::Done
            }
            Token::StartTag { name, .. }
                if matches!(
                    name.as_str(),
                    "caption" | "col" | "colgroup" | "tbody" | "td" | "tfoot" | "th" | "thead"
                        | "tr"
                ) =>
            {
                if !self.has_element_in_table_scope("td")
                    && !self.has_element_in_table_scope("th")
                {
                    self.parse_error(TreeBuilderErrorKind::UnexpectedStartTag, Some(name));
                    return ModeOutcome::Done;
                }
                self.close_the_cell();
                ModeOutcome::reprocess()
            }
            Token::EndTag { name, .. }
                if matches!(name.as_str(), "body" | "caption" | "col" | "colgroup" | "html") =>
            {
                self.parse_error(TreeBuilderErrorKind::UnexpectedEndTag, Some(name));
                ModeOutcome::Done
            }
            Token::EndTag { name, .. }
                if matches!(name.as_str(), "table" | "tbody" | "tfoot" | "thead" | "tr") =>
            {
                if !self.has_element_in_table_scope(name) {
                    self.parse_error(TreeBuilderErrorKind::UnexpectedEndTag, Some(name));
                    return ModeOutcome::Done;
                }
                self.close_the_cell();
                ModeOutcome::reprocess()
            }
            _ => self.handle_in_body_mode(token),
        }
    }

    /// [§ 13.2.6.4.16 The "in select" insertion mode](https://html.spec.whatwg.org/multipage/parsing.html#parsing-main-inselect)
    ///
    /// Table-related tags interrupt the select (the historical "in select
    /// in table" mode is folded in here).
    pub(super) fn handle_in_select_mode(&mut self, token: &Token) -> ModeOutcome {
        match token {
            Token::Character { data: '\0' } => {
                self.parse_error(TreeBuilderErrorKind::NullCharacter, None);
                ModeOutcome::Done
            }
            Token::Character { data } => {
                self.handle_in_body_character(*data);
                ModeOutcome::Done
            }
            Token::Comment { data } => {
                self.insert_comment(data);
                ModeOutcome::Done
            }
            Token::Doctype { .. } => {
                self.parse_error(TreeBuilderErrorKind::UnexpectedDoctype, None);
                ModeOutcome::Done
            }
            Token::StartTag { name, .. } => match name.as_str() {
                "html" => self.handle_in_body_mode(token),
                "option" => {
                    if self
                        .current_node()
                        .is_some_and(|id| self.is_html_element(id, "option"))
                    {
                        let _ = self.open_elements.pop();
                    }
                    let _ = self.insert_html_element(token);
                    ModeOutcome::Done
                }
                "optgroup" => {
                    if self
                        .current_node()
                        .is_some_and(|id| self.is_html_element(id, "option"))
                    {
                        let _ = self.open_elements.pop();
                    }
                    if self
                        .current_node()
                        .is_some_and(|id| self.is_html_element(id, "optgroup"))
                    {
                        let _ = self.open_elements.pop();
                    }
                    let _ = self.insert_html_element(token);
                    ModeOutcome::Done
                }
                "hr" => {
                    if self
                        .current_node()
                        .is_some_and(|id| self.is_html_element(id, "option"))
                    {
                        let _ = self.open_elements.pop();
                    }
                    if self
                        .current_node()
                        .is_some_and(|id| self.is_html_element(id, "optgroup"))
                    {
                        let _ = self.open_elements.pop();
                    }
                    let _ = self.insert_html_element(token);
                    let _ = self.open_elements.pop();
                    ModeOutcome::Done
                }
                "select" => {
                    self.parse_error(TreeBuilderErrorKind::UnexpectedStartTag, Some(name));
                    if !self.has_element_in_select_scope("select") {
                        return ModeOutcome::Done;
                    }
                    self.pop_until_html_tag("select");
                    self.reset_insertion_mode();
                    ModeOutcome::Done
                }
                "input" | "keygen" | "textarea" => {
                    self.parse_error(TreeBuilderErrorKind::UnexpectedStartTag, Some(name));
                    if !self.has_element_in_select_scope("select") {
                        return ModeOutcome::Done;
                    }
                    self.pop_until_html_tag("select");
                    self.reset_insertion_mode();
                    ModeOutcome::reprocess()
                }
                // A table part interrupts the select entirely.
                "caption" | "table" | "tbody" | "tfoot" | "thead" | "tr" | "td" | "th" => {
                    self.parse_error(TreeBuilderErrorKind::UnexpectedStartTag, Some(name));
                    if !self.has_element_in_select_scope("select") {
                        return ModeOutcome::Done;
                    }
                    self.pop_until_html_tag("select");
                    self.reset_insertion_mode();
                    ModeOutcome::reprocess()
                }
                "script" | "template" => self.handle_in_head_mode(token),
                // Any other content (button, selectedcontent, div, ...)
                // parses with the in-body rules; select no longer drops
                // unknown children.
                _ => self.handle_in_body_mode(token),
            },
            Token::EndTag { name, .. } => match name.as_str() {
                "optgroup" => {
                    // "First, if the current node is an option element, and
                    // the node immediately before it... is an optgroup
                    // element, then pop the current node."
                    if self
                        .current_node()
                        .is_some_and(|id| self.is_html_element(id, "option"))
                        && self
                            .open_elements
                            .len()
                            .checked_sub(2)
                            .map(|i| self.open_elements[i])
                            .is_some_and(|id| self.is_html_element(id, "optgroup"))
                    {
                        let _ = self.open_elements.pop();
                    }
                    if self
                        .current_node()
                        .is_some_and(|id| self.is_html_element(id, "optgroup"))
                    {
                        let _ = self.open_elements.pop();
                    } else {
                        self.parse_error(TreeBuilderErrorKind::UnexpectedEndTag, Some(name));
                    }
                    ModeOutcome::Done
                }
                "option" => {
                    if self
                        .current_node()
                        .is_some_and(|id| self.is_html_element(id, "option"))
                    {
                        let _ = self.open_elements.pop();
                    } else {
                        self.parse_error(TreeBuilderErrorKind::UnexpectedEndTag, Some(name));
                    }
                    ModeOutcome::Done
                }
                "select" => {
                    if !self.has_element_in_select_scope("select") {
                        self.parse_error(TreeBuilderErrorKind::UnexpectedEndTag, Some(name));
                        return ModeOutcome::Done;
                    }
                    self.pop_until_html_tag("select");
                    self.reset_insertion_mode();
                    ModeOutcome::Done
                }
                "caption" | "table" | "tbody" | "tfoot" | "thead" | "tr" | "td" | "th" => {
                    self.parse_error(TreeBuilderErrorKind::UnexpectedEndTag, Some(name));
                    if !self.has_element_in_table_scope(name) {
                        return ModeOutcome::Done;
                    }
                    self.pop_until_html_tag("select");
                    self.reset_insertion_mode();
                    ModeOutcome::reprocess()
                }
                "template" => self.handle_in_head_mode(token),
                _ => self.handle_in_body_mode(token),
            },
            Token::EndOfFile => self.handle_in_body_mode(token),
        }
    }

    /// [§ 13.2.6.4.17 The "in template" insertion mode](https://html.spec.whatwg.org/multipage/parsing.html#parsing-main-intemplate)
    pub(super) fn handle_in_template_mode(&mut self, token: &Token) -> ModeOutcome {
        match token {
            Token::Character { .. } | Token::Comment { .. } | Token::Doctype { .. } => {
                self.handle_in_body_mode(token)
            }
            Token::StartTag { name, .. }
                if matches!(
                    name.as_str(),
                    "base" | "basefont" | "bgsound" | "link" | "meta" | "noframes" | "script"
                        | "style" | "template" | "title"
                ) =>
            {
                self.handle_in_head_mode(token)
            }
            Token::EndTag { name, .. } if name == "template" => self.handle_in_head_mode(token),
            Token::StartTag { name, .. }
                if matches!(
                    name.as_str(),
                    "caption" | "colgroup" | "tbody" | "tfoot" | "thead"
                ) =>
            {
                self.retarget_template_mode(InsertionMode::InTable)
            }
            Token::StartTag { name, .. } if name == "col" => {
                self.retarget_template_mode(InsertionMode::InColumnGroup)
            }
            Token::StartTag { name, .. } if name == "tr" => {
                self.retarget_template_mode(InsertionMode::InTableBody)
            }
            Token::StartTag { name, .. } if matches!(name.as_str(), "td" | "th") => {
                self.retarget_template_mode(InsertionMode::InRow)
            }
            Token::StartTag { .. } => self.retarget_template_mode(InsertionMode::InBody),
            Token::EndTag { name, .. } => {
                self.parse_error(TreeBuilderErrorKind::UnexpectedEndTag, Some(name));
                ModeOutcome::Done
            }
            Token::EndOfFile => {
                if !self
                    .open_elements
                    .iter()
                    .any(|&id| self.is_html_element(id, "template"))
                {
                    self.stop_parsing();
                    return ModeOutcome::Done;
                }
                // End of input with an unclosed template: unwind to the
                // nearest template and try again.
                self.parse_error(TreeBuilderErrorKind::UnclosedTemplate, None);
                self.pop_until_html_tag("template");
                self.clear_active_formatting_to_last_marker();
                let _ = self.template_modes.pop();
                self.reset_insertion_mode();
                ModeOutcome::reprocess()
            }
        }
    }

    /// "Pop the current template insertion mode... push X onto the stack
    /// of template insertion modes... switch the insertion mode to X, and
    /// reprocess the token."
    fn retarget_template_mode(&mut self, mode: InsertionMode) -> ModeOutcome {
        let _ = self.template_modes.pop();
        self.template_modes.push(mode);
        ModeOutcome::reprocess_in(mode)
    }

    /// [§ 13.2.6.4.18 The "after body" insertion mode](https://html.spec.whatwg.org/multipage/parsing.html#parsing-main-afterbody)
    pub(super) fn handle_after_body_mode(&mut self, token: &Token) -> ModeOutcome {
        match token {
            Token::Character { data } if Self::is_parser_whitespace(*data) => {
                self.handle_in_body_mode(token)
            }
            Token::Comment { data } => {
                // "Insert a comment as the last child of the first element
                // in the stack of open elements (the html element)."
                self.insert_comment_on_html_element(data);
                ModeOutcome::Done
            }
            Token::Doctype { .. } => {
                self.parse_error(TreeBuilderErrorKind::UnexpectedDoctype, None);
                ModeOutcome::Done
            }
            Token::StartTag { name, .. } if name == "html" => self.handle_in_body_mode(token),
            Token::EndTag { name, .. } if name == "html" => {
                if self.fragment.is_some() {
                    self.parse_error(TreeBuilderErrorKind::EndTagInFragmentContext, Some(name));
                    return ModeOutcome::Done;
                }
                self.mode = InsertionMode::AfterAfterBody;
                ModeOutcome::Done
            }
            Token::EndOfFile => {
                self.stop_parsing();
                ModeOutcome::Done
            }
            _ => {
                self.parse_error(TreeBuilderErrorKind::UnexpectedCharacter, None);
                ModeOutcome::reprocess_in(InsertionMode::InBody)
            }
        }
    }

    /// [§ 13.2.6.4.19 The "in frameset" insertion mode](https://html.spec.whatwg.org/multipage/parsing.html#parsing-main-inframeset)
    pub(super) fn handle_in_frameset_mode(&mut self, token: &Token) -> ModeOutcome {
        match token {
            Token::Character { data } if Self::is_parser_whitespace(*data) => {
                self.insert_character(*data);
                ModeOutcome::Done
            }
            Token::Comment { data } => {
                self.insert_comment(data);
                ModeOutcome::Done
            }
            Token::Doctype { .. } => {
                self.parse_error(TreeBuilderErrorKind::UnexpectedDoctype, None);
                ModeOutcome::Done
            }
            Token::StartTag { name, .. } => match name.as_str() {
                "html" => self.handle_in_body_mode(token),
                "frameset" => {
                    let _ = self.insert_html_element(token);
                    ModeOutcome::Done
                }
                "frame" => {
                    let _ = self.insert_html_element(token);
                    let _ = self.open_elements.pop();
                    ModeOutcome::Done
                }
                "noframes" => self.handle_in_head_mode(token),
                _ => {
                    self.parse_error(TreeBuilderErrorKind::UnexpectedStartTag, Some(name));
                    ModeOutcome::Done
                }
            },
            Token::EndTag { name, .. } if name == "frameset" => {
                if self.open_elements.len() <= 1 {
                    self.parse_error(TreeBuilderErrorKind::UnexpectedEndTag, Some(name));
                    return ModeOutcome::Done;
                }
                let _ = self.open_elements.pop();
                if self.fragment.is_none()
                    && !self
                        .current_node()
                        .is_some_and(|id| self.is_html_element(id, "frameset"))
                {
                    self.mode = InsertionMode::AfterFrameset;
                }
                ModeOutcome::Done
            }
            Token::EndOfFile => {
                if self.open_elements.len() > 1 {
                    self.parse_error(TreeBuilderErrorKind::UnexpectedEof, None);
                }
                self.stop_parsing();
                ModeOutcome::Done
            }
            _ => {
                self.parse_error(TreeBuilderErrorKind::UnexpectedCharacter, None);
                ModeOutcome::Done
            }
        }
    }

    /// [§ 13.2.6.4.20 The "after frameset" insertion mode](https://html.spec.whatwg.org/multipage/parsing.html#parsing-main-afterframeset)
    pub(super) fn handle_after_frameset_mode(&mut self, token: &Token) -> ModeOutcome {
        match token {
            Token::Character { data } if Self::is_parser_whitespace(*data) => {
                self.insert_character(*data);
                ModeOutcome::Done
            }
            Token::Comment { data } => {
                self.insert_comment(data);
                ModeOutcome::Done
            }
            Token::Doctype { .. } => {
                self.parse_error(TreeBuilderErrorKind::UnexpectedDoctype, None);
                ModeOutcome::Done
            }
            Token::StartTag { name, .. } if name == "html" => self.handle_in_body_mode(token),
            Token::EndTag { name, .. } if name == "html" => {
                self.mode = InsertionMode::AfterAfterFrameset;
                ModeOutcome::Done
            }
            Token::StartTag { name, .. } if name == "noframes" => {
                self.handle_in_head_mode(token)
            }
            Token::EndOfFile => {
                self.stop_parsing();
                ModeOutcome::Done
            }
            _ => {
                self.parse_error(TreeBuilderErrorKind::UnexpectedCharacter, None);
                ModeOutcome::Done
            }
        }
    }

    /// [§ 13.2.6.4.21 The "after after body" insertion mode](https://html.spec.whatwg.org/multipage/parsing.html#the-after-after-body-insertion-mode)
    pub(super) fn handle_after_after_body_mode(&mut self, token: &Token) -> ModeOutcome {
        match token {
            Token::Comment { data } => {
                self.insert_comment_on_document(data);
                ModeOutcome::Done
            }
            Token::Doctype { .. } => self.handle_in_body_mode(token),
            Token::Character { data } if Self::is_parser_whitespace(*data) => {
                self.handle_in_body_mode(token)
            }
            Token::StartTag { name, .. } if name == "html" => self.handle_in_body_mode(token),
            Token::EndOfFile => {
                self.stop_parsing();
                ModeOutcome::Done
            }
            _ => {
                self.parse_error(TreeBuilderErrorKind::UnexpectedCharacter, None);
                ModeOutcome::reprocess_in(InsertionMode::InBody)
            }
        }
    }

    /// [§ 13.2.6.4.22 The "after after frameset" insertion mode](https://html.spec.whatwg.org/multipage/parsing.html#the-after-after-frameset-insertion-mode)
    pub(super) fn handle_after_after_frameset_mode(&mut self, token: &Token) -> ModeOutcome {
        match token {
            Token::Comment { data } => {
                self.insert_comment_on_document(data);
                ModeOutcome::Done
            }
            Token::Doctype { .. } => self.handle_in_body_mode(token),
            Token::Character { data } if Self::is_parser_whitespace(*data) => {
                self.handle_in_body_mode(token)
            }
            Token::StartTag { name, .. } if name == "html" => self.handle_in_body_mode(token),
            Token::StartTag { name, .. } if name == "noframes" => {
                self.handle_in_head_mode(token)
            }
            Token::EndOfFile => {
                self.stop_parsing();
                ModeOutcome::Done
            }
            _ => {
                self.parse_error(TreeBuilderErrorKind::UnexpectedCharacter, None);
                ModeOutcome::Done
            }
        }
    }
}
