use strum_macros::Display;

use wallaby_common::warning::warn_once;
use wallaby_dom::{
    Attribute, AttributeList, DomTree, ElementData, Namespace, NodeId, NodeType,
};

use super::error::{TreeBuilderError, TreeBuilderErrorKind};
use super::foreign_content::{
    adjust_foreign_attributes, adjust_mathml_attributes, adjust_svg_attributes,
    adjust_svg_tag_name,
};
use super::fragment::FragmentInfo;
use super::quirks::QuirksMode;
use crate::tokenizer::{Token, Tokenizer, TokenizerError, TokenizerState};

/// [§ 13.2.4.1 The insertion mode](https://html.spec.whatwg.org/multipage/parsing.html#the-insertion-mode)
///
/// "The insertion mode is a state variable that controls the primary
/// operation of the tree construction stage."
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum InsertionMode {
    /// [§ 13.2.6.4.1 The "initial" insertion mode](https://html.spec.whatwg.org/multipage/parsing.html#the-initial-insertion-mode)
    Initial,
    /// [§ 13.2.6.4.2 The "before html" insertion mode](https://html.spec.whatwg.org/multipage/parsing.html#the-before-html-insertion-mode)
    BeforeHtml,
    /// [§ 13.2.6.4.3 The "before head" insertion mode](https://html.spec.whatwg.org/multipage/parsing.html#the-before-head-insertion-mode)
    BeforeHead,
    /// [§ 13.2.6.4.4 The "in head" insertion mode](https://html.spec.whatwg.org/multipage/parsing.html#parsing-main-inhead)
    InHead,
    /// [§ 13.2.6.4.5 The "in head noscript" insertion mode](https://html.spec.whatwg.org/multipage/parsing.html#parsing-main-inheadnoscript)
    InHeadNoscript,
    /// [§ 13.2.6.4.6 The "after head" insertion mode](https://html.spec.whatwg.org/multipage/parsing.html#the-after-head-insertion-mode)
    AfterHead,
    /// [§ 13.2.6.4.7 The "in body" insertion mode](https://html.spec.whatwg.org/multipage/parsing.html#parsing-main-inbody)
    InBody,
    /// [§ 13.2.6.4.8 The "text" insertion mode](https://html.spec.whatwg.org/multipage/parsing.html#parsing-main-incdata)
    Text,
    /// [§ 13.2.6.4.9 The "in table" insertion mode](https://html.spec.whatwg.org/multipage/parsing.html#parsing-main-intable)
    InTable,
    /// [§ 13.2.6.4.10 The "in table text" insertion mode](https://html.spec.whatwg.org/multipage/parsing.html#parsing-main-intabletext)
    InTableText,
    /// [§ 13.2.6.4.11 The "in caption" insertion mode](https://html.spec.whatwg.org/multipage/parsing.html#parsing-main-incaption)
    InCaption,
    /// [§ 13.2.6.4.12 The "in column group" insertion mode](https://html.spec.whatwg.org/multipage/parsing.html#parsing-main-incolumngroup)
    InColumnGroup,
    /// [§ 13.2.6.4.13 The "in table body" insertion mode](https://html.spec.whatwg.org/multipage/parsing.html#parsing-main-intablebody)
    InTableBody,
    /// [§ 13.2.6.4.14 The "in row" insertion mode](https://html.spec.whatwg.org/multipage/parsing.html#parsing-main-inrow)
    InRow,
    /// [§ 13.2.6.4.15 The "in cell" insertion mode](https://html.spec.whatwg.org/multipage/parsing.html#parsing-main-incell)
    InCell,
    /// [§ 13.2.6.4.16 The "in select" insertion mode](https://html.spec.whatwg.org/multipage/parsing.html#parsing-main-inselect)
    InSelect,
    /// [§ 13.2.6.4.17 The "in template" insertion mode](https://html.spec.whatwg.org/multipage/parsing.html#parsing-main-intemplate)
    InTemplate,
    /// [§ 13.2.6.4.18 The "after body" insertion mode](https://html.spec.whatwg.org/multipage/parsing.html#parsing-main-afterbody)
    AfterBody,
    /// [§ 13.2.6.4.19 The "in frameset" insertion mode](https://html.spec.whatwg.org/multipage/parsing.html#parsing-main-inframeset)
    InFrameset,
    /// [§ 13.2.6.4.20 The "after frameset" insertion mode](https://html.spec.whatwg.org/multipage/parsing.html#parsing-main-afterframeset)
    AfterFrameset,
    /// [§ 13.2.6.4.21 The "after after body" insertion mode](https://html.spec.whatwg.org/multipage/parsing.html#the-after-after-body-insertion-mode)
    AfterAfterBody,
    /// [§ 13.2.6.4.22 The "after after frameset" insertion mode](https://html.spec.whatwg.org/multipage/parsing.html#the-after-after-frameset-insertion-mode)
    AfterAfterFrameset,
}

/// [§ 13.2.4.3 The list of active formatting elements](https://html.spec.whatwg.org/multipage/parsing.html#the-list-of-active-formatting-elements)
///
/// The list contains entries that are either elements or markers.
#[derive(Debug, Clone)]
pub enum ActiveFormattingElement {
    /// A formatting element entry: the node plus the token it was created
    /// from, kept to recreate the element during reconstruction and the
    /// adoption agency algorithm.
    Element {
        /// The element's id in the arena.
        node_id: NodeId,
        /// The start tag token the element was created for.
        token: Token,
    },
    /// "A marker is an entry... introduced when entering applet, object,
    /// marquee, template, td, th, and caption elements."
    Marker,
}

/// The result of handling one token in one insertion mode.
///
/// "Reprocess the token": the dispatch loop re-runs the handler chain with
/// the (possibly overridden) token until a handler returns [`Self::Done`].
#[derive(Debug)]
pub(super) enum ModeOutcome {
    /// The token has been fully consumed.
    Done,
    /// Re-dispatch the token.
    Reprocess {
        /// Switch to this insertion mode first, when set.
        mode: Option<InsertionMode>,
        /// Replace the token being processed, when set.
        token_override: Option<Token>,
        /// Process with the HTML rules even if the foreign-content
        /// dispatcher would pick otherwise.
        force_html: bool,
    },
}

impl ModeOutcome {
    /// Reprocess the same token in a new mode.
    pub(super) const fn reprocess_in(mode: InsertionMode) -> Self {
        Self::Reprocess {
            mode: Some(mode),
            token_override: None,
            force_html: false,
        }
    }

    /// Reprocess the same token without changing mode (used after stack
    /// surgery that changes the dispatch decision).
    pub(super) const fn reprocess() -> Self {
        Self::Reprocess {
            mode: None,
            token_override: None,
            force_html: false,
        }
    }

    /// Reprocess with the HTML rules forced.
    pub(super) const fn reprocess_as_html() -> Self {
        Self::Reprocess {
            mode: None,
            token_override: None,
            force_html: true,
        }
    }

    /// Reprocess a replacement token in the current mode.
    pub(super) const fn reprocess_token(token: Token) -> Self {
        Self::Reprocess {
            mode: None,
            token_override: Some(token),
            force_html: false,
        }
    }
}

/// What `Parser::run` hands back to the library entry points.
#[derive(Debug)]
pub struct ParserResult {
    /// The constructed tree (document or fragment).
    pub tree: DomTree,
    /// Tree-construction errors, in detection order.
    pub errors: Vec<TreeBuilderError>,
    /// Tokenizer errors, in detection order.
    pub tokenizer_errors: Vec<TokenizerError>,
    /// The document mode derived from the doctype.
    pub quirks_mode: QuirksMode,
}

/// [§ 13.2.6 Tree construction](https://html.spec.whatwg.org/multipage/parsing.html#tree-construction)
///
/// The tree builder owns the tokenizer and pumps it one token at a time,
/// feeding namespace information back so the tokenizer can resolve CDATA
/// and raw-text decisions.
pub struct Parser {
    pub(super) tokenizer: Tokenizer,

    /// [§ 13.2.4.1](https://html.spec.whatwg.org/multipage/parsing.html#the-insertion-mode)
    pub(super) mode: InsertionMode,
    /// [§ 13.2.4.1](https://html.spec.whatwg.org/multipage/parsing.html#original-insertion-mode)
    /// "the original insertion mode" (for the text mode)
    pub(super) original_mode: Option<InsertionMode>,
    /// The mode to return to after "in table text".
    pub(super) table_text_original_mode: Option<InsertionMode>,

    /// [§ 13.2.4.2 The stack of open elements](https://html.spec.whatwg.org/multipage/parsing.html#the-stack-of-open-elements)
    pub(super) open_elements: Vec<NodeId>,
    /// [§ 13.2.4.3 The list of active formatting elements](https://html.spec.whatwg.org/multipage/parsing.html#the-list-of-active-formatting-elements)
    pub(super) active_formatting: Vec<ActiveFormattingElement>,

    /// [§ 13.2.4.4 The element pointers](https://html.spec.whatwg.org/multipage/parsing.html#the-element-pointers)
    pub(super) head_element: Option<NodeId>,
    /// "The form element pointer points to the last form element that was
    /// opened and whose end tag has not yet been seen."
    pub(super) form_element: Option<NodeId>,

    /// [§ 13.2.4.5 Other parsing state flags](https://html.spec.whatwg.org/multipage/parsing.html#frameset-ok-flag)
    pub(super) frameset_ok: bool,
    /// Derived from the doctype in the "initial" mode.
    pub(super) quirks_mode: QuirksMode,
    /// After `<pre>`, `<listing>`, `<textarea>`: swallow one immediately
    /// following LF.
    pub(super) ignore_lf: bool,
    /// [§ 13.2.6.1 foster parenting](https://html.spec.whatwg.org/multipage/parsing.html#foster-parent)
    pub(super) foster_parenting: bool,
    /// "The pending table character tokens list" for the in-table-text
    /// mode.
    pub(super) pending_table_text: Vec<char>,
    /// [§ 13.2.4.1 The stack of template insertion modes](https://html.spec.whatwg.org/multipage/parsing.html#stack-of-template-insertion-modes)
    pub(super) template_modes: Vec<InsertionMode>,

    pub(super) tree: DomTree,
    pub(super) fragment: Option<FragmentInfo>,
    pub(super) iframe_srcdoc: bool,
    pub(super) errors: Vec<TreeBuilderError>,
    pub(super) stopped: bool,
}

impl Parser {
    /// Create a document parser over the given input.
    #[must_use]
    pub fn new(input: &str, tokenizer_opts: &crate::TokenizerOptions, iframe_srcdoc: bool) -> Self {
        Parser {
            tokenizer: Tokenizer::with_options(input, tokenizer_opts),
            mode: InsertionMode::Initial,
            original_mode: None,
            table_text_original_mode: None,
            open_elements: Vec::new(),
            active_formatting: Vec::new(),
            head_element: None,
            form_element: None,
            frameset_ok: true,
            quirks_mode: QuirksMode::NoQuirks,
            ignore_lf: false,
            foster_parenting: false,
            pending_table_text: Vec::new(),
            template_modes: Vec::new(),
            tree: DomTree::new(),
            fragment: None,
            iframe_srcdoc,
            errors: Vec::new(),
            stopped: false,
        }
    }

    /// Pump the tokenizer to completion and return the constructed tree.
    #[must_use]
    pub fn run(mut self) -> ParserResult {
        self.sync_tokenizer_flags();
        while let Some(token) = self.tokenizer.next_token() {
            self.process_token(token);
            self.sync_tokenizer_flags();
            if self.stopped {
                break;
            }
        }
        self.finish()
    }

    fn finish(mut self) -> ParserResult {
        if self.fragment.is_some() {
            self.unwrap_fragment();
        }
        self.populate_selected_content();

        ParserResult {
            tree: self.tree,
            errors: self.errors,
            tokenizer_errors: self.tokenizer.into_errors(),
            quirks_mode: self.quirks_mode,
        }
    }

    // =========================================================================
    // Dispatch
    // =========================================================================

    /// [§ 13.2.6 The tree construction dispatcher](https://html.spec.whatwg.org/multipage/parsing.html#tree-construction-dispatcher)
    pub(super) fn process_token(&mut self, token: Token) {
        // After a `pre`, `listing`, or `textarea` start tag, the next token
        // is dropped if it is a single LF.
        if std::mem::take(&mut self.ignore_lf) && matches!(token, Token::Character { data: '\n' }) {
            return;
        }

        let mut token = token;
        let mut force_html = false;
        loop {
            if self.stopped {
                return;
            }
            let outcome = if force_html || self.should_use_html_rules(&token) {
                let mode = self.effective_mode(&token);
                self.process_in_mode(mode, &token)
            } else {
                self.process_foreign(&token)
            };
            match outcome {
                ModeOutcome::Done => return,
                ModeOutcome::Reprocess {
                    mode,
                    token_override,
                    force_html: fh,
                } => {
                    if let Some(mode) = mode {
                        self.mode = mode;
                    }
                    if let Some(replacement) = token_override {
                        token = replacement;
                    }
                    force_html = fh;
                }
            }
        }
    }

    /// "If the stack of open elements is empty; if the adjusted current
    /// node is an element in the HTML namespace; [integration point
    /// cases]; or if the token is an end-of-file token: process the token
    /// according to the rules given in the section corresponding to the
    /// current insertion mode in HTML content."
    fn should_use_html_rules(&self, token: &Token) -> bool {
        let Some(adjusted) = self.adjusted_current_node() else {
            return true;
        };
        let Some(element) = self.tree.as_element(adjusted) else {
            return true;
        };
        if element.namespace == Namespace::Html {
            return true;
        }

        if self.is_mathml_text_integration_point(adjusted) {
            match token {
                Token::StartTag { name, .. } if name != "mglyph" && name != "malignmark" => {
                    return true;
                }
                Token::Character { .. } => return true,
                _ => {}
            }
        }
        if element.namespace == Namespace::MathMl
            && element.tag_name == "annotation-xml"
            && matches!(token, Token::StartTag { name, .. } if name == "svg")
        {
            return true;
        }
        if self.is_html_integration_point(adjusted)
            && matches!(token, Token::StartTag { .. } | Token::Character { .. })
        {
            return true;
        }

        matches!(token, Token::EndOfFile)
    }

    /// A start tag arriving at an integration point while the insertion
    /// mode is a table mode with no table in scope is handled with the
    /// "in body" rules for just that token; the table modes would
    /// otherwise foster-parent it out of the integration point.
    fn effective_mode(&self, token: &Token) -> InsertionMode {
        if matches!(token, Token::StartTag { .. })
            && matches!(
                self.mode,
                InsertionMode::InTable
                    | InsertionMode::InTableText
                    | InsertionMode::InCaption
                    | InsertionMode::InColumnGroup
                    | InsertionMode::InTableBody
                    | InsertionMode::InRow
                    | InsertionMode::InCell
            )
            && !self.has_element_in_table_scope("table")
            && self
                .adjusted_current_node()
                .is_some_and(|id| {
                    self.is_html_integration_point(id)
                        || self.is_mathml_text_integration_point(id)
                })
        {
            return InsertionMode::InBody;
        }
        self.mode
    }

    fn process_in_mode(&mut self, mode: InsertionMode, token: &Token) -> ModeOutcome {
        match mode {
            InsertionMode::Initial => self.handle_initial_mode(token),
            InsertionMode::BeforeHtml => self.handle_before_html_mode(token),
            InsertionMode::BeforeHead => self.handle_before_head_mode(token),
            InsertionMode::InHead => self.handle_in_head_mode(token),
            InsertionMode::InHeadNoscript => self.handle_in_head_noscript_mode(token),
            InsertionMode::AfterHead => self.handle_after_head_mode(token),
            InsertionMode::InBody => self.handle_in_body_mode(token),
            InsertionMode::Text => self.handle_text_mode(token),
            InsertionMode::InTable => self.handle_in_table_mode(token),
            InsertionMode::InTableText => self.handle_in_table_text_mode(token),
            InsertionMode::InCaption => self.handle_in_caption_mode(token),
            InsertionMode::InColumnGroup => self.handle_in_column_group_mode(token),
            InsertionMode::InTableBody => self.handle_in_table_body_mode(token),
            InsertionMode::InRow => self.handle_in_row_mode(token),
            InsertionMode::InCell => self.handle_in_cell_mode(token),
            InsertionMode::InSelect => self.handle_in_select_mode(token),
            InsertionMode::InTemplate => self.handle_in_template_mode(token),
            InsertionMode::AfterBody => self.handle_after_body_mode(token),
            InsertionMode::InFrameset => self.handle_in_frameset_mode(token),
            InsertionMode::AfterFrameset => self.handle_after_frameset_mode(token),
            InsertionMode::AfterAfterBody => self.handle_after_after_body_mode(token),
            InsertionMode::AfterAfterFrameset => self.handle_after_after_frameset_mode(token),
        }
    }

    // =========================================================================
    // Tokenizer feedback
    // =========================================================================

    /// Keep the tokenizer's view of the adjusted current node up to date:
    /// its namespace gates the raw-text auto-switch and `<![CDATA[`.
    pub(super) fn sync_tokenizer_flags(&mut self) {
        match self
            .adjusted_current_node()
            .and_then(|id| self.tree.as_element(id))
            .map(|element| element.namespace)
        {
            Some(Namespace::Html) | None => {
                self.tokenizer.set_adjusted_node_in_html_namespace(true);
                self.tokenizer.set_cdata_allowed(false);
            }
            Some(_) => {
                self.tokenizer.set_adjusted_node_in_html_namespace(false);
                self.tokenizer.set_cdata_allowed(true);
            }
        }
    }

    // =========================================================================
    // Stack and node helpers
    // =========================================================================

    /// "The current node is the bottommost node in this stack of open
    /// elements."
    pub(super) fn current_node(&self) -> Option<NodeId> {
        self.open_elements.last().copied()
    }

    /// "The adjusted current node is the context element if the parser was
    /// created as part of the HTML fragment parsing algorithm and the
    /// stack of open elements has only one element in it; otherwise, the
    /// adjusted current node is the current node."
    pub(super) fn adjusted_current_node(&self) -> Option<NodeId> {
        if let Some(fragment) = &self.fragment
            && self.open_elements.len() == 1
        {
            return Some(fragment.context_node);
        }
        self.current_node()
    }

    /// Tag name of an element node.
    pub(super) fn tag_name(&self, id: NodeId) -> Option<&str> {
        self.tree.as_element(id).map(|data| data.tag_name.as_str())
    }

    /// Whether the node is an HTML-namespace element with this tag name.
    pub(super) fn is_html_element(&self, id: NodeId, tag: &str) -> bool {
        self.tree.as_element(id).is_some_and(|e| e.is_html(tag))
    }

    fn element_info(&self, id: NodeId) -> Option<(Namespace, &str)> {
        self.tree
            .as_element(id)
            .map(|e| (e.namespace, e.tag_name.as_str()))
    }

    /// "A MathML text integration point": mi, mo, mn, ms, mtext.
    pub(super) fn is_mathml_text_integration_point(&self, id: NodeId) -> bool {
        matches!(
            self.element_info(id),
            Some((Namespace::MathMl, "mi" | "mo" | "mn" | "ms" | "mtext"))
        )
    }

    /// "An HTML integration point": annotation-xml with an encoding of
    /// text/html or application/xhtml+xml, and SVG foreignObject, desc,
    /// title.
    pub(super) fn is_html_integration_point(&self, id: NodeId) -> bool {
        match self.element_info(id) {
            Some((Namespace::MathMl, "annotation-xml")) => self
                .tree
                .as_element(id)
                .and_then(|e| e.attrs.get("encoding"))
                .is_some_and(|encoding| {
                    encoding.eq_ignore_ascii_case("text/html")
                        || encoding.eq_ignore_ascii_case("application/xhtml+xml")
                }),
            Some((Namespace::Svg, "foreignObject" | "desc" | "title")) => true,
            _ => false,
        }
    }

    /// [§ 13.1.1 Special](https://html.spec.whatwg.org/multipage/parsing.html#special)
    pub(super) fn is_special_element(namespace: Namespace, tag_name: &str) -> bool {
        match namespace {
            Namespace::Html => matches!(
                tag_name,
                "address" | "applet" | "area" | "article" | "aside" | "base" | "basefont"
                    | "bgsound" | "blockquote" | "body" | "br" | "button" | "caption" | "center"
                    | "col" | "colgroup" | "dd" | "details" | "dir" | "div" | "dl" | "dt"
                    | "embed" | "fieldset" | "figcaption" | "figure" | "footer" | "form"
                    | "frame" | "frameset" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "head"
                    | "header" | "hgroup" | "hr" | "html" | "iframe" | "img" | "input"
                    | "keygen" | "li" | "link" | "listing" | "main" | "marquee" | "menu"
                    | "meta" | "nav" | "noembed" | "noframes" | "noscript" | "object" | "ol"
                    | "p" | "param" | "plaintext" | "pre" | "script" | "search" | "section"
                    | "select" | "source" | "style" | "summary" | "table" | "tbody" | "td"
                    | "template" | "textarea" | "tfoot" | "th" | "thead" | "title" | "tr"
                    | "track" | "ul" | "wbr" | "xmp"
            ),
            Namespace::MathMl => matches!(
                tag_name,
                "mi" | "mo" | "mn" | "ms" | "mtext" | "annotation-xml"
            ),
            Namespace::Svg => matches!(tag_name, "foreignObject" | "desc" | "title"),
        }
    }

    fn is_void_element(tag_name: &str) -> bool {
        matches!(
            tag_name,
            "area" | "base" | "basefont" | "bgsound" | "br" | "col" | "embed" | "frame" | "hr"
                | "img" | "input" | "keygen" | "link" | "meta" | "param" | "source" | "track"
                | "wbr"
        )
    }

    // =========================================================================
    // Scope queries
    // =========================================================================

    /// [§ 13.2.4.2](https://html.spec.whatwg.org/multipage/parsing.html#has-an-element-in-the-specific-scope)
    ///
    /// Walk the stack from the current node downward; a match on `tag`
    /// (HTML namespace) terminates in a match state, a scope marker in a
    /// failure state.
    fn has_element_in_specific_scope(
        &self,
        tag: &str,
        is_marker: impl Fn(Namespace, &str) -> bool,
    ) -> bool {
        for &node_id in self.open_elements.iter().rev() {
            let Some((namespace, name)) = self.element_info(node_id) else {
                continue;
            };
            if namespace == Namespace::Html && name == tag {
                return true;
            }
            if is_marker(namespace, name) {
                return false;
            }
        }
        false
    }

    fn default_scope_marker(namespace: Namespace, name: &str) -> bool {
        match namespace {
            Namespace::Html => matches!(
                name,
                "applet" | "caption" | "html" | "table" | "td" | "th" | "marquee" | "object"
                    | "template"
            ),
            Namespace::MathMl => {
                matches!(name, "mi" | "mo" | "mn" | "ms" | "mtext" | "annotation-xml")
            }
            Namespace::Svg => matches!(name, "foreignObject" | "desc" | "title"),
        }
    }

    pub(super) fn has_element_in_scope(&self, tag: &str) -> bool {
        self.has_element_in_specific_scope(tag, Self::default_scope_marker)
    }

    /// List item scope: default plus `ol` and `ul`.
    pub(super) fn has_element_in_list_item_scope(&self, tag: &str) -> bool {
        self.has_element_in_specific_scope(tag, |ns, name| {
            Self::default_scope_marker(ns, name)
                || (ns == Namespace::Html && matches!(name, "ol" | "ul"))
        })
    }

    /// Button scope: default plus `button`.
    pub(super) fn has_element_in_button_scope(&self, tag: &str) -> bool {
        self.has_element_in_specific_scope(tag, |ns, name| {
            Self::default_scope_marker(ns, name) || (ns == Namespace::Html && name == "button")
        })
    }

    /// Table scope: html, table, template.
    pub(super) fn has_element_in_table_scope(&self, tag: &str) -> bool {
        self.has_element_in_specific_scope(tag, |ns, name| {
            ns == Namespace::Html && matches!(name, "html" | "table" | "template")
        })
    }

    /// Select scope: everything except optgroup and option is a marker.
    pub(super) fn has_element_in_select_scope(&self, tag: &str) -> bool {
        self.has_element_in_specific_scope(tag, |ns, name| {
            !(ns == Namespace::Html && matches!(name, "optgroup" | "option"))
        })
    }

    /// Whether any of the given tags is in (default) scope.
    pub(super) fn has_any_element_in_scope(&self, tags: &[&str]) -> bool {
        tags.iter().any(|tag| self.has_element_in_scope(tag))
    }

    // =========================================================================
    // Stack manipulation
    // =========================================================================

    pub(super) fn pop_until_html_tag(&mut self, tag: &str) {
        while let Some(id) = self.open_elements.pop() {
            if self.is_html_element(id, tag) {
                break;
            }
        }
    }

    pub(super) fn pop_until_one_of(&mut self, tags: &[&str]) {
        while let Some(id) = self.open_elements.pop() {
            if let Some((Namespace::Html, name)) = self.element_info(id)
                && tags.contains(&name)
            {
                break;
            }
        }
    }

    /// "Clear the stack back to a table context": pop until the current
    /// node is table, template, or html.
    pub(super) fn clear_stack_back_to_table_context(&mut self) {
        self.clear_stack_back_to(&["table", "template", "html"]);
    }

    /// "Clear the stack back to a table body context."
    pub(super) fn clear_stack_back_to_table_body_context(&mut self) {
        self.clear_stack_back_to(&["tbody", "tfoot", "thead", "template", "html"]);
    }

    /// "Clear the stack back to a table row context."
    pub(super) fn clear_stack_back_to_table_row_context(&mut self) {
        self.clear_stack_back_to(&["tr", "template", "html"]);
    }

    fn clear_stack_back_to(&mut self, stop: &[&str]) {
        while let Some(&id) = self.open_elements.last() {
            if let Some((Namespace::Html, name)) = self.element_info(id)
                && stop.contains(&name)
            {
                break;
            }
            let _ = self.open_elements.pop();
        }
    }

    /// [§ 13.2.6.3 Closing elements that have implied end tags](https://html.spec.whatwg.org/multipage/parsing.html#generate-implied-end-tags)
    pub(super) fn generate_implied_end_tags(&mut self, exclude: Option<&str>) {
        loop {
            let Some(&id) = self.open_elements.last() else {
                return;
            };
            let Some((Namespace::Html, name)) = self.element_info(id) else {
                return;
            };
            if exclude == Some(name) {
                return;
            }
            if matches!(
                name,
                "dd" | "dt" | "li" | "optgroup" | "option" | "p" | "rb" | "rp" | "rt" | "rtc"
            ) {
                let _ = self.open_elements.pop();
            } else {
                return;
            }
        }
    }

    /// "Generate all implied end tags thoroughly" (for `</template>`).
    pub(super) fn generate_implied_end_tags_thoroughly(&mut self) {
        loop {
            let Some(&id) = self.open_elements.last() else {
                return;
            };
            let Some((Namespace::Html, name)) = self.element_info(id) else {
                return;
            };
            if matches!(
                name,
                "caption" | "colgroup" | "dd" | "dt" | "li" | "optgroup" | "option" | "p" | "rb"
                    | "rp" | "rt" | "rtc" | "tbody" | "td" | "tfoot" | "th" | "thead" | "tr"
            ) {
                let _ = self.open_elements.pop();
            } else {
                return;
            }
        }
    }

    /// "Close a p element": generate implied end tags except p, then pop
    /// until a p has been popped.
    pub(super) fn close_p_element(&mut self) {
        self.generate_implied_end_tags(Some("p"));
        if !self
            .current_node()
            .is_some_and(|id| self.is_html_element(id, "p"))
        {
            self.parse_error(TreeBuilderErrorKind::EndTagTooEarly, Some("p"));
        }
        self.pop_until_html_tag("p");
    }

    /// "Close the cell": called when a td/th is open and a new cell or row
    /// boundary arrives.
    pub(super) fn close_the_cell(&mut self) {
        self.generate_implied_end_tags(None);
        if !self.current_node().is_some_and(|id| {
            self.is_html_element(id, "td") || self.is_html_element(id, "th")
        }) {
            self.parse_error(TreeBuilderErrorKind::EndTagTooEarly, None);
        }
        self.pop_until_one_of(&["td", "th"]);
        self.clear_active_formatting_to_last_marker();
        self.mode = InsertionMode::InRow;
    }

    // =========================================================================
    // Node creation and insertion
    // =========================================================================

    pub(super) fn attributes_to_list(attributes: &[Attribute]) -> AttributeList {
        attributes
            .iter()
            .map(|attr| (attr.name.clone(), attr.value.clone()))
            .collect()
    }

    /// [§ 13.2.6.1 Create an element for the token](https://html.spec.whatwg.org/multipage/parsing.html#create-an-element-for-the-token)
    ///
    /// A `template` element in the HTML namespace gets its contents
    /// fragment allocated here.
    pub(super) fn create_element_for_token(
        &mut self,
        name: &str,
        attributes: &[Attribute],
        namespace: Namespace,
    ) -> NodeId {
        let template_contents = if namespace == Namespace::Html && name == "template" {
            Some(self.tree.alloc(NodeType::DocumentFragment))
        } else {
            None
        };
        self.tree.alloc(NodeType::Element(ElementData {
            tag_name: name.to_string(),
            namespace,
            attrs: Self::attributes_to_list(attributes),
            template_contents,
        }))
    }

    /// When the insertion target is a `template` element, content goes
    /// into its contents fragment instead.
    fn resolve_template_target(&self, target: NodeId) -> NodeId {
        if let Some(element) = self.tree.as_element(target)
            && element.is_html("template")
            && let Some(contents) = element.template_contents
        {
            return contents;
        }
        target
    }

    /// [§ 13.2.6.1 The appropriate place for inserting a node](https://html.spec.whatwg.org/multipage/parsing.html#appropriate-place-for-inserting-a-node)
    ///
    /// Returns `(parent, Some(reference))` when the caller must insert
    /// before `reference` rather than append.
    pub(super) fn appropriate_place(&self) -> (NodeId, Option<NodeId>) {
        let target = self.current_node().unwrap_or_else(|| self.tree.root());

        if self.foster_parenting
            && matches!(
                self.element_info(target),
                Some((Namespace::Html, "table" | "tbody" | "tfoot" | "thead" | "tr"))
            )
        {
            return self.foster_parent_location();
        }

        (self.resolve_template_target(target), None)
    }

    /// [§ 13.2.6.1 foster parenting](https://html.spec.whatwg.org/multipage/parsing.html#foster-parent)
    ///
    /// "Insert before the last table, or inside the last template's
    /// contents, whichever is deeper in the stack."
    fn foster_parent_location(&self) -> (NodeId, Option<NodeId>) {
        let last_template = self
            .open_elements
            .iter()
            .rposition(|&id| self.is_html_element(id, "template"));
        let last_table = self
            .open_elements
            .iter()
            .rposition(|&id| self.is_html_element(id, "table"));

        if let Some(template_pos) = last_template
            && last_table.is_none_or(|table_pos| template_pos > table_pos)
        {
            let template_id = self.open_elements[template_pos];
            return (self.resolve_template_target(template_id), None);
        }

        let Some(table_pos) = last_table else {
            let first = self
                .open_elements
                .first()
                .copied()
                .unwrap_or_else(|| self.tree.root());
            return (first, None);
        };
        let table_id = self.open_elements[table_pos];
        if let Some(parent) = self.tree.parent(table_id) {
            (parent, Some(table_id))
        } else {
            (self.open_elements[table_pos - 1], None)
        }
    }

    fn insert_at(&mut self, node: NodeId, location: (NodeId, Option<NodeId>)) {
        let (parent, before) = location;
        if let Some(reference) = before {
            self.tree.insert_before(parent, node, reference);
        } else {
            self.tree.append_child(parent, node);
        }
    }

    /// [§ 13.2.6.1 Insert a character](https://html.spec.whatwg.org/multipage/parsing.html#insert-a-character)
    ///
    /// "If there is a Text node immediately before the adjusted insertion
    /// location, then append data to that Text node's data" - this is what
    /// keeps adjacent text coalesced in the final tree.
    pub(super) fn insert_character(&mut self, c: char) {
        let (parent, before) = self.appropriate_place();

        let adjacent_text = if let Some(reference) = before {
            let children = self.tree.children(parent);
            children
                .iter()
                .position(|&id| id == reference)
                .and_then(|pos| pos.checked_sub(1))
                .map(|pos| self.tree.children(parent)[pos])
        } else {
            self.tree.children(parent).last().copied()
        };

        if let Some(text_id) = adjacent_text
            && let Some(node) = self.tree.get_mut(text_id)
            && let NodeType::Text(ref mut data) = node.node_type
        {
            data.push(c);
            return;
        }

        let text_id = self.tree.alloc(NodeType::Text(String::from(c)));
        self.insert_at(text_id, (parent, before));
    }

    /// [§ 13.2.6.1 Insert a comment](https://html.spec.whatwg.org/multipage/parsing.html#insert-a-comment)
    pub(super) fn insert_comment(&mut self, data: &str) {
        let comment = self.tree.alloc(NodeType::Comment(data.to_string()));
        let location = self.appropriate_place();
        self.insert_at(comment, location);
    }

    /// Insert a comment as the last child of the Document node (used
    /// before `<html>` and after `</html>`).
    pub(super) fn insert_comment_on_document(&mut self, data: &str) {
        let comment = self.tree.alloc(NodeType::Comment(data.to_string()));
        let root = self.tree.root();
        self.tree.append_child(root, comment);
    }

    /// Insert a comment as the last child of the root `html` element
    /// (the "after body" rule).
    pub(super) fn insert_comment_on_html_element(&mut self, data: &str) {
        let comment = self.tree.alloc(NodeType::Comment(data.to_string()));
        let target = self
            .open_elements
            .first()
            .copied()
            .unwrap_or_else(|| self.tree.root());
        self.tree.append_child(target, comment);
    }

    /// [§ 13.2.6.1 Insert an HTML element](https://html.spec.whatwg.org/multipage/parsing.html#insert-an-html-element)
    ///
    /// # Panics
    ///
    /// Panics if called with a non-start-tag token, indicating a
    /// tree-builder bug.
    pub(super) fn insert_html_element(&mut self, token: &Token) -> NodeId {
        let Token::StartTag {
            name,
            attributes,
            self_closing,
        } = token
        else {
            panic!("insert_html_element called with non-StartTag token");
        };
        if *self_closing && !Self::is_void_element(name) {
            self.parse_error(TreeBuilderErrorKind::SelfClosingNonVoid, Some(name));
        }
        let element = self.create_element_for_token(name, attributes, Namespace::Html);
        let location = self.appropriate_place();
        self.insert_at(element, location);
        self.open_elements.push(element);
        element
    }

    /// Insert a synthetic HTML element with no attributes (implied body,
    /// tbody, colgroup, ...).
    pub(super) fn insert_phantom_element(&mut self, name: &str) -> NodeId {
        let token = Token::StartTag {
            name: name.to_string(),
            self_closing: false,
            attributes: Vec::new(),
        };
        self.insert_html_element(&token)
    }

    /// [§ 13.2.6.1 Insert a foreign element](https://html.spec.whatwg.org/multipage/parsing.html#insert-a-foreign-element)
    ///
    /// Applies the SVG tag-name case fix and the per-namespace attribute
    /// adjustments before inserting.
    pub(super) fn insert_foreign_element(
        &mut self,
        name: &str,
        attributes: &[Attribute],
        namespace: Namespace,
    ) -> NodeId {
        let mut attributes = attributes.to_vec();
        let name = match namespace {
            Namespace::Svg => {
                adjust_svg_attributes(&mut attributes);
                adjust_foreign_attributes(&mut attributes);
                adjust_svg_tag_name(name).to_string()
            }
            Namespace::MathMl => {
                adjust_mathml_attributes(&mut attributes);
                adjust_foreign_attributes(&mut attributes);
                name.to_string()
            }
            Namespace::Html => name.to_string(),
        };
        let element = self.create_element_for_token(&name, &attributes, namespace);
        let location = self.appropriate_place();
        self.insert_at(element, location);
        self.open_elements.push(element);
        element
    }

    /// [§ 13.2.6.2 / 13.2.6.3 Generic RCDATA / raw text element parsing](https://html.spec.whatwg.org/multipage/parsing.html#generic-rcdata-element-parsing-algorithm)
    ///
    /// The tokenizer has already switched itself into the matching state
    /// when it emitted the start tag; the tree builder only has to park in
    /// the text mode.
    pub(super) fn parse_generic_text_element(&mut self, token: &Token) {
        let _ = self.insert_html_element(token);
        self.original_mode = Some(self.mode);
        self.mode = InsertionMode::Text;
    }

    /// "Merge the attributes": add any attribute the element does not
    /// already have (for duplicate `<html>` / `<body>` tags).
    pub(super) fn merge_attributes_into(&mut self, target: NodeId, attributes: &[Attribute]) {
        if let Some(element) = self.tree.as_element_mut(target) {
            for attr in attributes {
                let _ = element
                    .attrs
                    .push_unique(attr.name.clone(), attr.value.clone());
            }
        }
    }

    // =========================================================================
    // Active formatting elements
    // =========================================================================

    /// [§ 13.2.4.3 Push onto the list of active formatting elements](https://html.spec.whatwg.org/multipage/parsing.html#push-onto-the-list-of-active-formatting-elements)
    ///
    /// Includes the Noah's Ark clause: at most three identical entries
    /// after the last marker.
    pub(super) fn push_active_formatting_element(&mut self, node_id: NodeId, token: &Token) {
        if let Token::StartTag {
            name, attributes, ..
        } = token
        {
            let mut count = 0;
            let mut earliest_match = None;
            for (i, entry) in self.active_formatting.iter().enumerate().rev() {
                match entry {
                    ActiveFormattingElement::Marker => break,
                    ActiveFormattingElement::Element {
                        token:
                            Token::StartTag {
                                name: entry_name,
                                attributes: entry_attrs,
                                ..
                            },
                        ..
                    } if entry_name == name && entry_attrs == attributes => {
                        count += 1;
                        earliest_match = Some(i);
                    }
                    ActiveFormattingElement::Element { .. } => {}
                }
            }
            if count >= 3
                && let Some(index) = earliest_match
            {
                let _ = self.active_formatting.remove(index);
            }
        }

        self.active_formatting.push(ActiveFormattingElement::Element {
            node_id,
            token: token.clone(),
        });
    }

    pub(super) fn push_formatting_marker(&mut self) {
        self.active_formatting.push(ActiveFormattingElement::Marker);
    }

    /// [§ 13.2.4.3 Clear the list of active formatting elements up to the last marker](https://html.spec.whatwg.org/multipage/parsing.html#clear-the-list-of-active-formatting-elements-up-to-the-last-marker)
    pub(super) fn clear_active_formatting_to_last_marker(&mut self) {
        while let Some(entry) = self.active_formatting.pop() {
            if matches!(entry, ActiveFormattingElement::Marker) {
                break;
            }
        }
    }

    fn formatting_index_of(&self, node_id: NodeId) -> Option<usize> {
        self.active_formatting.iter().position(|entry| {
            matches!(entry, ActiveFormattingElement::Element { node_id: id, .. } if *id == node_id)
        })
    }

    /// [§ 13.2.4.3 Reconstruct the active formatting elements](https://html.spec.whatwg.org/multipage/parsing.html#reconstruct-the-active-formatting-elements)
    pub(super) fn reconstruct_active_formatting_elements(&mut self) {
        // STEP 1: Nothing to reconstruct.
        if self.active_formatting.is_empty() {
            return;
        }

        // STEP 2: The last entry is a marker or already open.
        if let Some(last) = self.active_formatting.last() {
            match last {
                ActiveFormattingElement::Marker => return,
                ActiveFormattingElement::Element { node_id, .. } => {
                    if self.open_elements.contains(node_id) {
                        return;
                    }
                }
            }
        }

        // STEP 4-6: Rewind to the entry after the last marker or open
        // element.
        let mut entry_index = self.active_formatting.len() - 1;
        loop {
            if entry_index == 0 {
                break;
            }
            entry_index -= 1;
            match &self.active_formatting[entry_index] {
                ActiveFormattingElement::Marker => {
                    entry_index += 1;
                    break;
                }
                ActiveFormattingElement::Element { node_id, .. } => {
                    if self.open_elements.contains(node_id) {
                        entry_index += 1;
                        break;
                    }
                }
            }
        }

        // STEP 7-10: Recreate each entry from its token and replace the
        // list entry with the new element.
        loop {
            let token = match &self.active_formatting[entry_index] {
                ActiveFormattingElement::Element { token, .. } => token.clone(),
                ActiveFormattingElement::Marker => {
                    entry_index += 1;
                    if entry_index >= self.active_formatting.len() {
                        break;
                    }
                    continue;
                }
            };

            let new_element = self.insert_html_element(&token);
            self.active_formatting[entry_index] = ActiveFormattingElement::Element {
                node_id: new_element,
                token,
            };

            entry_index += 1;
            if entry_index >= self.active_formatting.len() {
                break;
            }
        }
    }

    // =========================================================================
    // The adoption agency algorithm
    // =========================================================================

    /// [§ 13.2.6.4.7 "in body" - Any other end tag](https://html.spec.whatwg.org/multipage/parsing.html#parsing-main-inbody)
    pub(super) fn any_other_end_tag(&mut self, tag: &str) {
        let mut i = self.open_elements.len();
        while i > 0 {
            i -= 1;
            let node_id = self.open_elements[i];
            let Some((namespace, name)) = self.element_info(node_id) else {
                continue;
            };
            if namespace == Namespace::Html && name == tag {
                self.generate_implied_end_tags(Some(tag));
                if self.open_elements.len() != i + 1 {
                    self.parse_error(TreeBuilderErrorKind::EndTagTooEarly, Some(tag));
                }
                self.open_elements.truncate(i);
                return;
            }
            if Self::is_special_element(namespace, name) {
                self.parse_error(TreeBuilderErrorKind::UnexpectedEndTag, Some(tag));
                return;
            }
        }
    }

    /// [§ 13.2.6.4.7 The adoption agency algorithm](https://html.spec.whatwg.org/multipage/parsing.html#adoption-agency-algorithm)
    ///
    /// Rewrites the tree when formatting and special elements are
    /// mis-nested. Outer loop bound 8, inner loop bound 3 per spec.
    pub(super) fn run_adoption_agency(&mut self, subject: &str) {
        // STEP 2: Trivial case: the current node matches and is not in the
        // formatting list.
        if let Some(&current) = self.open_elements.last()
            && self.is_html_element(current, subject)
            && self.formatting_index_of(current).is_none()
        {
            let _ = self.open_elements.pop();
            return;
        }

        let mut outer_loop_counter = 0;

        loop {
            // STEP 4.1-4.2
            if outer_loop_counter >= 8 {
                return;
            }
            outer_loop_counter += 1;

            // STEP 4.3: "the last element in the list of active formatting
            // elements that is between the end of the list and the last
            // marker... and has the tag name subject."
            let formatting_afl_index = {
                let mut found = None;
                for (i, entry) in self.active_formatting.iter().enumerate().rev() {
                    match entry {
                        ActiveFormattingElement::Marker => break,
                        ActiveFormattingElement::Element { token, .. } => {
                            if token.tag_name() == Some(subject) {
                                found = Some(i);
                                break;
                            }
                        }
                    }
                }
                found
            };

            // STEP 4.4: No formatting element: act as "any other end tag".
            let Some(formatting_afl_index) = formatting_afl_index else {
                self.any_other_end_tag(subject);
                return;
            };
            let formatting_element = match &self.active_formatting[formatting_afl_index] {
                ActiveFormattingElement::Element { node_id, .. } => *node_id,
                ActiveFormattingElement::Marker => unreachable!(),
            };

            // STEP 4.5: In the list but no longer open.
            let Some(formatting_stack_index) = self
                .open_elements
                .iter()
                .position(|&id| id == formatting_element)
            else {
                self.parse_error(TreeBuilderErrorKind::AdoptionAgencyMisnesting, Some(subject));
                let _ = self.active_formatting.remove(formatting_afl_index);
                return;
            };

            // STEP 4.6: Open but not in scope.
            if !self.has_element_in_scope(subject) {
                self.parse_error(TreeBuilderErrorKind::AdoptionAgencyMisnesting, Some(subject));
                return;
            }

            // STEP 4.7: Not the current node: parse error, continue anyway.
            if self.open_elements.last() != Some(&formatting_element) {
                self.parse_error(TreeBuilderErrorKind::AdoptionAgencyMisnesting, Some(subject));
            }

            // STEP 4.8: The furthest block: topmost special element below
            // the formatting element.
            let furthest_block_index = (formatting_stack_index + 1..self.open_elements.len())
                .find(|&i| {
                    let id = self.open_elements[i];
                    self.element_info(id)
                        .is_some_and(|(ns, name)| Self::is_special_element(ns, name))
                });

            // STEP 4.9: No furthest block: pop through the formatting
            // element and drop it from the list.
            let Some(furthest_block_index) = furthest_block_index else {
                self.open_elements.truncate(formatting_stack_index);
                let _ = self.active_formatting.remove(formatting_afl_index);
                return;
            };
            let furthest_block = self.open_elements[furthest_block_index];

            // STEP 4.10: Common ancestor: the element immediately above
            // the formatting element.
            let common_ancestor = self.open_elements[formatting_stack_index - 1];

            // STEP 4.11: Bookmark the formatting element's list position.
            let mut bookmark = formatting_afl_index;

            // STEP 4.12-4.13: Inner loop.
            let mut node_stack_index = furthest_block_index;
            let mut last_node = furthest_block;
            let mut inner_loop_counter = 0;

            loop {
                inner_loop_counter += 1;
                node_stack_index -= 1;
                let node_id = self.open_elements[node_stack_index];

                if node_id == formatting_element {
                    break;
                }

                // STEP 4.13.4: Past three iterations, drop the node from
                // the formatting list.
                if inner_loop_counter > 3
                    && let Some(afl_index) = self.formatting_index_of(node_id)
                {
                    let _ = self.active_formatting.remove(afl_index);
                    if bookmark > afl_index {
                        bookmark -= 1;
                    }
                }

                // STEP 4.13.5: Not in the formatting list: remove from the
                // stack and continue upward. After the removal the index
                // already points at the element that was above the node.
                let Some(node_afl_index) = self.formatting_index_of(node_id) else {
                    let _ = self.open_elements.remove(node_stack_index);
                    continue;
                };

                // STEP 4.13.6: Replace the entry with a fresh element.
                let node_token = match &self.active_formatting[node_afl_index] {
                    ActiveFormattingElement::Element { token, .. } => token.clone(),
                    ActiveFormattingElement::Marker => unreachable!(),
                };
                let new_element = {
                    let Token::StartTag {
                        name, attributes, ..
                    } = &node_token
                    else {
                        unreachable!()
                    };
                    self.create_element_for_token(name, attributes, Namespace::Html)
                };
                self.active_formatting[node_afl_index] = ActiveFormattingElement::Element {
                    node_id: new_element,
                    token: node_token,
                };
                self.open_elements[node_stack_index] = new_element;
                let node_id = new_element;

                // STEP 4.13.7: Move the bookmark after the new entry.
                if last_node == furthest_block {
                    bookmark = node_afl_index + 1;
                }

                // STEP 4.13.8: Reparent last node under node.
                self.tree.detach(last_node);
                self.tree.append_child(node_id, last_node);

                // STEP 4.13.9
                last_node = node_id;
            }

            // STEP 4.14: Place last node below the common ancestor, foster
            // parenting if the ancestor is a table part.
            self.tree.detach(last_node);
            if matches!(
                self.element_info(common_ancestor),
                Some((Namespace::Html, "table" | "tbody" | "tfoot" | "thead" | "tr"))
            ) {
                let location = self.foster_parent_location();
                self.insert_at(last_node, location);
            } else {
                let target = self.resolve_template_target(common_ancestor);
                self.tree.append_child(target, last_node);
            }

            // STEP 4.15: A fresh element for the formatting token, parented
            // under the furthest block.
            let formatting_token = match &self.active_formatting[formatting_afl_index] {
                ActiveFormattingElement::Element { token, .. } => token.clone(),
                ActiveFormattingElement::Marker => unreachable!(),
            };
            let new_element = {
                let Token::StartTag {
                    name, attributes, ..
                } = &formatting_token
                else {
                    unreachable!()
                };
                self.create_element_for_token(name, attributes, Namespace::Html)
            };

            // STEP 4.16-4.17: Move the furthest block's children into the
            // new element, then append it.
            self.tree.move_children(furthest_block, new_element);
            self.tree.append_child(furthest_block, new_element);

            // STEP 4.18: Swap the formatting list entry to the bookmark.
            let _ = self.active_formatting.remove(formatting_afl_index);
            if bookmark > formatting_afl_index {
                bookmark -= 1;
            }
            bookmark = bookmark.min(self.active_formatting.len());
            self.active_formatting.insert(
                bookmark,
                ActiveFormattingElement::Element {
                    node_id: new_element,
                    token: formatting_token,
                },
            );

            // STEP 4.19: Same swap on the stack of open elements.
            if let Some(pos) = self
                .open_elements
                .iter()
                .position(|&id| id == formatting_element)
            {
                let _ = self.open_elements.remove(pos);
            }
            if let Some(fb_pos) = self
                .open_elements
                .iter()
                .position(|&id| id == furthest_block)
            {
                self.open_elements.insert(fb_pos + 1, new_element);
            }
        }
    }

    // =========================================================================
    // Mode reset and foreign content
    // =========================================================================

    /// [§ 13.2.4.1 Reset the insertion mode appropriately](https://html.spec.whatwg.org/multipage/parsing.html#reset-the-insertion-mode-appropriately)
    pub(super) fn reset_insertion_mode(&mut self) {
        for (i, &node_id) in self.open_elements.iter().enumerate().rev() {
            let last = i == 0;
            // In fragment parsing the bottom of the stack stands in for
            // the context element.
            let node_id = if last && self.fragment.is_some() {
                self.fragment.as_ref().map_or(node_id, |f| f.context_node)
            } else {
                node_id
            };
            let Some((Namespace::Html, name)) = self.element_info(node_id) else {
                if last {
                    break;
                }
                continue;
            };
            match name {
                "select" => {
                    self.mode = InsertionMode::InSelect;
                    return;
                }
                "td" | "th" if !last => {
                    self.mode = InsertionMode::InCell;
                    return;
                }
                "tr" => {
                    self.mode = InsertionMode::InRow;
                    return;
                }
                "tbody" | "thead" | "tfoot" => {
                    self.mode = InsertionMode::InTableBody;
                    return;
                }
                "caption" => {
                    self.mode = InsertionMode::InCaption;
                    return;
                }
                "colgroup" => {
                    self.mode = InsertionMode::InColumnGroup;
                    return;
                }
                "table" => {
                    self.mode = InsertionMode::InTable;
                    return;
                }
                "template" => {
                    self.mode = self
                        .template_modes
                        .last()
                        .copied()
                        .unwrap_or(InsertionMode::InTemplate);
                    return;
                }
                "head" if !last => {
                    self.mode = InsertionMode::InHead;
                    return;
                }
                "body" | "html" => {
                    self.mode = InsertionMode::InBody;
                    return;
                }
                "frameset" => {
                    self.mode = InsertionMode::InFrameset;
                    return;
                }
                _ => {
                    if last {
                        break;
                    }
                }
            }
        }
        self.mode = InsertionMode::InBody;
    }

    /// [§ 13.2.6.5 The rules for parsing tokens in foreign content](https://html.spec.whatwg.org/multipage/parsing.html#parsing-main-inforeign)
    fn process_foreign(&mut self, token: &Token) -> ModeOutcome {
        match token {
            Token::Character { data: '\0' } => {
                self.parse_error(TreeBuilderErrorKind::NullCharacter, None);
                self.insert_character('\u{FFFD}');
                ModeOutcome::Done
            }
            Token::Character { data } if Self::is_parser_whitespace(*data) => {
                self.insert_character(*data);
                ModeOutcome::Done
            }
            Token::Character { data } => {
                self.insert_character(*data);
                self.frameset_ok = false;
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
                if Self::is_disallowed_foreign_start_tag(name, attributes) {
                    // "Pop elements from the stack of open elements until a
                    // MathML text integration point, an HTML integration
                    // point, or an element in the HTML namespace has been
                    // reached, then reprocess the token."
                    self.parse_error(
                        TreeBuilderErrorKind::HtmlElementInForeignContent,
                        Some(name),
                    );
                    self.pop_to_html_boundary();
                    return ModeOutcome::reprocess_as_html();
                }

                // "Insert a foreign element for the token, in the adjusted
                // current node's namespace."
                let namespace = self
                    .adjusted_current_node()
                    .and_then(|id| self.tree.as_element(id))
                    .map_or(Namespace::Html, |e| e.namespace);
                let _ = self.insert_foreign_element(name, attributes, namespace);
                if *self_closing {
                    let _ = self.open_elements.pop();
                }
                ModeOutcome::Done
            }
            Token::EndTag { name, .. } => {
                if matches!(name.as_str(), "br" | "p") {
                    self.parse_error(
                        TreeBuilderErrorKind::HtmlElementInForeignContent,
                        Some(name),
                    );
                    self.pop_to_html_boundary();
                    return ModeOutcome::reprocess_as_html();
                }

                // Walk the stack looking for a case-insensitive tag name
                // match; an HTML element on the way restarts HTML dispatch.
                if !self
                    .current_node()
                    .and_then(|id| self.tag_name(id))
                    .is_some_and(|current| current.eq_ignore_ascii_case(name))
                {
                    self.parse_error(TreeBuilderErrorKind::UnexpectedEndTag, Some(name));
                }
                let mut i = self.open_elements.len();
                let mut at_current_node = true;
                while i > 0 {
                    i -= 1;
                    let node_id = self.open_elements[i];
                    let Some((namespace, node_name)) = self.element_info(node_id) else {
                        continue;
                    };
                    if !at_current_node && namespace == Namespace::Html {
                        return ModeOutcome::reprocess_as_html();
                    }
                    if node_name.eq_ignore_ascii_case(name) {
                        self.open_elements.truncate(i);
                        return ModeOutcome::Done;
                    }
                    at_current_node = false;
                }
                ModeOutcome::Done
            }
            Token::EndOfFile => {
                // The dispatcher routes EOF to the HTML rules.
                ModeOutcome::Done
            }
        }
    }

    fn pop_to_html_boundary(&mut self) {
        while let Some(&id) = self.open_elements.last() {
            if self.is_mathml_text_integration_point(id)
                || self.is_html_integration_point(id)
                || matches!(self.element_info(id), Some((Namespace::Html, _)))
            {
                break;
            }
            let _ = self.open_elements.pop();
        }
    }

    fn is_disallowed_foreign_start_tag(name: &str, attributes: &[Attribute]) -> bool {
        match name {
            "b" | "big" | "blockquote" | "body" | "br" | "center" | "code" | "dd" | "div"
            | "dl" | "dt" | "em" | "embed" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "head"
            | "hr" | "i" | "img" | "li" | "listing" | "menu" | "meta" | "nobr" | "ol" | "p"
            | "pre" | "ruby" | "s" | "small" | "span" | "strong" | "strike" | "sub" | "sup"
            | "table" | "tt" | "u" | "ul" | "var" => true,
            "font" => attributes
                .iter()
                .any(|attr| matches!(attr.name.as_str(), "color" | "face" | "size")),
            _ => false,
        }
    }

    // =========================================================================
    // Character classification, errors, finish passes
    // =========================================================================

    /// The whitespace set used by tree construction (CR never survives
    /// input preprocessing).
    pub(super) const fn is_parser_whitespace(c: char) -> bool {
        matches!(c, '\t' | '\n' | '\x0C' | '\r' | ' ')
    }

    /// Record a tree-construction parse error. Parsing always continues.
    pub(super) fn parse_error(&mut self, kind: TreeBuilderErrorKind, tag: Option<&str>) {
        self.errors.push(TreeBuilderError {
            kind,
            tag: tag.map(str::to_string),
        });
        match tag {
            Some(tag) => warn_once("HTML Parser", &format!("{kind} ({tag})")),
            None => warn_once("HTML Parser", &format!("{kind}")),
        }
    }

    /// "Stop parsing": drop the stacks; the document is done.
    pub(super) fn stop_parsing(&mut self) {
        self.stopped = true;
        self.open_elements.clear();
        self.active_formatting.clear();
        self.template_modes.clear();
    }

    /// Switch the tokenizer into PLAINTEXT on the tree builder's behalf
    /// (the sink's `Plaintext` result).
    pub(super) fn request_plaintext(&mut self) {
        self.tokenizer.switch_state(TokenizerState::PLAINTEXT);
    }

    /// After parsing: fill every `<selectedcontent>` with a deep clone of
    /// the selected (or first) `<option>` of its enclosing `<select>`.
    /// Later elements win; earlier content is overwritten.
    fn populate_selected_content(&mut self) {
        let mut targets = Vec::new();
        self.collect_elements_named("selectedcontent", self.tree.root(), &mut targets);

        for target in targets {
            let Some(select) = self
                .tree
                .ancestors(target)
                .find(|&id| self.is_html_element(id, "select"))
            else {
                continue;
            };

            let mut options = Vec::new();
            self.collect_elements_named("option", select, &mut options);
            let chosen = options
                .iter()
                .copied()
                .find(|&id| {
                    self.tree
                        .as_element(id)
                        .is_some_and(|e| e.attrs.contains("selected"))
                })
                .or_else(|| options.first().copied());
            let Some(option) = chosen else { continue };

            for child in self.tree.children(target).to_vec() {
                self.tree.remove_child(target, child);
            }
            for child in self.tree.children(option).to_vec() {
                let clone = self.tree.clone_subtree(child);
                self.tree.append_child(target, clone);
            }
        }
    }

    fn collect_elements_named(&self, tag: &str, from: NodeId, out: &mut Vec<NodeId>) {
        if self.is_html_element(from, tag) {
            out.push(from);
        }
        if let Some(element) = self.tree.as_element(from)
            && let Some(contents) = element.template_contents
        {
            self.collect_elements_named(tag, contents, out);
        }
        for &child in self.tree.children(from) {
            self.collect_elements_named(tag, child, out);
        }
    }
}
