//! Fragment-context parsing.
//!
//! [§ 13.2.10 Parsing HTML fragments](https://html.spec.whatwg.org/multipage/parsing.html#parsing-html-fragments)
//!
//! A fragment parse builds a synthetic `html` root inside a
//! `#document-fragment`, seeds the tokenizer and the insertion mode from
//! the context element, and unwraps the wrapper when parsing finishes.

use wallaby_dom::{Namespace, NodeId};

use super::core::{InsertionMode, Parser};
use super::foreign_content::adjust_svg_tag_name;
use crate::tokenizer::TokenizerState;

/// The context element a fragment is parsed inside of.
#[derive(Debug, Clone)]
pub struct FragmentContext {
    /// The context element's tag name.
    pub tag_name: String,
    /// The context element's namespace; `None` means HTML.
    pub namespace: Option<Namespace>,
}

impl FragmentContext {
    /// An HTML-namespace fragment context.
    #[must_use]
    pub fn html(tag_name: &str) -> Self {
        Self {
            tag_name: tag_name.to_string(),
            namespace: None,
        }
    }
}

/// Internal fragment state held by the parser.
#[derive(Debug)]
pub(super) struct FragmentInfo {
    /// The (detached or stack-pushed) context element node.
    pub(super) context_node: NodeId,
    /// The context element's namespace.
    pub(super) namespace: Namespace,
}

impl Parser {
    /// Build a parser configured for fragment-context parsing.
    #[must_use]
    pub fn new_fragment(
        input: &str,
        tokenizer_opts: &crate::TokenizerOptions,
        context: &FragmentContext,
        iframe_srcdoc: bool,
    ) -> Self {
        let namespace = context.namespace.unwrap_or(Namespace::Html);
        let tag_name = if namespace == Namespace::Svg {
            adjust_svg_tag_name(&context.tag_name).to_string()
        } else {
            context.tag_name.clone()
        };

        // The tokenizer starts in the state the context element would have
        // left it in.
        let mut opts = tokenizer_opts.clone();
        if namespace == Namespace::Html {
            match tag_name.as_str() {
                "title" | "textarea" => {
                    opts.initial_state = Some(TokenizerState::RCDATA);
                    opts.initial_rawtext_tag = Some(tag_name.clone());
                }
                "style" | "xmp" | "iframe" | "noembed" | "noframes" => {
                    opts.initial_state = Some(TokenizerState::RAWTEXT);
                    opts.initial_rawtext_tag = Some(tag_name.clone());
                }
                "script" => {
                    opts.initial_state = Some(TokenizerState::ScriptData);
                    opts.initial_rawtext_tag = Some(tag_name.clone());
                }
                "plaintext" => {
                    opts.initial_state = Some(TokenizerState::PLAINTEXT);
                }
                _ => {}
            }
        }

        let mut parser = Self::new(input, &opts, iframe_srcdoc);
        parser.tree = wallaby_dom::DomTree::new_fragment();

        // "Create a new html element with no attributes. Append it to the
        // fragment. Put it on the stack of open elements."
        let html_root = parser.create_element_for_token("html", &[], Namespace::Html);
        let root = parser.tree.root();
        parser.tree.append_child(root, html_root);
        parser.open_elements.push(html_root);

        // The context element itself: HTML contexts keep it off the stack
        // (it only informs dispatch decisions); foreign contexts push it so
        // content nests inside and foreign dispatch applies.
        let context_node = parser.create_element_for_token(&tag_name, &[], namespace);
        if namespace != Namespace::Html {
            parser.tree.append_child(html_root, context_node);
            parser.open_elements.push(context_node);
        }

        if namespace == Namespace::Html {
            if tag_name == "template" {
                parser.template_modes.push(InsertionMode::InTemplate);
            }
            if tag_name == "form" {
                parser.form_element = Some(context_node);
            }
        }

        parser.mode = Self::initial_fragment_mode(namespace, &tag_name);
        parser.fragment = Some(FragmentInfo {
            context_node,
            namespace,
        });
        parser.sync_tokenizer_flags();
        parser
    }

    /// The insertion mode a fragment starts in, keyed on the context
    /// element.
    fn initial_fragment_mode(namespace: Namespace, tag_name: &str) -> InsertionMode {
        if namespace != Namespace::Html {
            return InsertionMode::InBody;
        }
        match tag_name {
            "html" => InsertionMode::BeforeHead,
            "tbody" | "thead" | "tfoot" => InsertionMode::InTableBody,
            "tr" => InsertionMode::InRow,
            "td" | "th" => InsertionMode::InCell,
            "caption" => InsertionMode::InCaption,
            "colgroup" => InsertionMode::InColumnGroup,
            "table" => InsertionMode::InTable,
            "template" => InsertionMode::InTemplate,
            _ => InsertionMode::InBody,
        }
    }

    /// Move the parsed content up to the fragment root and drop the
    /// synthetic `html` wrapper.
    pub(super) fn unwrap_fragment(&mut self) {
        let Some(info) = &self.fragment else { return };
        let (namespace, context_node) = (info.namespace, info.context_node);

        let root = self.tree.root();
        let html_root = self.tree.children(root).first().copied();

        // Foreign contexts nested their content inside the pushed context
        // element; HTML contexts put it directly under the wrapper.
        let source = if namespace == Namespace::Html {
            html_root
        } else {
            Some(context_node)
        };

        let Some(source) = source else { return };
        for child in self.tree.children(source).to_vec() {
            self.tree.remove_child(source, child);
            self.tree.append_child(root, child);
        }
        if let Some(html_root) = html_root {
            self.tree.detach(html_root);
        }
    }
}
