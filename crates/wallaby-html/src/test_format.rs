//! Serialization to the html5lib-tests tree-construction format.
//!
//! The conformance fixtures express expected trees as indented `| <tag>`
//! listings: attributes sorted by name on their own lines, text quoted,
//! `svg ` / `math ` namespace prefixes, and a `content` marker between a
//! `<template>` and its fragment.

use std::fmt::Write as _;

use wallaby_dom::{DomTree, NodeId, NodeType};

/// Render a parsed tree in the html5lib tree-construction format.
#[must_use]
pub fn to_test_format(tree: &DomTree) -> String {
    let mut out = String::new();
    for &child in tree.children(tree.root()) {
        write_node(tree, child, 0, &mut out);
    }
    out
}

fn write_node(tree: &DomTree, id: NodeId, depth: usize, out: &mut String) {
    let Some(node) = tree.get(id) else { return };
    let pad = "  ".repeat(depth);

    match &node.node_type {
        NodeType::Element(data) => {
            let _ = writeln!(
                out,
                "| {pad}<{}{}>",
                data.namespace.test_format_prefix(),
                data.tag_name
            );

            // "the attribute lines are sorted lexicographically". Foreign
            // attributes already carry their `xlink href` style names from
            // the adjust-foreign-attributes step.
            let mut attrs: Vec<(&str, &str)> = data
                .attrs
                .iter()
                .map(|attr| (attr.name.as_str(), attr.value.as_str()))
                .collect();
            attrs.sort_unstable_by_key(|&(name, _)| name);
            let attr_pad = "  ".repeat(depth + 1);
            for (name, value) in attrs {
                let _ = writeln!(out, "| {attr_pad}{name}=\"{value}\"");
            }

            if let Some(contents) = data.template_contents {
                let _ = writeln!(out, "| {attr_pad}content");
                for &child in tree.children(contents) {
                    write_node(tree, child, depth + 2, out);
                }
            }

            for &child in &node.children {
                write_node(tree, child, depth + 1, out);
            }
        }
        NodeType::Text(data) => {
            let _ = writeln!(out, "| {pad}\"{data}\"");
        }
        NodeType::Comment(data) => {
            let _ = writeln!(out, "| {pad}<!-- {data} -->");
        }
        NodeType::Doctype(doctype) => {
            let name = doctype.name.as_deref().unwrap_or_default();
            if doctype.public_id.is_some() || doctype.system_id.is_some() {
                let public = doctype.public_id.as_deref().unwrap_or_default();
                let system = doctype.system_id.as_deref().unwrap_or_default();
                let _ = writeln!(out, "| {pad}<!DOCTYPE {name} \"{public}\" \"{system}\">");
            } else if name.is_empty() {
                let _ = writeln!(out, "| {pad}<!DOCTYPE >");
            } else {
                let _ = writeln!(out, "| {pad}<!DOCTYPE {name}>");
            }
        }
        NodeType::Document | NodeType::DocumentFragment => {
            for &child in &node.children {
                write_node(tree, child, depth, out);
            }
        }
    }
}
