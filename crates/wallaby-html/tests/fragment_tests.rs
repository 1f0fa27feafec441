//! Fragment-context parsing tests.

use wallaby_html::dom::{Namespace, NodeId, NodeType};
use wallaby_html::test_format::to_test_format;
use wallaby_html::{FragmentContext, ParseOptions, parse_document};

fn parse_fragment(context: FragmentContext, html: &str) -> wallaby_html::dom::DomTree {
    let opts = ParseOptions {
        fragment_context: Some(context),
        ..ParseOptions::default()
    };
    parse_document(html, &opts).unwrap().tree
}

#[test]
fn fragment_root_is_a_document_fragment() {
    let tree = parse_fragment(FragmentContext::html("div"), "<p>x</p>");
    assert!(matches!(
        tree.get(NodeId::ROOT).unwrap().node_type,
        NodeType::DocumentFragment
    ));
}

#[test]
fn div_context_parses_phrasing_content() {
    let tree = parse_fragment(FragmentContext::html("div"), "<p>one</p><p>two</p>");
    assert_eq!(
        to_test_format(&tree),
        "\
| <p>
|   \"one\"
| <p>
|   \"two\"
"
    );
}

#[test]
fn no_synthetic_skeleton_in_fragments() {
    let tree = parse_fragment(FragmentContext::html("div"), "x");
    // Just the text; no html/head/body wrapper survives.
    assert_eq!(to_test_format(&tree), "| \"x\"\n");
}

#[test]
fn tr_context_builds_cells() {
    let tree = parse_fragment(FragmentContext::html("tr"), "<td>A</td><td>B</td>");
    assert_eq!(
        to_test_format(&tree),
        "\
| <td>
|   \"A\"
| <td>
|   \"B\"
"
    );
}

#[test]
fn tbody_context_builds_rows() {
    let tree = parse_fragment(FragmentContext::html("tbody"), "<tr><td>A</td></tr>");
    assert_eq!(
        to_test_format(&tree),
        "\
| <tr>
|   <td>
|     \"A\"
"
    );
}

#[test]
fn td_context_drops_stray_cell_tags() {
    let tree = parse_fragment(FragmentContext::html("td"), "<td>x</td>");
    assert_eq!(to_test_format(&tree), "| \"x\"\n");
}

#[test]
fn textarea_context_is_rcdata() {
    let tree = parse_fragment(FragmentContext::html("textarea"), "x<div>y");
    // Everything is text; the div never becomes an element.
    assert_eq!(to_test_format(&tree), "| \"x<div>y\"\n");
}

#[test]
fn script_context_is_raw_text() {
    let tree = parse_fragment(FragmentContext::html("script"), "a<!--b");
    assert_eq!(to_test_format(&tree), "| \"a<!--b\"\n");
}

#[test]
fn svg_context_parses_foreign_content() {
    let context = FragmentContext {
        tag_name: "svg".to_string(),
        namespace: Some(Namespace::Svg),
    };
    let tree = parse_fragment(context, "<circle r=\"1\"/><rect/>");
    assert_eq!(
        to_test_format(&tree),
        "\
| <svg circle>
|   r=\"1\"
| <svg rect>
"
    );
}

#[test]
fn template_context_collects_table_rows() {
    let tree = parse_fragment(FragmentContext::html("template"), "<tr><td>x</td></tr>");
    assert_eq!(
        to_test_format(&tree),
        "\
| <tr>
|   <td>
|     \"x\"
"
    );
}

#[test]
fn end_tag_for_html_in_fragment_is_reported() {
    let opts = ParseOptions {
        fragment_context: Some(FragmentContext::html("html")),
        collect_errors: true,
        ..ParseOptions::default()
    };
    let output = parse_document("<body></body></html><!--late-->", &opts).unwrap();
    // The fragment still parses; the stray end tag is observational.
    assert!(!output.tree.children(NodeId::ROOT).is_empty());
}
