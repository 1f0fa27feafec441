//! Integration tests for the HTML tree builder.

use wallaby_html::dom::{DomTree, Node, NodeId, NodeType, TextOptions};
use wallaby_html::{ParseError, ParseOptions, QuirksMode, TreeBuilderErrorKind, parse_document};

/// Helper to parse HTML and return the DOM tree.
fn parse(html: &str) -> DomTree {
    parse_document(html, &ParseOptions::default())
        .expect("non-strict parse cannot fail")
        .tree
}

/// Helper to get element by tag name (first match, depth-first).
fn find_element(tree: &DomTree, from: NodeId, tag: &str) -> Option<NodeId> {
    if let Some(data) = tree.as_element(from)
        && data.tag_name == tag
    {
        return Some(from);
    }
    if let Some(data) = tree.as_element(from)
        && let Some(contents) = data.template_contents
        && let Some(found) = find_element(tree, contents, tag)
    {
        return Some(found);
    }
    for &child_id in tree.children(from) {
        if let Some(found) = find_element(tree, child_id, tag) {
            return Some(found);
        }
    }
    None
}

/// Helper to get text content of a node (concatenated).
fn text_content(tree: &DomTree, id: NodeId) -> String {
    tree.text_content(id, &TextOptions::default())
}

/// Helper to get a node reference.
fn get_node(tree: &DomTree, id: NodeId) -> &Node {
    tree.get(id).expect("node not found")
}

fn child_tag_names(tree: &DomTree, id: NodeId) -> Vec<String> {
    tree.children(id)
        .iter()
        .filter_map(|&child| tree.as_element(child).map(|e| e.tag_name.clone()))
        .collect()
}

#[test]
fn document_structure() {
    let tree = parse("<!DOCTYPE html><html><head></head><body></body></html>");

    let root = get_node(&tree, NodeId::ROOT);
    assert!(matches!(root.node_type, NodeType::Document));

    // The doctype node comes first, then the html element.
    let first = tree.children(NodeId::ROOT)[0];
    assert!(matches!(
        get_node(&tree, first).node_type,
        NodeType::Doctype(_)
    ));

    let html_id = find_element(&tree, NodeId::ROOT, "html").unwrap();
    assert!(find_element(&tree, html_id, "head").is_some());
    assert!(find_element(&tree, html_id, "body").is_some());
}

#[test]
fn implied_html_head_body() {
    let tree = parse("Hello");
    let html_id = find_element(&tree, NodeId::ROOT, "html").unwrap();
    assert_eq!(child_tag_names(&tree, html_id), ["head", "body"]);

    let body_id = find_element(&tree, NodeId::ROOT, "body").unwrap();
    assert_eq!(text_content(&tree, body_id), "Hello");
}

#[test]
fn text_node_coalescing() {
    // "a", entity, "b" all arrive as separate character tokens but must
    // end up in a single text node.
    let tree = parse("<p>a&amp;b</p>");
    let p_id = find_element(&tree, NodeId::ROOT, "p").unwrap();
    assert_eq!(tree.children(p_id).len(), 1);
    assert_eq!(tree.as_text(tree.children(p_id)[0]), Some("a&b"));
}

#[test]
fn comment_node() {
    let tree = parse("<html><body><!-- test comment --></body></html>");
    let body_id = find_element(&tree, NodeId::ROOT, "body").unwrap();

    let has_comment = tree.children(body_id).iter().any(|&child_id| {
        matches!(
            &get_node(&tree, child_id).node_type,
            NodeType::Comment(data) if data == " test comment "
        )
    });
    assert!(has_comment);
}

#[test]
fn nested_elements() {
    let tree = parse("<html><body><div><p>Text</p></div></body></html>");
    let div_id = find_element(&tree, NodeId::ROOT, "div").unwrap();
    let p_id = find_element(&tree, div_id, "p").unwrap();
    assert_eq!(text_content(&tree, p_id), "Text");
}

#[test]
fn element_attributes_preserve_order() {
    let tree = parse(r#"<html><body><div id="main" class="container" data-x="1"></div></body></html>"#);
    let div_id = find_element(&tree, NodeId::ROOT, "div").unwrap();
    let div = tree.as_element(div_id).unwrap();

    assert_eq!(div.attrs.get("id"), Some("main"));
    assert_eq!(div.attrs.get("class"), Some("container"));
    let names: Vec<&str> = div.attrs.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(names, ["id", "class", "data-x"]);
}

#[test]
fn void_elements_do_not_nest() {
    let tree = parse(r#"<div><br><img src="x"><p>after</p></div>"#);
    let div_id = find_element(&tree, NodeId::ROOT, "div").unwrap();
    assert_eq!(child_tag_names(&tree, div_id), ["br", "img", "p"]);
    let br_id = find_element(&tree, div_id, "br").unwrap();
    assert!(tree.children(br_id).is_empty());
}

#[test]
fn paragraph_closes_paragraph() {
    let tree = parse("<p>one<p>two");
    let body_id = find_element(&tree, NodeId::ROOT, "body").unwrap();
    assert_eq!(child_tag_names(&tree, body_id), ["p", "p"]);
}

#[test]
fn list_items_close_each_other() {
    let tree = parse("<ul><li>a<li>b</ul>");
    let ul_id = find_element(&tree, NodeId::ROOT, "ul").unwrap();
    assert_eq!(child_tag_names(&tree, ul_id), ["li", "li"]);
}

#[test]
fn adoption_agency_reconstructs_formatting() {
    let tree = parse("<b><i></b>x");
    let body_id = find_element(&tree, NodeId::ROOT, "body").unwrap();

    // The b keeps its original i child; the text lands in a reconstructed
    // i that is a sibling of the b.
    assert_eq!(child_tag_names(&tree, body_id), ["b", "i"]);
    let b_id = tree.children(body_id)[0];
    assert_eq!(child_tag_names(&tree, b_id), ["i"]);
    let second_i = tree.children(body_id)[1];
    assert_eq!(text_content(&tree, second_i), "x");
}

#[test]
fn adoption_agency_with_furthest_block() {
    // The classic <a> / <div> misnesting: the div is the furthest block
    // and the anchor is cloned inside it.
    let tree = parse("<a>1<div>2</a>3</div>");
    let body_id = find_element(&tree, NodeId::ROOT, "body").unwrap();
    assert_eq!(child_tag_names(&tree, body_id), ["a", "div"]);

    let div_id = tree.children(body_id)[1];
    let inner_a = find_element(&tree, div_id, "a").unwrap();
    assert_eq!(text_content(&tree, inner_a), "23");
}

#[test]
fn implicit_tbody_in_table() {
    let tree = parse("<table><tr><td>A");
    let table_id = find_element(&tree, NodeId::ROOT, "table").unwrap();
    assert_eq!(child_tag_names(&tree, table_id), ["tbody"]);
    let tbody_id = tree.children(table_id)[0];
    assert_eq!(child_tag_names(&tree, tbody_id), ["tr"]);
    let tr_id = tree.children(tbody_id)[0];
    assert_eq!(child_tag_names(&tree, tr_id), ["td"]);
    let td_id = tree.children(tr_id)[0];
    assert_eq!(text_content(&tree, td_id), "A");
}

#[test]
fn foster_parenting_moves_content_before_table() {
    let tree = parse("<table><div>x</div></table>");
    let body_id = find_element(&tree, NodeId::ROOT, "body").unwrap();
    assert_eq!(child_tag_names(&tree, body_id), ["div", "table"]);
    let div_id = tree.children(body_id)[0];
    assert_eq!(text_content(&tree, div_id), "x");
}

#[test]
fn foster_parenting_for_table_text() {
    let tree = parse("<table><tr><td>A</td></tr>B</table>");
    let body_id = find_element(&tree, NodeId::ROOT, "body").unwrap();

    // "B" is relocated before the table.
    let first = tree.children(body_id)[0];
    assert_eq!(tree.as_text(first), Some("B"));

    let output = parse_document("<table><tr><td>A</td></tr>B</table>", &ParseOptions::collecting_errors())
        .unwrap();
    assert!(output.errors.iter().any(|e| matches!(
        e,
        ParseError::TreeBuilder(err)
            if err.kind == TreeBuilderErrorKind::FosterParentingCharacter
    )));
}

#[test]
fn caption_and_colgroup() {
    let tree = parse("<table><caption>cap</caption><colgroup><col></colgroup><tr><td>x</table>");
    let table_id = find_element(&tree, NodeId::ROOT, "table").unwrap();
    assert_eq!(
        child_tag_names(&tree, table_id),
        ["caption", "colgroup", "tbody"]
    );
}

#[test]
fn template_content_is_separate_fragment() {
    let tree = parse("<template><p>x</p></template>");
    let template_id = find_element(&tree, NodeId::ROOT, "template").unwrap();

    // The template element itself has no children.
    assert!(tree.children(template_id).is_empty());

    let contents = tree
        .as_element(template_id)
        .and_then(|e| e.template_contents)
        .expect("template has contents fragment");
    assert!(matches!(
        get_node(&tree, contents).node_type,
        NodeType::DocumentFragment
    ));
    assert_eq!(child_tag_names(&tree, contents), ["p"]);
    assert_eq!(text_content(&tree, contents), "x");
}

#[test]
fn unclosed_template_at_eof_is_an_error() {
    let output =
        parse_document("<template><div>x", &ParseOptions::collecting_errors()).unwrap();
    assert!(output.errors.iter().any(|e| matches!(
        e,
        ParseError::TreeBuilder(err) if err.kind == TreeBuilderErrorKind::UnclosedTemplate
    )));
    // The content still lands in the template contents.
    let template_id = find_element(&output.tree, NodeId::ROOT, "template").unwrap();
    let contents = output
        .tree
        .as_element(template_id)
        .and_then(|e| e.template_contents)
        .unwrap();
    assert_eq!(text_content(&output.tree, contents), "x");
}

#[test]
fn select_keeps_options() {
    let tree = parse("<select><option>a<option>b</select>");
    let select_id = find_element(&tree, NodeId::ROOT, "select").unwrap();
    assert_eq!(child_tag_names(&tree, select_id), ["option", "option"]);
}

#[test]
fn select_accepts_rich_content() {
    let tree = parse("<select><button>pick</button><option>a</option></select>");
    let select_id = find_element(&tree, NodeId::ROOT, "select").unwrap();
    assert_eq!(child_tag_names(&tree, select_id), ["button", "option"]);
}

#[test]
fn selectedcontent_is_populated_from_selected_option() {
    let tree = parse(
        "<select><button><selectedcontent></selectedcontent></button>\
         <option>One</option><option selected>Two</option></select>",
    );
    let sc_id = find_element(&tree, NodeId::ROOT, "selectedcontent").unwrap();
    assert_eq!(text_content(&tree, sc_id), "Two");
}

#[test]
fn selectedcontent_falls_back_to_first_option() {
    let tree = parse(
        "<select><button><selectedcontent></selectedcontent></button>\
         <option>One</option><option>Two</option></select>",
    );
    let sc_id = find_element(&tree, NodeId::ROOT, "selectedcontent").unwrap();
    assert_eq!(text_content(&tree, sc_id), "One");
}

#[test]
fn svg_subtree_is_foreign() {
    let tree = parse("<svg><circle r=\"1\"/></svg>");
    let svg_id = find_element(&tree, NodeId::ROOT, "svg").unwrap();
    let svg = tree.as_element(svg_id).unwrap();
    assert_eq!(svg.namespace, wallaby_html::dom::Namespace::Svg);

    let circle_id = find_element(&tree, svg_id, "circle").unwrap();
    let circle = tree.as_element(circle_id).unwrap();
    assert_eq!(circle.namespace, wallaby_html::dom::Namespace::Svg);
}

#[test]
fn svg_tag_and_attribute_case_adjustment() {
    let tree = parse("<svg><foreignobject></foreignobject><rect viewbox=\"0\"/></svg>");
    let svg_id = find_element(&tree, NodeId::ROOT, "svg").unwrap();
    assert!(find_element(&tree, svg_id, "foreignObject").is_some());
    let rect_id = find_element(&tree, svg_id, "rect").unwrap();
    assert_eq!(tree.as_element(rect_id).unwrap().attrs.get("viewBox"), Some("0"));
}

#[test]
fn foreign_attributes_are_stored_under_split_names() {
    let tree = parse(r##"<svg xlink:href="#a" xml:lang="en"></svg>"##);
    let svg_id = find_element(&tree, NodeId::ROOT, "svg").unwrap();
    let attrs = &tree.as_element(svg_id).unwrap().attrs;
    assert_eq!(attrs.get("xlink href"), Some("#a"));
    assert_eq!(attrs.get("xml lang"), Some("en"));
    assert!(attrs.get("xlink:href").is_none());
}

#[test]
fn html_breakout_inside_svg() {
    let tree = parse("<svg><div>x</div></svg>");
    let body_id = find_element(&tree, NodeId::ROOT, "body").unwrap();
    assert_eq!(child_tag_names(&tree, body_id), ["svg", "div"]);
    let div_id = tree.children(body_id)[1];
    assert_eq!(
        tree.as_element(div_id).unwrap().namespace,
        wallaby_html::dom::Namespace::Html
    );
}

#[test]
fn foreign_object_is_an_html_integration_point() {
    let tree = parse("<svg><foreignObject><p>x</p></foreignObject></svg>");
    let fo_id = find_element(&tree, NodeId::ROOT, "foreignObject").unwrap();
    let p_id = find_element(&tree, fo_id, "p").unwrap();
    assert_eq!(
        tree.as_element(p_id).unwrap().namespace,
        wallaby_html::dom::Namespace::Html
    );
    // The p nests inside the foreignObject, not after the svg.
    assert!(tree.is_descendant_of(p_id, fo_id));
}

#[test]
fn mathml_text_integration_point() {
    let tree = parse("<math><mi>x</mi></math>");
    let mi_id = find_element(&tree, NodeId::ROOT, "mi").unwrap();
    assert_eq!(
        tree.as_element(mi_id).unwrap().namespace,
        wallaby_html::dom::Namespace::MathMl
    );
    assert_eq!(text_content(&tree, mi_id), "x");
}

#[test]
fn mathml_definitionurl_case_adjustment() {
    let tree = parse("<math definitionurl=\"x\"></math>");
    let math_id = find_element(&tree, NodeId::ROOT, "math").unwrap();
    assert_eq!(
        tree.as_element(math_id).unwrap().attrs.get("definitionURL"),
        Some("x")
    );
}

#[test]
fn quirks_mode_classification() {
    let output = parse_document("<!DOCTYPE html><p>x", &ParseOptions::default()).unwrap();
    assert_eq!(output.quirks_mode, QuirksMode::NoQuirks);

    let output = parse_document("<p>x", &ParseOptions::default()).unwrap();
    assert_eq!(output.quirks_mode, QuirksMode::Quirks);

    let output = parse_document(
        r#"<!DOCTYPE html PUBLIC "-//W3C//DTD HTML 4.01 Transitional//EN"><p>x"#,
        &ParseOptions::default(),
    )
    .unwrap();
    assert_eq!(output.quirks_mode, QuirksMode::Quirks);

    let output = parse_document(
        r#"<!DOCTYPE html PUBLIC "-//W3C//DTD XHTML 1.0 Transitional//EN" "x"><p>x"#,
        &ParseOptions::default(),
    )
    .unwrap();
    assert_eq!(output.quirks_mode, QuirksMode::LimitedQuirks);
}

#[test]
fn quirks_mode_table_in_paragraph() {
    // In quirks mode the table nests inside the open p.
    let quirky = parse("<p><table></table>");
    let p_id = find_element(&quirky, NodeId::ROOT, "p").unwrap();
    assert_eq!(child_tag_names(&quirky, p_id), ["table"]);

    // In no-quirks mode the table closes the p first.
    let standard = parse("<!DOCTYPE html><p><table></table>");
    let p_id = find_element(&standard, NodeId::ROOT, "p").unwrap();
    assert!(child_tag_names(&standard, p_id).is_empty());
}

#[test]
fn empty_input_gives_empty_document() {
    let output = parse_document("", &ParseOptions::collecting_errors()).unwrap();
    assert!(output.tree.children(NodeId::ROOT).is_empty());
    assert!(output.errors.is_empty());
}

#[test]
fn pre_swallows_leading_newline() {
    let tree = parse("<pre>\nkeep</pre>");
    let pre_id = find_element(&tree, NodeId::ROOT, "pre").unwrap();
    assert_eq!(text_content(&tree, pre_id), "keep");
}

#[test]
fn textarea_swallows_leading_newline() {
    let tree = parse("<textarea>\nkeep</textarea>");
    let ta_id = find_element(&tree, NodeId::ROOT, "textarea").unwrap();
    assert_eq!(text_content(&tree, ta_id), "keep");
}

#[test]
fn frameset_document() {
    let tree = parse("<!DOCTYPE html><frameset><frame></frameset>");
    let html_id = find_element(&tree, NodeId::ROOT, "html").unwrap();
    assert_eq!(child_tag_names(&tree, html_id), ["head", "frameset"]);
    let frameset_id = find_element(&tree, html_id, "frameset").unwrap();
    assert_eq!(child_tag_names(&tree, frameset_id), ["frame"]);
}

#[test]
fn strict_mode_fails_on_first_error() {
    let opts = ParseOptions::default().with_strict_mode();
    assert!(parse_document("<!DOCTYPE html><p>ok</p>", &opts).is_ok());
    assert!(parse_document("no doctype", &opts).is_err());
}

#[test]
fn missing_doctype_is_reported() {
    let output = parse_document("<p>x", &ParseOptions::collecting_errors()).unwrap();
    assert!(output.errors.iter().any(|e| matches!(
        e,
        ParseError::TreeBuilder(err) if err.kind == TreeBuilderErrorKind::ExpectedDoctype
    )));
}

#[test]
fn parent_links_are_coherent() {
    let tree = parse("<!DOCTYPE html><div><p>a</p><p>b</p></div>");
    for id in (0..tree.len()).map(NodeId) {
        for &child in tree.children(id) {
            assert_eq!(tree.parent(child), Some(id));
        }
    }
}
