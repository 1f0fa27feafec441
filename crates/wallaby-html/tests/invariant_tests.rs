//! Property-based invariants over the output tree.
//!
//! Inputs are assembled from markup fragments rather than raw characters
//! so the generator actually exercises tag, table, formatting, and entity
//! paths instead of drowning in plain text.

use proptest::prelude::*;

use wallaby_html::dom::{DomTree, NodeId};
use wallaby_html::test_format::to_test_format;
use wallaby_html::{ParseOptions, parse_document};

fn fragment_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("<div>".to_string()),
        Just("</div>".to_string()),
        Just("<p>".to_string()),
        Just("</p>".to_string()),
        Just("<b>".to_string()),
        Just("</b>".to_string()),
        Just("<i>".to_string()),
        Just("</i>".to_string()),
        Just("<table>".to_string()),
        Just("</table>".to_string()),
        Just("<tr>".to_string()),
        Just("<td>".to_string()),
        Just("<li>".to_string()),
        Just("<ul>".to_string()),
        Just("<span class=\"x\">".to_string()),
        Just("<template>".to_string()),
        Just("</template>".to_string()),
        Just("<select>".to_string()),
        Just("<option>".to_string()),
        Just("&amp;".to_string()),
        Just("&#65;".to_string()),
        Just("&notit;".to_string()),
        Just("text ".to_string()),
        Just("<!--c-->".to_string()),
        Just("<!DOCTYPE html>".to_string()),
        Just("<svg><g>".to_string()),
        Just("</svg>".to_string()),
        "[a-z ]{0,8}",
    ]
}

fn html_strategy() -> impl Strategy<Value = String> {
    proptest::collection::vec(fragment_strategy(), 0..24).prop_map(|parts| parts.concat())
}

/// Walk every node, including template contents. Panics (and thereby
/// fails the property) when `visit` asserts.
fn walk(tree: &DomTree, id: NodeId, visit: &mut impl FnMut(&DomTree, NodeId)) {
    visit(tree, id);
    if let Some(element) = tree.as_element(id)
        && let Some(contents) = element.template_contents
    {
        walk(tree, contents, visit);
    }
    for &child in tree.children(id) {
        walk(tree, child, visit);
    }
}

proptest! {
    /// Every child's parent link points back at its parent.
    #[test]
    fn parent_child_links_are_coherent(input in html_strategy()) {
        let tree = parse_document(&input, &ParseOptions::default()).unwrap().tree;
        walk(&tree, NodeId::ROOT, &mut |tree, id| {
            for &child in tree.children(id) {
                assert_eq!(tree.parent(child), Some(id));
            }
        });
    }

    /// The parser never leaves two adjacent text siblings behind.
    #[test]
    fn no_adjacent_text_siblings(input in html_strategy()) {
        let tree = parse_document(&input, &ParseOptions::default()).unwrap().tree;
        walk(&tree, NodeId::ROOT, &mut |tree, id| {
            for pair in tree.children(id).windows(2) {
                assert!(
                    tree.as_text(pair[0]).is_none() || tree.as_text(pair[1]).is_none(),
                    "adjacent text siblings in output tree"
                );
            }
        });
    }

    /// A node appears in at most one child list.
    #[test]
    fn nodes_have_at_most_one_parent(input in html_strategy()) {
        let tree = parse_document(&input, &ParseOptions::default()).unwrap().tree;
        let mut seen = vec![0usize; tree.len()];
        walk(&tree, NodeId::ROOT, &mut |_, id| {
            seen[id.0] += 1;
        });
        for count in seen {
            prop_assert!(count <= 1);
        }
    }

    /// Serialization is a pure function of the input.
    #[test]
    fn test_format_is_deterministic(input in html_strategy()) {
        let first = parse_document(&input, &ParseOptions::default()).unwrap().tree;
        let second = parse_document(&input, &ParseOptions::default()).unwrap().tree;
        prop_assert_eq!(to_test_format(&first), to_test_format(&second));
    }

    /// Parsing never panics on fragment-context input either.
    #[test]
    fn fragment_parsing_is_total(input in html_strategy()) {
        let opts = ParseOptions {
            fragment_context: Some(wallaby_html::FragmentContext::html("div")),
            ..ParseOptions::default()
        };
        let _ = parse_document(&input, &opts).unwrap();
    }
}
