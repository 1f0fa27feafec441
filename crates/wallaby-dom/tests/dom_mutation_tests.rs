//! Tests for DOM tree mutation methods: remove_child, insert_before,
//! move_children, detach, clone_subtree.

use wallaby_dom::{AttributeList, DomTree, ElementData, Namespace, NodeId, NodeType};

/// Helper to create an HTML element node and return its NodeId.
fn alloc_element(tree: &mut DomTree, tag: &str) -> NodeId {
    tree.alloc(NodeType::Element(ElementData {
        tag_name: tag.to_string(),
        namespace: Namespace::Html,
        attrs: AttributeList::new(),
        template_contents: None,
    }))
}

// ========== remove_child ==========

#[test]
fn remove_child_single_child() {
    let mut tree = DomTree::new();
    let parent = alloc_element(&mut tree, "div");
    tree.append_child(NodeId::ROOT, parent);

    let child = alloc_element(&mut tree, "p");
    tree.append_child(parent, child);

    assert_eq!(tree.children(parent).len(), 1);

    tree.remove_child(parent, child);

    assert_eq!(tree.children(parent).len(), 0);
    assert_eq!(tree.parent(child), None);
    assert_eq!(tree.prev_sibling(child), None);
    assert_eq!(tree.next_sibling(child), None);
}

#[test]
fn remove_child_middle_of_three() {
    let mut tree = DomTree::new();
    let parent = alloc_element(&mut tree, "div");
    tree.append_child(NodeId::ROOT, parent);

    let a = alloc_element(&mut tree, "a");
    let b = alloc_element(&mut tree, "b");
    let c = alloc_element(&mut tree, "c");
    tree.append_child(parent, a);
    tree.append_child(parent, b);
    tree.append_child(parent, c);

    tree.remove_child(parent, b);

    // a and c are siblings now
    assert_eq!(tree.children(parent), &[a, c]);
    assert_eq!(tree.next_sibling(a), Some(c));
    assert_eq!(tree.prev_sibling(c), Some(a));
}

#[test]
#[should_panic(expected = "not a child")]
fn remove_child_of_wrong_parent_panics() {
    let mut tree = DomTree::new();
    let parent = alloc_element(&mut tree, "div");
    let other = alloc_element(&mut tree, "span");
    tree.append_child(NodeId::ROOT, parent);
    tree.append_child(NodeId::ROOT, other);

    let child = alloc_element(&mut tree, "p");
    tree.append_child(parent, child);

    tree.remove_child(other, child);
}

// ========== insert_before ==========

#[test]
fn insert_before_first_child() {
    let mut tree = DomTree::new();
    let parent = alloc_element(&mut tree, "div");
    tree.append_child(NodeId::ROOT, parent);

    let existing = alloc_element(&mut tree, "b");
    tree.append_child(parent, existing);

    let new_child = alloc_element(&mut tree, "a");
    tree.insert_before(parent, new_child, existing);

    assert_eq!(tree.children(parent), &[new_child, existing]);
    assert_eq!(tree.parent(new_child), Some(parent));
    assert_eq!(tree.next_sibling(new_child), Some(existing));
    assert_eq!(tree.prev_sibling(new_child), None);
    assert_eq!(tree.prev_sibling(existing), Some(new_child));
}

#[test]
fn insert_before_middle() {
    let mut tree = DomTree::new();
    let parent = alloc_element(&mut tree, "div");
    tree.append_child(NodeId::ROOT, parent);

    let a = alloc_element(&mut tree, "a");
    let c = alloc_element(&mut tree, "c");
    tree.append_child(parent, a);
    tree.append_child(parent, c);

    let b = alloc_element(&mut tree, "b");
    tree.insert_before(parent, b, c);

    assert_eq!(tree.children(parent), &[a, b, c]);
    assert_eq!(tree.next_sibling(a), Some(b));
    assert_eq!(tree.prev_sibling(b), Some(a));
    assert_eq!(tree.next_sibling(b), Some(c));
    assert_eq!(tree.prev_sibling(c), Some(b));
}

// ========== move_children ==========

#[test]
fn move_children_basic() {
    let mut tree = DomTree::new();
    let from = alloc_element(&mut tree, "div");
    let to = alloc_element(&mut tree, "span");
    tree.append_child(NodeId::ROOT, from);
    tree.append_child(NodeId::ROOT, to);

    let a = alloc_element(&mut tree, "a");
    let b = alloc_element(&mut tree, "b");
    tree.append_child(from, a);
    tree.append_child(from, b);

    tree.move_children(from, to);

    assert_eq!(tree.children(from).len(), 0);
    assert_eq!(tree.children(to), &[a, b]);
    assert_eq!(tree.parent(a), Some(to));
    assert_eq!(tree.parent(b), Some(to));
}

#[test]
fn move_children_appends_to_existing() {
    let mut tree = DomTree::new();
    let from = alloc_element(&mut tree, "div");
    let to = alloc_element(&mut tree, "span");
    tree.append_child(NodeId::ROOT, from);
    tree.append_child(NodeId::ROOT, to);

    let existing = alloc_element(&mut tree, "x");
    tree.append_child(to, existing);

    let moved = alloc_element(&mut tree, "y");
    tree.append_child(from, moved);

    tree.move_children(from, to);

    assert_eq!(tree.children(to), &[existing, moved]);
    assert_eq!(tree.next_sibling(existing), Some(moved));
    assert_eq!(tree.prev_sibling(moved), Some(existing));
}

// ========== detach ==========

#[test]
fn detach_is_noop_for_detached_node() {
    let mut tree = DomTree::new();
    let orphan = alloc_element(&mut tree, "div");
    tree.detach(orphan);
    assert_eq!(tree.parent(orphan), None);
}

#[test]
fn detach_then_reappend() {
    let mut tree = DomTree::new();
    let a = alloc_element(&mut tree, "a");
    let b = alloc_element(&mut tree, "b");
    tree.append_child(NodeId::ROOT, a);
    tree.append_child(a, b);

    tree.detach(b);
    tree.append_child(NodeId::ROOT, b);

    assert_eq!(tree.children(NodeId::ROOT), &[a, b]);
    assert_eq!(tree.children(a).len(), 0);
}

// ========== attributes ==========

#[test]
fn attribute_list_preserves_insertion_order_and_uniqueness() {
    let mut attrs = AttributeList::new();
    assert!(attrs.push_unique("href".into(), "/a".into()));
    assert!(attrs.push_unique("class".into(), "x".into()));
    // Duplicate: first value wins.
    assert!(!attrs.push_unique("href".into(), "/b".into()));

    let names: Vec<&str> = attrs.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(names, ["href", "class"]);
    assert_eq!(attrs.get("href"), Some("/a"));
}

// ========== clone_subtree ==========

#[test]
fn clone_subtree_copies_structure() {
    let mut tree = DomTree::new();
    let div = alloc_element(&mut tree, "div");
    tree.append_child(NodeId::ROOT, div);
    let text = tree.alloc(NodeType::Text("hi".to_string()));
    tree.append_child(div, text);

    let clone = tree.clone_subtree(div);
    assert_eq!(tree.parent(clone), None);
    assert_eq!(tree.children(clone).len(), 1);
    let cloned_text = tree.children(clone)[0];
    assert_ne!(cloned_text, text);
    assert_eq!(tree.as_text(cloned_text), Some("hi"));
}

#[test]
fn clone_subtree_clones_template_contents() {
    let mut tree = DomTree::new();
    let contents = tree.alloc(NodeType::DocumentFragment);
    let inner = alloc_element(&mut tree, "p");
    tree.append_child(contents, inner);

    let template = tree.alloc(NodeType::Element(ElementData {
        tag_name: "template".to_string(),
        namespace: Namespace::Html,
        attrs: AttributeList::new(),
        template_contents: Some(contents),
    }));
    tree.append_child(NodeId::ROOT, template);

    let clone = tree.clone_subtree(template);
    let cloned_contents = tree
        .as_element(clone)
        .and_then(|e| e.template_contents)
        .expect("clone keeps template contents");
    assert_ne!(cloned_contents, contents);
    assert_eq!(tree.children(cloned_contents).len(), 1);
}

// ========== text_content ==========

#[test]
fn text_content_descends_into_template() {
    let mut tree = DomTree::new();
    let contents = tree.alloc(NodeType::DocumentFragment);
    let text = tree.alloc(NodeType::Text("inside".to_string()));
    tree.append_child(contents, text);

    let template = tree.alloc(NodeType::Element(ElementData {
        tag_name: "template".to_string(),
        namespace: Namespace::Html,
        attrs: AttributeList::new(),
        template_contents: Some(contents),
    }));
    tree.append_child(NodeId::ROOT, template);

    let opts = wallaby_dom::TextOptions::default();
    assert_eq!(tree.text_content(NodeId::ROOT, &opts), "inside");
}
