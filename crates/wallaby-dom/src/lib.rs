//! DOM tree implementation for the wallaby HTML parsing library.
//!
//! This crate provides an arena-based DOM tree structure following the
//! [DOM Living Standard](https://dom.spec.whatwg.org/).
//!
//! # Design
//!
//! The tree uses arena allocation with [`NodeId`] indices for all
//! relationships, providing O(1) access and traversal without borrow
//! checker issues. Parent links are indices (relation, not ownership);
//! child lists carry the tree structure. A `<template>` element in the
//! HTML namespace owns its contents through a separate
//! [`NodeType::DocumentFragment`] node rather than through its child list.

use std::fmt::Write as _;

/// A type-safe index into the DOM tree.
///
/// [§ 4.4 Interface Node](https://dom.spec.whatwg.org/#interface-node)
/// "Each node has an associated node document..."
///
/// `NodeId` provides O(1) access to any node in the tree without borrowing
/// issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub usize);

impl NodeId {
    /// The root node (Document or DocumentFragment) is always at index 0.
    pub const ROOT: NodeId = NodeId(0);
}

/// The namespace of an element.
///
/// [§ 13.2.6.5 The rules for parsing tokens in foreign content](https://html.spec.whatwg.org/multipage/parsing.html#parsing-main-inforeign)
///
/// Only the three namespaces the HTML parser can produce are modeled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Namespace {
    /// `http://www.w3.org/1999/xhtml`
    #[default]
    Html,
    /// `http://www.w3.org/2000/svg`
    Svg,
    /// `http://www.w3.org/1998/Math/MathML`
    MathMl,
}

impl Namespace {
    /// The tag-name prefix used by the html5lib tree-construction test
    /// format (`svg circle`, `math mi`). HTML elements carry no prefix.
    #[must_use]
    pub const fn test_format_prefix(self) -> &'static str {
        match self {
            Self::Html => "",
            Self::Svg => "svg ",
            Self::MathMl => "math ",
        }
    }
}

/// An attribute on an element: a name and a value.
///
/// Per [§ 13.2.5 Tokenization](https://html.spec.whatwg.org/multipage/parsing.html#tokenization):
/// "a list of attributes, each of which has a name and a value"
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// "each of which has a name"
    pub name: String,
    /// "and a value"
    pub value: String,
}

impl Attribute {
    /// Create a new attribute with the given name and value.
    #[must_use]
    pub const fn new(name: String, value: String) -> Self {
        Self { name, value }
    }
}

/// Ordered attribute storage for an element.
///
/// [§ 4.9 Interface Element](https://dom.spec.whatwg.org/#interface-element)
/// "An element has an associated attribute list."
///
/// Insertion order is preserved and names are unique; on a duplicate name
/// the first value wins. A `Vec` keeps order and is faster than a hash map
/// for the handful of attributes real elements carry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeList {
    entries: Vec<Attribute>,
}

impl AttributeList {
    /// Create an empty attribute list.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Append an attribute unless the name is already present.
    ///
    /// Returns `false` (and leaves the list unchanged) when the name is a
    /// duplicate, so the caller can raise its duplicate-attribute parse
    /// error.
    pub fn push_unique(&mut self, name: String, value: String) -> bool {
        if self.contains(&name) {
            return false;
        }
        self.entries.push(Attribute::new(name, value));
        true
    }

    /// Look up an attribute value by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|attr| attr.name == name)
            .map(|attr| attr.value.as_str())
    }

    /// Whether an attribute with the given name exists.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|attr| attr.name == name)
    }

    /// Iterate over the attributes in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, Attribute> {
        self.entries.iter()
    }

    /// Number of attributes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the list is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'a> IntoIterator for &'a AttributeList {
    type Item = &'a Attribute;
    type IntoIter = std::slice::Iter<'a, Attribute>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl FromIterator<(String, String)> for AttributeList {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        let mut list = Self::new();
        for (name, value) in iter {
            let _ = list.push_unique(name, value);
        }
        list
    }
}

/// The payload of a doctype node.
///
/// [§ 13.2.5 Tokenization](https://html.spec.whatwg.org/multipage/parsing.html#tokenization)
///
/// "DOCTYPE tokens have a name, a public identifier, a system identifier,
/// and a force-quirks flag." Name and identifiers are "missing" (`None`)
/// until set, which is distinct from the empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DoctypeData {
    /// "a name"
    pub name: Option<String>,
    /// "a public identifier"
    pub public_id: Option<String>,
    /// "a system identifier"
    pub system_id: Option<String>,
    /// "a force-quirks flag"
    pub force_quirks: bool,
}

/// Element-specific data.
///
/// Per [§ 4.9 Interface Element](https://dom.spec.whatwg.org/#interface-element):
/// "Elements have an associated namespace, namespace prefix, local name..."
#[derive(Debug, Clone)]
pub struct ElementData {
    /// "An element's local name" (ASCII-lowercased for HTML elements;
    /// case-corrected for SVG elements)
    pub tag_name: String,
    /// The element's namespace.
    pub namespace: Namespace,
    /// "An element has an associated attribute list"
    pub attrs: AttributeList,
    /// [§ 4.12.3 The template element](https://html.spec.whatwg.org/multipage/scripting.html#the-template-element)
    ///
    /// "Each template element has an associated DocumentFragment object
    /// that is its template contents."
    ///
    /// `Some` iff `tag_name == "template"` and `namespace == Html`; points
    /// at a [`NodeType::DocumentFragment`] node in the same arena.
    pub template_contents: Option<NodeId>,
}

impl ElementData {
    /// Whether this is an HTML-namespace element with the given tag name.
    #[must_use]
    pub fn is_html(&self, tag: &str) -> bool {
        self.namespace == Namespace::Html && self.tag_name == tag
    }
}

/// [§ 4.4 Interface Node](https://dom.spec.whatwg.org/#interface-node)
///
/// "Each node has an associated node type"
#[derive(Debug, Clone)]
pub enum NodeType {
    /// [§ 4.5 Interface Document](https://dom.spec.whatwg.org/#interface-document)
    Document,
    /// [§ 4.7 Interface DocumentFragment](https://dom.spec.whatwg.org/#interface-documentfragment)
    ///
    /// Used both as the root of fragment parsing output and as the
    /// contents holder of a `<template>` element.
    DocumentFragment,
    /// [§ 4.9 Interface Element](https://dom.spec.whatwg.org/#interface-element)
    Element(ElementData),
    /// [§ 4.10 Interface Text](https://dom.spec.whatwg.org/#interface-text)
    Text(String),
    /// [§ 4.12 Interface Comment](https://dom.spec.whatwg.org/#interface-comment)
    Comment(String),
    /// [§ 4.6 Interface DocumentType](https://dom.spec.whatwg.org/#interface-documenttype)
    Doctype(DoctypeData),
}

impl NodeType {
    /// The synthetic node name used in diagnostics: the tag name for
    /// elements, `#document` / `#document-fragment` / `#text` / `#comment` /
    /// `!doctype` for the pseudo-nodes.
    #[must_use]
    pub fn node_name(&self) -> &str {
        match self {
            Self::Document => "#document",
            Self::DocumentFragment => "#document-fragment",
            Self::Element(data) => &data.tag_name,
            Self::Text(_) => "#text",
            Self::Comment(_) => "#comment",
            Self::Doctype(_) => "!doctype",
        }
    }
}

/// [§ 4.4 Interface Node](https://dom.spec.whatwg.org/#interface-node)
///
/// This node stores indices for parent/child/sibling relationships,
/// enabling O(1) traversal in any direction.
#[derive(Debug, Clone)]
pub struct Node {
    /// "Each node has an associated node type"
    pub node_type: NodeType,
    /// [§ 4.4](https://dom.spec.whatwg.org/#concept-tree-parent)
    pub parent: Option<NodeId>,
    /// [§ 4.4](https://dom.spec.whatwg.org/#concept-tree-child)
    pub children: Vec<NodeId>,
    /// [§ 4.4](https://dom.spec.whatwg.org/#concept-tree-next-sibling)
    pub next_sibling: Option<NodeId>,
    /// [§ 4.4](https://dom.spec.whatwg.org/#concept-tree-previous-sibling)
    pub prev_sibling: Option<NodeId>,
}

/// Options for [`DomTree::text_content`].
#[derive(Debug, Clone, Default)]
pub struct TextOptions {
    /// String inserted between adjacent text nodes.
    pub separator: String,
    /// Trim ASCII whitespace from each text chunk and skip empty chunks.
    pub strip: bool,
}

/// Arena-based DOM tree with O(1) node access and traversal.
///
/// [§ 4 Nodes](https://dom.spec.whatwg.org/#nodes)
///
/// All nodes live in a contiguous vector indexed by [`NodeId`]. The root
/// node (a Document or a DocumentFragment) is always at index 0.
#[derive(Debug, Clone)]
pub struct DomTree {
    nodes: Vec<Node>,
}

impl DomTree {
    /// Create a new DOM tree with just the Document node.
    #[must_use]
    pub fn new() -> Self {
        Self::with_root(NodeType::Document)
    }

    /// Create a new DOM tree rooted at a DocumentFragment.
    ///
    /// Used as the output of fragment-context parsing.
    #[must_use]
    pub fn new_fragment() -> Self {
        Self::with_root(NodeType::DocumentFragment)
    }

    fn with_root(node_type: NodeType) -> Self {
        DomTree {
            nodes: vec![Node {
                node_type,
                parent: None,
                children: Vec::new(),
                next_sibling: None,
                prev_sibling: None,
            }],
        }
    }

    /// Get the root node ID.
    #[must_use]
    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    /// Get a node by its ID.
    #[must_use]
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    /// Get a mutable reference to a node by its ID.
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0)
    }

    /// Get the number of nodes in the tree.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if the tree is empty (should always have at least the root).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Allocate a new node and return its ID.
    /// The node is not yet attached to the tree.
    pub fn alloc(&mut self, node_type: NodeType) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            node_type,
            parent: None,
            children: Vec::new(),
            next_sibling: None,
            prev_sibling: None,
        });
        id
    }

    /// [§ 4.2.2 Append](https://dom.spec.whatwg.org/#concept-node-append)
    ///
    /// "To append a node to a parent, pre-insert node into parent before
    /// null."
    ///
    /// Appends `child` as the last child of `parent`, updating all
    /// relationships.
    ///
    /// # Panics
    ///
    /// Panics if `child` is already in another child list; detach it first
    /// with [`DomTree::detach`]. A node appears in at most one child list
    /// at a time.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        assert!(
            self.nodes[child.0].parent.is_none(),
            "append_child: node {} already has a parent",
            child.0
        );

        let prev_last_child = self.nodes[parent.0].children.last().copied();

        self.nodes[parent.0].children.push(child);
        self.nodes[child.0].parent = Some(parent);

        if let Some(prev_id) = prev_last_child {
            self.nodes[prev_id.0].next_sibling = Some(child);
            self.nodes[child.0].prev_sibling = Some(prev_id);
        }
    }

    /// [§ 4.2.2 Insert](https://dom.spec.whatwg.org/#concept-node-insert)
    ///
    /// Insert `child` into `parent`'s child list immediately before
    /// `reference`.
    ///
    /// # Panics
    ///
    /// Panics if `reference` is not a child of `parent`, or if `child`
    /// already has a parent. Both indicate a tree-builder bug.
    pub fn insert_before(&mut self, parent: NodeId, child: NodeId, reference: NodeId) {
        assert!(
            self.nodes[child.0].parent.is_none(),
            "insert_before: node {} already has a parent",
            child.0
        );
        let ref_pos = self.nodes[parent.0]
            .children
            .iter()
            .position(|&id| id == reference)
            .unwrap_or_else(|| {
                panic!(
                    "insert_before: reference {} is not a child of {}",
                    reference.0, parent.0
                )
            });

        self.nodes[parent.0].children.insert(ref_pos, child);
        self.nodes[child.0].parent = Some(parent);

        // Fix sibling links: prev <-> child <-> reference
        let prev = self.nodes[reference.0].prev_sibling;
        if let Some(prev_id) = prev {
            self.nodes[prev_id.0].next_sibling = Some(child);
        }
        self.nodes[child.0].prev_sibling = prev;
        self.nodes[child.0].next_sibling = Some(reference);
        self.nodes[reference.0].prev_sibling = Some(child);
    }

    /// [§ 4.2.2 Remove](https://dom.spec.whatwg.org/#concept-node-remove)
    ///
    /// Remove `child` from `parent`'s child list, clearing its parent and
    /// sibling links.
    ///
    /// # Panics
    ///
    /// Panics if `child` is not a child of `parent`, indicating a
    /// tree-builder bug.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) {
        let pos = self.nodes[parent.0]
            .children
            .iter()
            .position(|&id| id == child)
            .unwrap_or_else(|| {
                panic!(
                    "remove_child: node {} is not a child of {}",
                    child.0, parent.0
                )
            });
        self.nodes[parent.0].children.remove(pos);

        let prev = self.nodes[child.0].prev_sibling;
        let next = self.nodes[child.0].next_sibling;
        if let Some(prev_id) = prev {
            self.nodes[prev_id.0].next_sibling = next;
        }
        if let Some(next_id) = next {
            self.nodes[next_id.0].prev_sibling = prev;
        }

        let node = &mut self.nodes[child.0];
        node.parent = None;
        node.prev_sibling = None;
        node.next_sibling = None;
    }

    /// Remove a node from its parent's child list, if it has a parent.
    /// A no-op for detached nodes.
    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes[id.0].parent {
            self.remove_child(parent, id);
        }
    }

    /// Move all children of `from` to the end of `to`'s child list,
    /// preserving their order.
    ///
    /// Used by the adoption agency algorithm ("take all of the child nodes
    /// of the furthest block and append them to the new element").
    pub fn move_children(&mut self, from: NodeId, to: NodeId) {
        let children = std::mem::take(&mut self.nodes[from.0].children);
        for &child in &children {
            let node = &mut self.nodes[child.0];
            node.parent = None;
            node.prev_sibling = None;
            node.next_sibling = None;
        }
        for child in children {
            self.append_child(to, child);
        }
    }

    /// Get the parent of a node.
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.parent)
    }

    /// Get all children of a node.
    #[must_use]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    /// Get the first child of a node.
    #[must_use]
    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.children.first().copied())
    }

    /// Get the last child of a node.
    #[must_use]
    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.children.last().copied())
    }

    /// Get the next sibling of a node.
    #[must_use]
    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.next_sibling)
    }

    /// Get the previous sibling of a node.
    #[must_use]
    pub fn prev_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.prev_sibling)
    }

    /// [§ 4.2.6 Descendant](https://dom.spec.whatwg.org/#concept-tree-descendant)
    ///
    /// Check if `descendant` is a descendant of `ancestor`.
    #[must_use]
    pub fn is_descendant_of(&self, descendant: NodeId, ancestor: NodeId) -> bool {
        self.ancestors(descendant).any(|id| id == ancestor)
    }

    /// Iterate over all ancestors of a node, from parent to root.
    pub fn ancestors(&self, id: NodeId) -> AncestorIterator<'_> {
        AncestorIterator {
            tree: self,
            current: self.parent(id),
        }
    }

    /// Get element data if this node is an element.
    #[must_use]
    pub fn as_element(&self, id: NodeId) -> Option<&ElementData> {
        self.get(id).and_then(|n| match &n.node_type {
            NodeType::Element(data) => Some(data),
            _ => None,
        })
    }

    /// Get mutable element data if this node is an element.
    pub fn as_element_mut(&mut self, id: NodeId) -> Option<&mut ElementData> {
        self.get_mut(id).and_then(|n| match &mut n.node_type {
            NodeType::Element(data) => Some(data),
            _ => None,
        })
    }

    /// Get text content if this node is a text node.
    #[must_use]
    pub fn as_text(&self, id: NodeId) -> Option<&str> {
        self.get(id).and_then(|n| match &n.node_type {
            NodeType::Text(s) => Some(s.as_str()),
            _ => None,
        })
    }

    /// [§ 3.1.1 The document element](https://html.spec.whatwg.org/multipage/dom.html#the-html-element-2)
    ///
    /// "The document element of a document is the element whose parent is
    /// that document, if it exists; otherwise null."
    #[must_use]
    pub fn document_element(&self) -> Option<NodeId> {
        self.children(NodeId::ROOT)
            .iter()
            .find(|&&id| self.as_element(id).is_some())
            .copied()
    }

    /// [§ 3.1.3 The body element](https://html.spec.whatwg.org/multipage/dom.html#the-body-element-2)
    ///
    /// "The body element of a document is the first of the html element's
    /// children that is either a body element or a frameset element, or
    /// null if there is no such element."
    #[must_use]
    pub fn body(&self) -> Option<NodeId> {
        let html = self.document_element()?;

        self.children(html)
            .iter()
            .find(|&&id| {
                self.as_element(id)
                    .is_some_and(|e| e.is_html("body") || e.is_html("frameset"))
            })
            .copied()
    }

    /// Deep-clone the subtree rooted at `src`, returning the detached
    /// clone's ID. Template contents are cloned along with their element.
    pub fn clone_subtree(&mut self, src: NodeId) -> NodeId {
        let mut node_type = self.nodes[src.0].node_type.clone();
        let src_children = self.nodes[src.0].children.clone();

        // Clone template contents before allocating so the element's
        // pointer can be rewritten to the fresh fragment.
        if let NodeType::Element(ref mut data) = node_type
            && let Some(contents) = data.template_contents
        {
            data.template_contents = Some(self.clone_subtree(contents));
        }

        let clone = self.alloc(node_type);
        for child in src_children {
            let child_clone = self.clone_subtree(child);
            self.append_child(clone, child_clone);
        }
        clone
    }

    /// Concatenated text of all descendant text nodes, in document order,
    /// descending into template contents.
    #[must_use]
    pub fn text_content(&self, id: NodeId, opts: &TextOptions) -> String {
        let mut chunks = Vec::new();
        self.collect_text(id, opts, &mut chunks);
        chunks.join(&opts.separator)
    }

    fn collect_text(&self, id: NodeId, opts: &TextOptions, out: &mut Vec<String>) {
        let Some(node) = self.get(id) else { return };
        match &node.node_type {
            NodeType::Text(data) => {
                let chunk = if opts.strip { data.trim() } else { data };
                if !chunk.is_empty() {
                    out.push(chunk.to_string());
                }
            }
            NodeType::Element(data) => {
                if let Some(contents) = data.template_contents {
                    self.collect_text(contents, opts, out);
                }
                for &child in &node.children {
                    self.collect_text(child, opts, out);
                }
            }
            _ => {
                for &child in &node.children {
                    self.collect_text(child, opts, out);
                }
            }
        }
    }
}

impl Default for DomTree {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator over ancestors of a node.
pub struct AncestorIterator<'a> {
    tree: &'a DomTree,
    current: Option<NodeId>,
}

impl Iterator for AncestorIterator<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.current?;
        self.current = self.tree.parent(id);
        Some(id)
    }
}

/// Render a subtree as an indented debug listing on stdout.
pub fn print_tree(tree: &DomTree, id: NodeId, indent: usize) {
    println!("{}", format_node(tree, id, indent));
    for &child in tree.children(id) {
        print_tree(tree, child, indent + 2);
    }
}

fn format_node(tree: &DomTree, id: NodeId, indent: usize) -> String {
    let mut line = " ".repeat(indent);
    let Some(node) = tree.get(id) else {
        let _ = write!(line, "<missing node {}>", id.0);
        return line;
    };
    match &node.node_type {
        NodeType::Element(data) => {
            let _ = write!(
                line,
                "<{}{}>",
                data.namespace.test_format_prefix(),
                data.tag_name
            );
        }
        NodeType::Text(data) => {
            let _ = write!(line, "{data:?}");
        }
        NodeType::Comment(data) => {
            let _ = write!(line, "<!--{data}-->");
        }
        other => {
            let _ = write!(line, "{}", other.node_name());
        }
    }
    line
}
