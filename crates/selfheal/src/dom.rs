//! Arena-backed document tree.
//!
//! Markup parsing is a collaborator concern (see [`crate::PageParser`]); this
//! module is the already-parsed shape the synthesizer and scraper walk. Nodes
//! live in one `Vec` and point at each other by [`NodeId`], so parent links
//! cost nothing and deep documents never recurse.

use std::collections::BTreeMap;

/// Tag reported for the document node at the top of every tree
pub const DOCUMENT_TAG: &str = "#document";

static NO_ATTRIBUTES: BTreeMap<String, String> = BTreeMap::new();

/// Index of a node inside its [`DomTree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// Raw arena index
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

/// What a node holds
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// The document itself; always node 0, never has a parent
    Document,
    /// A markup element
    Element {
        /// Lowercase tag name
        tag: String,
        /// Attributes; token lists such as `class` are single-space joined
        attributes: BTreeMap<String, String>,
    },
    /// A run of character data
    Text(String),
}

#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// A parsed document
#[derive(Debug, Clone)]
pub struct DomTree {
    nodes: Vec<Node>,
}

impl Default for DomTree {
    fn default() -> Self {
        Self::new()
    }
}

impl DomTree {
    /// Create a tree holding only the document node
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                kind: NodeKind::Document,
                parent: None,
                children: Vec::new(),
            }],
        }
    }

    /// The document node
    #[must_use]
    pub const fn root(&self) -> NodeId {
        NodeId(0)
    }

    fn push(&mut self, parent: NodeId, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            kind,
            parent: Some(parent),
            children: Vec::new(),
        });
        if let Some(parent_node) = self.nodes.get_mut(parent.0) {
            parent_node.children.push(id);
        }
        id
    }

    /// Append an element as the last child of `parent`
    pub fn append_element<K, V>(
        &mut self,
        parent: NodeId,
        tag: impl Into<String>,
        attributes: impl IntoIterator<Item = (K, V)>,
    ) -> NodeId
    where
        K: Into<String>,
        V: Into<String>,
    {
        let attributes = attributes
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self.push(
            parent,
            NodeKind::Element {
                tag: tag.into(),
                attributes,
            },
        )
    }

    /// Append character data as the last child of `parent`
    pub fn append_text(&mut self, parent: NodeId, text: impl Into<String>) -> NodeId {
        self.push(parent, NodeKind::Text(text.into()))
    }

    /// Kind of the node at `id`
    #[must_use]
    pub fn kind(&self, id: NodeId) -> Option<&NodeKind> {
        self.nodes.get(id.0).map(|n| &n.kind)
    }

    /// View the element (or document) at `id`; `None` for text nodes
    #[must_use]
    pub fn element(&self, id: NodeId) -> Option<ElementNode<'_>> {
        match self.nodes.get(id.0)?.kind {
            NodeKind::Text(_) => None,
            _ => Some(ElementNode { tree: self, id }),
        }
    }

    /// Children of `id` in document order
    #[must_use]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes.get(id.0).map_or(&[], |n| n.children.as_slice())
    }

    /// Every element below `from` in document (pre-)order, `from` excluded
    #[must_use]
    pub fn descendants(&self, from: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(from).iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            if matches!(self.kind(id), Some(NodeKind::Element { .. })) {
                out.push(id);
            }
            stack.extend(self.children(id).iter().rev().copied());
        }
        out
    }

    /// Every element in the document, in document order
    #[must_use]
    pub fn elements(&self) -> Vec<ElementNode<'_>> {
        self.descendants(self.root())
            .into_iter()
            .filter_map(|id| self.element(id))
            .collect()
    }

    /// Children of `parent` whose tag is `tag`, in document order
    #[must_use]
    pub fn same_tag_children(&self, parent: NodeId, tag: &str) -> Vec<NodeId> {
        self.children(parent)
            .iter()
            .copied()
            .filter(|&child| self.element(child).is_some_and(|c| c.tag() == tag))
            .collect()
    }

    /// Number of element nodes
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n.kind, NodeKind::Element { .. }))
            .count()
    }

    /// True when the document has no elements
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// First element, in document order, whose `id` attribute equals `html_id`
    #[must_use]
    pub fn find_by_html_id(&self, html_id: &str) -> Option<ElementNode<'_>> {
        self.elements()
            .into_iter()
            .find(|e| e.html_id() == Some(html_id))
    }

    /// Concatenated character data of `id` and everything below it
    #[must_use]
    pub fn text_content(&self, id: NodeId) -> String {
        let mut text = String::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(NodeKind::Text(chunk)) = self.kind(current) {
                text.push_str(chunk);
            }
            stack.extend(self.children(current).iter().rev().copied());
        }
        text
    }
}

/// Read-only view of one element inside a [`DomTree`]
#[derive(Debug, Clone, Copy)]
pub struct ElementNode<'a> {
    tree: &'a DomTree,
    id: NodeId,
}

impl PartialEq for ElementNode<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.tree, other.tree) && self.id == other.id
    }
}

impl Eq for ElementNode<'_> {}

impl<'a> ElementNode<'a> {
    /// Arena index of this element
    #[must_use]
    pub const fn node_id(&self) -> NodeId {
        self.id
    }

    /// Tree this element belongs to
    #[must_use]
    pub const fn tree(&self) -> &'a DomTree {
        self.tree
    }

    /// Tag name; [`DOCUMENT_TAG`] for the document node
    #[must_use]
    pub fn tag(&self) -> &'a str {
        match self.tree.kind(self.id) {
            Some(NodeKind::Element { tag, .. }) => tag,
            _ => DOCUMENT_TAG,
        }
    }

    /// All attributes
    #[must_use]
    pub fn attributes(&self) -> &'a BTreeMap<String, String> {
        match self.tree.kind(self.id) {
            Some(NodeKind::Element { attributes, .. }) => attributes,
            _ => &NO_ATTRIBUTES,
        }
    }

    /// A single attribute value
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&'a str> {
        self.attributes().get(name).map(String::as_str)
    }

    /// The `id` attribute when present and non-empty
    #[must_use]
    pub fn html_id(&self) -> Option<&'a str> {
        self.attribute("id").filter(|id| !id.is_empty())
    }

    /// Concatenated text of this element and its descendants
    #[must_use]
    pub fn text(&self) -> String {
        self.tree.text_content(self.id)
    }

    /// True for the document node
    #[must_use]
    pub fn is_document(&self) -> bool {
        matches!(self.tree.kind(self.id), Some(NodeKind::Document))
    }

    /// Parent element, or `None` at the document node
    #[must_use]
    pub fn parent(&self) -> Option<ElementNode<'a>> {
        let parent = self.tree.nodes.get(self.id.0)?.parent?;
        self.tree.element(parent)
    }

    /// Children of this element's parent that share its tag, in document
    /// order (this element included). Empty at the document node.
    #[must_use]
    pub fn siblings_with_same_tag(&self) -> Vec<NodeId> {
        let Some(parent) = self.parent() else {
            return Vec::new();
        };
        self.tree.same_tag_children(parent.id, self.tag())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn sample() -> (DomTree, NodeId, NodeId, NodeId) {
        let mut tree = DomTree::new();
        let html = tree.append_element(tree.root(), "html", Vec::<(String, String)>::new());
        let body = tree.append_element(html, "body", Vec::<(String, String)>::new());
        let first = tree.append_element(body, "p", [("class", "lead")]);
        tree.append_text(first, "Hello ");
        let em = tree.append_element(first, "em", [("id", "")]);
        tree.append_text(em, "world");
        let second = tree.append_element(body, "p", [("id", "second")]);
        (tree, body, first, second)
    }

    mod tree_tests {
        use super::*;

        #[test]
        fn test_new_tree_has_only_document() {
            let tree = DomTree::new();
            assert!(tree.is_empty());
            let root = tree.element(tree.root()).unwrap();
            assert!(root.is_document());
            assert_eq!(root.tag(), DOCUMENT_TAG);
            assert!(root.parent().is_none());
        }

        #[test]
        fn test_elements_in_document_order() {
            let (tree, ..) = sample();
            let tags: Vec<&str> = tree.elements().iter().map(|e| e.tag()).collect();
            assert_eq!(tags, vec!["html", "body", "p", "em", "p"]);
            assert_eq!(tree.len(), 5);
        }

        #[test]
        fn test_text_nodes_are_not_elements() {
            let (tree, _, first, _) = sample();
            let text_id = tree.children(first)[0];
            assert!(tree.element(text_id).is_none());
        }

        #[test]
        fn test_text_content_concatenates_descendants() {
            let (tree, _, first, _) = sample();
            assert_eq!(tree.text_content(first), "Hello world");
        }

        #[test]
        fn test_find_by_html_id() {
            let (tree, _, _, second) = sample();
            assert_eq!(tree.find_by_html_id("second").unwrap().node_id(), second);
            assert!(tree.find_by_html_id("missing").is_none());
        }

        #[test]
        fn test_same_tag_children() {
            let (tree, body, first, second) = sample();
            assert_eq!(tree.same_tag_children(body, "p"), vec![first, second]);
            assert!(tree.same_tag_children(body, "em").is_empty());
        }

        #[test]
        fn test_deep_tree_descendants_do_not_recurse() {
            let mut tree = DomTree::new();
            let mut parent = tree.root();
            for _ in 0..50_000 {
                parent = tree.append_element(parent, "div", Vec::<(String, String)>::new());
            }
            assert_eq!(tree.descendants(tree.root()).len(), 50_000);
        }
    }

    mod element_tests {
        use super::*;

        #[test]
        fn test_empty_id_is_not_an_id() {
            let (tree, ..) = sample();
            let em = tree.elements().into_iter().find(|e| e.tag() == "em").unwrap();
            assert_eq!(em.attribute("id"), Some(""));
            assert!(em.html_id().is_none());
        }

        #[test]
        fn test_siblings_with_same_tag() {
            let (tree, body, first, second) = sample();
            let p = tree.element(first).unwrap();
            assert_eq!(p.siblings_with_same_tag(), vec![first, second]);
            assert_eq!(p.parent().unwrap().node_id(), body);
        }

        #[test]
        fn test_document_has_no_siblings() {
            let tree = DomTree::new();
            let root = tree.element(tree.root()).unwrap();
            assert!(root.siblings_with_same_tag().is_empty());
            assert!(root.attributes().is_empty());
        }
    }
}
