//! Structural locator synthesis.
//!
//! Derives an XPath for an element purely from where it sits in the tree:
//!
//! - an element with a non-empty `id` is `//*[@id="<id>"]`;
//! - otherwise the path climbs parent links, appending `/<tag>` (sole child of
//!   that tag) or `/<tag>[<n>]` (1-based among same-tag siblings) until an
//!   ancestor with an `id` anchors it, or the document node ends the walk.
//!
//! The walk is a loop over parent links, so nesting depth is unbounded.

use std::fmt;

use tracing::warn;

use crate::dom::{DomTree, ElementNode, NodeId};

/// What a synthesized locator is rooted at
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Anchor {
    /// Nearest element (self or ancestor) carrying this `id`
    Id(String),
    /// No `id` anywhere on the ancestor chain; the path is absolute
    DocumentRoot,
}

/// An XPath produced by [`synthesize`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesizedLocator {
    xpath: String,
    anchor: Anchor,
}

impl SynthesizedLocator {
    /// The XPath text
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.xpath
    }

    /// What the path is rooted at
    #[must_use]
    pub const fn anchor(&self) -> &Anchor {
        &self.anchor
    }

    /// True when an `id` anchors the path
    #[must_use]
    pub const fn is_anchored(&self) -> bool {
        matches!(self.anchor, Anchor::Id(_))
    }

    /// Take the XPath text
    #[must_use]
    pub fn into_string(self) -> String {
        self.xpath
    }
}

impl fmt::Display for SynthesizedLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.xpath)
    }
}

fn id_anchor(id: &str) -> String {
    format!("//*[@id=\"{id}\"]")
}

/// Synthesize the locator of `element`.
///
/// Never fails. A result with [`Anchor::DocumentRoot`] is logged as a warning
/// since such paths break on any structural change above the element.
#[must_use]
pub fn synthesize(element: ElementNode<'_>) -> SynthesizedLocator {
    if let Some(id) = element.html_id() {
        return SynthesizedLocator {
            xpath: id_anchor(id),
            anchor: Anchor::Id(id.to_string()),
        };
    }

    // Segments collected leaf-first, emitted root-first.
    let mut segments: Vec<String> = Vec::new();
    let mut current = element;
    loop {
        let Some(parent) = current.parent() else {
            let xpath: String = segments.iter().rev().map(String::as_str).collect();
            warn!(
                locator = %xpath,
                tag = element.tag(),
                "Locator is not anchored by any ancestor id"
            );
            return SynthesizedLocator {
                xpath,
                anchor: Anchor::DocumentRoot,
            };
        };

        let siblings = current.siblings_with_same_tag();
        let tag = current.tag();
        if siblings.len() <= 1 {
            segments.push(format!("/{tag}"));
        } else {
            let position = siblings
                .iter()
                .position(|&s| s == current.node_id())
                .map_or(1, |p| p + 1);
            segments.push(format!("/{tag}[{position}]"));
        }

        if let Some(parent_id) = parent.html_id() {
            let mut xpath = id_anchor(parent_id);
            for segment in segments.iter().rev() {
                xpath.push_str(segment);
            }
            return SynthesizedLocator {
                xpath,
                anchor: Anchor::Id(parent_id.to_string()),
            };
        }
        current = parent;
    }
}

/// Synthesize locators for every element whose tag is in `tags`, in document
/// order. An empty `tags` slice selects every element.
#[must_use]
pub fn synthesize_all<S: AsRef<str>>(tree: &DomTree, tags: &[S]) -> Vec<(NodeId, SynthesizedLocator)> {
    tree.elements()
        .into_iter()
        .filter(|e| tags.is_empty() || tags.iter().any(|t| t.as_ref() == e.tag()))
        .map(|e| (e.node_id(), synthesize(e)))
        .collect()
}

/// Resolve a locator of the shape [`synthesize`] emits against `tree`.
///
/// Accepts an optional `//*[@id="x"]` (or single-quoted) anchor followed by
/// `/tag` and `/tag[n]` steps; an unanchored path starts at the document.
/// Anything else resolves to `None`.
#[must_use]
pub fn resolve<'a>(tree: &'a DomTree, locator: &str) -> Option<ElementNode<'a>> {
    let (mut current, mut rest) = match locator.strip_prefix("//*[@id=") {
        Some(after) => {
            let quote = after.chars().next().filter(|q| *q == '"' || *q == '\'')?;
            let after = &after[1..];
            let end = after.find(quote)?;
            let rest = after[end + 1..].strip_prefix(']')?;
            (tree.find_by_html_id(&after[..end])?, rest)
        }
        None => (tree.element(tree.root())?, locator),
    };

    while !rest.is_empty() {
        let step_and_rest = rest.strip_prefix('/')?;
        let end = step_and_rest.find('/').unwrap_or(step_and_rest.len());
        let step = &step_and_rest[..end];
        rest = &step_and_rest[end..];

        let (tag, position) = match step.find('[') {
            Some(open) => {
                let index: usize = step[open + 1..].strip_suffix(']')?.parse().ok()?;
                (&step[..open], index)
            }
            None => (step, 1),
        };
        if tag.is_empty() || position == 0 {
            return None;
        }
        current = tree
            .children(current.node_id())
            .iter()
            .filter_map(|&c| tree.element(c))
            .filter(|c| c.tag() == tag)
            .nth(position - 1)?;
    }

    (!current.is_document()).then_some(current)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    const NONE: [(&str, &str); 0] = [];

    /// `<html><body><div id="main"><ul><li/><li/><li/></ul><p/></div><div/><div><span/></div></body></html>`
    struct Page {
        tree: DomTree,
        body: NodeId,
        ul: NodeId,
        items: [NodeId; 3],
        para: NodeId,
        span: NodeId,
    }

    fn page() -> Page {
        let mut tree = DomTree::new();
        let html = tree.append_element(tree.root(), "html", NONE);
        let body = tree.append_element(html, "body", NONE);
        let main = tree.append_element(body, "div", [("id", "main")]);
        let ul = tree.append_element(main, "ul", NONE);
        let items = [
            tree.append_element(ul, "li", NONE),
            tree.append_element(ul, "li", NONE),
            tree.append_element(ul, "li", NONE),
        ];
        let para = tree.append_element(main, "p", NONE);
        tree.append_element(body, "div", NONE);
        let third = tree.append_element(body, "div", NONE);
        let span = tree.append_element(third, "span", NONE);
        Page {
            tree,
            body,
            ul,
            items,
            para,
            span,
        }
    }

    fn locator_of(tree: &DomTree, id: NodeId) -> SynthesizedLocator {
        synthesize(tree.element(id).unwrap())
    }

    mod synthesize_tests {
        use super::*;

        #[test]
        fn test_id_short_circuit() {
            let p = page();
            let main = p.tree.find_by_html_id("main").unwrap();
            let loc = synthesize(main);
            assert_eq!(loc.as_str(), r#"//*[@id="main"]"#);
            assert_eq!(loc.anchor(), &Anchor::Id("main".to_string()));
        }

        #[test]
        fn test_id_short_circuit_ignores_depth() {
            let mut tree = DomTree::new();
            let mut parent = tree.root();
            for _ in 0..200 {
                parent = tree.append_element(parent, "div", NONE);
            }
            let leaf = tree.append_element(parent, "input", [("id", "deep")]);
            assert_eq!(locator_of(&tree, leaf).as_str(), r#"//*[@id="deep"]"#);
        }

        #[test]
        fn test_sibling_disambiguation() {
            let p = page();
            assert_eq!(
                locator_of(&p.tree, p.items[1]).as_str(),
                r#"//*[@id="main"]/ul/li[2]"#
            );
            assert_eq!(
                locator_of(&p.tree, p.items[0]).as_str(),
                r#"//*[@id="main"]/ul/li[1]"#
            );
        }

        #[test]
        fn test_sole_same_tag_child_has_no_index() {
            let p = page();
            assert_eq!(locator_of(&p.tree, p.ul).as_str(), r#"//*[@id="main"]/ul"#);
            assert_eq!(locator_of(&p.tree, p.para).as_str(), r#"//*[@id="main"]/p"#);
        }

        #[test]
        fn test_index_counts_same_tag_only() {
            let mut tree = DomTree::new();
            let form = tree.append_element(tree.root(), "form", [("id", "f")]);
            tree.append_element(form, "label", NONE);
            tree.append_element(form, "input", NONE);
            tree.append_element(form, "label", NONE);
            let second_input = tree.append_element(form, "input", NONE);
            assert_eq!(
                locator_of(&tree, second_input).as_str(),
                r#"//*[@id="f"]/input[2]"#
            );
        }

        #[test]
        fn test_unanchored_path_reaches_document() {
            let p = page();
            let loc = locator_of(&p.tree, p.span);
            assert_eq!(loc.as_str(), "/html/body/div[3]/span");
            assert_eq!(loc.anchor(), &Anchor::DocumentRoot);
            assert!(!loc.is_anchored());
        }

        #[test]
        fn test_empty_parent_id_does_not_anchor() {
            let mut tree = DomTree::new();
            let html = tree.append_element(tree.root(), "html", NONE);
            let section = tree.append_element(html, "section", [("id", "")]);
            let a = tree.append_element(section, "a", NONE);
            assert_eq!(locator_of(&tree, a).as_str(), "/html/section/a");
        }

        #[test]
        fn test_document_node_yields_empty_path() {
            let tree = DomTree::new();
            let loc = synthesize(tree.element(tree.root()).unwrap());
            assert_eq!(loc.as_str(), "");
            assert!(!loc.is_anchored());
        }

        #[test]
        fn test_deep_walk_is_iterative() {
            let mut tree = DomTree::new();
            let mut parent = tree.root();
            for _ in 0..20_000 {
                parent = tree.append_element(parent, "div", NONE);
            }
            let loc = locator_of(&tree, parent);
            assert_eq!(loc.as_str().len(), "/div".len() * 20_000);
        }

        #[test]
        fn test_determinism() {
            let p = page();
            let first = locator_of(&p.tree, p.items[2]);
            let second = locator_of(&p.tree, p.items[2]);
            assert_eq!(first, second);
        }

        #[test]
        fn test_synthesize_all_filters_tags() {
            let p = page();
            let all = synthesize_all(&p.tree, &["div", "span"]);
            let xpaths: Vec<&str> = all.iter().map(|(_, l)| l.as_str()).collect();
            assert_eq!(
                xpaths,
                vec![
                    r#"//*[@id="main"]"#,
                    "/html/body/div[2]",
                    "/html/body/div[3]",
                    "/html/body/div[3]/span",
                ]
            );
            assert_eq!(synthesize_all::<&str>(&p.tree, &[]).len(), p.tree.len());
            assert!(all.iter().all(|(id, _)| *id != p.body));
        }
    }

    mod resolve_tests {
        use super::*;

        #[test]
        fn test_resolve_id_anchor_quotes() {
            let p = page();
            let main = p.tree.find_by_html_id("main").unwrap().node_id();
            assert_eq!(resolve(&p.tree, r#"//*[@id="main"]"#).unwrap().node_id(), main);
            assert_eq!(resolve(&p.tree, "//*[@id='main']").unwrap().node_id(), main);
        }

        #[test]
        fn test_resolve_indexed_steps() {
            let p = page();
            let found = resolve(&p.tree, r#"//*[@id="main"]/ul/li[3]"#).unwrap();
            assert_eq!(found.node_id(), p.items[2]);
            let found = resolve(&p.tree, "/html/body/div[3]/span").unwrap();
            assert_eq!(found.node_id(), p.span);
        }

        #[test]
        fn test_resolve_rejects_unknown_shapes() {
            let p = page();
            assert!(resolve(&p.tree, "").is_none());
            assert!(resolve(&p.tree, "//button[@class='x']").is_none());
            assert!(resolve(&p.tree, r#"//*[@id="main"]/ul/li[0]"#).is_none());
            assert!(resolve(&p.tree, r#"//*[@id="main"]/ul/li[9]"#).is_none());
            assert!(resolve(&p.tree, r#"//*[@id="nope"]"#).is_none());
            assert!(resolve(&p.tree, "html/body").is_none());
        }
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;
        use std::collections::HashSet;

        const TAGS: [&str; 3] = ["div", "span", "p"];

        /// Each entry attaches a node under an earlier node (or the document).
        /// Every fifth node carries a unique id.
        fn tree_strategy() -> impl Strategy<Value = DomTree> {
            proptest::collection::vec((any::<usize>(), 0usize..TAGS.len(), any::<bool>()), 1..60)
                .prop_map(|plan| {
                    let mut tree = DomTree::new();
                    let mut ids = vec![tree.root()];
                    for (i, (parent_pick, tag, with_id)) in plan.into_iter().enumerate() {
                        let parent = ids[parent_pick % ids.len()];
                        let node = if with_id && i % 5 == 0 {
                            tree.append_element(parent, TAGS[tag], [("id", format!("n{i}"))])
                        } else {
                            tree.append_element(parent, TAGS[tag], NONE)
                        };
                        ids.push(node);
                    }
                    tree
                })
        }

        proptest! {
            #[test]
            fn prop_locators_are_unique(tree in tree_strategy()) {
                let locators = synthesize_all::<&str>(&tree, &[]);
                let distinct: HashSet<&str> = locators.iter().map(|(_, l)| l.as_str()).collect();
                prop_assert_eq!(distinct.len(), locators.len());
            }

            #[test]
            fn prop_locators_resolve_to_their_element(tree in tree_strategy()) {
                for (id, locator) in synthesize_all::<&str>(&tree, &[]) {
                    let found = resolve(&tree, locator.as_str());
                    prop_assert_eq!(found.map(|e| e.node_id()), Some(id), "{}", locator);
                }
            }
        }
    }
}
