//! HTML parsing via html5ever.

use std::io;

use html5ever::tendril::TendrilSink;
use html5ever::tree_builder::TreeBuilderOpts;
use html5ever::{parse_document, ParseOpts};
use markup5ever_rcdom::{Handle, NodeData, RcDom};
use tracing::debug;

use crate::dom::{DomTree, NodeId};
use crate::result::{HealError, HealResult};
use crate::scraper::PageParser;

/// Attributes holding whitespace-separated token lists
const TOKEN_LIST_ATTRIBUTES: [&str; 2] = ["class", "rel"];

/// Standards-compliant HTML parser
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlParser;

impl HtmlParser {
    /// Create a parser
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl PageParser for HtmlParser {
    fn get_elements(&self, document: &str) -> HealResult<DomTree> {
        let opts = ParseOpts {
            tree_builder: TreeBuilderOpts {
                scripting_enabled: false,
                ..Default::default()
            },
            ..Default::default()
        };
        let mut reader = io::Cursor::new(document.as_bytes());
        let dom = parse_document(RcDom::default(), opts)
            .from_utf8()
            .read_from(&mut reader)
            .map_err(|e| HealError::parse(format!("failed to parse HTML: {e}")))?;

        let tree = convert(&dom.document);
        debug!(elements = tree.len(), "Parsed page source");
        Ok(tree)
    }
}

fn attribute_value(name: &str, value: &str) -> String {
    if TOKEN_LIST_ATTRIBUTES.contains(&name) {
        value.split_whitespace().collect::<Vec<_>>().join(" ")
    } else {
        value.to_string()
    }
}

/// Copy an rcdom document into a [`DomTree`] without recursing.
/// Comments, doctypes and template contents are dropped.
fn convert(document: &Handle) -> DomTree {
    let mut tree = DomTree::new();
    let root = tree.root();
    let mut stack: Vec<(Handle, NodeId)> = document
        .children
        .borrow()
        .iter()
        .rev()
        .map(|child| (child.clone(), root))
        .collect();

    while let Some((handle, parent)) = stack.pop() {
        match &handle.data {
            NodeData::Element { name, attrs, .. } => {
                let attributes: Vec<(String, String)> = attrs
                    .borrow()
                    .iter()
                    .map(|attr| {
                        let key = attr.name.local.to_string();
                        let value = attribute_value(&key, &attr.value);
                        (key, value)
                    })
                    .collect();
                let id = tree.append_element(parent, name.local.to_string(), attributes);
                stack.extend(
                    handle
                        .children
                        .borrow()
                        .iter()
                        .rev()
                        .map(|child| (child.clone(), id)),
                );
            }
            NodeData::Text { contents } => {
                tree.append_text(parent, contents.borrow().to_string());
            }
            _ => {}
        }
    }
    tree
}
