//! Structured document tree produced by the parser and consumed by the sanitizer.

use indexmap::IndexMap;
use serde::Serialize;

/// Tag name of the synthetic container at the top of every parsed tree.
///
/// Real tag names always start with an ASCII letter, so this can never collide with input.
pub const ROOT_TAG: &str = "#fragment";

/// Elements serialized without a closing tag.
const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

pub fn is_void_tag(tag: &str) -> bool {
    VOID_TAGS.contains(&tag)
}

pub type Attributes = IndexMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum DocumentNode {
    Text {
        value: String,
    },
    Element {
        tag: String,
        #[serde(skip_serializing_if = "IndexMap::is_empty")]
        attributes: Attributes,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        children: Vec<DocumentNode>,
    },
}

impl DocumentNode {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text {
            value: value.into(),
        }
    }

    pub fn element(tag: impl Into<String>, children: Vec<DocumentNode>) -> Self {
        Self::Element {
            tag: tag.into(),
            attributes: Attributes::new(),
            children,
        }
    }

    pub fn element_with_attrs(
        tag: impl Into<String>,
        attributes: Attributes,
        children: Vec<DocumentNode>,
    ) -> Self {
        Self::Element {
            tag: tag.into(),
            attributes,
            children,
        }
    }

    pub fn root(children: Vec<DocumentNode>) -> Self {
        Self::element(ROOT_TAG, children)
    }

    pub fn is_root(&self) -> bool {
        matches!(self, Self::Element { tag, .. } if tag == ROOT_TAG)
    }

    pub fn tag(&self) -> Option<&str> {
        match self {
            Self::Element { tag, .. } => Some(tag),
            Self::Text { .. } => None,
        }
    }

    pub fn attributes(&self) -> Option<&Attributes> {
        match self {
            Self::Element { attributes, .. } => Some(attributes),
            Self::Text { .. } => None,
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes()?.get(name).map(String::as_str)
    }

    pub fn children(&self) -> &[DocumentNode] {
        match self {
            Self::Element { children, .. } => children,
            Self::Text { .. } => &[],
        }
    }

    /// Concatenated text of this node and all descendants, in document order.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        for node in self.descendants() {
            if let Self::Text { value } = node {
                out.push_str(value);
            }
        }
        out
    }

    /// Pre-order iterator over this node and every node below it.
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants { stack: vec![self] }
    }

    /// All elements below this node (excluding the node itself) with the given tag.
    pub fn find_all<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a DocumentNode> + 'a {
        self.descendants()
            .skip(1)
            .filter(move |n| n.tag() == Some(tag))
    }

    /// Serializes the tree as an HTML fragment.
    ///
    /// Text and attribute values are always encoded, so the result is only as permissive as the
    /// tree itself: callers must only feed sanitized trees into a live document.
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        write_html(self, &mut out);
        out
    }
}

pub struct Descendants<'a> {
    stack: Vec<&'a DocumentNode>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a DocumentNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children().iter().rev());
        Some(node)
    }
}

fn write_html(node: &DocumentNode, out: &mut String) {
    // Explicit stack: trees handed in by callers are not depth-bounded.
    enum Step<'a> {
        Open(&'a DocumentNode),
        Close(&'a str),
    }

    let mut stack = vec![Step::Open(node)];
    while let Some(step) = stack.pop() {
        match step {
            Step::Close(tag) => {
                out.push_str("</");
                out.push_str(tag);
                out.push('>');
            }
            Step::Open(DocumentNode::Text { value }) => {
                out.push_str(&htmlize::escape_text(value.as_str()));
            }
            Step::Open(DocumentNode::Element {
                tag,
                attributes,
                children,
            }) => {
                if tag == ROOT_TAG {
                    stack.extend(children.iter().rev().map(Step::Open));
                    continue;
                }
                out.push('<');
                out.push_str(tag);
                for (name, value) in attributes {
                    out.push(' ');
                    out.push_str(name);
                    out.push_str("=\"");
                    out.push_str(&htmlize::escape_attribute(value.as_str()));
                    out.push('"');
                }
                out.push('>');
                if is_void_tag(tag) {
                    continue;
                }
                stack.push(Step::Close(tag));
                stack.extend(children.iter().rev().map(Step::Open));
            }
        }
    }
}
