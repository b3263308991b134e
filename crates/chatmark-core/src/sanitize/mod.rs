//! Allowlist enforcement over parsed document trees.
//!
//! [`sanitize`] is total and deterministic: disallowed elements are unwrapped (their children
//! take their place), executable containers are dropped with their subtree, and attributes
//! survive only when the policy allows them on that tag and, for URL-bearing names, when the
//! value's scheme is permitted. Sanitizing an already sanitized tree changes nothing.

mod policy;

pub use policy::{SanitizationPolicy, WILDCARD, default_policy};

use crate::tree::{Attributes, DocumentNode, is_void_tag};
use regex::Regex;
use std::sync::OnceLock;

/// Block elements that are omitted once sanitization leaves them with no content and no
/// attributes.
const DROPPED_WHEN_EMPTY: &[&str] = &[
    "p", "h1", "h2", "h3", "h4", "h5", "h6", "blockquote", "ul", "ol",
];

fn attr_whitespace_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"[\u{0000}-\u{0020}\u{00A0}\u{1680}\u{180E}\u{2000}-\u{2029}\u{205F}\u{3000}]")
            .expect("valid regex")
    })
}

/// Decodes the entity spellings of `:`, newline and tab that browsers honour inside URL
/// attributes, so that `javascript&colon;` is checked as `javascript:`.
fn decode_attr_html_entities_minimally(input: &str) -> String {
    fn colon_entity_regex() -> &'static Regex {
        static RE: OnceLock<Regex> = OnceLock::new();
        RE.get_or_init(|| Regex::new(r"(?i)&colon;|&#0*58;?|&#x0*3a;?").expect("valid regex"))
    }

    fn newline_entity_regex() -> &'static Regex {
        static RE: OnceLock<Regex> = OnceLock::new();
        RE.get_or_init(|| Regex::new(r"(?i)&newline;").expect("valid regex"))
    }

    fn tab_entity_regex() -> &'static Regex {
        static RE: OnceLock<Regex> = OnceLock::new();
        RE.get_or_init(|| Regex::new(r"(?i)&tab;").expect("valid regex"))
    }

    if !input.contains('&') {
        return input.to_string();
    }
    let out = colon_entity_regex().replace_all(input, ":");
    let out = newline_entity_regex().replace_all(&out, "\n");
    tab_entity_regex().replace_all(&out, "\t").into_owned()
}

impl SanitizationPolicy {
    /// Whether a URL attribute value may be kept: relative references always, absolute ones
    /// only with an allowed scheme. Unparseable absolute URLs are rejected.
    pub fn allows_url(&self, value: &str) -> bool {
        let decoded = decode_attr_html_entities_minimally(value);
        let compact = attr_whitespace_regex().replace_all(&decoded, "");
        match url::Url::parse(&compact) {
            Ok(url) => self.allows_scheme(url.scheme()),
            Err(url::ParseError::RelativeUrlWithoutBase) => true,
            Err(_) => false,
        }
    }
}

/// Enforces `policy` on `tree`. The result is always a root container.
///
/// A non-root input is treated as the single child of a fresh root.
pub fn sanitize(tree: DocumentNode, policy: &SanitizationPolicy) -> DocumentNode {
    let top_level = if tree.is_root() {
        match tree {
            DocumentNode::Element { children, .. } => children,
            DocumentNode::Text { .. } => Vec::new(),
        }
    } else {
        vec![tree]
    };

    let mut out = Vec::with_capacity(top_level.len());
    for node in top_level {
        sanitize_node(node, 1, policy, &mut out);
    }
    DocumentNode::root(out)
}

/// Appends the sanitized form of `node` (sitting at `depth`) to `out`.
fn sanitize_node(
    node: DocumentNode,
    depth: usize,
    policy: &SanitizationPolicy,
    out: &mut Vec<DocumentNode>,
) {
    let (tag, attributes, children) = match node {
        DocumentNode::Text { value } => {
            push_text(out, value);
            return;
        }
        DocumentNode::Element {
            tag,
            attributes,
            children,
        } => (tag.to_ascii_lowercase(), attributes, children),
    };

    if depth > policy.max_depth() || policy.drops_subtree(&tag) {
        return;
    }

    let mut kept = Vec::with_capacity(children.len());
    for child in children {
        sanitize_node(child, depth + 1, policy, &mut kept);
    }

    if !policy.allows_tag(&tag) {
        for child in kept {
            push_node(out, child);
        }
        return;
    }

    let attributes = clean_attributes(&tag, attributes, policy);
    if kept.is_empty() && attributes.is_empty() && DROPPED_WHEN_EMPTY.contains(&tag.as_str()) {
        return;
    }
    if is_void_tag(&tag) {
        // Void elements cannot carry content; hoist it after the element.
        out.push(DocumentNode::element_with_attrs(tag, attributes, Vec::new()));
        for child in kept {
            push_node(out, child);
        }
    } else {
        out.push(DocumentNode::element_with_attrs(tag, attributes, kept));
    }
}

fn clean_attributes(tag: &str, attributes: Attributes, policy: &SanitizationPolicy) -> Attributes {
    let mut kept = Attributes::new();
    for (name, value) in attributes {
        let name = name.to_ascii_lowercase();
        if kept.contains_key(&name) || !policy.allows_attribute(tag, &name) {
            continue;
        }
        if policy.is_url_attribute(&name) && !policy.allows_url(&value) {
            continue;
        }
        kept.insert(name, value);
    }
    kept
}

fn push_node(out: &mut Vec<DocumentNode>, node: DocumentNode) {
    match node {
        DocumentNode::Text { value } => push_text(out, value),
        element => out.push(element),
    }
}

/// Appends text, merging with a preceding text node and skipping empty strings.
fn push_text(out: &mut Vec<DocumentNode>, value: String) {
    if value.is_empty() {
        return;
    }
    if let Some(DocumentNode::Text { value: last }) = out.last_mut() {
        last.push_str(&value);
    } else {
        out.push(DocumentNode::Text { value });
    }
}
