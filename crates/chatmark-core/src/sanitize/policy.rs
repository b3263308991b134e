use crate::config::{DEFAULT_MAX_NESTING, RenderConfig};
use crate::{Error, Result};
use regex::Regex;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::OnceLock;

/// Key in [`SanitizationPolicy`]'s attribute table that applies to every allowed tag.
pub const WILDCARD: &str = "*";

const DEFAULT_ALLOWED_TAGS: &[&str] = &[
    "p", "br", "strong", "em", "code", "pre", "h1", "h2", "h3", "h4", "h5", "h6", "ul", "ol", "li",
    "blockquote", "a", "img", "table", "thead", "tbody", "tr", "th", "td", "hr", "del", "ins",
    "sub", "sup",
];

const DEFAULT_ALLOWED_ATTRIBUTES: &[(&str, &[&str])] = &[
    (WILDCARD, &["class", "title"]),
    ("a", &["href"]),
    ("img", &["src", "alt"]),
    ("ol", &["start"]),
    ("th", &["align"]),
    ("td", &["align"]),
];

const FORBIDDEN_ATTRIBUTE_PREFIXES: &[&str] = &["on"];

const URL_ATTRIBUTE_NAMES: &[&str] = &[
    "href",
    "src",
    "cite",
    "action",
    "formaction",
    "poster",
    "background",
    "xlink:href",
];

const DEFAULT_SCHEMES: &[&str] = &["http", "https", "mailto", "tel"];

/// Schemes that can never be allowed, whatever the configuration says.
const EXECUTABLE_SCHEMES: &[&str] = &["javascript", "vbscript", "data"];

/// Elements removed together with everything below them.
const DROPPED_TAGS: &[&str] = &[
    "script", "style", "iframe", "frame", "frameset", "object", "embed", "applet", "link", "meta",
    "base", "noscript", "noembed", "noframes", "template",
];

fn tag_name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-z][a-z0-9\-]*$").expect("valid regex"))
}

fn attribute_name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-z_:][a-z0-9_.:\-]*$").expect("valid regex"))
}

fn scheme_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-z][a-z0-9+.\-]*$").expect("valid regex"))
}

/// Allowlist deciding which tags, attributes and URL schemes survive sanitization.
///
/// Immutable once built: the default comes from [`SanitizationPolicy::default`] (or the shared
/// [`default_policy`]), overrides only through [`SanitizationPolicy::from_config`], which
/// validates them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SanitizationPolicy {
    allowed_tags: BTreeSet<String>,
    allowed_attributes: BTreeMap<String, BTreeSet<String>>,
    forbidden_attribute_prefixes: Vec<String>,
    url_attribute_names: BTreeSet<String>,
    allowed_schemes: BTreeSet<String>,
    dropped_tags: BTreeSet<String>,
    max_depth: usize,
}

fn owned_set(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for SanitizationPolicy {
    fn default() -> Self {
        Self {
            allowed_tags: owned_set(DEFAULT_ALLOWED_TAGS),
            allowed_attributes: DEFAULT_ALLOWED_ATTRIBUTES
                .iter()
                .map(|(tag, attrs)| (tag.to_string(), owned_set(attrs)))
                .collect(),
            forbidden_attribute_prefixes: FORBIDDEN_ATTRIBUTE_PREFIXES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            url_attribute_names: owned_set(URL_ATTRIBUTE_NAMES),
            allowed_schemes: owned_set(DEFAULT_SCHEMES),
            dropped_tags: owned_set(DROPPED_TAGS),
            max_depth: DEFAULT_MAX_NESTING,
        }
    }
}

/// Shared default policy.
pub fn default_policy() -> &'static SanitizationPolicy {
    static POLICY: OnceLock<SanitizationPolicy> = OnceLock::new();
    POLICY.get_or_init(SanitizationPolicy::default)
}

impl SanitizationPolicy {
    /// Builds a policy from the `policy.*` and `maxNesting` keys of `config`, on top of the
    /// default policy.
    ///
    /// Rejected configurations:
    /// - a tag in `policy.addTags` without a `policy.addAttr` entry (the list may be empty);
    /// - a tag from the always-dropped set, or a malformed tag name;
    /// - an attribute with a forbidden prefix (`on*`), or a malformed attribute name;
    /// - `policy.addAttr` keys that are not allowed tags;
    /// - a malformed scheme, or `javascript` / `vbscript` / `data`.
    pub fn from_config(config: &RenderConfig) -> Result<Self> {
        let mut policy = Self::default();

        let add_tags = config.string_list("policy.addTags")?;
        let add_attr = config.string_list_map("policy.addAttr")?;
        let forbid_tags = config.string_list("policy.forbidTags")?;
        let forbid_attr = config.string_list("policy.forbidAttr")?;
        let add_schemes = config.string_list("policy.addUriSchemes")?;

        for tag in &add_tags {
            if !tag_name_regex().is_match(tag) {
                return Err(Error::invalid_policy(format!("`{tag}` is not a valid tag name")));
            }
            if policy.dropped_tags.contains(tag) {
                return Err(Error::invalid_policy(format!(
                    "`{tag}` carries executable content and cannot be allowed"
                )));
            }
            if !add_attr.iter().any(|(key, _)| key == tag) {
                return Err(Error::invalid_policy(format!(
                    "`{tag}` is added without an attribute allowlist (policy.addAttr.{tag})"
                )));
            }
            policy.allowed_tags.insert(tag.clone());
        }

        for (tag, attrs) in add_attr {
            if tag != WILDCARD && !policy.allowed_tags.contains(&tag) {
                return Err(Error::invalid_policy(format!(
                    "policy.addAttr lists attributes for `{tag}`, which is not an allowed tag"
                )));
            }
            for attr in &attrs {
                if !attribute_name_regex().is_match(attr) {
                    return Err(Error::invalid_policy(format!(
                        "`{attr}` is not a valid attribute name"
                    )));
                }
                if policy.has_forbidden_prefix(attr) {
                    return Err(Error::invalid_policy(format!(
                        "`{attr}` is an event-handler attribute and cannot be allowed"
                    )));
                }
            }
            policy
                .allowed_attributes
                .entry(tag)
                .or_default()
                .extend(attrs);
        }

        for scheme in add_schemes {
            if !scheme_regex().is_match(&scheme) {
                return Err(Error::invalid_policy(format!(
                    "`{scheme}` is not a valid URI scheme"
                )));
            }
            if EXECUTABLE_SCHEMES.contains(&scheme.as_str()) {
                return Err(Error::invalid_policy(format!(
                    "the `{scheme}:` scheme cannot be allowed"
                )));
            }
            policy.allowed_schemes.insert(scheme);
        }

        for tag in &forbid_tags {
            policy.allowed_tags.remove(tag);
            policy.allowed_attributes.remove(tag);
        }
        for attr in &forbid_attr {
            for attrs in policy.allowed_attributes.values_mut() {
                attrs.remove(attr);
            }
        }

        policy.max_depth = config.max_nesting()?;
        Ok(policy)
    }

    pub fn allows_tag(&self, tag: &str) -> bool {
        self.allowed_tags.contains(tag)
    }

    /// Whether `tag` is removed along with its whole subtree.
    pub fn drops_subtree(&self, tag: &str) -> bool {
        self.dropped_tags.contains(tag)
    }

    pub fn has_forbidden_prefix(&self, attr: &str) -> bool {
        self.forbidden_attribute_prefixes
            .iter()
            .any(|prefix| attr.starts_with(prefix.as_str()))
    }

    /// Whether `attr` may appear on `tag`, before any URL check.
    pub fn allows_attribute(&self, tag: &str, attr: &str) -> bool {
        if self.has_forbidden_prefix(attr) {
            return false;
        }
        [tag, WILDCARD].iter().any(|key| {
            self.allowed_attributes
                .get(*key)
                .is_some_and(|attrs| attrs.contains(attr))
        })
    }

    pub fn is_url_attribute(&self, attr: &str) -> bool {
        self.url_attribute_names.contains(attr)
    }

    pub fn allows_scheme(&self, scheme: &str) -> bool {
        self.allowed_schemes.contains(scheme)
    }

    /// Deepest element depth kept by the sanitizer (the root is depth 0).
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn allowed_tags(&self) -> impl Iterator<Item = &str> + '_ {
        self.allowed_tags.iter().map(String::as_str)
    }

    pub fn allowed_schemes(&self) -> impl Iterator<Item = &str> + '_ {
        self.allowed_schemes.iter().map(String::as_str)
    }
}
