//! Heuristic markup detection over raw chat text.
//!
//! Rules are independent and evaluated as a disjunction: any match routes the text through the
//! parser. False positives are harmless (the parser degrades to paragraphs) and so are false
//! negatives (the escaper is always safe).

use regex::Regex;
use std::sync::OnceLock;

pub type DetectorFn = fn(text: &str) -> bool;

#[derive(Debug, Clone)]
pub struct Detector {
    pub id: &'static str,
    pub detector: DetectorFn,
}

#[derive(Debug, Clone)]
pub struct DetectorRegistry {
    detectors: Vec<Detector>,
}

impl DetectorRegistry {
    pub fn new() -> Self {
        Self {
            detectors: Vec::new(),
        }
    }

    pub fn add(&mut self, detector: Detector) {
        self.detectors.push(detector);
    }

    pub fn add_fn(&mut self, id: &'static str, detector: DetectorFn) {
        self.add(Detector { id, detector });
    }

    pub fn ids(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.detectors.iter().map(|d| d.id)
    }

    /// Id of the first rule matching `text`, in registration order.
    pub fn matching_rule(&self, text: &str) -> Option<&'static str> {
        if text.trim().is_empty() {
            return None;
        }
        self.detectors
            .iter()
            .find(|det| (det.detector)(text))
            .map(|det| det.id)
    }

    pub fn looks_like_markup(&self, text: &str) -> bool {
        self.matching_rule(text).is_some()
    }

    pub fn default_chat() -> Self {
        let mut reg = Self::new();

        reg.add_fn("fenced-code", detector_fenced_code);
        reg.add_fn("inline-code", detector_inline_code);
        reg.add_fn("heading", detector_heading);
        reg.add_fn("bullet-list", detector_bullet_list);
        reg.add_fn("ordered-list", detector_ordered_list);
        reg.add_fn("bold", detector_bold);
        reg.add_fn("italic", detector_italic);
        reg.add_fn("link", detector_link);
        reg.add_fn("blockquote", detector_blockquote);
        reg.add_fn("table", detector_table);
        reg.add_fn("horizontal-rule", detector_horizontal_rule);

        reg
    }
}

impl Default for DetectorRegistry {
    fn default() -> Self {
        Self::default_chat()
    }
}

/// Shared default registry.
pub fn default_registry() -> &'static DetectorRegistry {
    static REG: OnceLock<DetectorRegistry> = OnceLock::new();
    REG.get_or_init(DetectorRegistry::default_chat)
}

/// Whether `text` likely carries intentional lightweight markup.
pub fn looks_like_markup(text: &str) -> bool {
    default_registry().looks_like_markup(text)
}

macro_rules! static_regex {
    ($name:ident, $pattern:literal) => {
        fn $name() -> &'static Regex {
            static RE: OnceLock<Regex> = OnceLock::new();
            RE.get_or_init(|| Regex::new($pattern).expect("valid regex"))
        }
    };
}

static_regex!(fenced_code_re, r"(?s)```.*```");
static_regex!(inline_code_re, r"`[^`]+`");
static_regex!(heading_re, r"(?m)^#{1,6}\s+");
static_regex!(bullet_list_re, r"(?m)^\s*[-*+]\s+");
static_regex!(ordered_list_re, r"(?m)^\s*\d+\.\s+");
static_regex!(bold_re, r"\*\*[^*]+\*\*");
static_regex!(italic_re, r"\*[^*]+\*");
static_regex!(link_re, r"\[[^\]]+\]\([^)]+\)");
static_regex!(blockquote_re, r"(?m)^\s*>\s+");
static_regex!(table_re, r"\|[^|]+\|");
static_regex!(horizontal_rule_re, r"(?m)^---+\r?$");

fn detector_fenced_code(txt: &str) -> bool {
    fenced_code_re().is_match(txt)
}

fn detector_inline_code(txt: &str) -> bool {
    inline_code_re().is_match(txt)
}

fn detector_heading(txt: &str) -> bool {
    heading_re().is_match(txt)
}

fn detector_bullet_list(txt: &str) -> bool {
    bullet_list_re().is_match(txt)
}

fn detector_ordered_list(txt: &str) -> bool {
    ordered_list_re().is_match(txt)
}

fn detector_bold(txt: &str) -> bool {
    bold_re().is_match(txt)
}

fn detector_italic(txt: &str) -> bool {
    italic_re().is_match(txt)
}

fn detector_link(txt: &str) -> bool {
    link_re().is_match(txt)
}

fn detector_blockquote(txt: &str) -> bool {
    blockquote_re().is_match(txt)
}

fn detector_table(txt: &str) -> bool {
    table_re().is_match(txt)
}

fn detector_horizontal_rule(txt: &str) -> bool {
    horizontal_rule_re().is_match(txt)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_prose_is_not_markup() {
        for text in [
            "hello world",
            "",
            "   \n\t  ",
            "The answer is 42.",
            "a < b and c > d",
            "<script>alert(1)</script>",
            "price: 3 * 4 = 12",
            "snake_case_name",
        ] {
            assert!(!looks_like_markup(text), "{text:?} detected as markup");
        }
    }

    #[test]
    fn each_rule_fires_on_its_construct() {
        let cases = [
            ("```rust\nfn main() {}\n```", "fenced-code"),
            ("run `ls -la` now", "inline-code"),
            ("# Title", "heading"),
            ("intro\n- one\n- two", "bullet-list"),
            ("steps:\n1. first", "ordered-list"),
            ("this is **bold**", "bold"),
            ("this is *italic*", "italic"),
            ("see [docs](https://example.com)", "link"),
            ("> quoted", "blockquote"),
            ("| a | b |", "table"),
            ("above\n---\nbelow", "horizontal-rule"),
        ];
        let reg = DetectorRegistry::default_chat();
        for (text, id) in cases {
            assert_eq!(reg.matching_rule(text), Some(id), "{text:?}");
        }
    }

    #[test]
    fn rules_are_checked_in_registration_order() {
        let reg = DetectorRegistry::default_chat();
        assert_eq!(reg.matching_rule("# `code`"), Some("inline-code"));
        assert_eq!(
            reg.ids().collect::<Vec<_>>(),
            vec![
                "fenced-code",
                "inline-code",
                "heading",
                "bullet-list",
                "ordered-list",
                "bold",
                "italic",
                "link",
                "blockquote",
                "table",
                "horizontal-rule",
            ]
        );
    }

    #[test]
    fn horizontal_rule_accepts_crlf_line_endings() {
        assert!(looks_like_markup("a\r\n---\r\nb"));
    }

    #[test]
    fn custom_registry_uses_only_its_rules() {
        let mut reg = DetectorRegistry::new();
        assert!(!reg.looks_like_markup("# Title"));
        reg.add_fn("shout", |t| t.ends_with('!'));
        assert_eq!(reg.matching_rule("hey!"), Some("shout"));
        assert!(!reg.looks_like_markup("   "));
    }
}
