use super::*;
use crate::config::RenderConfig;
use serde_json::json;

fn t(value: &str) -> DocumentNode {
    DocumentNode::text(value)
}

fn el(tag: &str, children: Vec<DocumentNode>) -> DocumentNode {
    DocumentNode::element(tag, children)
}

fn with_attrs(tag: &str, attrs: &[(&str, &str)], children: Vec<DocumentNode>) -> DocumentNode {
    let attributes = attrs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    DocumentNode::element_with_attrs(tag, attributes, children)
}

fn blocks(text: &str) -> Vec<DocumentNode> {
    let root = parse(text);
    assert!(root.is_root());
    root.children().to_vec()
}

fn element_depth(node: &DocumentNode) -> usize {
    match node {
        DocumentNode::Text { .. } => 0,
        DocumentNode::Element { children, .. } => {
            1 + children.iter().map(element_depth).max().unwrap_or(0)
        }
    }
}

#[test]
fn pipe_table_becomes_head_and_body() {
    assert_eq!(
        blocks("| a | b |\n| - | - |\n| 1 | 2 |"),
        vec![el(
            "table",
            vec![
                el(
                    "thead",
                    vec![el("tr", vec![el("th", vec![t("a")]), el("th", vec![t("b")])])]
                ),
                el(
                    "tbody",
                    vec![el("tr", vec![el("td", vec![t("1")]), el("td", vec![t("2")])])]
                ),
            ]
        )]
    );
}

#[test]
fn table_alignment_and_short_rows() {
    assert_eq!(
        blocks("| l | c | r |\n|:--|:-:|--:|\n| 1 |"),
        vec![el(
            "table",
            vec![
                el(
                    "thead",
                    vec![el(
                        "tr",
                        vec![
                            with_attrs("th", &[("align", "left")], vec![t("l")]),
                            with_attrs("th", &[("align", "center")], vec![t("c")]),
                            with_attrs("th", &[("align", "right")], vec![t("r")]),
                        ]
                    )]
                ),
                el(
                    "tbody",
                    vec![el(
                        "tr",
                        vec![
                            with_attrs("td", &[("align", "left")], vec![t("1")]),
                            with_attrs("td", &[("align", "center")], vec![]),
                            with_attrs("td", &[("align", "right")], vec![]),
                        ]
                    )]
                ),
            ]
        )]
    );
}

#[test]
fn table_interrupts_a_paragraph() {
    assert_eq!(
        blocks("intro\n| a |\n| - |"),
        vec![
            el("p", vec![t("intro")]),
            el(
                "table",
                vec![el("thead", vec![el("tr", vec![el("th", vec![t("a")])])])]
            ),
        ]
    );
}

#[test]
fn pipes_without_a_delimiter_row_stay_text() {
    assert_eq!(blocks("a | b"), vec![el("p", vec![t("a | b")])]);
}

#[test]
fn atx_and_setext_headings() {
    assert_eq!(
        blocks("# Title\n\nSome text\n\n## Sub ##"),
        vec![
            el("h1", vec![t("Title")]),
            el("p", vec![t("Some text")]),
            el("h2", vec![t("Sub")]),
        ]
    );
    assert_eq!(
        blocks("Title\n===\n\nSub\n---"),
        vec![el("h1", vec![t("Title")]), el("h2", vec![t("Sub")])]
    );
    assert_eq!(blocks("#hashtag"), vec![el("p", vec![t("#hashtag")])]);
}

#[test]
fn paragraph_newlines_become_breaks() {
    assert_eq!(
        blocks("first line\nsecond line"),
        vec![el(
            "p",
            vec![t("first line"), el("br", vec![]), t("second line")]
        )]
    );

    let soft = ParseOptions {
        breaks: false,
        ..ParseOptions::default()
    };
    assert_eq!(
        parse_with("first line\nsecond line", &soft).children(),
        &[el("p", vec![t("first line\nsecond line")])]
    );
}

#[test]
fn fenced_code_keeps_content_and_language() {
    assert_eq!(
        blocks("```rust\nfn main() {}\n```"),
        vec![el(
            "pre",
            vec![with_attrs(
                "code",
                &[("class", "language-rust")],
                vec![t("fn main() {}\n")]
            )]
        )]
    );
    assert_eq!(
        blocks("```html\n<script>x</script>\n**not bold**\n```"),
        vec![el(
            "pre",
            vec![with_attrs(
                "code",
                &[("class", "language-html")],
                vec![t("<script>x</script>\n**not bold**\n")]
            )]
        )]
    );
}

#[test]
fn unclosed_fence_runs_to_the_end() {
    assert_eq!(
        blocks("```\nlet x = 1;"),
        vec![el("pre", vec![el("code", vec![t("let x = 1;\n")])])]
    );
}

#[test]
fn nested_bullet_list_is_tight() {
    assert_eq!(
        blocks("- one\n- two\n  - nested\n- three"),
        vec![el(
            "ul",
            vec![
                el("li", vec![t("one")]),
                el("li", vec![t("two"), el("ul", vec![el("li", vec![t("nested")])])]),
                el("li", vec![t("three")]),
            ]
        )]
    );
}

#[test]
fn ordered_list_keeps_its_start_number() {
    assert_eq!(
        blocks("3. a\n4. b"),
        vec![with_attrs(
            "ol",
            &[("start", "3")],
            vec![el("li", vec![t("a")]), el("li", vec![t("b")])]
        )]
    );
    assert_eq!(
        blocks("1. first\n2. second"),
        vec![el(
            "ol",
            vec![el("li", vec![t("first")]), el("li", vec![t("second")])]
        )]
    );
}

#[test]
fn blank_lines_between_items_make_a_loose_list() {
    assert_eq!(
        blocks("- a\n\n- b"),
        vec![el(
            "ul",
            vec![
                el("li", vec![el("p", vec![t("a")])]),
                el("li", vec![el("p", vec![t("b")])]),
            ]
        )]
    );
}

#[test]
fn changing_the_bullet_starts_a_new_list() {
    assert_eq!(
        blocks("- a\n+ b"),
        vec![
            el("ul", vec![el("li", vec![t("a")])]),
            el("ul", vec![el("li", vec![t("b")])]),
        ]
    );
}

#[test]
fn blockquote_with_lazy_continuation() {
    assert_eq!(
        blocks("> quoted\n> more\nlazy"),
        vec![el(
            "blockquote",
            vec![el(
                "p",
                vec![
                    t("quoted"),
                    el("br", vec![]),
                    t("more"),
                    el("br", vec![]),
                    t("lazy"),
                ]
            )]
        )]
    );
}

#[test]
fn thematic_breaks_separate_paragraphs() {
    assert_eq!(
        blocks("a\n\n***\n\nb"),
        vec![el("p", vec![t("a")]), el("hr", vec![]), el("p", vec![t("b")])]
    );
}

#[test]
fn mixed_document() {
    let root = parse("## Plan\n\n1. Read `config.toml`\n2. Run **tests**\n\n> Done.");
    assert_eq!(
        root.children(),
        &[
            el("h2", vec![t("Plan")]),
            el(
                "ol",
                vec![
                    el("li", vec![t("Read "), el("code", vec![t("config.toml")])]),
                    el("li", vec![t("Run "), el("strong", vec![t("tests")])]),
                ]
            ),
            el("blockquote", vec![el("p", vec![t("Done.")])]),
        ]
    );
}

#[test]
fn inline_markup_inside_paragraphs_is_kept_for_the_sanitizer() {
    assert_eq!(
        blocks("hello <script>alert(1)</script>"),
        vec![el(
            "p",
            vec![t("hello "), el("script", vec![t("alert(1)")])]
        )]
    );
}

#[test]
fn raw_text_blocks_span_blank_lines() {
    assert_eq!(
        blocks("**x**\n\n<script>\n\nalert(1)\n\n</script>\nafter"),
        vec![
            el("p", vec![el("strong", vec![t("x")])]),
            el("script", vec![t("\n\nalert(1)\n\n")]),
            el("p", vec![t("after")]),
        ]
    );
    assert_eq!(
        blocks("text\n<STYLE>\n\na{}\n</style>"),
        vec![
            el("p", vec![t("text")]),
            el("style", vec![t("\n\na{}\n")]),
        ]
    );
}

#[test]
fn container_blocks_track_nested_close_tags() {
    let out = blocks("<template>\n\n<template>a</template>\n\nb\n\n</template>\nz");
    assert_eq!(out.len(), 2);
    assert_eq!(out[0].tag(), Some("template"));
    assert!(out[0].text_content().contains('b'));
    assert_eq!(out[1], el("p", vec![t("z")]));

    assert_eq!(
        blocks("<template/>\n\nnext"),
        vec![el("template", vec![]), el("p", vec![t("next")])]
    );
}

#[test]
fn line_endings_and_nul_are_normalized() {
    assert_eq!(
        blocks("# a\r\nb"),
        vec![el("h1", vec![t("a")]), el("p", vec![t("b")])]
    );
    assert_eq!(blocks("a\0b"), vec![el("p", vec![t("a\u{FFFD}b")])]);
}

#[test]
fn empty_and_blank_input_produce_an_empty_root() {
    assert!(blocks("").is_empty());
    assert!(blocks(" \n\t\n").is_empty());
}

#[test]
fn nesting_limit_degrades_to_text() {
    let options = ParseOptions {
        breaks: true,
        max_nesting: 2,
    };
    assert_eq!(
        parse_with("> > > deep", &options).children(),
        &[el("blockquote", vec![el("blockquote", vec![t("> deep")])])]
    );
}

#[test]
fn deep_input_never_exceeds_the_nesting_limit() {
    let options = ParseOptions::default();
    let inputs = [
        format!("{}x", "> ".repeat(500)),
        format!("{}x{}", "*a ".repeat(200), " a*".repeat(200)),
        (0..200)
            .map(|i| format!("{}- item", "  ".repeat(i)))
            .collect::<Vec<_>>()
            .join("\n"),
        format!("{}x", "<span>".repeat(500)),
        format!("{}x{}", "[".repeat(300), "](y)".repeat(300)),
    ];
    for input in &inputs {
        let root = parse_with(input, &options);
        // The root itself counts as depth 0.
        assert!(
            element_depth(&root) <= options.max_nesting + 1,
            "depth {} for input starting {:?}",
            element_depth(&root),
            &input[..20]
        );
    }
}

#[test]
fn options_read_from_config() {
    let cfg = RenderConfig::from_value(json!({ "breaks": false, "maxNesting": 4 }));
    assert_eq!(
        ParseOptions::from_config(&cfg).unwrap(),
        ParseOptions {
            breaks: false,
            max_nesting: 4
        }
    );
    assert_eq!(
        ParseOptions::from_config(&RenderConfig::default()).unwrap(),
        ParseOptions::default()
    );
    let bad = RenderConfig::from_value(json!({ "maxNesting": "deep" }));
    assert!(ParseOptions::from_config(&bad).is_err());
}
