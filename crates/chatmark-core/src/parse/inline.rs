//! Inline constructs: code spans, emphasis, strikethrough, links, images, autolinks, bare URLs,
//! tag-like fragments and line breaks.

use super::ParseOptions;
use super::tags;
use crate::tree::{Attributes, DocumentNode, is_void_tag};
use regex::Regex;
use rustc_hash::FxHashMap;
use std::sync::OnceLock;

/// Maximum parenthesis nesting inside a link destination.
const MAX_DESTINATION_PARENS: usize = 32;

fn autolink_uri_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^<([A-Za-z][A-Za-z0-9+.\-]{1,31}:[^\s<>[:cntrl:]]*)>").expect("valid regex")
    })
}

fn autolink_email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^<([A-Za-z0-9.!#$%&'*+/=?^_`{|}~\-]+@[A-Za-z0-9](?:[A-Za-z0-9\-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9\-]{0,61}[A-Za-z0-9])?)*)>",
        )
        .expect("valid regex")
    })
}

fn bare_url_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(?:https?://|www\.)[^\s<>[:cntrl:]]+").expect("valid regex"))
}

/// Parses inline content whose parent element sits at `depth`.
pub fn parse_inline(text: &str, depth: usize, options: &ParseOptions) -> Vec<DocumentNode> {
    InlineParser::new(text, depth, options, false).run()
}

fn is_special(b: u8) -> bool {
    matches!(
        b,
        b'\\' | b'`' | b'*' | b'_' | b'~' | b'!' | b'[' | b'<' | b'\n' | b'h' | b'w'
    )
}

struct InlineParser<'a> {
    src: &'a str,
    pos: usize,
    depth: usize,
    in_link: bool,
    options: &'a ParseOptions,
    out: Vec<DocumentNode>,
    text: String,
    /// Matching `]` for every balanced `[`.
    brackets: FxHashMap<usize, usize>,
    /// Backtick run length -> smallest opener position known to have no closer.
    unmatched_code: FxHashMap<usize, usize>,
    /// (delimiter, run length) -> smallest opener position known to have no closer.
    unmatched_delims: FxHashMap<(u8, usize), usize>,
    /// Link title closing byte -> smallest offset known to have no closer at or after it.
    unclosed_titles: FxHashMap<u8, usize>,
}

impl<'a> InlineParser<'a> {
    fn new(src: &'a str, depth: usize, options: &'a ParseOptions, in_link: bool) -> Self {
        Self {
            src,
            pos: 0,
            depth,
            in_link,
            options,
            out: Vec::new(),
            text: String::new(),
            brackets: match_brackets(src),
            unmatched_code: FxHashMap::default(),
            unmatched_delims: FxHashMap::default(),
            unclosed_titles: FxHashMap::default(),
        }
    }

    fn run(mut self) -> Vec<DocumentNode> {
        let src = self.src;
        let bytes = src.as_bytes();
        while self.pos < bytes.len() {
            let b = bytes[self.pos];
            match b {
                b'\\' => self.backslash(),
                b'`' => self.code_span(),
                b'*' | b'_' => self.emphasis(b),
                b'~' => self.strikethrough(),
                b'!' if bytes.get(self.pos + 1) == Some(&b'[') => self.image(),
                b'[' => self.link(),
                b'<' => self.angle(),
                b'\n' => self.line_break(),
                b'h' | b'w' if self.bare_url() => {}
                _ => {
                    let end = bytes[self.pos + 1..]
                        .iter()
                        .position(|&b| is_special(b))
                        .map_or(bytes.len(), |off| self.pos + 1 + off);
                    self.text.push_str(&src[self.pos..end]);
                    self.pos = end;
                }
            }
        }
        self.flush();
        self.out
    }

    fn can_nest(&self, levels: usize) -> bool {
        self.depth + levels <= self.options.max_nesting
    }

    fn nested(&self, text: &str, depth: usize, in_link: bool) -> Vec<DocumentNode> {
        InlineParser::new(text, depth, self.options, in_link).run()
    }

    fn flush(&mut self) {
        if !self.text.is_empty() {
            self.out
                .push(DocumentNode::text(std::mem::take(&mut self.text)));
        }
    }

    fn push_node(&mut self, node: DocumentNode) {
        self.flush();
        self.out.push(node);
    }

    fn literal(&mut self, len: usize) {
        let end = (self.pos + len).min(self.src.len());
        self.text.push_str(&self.src[self.pos..end]);
        self.pos = end;
    }

    fn run_length(&self, b: u8) -> usize {
        self.src.as_bytes()[self.pos..]
            .iter()
            .take_while(|&&c| c == b)
            .count()
    }

    fn prev_char(&self) -> Option<char> {
        self.src[..self.pos].chars().next_back()
    }

    fn backslash(&mut self) {
        match self.src.as_bytes().get(self.pos + 1) {
            Some(&b'\n') => {
                self.hard_break();
                self.pos += 2;
            }
            Some(&c) if c.is_ascii_punctuation() => {
                self.text.push(char::from(c));
                self.pos += 2;
            }
            _ => self.literal(1),
        }
    }

    fn hard_break(&mut self) {
        if self.can_nest(1) {
            self.push_node(DocumentNode::element("br", Vec::new()));
        } else {
            self.text.push('\n');
        }
    }

    fn line_break(&mut self) {
        let kept = self.text.trim_end_matches(' ').len();
        let trailing = self.text.len() - kept;
        self.text.truncate(kept);
        if self.options.breaks || trailing >= 2 {
            self.hard_break();
        } else {
            self.text.push('\n');
        }
        self.pos += 1;
        let bytes = self.src.as_bytes();
        while self.pos < bytes.len() && matches!(bytes[self.pos], b' ' | b'\t') {
            self.pos += 1;
        }
    }

    fn code_span(&mut self) {
        let run = self.run_length(b'`');
        let open = self.pos;
        let known_unmatched = self
            .unmatched_code
            .get(&run)
            .is_some_and(|&fail| open >= fail);

        let closer = if known_unmatched {
            None
        } else {
            find_backtick_run(self.src, open + run, run)
        };
        let Some(close) = closer else {
            let fail = self.unmatched_code.entry(run).or_insert(open);
            *fail = (*fail).min(open);
            self.literal(run);
            return;
        };

        if !self.can_nest(1) {
            self.literal(close + run - open);
            return;
        }

        let mut content = self.src[open + run..close].replace('\n', " ");
        if content.len() >= 2
            && content.starts_with(' ')
            && content.ends_with(' ')
            && !content.bytes().all(|b| b == b' ')
        {
            content = content[1..content.len() - 1].to_string();
        }
        let children = if content.is_empty() {
            Vec::new()
        } else {
            vec![DocumentNode::text(content)]
        };
        self.push_node(DocumentNode::element("code", children));
        self.pos = close + run;
    }

    fn emphasis(&mut self, delim: u8) {
        let run = self.run_length(delim);
        if delim == b'_' && self.prev_char().is_some_and(char::is_alphanumeric) {
            self.literal(run);
            return;
        }
        if run > 3 {
            self.literal(run);
            return;
        }
        let levels = if run == 3 { 2 } else { 1 };
        let Some((inner, end)) = self.delimited(delim, run, levels) else {
            self.literal(run);
            return;
        };

        let children = self.nested(inner, self.depth + levels, self.in_link);
        let node = match run {
            1 => DocumentNode::element("em", children),
            2 => DocumentNode::element("strong", children),
            _ => DocumentNode::element("em", vec![DocumentNode::element("strong", children)]),
        };
        self.push_node(node);
        self.pos = end;
    }

    fn strikethrough(&mut self) {
        let run = self.run_length(b'~');
        if run != 2 {
            self.literal(run);
            return;
        }
        let Some((inner, end)) = self.delimited(b'~', run, 1) else {
            self.literal(run);
            return;
        };
        let children = self.nested(inner, self.depth + 1, self.in_link);
        self.push_node(DocumentNode::element("del", children));
        self.pos = end;
    }

    /// Content and end offset of a `delim`-run span opening at the current position.
    fn delimited(&mut self, delim: u8, run: usize, levels: usize) -> Option<(&'a str, usize)> {
        let src = self.src;
        let open = self.pos;
        let content_start = open + run;
        let first = src[content_start..].chars().next()?;
        if first.is_whitespace() || !self.can_nest(levels) {
            return None;
        }
        if self
            .unmatched_delims
            .get(&(delim, run))
            .is_some_and(|&fail| open >= fail)
        {
            return None;
        }

        match find_delimiter_closer(src, content_start + first.len_utf8(), delim, run) {
            Some(close) => Some((&src[content_start..close], close + run)),
            None => {
                let fail = self.unmatched_delims.entry((delim, run)).or_insert(open);
                *fail = (*fail).min(open);
                None
            }
        }
    }

    fn link(&mut self) {
        let open = self.pos;
        let Some((close, destination, title, end)) = self.link_parts(open) else {
            self.literal(1);
            return;
        };
        if self.in_link || !self.can_nest(1) {
            self.literal(1);
            return;
        }

        let mut attrs = Attributes::new();
        attrs.insert("href".to_string(), destination);
        if let Some(title) = title {
            attrs.insert("title".to_string(), title);
        }
        let children = self.nested(&self.src[open + 1..close], self.depth + 1, true);
        self.push_node(DocumentNode::element_with_attrs("a", attrs, children));
        self.pos = end;
    }

    fn image(&mut self) {
        let open = self.pos + 1;
        let Some((close, source, title, end)) = self.link_parts(open) else {
            self.literal(1);
            return;
        };
        if !self.can_nest(1) {
            self.literal(1);
            return;
        }

        let alt_nodes = self.nested(&self.src[open + 1..close], self.depth + 1, true);
        let alt: String = alt_nodes.iter().map(DocumentNode::text_content).collect();

        let mut attrs = Attributes::new();
        attrs.insert("src".to_string(), source);
        attrs.insert("alt".to_string(), alt);
        if let Some(title) = title {
            attrs.insert("title".to_string(), title);
        }
        self.push_node(DocumentNode::element_with_attrs("img", attrs, Vec::new()));
        self.pos = end;
    }

    /// `[label](destination "title")` starting at `open`: closing bracket offset, destination,
    /// title and end offset.
    fn link_parts(&mut self, open: usize) -> Option<(usize, String, Option<String>, usize)> {
        let close = *self.brackets.get(&open)?;
        if self.src.as_bytes().get(close + 1) != Some(&b'(') {
            return None;
        }
        let (destination, title, end) =
            parse_link_tail(self.src, close + 2, &mut self.unclosed_titles)?;
        Some((close, destination, title, end))
    }

    fn angle(&mut self) {
        let src = self.src;
        let rest = &src[self.pos..];

        if !self.in_link && self.can_nest(1) {
            if let Some(caps) = autolink_uri_regex().captures(rest) {
                let uri = caps[1].to_string();
                let len = caps[0].len();
                self.push_autolink(uri.clone(), uri);
                self.pos += len;
                return;
            }
            if let Some(caps) = autolink_email_regex().captures(rest) {
                let address = caps[1].to_string();
                let len = caps[0].len();
                self.push_autolink(format!("mailto:{address}"), address);
                self.pos += len;
                return;
            }
        }

        if self.can_nest(1)
            && let Some(tag) = tags::parse_open_tag(self.src, self.pos)
        {
            self.tag_fragment(tag);
            return;
        }

        self.literal(1);
    }

    fn push_autolink(&mut self, href: String, text: String) {
        let mut attrs = Attributes::new();
        attrs.insert("href".to_string(), href);
        self.push_node(DocumentNode::element_with_attrs(
            "a",
            attrs,
            vec![DocumentNode::text(text)],
        ));
    }

    fn tag_fragment(&mut self, tag: tags::OpenTag) {
        let tags::OpenTag {
            name,
            attributes,
            self_closing,
            end,
        } = tag;

        let children = if self_closing || is_void_tag(&name) {
            self.pos = end;
            Vec::new()
        } else if tags::is_raw_text(&name) {
            let content_end = match tags::find_raw_close(self.src, end, &name) {
                Some((close_start, close_end)) => {
                    self.pos = close_end;
                    close_start
                }
                None => {
                    self.pos = self.src.len();
                    self.src.len()
                }
            };
            let content = &self.src[end..content_end];
            if content.is_empty() {
                Vec::new()
            } else {
                vec![DocumentNode::text(content)]
            }
        } else {
            // An unclosed element extends to the end of the inline run.
            let content_end = match tags::find_matching_close(self.src, end, &name) {
                Some((close_start, close_end)) => {
                    self.pos = close_end;
                    close_start
                }
                None => {
                    self.pos = self.src.len();
                    self.src.len()
                }
            };
            self.nested(&self.src[end..content_end], self.depth + 1, self.in_link)
        };

        self.push_node(DocumentNode::element_with_attrs(name, attributes, children));
    }

    /// GFM-style bare URL (`https://...`, `www....`) at a word start. Returns whether one was
    /// consumed.
    fn bare_url(&mut self) -> bool {
        if self.in_link || !self.can_nest(1) {
            return false;
        }
        if self
            .prev_char()
            .is_some_and(|c| !(c.is_whitespace() || matches!(c, '*' | '_' | '~' | '(' | '"' | '\'')))
        {
            return false;
        }
        let Some(found) = bare_url_regex().find(&self.src[self.pos..]) else {
            return false;
        };
        let url = trim_url_tail(found.as_str());
        if url.ends_with("://") || url.ends_with("www.") {
            return false;
        }

        let href = if url.starts_with("www.") {
            format!("http://{url}")
        } else {
            url.to_string()
        };
        let len = url.len();
        self.push_autolink(href, url.to_string());
        self.pos += len;
        true
    }
}

/// Drops trailing punctuation and unbalanced closing parentheses from a bare URL.
fn trim_url_tail(url: &str) -> &str {
    let mut url = url;
    loop {
        let trimmed = url.trim_end_matches(['.', ',', ':', ';', '!', '?', '*', '_', '~', '\'', '"']);
        let trimmed = if trimmed.ends_with(')')
            && trimmed.matches(')').count() > trimmed.matches('(').count()
        {
            &trimmed[..trimmed.len() - 1]
        } else {
            trimmed
        };
        if trimmed.len() == url.len() {
            return url;
        }
        url = trimmed;
    }
}

/// Pairs brackets in one pass, skipping backslash-escaped ones.
fn match_brackets(src: &str) -> FxHashMap<usize, usize> {
    let bytes = src.as_bytes();
    let mut pairs = FxHashMap::default();
    let mut stack = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => {
                i += 2;
                continue;
            }
            b'[' => stack.push(i),
            b']' => {
                if let Some(open) = stack.pop() {
                    pairs.insert(open, i);
                }
            }
            _ => {}
        }
        i += 1;
    }
    pairs
}

/// Offset of the next backtick run of exactly `len` at or after `from`.
fn find_backtick_run(src: &str, from: usize, len: usize) -> Option<usize> {
    let bytes = src.as_bytes();
    let mut i = from;
    while i < bytes.len() {
        if bytes[i] != b'`' {
            i += 1;
            continue;
        }
        let run = bytes[i..].iter().take_while(|&&b| b == b'`').count();
        if run == len {
            return Some(i);
        }
        i += run;
    }
    None
}

/// Offset of a closing delimiter run of exactly `len` at or after `from`: not preceded by
/// whitespace and, for `_`, not followed by an alphanumeric character.
fn find_delimiter_closer(src: &str, from: usize, delim: u8, len: usize) -> Option<usize> {
    let bytes = src.as_bytes();
    let mut i = from;
    while i < bytes.len() {
        if bytes[i] != delim {
            i += 1;
            continue;
        }
        let run = bytes[i..].iter().take_while(|&&b| b == delim).count();
        let preceded_by_space = src[..i].chars().next_back().is_none_or(char::is_whitespace);
        let followed_by_word = src[i + run..]
            .chars()
            .next()
            .is_some_and(char::is_alphanumeric);
        let preceded_by_escape = i > 0 && bytes[i - 1] == b'\\';
        if run == len
            && !preceded_by_space
            && !preceded_by_escape
            && !(delim == b'_' && followed_by_word)
        {
            return Some(i);
        }
        i += run;
    }
    None
}

/// Parses `destination "title")` starting just after `(`. Returns the unescaped destination,
/// title and the offset after `)`.
///
/// `unclosed_titles` remembers, per closing byte, where a title scan already ran off the end of
/// `src`, so repeated unterminated titles are rejected without rescanning.
fn parse_link_tail(
    src: &str,
    start: usize,
    unclosed_titles: &mut FxHashMap<u8, usize>,
) -> Option<(String, Option<String>, usize)> {
    let bytes = src.as_bytes();
    let skip_space = |mut i: usize| {
        while i < bytes.len() && matches!(bytes[i], b' ' | b'\t' | b'\n') {
            i += 1;
        }
        i
    };

    let mut i = skip_space(start);
    let destination = if bytes.get(i) == Some(&b'<') {
        let close = src[i + 1..].find(['>', '\n', '<'])? + i + 1;
        if bytes[close] != b'>' {
            return None;
        }
        let dest = &src[i + 1..close];
        i = close + 1;
        dest
    } else {
        let begin = i;
        let mut parens = 0usize;
        while i < bytes.len() {
            let b = bytes[i];
            if b == b'\\' && bytes.get(i + 1).is_some_and(u8::is_ascii_punctuation) {
                i += 2;
                continue;
            }
            if b.is_ascii_whitespace() || b.is_ascii_control() {
                break;
            }
            if b == b'(' {
                parens += 1;
                if parens > MAX_DESTINATION_PARENS {
                    return None;
                }
            } else if b == b')' {
                if parens == 0 {
                    break;
                }
                parens -= 1;
            }
            i += 1;
        }
        if parens != 0 {
            return None;
        }
        &src[begin..i]
    };

    let before_title = i;
    i = skip_space(i);
    let mut title = None;
    if i > before_title
        && let Some(&quote) = bytes.get(i)
        && matches!(quote, b'"' | b'\'' | b'(')
    {
        let closing = if quote == b'(' { b')' } else { quote };
        if unclosed_titles
            .get(&closing)
            .is_some_and(|&from| i + 1 >= from)
        {
            return None;
        }
        let mut j = i + 1;
        while j < bytes.len() && bytes[j] != closing {
            if bytes[j] == b'\\' {
                j += 1;
            }
            j += 1;
        }
        if j >= bytes.len() {
            let from = unclosed_titles.entry(closing).or_insert(i + 1);
            *from = (*from).min(i + 1);
            return None;
        }
        title = Some(unescape(&src[i + 1..j]));
        i = skip_space(j + 1);
    }

    if bytes.get(i) != Some(&b')') {
        return None;
    }
    Some((unescape(destination), title, i + 1))
}

/// Resolves backslash escapes of ASCII punctuation.
fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == '\\'
            && let Some(&next) = chars.peek()
            && next.is_ascii_punctuation()
        {
            out.push(next);
            chars.next();
            continue;
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inline(text: &str) -> Vec<DocumentNode> {
        parse_inline(text, 1, &ParseOptions::default())
    }

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

    #[test]
    fn strong_and_emphasis_are_joined_by_plain_text() {
        assert_eq!(
            inline("**bold** and *italic*"),
            vec![
                el("strong", vec![t("bold")]),
                t(" and "),
                el("em", vec![t("italic")]),
            ]
        );
    }

    #[test]
    fn emphasis_nests_and_triple_delimiters_combine() {
        assert_eq!(
            inline("*a **b** c*"),
            vec![el(
                "em",
                vec![t("a "), el("strong", vec![t("b")]), t(" c")]
            )]
        );
        assert_eq!(
            inline("***both***"),
            vec![el("em", vec![el("strong", vec![t("both")])])]
        );
        assert_eq!(inline("__strong__ _em_"), vec![
            el("strong", vec![t("strong")]),
            t(" "),
            el("em", vec![t("em")]),
        ]);
    }

    #[test]
    fn unmatched_or_intraword_delimiters_stay_literal() {
        assert_eq!(inline("2 * 3 * 4"), vec![t("2 * 3 * 4")]);
        assert_eq!(inline("snake_case_name"), vec![t("snake_case_name")]);
        assert_eq!(inline("**open"), vec![t("**open")]);
        assert_eq!(inline("* not em*"), vec![t("* not em*")]);
    }

    #[test]
    fn code_spans_keep_content_verbatim() {
        assert_eq!(
            inline("`console.log(1)`"),
            vec![el("code", vec![t("console.log(1)")])]
        );
        assert_eq!(
            inline("`` a `*b*` ``"),
            vec![el("code", vec![t("a `*b*`")])]
        );
        assert_eq!(inline("`<b>x</b>`"), vec![el("code", vec![t("<b>x</b>")])]);
        assert_eq!(inline("``open"), vec![t("``open")]);
    }

    #[test]
    fn strikethrough_uses_double_tildes() {
        assert_eq!(
            inline("~~gone~~ ~kept~"),
            vec![el("del", vec![t("gone")]), t(" ~kept~")]
        );
    }

    #[test]
    fn links_capture_target_and_title_as_opaque_strings() {
        assert_eq!(
            inline(r#"see [the *docs*](https://example.com/a_(b) "Docs") now"#),
            vec![
                t("see "),
                with_attrs(
                    "a",
                    &[("href", "https://example.com/a_(b)"), ("title", "Docs")],
                    vec![t("the "), el("em", vec![t("docs")])]
                ),
                t(" now"),
            ]
        );
        assert_eq!(
            inline("[x](<a b>)"),
            vec![with_attrs("a", &[("href", "a b")], vec![t("x")])]
        );
        assert_eq!(inline("[x] (y)"), vec![t("[x] (y)")]);
        assert_eq!(inline("[x](y"), vec![t("[x](y")]);
    }

    #[test]
    fn links_do_not_nest() {
        assert_eq!(
            inline("[a [b](c) d](e)"),
            vec![with_attrs("a", &[("href", "e")], vec![t("a [b](c) d")])]
        );
    }

    #[test]
    fn images_flatten_alt_text() {
        assert_eq!(
            inline(r#"![a *cat*](cat.png "Cat")"#),
            vec![with_attrs(
                "img",
                &[("src", "cat.png"), ("alt", "a cat"), ("title", "Cat")],
                vec![]
            )]
        );
        assert_eq!(inline("wow!"), vec![t("wow!")]);
    }

    #[test]
    fn autolinks_and_bare_urls_become_links() {
        assert_eq!(
            inline("<https://a.example/x> and <me@example.com>"),
            vec![
                with_attrs("a", &[("href", "https://a.example/x")], vec![t("https://a.example/x")]),
                t(" and "),
                with_attrs("a", &[("href", "mailto:me@example.com")], vec![t("me@example.com")]),
            ]
        );
        assert_eq!(
            inline("visit https://example.com/path. or www.example.org!"),
            vec![
                t("visit "),
                with_attrs("a", &[("href", "https://example.com/path")], vec![t("https://example.com/path")]),
                t(". or "),
                with_attrs("a", &[("href", "http://www.example.org")], vec![t("www.example.org")]),
                t("!"),
            ]
        );
        assert_eq!(inline("show http:// here"), vec![t("show http:// here")]);
        assert_eq!(inline("awww.x"), vec![t("awww.x")]);
    }

    #[test]
    fn tag_fragments_become_elements_for_the_sanitizer() {
        assert_eq!(
            inline(r#"x <b onclick="go()">bold</b> y"#),
            vec![
                t("x "),
                with_attrs("b", &[("onclick", "go()")], vec![t("bold")]),
                t(" y"),
            ]
        );
        assert_eq!(
            inline("<script>alert('<b>')</script>after"),
            vec![el("script", vec![t("alert('<b>')")]), t("after")]
        );
        assert_eq!(
            inline("a <span>unclosed *em*"),
            vec![
                t("a "),
                el("span", vec![t("unclosed "), el("em", vec![t("em")])]),
            ]
        );
        assert_eq!(
            inline("1 < 2 and </b> stray"),
            vec![t("1 < 2 and </b> stray")]
        );
        assert_eq!(
            inline(r#"<img src="x" onerror="alert(1)">"#),
            vec![with_attrs("img", &[("src", "x"), ("onerror", "alert(1)")], vec![])]
        );
    }

    #[test]
    fn backslash_escapes_suppress_constructs() {
        assert_eq!(inline(r"\*not\* \`code\`"), vec![t("*not* `code`")]);
        assert_eq!(inline(r"C:\path"), vec![t(r"C:\path")]);
    }

    #[test]
    fn newlines_follow_the_breaks_option() {
        assert_eq!(
            inline("one\ntwo"),
            vec![t("one"), el("br", vec![]), t("two")]
        );

        let soft = ParseOptions {
            breaks: false,
            ..ParseOptions::default()
        };
        assert_eq!(parse_inline("one\n  two", 1, &soft), vec![t("one\ntwo")]);
        assert_eq!(
            parse_inline("one  \ntwo", 1, &soft),
            vec![t("one"), el("br", vec![]), t("two")]
        );
        assert_eq!(
            parse_inline("one\\\ntwo", 1, &soft),
            vec![t("one"), el("br", vec![]), t("two")]
        );
    }

    #[test]
    fn nesting_beyond_the_limit_stays_literal() {
        let options = ParseOptions {
            breaks: true,
            max_nesting: 2,
        };
        assert_eq!(
            parse_inline("*a*", 2, &options),
            vec![t("*a*")]
        );
        assert_eq!(
            parse_inline("**a *b* c**", 1, &options),
            vec![el("strong", vec![t("a *b* c")])]
        );
    }

    #[test]
    fn pathological_runs_finish() {
        let stars = "*".repeat(20_000);
        assert_eq!(inline(&stars), vec![t(&stars)]);
        let openers = "*a ".repeat(20_000);
        assert_eq!(inline(&openers).len(), 1);
        let brackets = "[".repeat(20_000);
        assert_eq!(inline(&brackets), vec![t(&brackets)]);
        let ticks = "` ``".repeat(5_000);
        assert!(!inline(&ticks).is_empty());
        let titles = format!("**b** {}", "[a](x (".repeat(35_000));
        assert_eq!(inline(&titles)[0], el("strong", vec![t("b")]));
        assert_eq!(inline(&titles).len(), 2);
    }

    #[test]
    fn unterminated_titles_leave_the_link_literal() {
        assert_eq!(inline("[a](x (t"), vec![t("[a](x (t")]);
        assert_eq!(
            inline("[a](x (t [b](y \"u\")"),
            vec![
                t("[a](x (t "),
                with_attrs("a", &[("href", "y"), ("title", "u")], vec![t("b")]),
            ]
        );
    }
}
