//! Recognition of tag-like fragments (`<name attr="v">`, `</name>`) inside inline text.
//!
//! The parser turns well-formed fragments into elements so that the sanitizer decides what
//! survives; malformed ones stay literal text.

use crate::tree::Attributes;

/// Upper bound on the byte length of a single open tag.
const MAX_TAG_LEN: usize = 8 * 1024;

/// Elements whose content is captured verbatim as one text leaf.
const RAW_TEXT_TAGS: &[&str] = &[
    "script", "style", "textarea", "title", "xmp", "iframe", "noembed", "noframes", "noscript",
];

/// Non-raw containers that, like raw-text elements, claim every line up to their close tag
/// when they open a block.
const BLOCK_CONTAINER_TAGS: &[&str] = &["object", "applet", "template", "frameset"];

pub(super) fn is_raw_text(name: &str) -> bool {
    RAW_TEXT_TAGS.contains(&name)
}

/// Lowercased name of a raw-text or container element opened at the start of `text`.
pub(super) fn html_block_name(text: &str) -> Option<String> {
    let rest = text.strip_prefix('<')?;
    let len = rest
        .bytes()
        .take_while(|b| b.is_ascii_alphanumeric() || *b == b'-')
        .count();
    let after = rest.as_bytes().get(len);
    if after.is_some_and(|&b| !(is_space(b) || b == b'>' || b == b'/')) {
        return None;
    }
    let name = rest[..len].to_ascii_lowercase();
    (is_raw_text(&name) || BLOCK_CONTAINER_TAGS.contains(&name.as_str())).then_some(name)
}

/// Counts `<name` openings and `</name` closings in `line` (ASCII case-insensitive).
pub(super) fn count_tag_marks(line: &str, name: &str) -> (usize, usize) {
    let lower = line.to_ascii_lowercase();
    let bytes = lower.as_bytes();
    let is_boundary = |at: usize| {
        bytes
            .get(at)
            .is_none_or(|&b| !(b.is_ascii_alphanumeric() || b == b'-'))
    };

    let (mut opens, mut closes) = (0, 0);
    for (at, _) in lower.match_indices('<') {
        let rest = &lower[at + 1..];
        if let Some(closing) = rest.strip_prefix('/') {
            if closing.starts_with(name) && is_boundary(at + 2 + name.len()) {
                closes += 1;
            }
        } else if rest.starts_with(name) && is_boundary(at + 1 + name.len()) {
            opens += 1;
        }
    }
    (opens, closes)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct OpenTag {
    pub name: String,
    pub attributes: Attributes,
    pub self_closing: bool,
    /// Byte offset just past the closing `>`.
    pub end: usize,
}

fn is_space(b: u8) -> bool {
    b.is_ascii_whitespace()
}

/// Parses an open tag starting at `pos` (which must point at `<`).
pub(super) fn parse_open_tag(src: &str, pos: usize) -> Option<OpenTag> {
    let bytes = src.as_bytes();
    let limit = bytes.len().min(pos.saturating_add(MAX_TAG_LEN));
    if bytes.get(pos) != Some(&b'<') {
        return None;
    }

    let mut i = pos + 1;
    if !bytes.get(i)?.is_ascii_alphabetic() {
        return None;
    }
    let name_start = i;
    while i < limit && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'-') {
        i += 1;
    }
    let name = src[name_start..i].to_ascii_lowercase();
    let mut attributes = Attributes::new();

    loop {
        let ws_start = i;
        while i < limit && is_space(bytes[i]) {
            i += 1;
        }
        if i >= limit {
            return None;
        }
        match bytes[i] {
            b'>' => {
                return Some(OpenTag {
                    name,
                    attributes,
                    self_closing: false,
                    end: i + 1,
                });
            }
            b'/' if bytes.get(i + 1) == Some(&b'>') => {
                return Some(OpenTag {
                    name,
                    attributes,
                    self_closing: true,
                    end: i + 2,
                });
            }
            _ => {}
        }
        if i == ws_start {
            return None;
        }

        let attr_start = i;
        if !(bytes[i].is_ascii_alphabetic() || matches!(bytes[i], b'_' | b':')) {
            return None;
        }
        while i < limit
            && (bytes[i].is_ascii_alphanumeric() || matches!(bytes[i], b'_' | b'.' | b':' | b'-'))
        {
            i += 1;
        }
        let attr_name = src[attr_start..i].to_ascii_lowercase();

        let mut j = i;
        while j < limit && is_space(bytes[j]) {
            j += 1;
        }
        let value = if j < limit && bytes[j] == b'=' {
            j += 1;
            while j < limit && is_space(bytes[j]) {
                j += 1;
            }
            if j >= limit {
                return None;
            }
            match bytes[j] {
                quote @ (b'"' | b'\'') => {
                    let close = bytes[j + 1..limit].iter().position(|&b| b == quote)? + j + 1;
                    i = close + 1;
                    &src[j + 1..close]
                }
                _ => {
                    let value_start = j;
                    while j < limit
                        && !is_space(bytes[j])
                        && !matches!(bytes[j], b'"' | b'\'' | b'=' | b'<' | b'>' | b'`')
                    {
                        j += 1;
                    }
                    // `limit` may split a multibyte character.
                    if j == value_start || j >= limit {
                        return None;
                    }
                    i = j;
                    &src[value_start..j]
                }
            }
        } else {
            ""
        };

        attributes
            .entry(attr_name)
            .or_insert_with(|| value.to_string());
    }
}

/// End offset of `</name>` (case-insensitive, optional whitespace) if it starts at `at`.
pub(super) fn close_tag_at(src: &str, at: usize, name: &str) -> Option<usize> {
    let rest = src.as_bytes().get(at..)?;
    if !rest.starts_with(b"</") {
        return None;
    }
    let candidate = rest.get(2..2 + name.len())?;
    if !candidate.eq_ignore_ascii_case(name.as_bytes()) {
        return None;
    }
    let mut k = 2 + name.len();
    while k < rest.len() && is_space(rest[k]) {
        k += 1;
    }
    (rest.get(k) == Some(&b'>')).then_some(at + k + 1)
}

/// Finds the close tag balancing an open `name` tag whose content starts at `from`.
/// Returns `(close_start, close_end)`.
pub(super) fn find_matching_close(src: &str, from: usize, name: &str) -> Option<(usize, usize)> {
    let mut depth = 1usize;
    let mut i = from;
    while let Some(offset) = src[i..].find('<') {
        let at = i + offset;
        if let Some(end) = close_tag_at(src, at, name) {
            depth -= 1;
            if depth == 0 {
                return Some((at, end));
            }
            i = end;
            continue;
        }
        if let Some(tag) = parse_open_tag(src, at) {
            if tag.self_closing {
                i = tag.end;
            } else if is_raw_text(&tag.name) {
                // A close tag inside raw text does not count.
                i = find_raw_close(src, tag.end, &tag.name).map_or(src.len(), |(_, end)| end);
            } else {
                if tag.name == name {
                    depth += 1;
                }
                i = tag.end;
            }
            continue;
        }
        i = at + 1;
    }
    None
}

/// Finds the first `</name>` after `from` without regard to nesting (raw text content).
pub(super) fn find_raw_close(src: &str, from: usize, name: &str) -> Option<(usize, usize)> {
    let mut i = from;
    while let Some(offset) = src[i..].find("</") {
        let at = i + offset;
        if let Some(end) = close_tag_at(src, at, name) {
            return Some((at, end));
        }
        i = at + 2;
    }
    None
}
