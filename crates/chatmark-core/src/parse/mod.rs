//! Lightweight markup parser.
//!
//! Builds a [`DocumentNode`] tree from the markup subset chat models tend to emit: paragraphs,
//! ATX/setext headings, fenced code, block quotes, nested lists, pipe tables, thematic breaks
//! and the inline constructs handled in [`inline`]. Parsing is total: anything that does not
//! match a construct stays literal text. Nothing is escaped here; encoding happens at output.

mod inline;
mod tags;

use crate::config::{DEFAULT_MAX_NESTING, RenderConfig};
use crate::tree::{Attributes, DocumentNode};
use crate::Result;

pub use inline::parse_inline;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    /// Treat every newline inside a paragraph as a hard line break.
    pub breaks: bool,
    /// Maximum element depth of the produced tree (the root is depth 0). Constructs that would
    /// nest deeper degrade to literal text.
    pub max_nesting: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            breaks: true,
            max_nesting: DEFAULT_MAX_NESTING,
        }
    }
}

impl ParseOptions {
    pub fn from_config(config: &RenderConfig) -> Result<Self> {
        Ok(Self {
            breaks: config.bool_or("breaks", true)?,
            max_nesting: config.max_nesting()?,
        })
    }
}

/// Parses `text` with default options.
pub fn parse(text: &str) -> DocumentNode {
    parse_with(text, &ParseOptions::default())
}

pub fn parse_with(text: &str, options: &ParseOptions) -> DocumentNode {
    let normalized = normalize(text);
    let lines: Vec<&str> = normalized.split('\n').collect();
    let parser = BlockParser { options };
    DocumentNode::root(parser.parse_blocks(&lines, 0))
}

/// Unifies line endings and replaces NUL with U+FFFD.
fn normalize(text: &str) -> String {
    text.replace("\r\n", "\n")
        .replace('\r', "\n")
        .replace('\0', "\u{FFFD}")
}

struct BlockParser<'a> {
    options: &'a ParseOptions,
}

impl BlockParser<'_> {
    /// Parses `lines` into block nodes whose parent element sits at `depth`.
    fn parse_blocks(&self, lines: &[&str], depth: usize) -> Vec<DocumentNode> {
        let mut out = Vec::new();
        let mut i = 0;
        while i < lines.len() {
            let line = lines[i];
            if is_blank(line) {
                i += 1;
                continue;
            }

            if let Some(fence) = open_fence(line) {
                i = self.fenced_code(lines, i, &fence, depth, &mut out);
                continue;
            }

            if let Some(name) = html_block_start(line) {
                i = self.html_block(lines, i, &name, depth, &mut out);
                continue;
            }

            if let Some((level, content)) = atx_heading(line) {
                out.extend(self.leaf_block(&format!("h{level}"), content, depth));
                i += 1;
                continue;
            }

            if is_thematic_break(line) {
                out.push(self.void_block("hr", line, depth));
                i += 1;
                continue;
            }

            if depth < self.options.max_nesting && blockquote_content(line).is_some() {
                i = self.blockquote(lines, i, depth, &mut out);
                continue;
            }

            if depth + 2 <= self.options.max_nesting
                && let Some(marker) = list_marker(line)
            {
                i = self.list(lines, i, marker, depth, &mut out);
                continue;
            }

            if depth + 4 <= self.options.max_nesting
                && let Some(next) = self.table(lines, i, depth, &mut out)
            {
                i = next;
                continue;
            }

            i = self.paragraph(lines, i, depth, &mut out);
        }
        out
    }

    /// An element holding inline content, or bare inline nodes when there is no room left.
    fn leaf_block(&self, tag: &str, content: &str, depth: usize) -> Vec<DocumentNode> {
        if depth >= self.options.max_nesting {
            return parse_inline(content, depth, self.options);
        }
        let children = parse_inline(content, depth + 1, self.options);
        vec![DocumentNode::element(tag, children)]
    }

    fn void_block(&self, tag: &str, source: &str, depth: usize) -> DocumentNode {
        if depth >= self.options.max_nesting {
            return DocumentNode::text(source.trim());
        }
        DocumentNode::element(tag, Vec::new())
    }

    fn fenced_code(
        &self,
        lines: &[&str],
        start: usize,
        fence: &Fence<'_>,
        depth: usize,
        out: &mut Vec<DocumentNode>,
    ) -> usize {
        let mut body: Vec<&str> = Vec::new();
        let mut i = start + 1;
        let mut closed = false;
        while i < lines.len() {
            if fence.is_closed_by(lines[i]) {
                closed = true;
                break;
            }
            body.push(strip_indent(lines[i], fence.indent));
            i += 1;
        }

        let mut code = body.join("\n");
        if !body.is_empty() {
            code.push('\n');
        }

        if depth + 2 <= self.options.max_nesting {
            let mut attrs = Attributes::new();
            if let Some(lang) = fence.info.split_whitespace().next() {
                attrs.insert("class".to_string(), format!("language-{lang}"));
            }
            let children = if code.is_empty() {
                Vec::new()
            } else {
                vec![DocumentNode::text(code)]
            };
            out.push(DocumentNode::element(
                "pre",
                vec![DocumentNode::element_with_attrs("code", attrs, children)],
            ));
        } else if !code.is_empty() {
            out.push(DocumentNode::text(code));
        }

        if closed { i + 1 } else { i }
    }

    /// A raw-text or container element opening a line takes every following line up to its
    /// close tag, blank lines included, as one inline run.
    fn html_block(
        &self,
        lines: &[&str],
        start: usize,
        name: &str,
        depth: usize,
        out: &mut Vec<DocumentNode>,
    ) -> usize {
        let raw = tags::is_raw_text(name);
        let first = lines[start].trim();
        if !raw && tags::parse_open_tag(first, 0).is_some_and(|tag| tag.self_closing) {
            out.extend(parse_inline(first, depth, self.options));
            return start + 1;
        }

        let mut open = 0usize;
        let mut i = start;
        while i < lines.len() {
            let (opens, closes) = tags::count_tag_marks(lines[i], name);
            i += 1;
            if raw {
                if closes > 0 {
                    break;
                }
                continue;
            }
            open += opens;
            open = open.saturating_sub(closes);
            if open == 0 {
                break;
            }
        }

        let content = lines[start..i].join("\n");
        out.extend(parse_inline(content.trim(), depth, self.options));
        i
    }

    fn blockquote(
        &self,
        lines: &[&str],
        start: usize,
        depth: usize,
        out: &mut Vec<DocumentNode>,
    ) -> usize {
        let mut inner: Vec<&str> = Vec::new();
        let mut i = start;
        while i < lines.len() {
            let line = lines[i];
            if let Some(content) = blockquote_content(line) {
                inner.push(content);
            } else if !is_blank(line)
                && inner.last().is_some_and(|prev| !is_blank(prev))
                && !starts_block(line)
            {
                // Lazy continuation of a quoted paragraph.
                inner.push(line);
            } else {
                break;
            }
            i += 1;
        }

        let children = self.parse_blocks(&inner, depth + 1);
        out.push(DocumentNode::element("blockquote", children));
        i
    }

    fn list(
        &self,
        lines: &[&str],
        start: usize,
        first: ListMarker<'_>,
        depth: usize,
        out: &mut Vec<DocumentNode>,
    ) -> usize {
        let mut items: Vec<Vec<String>> = Vec::new();
        let mut loose = false;
        let mut i = start;
        let mut marker = first;

        loop {
            let (item_lines, next, item_loose) = collect_list_item(lines, i, &marker);
            items.push(item_lines);
            loose |= item_loose;
            i = next;

            // Blank lines between items make the list loose.
            let mut j = i;
            while j < lines.len() && is_blank(lines[j]) {
                j += 1;
            }
            match lines.get(j).and_then(|l| list_marker(l)) {
                Some(next_marker)
                    if next_marker.same_list_as(&first) && next_marker.indent <= first.indent + 3 =>
                {
                    loose |= j > i;
                    i = j;
                    marker = next_marker;
                }
                _ => break,
            }
        }

        let tag = if first.ordered.is_some() { "ol" } else { "ul" };
        let mut attrs = Attributes::new();
        if let Some(start_number) = first.ordered.map(|o| o.start)
            && start_number != 1
        {
            attrs.insert("start".to_string(), start_number.to_string());
        }

        let children = items
            .into_iter()
            .map(|item| {
                let refs: Vec<&str> = item.iter().map(String::as_str).collect();
                let mut blocks = self.parse_blocks(&refs, depth + 2);
                if !loose {
                    blocks = unwrap_paragraphs(blocks);
                }
                DocumentNode::element("li", blocks)
            })
            .collect();

        out.push(DocumentNode::element_with_attrs(tag, attrs, children));
        i
    }

    /// Parses a pipe table starting at `start`; `None` if the lines do not form one.
    fn table(
        &self,
        lines: &[&str],
        start: usize,
        depth: usize,
        out: &mut Vec<DocumentNode>,
    ) -> Option<usize> {
        let (header, aligns) = table_head(lines, start)?;
        let cell_depth = depth + 4;

        let row = |cells: Vec<&str>, cell_tag: &str| {
            let mut cells = cells.into_iter();
            let children = aligns
                .iter()
                .map(|align| {
                    let content = cells.next().unwrap_or("");
                    let mut attrs = Attributes::new();
                    if let Some(align) = align {
                        attrs.insert("align".to_string(), (*align).to_string());
                    }
                    DocumentNode::element_with_attrs(
                        cell_tag,
                        attrs,
                        parse_inline(content, cell_depth, self.options),
                    )
                })
                .collect();
            DocumentNode::element("tr", children)
        };

        let mut sections = vec![DocumentNode::element("thead", vec![row(header, "th")])];

        let mut body = Vec::new();
        let mut i = start + 2;
        while i < lines.len() && !is_blank(lines[i]) && !starts_block(lines[i]) {
            body.push(row(split_table_row(lines[i]), "td"));
            i += 1;
        }
        if !body.is_empty() {
            sections.push(DocumentNode::element("tbody", body));
        }

        out.push(DocumentNode::element("table", sections));
        Some(i)
    }

    fn paragraph(
        &self,
        lines: &[&str],
        start: usize,
        depth: usize,
        out: &mut Vec<DocumentNode>,
    ) -> usize {
        let mut collected: Vec<&str> = vec![lines[start].trim_start()];
        let mut i = start + 1;
        while i < lines.len() {
            let line = lines[i];
            if is_blank(line) {
                break;
            }
            if let Some(level) = setext_level(line) {
                let content = collected.join("\n");
                out.extend(self.leaf_block(&format!("h{level}"), content.trim(), depth));
                return i + 1;
            }
            if interrupts_paragraph(line) || table_head(lines, i).is_some() {
                break;
            }
            collected.push(line.trim_start());
            i += 1;
        }

        let content = collected.join("\n");
        out.extend(self.leaf_block("p", content.trim_end(), depth));
        i
    }
}

/// Collects the lines of one list item; returns them with the index after the item and whether
/// the item itself contained blank-separated blocks.
fn collect_list_item(
    lines: &[&str],
    start: usize,
    marker: &ListMarker,
) -> (Vec<String>, usize, bool) {
    let mut item = vec![marker.first_line.to_string()];
    let mut loose = false;
    let mut i = start + 1;

    while i < lines.len() {
        let line = lines[i];
        if is_blank(line) {
            let mut j = i;
            while j < lines.len() && is_blank(lines[j]) {
                j += 1;
            }
            if j < lines.len() && indent_width(lines[j]) >= marker.content_indent {
                for _ in i..j {
                    item.push(String::new());
                }
                if item.iter().any(|l| !l.trim().is_empty()) && list_marker(lines[j]).is_none() {
                    loose = true;
                }
                i = j;
                continue;
            }
            break;
        }

        let indent = indent_width(line);
        if indent >= marker.content_indent {
            item.push(strip_indent(line, marker.content_indent).to_string());
        } else if indent > marker.indent && list_marker(line).is_some() {
            // Sub-list indented less than the content column; still nest it.
            item.push(strip_indent(line, indent).to_string());
        } else if list_marker(line).is_some() || starts_block(line) {
            break;
        } else if item.last().is_some_and(|l| !l.trim().is_empty()) {
            item.push(line.trim_start().to_string());
        } else {
            break;
        }
        i += 1;
    }

    (item, i, loose)
}

fn unwrap_paragraphs(blocks: Vec<DocumentNode>) -> Vec<DocumentNode> {
    let mut out = Vec::with_capacity(blocks.len());
    for block in blocks {
        match block {
            DocumentNode::Element { tag, children, .. } if tag == "p" => out.extend(children),
            other => out.push(other),
        }
    }
    out
}

fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

fn indent_width(line: &str) -> usize {
    let mut width = 0;
    for ch in line.chars() {
        match ch {
            ' ' => width += 1,
            '\t' => width += 4 - (width % 4),
            _ => break,
        }
    }
    width
}

/// Removes up to `width` columns of leading whitespace.
fn strip_indent(line: &str, width: usize) -> &str {
    let mut consumed = 0;
    for (idx, ch) in line.char_indices() {
        if consumed >= width {
            return &line[idx..];
        }
        match ch {
            ' ' => consumed += 1,
            '\t' => consumed += 4 - (consumed % 4),
            _ => return &line[idx..],
        }
    }
    ""
}

/// Splits at most three columns of indentation off `line`.
fn block_indent(line: &str) -> Option<&str> {
    let indent = line.len() - line.trim_start_matches(' ').len();
    (indent <= 3).then(|| &line[indent..])
}

fn starts_block(line: &str) -> bool {
    open_fence(line).is_some()
        || html_block_start(line).is_some()
        || atx_heading(line).is_some()
        || is_thematic_break(line)
        || blockquote_content(line).is_some()
}

fn interrupts_paragraph(line: &str) -> bool {
    if starts_block(line) {
        return true;
    }
    // Only non-empty bullets and lists starting at 1 interrupt running text.
    list_marker(line).is_some_and(|m| {
        !m.first_line.trim().is_empty() && m.ordered.is_none_or(|o| o.start == 1)
    })
}

struct Fence<'a> {
    indent: usize,
    ch: char,
    len: usize,
    info: &'a str,
}

impl Fence<'_> {
    fn is_closed_by(&self, line: &str) -> bool {
        let Some(rest) = block_indent(line) else {
            return false;
        };
        let run = rest.chars().take_while(|&c| c == self.ch).count();
        run >= self.len && rest[run..].trim().is_empty()
    }
}

fn open_fence(line: &str) -> Option<Fence<'_>> {
    let rest = block_indent(line)?;
    let ch = rest.chars().next().filter(|&c| matches!(c, '`' | '~'))?;
    let len = rest.chars().take_while(|&c| c == ch).count();
    if len < 3 {
        return None;
    }
    let info = rest[len..].trim();
    if ch == '`' && info.contains('`') {
        return None;
    }
    Some(Fence {
        indent: line.len() - rest.len(),
        ch,
        len,
        info,
    })
}

fn html_block_start(line: &str) -> Option<String> {
    tags::html_block_name(block_indent(line)?)
}

fn atx_heading(line: &str) -> Option<(usize, &str)> {
    let rest = block_indent(line)?;
    let level = rest.chars().take_while(|&c| c == '#').count();
    if !(1..=6).contains(&level) {
        return None;
    }
    let after = &rest[level..];
    if !(after.is_empty() || after.starts_with([' ', '\t'])) {
        return None;
    }

    let mut content = after.trim();
    // Optional closing sequence: `## Title ##`.
    let without_hashes = content.trim_end_matches('#');
    if without_hashes.is_empty() {
        content = "";
    } else if without_hashes.len() < content.len() && without_hashes.ends_with([' ', '\t']) {
        content = without_hashes.trim_end();
    }
    Some((level, content))
}

fn is_thematic_break(line: &str) -> bool {
    let Some(rest) = block_indent(line) else {
        return false;
    };
    let Some(ch) = rest.chars().next().filter(|&c| matches!(c, '-' | '*' | '_')) else {
        return false;
    };
    let mut count = 0;
    for c in rest.chars() {
        if c == ch {
            count += 1;
        } else if c != ' ' && c != '\t' {
            return false;
        }
    }
    count >= 3
}

fn setext_level(line: &str) -> Option<usize> {
    let rest = block_indent(line)?.trim_end();
    if !rest.is_empty() && rest.chars().all(|c| c == '=') {
        Some(1)
    } else if !rest.is_empty() && rest.chars().all(|c| c == '-') {
        Some(2)
    } else {
        None
    }
}

fn blockquote_content(line: &str) -> Option<&str> {
    let rest = block_indent(line)?.strip_prefix('>')?;
    Some(rest.strip_prefix(' ').unwrap_or(rest))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Ordered {
    start: u32,
    delimiter: char,
}

#[derive(Debug, Clone, Copy)]
struct ListMarker<'a> {
    indent: usize,
    bullet: Option<char>,
    ordered: Option<Ordered>,
    content_indent: usize,
    first_line: &'a str,
}

impl ListMarker<'_> {
    fn same_list_as(&self, other: &ListMarker<'_>) -> bool {
        match (self.ordered, other.ordered) {
            (Some(a), Some(b)) => a.delimiter == b.delimiter,
            (None, None) => self.bullet == other.bullet,
            _ => false,
        }
    }
}

fn list_marker(line: &str) -> Option<ListMarker<'_>> {
    let rest = block_indent(line)?;
    let indent = line.len() - rest.len();

    let (marker_len, bullet, ordered) = match *rest.as_bytes().first()? {
        b @ (b'-' | b'*' | b'+') => (1, Some(char::from(b)), None),
        b'0'..=b'9' => {
            let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
            if digits > 9 {
                return None;
            }
            let delimiter = rest[digits..].chars().next().filter(|&c| matches!(c, '.' | ')'))?;
            let start = rest[..digits].parse::<u32>().ok()?;
            (digits + 1, None, Some(Ordered { start, delimiter }))
        }
        _ => return None,
    };

    let after = &rest[marker_len..];
    if !(after.is_empty() || after.starts_with([' ', '\t'])) {
        return None;
    }
    let spaces = indent_width(after);
    let content = after.trim_start();
    let content_indent = if content.is_empty() || spaces > 4 {
        indent + marker_len + 1
    } else {
        indent + marker_len + spaces
    };

    Some(ListMarker {
        indent,
        bullet,
        ordered,
        content_indent,
        first_line: content,
    })
}

type Align = Option<&'static str>;

/// Header cells and column alignments when `lines[start..]` opens a pipe table.
fn table_head<'a>(lines: &[&'a str], start: usize) -> Option<(Vec<&'a str>, Vec<Align>)> {
    let header_line = *lines.get(start)?;
    let delimiter_line = *lines.get(start + 1)?;
    if !header_line.contains('|') || !delimiter_line.contains(['|', ':', '-']) {
        return None;
    }
    if starts_block(header_line) {
        return None;
    }

    let header = split_table_row(header_line);
    let delimiters = split_table_row(delimiter_line);
    if header.is_empty() || header.len() != delimiters.len() {
        return None;
    }
    if !header_line.trim().starts_with('|') && !delimiter_line.contains('|') {
        return None;
    }

    let aligns = delimiters
        .iter()
        .map(|cell| {
            let cell = cell.trim();
            let left = cell.starts_with(':');
            let right = cell.ends_with(':');
            let dashes = cell.trim_matches(':');
            if dashes.is_empty() || !dashes.chars().all(|c| c == '-') {
                return None;
            }
            Some(match (left, right) {
                (true, true) => Some("center"),
                (true, false) => Some("left"),
                (false, true) => Some("right"),
                (false, false) => None,
            })
        })
        .collect::<Option<Vec<_>>>()?;

    Some((header, aligns))
}

/// Splits a table row on unescaped pipes, dropping the optional outer pipes.
fn split_table_row(line: &str) -> Vec<&str> {
    let mut row = line.trim();
    if let Some(stripped) = row.strip_prefix('|') {
        row = stripped;
    }
    if row.ends_with('|') && !row.ends_with("\\|") {
        row = &row[..row.len() - 1];
    }

    let mut cells = Vec::new();
    let bytes = row.as_bytes();
    let mut cell_start = 0;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'|' => {
                cells.push(row[cell_start..i].trim());
                cell_start = i + 1;
                i += 1;
            }
            _ => i += 1,
        }
    }
    cells.push(row[cell_start.min(row.len())..].trim());
    cells
}

#[cfg(test)]
mod tests;
