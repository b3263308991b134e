use crate::output::SafeOutput;
use std::borrow::Cow;

/// Encodes `text` so that every markup delimiter displays as its literal glyph.
///
/// Escaping is not reversed by a second pass: `&lt;` becomes `&amp;lt;`.
pub fn escape_html(text: &str) -> Cow<'_, str> {
    htmlize::escape_all_quotes(text)
}

/// Literal-text rendering of arbitrary input. Total; never interprets structure.
pub fn escape(text: &str) -> SafeOutput {
    if text.is_empty() {
        return SafeOutput::empty();
    }
    SafeOutput::literal(escape_html(text).into_owned())
}
