use crate::tree::DocumentNode;
use serde::Serialize;

/// A value that is safe to hand to the display layer.
///
/// Only this crate can construct one: literal output comes from the escaper, structured output
/// only from the sanitizer. Display code may insert [`SafeOutput::to_html`] as live markup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SafeOutput(Repr);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
enum Repr {
    Empty,
    Literal { html: String },
    Structured { tree: DocumentNode },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    Empty,
    Literal,
    Structured,
}

impl SafeOutput {
    pub(crate) fn empty() -> Self {
        Self(Repr::Empty)
    }

    /// `html` must already be escaped.
    pub(crate) fn literal(html: String) -> Self {
        Self(Repr::Literal { html })
    }

    /// `tree` must be the output of the sanitizer.
    pub(crate) fn structured(tree: DocumentNode) -> Self {
        Self(Repr::Structured { tree })
    }

    pub fn kind(&self) -> OutputKind {
        match &self.0 {
            Repr::Empty => OutputKind::Empty,
            Repr::Literal { .. } => OutputKind::Literal,
            Repr::Structured { .. } => OutputKind::Structured,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self.0, Repr::Empty)
    }

    pub fn is_structured(&self) -> bool {
        matches!(self.0, Repr::Structured { .. })
    }

    /// The sanitized tree, when the input was rendered as markup.
    pub fn as_tree(&self) -> Option<&DocumentNode> {
        match &self.0 {
            Repr::Structured { tree } => Some(tree),
            _ => None,
        }
    }

    pub fn into_tree(self) -> Option<DocumentNode> {
        match self.0 {
            Repr::Structured { tree } => Some(tree),
            _ => None,
        }
    }

    /// The escaped text, when the input was rendered literally.
    pub fn as_literal_html(&self) -> Option<&str> {
        match &self.0 {
            Repr::Literal { html } => Some(html),
            _ => None,
        }
    }

    pub fn to_html(&self) -> String {
        match &self.0 {
            Repr::Empty => String::new(),
            Repr::Literal { html } => html.clone(),
            Repr::Structured { tree } => tree.to_html(),
        }
    }
}
