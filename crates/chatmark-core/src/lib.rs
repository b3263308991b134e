#![forbid(unsafe_code)]

//! Safe rendering of untrusted chat text (headless).
//!
//! Design goals:
//! - total: every input yields a [`SafeOutput`], nothing panics out of [`render_chat_content`]
//! - structure only through the allowlist: parser output reaches callers only after [`sanitize`]
//! - literal text never pays for parsing: undetected input goes straight to [`escape`]

pub mod config;
pub mod detect;
pub mod error;
pub mod escape;
pub mod output;
pub mod parse;
pub mod render;
pub mod sanitize;
pub mod tree;

pub use config::RenderConfig;
pub use detect::{Detector, DetectorRegistry, looks_like_markup};
pub use error::{Error, Result};
pub use escape::{escape, escape_html};
pub use output::{OutputKind, SafeOutput};
pub use parse::{ParseOptions, parse, parse_with};
pub use render::{Renderer, render_chat_content, render_json_content};
pub use sanitize::{SanitizationPolicy, default_policy, sanitize};
pub use tree::DocumentNode;
