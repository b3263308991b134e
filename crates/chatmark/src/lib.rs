#![forbid(unsafe_code)]

//! `chatmark` turns untrusted chat text into output that is safe to insert into a live document.
//!
//! Text that looks like lightweight markup is parsed into a [`DocumentNode`] tree and reduced to
//! an allowlist by [`sanitize`]; everything else is escaped. [`render_chat_content`] is the one
//! entry point most callers need:
//!
//! ```
//! let out = chatmark::render_chat_content("**bold** and <script>alert(1)</script>");
//! assert_eq!(out.to_html(), "<p><strong>bold</strong> and </p>");
//!
//! let plain = chatmark::render_chat_content("1 < 2");
//! assert_eq!(plain.to_html(), "1 &lt; 2");
//! ```
//!
//! Use [`Renderer::from_config`] to tune line breaks, size and nesting bounds, or the
//! sanitization allowlist.

pub use chatmark_core::*;
