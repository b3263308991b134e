//! The single entry point for turning untrusted chat text into [`SafeOutput`].

use crate::config::RenderConfig;
use crate::detect::DetectorRegistry;
use crate::escape::escape;
use crate::output::SafeOutput;
use crate::parse::{ParseOptions, parse_with};
use crate::sanitize::{SanitizationPolicy, default_policy, sanitize};
use crate::tree::DocumentNode;
use crate::Result;
use serde_json::Value;
use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, OnceLock};

/// Detect, parse, sanitize; or escape.
///
/// Text that no detector rule matches is escaped without being parsed. Text that looks like
/// markup is parsed and sanitized; a panic in either stage is caught and the text is escaped
/// instead, so [`Renderer::render`] never fails and never hands out an unsanitized tree.
#[derive(Debug, Clone)]
pub struct Renderer {
    detectors: DetectorRegistry,
    policy: Arc<SanitizationPolicy>,
    parse_options: ParseOptions,
    max_input_bytes: Option<usize>,
}

impl Default for Renderer {
    fn default() -> Self {
        Self {
            detectors: DetectorRegistry::default_chat(),
            policy: Arc::new(default_policy().clone()),
            parse_options: ParseOptions::default(),
            max_input_bytes: Some(crate::config::DEFAULT_MAX_INPUT_BYTES),
        }
    }
}

impl Renderer {
    pub fn from_config(config: &RenderConfig) -> Result<Self> {
        Ok(Self {
            detectors: DetectorRegistry::default_chat(),
            policy: Arc::new(SanitizationPolicy::from_config(config)?),
            parse_options: ParseOptions::from_config(config)?,
            max_input_bytes: config.max_input_bytes()?,
        })
    }

    /// Replaces the detector rules deciding which inputs are parsed.
    pub fn with_detectors(mut self, detectors: DetectorRegistry) -> Self {
        self.detectors = detectors;
        self
    }

    pub fn detectors(&self) -> &DetectorRegistry {
        &self.detectors
    }

    pub fn policy(&self) -> &SanitizationPolicy {
        &self.policy
    }

    pub fn parse_options(&self) -> &ParseOptions {
        &self.parse_options
    }

    pub fn max_input_bytes(&self) -> Option<usize> {
        self.max_input_bytes
    }

    pub fn render(&self, raw: &str) -> SafeOutput {
        self.render_guarded(raw, |text| {
            sanitize(parse_with(text, &self.parse_options), &self.policy)
        })
    }

    /// Renders a JSON value: strings are rendered, anything else is empty output.
    pub fn render_json(&self, value: &Value) -> SafeOutput {
        match value.as_str() {
            Some(text) => self.render(text),
            None => SafeOutput::empty(),
        }
    }

    fn render_guarded(
        &self,
        raw: &str,
        markup: impl FnOnce(&str) -> DocumentNode,
    ) -> SafeOutput {
        if raw.is_empty() {
            return SafeOutput::empty();
        }

        if let Some(limit) = self.max_input_bytes
            && raw.len() > limit
        {
            tracing::debug!(len = raw.len(), limit, "input over size bound; rendering as literal text");
            return escape(raw);
        }

        let Some(rule) = self.detectors.matching_rule(raw) else {
            tracing::debug!("no markup detected; rendering as literal text");
            return escape(raw);
        };
        tracing::debug!(rule, "markup detected");

        match catch_unwind(AssertUnwindSafe(|| markup(raw))) {
            Ok(tree) => SafeOutput::structured(tree),
            Err(payload) => {
                tracing::warn!(
                    panic = %panic_message(payload.as_ref()),
                    "markup rendering panicked; falling back to literal text"
                );
                escape(raw)
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "unknown panic payload"
    }
}

fn default_renderer() -> &'static Renderer {
    static RENDERER: OnceLock<Renderer> = OnceLock::new();
    RENDERER.get_or_init(Renderer::default)
}

/// Renders one chat message with the default renderer.
pub fn render_chat_content(raw: &str) -> SafeOutput {
    default_renderer().render(raw)
}

/// Renders a chat message received as JSON; non-string values yield empty output.
pub fn render_json_content(value: &Value) -> SafeOutput {
    default_renderer().render_json(value)
}
