use crate::{Error, Result};
use serde_json::{Map, Value};

pub const DEFAULT_MAX_INPUT_BYTES: usize = 256 * 1024;
pub const DEFAULT_MAX_NESTING: usize = 32;
/// Largest accepted `maxNesting`; parser and sanitizer recursion stays within it.
pub const MAX_NESTING_LIMIT: usize = 256;

/// Dynamic renderer configuration backed by a JSON object.
///
/// Recognized keys:
/// - `breaks` (bool): single newlines inside paragraphs become `<br>`
/// - `maxInputBytes` (integer): longer inputs skip the parser; `0` disables the bound
/// - `maxNesting` (integer): parser nesting and sanitizer depth bound
/// - `policy.*`: allowlist overrides, see [`crate::sanitize::SanitizationPolicy::from_config`]
#[derive(Debug, Clone, PartialEq)]
pub struct RenderConfig(Value);

impl Default for RenderConfig {
    fn default() -> Self {
        Self::empty_object()
    }
}

impl RenderConfig {
    pub fn empty_object() -> Self {
        Self(Value::Object(Map::new()))
    }

    pub fn from_value(value: Value) -> Self {
        Self(value)
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)?;
        if !value.is_object() {
            return Err(Error::invalid_config("", "config root must be a JSON object"));
        }
        Ok(Self(value))
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn get(&self, dotted_path: &str) -> Option<&Value> {
        let mut cur = &self.0;
        for segment in dotted_path.split('.') {
            cur = cur.as_object()?.get(segment)?;
        }
        Some(cur)
    }

    /// Reads an optional boolean, rejecting values of any other JSON type.
    pub fn bool_or(&self, dotted_path: &str, default: bool) -> Result<bool> {
        match self.get(dotted_path) {
            None | Some(Value::Null) => Ok(default),
            Some(Value::Bool(b)) => Ok(*b),
            Some(_) => Err(Error::invalid_config(dotted_path, "expected a boolean")),
        }
    }

    /// Reads an optional non-negative integer, rejecting values of any other JSON type.
    pub fn usize_or(&self, dotted_path: &str, default: usize) -> Result<usize> {
        match self.get(dotted_path) {
            None | Some(Value::Null) => Ok(default),
            Some(v) => v
                .as_u64()
                .and_then(|n| usize::try_from(n).ok())
                .ok_or_else(|| Error::invalid_config(dotted_path, "expected a non-negative integer")),
        }
    }

    /// `maxNesting`, checked against [`MAX_NESTING_LIMIT`].
    pub fn max_nesting(&self) -> Result<usize> {
        let value = self.usize_or("maxNesting", DEFAULT_MAX_NESTING)?;
        if !(1..=MAX_NESTING_LIMIT).contains(&value) {
            return Err(Error::invalid_config(
                "maxNesting",
                format!("must be between 1 and {MAX_NESTING_LIMIT}"),
            ));
        }
        Ok(value)
    }

    /// `maxInputBytes`; `None` when the bound is disabled with `0`.
    pub fn max_input_bytes(&self) -> Result<Option<usize>> {
        let value = self.usize_or("maxInputBytes", DEFAULT_MAX_INPUT_BYTES)?;
        Ok((value > 0).then_some(value))
    }

    /// Reads an optional list of strings, lowercased.
    pub fn string_list(&self, dotted_path: &str) -> Result<Vec<String>> {
        match self.get(dotted_path) {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| {
                    item.as_str()
                        .map(|s| s.trim().to_ascii_lowercase())
                        .ok_or_else(|| Error::invalid_config(dotted_path, "expected a list of strings"))
                })
                .collect(),
            Some(_) => Err(Error::invalid_config(dotted_path, "expected a list of strings")),
        }
    }

    /// Reads an optional object whose values are lists of strings (e.g. tag -> attributes).
    pub fn string_list_map(&self, dotted_path: &str) -> Result<Vec<(String, Vec<String>)>> {
        match self.get(dotted_path) {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(Value::Object(map)) => map
                .iter()
                .map(|(key, value)| {
                    let Value::Array(items) = value else {
                        return Err(Error::invalid_config(
                            &format!("{dotted_path}.{key}"),
                            "expected a list of strings",
                        ));
                    };
                    let list = items
                        .iter()
                        .map(|item| {
                            item.as_str().map(|s| s.trim().to_ascii_lowercase()).ok_or_else(
                                || {
                                    Error::invalid_config(
                                        &format!("{dotted_path}.{key}"),
                                        "expected a list of strings",
                                    )
                                },
                            )
                        })
                        .collect::<Result<Vec<_>>>()?;
                    Ok((key.trim().to_ascii_lowercase(), list))
                })
                .collect(),
            Some(_) => Err(Error::invalid_config(
                dotted_path,
                "expected an object of string lists",
            )),
        }
    }

    /// Layers `other` on top of this config: objects combine key by key, every other value in
    /// `other` replaces what was here.
    pub fn overlay(&mut self, other: &RenderConfig) {
        overlay_value(&mut self.0, &other.0);
    }
}

fn overlay_value(base: &mut Value, top: &Value) {
    let Value::Object(top_map) = top else {
        *base = top.clone();
        return;
    };
    if !base.is_object() {
        *base = Value::Object(Map::new());
    }
    if let Value::Object(base_map) = base {
        for (key, value) in top_map {
            overlay_value(base_map.entry(key.as_str()).or_insert(Value::Null), value);
        }
    }
}
