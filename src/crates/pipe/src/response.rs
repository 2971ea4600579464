//! Responses API response model and display-text extraction.
//!
//! The text shown to the user is taken from the first source that yields
//! something non-empty:
//!
//! 1. the top-level `output_text` convenience field
//! 2. the `output` item list (assistant `message` items, `text` / `content` fields, bare strings)
//! 3. `text='..'` / `text=".."` patterns in the stringified `output`

use crate::conversation::TokenCounts;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use std::sync::LazyLock;

static TEXT_ASSIGNMENT_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"text=['"]([^'"]+)['"]"#).unwrap());

/// Output item types reported as tool usage.
const TOOL_ITEM_TYPES: [&str; 2] = ["file_search", "function"];

/// Decoded body of a `/responses` call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResponsesResponse {
    /// Full output text, when the API provides it.
    #[serde(default)]
    pub output_text: Option<Value>,

    /// Output items.
    #[serde(default)]
    pub output: Option<Value>,

    /// Token usage. An empty `usage` object decodes as `None`.
    #[serde(default, deserialize_with = "deserialize_usage")]
    pub usage: Option<Usage>,

    /// "completed", "incomplete", ...
    #[serde(default)]
    pub status: Option<String>,

    /// Why the response is incomplete.
    #[serde(default)]
    pub incomplete_details: Option<IncompleteDetails>,
}

fn deserialize_usage<'de, D>(deserializer: D) -> Result<Option<Usage>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Object(map)) if map.is_empty() => Ok(None),
        Some(value) => serde_json::from_value(value)
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

/// Token usage block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub input_tokens: u64,
    #[serde(default)]
    pub output_tokens: u64,
    #[serde(default)]
    pub total_tokens: u64,
    #[serde(default)]
    pub output_tokens_details: Option<OutputTokensDetails>,
}

/// Breakdown of output tokens.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputTokensDetails {
    #[serde(default)]
    pub reasoning_tokens: Option<u64>,
}

/// Details for an incomplete response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IncompleteDetails {
    #[serde(default)]
    pub reason: Option<String>,
}

impl Usage {
    /// Reasoning tokens, zero when not reported.
    pub fn reasoning_tokens(&self) -> u64 {
        self.output_tokens_details
            .as_ref()
            .and_then(|details| details.reasoning_tokens)
            .unwrap_or(0)
    }

    /// Token counts used for billing.
    pub fn token_counts(&self) -> TokenCounts {
        TokenCounts {
            input: self.input_tokens,
            output: self.output_tokens,
            reasoning: self.reasoning_tokens(),
        }
    }
}

impl ResponsesResponse {
    /// Response status, `completed` when absent.
    pub fn status(&self) -> &str {
        self.status.as_deref().unwrap_or("completed")
    }

    /// Whether the API marked the response incomplete.
    pub fn is_incomplete(&self) -> bool {
        self.status() == "incomplete"
    }

    /// Reason for an incomplete response; `None` for complete ones.
    pub fn incomplete_reason(&self) -> Option<&str> {
        if !self.is_incomplete() {
            return None;
        }
        Some(
            self.incomplete_details
                .as_ref()
                .and_then(|details| details.reason.as_deref())
                .unwrap_or("Unknown"),
        )
    }

    /// Extract the display text, trying each source in turn.
    pub fn extract_text(&self) -> Option<String> {
        if let Some(text) = self.output_text.as_ref().and_then(Value::as_str) {
            if !text.is_empty() {
                return Some(text.to_string());
            }
        }

        if let Some(items) = self.output.as_ref().and_then(Value::as_array) {
            let text = extract_text_from_output(items);
            if !text.is_empty() {
                return Some(text);
            }
        }

        let raw = match &self.output {
            Some(Value::String(raw)) => raw.clone(),
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        };
        extract_text_assignments(&raw)
    }

    /// Distinct tool types used while producing the response, sorted.
    pub fn tools_used(&self) -> Vec<String> {
        let Some(items) = self.output.as_ref().and_then(Value::as_array) else {
            return Vec::new();
        };

        items
            .iter()
            .filter_map(|item| item.get("type").and_then(Value::as_str))
            .filter(|kind| TOOL_ITEM_TYPES.contains(kind))
            .map(str::to_string)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

/// Collect text from an `output` item list, joined by newlines.
pub fn extract_text_from_output(items: &[Value]) -> String {
    let mut parts: Vec<&str> = Vec::new();

    for item in items {
        match item {
            Value::Object(fields) => {
                let kind = fields.get("type").and_then(Value::as_str);
                let role = fields.get("role").and_then(Value::as_str);

                if kind == Some("message") && role == Some("assistant") {
                    let segments = fields.get("content").and_then(Value::as_array);
                    for segment in segments.into_iter().flatten() {
                        if segment.get("type").and_then(Value::as_str) != Some("output_text") {
                            continue;
                        }
                        if let Some(text) = segment.get("text").and_then(Value::as_str) {
                            if !text.is_empty() {
                                parts.push(text);
                            }
                        }
                    }
                } else if let Some(text) = fields.get("text") {
                    if let Some(text) = text.as_str() {
                        parts.push(text);
                    }
                } else if let Some(content) = fields.get("content") {
                    match content {
                        Value::String(text) => parts.push(text),
                        Value::Array(entries) => parts.extend(
                            entries
                                .iter()
                                .filter_map(|entry| entry.get("text"))
                                .filter_map(Value::as_str),
                        ),
                        _ => {}
                    }
                }
            }
            Value::String(text) => parts.push(text),
            _ => {}
        }
    }

    parts.join("\n")
}

/// Last-resort extraction of `text='..'` assignments from a stringified output.
fn extract_text_assignments(raw: &str) -> Option<String> {
    if !raw.contains("text='") && !raw.contains("text=\"") {
        return None;
    }

    let matches: Vec<&str> = TEXT_ASSIGNMENT_REGEX
        .captures_iter(raw)
        .filter_map(|captures| captures.get(1))
        .map(|m| m.as_str())
        .collect();

    if matches.is_empty() {
        None
    } else {
        Some(matches.join("\n"))
    }
}
