//! Host chat messages and their translation into Responses API input.
//!
//! - User text → `input_text`
//! - User `text` parts → `input_text`, `image_url` parts → `input_image`
//! - Assistant text → `output_text`
//! - System text → `input_text`
//! - Any other role is skipped
//!
//! Translation is all-or-nothing: one malformed message fails the whole list.

use crate::error::{PipeError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::error;

/// Chat request body handed over by the host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatBody {
    /// Dotted model identifier; the part after the last dot names the model.
    pub model: String,

    /// Conversation history, oldest first.
    #[serde(default)]
    pub messages: Vec<HostMessage>,
}

impl ChatBody {
    /// Create a body for the given model and messages.
    pub fn new(model: impl Into<String>, messages: Vec<HostMessage>) -> Self {
        Self {
            model: model.into(),
            messages,
        }
    }

    /// Model identifier without the host's pipe prefix.
    pub fn model_id(&self) -> &str {
        match self.model.rfind('.') {
            Some(pos) => &self.model[pos + 1..],
            None => &self.model,
        }
    }
}

/// Identity of the user issuing the turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostUser {
    /// User identifier.
    #[serde(default = "default_user_id")]
    pub id: String,
}

impl HostUser {
    /// Create a user with the given id.
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

impl Default for HostUser {
    fn default() -> Self {
        Self {
            id: default_user_id(),
        }
    }
}

fn default_user_id() -> String {
    "unknown".to_string()
}

/// One message of the host's conversation history.
///
/// `content` is either a plain string or a list of typed parts
/// (`{"type": "text", "text": ..}`, `{"type": "image_url", "image_url": {"url": ..}}`).
/// It is kept as raw JSON so malformed parts surface as translation errors
/// instead of being rejected when the body is decoded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostMessage {
    /// Author role: "user", "assistant" or "system".
    #[serde(default)]
    pub role: Option<String>,

    /// Message content.
    #[serde(default)]
    pub content: Value,
}

impl HostMessage {
    /// Create a message with plain string content.
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Some(role.into()),
            content: Value::String(content.into()),
        }
    }

    /// User message with plain text.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new("user", content)
    }

    /// Assistant message with plain text.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new("assistant", content)
    }

    /// System message with plain text.
    pub fn system(content: impl Into<String>) -> Self {
        Self::new("system", content)
    }

    /// User message made of typed parts.
    pub fn user_parts(parts: Vec<Value>) -> Self {
        Self {
            role: Some("user".to_string()),
            content: Value::Array(parts),
        }
    }

    /// Whether this message was authored by the user.
    pub fn is_user(&self) -> bool {
        self.role.as_deref() == Some("user")
    }

    /// Text of the message for identification purposes.
    ///
    /// Part lists contribute their `text` parts joined by single spaces;
    /// other part kinds are ignored.
    pub fn plain_text(&self) -> String {
        match &self.content {
            Value::String(text) => text.clone(),
            Value::Array(parts) => parts
                .iter()
                .filter(|part| part.get("type").and_then(Value::as_str) == Some("text"))
                .map(|part| part.get("text").and_then(Value::as_str).unwrap_or(""))
                .collect::<Vec<_>>()
                .join(" "),
            Value::Null => String::new(),
            other => other.to_string(),
        }
    }
}

/// Role of a Responses API input item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// End user.
    User,
    /// Model output from earlier turns.
    Assistant,
    /// System instructions.
    System,
}

/// Typed segment inside an input item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentSegment {
    /// Text supplied to the model.
    InputText {
        /// Segment text.
        text: String,
    },
    /// Image supplied to the model by URL (or data URL).
    InputImage {
        /// Image location.
        image_url: String,
    },
    /// Text the model produced earlier.
    OutputText {
        /// Segment text.
        text: String,
    },
}

/// Role-tagged block of the request's `input` list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputItem {
    /// Author role.
    pub role: Role,
    /// Segments, in order.
    pub content: Vec<ContentSegment>,
}

/// Convert host messages to Responses API input items.
///
/// Messages with roles other than user, assistant and system are dropped.
/// The first malformed message aborts the conversion with
/// [`PipeError::InvalidMessage`].
pub fn translate_messages(messages: &[HostMessage]) -> Result<Vec<InputItem>> {
    let mut input = Vec::with_capacity(messages.len());

    for message in messages {
        match translate_message(message) {
            Ok(Some(item)) => input.push(item),
            Ok(None) => {}
            Err(reason) => {
                error!(reason = %reason, "Message transformation error");
                let rendered =
                    serde_json::to_string(message).unwrap_or_else(|_| format!("{:?}", message));
                return Err(PipeError::InvalidMessage { message: rendered });
            }
        }
    }

    Ok(input)
}

/// Translate one message; `Ok(None)` means the role is not forwarded.
fn translate_message(message: &HostMessage) -> std::result::Result<Option<InputItem>, String> {
    let item = match message.role.as_deref() {
        Some("user") => InputItem {
            role: Role::User,
            content: match &message.content {
                Value::Array(parts) => translate_user_parts(parts)?,
                content => vec![ContentSegment::InputText {
                    text: require_text(content)?,
                }],
            },
        },
        Some("assistant") => InputItem {
            role: Role::Assistant,
            content: vec![ContentSegment::OutputText {
                text: require_text(&message.content)?,
            }],
        },
        Some("system") => InputItem {
            role: Role::System,
            content: vec![ContentSegment::InputText {
                text: require_text(&message.content)?,
            }],
        },
        _ => return Ok(None),
    };

    Ok(Some(item))
}

fn translate_user_parts(parts: &[Value]) -> std::result::Result<Vec<ContentSegment>, String> {
    let mut segments = Vec::with_capacity(parts.len());

    for part in parts {
        let kind = part
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| "content part has no type".to_string())?;

        match kind {
            "text" => {
                let text = part
                    .get("text")
                    .and_then(Value::as_str)
                    .ok_or_else(|| "text part has no text".to_string())?;
                segments.push(ContentSegment::InputText {
                    text: text.to_string(),
                });
            }
            "image_url" => {
                let url = part
                    .get("image_url")
                    .and_then(|image| image.get("url"))
                    .and_then(Value::as_str)
                    .ok_or_else(|| "image_url part has no url".to_string())?;
                segments.push(ContentSegment::InputImage {
                    image_url: url.to_string(),
                });
            }
            _ => {}
        }
    }

    Ok(segments)
}

fn require_text(content: &Value) -> std::result::Result<String, String> {
    content
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| format!("expected string content, got {}", content))
}
