//! Client for the `/responses` endpoint.
//!
//! One blocking (non-streamed) POST per turn. Non-200 answers and timeouts
//! are reported once; nothing is retried.

use crate::config::Settings;
use crate::error::{PipeError, Result};
use crate::messages::InputItem;
use crate::response::ResponsesResponse;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

/// Body of a `/responses` request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponsesRequest {
    pub model: String,
    pub reasoning: ReasoningConfig,
    pub max_output_tokens: u32,
    pub input: Vec<InputItem>,
}

/// Reasoning options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReasoningConfig {
    pub effort: String,
}

impl ResponsesRequest {
    /// Build a request for `model` using the effort and token limit from settings.
    pub fn new(model: impl Into<String>, settings: &Settings, input: Vec<InputItem>) -> Self {
        Self {
            model: model.into(),
            reasoning: ReasoningConfig {
                effort: settings.reasoning_effort().to_string(),
            },
            max_output_tokens: settings.clamped_max_output_tokens(),
            input,
        }
    }
}

/// HTTP client bound to one base URL and timeout.
#[derive(Debug, Clone)]
pub struct ResponsesClient {
    client: Client,
    url: String,
    timeout_seconds: u64,
    debug_mode: bool,
}

impl ResponsesClient {
    /// Create a client from settings.
    pub fn new(settings: &Settings) -> Result<Self> {
        let client = Client::builder().timeout(settings.timeout()).build()?;

        Ok(Self {
            client,
            url: settings.responses_url(),
            timeout_seconds: settings.timeout_seconds,
            debug_mode: settings.debug_mode,
        })
    }

    /// Endpoint this client posts to.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Send one request and decode the full response.
    pub async fn create_response(
        &self,
        api_key: &str,
        request: &ResponsesRequest,
    ) -> Result<ResponsesResponse> {
        debug!(
            model = %request.model,
            effort = %request.reasoning.effort,
            max_output_tokens = request.max_output_tokens,
            input_items = request.input.len(),
            "Sending Responses API request"
        );

        let response = self
            .client
            .post(&self.url)
            .header(AUTHORIZATION, format!("Bearer {}", api_key))
            .header(CONTENT_TYPE, "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        if status != StatusCode::OK {
            return Err(PipeError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let raw: Value = serde_json::from_str(&body)?;
        if let Value::Object(fields) = &raw {
            let keys: Vec<&str> = fields.keys().map(String::as_str).collect();
            if self.debug_mode {
                info!(?keys, "Response keys");
            } else {
                debug!(?keys, "Response keys");
            }
        }

        Ok(serde_json::from_value(raw)?)
    }

    fn map_transport_error(&self, err: reqwest::Error) -> PipeError {
        if err.is_timeout() {
            PipeError::Timeout {
                seconds: self.timeout_seconds,
            }
        } else {
            PipeError::Transport(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::{translate_messages, HostMessage};
    use serde_json::json;

    #[test]
    fn test_request_payload_shape() {
        let mut settings = Settings::default().with_max_output_tokens(99_999);
        settings.thinking_effort = " low ".to_string();
        let input = translate_messages(&[HostMessage::user("hi")]).unwrap();

        let request = ResponsesRequest::new("o3-pro", &settings, input);
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "model": "o3-pro",
                "reasoning": {"effort": "low"},
                "max_output_tokens": 32768,
                "input": [{"role": "user", "content": [{"type": "input_text", "text": "hi"}]}]
            })
        );
    }

    #[test]
    fn test_client_uses_responses_endpoint() {
        let settings = Settings::default().with_base_url("http://127.0.0.1:1/v1");
        let client = ResponsesClient::new(&settings).unwrap();
        assert_eq!(client.url(), "http://127.0.0.1:1/v1/responses");
    }

    #[tokio::test]
    async fn test_connection_failure_is_transport_error() {
        let settings = Settings::default()
            .with_base_url("http://127.0.0.1:1")
            .with_timeout_seconds(5);
        let client = ResponsesClient::new(&settings).unwrap();
        let request = ResponsesRequest::new("o3-pro", &settings, Vec::new());

        let err = client.create_response("sk-test", &request).await.unwrap_err();
        assert!(matches!(err, PipeError::Transport(_)));
        assert!(err.is_unexpected());
    }
}
