//! The pipe: one chat turn from host body to display fragments.
//!
//! A turn runs strictly in order:
//!
//! 1. resolve the model and derive the conversation id
//! 2. translate the host messages
//! 3. pick an API key and post one request
//! 4. extract the answer, update the conversation totals, format the stats
//!
//! Each step's failure ends the turn with a single `Error: ...` fragment.
//! Totals are only updated for turns that got a response back.

use crate::client::{ResponsesClient, ResponsesRequest};
use crate::config::Settings;
use crate::conversation::{derive_conversation_id, ConversationLedger};
use crate::credentials::CredentialRotator;
use crate::display::{self, TokenStats};
use crate::error::{PipeError, Result};
use crate::messages::{translate_messages, ChatBody, HostUser};
use crate::pricing::{self, SUPPORTED_MODELS};
use crate::response::ResponsesResponse;
use async_stream::stream;
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

/// Entry of the model listing shown by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelEntry {
    /// Display name, prefixed with the configured name prefix.
    pub name: String,
    /// Model id sent back by the host in `ChatBody::model`.
    pub id: String,
}

/// Adapter between a chat host and the Responses API.
///
/// Owns the only mutable state of the system: the API key cursor and the
/// conversation ledger. Both are safe to share between concurrent turns, but
/// interleaved turns see each other's updates in no particular order.
#[derive(Debug)]
pub struct Pipe {
    settings: Settings,
    client: ResponsesClient,
    credentials: CredentialRotator,
    ledger: ConversationLedger,
}

impl Pipe {
    /// Create a pipe from settings, rejecting settings that fail validation.
    pub fn new(settings: Settings) -> Result<Self> {
        settings.validate()?;
        let client = ResponsesClient::new(&settings)?;
        let ledger = ConversationLedger::with_verbose_logging(settings.debug_mode);

        info!(
            url = %client.url(),
            models = ?SUPPORTED_MODELS,
            "Responses pipe initialized"
        );

        Ok(Self {
            settings,
            client,
            credentials: CredentialRotator::new(),
            ledger,
        })
    }

    /// Settings this pipe was created with.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Per-conversation totals.
    pub fn ledger(&self) -> &ConversationLedger {
        &self.ledger
    }

    /// API key rotation state.
    pub fn credentials(&self) -> &CredentialRotator {
        &self.credentials
    }

    /// Models offered to the host.
    pub fn pipes(&self) -> Vec<ModelEntry> {
        SUPPORTED_MODELS
            .iter()
            .map(|model| ModelEntry {
                name: format!("{}{}", self.settings.name_prefix, model),
                id: (*model).to_string(),
            })
            .collect()
    }

    /// Run one turn, producing display fragments as they become available.
    ///
    /// The stream is finite and yields at least one fragment. It suspends
    /// only while waiting for the remote response.
    pub fn pipe(&self, body: ChatBody, user: HostUser) -> impl Stream<Item = String> + '_ {
        stream! {
            let model_id = body.model_id().to_string();
            if !pricing::is_supported(&model_id) {
                yield self.report(PipeError::UnsupportedModel(model_id));
                return;
            }

            let conv_id = derive_conversation_id(&body.messages, &user);
            if self.settings.debug_mode {
                let user_messages = body.messages.iter().filter(|m| m.is_user()).count();
                info!(conversation = %conv_id, user_messages, "Conversation resolved");
            }

            let input = match translate_messages(&body.messages) {
                Ok(input) => input,
                Err(err) => {
                    yield self.report(err);
                    return;
                }
            };
            let request = ResponsesRequest::new(model_id.as_str(), &self.settings, input);

            let api_key = match self.credentials.next_credential(&self.settings.api_keys) {
                Ok(key) => key,
                Err(err) => {
                    yield self.report(err);
                    return;
                }
            };

            let message_number = self.ledger.message_count(&conv_id) + 1;
            yield display::progress_notice(&model_id, message_number);

            let response = match self.client.create_response(&api_key, &request).await {
                Ok(response) => response,
                Err(err) => {
                    yield self.report(err);
                    return;
                }
            };

            for fragment in self.complete_turn(&model_id, &conv_id, &response) {
                yield fragment;
            }
        }
    }

    /// Run one turn and collect every fragment.
    pub async fn pipe_collect(&self, body: ChatBody, user: HostUser) -> Vec<String> {
        self.pipe(body, user).collect().await
    }

    /// Turn a decoded response into fragments, updating the ledger first so
    /// the displayed totals include this message.
    fn complete_turn(
        &self,
        model_id: &str,
        conv_id: &str,
        response: &ResponsesResponse,
    ) -> Vec<String> {
        let mut fragments = Vec::new();

        fragments.push(
            response
                .extract_text()
                .unwrap_or_else(|| display::NO_RESPONSE_TEXT.to_string()),
        );

        let incomplete_reason = response.incomplete_reason();
        if let Some(reason) = incomplete_reason {
            warn!(model = %model_id, reason = %reason, "Response incomplete");
            fragments.push(display::truncation_note(reason));
            if reason == "max_output_tokens" {
                fragments.push(display::max_tokens_hint(self.settings.max_output_tokens));
            }
        }

        let tools = response.tools_used();
        if !tools.is_empty() {
            fragments.push(display::tools_used_note(&tools));
        }

        let Some(usage) = response.usage.as_ref() else {
            if self.settings.show_token_stats {
                fragments.push(display::USAGE_UNAVAILABLE.to_string());
            }
            return fragments;
        };

        let tokens = usage.token_counts();
        let current_cost = pricing::calculate_cost(model_id, tokens);
        if pricing::pricing_for(model_id).is_some() {
            self.ledger.record(conv_id, current_cost, tokens);
        }

        if self.settings.show_token_stats {
            let totals = if self.settings.show_cumulative_cost {
                self.ledger.snapshot(conv_id)
            } else {
                None
            };
            fragments.push(display::format_token_stats(&TokenStats {
                usage,
                current_cost,
                totals: totals.as_ref(),
                incomplete_reason,
            }));
        }

        fragments
    }

    fn report(&self, err: PipeError) -> String {
        if err.is_unexpected() {
            error!(error = ?err, "Pipeline error");
        } else {
            warn!(error = %err, "Turn failed");
        }
        err.to_fragment()
    }
}
