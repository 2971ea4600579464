//! Conversation identification and per-conversation cost accounting.
//!
//! A conversation is identified by the user id plus the first 50 characters
//! of the first user message, so the id stays stable while the history
//! grows. Two conversations by the same user that open with the same 50
//! characters share an id and therefore share their totals.

use crate::messages::{HostMessage, HostUser};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use tracing::{debug, info};

/// Number of characters of the first user message that feed the id.
pub const CONVERSATION_KEY_CHARS: usize = 50;

/// Stand-in text when the history holds no user message.
const NO_MESSAGE_PLACEHOLDER: &str = "no_message";

/// Derive the conversation id for a message history.
///
/// Returns `conv_{user_id}_{hash}` where `hash` is the first 16 hex digits of
/// the SHA-256 of `"{user_id}_{first 50 chars of the first user message}"`.
pub fn derive_conversation_id(messages: &[HostMessage], user: &HostUser) -> String {
    let first_user_message = messages
        .iter()
        .find(|message| message.is_user())
        .map(HostMessage::plain_text)
        .filter(|text| !text.is_empty())
        .unwrap_or_else(|| NO_MESSAGE_PLACEHOLDER.to_string());

    let message_key: String = first_user_message
        .chars()
        .take(CONVERSATION_KEY_CHARS)
        .collect();

    let mut hasher = Sha256::new();
    hasher.update(format!("{}_{}", user.id, message_key).as_bytes());
    let digest = format!("{:x}", hasher.finalize());

    let conv_id = format!("conv_{}_{}", user.id, &digest[..16]);

    let user_messages = messages.iter().filter(|m| m.is_user()).count();
    let preview: String = message_key.chars().take(30).collect();
    debug!(
        conversation = %conv_id,
        user_messages,
        preview = %preview,
        "Derived conversation id"
    );

    conv_id
}

/// Token counts for one completed turn.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenCounts {
    /// Prompt tokens.
    pub input: u64,
    /// Completion tokens.
    pub output: u64,
    /// Reasoning tokens reported separately by the API.
    pub reasoning: u64,
}

/// Accumulated usage for one conversation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversationAccount {
    /// Total cost in USD.
    pub total_cost: f64,
    /// Total prompt tokens.
    pub total_input_tokens: u64,
    /// Total completion tokens.
    pub total_output_tokens: u64,
    /// Total reasoning tokens.
    pub total_reasoning_tokens: u64,
    /// Number of completed turns.
    pub message_count: u64,
}

impl ConversationAccount {
    fn add(&mut self, cost: f64, tokens: TokenCounts) {
        self.total_cost += cost;
        self.total_input_tokens += tokens.input;
        self.total_output_tokens += tokens.output;
        self.total_reasoning_tokens += tokens.reasoning;
        self.message_count += 1;
    }
}

/// Process-wide ledger of conversation accounts.
///
/// Accounts are created on first update and never removed, so the ledger
/// grows with the number of distinct conversations for the life of the
/// process.
#[derive(Debug, Default)]
pub struct ConversationLedger {
    accounts: Mutex<HashMap<String, ConversationAccount>>,
    verbose: bool,
}

impl ConversationLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a ledger that logs every update at info level.
    pub fn with_verbose_logging(verbose: bool) -> Self {
        Self {
            accounts: Mutex::new(HashMap::new()),
            verbose,
        }
    }

    /// Add one turn's cost and tokens to a conversation.
    ///
    /// Updates are additive: recording the same usage twice counts it twice.
    /// Returns the account after the update.
    pub fn record(&self, conv_id: &str, cost: f64, tokens: TokenCounts) -> ConversationAccount {
        let mut accounts = self.accounts.lock();
        let account = accounts.entry(conv_id.to_string()).or_default();
        account.add(cost, tokens);
        let updated = account.clone();
        drop(accounts);

        if self.verbose {
            info!(
                conversation = %conv_id,
                total_cost = updated.total_cost,
                messages = updated.message_count,
                "Updated conversation totals"
            );
        } else {
            debug!(
                conversation = %conv_id,
                total_cost = updated.total_cost,
                messages = updated.message_count,
                "Updated conversation totals"
            );
        }

        updated
    }

    /// Copy of a conversation's account, if it has one.
    pub fn snapshot(&self, conv_id: &str) -> Option<ConversationAccount> {
        self.accounts.lock().get(conv_id).cloned()
    }

    /// Number of completed turns recorded for a conversation.
    pub fn message_count(&self, conv_id: &str) -> u64 {
        self.accounts
            .lock()
            .get(conv_id)
            .map_or(0, |account| account.message_count)
    }

    /// Number of tracked conversations.
    pub fn len(&self) -> usize {
        self.accounts.lock().len()
    }

    /// Whether no conversation has been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.accounts.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn history(first: &str, rest: &[&str]) -> Vec<HostMessage> {
        let mut messages = vec![HostMessage::system("sys"), HostMessage::user(first)];
        for (i, text) in rest.iter().enumerate() {
            if i % 2 == 0 {
                messages.push(HostMessage::assistant(*text));
            } else {
                messages.push(HostMessage::user(*text));
            }
        }
        messages
    }

    #[test]
    fn test_id_format() {
        let id = derive_conversation_id(&history("hello", &[]), &HostUser::new("u1"));
        assert!(id.starts_with("conv_u1_"));
        let digest = id.trim_start_matches("conv_u1_");
        assert_eq!(digest.len(), 16);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_id_matches_sha256_of_user_and_prefix() {
        let id = derive_conversation_id(&[HostMessage::user("hello")], &HostUser::new("u1"));
        let expected = format!("{:x}", Sha256::digest(b"u1_hello"));
        assert_eq!(id, format!("conv_u1_{}", &expected[..16]));
    }

    #[test]
    fn test_id_stable_as_history_grows() {
        let user = HostUser::new("alice");
        let first = derive_conversation_id(&history("What is Rust?", &[]), &user);
        let later = derive_conversation_id(
            &history("What is Rust?", &["A language.", "Tell me more", "Sure."]),
            &user,
        );
        assert_eq!(first, later);
    }

    #[test]
    fn test_id_differs_between_users() {
        let messages = history("identical", &["same"]);
        let a = derive_conversation_id(&messages, &HostUser::new("alice"));
        let b = derive_conversation_id(&messages, &HostUser::new("bob"));
        assert_ne!(a, b);
    }

    #[test]
    fn test_shared_fifty_char_prefix_collides() {
        let prefix = "x".repeat(50);
        let user = HostUser::new("u");
        let a = derive_conversation_id(&[HostMessage::user(format!("{prefix} first"))], &user);
        let b = derive_conversation_id(&[HostMessage::user(format!("{prefix} second"))], &user);
        assert_eq!(a, b);
    }

    #[test]
    fn test_truncation_counts_characters() {
        let user = HostUser::new("u");
        let long = "é".repeat(60);
        let short = "é".repeat(50);
        assert_eq!(
            derive_conversation_id(&[HostMessage::user(long)], &user),
            derive_conversation_id(&[HostMessage::user(short)], &user)
        );
    }

    #[test]
    fn test_missing_user_message_uses_placeholder() {
        let user = HostUser::new("u");
        let none = derive_conversation_id(&[HostMessage::system("only system")], &user);
        let placeholder = derive_conversation_id(&[HostMessage::user("no_message")], &user);
        assert_eq!(none, placeholder);
    }

    #[test]
    fn test_multipart_first_message() {
        let user = HostUser::new("u");
        let parts = HostMessage::user_parts(vec![
            json!({"type": "text", "text": "a"}),
            json!({"type": "image_url", "image_url": {"url": "http://x"}}),
            json!({"type": "text", "text": "b"}),
        ]);
        assert_eq!(
            derive_conversation_id(&[parts], &user),
            derive_conversation_id(&[HostMessage::user("a b")], &user)
        );
    }

    #[test]
    fn test_record_is_additive() {
        let ledger = ConversationLedger::new();
        let tokens = TokenCounts {
            input: 10,
            output: 20,
            reasoning: 5,
        };

        ledger.record("conv", 1.0, tokens);
        let account = ledger.record("conv", 1.0, tokens);

        assert_eq!(account.total_cost, 2.0);
        assert_eq!(account.message_count, 2);
        assert_eq!(account.total_input_tokens, 20);
        assert_eq!(account.total_output_tokens, 40);
        assert_eq!(account.total_reasoning_tokens, 10);
        assert_eq!(ledger.snapshot("conv"), Some(account));
    }

    #[test]
    fn test_accounts_created_lazily() {
        let ledger = ConversationLedger::new();
        assert!(ledger.is_empty());
        assert_eq!(ledger.snapshot("missing"), None);
        assert_eq!(ledger.message_count("missing"), 0);

        ledger.record("a", 0.5, TokenCounts::default());
        ledger.record("b", 0.5, TokenCounts::default());
        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger.message_count("a"), 1);
    }

    proptest! {
        #[test]
        fn prop_id_ignores_later_messages(
            user in "[a-z0-9]{1,12}",
            first in "[ -~]{0,80}",
            tail_a in proptest::collection::vec("[ -~]{0,40}", 0..4),
            tail_b in proptest::collection::vec("[ -~]{0,40}", 0..4),
        ) {
            let user = HostUser::new(user);
            let mut a = vec![HostMessage::user(first.clone())];
            a.extend(tail_a.iter().map(|t| HostMessage::assistant(t.clone())));
            let mut b = vec![HostMessage::user(first)];
            b.extend(tail_b.iter().map(|t| HostMessage::user(t.clone())));

            prop_assert_eq!(derive_conversation_id(&a, &user), derive_conversation_id(&b, &user));
        }
    }
}
