//! Chat-host adapter for OpenAI's `o1-pro` and `o3-pro` reasoning models.
//!
//! The host hands over a chat body (model id + message history) and a user;
//! the [`Pipe`] translates the history into a Responses API request, makes a
//! single non-streamed call and yields display fragments back: a progress
//! notice, the answer, and optional truncation, tool and usage/cost notes.
//!
//! Cost is tracked per conversation. A conversation is identified by the user
//! and the opening of its first user message, so totals accumulate across
//! turns of the same chat for the life of the process.
//!
//! # Example
//!
//! ```rust,ignore
//! use futures::StreamExt;
//! use pipe::{ChatBody, HostMessage, HostUser, Pipe, Settings};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let settings = Settings::default().with_api_keys("sk-one,sk-two");
//!     let pipe = Pipe::new(settings)?;
//!
//!     let body = ChatBody::new("openai_pipe.o3-pro", vec![
//!         HostMessage::user("Prove that there are infinitely many primes."),
//!     ]);
//!
//!     let mut fragments = Box::pin(pipe.pipe(body, HostUser::new("user-1")));
//!     while let Some(fragment) = fragments.next().await {
//!         print!("{}", fragment);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod adapter;
pub mod client;
pub mod config;
pub mod conversation;
pub mod credentials;
pub mod display;
pub mod error;
pub mod messages;
pub mod pricing;
pub mod response;

// Re-export commonly used types
pub use adapter::{ModelEntry, Pipe};
pub use client::{ResponsesClient, ResponsesRequest};
pub use config::{ConfigLoader, LoggingConfig, PipeConfig, Settings};
pub use conversation::{
    derive_conversation_id, ConversationAccount, ConversationLedger, TokenCounts,
};
pub use credentials::CredentialRotator;
pub use error::{PipeError, Result};
pub use messages::{
    translate_messages, ChatBody, ContentSegment, HostMessage, HostUser, InputItem, Role,
};
pub use response::{ResponsesResponse, Usage};
