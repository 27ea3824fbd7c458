//! Chat-completion provider boundary.
//!
//! Components never call the provider directly; they go through [`ChatClient`], which keeps
//! the summarizer and email composer testable without a network. Their outcome is a
//! [`Completion`]: callers that only need something to persist take [`Completion::text`],
//! callers that care branch on [`Completion::kind`].

mod openai;

pub use openai::OpenAiChatClient;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::config::LlmSettings;

/// Errors surfaced by a chat-completion provider.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LlmError {
    /// Provider could not be reached.
    #[error("Language model provider unavailable: {0}")]
    ProviderUnavailable(String),
    /// Request exceeded the configured timeout.
    #[error("Language model request timed out: {0}")]
    Timeout(String),
    /// Credential was rejected.
    #[error("Language model credential rejected: {0}")]
    Unauthorized(String),
    /// Provider returned an error response.
    #[error("Failed to generate completion: {0}")]
    GenerationFailed(String),
    /// Provider response could not be parsed.
    #[error("Malformed provider response: {0}")]
    InvalidResponse(String),
}

/// Speaker of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    /// Instructions that frame the model's behavior.
    System,
    /// The end-user turn.
    User,
}

/// One role-tagged chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    /// Speaker of the message.
    pub role: ChatRole,
    /// Message body.
    pub content: String,
}

impl ChatMessage {
    /// System message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    /// User message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }
}

/// Request passed to a [`ChatClient`].
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    /// Conversation to complete.
    pub messages: Vec<ChatMessage>,
    /// Upper bound on generated tokens.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f32,
}

/// Interface implemented by chat-completion providers.
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Complete the conversation and return the generated text.
    async fn complete(&self, request: ChatRequest) -> Result<String, LlmError>;
}

/// Build a provider client when a live credential is configured.
pub fn chat_client_from_settings(settings: &LlmSettings) -> Option<Box<dyn ChatClient>> {
    let api_key = settings.api_key.clone()?;
    Some(Box::new(OpenAiChatClient::new(
        settings.base_url.clone(),
        api_key,
        settings.model.clone(),
        settings.timeout,
    )))
}

/// Discriminant of a [`Completion`], exposed to API consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionKind {
    /// Text came from the provider.
    Generated,
    /// No credential configured; canned demo text.
    Demo,
    /// Provider call failed; text is a readable error message.
    Failed,
}

/// Outcome of a model-backed operation. Always carries text that can be persisted.
#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    /// Provider response, verbatim.
    Generated(String),
    /// Demo-mode output.
    Demo(String),
    /// Provider failure with the message shown in place of the result.
    Failed {
        /// Typed failure reason.
        error: LlmError,
        /// Human-readable message.
        message: String,
    },
}

impl Completion {
    /// Wrap a provider result, rendering failures as `"{context}: {error}"`.
    pub fn from_provider(result: Result<String, LlmError>, context: &str) -> Self {
        match result {
            Ok(text) => Self::Generated(text),
            Err(error) => {
                tracing::warn!(error = %error, "{context}");
                let message = format!("{context}: {error}");
                Self::Failed { error, message }
            }
        }
    }

    /// Text to show or persist.
    pub fn text(&self) -> &str {
        match self {
            Self::Generated(text) | Self::Demo(text) => text,
            Self::Failed { message, .. } => message,
        }
    }

    /// Consume into the text to show or persist.
    pub fn into_text(self) -> String {
        match self {
            Self::Generated(text) | Self::Demo(text) => text,
            Self::Failed { message, .. } => message,
        }
    }

    /// Discriminant.
    pub fn kind(&self) -> CompletionKind {
        match self {
            Self::Generated(_) => CompletionKind::Generated,
            Self::Demo(_) => CompletionKind::Demo,
            Self::Failed { .. } => CompletionKind::Failed,
        }
    }

    /// Whether the provider call failed.
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}
