// Completion service trait - the external model the chat session talks to
use crate::domain::chat::{Message, Role};
use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

/// Role vocabulary of the completion service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextRole {
    User,
    Model,
}

impl From<Role> for ContextRole {
    fn from(role: Role) -> Self {
        match role {
            Role::User => ContextRole::User,
            Role::Assistant => ContextRole::Model,
        }
    }
}

/// One prior turn, translated for the completion service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextTurn {
    pub role: ContextRole,
    pub text: String,
}

impl From<&Message> for ContextTurn {
    fn from(message: &Message) -> Self {
        Self {
            role: message.role.into(),
            text: message.content.clone(),
        }
    }
}

/// Any failure on the completion path. Callers treat every variant the same.
#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("completion request failed: {0}")]
    Transport(String),
    #[error("completion service returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("completion service rate limit exceeded: {0}")]
    RateLimited(String),
    #[error("malformed completion response: {0}")]
    MalformedResponse(String),
}

#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Ask the model for a reply to `prompt`, given the prior turns in `context`.
    async fn complete(&self, context: &[ContextTurn], prompt: &str) -> Result<String, CompletionError>;
}
