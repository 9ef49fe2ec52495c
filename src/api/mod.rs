// Request-layer collaborator: authenticated REST calls for every
// locally-initiated mutation. Nothing in here touches client state.

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{Contact, Message, MessageDraft};
use crate::session::Preferences;
use crate::transport::MessageEnvelope;

pub mod http;
pub mod token;

pub use http::HttpChatApi;
pub use token::{TokenError, TokenMinter};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("could not mint bearer token: {0}")]
    Token(#[from] TokenError),
}

impl ApiError {
    /// Message the server attached to a rejection, if any.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            ApiError::Rejected { message, .. } if !message.is_empty() => Some(message),
            _ => None,
        }
    }
}

#[async_trait]
pub trait ChatApi: Send + Sync {
    async fn contacts(&self) -> Result<Vec<Contact>, ApiError>;

    /// Full conversation between the local user and `contact_id`, oldest first.
    async fn messages(&self, contact_id: &str) -> Result<Vec<Message>, ApiError>;

    async fn create_contact(&self, email: &str) -> Result<Contact, ApiError>;

    async fn create_message(&self, receiver_id: &str, draft: &MessageDraft) -> Result<MessageEnvelope, ApiError>;

    async fn edit_message(&self, message_id: &str, text: &str) -> Result<Message, ApiError>;

    async fn delete_message(&self, message_id: &str) -> Result<Message, ApiError>;

    async fn react(&self, message_id: &str, reaction: &str) -> Result<Message, ApiError>;

    /// Returns the messages the server actually marked read.
    async fn read_messages(&self, messages: &[Message]) -> Result<Vec<Message>, ApiError>;

    async fn update_profile(&self, prefs: &Preferences) -> Result<(), ApiError>;
}
