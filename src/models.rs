use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

pub type ContactId = String;
pub type MessageId = String;

/// A peer (or the local user) as the server describes it.
///
/// `last_message` is a by-value copy of the newest message of the conversation
/// with this contact and is only ever changed explicitly by the reconciliation
/// rules, never through a live reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    #[serde(rename = "_id", alias = "id")]
    pub id: ContactId,
    pub email: String,
    #[serde(default)]
    pub verified: bool,
    #[serde(default)]
    pub muted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "empty_as_none")]
    pub avatar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "empty_as_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "empty_as_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "empty_as_none")]
    pub bio: Option<String>,
    #[serde(default)]
    pub notification_sound: String,
    #[serde(default)]
    pub sending_sound: String,
    #[serde(default)]
    pub last_message: Option<Box<Message>>,
}

impl Contact {
    pub fn new(id: impl Into<String>, email: impl Into<String>) -> Self {
        Contact {
            id: id.into(),
            email: email.into(),
            verified: false,
            muted: false,
            avatar: None,
            first_name: None,
            last_name: None,
            bio: None,
            notification_sound: String::new(),
            sending_sound: String::new(),
            last_message: None,
        }
    }

    /// Display handle: the local part of the email address.
    pub fn handle(&self) -> &str {
        self.email.split('@').next().unwrap_or(&self.email)
    }

    pub fn display_name(&self) -> String {
        match (&self.first_name, &self.last_name) {
            (Some(first), Some(last)) => format!("{} {}", first, last),
            (Some(first), None) => first.clone(),
            (None, Some(last)) => last.clone(),
            (None, None) => self.handle().to_string(),
        }
    }

    /// Sort key used by the contact list: newest `lastMessage.updatedAt` first.
    pub fn last_activity(&self) -> Option<DateTime<Utc>> {
        self.last_message.as_ref().map(|m| m.updated_at)
    }
}

/// Delivery status of a message. Ordered so that merges can keep the maximum;
/// a message never goes back from `Read` to `Sent`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    #[default]
    Sent,
    Read,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    #[serde(rename = "_id", alias = "id")]
    pub id: MessageId,
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "empty_as_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "empty_as_none")]
    pub reaction: Option<String>,
    pub sender: Contact,
    pub receiver: Contact,
    #[serde(default)]
    pub status: MessageStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Message {
    pub fn has_image(&self) -> bool {
        self.image.is_some()
    }

    pub fn is_read(&self) -> bool {
        self.status == MessageStatus::Read
    }

    /// One-way transition to `Read`. Returns true if the status changed.
    pub fn mark_read(&mut self) -> bool {
        if self.is_read() {
            return false;
        }
        self.status = MessageStatus::Read;
        true
    }

    /// The other party of this message as seen from `me`.
    pub fn peer_of(&self, me: &str) -> &Contact {
        if self.sender.id == me {
            &self.receiver
        } else {
            &self.sender
        }
    }

    /// True if the message belongs to the conversation between `a` and `b`, in either direction.
    pub fn is_between(&self, a: &str, b: &str) -> bool {
        (self.sender.id == a && self.receiver.id == b) || (self.sender.id == b && self.receiver.id == a)
    }

    /// Editing is offered on our own text messages only.
    pub fn is_editable_by(&self, me: &str) -> bool {
        self.sender.id == me && !self.has_image()
    }

    pub fn is_deletable_by(&self, me: &str) -> bool {
        self.sender.id == me
    }
}

/// Composer contents submitted by the user.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MessageDraft {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

#[derive(Debug, Error, PartialEq)]
pub enum DraftError {
    #[error("a message needs text or an image")]
    Empty,
}

impl MessageDraft {
    pub fn text(text: impl Into<String>) -> Self {
        MessageDraft { text: text.into(), image: None }
    }

    pub fn with_image(mut self, url: impl Into<String>) -> Self {
        let url = url.into();
        self.image = if url.is_empty() { None } else { Some(url) };
        self
    }

    pub fn validate(&self) -> Result<(), DraftError> {
        if self.text.trim().is_empty() && self.image.is_none() {
            return Err(DraftError::Empty);
        }
        Ok(())
    }
}

// The server sends "" for unset optional strings
fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.is_empty()))
}
