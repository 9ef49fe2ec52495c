// Realtime hub transport
// Wire events, the JSON envelope codec, and the websocket connection task.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::models::{Contact, ContactId, Message};

pub mod connection;

pub use connection::{spawn_hub_connection, HubConfig};

/// `sendMessage`: the created message plus fresh snapshots of both parties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageEnvelope {
    pub message: Message,
    pub sender: Contact,
    pub receiver: Contact,
}

/// `updateMessage`: an edit or a reaction, carrying the full updated message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageUpdate {
    pub message: Message,
    pub sender: Contact,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiver: Option<Contact>,
}

/// `deleteMessage`: the deleted message and the deleter's remaining timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageDeletion {
    pub message: Message,
    pub sender: Contact,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiver: Option<Contact>,
    #[serde(default)]
    pub filtered_messages: Vec<Message>,
}

/// `readMessages`: ids confirmed read by the server, addressed to `receiver`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadReceipt {
    pub receiver: Contact,
    pub messages: Vec<Message>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypingNotice {
    pub sender: Contact,
    pub receiver: Contact,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactCreated {
    pub current_user: Contact,
    pub receiver: Contact,
}

/// Read receipt as delivered: the intent shape, or the hub's bare list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReadPayload {
    Receipt(ReadReceipt),
    Bare(Vec<Message>),
}

impl ReadPayload {
    pub fn into_messages(self) -> Vec<Message> {
        match self {
            ReadPayload::Receipt(receipt) => receipt.messages,
            ReadPayload::Bare(messages) => messages,
        }
    }
}

/// Contact creation as delivered: the intent pair, or the hub's bare creator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CreatedPayload {
    Pair(ContactCreated),
    Bare(Contact),
}

impl CreatedPayload {
    /// The user who added the contact.
    pub fn into_creator(self) -> Contact {
        match self {
            CreatedPayload::Pair(created) => created.current_user,
            CreatedPayload::Bare(contact) => contact,
        }
    }
}

/// One entry of the hub's online roster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnlineEntry {
    #[serde(default)]
    pub contact_id: ContactId,
    #[serde(alias = "user")]
    pub contact: Contact,
}

/// Intents the client pushes to the hub so peers learn about a change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum OutboundIntent {
    #[serde(rename = "addOnlineUser")]
    AddOnlineUser(Contact),
    #[serde(rename = "createContact")]
    CreateContact(ContactCreated),
    #[serde(rename = "sendMessage")]
    SendMessage(MessageEnvelope),
    #[serde(rename = "updateMessage")]
    UpdateMessage(MessageUpdate),
    #[serde(rename = "deleteMessage")]
    DeleteMessage(MessageDeletion),
    #[serde(rename = "readMessages")]
    ReadMessages(ReadReceipt),
    #[serde(rename = "typing")]
    Typing(TypingNotice),
}

impl OutboundIntent {
    pub fn name(&self) -> &'static str {
        match self {
            OutboundIntent::AddOnlineUser(_) => "addOnlineUser",
            OutboundIntent::CreateContact(_) => "createContact",
            OutboundIntent::SendMessage(_) => "sendMessage",
            OutboundIntent::UpdateMessage(_) => "updateMessage",
            OutboundIntent::DeleteMessage(_) => "deleteMessage",
            OutboundIntent::ReadMessages(_) => "readMessages",
            OutboundIntent::Typing(_) => "typing",
        }
    }
}

/// Events the hub delivers. Both the intent names and the hub's relayed
/// `get*` names are accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum InboundEvent {
    #[serde(rename = "sendMessage", alias = "getNewMessage")]
    Sent(MessageEnvelope),
    #[serde(rename = "updateMessage", alias = "getUpdateMessage")]
    Edited(MessageUpdate),
    #[serde(rename = "deleteMessage", alias = "getDeletedMessage")]
    Deleted(MessageDeletion),
    #[serde(rename = "readMessages", alias = "getReadMessages")]
    Read(ReadPayload),
    #[serde(rename = "typing", alias = "getTyping")]
    Typing(TypingNotice),
    #[serde(rename = "createContact", alias = "getCreatedUser")]
    ContactCreated(CreatedPayload),
    #[serde(rename = "getOnlineUsers")]
    PresenceSnapshot(Vec<OnlineEntry>),
}

/// What the connection task reports to the runtime.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    Connected,
    Disconnected,
    Inbound(InboundEvent),
}

pub fn encode_intent(intent: &OutboundIntent) -> serde_json::Result<String> {
    serde_json::to_string(intent)
}

/// Decode one text frame. Malformed frames and unknown events yield `None`.
pub fn decode_event(frame: &str) -> Option<InboundEvent> {
    match serde_json::from_str(frame) {
        Ok(event) => Some(event),
        Err(e) => {
            debug!("Dropping undecodable hub frame: {}", e);
            None
        }
    }
}
