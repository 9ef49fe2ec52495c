// Conversation timeline: the ordered, id-deduplicated messages exchanged with
// the selected peer. Server order is kept; nothing here re-sorts.

use log::debug;
use std::collections::HashSet;

use crate::models::{ContactId, Message, MessageId};

#[derive(Debug, Default)]
pub struct Timeline {
    peer: Option<ContactId>,
    messages: Vec<Message>,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Peer whose conversation this timeline holds, if one has been loaded.
    pub fn peer(&self) -> Option<&str> {
        self.peer.as_deref()
    }

    /// Replace the whole timeline with a server-fetched list for `peer`.
    ///
    /// Messages that do not involve `peer` are discarded, and repeated ids keep
    /// their first occurrence.
    pub fn load(&mut self, peer: &str, messages: Vec<Message>) {
        let mut seen = HashSet::new();
        let fetched = messages.len();
        self.messages = messages
            .into_iter()
            .filter(|m| m.sender.id == peer || m.receiver.id == peer)
            .filter(|m| seen.insert(m.id.clone()))
            .collect();
        self.peer = Some(peer.to_string());
        if self.messages.len() != fetched {
            debug!("Timeline load for {} kept {}/{} messages", peer, self.messages.len(), fetched);
        }
    }

    pub fn clear(&mut self) {
        self.peer = None;
        self.messages.clear();
    }

    /// Append at the tail unless the id is already present.
    pub fn append(&mut self, message: Message) -> bool {
        if self.contains(&message.id) {
            debug!("Message {} already in timeline, skipping", message.id);
            return false;
        }
        self.messages.push(message);
        true
    }

    pub fn apply_edit(&mut self, id: &str, text: &str) -> bool {
        match self.get_mut(id) {
            Some(message) => {
                message.text = text.to_string();
                true
            }
            None => false,
        }
    }

    pub fn apply_reaction(&mut self, id: &str, reaction: Option<String>) -> bool {
        match self.get_mut(id) {
            Some(message) => {
                message.reaction = reaction;
                true
            }
            None => false,
        }
    }

    /// Take both mutable fields (text and reaction) from an updated copy.
    pub fn apply_update(&mut self, updated: &Message) -> bool {
        match self.get_mut(&updated.id) {
            Some(message) => {
                message.text = updated.text.clone();
                message.reaction = updated.reaction.clone();
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, id: &str) -> Option<Message> {
        let idx = self.messages.iter().position(|m| m.id == id)?;
        Some(self.messages.remove(idx))
    }

    /// Flip every listed message to `Read`. Returns how many actually changed.
    pub fn mark_read(&mut self, ids: &[MessageId]) -> usize {
        let ids: HashSet<&str> = ids.iter().map(String::as_str).collect();
        self.messages
            .iter_mut()
            .filter(|m| ids.contains(m.id.as_str()))
            .map(|m| m.mark_read())
            .filter(|changed| *changed)
            .count()
    }

    /// Messages addressed to `me` that have not been read yet.
    pub fn unread_received(&self, me: &str) -> Vec<Message> {
        self.messages
            .iter()
            .filter(|m| m.receiver.id == me && !m.is_read())
            .cloned()
            .collect()
    }

    pub fn tail(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn get(&self, id: &str) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == id)
    }

    fn get_mut(&mut self, id: &str) -> Option<&mut Message> {
        self.messages.iter_mut().find(|m| m.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
