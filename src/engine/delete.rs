// Delete: hard removal from the timeline; the directory preview falls back to
// the new tail of the conversation.
//
// The receiving side recomputes from its own timeline whenever the sender's
// conversation is open. The deleter's snapshot is only consulted for the
// preview of a conversation the receiver has not loaded, and it never
// replaces the receiver's timeline.

use log::debug;

use super::ChatEngine;
use crate::models::Message;
use crate::transport::{MessageDeletion, OutboundIntent};

impl ChatEngine {
    /// Our delete request succeeded; `message` is the deleted message.
    ///
    /// If its conversation is no longer open the new tail is unknown here, so
    /// the preview is left alone. The runtime fetches the conversation and
    /// calls `message_deleted_with_history` instead when it can.
    pub fn message_deleted(&mut self, message: Message) {
        let peer = self.peer_id(&message);
        self.timeline.remove(&message.id);

        let remaining = if self.is_open(&peer) {
            let remaining = self.timeline.messages().to_vec();
            self.directory.reconcile_on_delete(&peer, &message.id, remaining.last().cloned());
            remaining
        } else {
            debug!("Deleted {} after leaving conversation {}, preview kept", message.id, peer);
            self.known_tail(&peer, &message.id).into_iter().collect()
        };
        self.announce_delete(&peer, message, remaining);
    }

    /// Our delete succeeded in a conversation that is not open; `remaining`
    /// is that conversation as the server has it now.
    pub fn message_deleted_with_history(&mut self, message: Message, remaining: Vec<Message>) {
        let peer = self.peer_id(&message);
        if self.is_open(&peer) {
            self.message_deleted(message);
            return;
        }
        let remaining: Vec<Message> = remaining.into_iter().filter(|m| m.id != message.id).collect();
        self.directory.reconcile_on_delete(&peer, &message.id, remaining.last().cloned());
        self.announce_delete(&peer, message, remaining);
    }

    /// The preview of `peer`, unless it is the message being deleted.
    fn known_tail(&self, peer: &str, deleted_id: &str) -> Option<Message> {
        self.directory
            .get(peer)
            .and_then(|c| c.last_message.as_deref())
            .filter(|m| m.id != deleted_id)
            .cloned()
    }

    fn announce_delete(&mut self, peer: &str, message: Message, remaining: Vec<Message>) {
        if self.editing.as_ref().map(|m| m.id == message.id).unwrap_or(false) {
            self.editing = None;
        }
        self.emit(OutboundIntent::DeleteMessage(MessageDeletion {
            receiver: self.directory.get(peer).cloned(),
            sender: self.session.user().clone(),
            message,
            filtered_messages: remaining,
        }));
    }

    /// A peer deleted a message.
    pub(crate) fn remote_delete(&mut self, deletion: MessageDeletion) {
        let MessageDeletion { message, filtered_messages, .. } = deletion;
        let peer = self.peer_id(&message);

        self.timeline.remove(&message.id);
        let fallback = if self.is_open(&peer) {
            self.timeline.tail().cloned()
        } else {
            filtered_messages.into_iter().last()
        };
        self.directory.reconcile_on_delete(&peer, &message.id, fallback);
    }
}
