// Read receipts: one-way `sent -> read` transitions on the timeline.
// The directory preview is not touched here.

use log::debug;

use super::ChatEngine;
use crate::models::{Message, MessageId};
use crate::transport::{OutboundIntent, ReadPayload, ReadReceipt};

impl ChatEngine {
    /// The server confirmed `confirmed` as read. Only those entries flip.
    pub fn messages_read(&mut self, confirmed: Vec<Message>) {
        let Some(first) = confirmed.first() else {
            return;
        };
        let peer = first.peer_of(self.me()).clone();
        let ids: Vec<MessageId> = confirmed.iter().map(|m| m.id.clone()).collect();
        let changed = self.timeline.mark_read(&ids);
        debug!("Marked {} of {} confirmed messages read", changed, ids.len());

        let receiver = self.directory.get(&peer.id).cloned().unwrap_or(peer);
        self.emit(OutboundIntent::ReadMessages(ReadReceipt { receiver, messages: confirmed }));
    }

    /// A peer read some of our messages.
    pub(crate) fn remote_read(&mut self, payload: ReadPayload) {
        let ids: Vec<MessageId> = payload.into_messages().into_iter().map(|m| m.id).collect();
        self.timeline.mark_read(&ids);
    }
}
