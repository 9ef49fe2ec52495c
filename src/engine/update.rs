// Edit and react: in-place changes to an existing message.
// The remote path has no open-conversation guard so directory previews stay correct.

use log::debug;

use super::{ChatEngine, Effect};
use crate::models::Message;
use crate::transport::{MessageUpdate, OutboundIntent};

impl ChatEngine {
    /// Our edit request succeeded; `message` is the server's updated copy.
    pub fn message_edited(&mut self, message: Message) {
        let peer = self.peer_id(&message);
        self.timeline.apply_edit(&message.id, &message.text);
        self.directory.reconcile_on_update(&peer, &message);
        self.editing = None;
        self.effect(Effect::ComposerReset);
        self.broadcast_update(message);
    }

    /// Our reaction request succeeded.
    pub fn reaction_set(&mut self, message: Message) {
        let peer = self.peer_id(&message);
        self.timeline.apply_reaction(&message.id, message.reaction.clone());
        self.directory.reconcile_on_update(&peer, &message);
        self.broadcast_update(message);
    }

    /// A peer edited or reacted to a message.
    pub(crate) fn remote_update(&mut self, update: MessageUpdate) {
        self.typing.clear();

        let message = update.message;
        let peer = self.peer_id(&message);
        if !self.timeline.apply_update(&message) {
            debug!("Updated message {} is not in the open timeline", message.id);
        }
        self.directory.reconcile_on_update(&peer, &message);
    }

    fn broadcast_update(&self, message: Message) {
        let receiver = self.directory.get(&self.peer_id(&message)).cloned();
        self.emit(OutboundIntent::UpdateMessage(MessageUpdate {
            message,
            sender: self.session.user().clone(),
            receiver,
        }));
    }
}
