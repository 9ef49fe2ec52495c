// Send: a new message lands in the timeline and becomes the directory preview

use log::debug;

use super::{ChatEngine, Effect};
use crate::transport::{MessageEnvelope, OutboundIntent};

impl ChatEngine {
    /// Our create request succeeded.
    pub fn message_sent(&mut self, envelope: MessageEnvelope) {
        let peer = self.peer_id(&envelope.message);
        debug!("Message {} sent to {}", envelope.message.id, peer);

        if self.is_open(&peer) {
            self.timeline.append(envelope.message.clone());
        }
        self.directory.upsert_last_message(&peer, envelope.message.clone(), true);
        self.effect(Effect::ComposerReset);

        let sound = (!envelope.sender.muted).then(|| envelope.sender.sending_sound.clone());
        self.emit(OutboundIntent::SendMessage(envelope));
        if let Some(sound) = sound {
            self.effect(Effect::PlaySound(sound));
        }
    }

    /// The hub delivered a message for one of our conversations.
    pub(crate) fn remote_message(&mut self, envelope: MessageEnvelope) {
        self.typing.clear();

        let MessageEnvelope { message, sender, receiver } = envelope;
        let peer = self.peer_id(&message);
        let open = self.is_open(&peer);
        debug!("Inbound message {} for conversation {} (open: {})", message.id, peer, open);

        if open {
            self.timeline.append(message.clone());
        }
        self.directory.upsert_last_message(&peer, message, open);

        // Echoes of our own sends from another session stay silent
        if sender.id != self.me() {
            self.effect(Effect::NewMessage { from: sender.handle().to_string() });
            if !receiver.muted {
                self.effect(Effect::PlaySound(receiver.notification_sound));
            }
        }
    }
}
