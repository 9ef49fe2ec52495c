// Ephemeral "peer is typing" signal. One record for the whole client: it only
// ever describes the conversation that is currently open.

use log::debug;

use crate::models::Contact;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TypingState {
    pub sender: Option<Contact>,
    pub message: String,
}

#[derive(Debug, Default)]
pub struct TypingIndicator {
    state: TypingState,
}

impl TypingIndicator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_typing(&mut self, state: TypingState) {
        self.state = state;
    }

    /// Accept a peer's draft only if it comes from the open conversation.
    /// Returns false when the event was dropped.
    pub fn observe(&mut self, sender: Contact, message: String, active: Option<&str>) -> bool {
        if active != Some(sender.id.as_str()) {
            debug!("Dropping typing event from {} (not the open conversation)", sender.id);
            return false;
        }
        self.set_typing(TypingState { sender: Some(sender), message });
        true
    }

    pub fn clear(&mut self) {
        self.state = TypingState::default();
    }

    pub fn current(&self) -> &TypingState {
        &self.state
    }

    pub fn is_typing(&self) -> bool {
        self.state.sender.is_some()
    }
}
