// Reconciliation engine
//
// Binds presence, typing, directory and timeline to outbound intents and
// inbound events. Every mutation kind has a local-confirmed handler (called
// after our own request succeeded) and a remote-observed handler (called for
// the hub's event describing the same change). Both must leave the timeline
// and directory in the same state for the same logical mutation.
//
// Handlers are synchronous and never await: the runtime calls them one at a
// time, so each handler's full effect is committed before the next one runs.

use log::{debug, info, warn};
use tokio::sync::mpsc;

use crate::api::ApiError;
use crate::models::{Contact, ContactId, Message};
use crate::session::{Preferences, SessionContext};
use crate::state::{ContactDirectory, PresenceTracker, Timeline, TypingIndicator};
use crate::transport::{InboundEvent, OutboundIntent};

pub mod contacts;
pub mod delete;
pub mod read;
pub mod send;
pub mod typing;
pub mod update;

/// Derived side effects for the front end.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Transient toast.
    Notice { level: NoticeLevel, text: String },
    /// Play the named sound.
    PlaySound(String),
    /// A peer sent us a message.
    NewMessage { from: String },
    /// The composer should be emptied.
    ComposerReset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

/// Locally-initiated request kinds, used to word failure notices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    LoadContacts,
    LoadMessages,
    AddContact,
    Send,
    Edit,
    React,
    Delete,
    MarkRead,
    UpdateProfile,
}

impl MutationKind {
    fn failure_notice(&self) -> &'static str {
        match self {
            MutationKind::LoadContacts => "Error getting contacts",
            MutationKind::LoadMessages => "Cannot get messages",
            MutationKind::AddContact => "Something went wrong",
            MutationKind::Send => "Cannot send message",
            MutationKind::Edit => "Cannot edit message",
            MutationKind::React => "Cannot send reaction to message",
            MutationKind::Delete => "Cannot delete message",
            MutationKind::MarkRead => "Cannot read messages",
            MutationKind::UpdateProfile => "Cannot update profile",
        }
    }
}

pub struct ChatEngine {
    session: SessionContext,
    selected: Option<Contact>,
    editing: Option<Message>,
    presence: PresenceTracker,
    typing: TypingIndicator,
    directory: ContactDirectory,
    timeline: Timeline,
    outbound: mpsc::UnboundedSender<OutboundIntent>,
    effects: mpsc::UnboundedSender<Effect>,
}

impl ChatEngine {
    pub fn new(
        session: SessionContext,
        outbound: mpsc::UnboundedSender<OutboundIntent>,
        effects: mpsc::UnboundedSender<Effect>,
    ) -> Self {
        ChatEngine {
            session,
            selected: None,
            editing: None,
            presence: PresenceTracker::new(),
            typing: TypingIndicator::new(),
            directory: ContactDirectory::new(),
            timeline: Timeline::new(),
            outbound,
            effects,
        }
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    pub fn me(&self) -> &str {
        self.session.id()
    }

    pub fn selected(&self) -> Option<&Contact> {
        self.selected.as_ref()
    }

    pub fn selected_id(&self) -> Option<&str> {
        self.selected.as_ref().map(|c| c.id.as_str())
    }

    pub fn editing(&self) -> Option<&Message> {
        self.editing.as_ref()
    }

    pub fn presence(&self) -> &PresenceTracker {
        &self.presence
    }

    pub fn typing(&self) -> &TypingIndicator {
        &self.typing
    }

    pub fn directory(&self) -> &ContactDirectory {
        &self.directory
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    /// Open the conversation with `contact`. Returns false if it is already open;
    /// otherwise the caller must fetch its timeline.
    pub fn select_contact(&mut self, contact: Contact) -> bool {
        if self.selected_id() == Some(contact.id.as_str()) {
            return false;
        }
        info!("Opening conversation with {}", contact.handle());
        self.timeline.clear();
        self.typing.clear();
        self.editing = None;
        self.selected = Some(contact);
        true
    }

    pub fn contacts_loaded(&mut self, contacts: Vec<Contact>) {
        info!("Loaded {} contacts", contacts.len());
        self.directory.load(contacts);
    }

    /// Install a fetched timeline. Results for a conversation that is no longer
    /// open are discarded.
    pub fn timeline_loaded(&mut self, peer: &ContactId, messages: Vec<Message>) -> bool {
        if self.selected_id() != Some(peer.as_str()) {
            debug!("Discarding stale timeline for {}", peer);
            return false;
        }
        self.timeline.load(peer, messages);
        self.directory.mark_preview_read(peer);
        true
    }

    /// Messages in the open timeline that we received and have not read.
    pub fn unread_received(&self) -> Vec<Message> {
        self.timeline.unread_received(self.session.id())
    }

    pub fn begin_edit(&mut self, message_id: &str) -> bool {
        match self.timeline.get(message_id) {
            Some(message) => {
                self.editing = Some(message.clone());
                true
            }
            None => false,
        }
    }

    pub fn cancel_edit(&mut self) {
        self.editing = None;
    }

    /// The hub connection (re)opened: announce ourselves.
    pub fn connected(&mut self) {
        self.emit(OutboundIntent::AddOnlineUser(self.session.user().clone()));
    }

    pub fn preferences_updated(&mut self, prefs: &Preferences) {
        self.session.apply_preferences(prefs);
        self.notice(NoticeLevel::Info, "Profile updated successfully");
    }

    /// A locally-initiated request failed: tell the user, change nothing.
    pub fn request_failed(&mut self, kind: MutationKind, error: &ApiError) {
        warn!("{:?} request failed: {}", kind, error);
        let text = match (kind, error.server_message()) {
            (MutationKind::AddContact, Some(message)) => message.to_string(),
            _ => kind.failure_notice().to_string(),
        };
        self.notice(NoticeLevel::Error, text);
    }

    /// Input refused before any request was made.
    pub fn input_rejected(&mut self, reason: &str) {
        debug!("Rejected input: {}", reason);
        self.notice(NoticeLevel::Error, reason);
    }

    /// Single entry point for everything the hub delivers.
    pub fn dispatch(&mut self, event: InboundEvent) {
        match event {
            InboundEvent::Sent(envelope) => self.remote_message(envelope),
            InboundEvent::Edited(update) => self.remote_update(update),
            InboundEvent::Deleted(deletion) => self.remote_delete(deletion),
            InboundEvent::Read(receipt) => self.remote_read(receipt),
            InboundEvent::Typing(notice) => self.remote_typing(notice),
            InboundEvent::ContactCreated(created) => self.remote_contact_created(created),
            InboundEvent::PresenceSnapshot(entries) => {
                self.presence.set_online(entries.into_iter().map(|e| e.contact));
            }
        }
    }

    /// The peer whose conversation `message` belongs to.
    fn peer_id(&self, message: &Message) -> ContactId {
        message.peer_of(self.session.id()).id.clone()
    }

    fn is_open(&self, peer: &str) -> bool {
        self.selected_id() == Some(peer)
    }

    fn emit(&self, intent: OutboundIntent) {
        let name = intent.name();
        if self.outbound.send(intent).is_err() {
            debug!("Transport gone, {} not delivered", name);
        }
    }

    fn effect(&self, effect: Effect) {
        if self.effects.send(effect).is_err() {
            debug!("No effect listener");
        }
    }

    fn notice(&self, level: NoticeLevel, text: impl Into<String>) {
        self.effect(Effect::Notice { level, text: text.into() });
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::state::test_support::contact;

    pub struct Harness {
        pub engine: ChatEngine,
        pub intents: mpsc::UnboundedReceiver<OutboundIntent>,
        pub effects: mpsc::UnboundedReceiver<Effect>,
    }

    impl Harness {
        pub fn new(me: &str) -> Self {
            let (out_tx, intents) = mpsc::unbounded_channel();
            let (fx_tx, effects) = mpsc::unbounded_channel();
            Harness {
                engine: ChatEngine::new(SessionContext::new(contact(me)), out_tx, fx_tx),
                intents,
                effects,
            }
        }

        /// Directory with the given peers, conversation with `open` loaded.
        pub fn with_conversation(me: &str, peers: &[&str], open: &str, messages: Vec<Message>) -> Self {
            let mut harness = Harness::new(me);
            harness.engine.contacts_loaded(peers.iter().map(|p| contact(p)).collect());
            harness.engine.select_contact(contact(open));
            harness.engine.timeline_loaded(&open.to_string(), messages);
            harness
        }

        pub fn drain_intents(&mut self) -> Vec<OutboundIntent> {
            let mut out = Vec::new();
            while let Ok(intent) = self.intents.try_recv() {
                out.push(intent);
            }
            out
        }

        pub fn drain_effects(&mut self) -> Vec<Effect> {
            let mut out = Vec::new();
            while let Ok(effect) = self.effects.try_recv() {
                out.push(effect);
            }
            out
        }

        pub fn timeline_ids(&self) -> Vec<String> {
            self.engine.timeline().messages().iter().map(|m| m.id.clone()).collect()
        }

        pub fn preview_id(&self, peer: &str) -> Option<String> {
            self.engine
                .directory()
                .get(peer)
                .and_then(|c| c.last_message.as_ref())
                .map(|m| m.id.clone())
        }
    }
}
