// Client runtime
//
// The single dispatch point. One task owns the ChatEngine and multiplexes user
// commands, hub events and request completions. Requests run as spawned tasks
// and report back through the completion channel, so the hub keeps being
// serviced while a request is in flight.

use log::{debug, info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

use crate::api::{ApiError, ChatApi};
use crate::engine::{ChatEngine, MutationKind};
use crate::models::{Contact, ContactId, Message, MessageDraft, MessageId};
use crate::session::Preferences;
use crate::state::{ContactRow, TypingState};
use crate::transport::{MessageEnvelope, TransportEvent};

static EMAIL_PATTERN: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").ok());

/// Loose shape check done before asking the server to add a contact.
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_PATTERN.as_ref().map(|re| re.is_match(email)).unwrap_or(false)
}

/// Everything the front end can ask of the client.
#[derive(Debug)]
pub enum Command {
    LoadContacts,
    /// Open a conversation by contact id or handle.
    Open(String),
    Select(Contact),
    /// Composer submit: edits the message being edited, otherwise sends.
    Submit(MessageDraft),
    /// Composer contents changed.
    Draft(String),
    BeginEdit(MessageId),
    CancelEdit,
    React { id: MessageId, reaction: String },
    Delete(MessageId),
    MarkRead,
    AddContact(String),
    UpdatePreferences(Preferences),
    Snapshot { query: String, reply: oneshot::Sender<ViewSnapshot> },
    Shutdown,
}

/// Result of a spawned request, applied on the dispatch loop.
#[derive(Debug)]
pub enum Completion {
    Contacts(Result<Vec<Contact>, ApiError>),
    Messages { peer: ContactId, result: Result<Vec<Message>, ApiError> },
    ContactAdded(Result<Contact, ApiError>),
    Sent(Result<MessageEnvelope, ApiError>),
    Edited(Result<Message, ApiError>),
    Reacted(Result<Message, ApiError>),
    Deleted(Result<Message, ApiError>),
    /// A delete finished after its conversation was closed, with that
    /// conversation refetched.
    DeletedElsewhere { message: Message, history: Result<Vec<Message>, ApiError> },
    Read(Result<Vec<Message>, ApiError>),
    PreferencesUpdated { prefs: Preferences, result: Result<(), ApiError> },
}

/// Read-only view of the client state for rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewSnapshot {
    pub contacts: Vec<ContactRow>,
    pub timeline: Vec<Message>,
    pub typing: TypingState,
    pub selected: Option<Contact>,
    pub editing: Option<Message>,
    pub online: usize,
}

impl ViewSnapshot {
    pub fn capture(engine: &ChatEngine, query: &str) -> Self {
        let directory = engine.directory();
        let contacts = directory
            .filtered(query)
            .into_iter()
            .map(|contact| ContactRow {
                online: engine.presence().is_online(&contact.id),
                unread: directory.has_unread(&contact.id, engine.me()),
                contact: contact.clone(),
            })
            .collect();

        ViewSnapshot {
            contacts,
            timeline: engine.timeline().messages().to_vec(),
            typing: engine.typing().current().clone(),
            selected: engine.selected().cloned(),
            editing: engine.editing().cloned(),
            online: engine.presence().len(),
        }
    }
}

pub struct ChatClient {
    engine: ChatEngine,
    api: Arc<dyn ChatApi>,
    done_tx: mpsc::UnboundedSender<Completion>,
    done_rx: Option<mpsc::UnboundedReceiver<Completion>>,
    in_flight: usize,
    /// Ids covered by the read request in flight, if any.
    reading: Option<Vec<MessageId>>,
    contacts_requested: bool,
}

impl ChatClient {
    pub fn new(engine: ChatEngine, api: Arc<dyn ChatApi>) -> Self {
        let (done_tx, done_rx) = mpsc::unbounded_channel();
        ChatClient {
            engine,
            api,
            done_tx,
            done_rx: Some(done_rx),
            in_flight: 0,
            reading: None,
            contacts_requested: false,
        }
    }

    pub fn engine(&self) -> &ChatEngine {
        &self.engine
    }

    /// Run until `Shutdown` (or the command channel closes) and every
    /// in-flight request has completed. Returns the final engine state.
    pub async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut transport: mpsc::UnboundedReceiver<TransportEvent>,
    ) -> ChatEngine {
        let Some(mut done_rx) = self.done_rx.take() else {
            return self.engine;
        };
        let mut accepting = true;
        let mut transport_open = true;

        loop {
            if !accepting && self.in_flight == 0 {
                break;
            }
            let waiting = self.in_flight > 0;

            // Hub events first, then completions, then user commands
            tokio::select! {
                biased;

                event = transport.recv(), if transport_open => match event {
                    Some(event) => self.handle_transport(event),
                    None => {
                        debug!("Transport channel closed");
                        transport_open = false;
                    }
                },
                Some(done) = done_rx.recv(), if waiting => {
                    self.in_flight -= 1;
                    self.handle_completion(done);
                },
                command = commands.recv(), if accepting => match command {
                    Some(Command::Shutdown) | None => {
                        info!("Client shutting down, {} request(s) in flight", self.in_flight);
                        accepting = false;
                    }
                    Some(command) => self.handle_command(command),
                },
                else => break,
            }
        }
        self.engine
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::LoadContacts => self.load_contacts(),
            Command::Open(key) => match self.engine.directory().find(&key).cloned() {
                Some(contact) => self.select(contact),
                None => self.engine.input_rejected(&format!("No contact named {}", key)),
            },
            Command::Select(contact) => self.select(contact),
            Command::Submit(draft) => self.submit(draft),
            Command::Draft(text) => self.engine.draft_changed(&text),
            Command::BeginEdit(id) => self.begin_edit(&id),
            Command::CancelEdit => self.engine.cancel_edit(),
            Command::React { id, reaction } => {
                let api = self.api.clone();
                self.spawn(async move { Completion::Reacted(api.react(&id, &reaction).await) });
            }
            Command::Delete(id) => self.delete(id),
            Command::MarkRead => self.read_visible(),
            Command::AddContact(email) => self.add_contact(email),
            Command::UpdatePreferences(prefs) => {
                let api = self.api.clone();
                self.spawn(async move {
                    let result = api.update_profile(&prefs).await;
                    Completion::PreferencesUpdated { prefs, result }
                });
            }
            Command::Snapshot { query, reply } => {
                if reply.send(ViewSnapshot::capture(&self.engine, &query)).is_err() {
                    debug!("Snapshot requester went away");
                }
            }
            // Handled by the run loop
            Command::Shutdown => {}
        }
    }

    fn handle_transport(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Connected => {
                info!("Hub connected");
                self.engine.connected();
                if !self.contacts_requested {
                    self.load_contacts();
                }
            }
            TransportEvent::Disconnected => info!("Hub disconnected"),
            TransportEvent::Inbound(event) => {
                self.engine.dispatch(event);
                self.read_visible();
            }
        }
    }

    fn handle_completion(&mut self, done: Completion) {
        match done {
            Completion::Contacts(result) => match result {
                Ok(contacts) => self.engine.contacts_loaded(contacts),
                Err(e) => self.engine.request_failed(MutationKind::LoadContacts, &e),
            },
            Completion::Messages { peer, result } => match result {
                Ok(messages) => {
                    if self.engine.timeline_loaded(&peer, messages) {
                        self.read_visible();
                    }
                }
                Err(e) => self.engine.request_failed(MutationKind::LoadMessages, &e),
            },
            Completion::ContactAdded(result) => match result {
                Ok(contact) => self.engine.contact_added(contact),
                Err(e) => self.engine.request_failed(MutationKind::AddContact, &e),
            },
            Completion::Sent(result) => match result {
                Ok(envelope) => self.engine.message_sent(envelope),
                Err(e) => self.engine.request_failed(MutationKind::Send, &e),
            },
            Completion::Edited(result) => match result {
                Ok(message) => self.engine.message_edited(message),
                Err(e) => self.engine.request_failed(MutationKind::Edit, &e),
            },
            Completion::Reacted(result) => match result {
                Ok(message) => self.engine.reaction_set(message),
                Err(e) => self.engine.request_failed(MutationKind::React, &e),
            },
            Completion::Deleted(result) => match result {
                Ok(message) => self.deleted(message),
                Err(e) => self.engine.request_failed(MutationKind::Delete, &e),
            },
            Completion::DeletedElsewhere { message, history } => match history {
                Ok(remaining) => self.engine.message_deleted_with_history(message, remaining),
                Err(e) => {
                    warn!("Could not refetch conversation after delete: {}", e);
                    self.engine.message_deleted(message);
                }
            },
            Completion::Read(result) => {
                let requested = self.reading.take().unwrap_or_default();
                match result {
                    Ok(messages) => self.engine.messages_read(messages),
                    Err(e) => self.engine.request_failed(MutationKind::MarkRead, &e),
                }
                // Re-request only for messages the finished request did not
                // cover, so a failing read does not retry on its own
                let arrived = self
                    .engine
                    .unread_received()
                    .iter()
                    .any(|m| !requested.contains(&m.id));
                if arrived {
                    self.mark_read();
                }
            }
            Completion::PreferencesUpdated { prefs, result } => match result {
                Ok(()) => self.engine.preferences_updated(&prefs),
                Err(e) => self.engine.request_failed(MutationKind::UpdateProfile, &e),
            },
        }
    }

    fn load_contacts(&mut self) {
        self.contacts_requested = true;
        let api = self.api.clone();
        self.spawn(async move { Completion::Contacts(api.contacts().await) });
    }

    fn select(&mut self, contact: Contact) {
        let peer = contact.id.clone();
        if !self.engine.select_contact(contact) {
            return;
        }
        let api = self.api.clone();
        self.spawn(async move {
            let result = api.messages(&peer).await;
            Completion::Messages { peer, result }
        });
    }

    fn submit(&mut self, draft: MessageDraft) {
        if let Err(e) = draft.validate() {
            self.engine.input_rejected(&e.to_string());
            return;
        }
        let api = self.api.clone();

        if let Some(editing) = self.engine.editing() {
            let id = editing.id.clone();
            self.spawn(async move { Completion::Edited(api.edit_message(&id, &draft.text).await) });
            return;
        }
        let Some(receiver) = self.engine.selected_id().map(str::to_string) else {
            self.engine.input_rejected("Select a contact first");
            return;
        };
        self.spawn(async move { Completion::Sent(api.create_message(&receiver, &draft).await) });
    }

    fn begin_edit(&mut self, id: &str) {
        let editable = self
            .engine
            .timeline()
            .get(id)
            .map(|m| m.is_editable_by(self.engine.me()));
        match editable {
            Some(true) => {
                self.engine.begin_edit(id);
            }
            Some(false) => self.engine.input_rejected("Only your own text messages can be edited"),
            None => self.engine.input_rejected("Message not found"),
        }
    }

    fn delete(&mut self, id: MessageId) {
        let deletable = self
            .engine
            .timeline()
            .get(&id)
            .map(|m| m.is_deletable_by(self.engine.me()));
        if deletable == Some(false) {
            self.engine.input_rejected("Only your own messages can be deleted");
            return;
        }
        let api = self.api.clone();
        self.spawn(async move { Completion::Deleted(api.delete_message(&id).await) });
    }

    fn deleted(&mut self, message: Message) {
        let peer = message.peer_of(self.engine.me()).id.clone();
        if self.engine.selected_id() == Some(peer.as_str()) {
            self.engine.message_deleted(message);
            return;
        }
        debug!("Refetching {} to find the tail after delete", peer);
        let api = self.api.clone();
        self.spawn(async move {
            let history = api.messages(&peer).await;
            Completion::DeletedElsewhere { message, history }
        });
    }

    fn mark_read(&mut self) {
        let unread = self.engine.unread_received();
        if unread.is_empty() {
            return;
        }
        self.reading = Some(unread.iter().map(|m| m.id.clone()).collect());
        let api = self.api.clone();
        self.spawn(async move { Completion::Read(api.read_messages(&unread).await) });
    }

    /// The open conversation is on screen, so anything unread in it gets read.
    fn read_visible(&mut self) {
        if self.reading.is_none() {
            self.mark_read();
        }
    }

    fn add_contact(&mut self, email: String) {
        let email = email.trim().to_string();
        if !is_valid_email(&email) {
            warn!("Refusing to add invalid email {:?}", email);
            self.engine.input_rejected("Invalid email address");
            return;
        }
        let api = self.api.clone();
        self.spawn(async move { Completion::ContactAdded(api.create_contact(&email).await) });
    }

    fn spawn<F>(&mut self, request: F)
    where
        F: Future<Output = Completion> + Send + 'static,
    {
        self.in_flight += 1;
        let done = self.done_tx.clone();
        tokio::spawn(async move {
            if done.send(request.await).is_err() {
                debug!("Client stopped before request completed");
            }
        });
    }
}
