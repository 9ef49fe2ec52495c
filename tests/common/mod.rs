// Common test utilities for integration tests
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use log::LevelFilter;
use tokio::sync::{mpsc, oneshot, Notify};
use tokio::task::JoinHandle;

use parley::api::{ApiError, ChatApi};
use parley::models::{Contact, Message, MessageDraft, MessageStatus};
use parley::session::Preferences;
use parley::transport::{InboundEvent, MessageEnvelope, OutboundIntent, TransportEvent};
use parley::{ChatClient, ChatEngine, Command, Effect, SessionContext, ViewSnapshot};

static INIT_LOGGER: Once = Once::new();

/// Set up the logger for the tests
pub fn setup_logging() {
    INIT_LOGGER.call_once(|| {
        env_logger::Builder::new()
            .filter_level(LevelFilter::Debug)
            .is_test(true)
            .init();
    });
}

pub fn contact(id: &str) -> Contact {
    Contact::new(id, format!("{}@example.com", id))
}

/// A text message `from -> to`, stamped `secs` seconds after the epoch.
pub fn message(id: &str, from: &str, to: &str, secs: i64) -> Message {
    let at = Utc.timestamp_opt(secs, 0).unwrap();
    Message {
        id: id.to_string(),
        text: format!("text of {}", id),
        image: None,
        reaction: None,
        sender: contact(from),
        receiver: contact(to),
        status: MessageStatus::Sent,
        created_at: at,
        updated_at: at,
    }
}

#[derive(Default)]
struct Store {
    contacts: Vec<Contact>,
    messages: Vec<Message>,
    next_id: u32,
    calls: Vec<String>,
}

/// In-memory request layer standing in for the REST server.
pub struct MockApi {
    me: Contact,
    store: Mutex<Store>,
    /// `messages(peer)` waits on this before answering.
    gates: HashMap<String, Arc<Notify>>,
    /// The first `read_messages` waits on this.
    read_gate: Mutex<Option<Arc<Notify>>>,
    fail_sends: bool,
    fail_reads: bool,
    existing_emails: Vec<String>,
}

impl MockApi {
    pub fn new(me: Contact, contacts: Vec<Contact>, messages: Vec<Message>) -> Self {
        MockApi {
            me,
            store: Mutex::new(Store { contacts, messages, ..Default::default() }),
            gates: HashMap::new(),
            read_gate: Mutex::new(None),
            fail_sends: false,
            fail_reads: false,
            existing_emails: Vec::new(),
        }
    }

    pub fn gate_messages(mut self, peer: &str) -> (Self, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        self.gates.insert(peer.to_string(), gate.clone());
        (self, gate)
    }

    pub fn gate_first_read(self) -> (Self, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        *self.read_gate.lock().unwrap() = Some(gate.clone());
        (self, gate)
    }

    pub fn failing_reads(mut self) -> Self {
        self.fail_reads = true;
        self
    }

    /// Put a message on the server, as if a peer had sent it.
    pub fn insert_message(&self, message: Message) {
        self.store.lock().unwrap().messages.push(message);
    }

    pub fn failing_sends(mut self) -> Self {
        self.fail_sends = true;
        self
    }

    pub fn with_existing_email(mut self, email: &str) -> Self {
        self.existing_emails.push(email.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.store.lock().unwrap().calls.clone()
    }

    fn record(&self, call: impl Into<String>) {
        self.store.lock().unwrap().calls.push(call.into());
    }

    fn not_found() -> ApiError {
        ApiError::Rejected { status: 404, message: "Message not found".into() }
    }
}

#[async_trait]
impl ChatApi for MockApi {
    async fn contacts(&self) -> Result<Vec<Contact>, ApiError> {
        self.record("contacts");
        Ok(self.store.lock().unwrap().contacts.clone())
    }

    async fn messages(&self, contact_id: &str) -> Result<Vec<Message>, ApiError> {
        self.record(format!("messages {}", contact_id));
        if let Some(gate) = self.gates.get(contact_id) {
            gate.notified().await;
        }
        let store = self.store.lock().unwrap();
        Ok(store
            .messages
            .iter()
            .filter(|m| m.is_between(&self.me.id, contact_id))
            .cloned()
            .collect())
    }

    async fn create_contact(&self, email: &str) -> Result<Contact, ApiError> {
        self.record(format!("create_contact {}", email));
        if self.existing_emails.iter().any(|e| e == email) {
            return Err(ApiError::Rejected { status: 400, message: "Contact already exists".into() });
        }
        let id = email.split('@').next().unwrap_or(email).to_string();
        let created = Contact::new(id, email);
        self.store.lock().unwrap().contacts.push(created.clone());
        Ok(created)
    }

    async fn create_message(&self, receiver_id: &str, draft: &MessageDraft) -> Result<MessageEnvelope, ApiError> {
        self.record(format!("create_message {}", receiver_id));
        if self.fail_sends {
            return Err(ApiError::Rejected { status: 500, message: String::new() });
        }
        let mut store = self.store.lock().unwrap();
        store.next_id += 1;
        let receiver = store
            .contacts
            .iter()
            .find(|c| c.id == receiver_id)
            .cloned()
            .unwrap_or_else(|| contact(receiver_id));
        let now = Utc::now();
        let created = Message {
            id: format!("srv-{}", store.next_id),
            text: draft.text.clone(),
            image: draft.image.clone(),
            reaction: None,
            sender: self.me.clone(),
            receiver: receiver.clone(),
            status: MessageStatus::Sent,
            created_at: now,
            updated_at: now,
        };
        store.messages.push(created.clone());
        Ok(MessageEnvelope { message: created, sender: self.me.clone(), receiver })
    }

    async fn edit_message(&self, message_id: &str, text: &str) -> Result<Message, ApiError> {
        self.record(format!("edit_message {}", message_id));
        let mut store = self.store.lock().unwrap();
        let message = store.messages.iter_mut().find(|m| m.id == message_id).ok_or_else(Self::not_found)?;
        message.text = text.to_string();
        Ok(message.clone())
    }

    async fn delete_message(&self, message_id: &str) -> Result<Message, ApiError> {
        self.record(format!("delete_message {}", message_id));
        let mut store = self.store.lock().unwrap();
        let idx = store.messages.iter().position(|m| m.id == message_id).ok_or_else(Self::not_found)?;
        Ok(store.messages.remove(idx))
    }

    async fn react(&self, message_id: &str, reaction: &str) -> Result<Message, ApiError> {
        self.record(format!("react {}", message_id));
        let mut store = self.store.lock().unwrap();
        let message = store.messages.iter_mut().find(|m| m.id == message_id).ok_or_else(Self::not_found)?;
        message.reaction = Some(reaction.to_string());
        Ok(message.clone())
    }

    async fn read_messages(&self, messages: &[Message]) -> Result<Vec<Message>, ApiError> {
        self.record(format!("read_messages {}", messages.len()));
        let gate = self.read_gate.lock().unwrap().take();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        if self.fail_reads {
            return Err(ApiError::Rejected { status: 500, message: String::new() });
        }
        let mut store = self.store.lock().unwrap();
        let mut confirmed = Vec::new();
        for stored in store.messages.iter_mut() {
            if messages.iter().any(|m| m.id == stored.id) {
                stored.status = MessageStatus::Read;
                confirmed.push(stored.clone());
            }
        }
        Ok(confirmed)
    }

    async fn update_profile(&self, prefs: &Preferences) -> Result<(), ApiError> {
        self.record(format!("update_profile {:?}", prefs.muted));
        Ok(())
    }
}

pub async fn snapshot(commands: &mpsc::UnboundedSender<Command>) -> ViewSnapshot {
    let (reply, rx) = oneshot::channel();
    commands
        .send(Command::Snapshot { query: String::new(), reply })
        .expect("client stopped");
    rx.await.expect("no snapshot")
}

/// Poll snapshots until `ready` holds, failing the test after two seconds.
pub async fn wait_for<F>(commands: &mpsc::UnboundedSender<Command>, ready: F) -> ViewSnapshot
where
    F: Fn(&ViewSnapshot) -> bool,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    loop {
        let view = snapshot(commands).await;
        if ready(&view) {
            return view;
        }
        assert!(tokio::time::Instant::now() < deadline, "condition not reached, last view: {:?}", view);
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Wait until the mock server has seen a call starting with `prefix`.
pub async fn wait_for_call(api: &MockApi, prefix: &str) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while !api.calls().iter().any(|c| c.starts_with(prefix)) {
        assert!(tokio::time::Instant::now() < deadline, "no {} call in {:?}", prefix, api.calls());
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

pub fn drain<T>(rx: &mut mpsc::UnboundedReceiver<T>) -> Vec<T> {
    let mut out = Vec::new();
    while let Ok(item) = rx.try_recv() {
        out.push(item);
    }
    out
}

pub fn intent_names(intents: &[OutboundIntent]) -> Vec<&'static str> {
    intents.iter().map(|i| i.name()).collect()
}

/// A client runtime on its own task, with every channel end the test needs.
pub struct Running {
    pub commands: mpsc::UnboundedSender<Command>,
    pub transport: mpsc::UnboundedSender<TransportEvent>,
    pub intents: mpsc::UnboundedReceiver<OutboundIntent>,
    pub effects: mpsc::UnboundedReceiver<Effect>,
    pub api: Arc<MockApi>,
    handle: JoinHandle<ChatEngine>,
}

impl Running {
    pub fn start(me: Contact, api: MockApi) -> Self {
        setup_logging();
        let (intent_tx, intents) = mpsc::unbounded_channel();
        let (effect_tx, effects) = mpsc::unbounded_channel();
        let (commands, command_rx) = mpsc::unbounded_channel();
        let (transport, transport_rx) = mpsc::unbounded_channel();

        let api = Arc::new(api);
        let engine = ChatEngine::new(SessionContext::new(me), intent_tx, effect_tx);
        let handle = tokio::spawn(ChatClient::new(engine, api.clone()).run(command_rx, transport_rx));
        Running { commands, transport, intents, effects, api, handle }
    }

    pub fn send(&self, command: Command) {
        self.commands.send(command).expect("client stopped");
    }

    pub fn deliver(&self, event: InboundEvent) {
        self.transport.send(TransportEvent::Inbound(event)).expect("client stopped");
    }

    /// Shut down, wait for in-flight requests, and hand back the final engine.
    pub async fn finish(self) -> (ChatEngine, Vec<OutboundIntent>, Vec<Effect>) {
        let Running { commands, mut intents, mut effects, handle, .. } = self;
        commands.send(Command::Shutdown).expect("client stopped");
        let engine = handle.await.expect("client task panicked");
        (engine, drain(&mut intents), drain(&mut effects))
    }
}
