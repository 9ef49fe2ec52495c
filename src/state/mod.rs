// Client-side views reconciled by the engine.
// Each component is a plain owned value: no globals, no locking.

pub mod directory;
pub mod presence;
pub mod timeline;
pub mod typing;

pub use directory::{ContactDirectory, ContactRow};
pub use presence::PresenceTracker;
pub use timeline::Timeline;
pub use typing::{TypingIndicator, TypingState};

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::{TimeZone, Utc};

    use crate::models::{Contact, Message, MessageStatus};

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
}
