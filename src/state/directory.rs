// Contact directory: one entry per peer, each carrying a denormalized copy of
// the newest message of that conversation for list rendering and ordering.

use log::debug;
use std::cmp::Ordering;

use crate::models::{Contact, Message, MessageStatus};

/// One rendered row of the contact list.
#[derive(Debug, Clone, PartialEq)]
pub struct ContactRow {
    pub contact: Contact,
    pub online: bool,
    pub unread: bool,
}

#[derive(Debug, Default)]
pub struct ContactDirectory {
    entries: Vec<Contact>,
}

impl ContactDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the directory with a fetched list, keeping the first entry per id.
    pub fn load(&mut self, contacts: Vec<Contact>) {
        self.entries.clear();
        for contact in contacts {
            self.insert_new_contact(contact);
        }
    }

    /// Idempotent append; returns false if the id is already listed.
    pub fn insert_new_contact(&mut self, contact: Contact) -> bool {
        self.insert(contact, false)
    }

    /// Idempotent insert at the front, for contacts a peer created.
    pub fn prepend_new_contact(&mut self, contact: Contact) -> bool {
        self.insert(contact, true)
    }

    fn insert(&mut self, contact: Contact, front: bool) -> bool {
        if self.get(&contact.id).is_some() {
            debug!("Contact {} already in directory", contact.id);
            return false;
        }
        if front {
            self.entries.insert(0, contact);
        } else {
            self.entries.push(contact);
        }
        true
    }

    /// Set the preview message of `contact_id`.
    ///
    /// `seen` forces the preview status to `Read` (our own sends, or a message
    /// landing in the conversation that is open right now).
    pub fn upsert_last_message(&mut self, contact_id: &str, mut message: Message, seen: bool) -> bool {
        let Some(entry) = self.get_mut(contact_id) else {
            debug!("No directory entry for {}, preview not updated", contact_id);
            return false;
        };
        if seen {
            message.status = MessageStatus::Read;
        }
        entry.last_message = Some(Box::new(message));
        true
    }

    /// Edit or reaction: replace the preview only if it is the updated message.
    pub fn reconcile_on_update(&mut self, contact_id: &str, updated: &Message) -> bool {
        let Some(entry) = self.get_mut(contact_id) else {
            return false;
        };
        match entry.last_message.as_mut() {
            Some(last) if last.id == updated.id => {
                let status = last.status.max(updated.status);
                **last = updated.clone();
                last.status = status;
                true
            }
            _ => false,
        }
    }

    /// Delete: if the preview was the deleted message, fall back to `fallback`.
    pub fn reconcile_on_delete(&mut self, contact_id: &str, deleted_id: &str, fallback: Option<Message>) -> bool {
        let Some(entry) = self.get_mut(contact_id) else {
            return false;
        };
        match &entry.last_message {
            Some(last) if last.id == deleted_id => {
                entry.last_message = fallback.map(Box::new);
                true
            }
            _ => false,
        }
    }

    pub fn mark_preview_read(&mut self, contact_id: &str) {
        if let Some(last) = self.get_mut(contact_id).and_then(|c| c.last_message.as_mut()) {
            last.mark_read();
        }
    }

    /// True when the preview is a message from the peer we have not read yet.
    pub fn has_unread(&self, contact_id: &str, me: &str) -> bool {
        self.get(contact_id)
            .and_then(|c| c.last_message.as_ref())
            .map(|m| m.sender.id != me && !m.is_read())
            .unwrap_or(false)
    }

    pub fn get(&self, id: &str) -> Option<&Contact> {
        self.entries.iter().find(|c| c.id == id)
    }

    fn get_mut(&mut self, id: &str) -> Option<&mut Contact> {
        self.entries.iter_mut().find(|c| c.id == id)
    }

    /// Look a contact up by id or by display handle.
    pub fn find(&self, key: &str) -> Option<&Contact> {
        self.get(key)
            .or_else(|| self.entries.iter().find(|c| c.handle().eq_ignore_ascii_case(key)))
    }

    /// Entries in insertion order.
    pub fn entries(&self) -> &[Contact] {
        &self.entries
    }

    /// Entries whose email contains `query` (case-insensitive), newest activity
    /// first. Contacts without a last message go last, in insertion order.
    pub fn filtered(&self, query: &str) -> Vec<&Contact> {
        let query = query.to_lowercase();
        let mut contacts: Vec<&Contact> = self
            .entries
            .iter()
            .filter(|c| c.email.to_lowercase().contains(&query))
            .collect();
        // Stable sort: ties keep insertion order
        contacts.sort_by(|a, b| compare_activity(a, b));
        contacts
    }

    pub fn sorted(&self) -> Vec<&Contact> {
        self.filtered("")
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn compare_activity(a: &Contact, b: &Contact) -> Ordering {
    match (a.last_activity(), b.last_activity()) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
