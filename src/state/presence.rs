// Online roster, replaced wholesale by every snapshot the hub broadcasts

use log::debug;
use std::collections::HashMap;

use crate::models::{Contact, ContactId};

#[derive(Debug, Default)]
pub struct PresenceTracker {
    online: HashMap<ContactId, Contact>,
}

impl PresenceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole online set. Duplicate ids collapse to the last entry.
    pub fn set_online(&mut self, contacts: impl IntoIterator<Item = Contact>) {
        let online: HashMap<ContactId, Contact> = contacts
            .into_iter()
            .map(|contact| (contact.id.clone(), contact))
            .collect();
        debug!("Presence snapshot: {} online", online.len());
        self.online = online;
    }

    pub fn is_online(&self, id: &str) -> bool {
        self.online.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.online.len()
    }

    pub fn is_empty(&self) -> bool {
        self.online.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_replaces_previous_set() {
        let mut presence = PresenceTracker::new();
        presence.set_online(vec![Contact::new("a", "a@x.io"), Contact::new("b", "b@x.io")]);
        assert!(presence.is_online("a"));
        assert!(presence.is_online("b"));

        presence.set_online(vec![Contact::new("c", "c@x.io")]);
        assert!(!presence.is_online("a"));
        assert!(!presence.is_online("b"));
        assert!(presence.is_online("c"));
        assert_eq!(presence.len(), 1);
    }

    #[test]
    fn test_duplicate_ids_counted_once() {
        let mut presence = PresenceTracker::new();
        presence.set_online(vec![Contact::new("a", "a@x.io"), Contact::new("a", "a@x.io")]);
        assert_eq!(presence.len(), 1);

        presence.set_online(Vec::new());
        assert!(presence.is_empty());
    }
}
