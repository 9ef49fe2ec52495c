// Contact creation, local and peer-initiated

use log::{debug, info};

use super::{ChatEngine, NoticeLevel};
use crate::models::Contact;
use crate::transport::{ContactCreated, CreatedPayload, OutboundIntent};

impl ChatEngine {
    /// Our add-contact request succeeded.
    pub fn contact_added(&mut self, contact: Contact) {
        info!("Added contact {}", contact.handle());
        self.directory.insert_new_contact(contact.clone());
        self.notice(NoticeLevel::Info, "Contact added successfully.");
        self.emit(OutboundIntent::CreateContact(ContactCreated {
            current_user: self.session.user().clone(),
            receiver: contact,
        }));
    }

    /// A peer added us; they appear at the top of our directory too.
    pub(crate) fn remote_contact_created(&mut self, created: CreatedPayload) {
        let creator = created.into_creator();
        if creator.id == self.me() {
            debug!("Ignoring our own createContact echo");
            return;
        }
        self.directory.prepend_new_contact(creator);
    }
}
