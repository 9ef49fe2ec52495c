// Authenticated local identity, handed to every component that needs "me"

use serde::{Deserialize, Serialize};

use crate::models::{Contact, Message};

/// Notification preferences the user can change from the settings screen.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub muted: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification_sound: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sending_sound: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SessionContext {
    user: Contact,
}

impl SessionContext {
    pub fn new(user: Contact) -> Self {
        SessionContext { user }
    }

    pub fn user(&self) -> &Contact {
        &self.user
    }

    pub fn id(&self) -> &str {
        &self.user.id
    }

    pub fn is_muted(&self) -> bool {
        self.user.muted
    }

    /// True if the local user wrote this message.
    pub fn owns(&self, message: &Message) -> bool {
        message.sender.id == self.user.id
    }

    /// Apply confirmed preference changes; fields left as `None` are untouched.
    pub fn apply_preferences(&mut self, prefs: &Preferences) {
        if let Some(muted) = prefs.muted {
            self.user.muted = muted;
        }
        if let Some(sound) = &prefs.notification_sound {
            self.user.notification_sound = sound.clone();
        }
        if let Some(sound) = &prefs.sending_sound {
            self.user.sending_sound = sound.clone();
        }
    }
}
