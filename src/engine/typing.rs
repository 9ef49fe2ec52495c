// Typing: every composer change is pushed as the full draft, no round-trip

use super::ChatEngine;
use crate::transport::{OutboundIntent, TypingNotice};

impl ChatEngine {
    /// The composer changed. Nothing is sent when no conversation is open.
    pub fn draft_changed(&mut self, draft: &str) {
        let Some(receiver) = self.selected.clone() else {
            return;
        };
        self.emit(OutboundIntent::Typing(TypingNotice {
            sender: self.session.user().clone(),
            receiver,
            message: draft.to_string(),
        }));
    }

    pub(crate) fn remote_typing(&mut self, notice: TypingNotice) {
        let active = self.selected.as_ref().map(|c| c.id.as_str());
        self.typing.observe(notice.sender, notice.message, active);
    }
}

#[cfg(test)]
mod tests {
    use crate::engine::test_support::Harness;
    use crate::state::test_support::contact;
    use crate::transport::{InboundEvent, OutboundIntent, TypingNotice};

    fn typing(from: &str, draft: &str) -> InboundEvent {
        InboundEvent::Typing(TypingNotice {
            sender: contact(from),
            receiver: contact("me"),
            message: draft.to_string(),
        })
    }

    #[test]
    fn test_typing_from_other_peer_is_dropped() {
        let mut h = Harness::with_conversation("me", &["x", "y"], "y", Vec::new());
        h.engine.dispatch(typing("x", "secret plans"));
        assert!(!h.engine.typing().is_typing());
    }

    #[test]
    fn test_typing_from_open_peer_is_shown() {
        let mut h = Harness::with_conversation("me", &["y"], "y", Vec::new());
        h.engine.dispatch(typing("y", "on my w"));
        let state = h.engine.typing().current();
        assert_eq!(state.sender.as_ref().map(|c| c.id.as_str()), Some("y"));
        assert_eq!(state.message, "on my w");
    }

    #[test]
    fn test_every_draft_change_is_pushed_in_full() {
        let mut h = Harness::with_conversation("me", &["y"], "y", Vec::new());
        h.engine.draft_changed("h");
        h.engine.draft_changed("hi");

        let drafts: Vec<String> = h
            .drain_intents()
            .into_iter()
            .filter_map(|intent| match intent {
                OutboundIntent::Typing(notice) => Some(notice.message),
                _ => None,
            })
            .collect();
        assert_eq!(drafts, vec!["h", "hi"]);
    }

    #[test]
    fn test_no_typing_without_open_conversation() {
        let mut h = Harness::new("me");
        h.engine.draft_changed("hello");
        assert!(h.drain_intents().is_empty());
    }
}
