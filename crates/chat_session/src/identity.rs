use std::fmt;

use generation_provider::ConversationId;

/// Identity key used while no conversation id has been assigned.
pub const NEW_CONVERSATION_KEY: &str = "new";

/// Stable key tying one streaming interaction to one conversation.
///
/// Two identities are equal only when both the key and the epoch match, so
/// every recompute is observable even when the key text repeats.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionIdentity {
    key: String,
    epoch: u64,
}

impl SessionIdentity {
    fn derive(conversation_id: Option<ConversationId>, epoch: u64) -> Self {
        let key = match conversation_id {
            Some(id) => id.to_string(),
            None => NEW_CONVERSATION_KEY.to_string(),
        };
        Self { key, epoch }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }
}

impl fmt::Display for SessionIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.key, self.epoch)
    }
}

/// Tracks the session identity across conversation id changes.
///
/// Assigning an id to a new conversation (`None -> Some`) keeps the identity
/// so an in-flight stream stays attached. Every other change recomputes it.
#[derive(Debug, Clone)]
pub struct IdentityTracker {
    previous: Option<ConversationId>,
    identity: SessionIdentity,
}

impl IdentityTracker {
    pub fn new(conversation_id: Option<ConversationId>) -> Self {
        Self {
            previous: conversation_id,
            identity: SessionIdentity::derive(conversation_id, 0),
        }
    }

    pub fn identity(&self) -> &SessionIdentity {
        &self.identity
    }

    /// Records an observed conversation id. Returns `true` when the identity
    /// was recomputed.
    pub fn observe(&mut self, conversation_id: Option<ConversationId>) -> bool {
        let previous = std::mem::replace(&mut self.previous, conversation_id);
        match (previous, conversation_id) {
            (Some(before), Some(after)) if before == after => false,
            (None, Some(_)) => false,
            _ => {
                self.recompute();
                true
            }
        }
    }

    /// Forces a fresh identity for the current conversation id.
    pub fn reset(&mut self) {
        self.recompute();
    }

    fn recompute(&mut self) {
        let epoch = self.identity.epoch.wrapping_add(1);
        self.identity = SessionIdentity::derive(self.previous, epoch);
    }
}

impl Default for IdentityTracker {
    fn default() -> Self {
        Self::new(None)
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn assigning_id_to_new_conversation_keeps_identity() {
        let mut tracker = IdentityTracker::new(None);
        let before = tracker.identity().clone();

        assert!(!tracker.observe(Some(7)));
        assert_eq!(tracker.identity(), &before);
        assert_eq!(tracker.identity().key(), NEW_CONVERSATION_KEY);
    }

    #[test]
    fn switching_between_ids_recomputes() {
        let mut tracker = IdentityTracker::new(Some(1));
        let before = tracker.identity().clone();

        assert!(tracker.observe(Some(2)));
        assert_ne!(tracker.identity(), &before);
        assert_eq!(tracker.identity().key(), "2");
    }

    #[test]
    fn clearing_recomputes_even_when_key_repeats() {
        let mut tracker = IdentityTracker::new(None);
        let first = tracker.identity().clone();

        assert!(tracker.observe(None));
        assert_eq!(tracker.identity().key(), first.key());
        assert_ne!(tracker.identity(), &first);
    }

    #[test]
    fn same_id_is_not_a_change() {
        let mut tracker = IdentityTracker::new(Some(3));
        let before = tracker.identity().clone();

        assert!(!tracker.observe(Some(3)));
        assert_eq!(tracker.identity(), &before);
    }

    #[test]
    fn reset_recomputes_for_current_id() {
        let mut tracker = IdentityTracker::new(None);
        tracker.observe(Some(4));
        let before = tracker.identity().clone();

        tracker.reset();

        assert_ne!(tracker.identity(), &before);
        assert_eq!(tracker.identity().key(), "4");
    }

    #[test]
    fn display_joins_key_and_epoch() {
        let mut tracker = IdentityTracker::new(Some(9));
        tracker.reset();
        assert_eq!(tracker.identity().to_string(), "9#1");
    }

    fn conversation_id() -> impl Strategy<Value = Option<ConversationId>> {
        prop::option::of(1i64..4)
    }

    proptest! {
        #[test]
        fn identity_changes_exactly_when_rule_says_so(
            start in conversation_id(),
            steps in prop::collection::vec(conversation_id(), 1..32),
        ) {
            let mut tracker = IdentityTracker::new(start);
            let mut previous = start;
            for next in steps {
                let before = tracker.identity().clone();
                let changed = tracker.observe(next);
                let expected = match (previous, next) {
                    (None, Some(_)) => false,
                    (Some(a), Some(b)) => a != b,
                    _ => true,
                };
                prop_assert_eq!(changed, expected);
                prop_assert_eq!(tracker.identity() != &before, expected);
                previous = next;
            }
        }
    }
}
