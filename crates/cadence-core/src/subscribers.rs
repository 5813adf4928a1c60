//! Subscriber capability trait and the per-tag registration table.

use std::fmt;
use std::rc::Rc;

use hashbrown::HashMap;

use crate::Tag;

/// Error returned by a subscriber's wake handler.
///
/// A wake failure is logged at the dispatch boundary and never propagates
/// further; sibling subscribers and future cycles are unaffected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WakeError {
    reason: String,
}

impl WakeError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl fmt::Display for WakeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.reason)
    }
}

impl std::error::Error for WakeError {}

/// A periodic consumer driven by the scheduler.
///
/// Subscribers are registered under one or more tags and woken once per
/// firing of each tag. The `is_active`/`needs_scheduler` pair gates each
/// individual wake-up, so a subscriber can pause itself without touching
/// its registration.
pub trait Subscriber {
    /// Short name used in log messages.
    fn name(&self) -> &str {
        "subscriber"
    }

    fn is_active(&self) -> bool {
        true
    }

    fn needs_scheduler(&self) -> bool {
        true
    }

    /// Called once per wake-up for a tag the subscriber is registered under.
    fn on_wake(&self, tag: Tag) -> Result<(), WakeError>;

    /// Polled after a successful wake to decide whether the host surface
    /// should be redrawn this cycle.
    fn should_invalidate(&self) -> bool {
        false
    }
}

/// Shared handle to a subscriber. Table membership is decided by
/// allocation identity, so cloned handles refer to the same registration.
pub type SubscriberHandle = Rc<dyn Subscriber>;

/// Result of removing a subscriber from the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    /// The subscriber was not registered under the tag.
    NotRegistered,
    /// Removed; other subscribers remain for the tag.
    Removed,
    /// Removed and the tag's entry was deleted with it. The caller must
    /// stop the tag's timer.
    TagEmptied,
}

/// Maps each tag to its subscribers in registration order.
#[derive(Default)]
pub struct SubscriberTable {
    entries: HashMap<Tag, Vec<SubscriberHandle>>,
}

impl SubscriberTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `subscriber` under `tag`, creating the tag's entry on demand.
    /// Adding an already registered subscriber is a no-op; returns whether
    /// the subscriber was newly added.
    pub fn add(&mut self, tag: Tag, subscriber: &SubscriberHandle) -> bool {
        let entry = self.entries.entry(tag).or_default();
        if entry.iter().any(|existing| Rc::ptr_eq(existing, subscriber)) {
            return false;
        }
        entry.push(subscriber.clone());
        true
    }

    /// Removes `subscriber` from `tag`. Deletes the tag's entry when it
    /// becomes empty; a tag present in the table always has at least one
    /// subscriber.
    pub fn remove(&mut self, tag: Tag, subscriber: &SubscriberHandle) -> RemoveOutcome {
        let Some(entry) = self.entries.get_mut(&tag) else {
            return RemoveOutcome::NotRegistered;
        };
        let Some(index) = entry.iter().position(|e| Rc::ptr_eq(e, subscriber)) else {
            return RemoveOutcome::NotRegistered;
        };
        entry.remove(index);
        if entry.is_empty() {
            self.entries.remove(&tag);
            RemoveOutcome::TagEmptied
        } else {
            RemoveOutcome::Removed
        }
    }

    /// Point-in-time copy of the subscribers for `tag`, in registration
    /// order. Iterating the snapshot tolerates table mutation, so a
    /// subscriber may unregister itself from inside its own wake handler.
    pub fn snapshot(&self, tag: Tag) -> Vec<SubscriberHandle> {
        self.entries.get(&tag).cloned().unwrap_or_default()
    }

    pub fn contains(&self, tag: Tag) -> bool {
        self.entries.contains_key(&tag)
    }

    pub fn subscriber_count(&self, tag: Tag) -> usize {
        self.entries.get(&tag).map(Vec::len).unwrap_or(0)
    }

    /// Currently populated tags, in no particular order.
    pub fn tags(&self) -> impl Iterator<Item = Tag> + '_ {
        self.entries.keys().copied()
    }
}
