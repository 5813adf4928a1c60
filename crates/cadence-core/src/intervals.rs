//! First-writer-wins interval configuration per tag.

use hashbrown::HashMap;

use crate::Tag;

/// Maps each tag to its configured period in milliseconds.
///
/// The first registration for a tag decides its period for as long as the
/// tag stays configured; later conflicting registrations keep the existing
/// value and are reported through a warning only.
#[derive(Debug, Default)]
pub struct IntervalRegistry {
    intervals: HashMap<Tag, u64>,
}

impl IntervalRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `millis` as the period for `tag`.
    ///
    /// Returns whether the requested value is the one in effect afterwards.
    /// A zero period is rejected; a conflicting period for an already
    /// configured tag is ignored.
    pub fn set_interval(&mut self, tag: Tag, millis: u64) -> bool {
        if millis == 0 {
            log::warn!("rejecting zero interval for tag {tag:#x}");
            return false;
        }
        match self.intervals.get(&tag) {
            Some(&existing) if existing != millis => {
                log::warn!(
                    "an interval of {existing} ms is already configured for tag {tag:#x}; \
                     the requested {millis} ms will not be applied"
                );
                false
            }
            Some(_) => true,
            None => {
                self.intervals.insert(tag, millis);
                true
            }
        }
    }

    /// The configured period for `tag`, if any. Tags without a period must
    /// not be scheduled.
    pub fn interval(&self, tag: Tag) -> Option<u64> {
        self.intervals.get(&tag).copied()
    }

    /// Drops the configuration for `tag`, if any. Called when the last
    /// subscriber for the tag goes away.
    pub fn remove(&mut self, tag: Tag) {
        self.intervals.remove(&tag);
    }

    pub fn contains(&self, tag: Tag) -> bool {
        self.intervals.contains_key(&tag)
    }
}
