//! Standard runtime services backed by Rust's `std` library.
//!
//! This crate provides concrete implementations of the platform
//! abstraction traits defined in `cadence-core`: a wall-clock
//! [`SystemClock`] and a deadline-heap [`StdTimerQueue`]. The
//! [`StdRuntime`] bundle wires both into a ready-to-use
//! [`cadence_core::Scheduler`].

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

use cadence_core::{Clock, HostSurface, Scheduler, Tag, TimerDriver};

/// Wall-clock milliseconds since the Unix epoch.
///
/// Periodic alignment works against absolute wall-clock boundaries, so this
/// deliberately reads `SystemTime` rather than a monotonic instant.
#[derive(Debug, Default, Clone)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis() as u64)
            .unwrap_or(0)
    }
}

#[derive(PartialEq, Eq, PartialOrd, Ord)]
struct HeapEntry {
    deadline: u64,
    generation: u64,
    tag: Tag,
}

/// Priority queue of one-shot deadlines with per-tag dedup.
///
/// Cancellation is lazy: `cancel` only drops the tag from the pending map,
/// and a heap entry whose generation no longer matches is skipped when it
/// surfaces. This keeps `cancel` O(1) while the heap stays append-only.
pub struct StdTimerQueue {
    clock: Rc<dyn Clock>,
    heap: BinaryHeap<Reverse<HeapEntry>>,
    pending: HashMap<Tag, u64>,
    next_generation: u64,
}

impl StdTimerQueue {
    pub fn new(clock: Rc<dyn Clock>) -> Self {
        Self {
            clock,
            heap: BinaryHeap::new(),
            pending: HashMap::new(),
            next_generation: 1,
        }
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

impl TimerDriver for StdTimerQueue {
    fn is_pending(&self, tag: Tag) -> bool {
        self.pending.contains_key(&tag)
    }

    fn schedule_after(&mut self, tag: Tag, delay_millis: u64) {
        if self.pending.contains_key(&tag) {
            return;
        }
        let generation = self.next_generation;
        self.next_generation += 1;
        let deadline = self.clock.now_millis().saturating_add(delay_millis);
        self.pending.insert(tag, generation);
        self.heap.push(Reverse(HeapEntry {
            deadline,
            generation,
            tag,
        }));
    }

    fn cancel(&mut self, tag: Tag) {
        self.pending.remove(&tag);
    }

    fn poll_expired(&mut self, now_millis: u64) -> Option<Tag> {
        loop {
            let (deadline, generation, tag) = match self.heap.peek() {
                Some(Reverse(entry)) => (entry.deadline, entry.generation, entry.tag),
                None => return None,
            };
            if self.pending.get(&tag) != Some(&generation) {
                // Stale entry for a cancelled or superseded timer.
                self.heap.pop();
                continue;
            }
            if deadline > now_millis {
                return None;
            }
            self.heap.pop();
            self.pending.remove(&tag);
            return Some(tag);
        }
    }

    fn next_deadline(&self) -> Option<u64> {
        self.heap
            .iter()
            .filter(|Reverse(entry)| self.pending.get(&entry.tag) == Some(&entry.generation))
            .map(|Reverse(entry)| entry.deadline)
            .min()
    }
}

/// Convenience bundle wiring the standard clock and timer queue.
#[derive(Clone, Default)]
pub struct StdRuntime {
    clock: Rc<SystemClock>,
}

impl StdRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clock(&self) -> Rc<SystemClock> {
        Rc::clone(&self.clock)
    }

    /// Builds a scheduler over the standard clock and timer queue for the
    /// given host surface. The caller still drives it via
    /// [`Scheduler::pump`] and [`Scheduler::next_deadline`].
    pub fn scheduler(&self, host: Rc<dyn HostSurface>) -> Scheduler {
        let clock: Rc<dyn Clock> = self.clock.clone();
        Scheduler::new(host, clock.clone(), Box::new(StdTimerQueue::new(clock)))
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use cadence_core::{Clock, TimerDriver};
    use cadence_testing::FakeClock;

    use super::{StdTimerQueue, SystemClock};

    fn queue_at(millis: u64) -> (FakeClock, StdTimerQueue) {
        let clock = FakeClock::new(millis);
        let queue = StdTimerQueue::new(Rc::new(clock.clone()));
        (clock, queue)
    }

    #[test]
    fn system_clock_reads_a_nonzero_epoch_offset() {
        assert!(SystemClock.now_millis() > 0);
    }

    #[test]
    fn schedule_is_deduplicated_per_tag() {
        let (_clock, mut queue) = queue_at(0);
        queue.schedule_after(0x10, 100);
        queue.schedule_after(0x10, 5);
        assert_eq!(queue.next_deadline(), Some(100));
        assert_eq!(queue.pending_count(), 1);
    }

    #[test]
    fn expiry_is_earliest_deadline_first() {
        let (_clock, mut queue) = queue_at(0);
        queue.schedule_after(0x10, 300);
        queue.schedule_after(0x20, 100);
        queue.schedule_after(0x30, 200);
        assert_eq!(queue.poll_expired(1_000), Some(0x20));
        assert_eq!(queue.poll_expired(1_000), Some(0x30));
        assert_eq!(queue.poll_expired(1_000), Some(0x10));
        assert_eq!(queue.poll_expired(1_000), None);
    }

    #[test]
    fn nothing_expires_before_its_deadline() {
        let (_clock, mut queue) = queue_at(0);
        queue.schedule_after(0x10, 100);
        assert_eq!(queue.poll_expired(99), None);
        assert!(queue.is_pending(0x10));
        assert_eq!(queue.poll_expired(100), Some(0x10));
        assert!(!queue.is_pending(0x10));
    }

    #[test]
    fn cancelled_entries_are_skipped_on_pop() {
        let (_clock, mut queue) = queue_at(0);
        queue.schedule_after(0x10, 100);
        queue.schedule_after(0x20, 200);
        queue.cancel(0x10);
        assert!(!queue.is_pending(0x10));
        assert_eq!(queue.next_deadline(), Some(200));
        assert_eq!(queue.poll_expired(1_000), Some(0x20));
        assert_eq!(queue.poll_expired(1_000), None);
    }

    #[test]
    fn reschedule_after_cancel_uses_the_new_deadline() {
        let (clock, mut queue) = queue_at(0);
        queue.schedule_after(0x10, 100);
        queue.cancel(0x10);
        clock.set(50);
        queue.schedule_after(0x10, 500);
        // The stale generation at 100 must not fire.
        assert_eq!(queue.poll_expired(100), None);
        assert_eq!(queue.poll_expired(550), Some(0x10));
    }

    #[test]
    fn deadlines_are_absolute_on_the_clock_timeline() {
        let (clock, mut queue) = queue_at(1_234);
        queue.schedule_after(0x10, 266);
        assert_eq!(queue.next_deadline(), Some(1_500));
        clock.set(1_500);
        assert_eq!(queue.poll_expired(clock.now_millis()), Some(0x10));
    }
}
