//! Testing utilities for Cadence.
//!
//! Every double here is a clonable handle over shared interior state, so a
//! test can keep one clone for inspection while the scheduler owns another.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use cadence_core::{Clock, HostSurface, Subscriber, SubscriberHandle, Tag, TimerDriver, WakeError};

/// Manually advanced wall clock.
#[derive(Clone, Default)]
pub struct FakeClock {
    millis: Rc<Cell<u64>>,
}

impl FakeClock {
    pub fn new(millis: u64) -> Self {
        let clock = Self::default();
        clock.set(millis);
        clock
    }

    pub fn now(&self) -> u64 {
        self.millis.get()
    }

    pub fn set(&self, millis: u64) {
        self.millis.set(millis);
    }

    pub fn advance(&self, millis: u64) {
        self.millis.set(self.millis.get() + millis);
    }
}

impl Clock for FakeClock {
    fn now_millis(&self) -> u64 {
        self.millis.get()
    }
}

struct TimerEntry {
    tag: Tag,
    deadline: u64,
    seq: u64,
}

#[derive(Default)]
struct DriverState {
    armed: Vec<TimerEntry>,
    next_seq: u64,
}

/// Timer driver that fires only when a test drains it through
/// [`poll_expired`](TimerDriver::poll_expired), typically via
/// `Scheduler::pump` after moving a [`FakeClock`].
#[derive(Clone)]
pub struct ManualTimerDriver {
    clock: FakeClock,
    inner: Rc<RefCell<DriverState>>,
}

impl ManualTimerDriver {
    pub fn new(clock: FakeClock) -> Self {
        Self {
            clock,
            inner: Rc::new(RefCell::new(DriverState::default())),
        }
    }

    pub fn is_armed(&self, tag: Tag) -> bool {
        self.inner.borrow().armed.iter().any(|e| e.tag == tag)
    }

    pub fn deadline_for(&self, tag: Tag) -> Option<u64> {
        self.inner
            .borrow()
            .armed
            .iter()
            .filter(|e| e.tag == tag)
            .map(|e| e.deadline)
            .min()
    }

    pub fn armed_count(&self) -> usize {
        self.inner.borrow().armed.len()
    }

    pub fn armed_count_for(&self, tag: Tag) -> usize {
        self.inner.borrow().armed.iter().filter(|e| e.tag == tag).count()
    }
}

impl TimerDriver for ManualTimerDriver {
    fn is_pending(&self, tag: Tag) -> bool {
        self.is_armed(tag)
    }

    fn schedule_after(&mut self, tag: Tag, delay_millis: u64) {
        let mut state = self.inner.borrow_mut();
        if state.armed.iter().any(|e| e.tag == tag) {
            return;
        }
        let deadline = self.clock.now() + delay_millis;
        let seq = state.next_seq;
        state.next_seq += 1;
        state.armed.push(TimerEntry { tag, deadline, seq });
    }

    fn cancel(&mut self, tag: Tag) {
        self.inner.borrow_mut().armed.retain(|e| e.tag != tag);
    }

    fn poll_expired(&mut self, now_millis: u64) -> Option<Tag> {
        let mut state = self.inner.borrow_mut();
        let index = state
            .armed
            .iter()
            .enumerate()
            .filter(|(_, e)| e.deadline <= now_millis)
            .min_by_key(|(_, e)| (e.deadline, e.seq))
            .map(|(i, _)| i)?;
        Some(state.armed.remove(index).tag)
    }

    fn next_deadline(&self) -> Option<u64> {
        self.inner.borrow().armed.iter().map(|e| e.deadline).min()
    }
}

struct HostState {
    visible: Cell<bool>,
    ambient: Cell<bool>,
    time_ticks: Cell<u32>,
    invalidations: Cell<u32>,
}

/// Host surface double recording tick and invalidate traffic.
///
/// Starts visible and not ambient.
#[derive(Clone)]
pub struct FakeHost {
    inner: Rc<HostState>,
}

impl FakeHost {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(HostState {
                visible: Cell::new(true),
                ambient: Cell::new(false),
                time_ticks: Cell::new(0),
                invalidations: Cell::new(0),
            }),
        }
    }

    pub fn set_visible(&self, visible: bool) {
        self.inner.visible.set(visible);
    }

    pub fn set_ambient(&self, ambient: bool) {
        self.inner.ambient.set(ambient);
    }

    pub fn time_ticks(&self) -> u32 {
        self.inner.time_ticks.get()
    }

    pub fn invalidations(&self) -> u32 {
        self.inner.invalidations.get()
    }
}

impl Default for FakeHost {
    fn default() -> Self {
        Self::new()
    }
}

impl HostSurface for FakeHost {
    fn is_visible(&self) -> bool {
        self.inner.visible.get()
    }

    fn is_in_ambient_mode(&self) -> bool {
        self.inner.ambient.get()
    }

    fn on_time_tick(&self) {
        self.inner.time_ticks.set(self.inner.time_ticks.get() + 1);
    }

    fn invalidate(&self) {
        self.inner.invalidations.set(self.inner.invalidations.get() + 1);
    }
}

/// Subscriber double with switchable gates, an optional synthetic fault,
/// and an optional hook run on every wake.
pub struct RecordingSubscriber {
    name: String,
    active: Cell<bool>,
    needs_scheduler: Cell<bool>,
    invalidates: Cell<bool>,
    fail_reason: RefCell<Option<String>>,
    wakes: RefCell<Vec<Tag>>,
    wake_hook: RefCell<Option<Box<dyn Fn(Tag)>>>,
}

impl RecordingSubscriber {
    pub fn new(name: &str) -> Rc<Self> {
        Rc::new(Self {
            name: name.to_owned(),
            active: Cell::new(true),
            needs_scheduler: Cell::new(true),
            invalidates: Cell::new(false),
            fail_reason: RefCell::new(None),
            wakes: RefCell::new(Vec::new()),
            wake_hook: RefCell::new(None),
        })
    }

    pub fn as_handle(self: &Rc<Self>) -> SubscriberHandle {
        self.clone()
    }

    pub fn set_active(&self, active: bool) {
        self.active.set(active);
    }

    pub fn set_needs_scheduler(&self, needs: bool) {
        self.needs_scheduler.set(needs);
    }

    pub fn set_invalidates(&self, invalidates: bool) {
        self.invalidates.set(invalidates);
    }

    /// Makes every following wake return an error with `reason`.
    pub fn fail_with(&self, reason: &str) {
        *self.fail_reason.borrow_mut() = Some(reason.to_owned());
    }

    pub fn clear_failure(&self) {
        *self.fail_reason.borrow_mut() = None;
    }

    /// Installs a hook invoked on every wake, after it is recorded. The
    /// hook may re-enter the scheduler through a `SchedulerHandle`.
    pub fn set_wake_hook(&self, hook: impl Fn(Tag) + 'static) {
        *self.wake_hook.borrow_mut() = Some(Box::new(hook));
    }

    pub fn wake_count(&self) -> usize {
        self.wakes.borrow().len()
    }

    pub fn wakes(&self) -> Vec<Tag> {
        self.wakes.borrow().clone()
    }
}

impl Subscriber for RecordingSubscriber {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_active(&self) -> bool {
        self.active.get()
    }

    fn needs_scheduler(&self) -> bool {
        self.needs_scheduler.get()
    }

    fn on_wake(&self, tag: Tag) -> Result<(), WakeError> {
        self.wakes.borrow_mut().push(tag);
        {
            let hook = self.wake_hook.borrow();
            if let Some(hook) = hook.as_ref() {
                hook(tag);
            }
        }
        match self.fail_reason.borrow().as_deref() {
            Some(reason) => Err(WakeError::new(reason)),
            None => Ok(()),
        }
    }

    fn should_invalidate(&self) -> bool {
        self.invalidates.get()
    }
}
