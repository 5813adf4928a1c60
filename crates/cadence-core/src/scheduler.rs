//! The dispatcher at the heart of Cadence.
//!
//! A [`Scheduler`] owns the interval registry, the subscriber table, and a
//! [`TimerDriver`], and decides on every wake-up which subscribers run,
//! whether the tag is re-armed, and whether the host needs a redraw. All
//! state is processed on one thread; re-entrant mutation from inside a wake
//! handler goes through a [`SchedulerHandle`] and is made safe by the
//! per-wake subscriber snapshot.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use crate::intervals::IntervalRegistry;
use crate::platform::{Clock, HostSurface, TimerDriver};
use crate::subscribers::{RemoveOutcome, SubscriberHandle, SubscriberTable};
use crate::Tag;

/// Reserved tag for the built-in interactive time tick. It has no
/// subscriber list; firings go straight to [`HostSurface::on_time_tick`].
pub const INTERACTIVE_TIME_TICK: Tag = 0xFFFF;

const INTERACTIVE_TICK_INTERVAL_MILLIS: u64 = 60_000;

struct SchedulerInner {
    host: Rc<dyn HostSurface>,
    clock: Rc<dyn Clock>,
    driver: RefCell<Box<dyn TimerDriver>>,
    intervals: RefCell<IntervalRegistry>,
    subscribers: RefCell<SubscriberTable>,
    enabled: Cell<bool>,
    initialized: Cell<bool>,
}

impl SchedulerInner {
    fn should_not_run(&self) -> bool {
        !self.host.is_visible() || self.host.is_in_ambient_mode()
    }

    /// Arms the timer for `tag` unless one is already pending, the tag has
    /// no configured interval, or the scheduler is disabled. The delay is
    /// chosen so firings land on absolute multiples of the interval.
    fn start(&self, tag: Tag) {
        if !self.initialized.get() || !self.enabled.get() {
            return;
        }
        if self.driver.borrow().is_pending(tag) {
            return;
        }
        let Some(interval) = self.intervals.borrow().interval(tag) else {
            return;
        };
        let delay = interval - self.clock.now_millis() % interval;
        self.driver.borrow_mut().schedule_after(tag, delay);
    }

    fn stop(&self, tag: Tag) {
        if !self.initialized.get() {
            return;
        }
        self.driver.borrow_mut().cancel(tag);
    }

    fn register(&self, subscriber: &SubscriberHandle, tag: Tag, interval_millis: u64) {
        if tag == INTERACTIVE_TIME_TICK {
            log::warn!(
                "tag {tag:#x} is reserved for the interactive time tick; \
                 {} will not be registered",
                subscriber.name()
            );
            return;
        }
        log::debug!("registering {} for tag {tag:#x}", subscriber.name());
        self.subscribers.borrow_mut().add(tag, subscriber);
        self.intervals.borrow_mut().set_interval(tag, interval_millis);
        self.start(tag);
    }

    fn unregister(&self, subscriber: &SubscriberHandle, tag: Tag) {
        log::debug!("unregistering {} from tag {tag:#x}", subscriber.name());
        let outcome = self.subscribers.borrow_mut().remove(tag, subscriber);
        if outcome == RemoveOutcome::TagEmptied {
            self.intervals.borrow_mut().remove(tag);
            self.stop(tag);
        }
    }

    fn enable(&self) {
        self.enabled.set(true);
        self.start(INTERACTIVE_TIME_TICK);
        for tag in self.registered_tags() {
            self.start(tag);
        }
    }

    fn disable(&self) {
        self.enabled.set(false);
        self.stop(INTERACTIVE_TIME_TICK);
        for tag in self.registered_tags() {
            self.stop(tag);
        }
    }

    fn registered_tags(&self) -> Vec<Tag> {
        self.subscribers.borrow().tags().collect()
    }

    /// Processes one firing of `tag`.
    ///
    /// Suspension is a check-and-return at the top, not a blocking wait: a
    /// fire that arrives while the surface is invisible, ambient, or the
    /// scheduler is disabled is a no-op, with no reschedule and no redraw.
    fn handle_wake(&self, tag: Tag) {
        if !self.enabled.get() || self.should_not_run() {
            return;
        }

        let mut reschedule = false;
        let mut invalidate = false;

        if tag == INTERACTIVE_TIME_TICK {
            log::debug!("delivering interactive time tick");
            self.host.on_time_tick();
            reschedule = true;
            invalidate = true;
        } else {
            let snapshot = self.subscribers.borrow().snapshot(tag);
            if snapshot.is_empty() {
                // Covers a fire already in flight for a tag that was
                // cancelled since it was armed.
                return;
            }
            // No borrow is held across the wake calls, so a subscriber may
            // re-enter through a SchedulerHandle and change its own
            // registration.
            for subscriber in &snapshot {
                if !(subscriber.is_active() && subscriber.needs_scheduler()) {
                    continue;
                }
                reschedule = true;
                match subscriber.on_wake(tag) {
                    Ok(()) => invalidate |= subscriber.should_invalidate(),
                    Err(err) => log::error!(
                        "wake for tag {tag:#x} failed in {}: {err}",
                        subscriber.name()
                    ),
                }
            }
        }

        if reschedule {
            self.start(tag);
        }
        if invalidate {
            self.host.invalidate();
        }
    }

    fn pump(&self) {
        loop {
            let expired = {
                let now = self.clock.now_millis();
                self.driver.borrow_mut().poll_expired(now)
            };
            match expired {
                Some(tag) => self.handle_wake(tag),
                None => break,
            }
        }
    }
}

/// Owning handle to the dispatcher. Clones share the same state.
#[derive(Clone)]
pub struct Scheduler {
    inner: Rc<SchedulerInner>,
}

impl Scheduler {
    pub fn new(
        host: Rc<dyn HostSurface>,
        clock: Rc<dyn Clock>,
        driver: Box<dyn TimerDriver>,
    ) -> Self {
        Self {
            inner: Rc::new(SchedulerInner {
                host,
                clock,
                driver: RefCell::new(driver),
                intervals: RefCell::new(IntervalRegistry::new()),
                subscribers: RefCell::new(SubscriberTable::new()),
                enabled: Cell::new(false),
                initialized: Cell::new(false),
            }),
        }
    }

    /// Seeds the reserved interactive-tick interval and, when the host is
    /// not suspended, starts the ticker. Until this is called every start
    /// request is a no-op.
    pub fn initialize(&self) {
        self.inner.initialized.set(true);
        self.inner.enabled.set(true);
        log::debug!(
            "registering interactive time updater with tag {INTERACTIVE_TIME_TICK:#x}"
        );
        self.inner
            .intervals
            .borrow_mut()
            .set_interval(INTERACTIVE_TIME_TICK, INTERACTIVE_TICK_INTERVAL_MILLIS);
        if !self.inner.should_not_run() {
            self.inner.start(INTERACTIVE_TIME_TICK);
        }
    }

    /// Registers `subscriber` under `tag` and arms the tag's timer. The
    /// first registration for a tag decides its interval; a conflicting
    /// later value is ignored with a warning.
    pub fn register(&self, subscriber: &SubscriberHandle, tag: Tag, interval_millis: u64) {
        self.inner.register(subscriber, tag, interval_millis);
    }

    /// Removes `subscriber` from `tag`; when it was the last one, the
    /// tag's timer is cancelled and its interval configuration dropped.
    pub fn unregister(&self, subscriber: &SubscriberHandle, tag: Tag) {
        self.inner.unregister(subscriber, tag);
    }

    /// Re-arms the reserved tick and every currently registered tag.
    pub fn enable(&self) {
        self.inner.enable();
    }

    /// Cancels every armed tag including the reserved tick. A fire already
    /// in flight short-circuits in the wake handler.
    pub fn disable(&self) {
        self.inner.disable();
    }

    pub fn start_interactive_ticker(&self) {
        self.inner.start(INTERACTIVE_TIME_TICK);
    }

    pub fn stop_interactive_ticker(&self) {
        self.inner.stop(INTERACTIVE_TIME_TICK);
    }

    /// Runs one firing of `tag` through the dispatch algorithm. Hosts with
    /// native timers call this from their timer callback; polling hosts use
    /// [`Scheduler::pump`] instead.
    pub fn handle_wake(&self, tag: Tag) {
        self.inner.handle_wake(tag);
    }

    /// Drains every due wake-up from the timer driver, earliest first.
    pub fn pump(&self) {
        self.inner.pump();
    }

    /// Earliest pending deadline on the shared clock timeline.
    pub fn next_deadline(&self) -> Option<u64> {
        self.inner.driver.borrow().next_deadline()
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.enabled.get()
    }

    pub fn is_pending(&self, tag: Tag) -> bool {
        self.inner.driver.borrow().is_pending(tag)
    }

    /// Weak handle for subscribers that mutate their own registration from
    /// inside a wake handler.
    pub fn handle(&self) -> SchedulerHandle {
        SchedulerHandle(Rc::downgrade(&self.inner))
    }
}

/// Weak, clonable handle to a [`Scheduler`]. Every operation is a no-op
/// once the scheduler has been dropped.
#[derive(Clone)]
pub struct SchedulerHandle(Weak<SchedulerInner>);

impl SchedulerHandle {
    pub fn register(&self, subscriber: &SubscriberHandle, tag: Tag, interval_millis: u64) {
        if let Some(inner) = self.0.upgrade() {
            inner.register(subscriber, tag, interval_millis);
        }
    }

    pub fn unregister(&self, subscriber: &SubscriberHandle, tag: Tag) {
        if let Some(inner) = self.0.upgrade() {
            inner.unregister(subscriber, tag);
        }
    }

    pub fn enable(&self) {
        if let Some(inner) = self.0.upgrade() {
            inner.enable();
        }
    }

    pub fn disable(&self) {
        if let Some(inner) = self.0.upgrade() {
            inner.disable();
        }
    }

    pub fn start_interactive_ticker(&self) {
        if let Some(inner) = self.0.upgrade() {
            inner.start(INTERACTIVE_TIME_TICK);
        }
    }

    pub fn stop_interactive_ticker(&self) {
        if let Some(inner) = self.0.upgrade() {
            inner.stop(INTERACTIVE_TIME_TICK);
        }
    }
}

// The dispatch tests live in tests/scheduler.rs: they drive the scheduler
// through the cadence-testing doubles, whose trait impls only unify with
// the library build, not the separately compiled unit-test build.
