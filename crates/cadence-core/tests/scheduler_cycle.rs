//! End-to-end wake cycle: register, fire, reschedule, invalidate.

use std::rc::Rc;

use cadence_core::{Scheduler, INTERACTIVE_TIME_TICK};
use cadence_testing::{FakeClock, FakeHost, ManualTimerDriver, RecordingSubscriber};

const TAG: u32 = 0x10;

#[test]
fn full_500ms_cycle_with_single_invalidate_between_wakes() {
    let clock = FakeClock::default();
    let driver = ManualTimerDriver::new(clock.clone());
    let host = FakeHost::new();
    let scheduler = Scheduler::new(
        Rc::new(host.clone()),
        Rc::new(clock.clone()),
        Box::new(driver.clone()),
    );
    scheduler.initialize();
    scheduler.stop_interactive_ticker();

    let sub = RecordingSubscriber::new("a");
    sub.set_invalidates(true);
    scheduler.register(&sub.as_handle(), TAG, 500);

    // First wake lands on the next 500 ms boundary.
    clock.set(500);
    scheduler.pump();
    assert_eq!(sub.wakes(), vec![TAG]);
    assert_eq!(host.invalidations(), 1);

    // needs_scheduler() is still true, so a second wake follows ~500 ms
    // later, with exactly one invalidate observed in between.
    assert_eq!(scheduler.next_deadline(), Some(1_000));
    clock.set(1_000);
    scheduler.pump();
    assert_eq!(sub.wake_count(), 2);
    assert_eq!(host.invalidations(), 2);
}

#[test]
fn subscriber_that_stops_needing_the_scheduler_winds_down() {
    let clock = FakeClock::default();
    let driver = ManualTimerDriver::new(clock.clone());
    let host = FakeHost::new();
    let scheduler = Scheduler::new(
        Rc::new(host.clone()),
        Rc::new(clock.clone()),
        Box::new(driver.clone()),
    );
    scheduler.initialize();
    scheduler.stop_interactive_ticker();

    let sub = RecordingSubscriber::new("a");
    scheduler.register(&sub.as_handle(), TAG, 500);

    clock.set(500);
    scheduler.pump();
    assert_eq!(sub.wake_count(), 1);

    sub.set_needs_scheduler(false);
    clock.set(1_000);
    scheduler.pump();
    // Nothing ran, so the tag is not re-armed.
    assert_eq!(sub.wake_count(), 1);
    assert_eq!(scheduler.next_deadline(), None);

    // Waking up again is a registration away.
    sub.set_needs_scheduler(true);
    scheduler.register(&sub.as_handle(), TAG, 500);
    assert_eq!(scheduler.next_deadline(), Some(1_500));
}

#[test]
fn ambient_round_trip_suspends_and_resumes() {
    let clock = FakeClock::default();
    let driver = ManualTimerDriver::new(clock.clone());
    let host = FakeHost::new();
    let scheduler = Scheduler::new(
        Rc::new(host.clone()),
        Rc::new(clock.clone()),
        Box::new(driver.clone()),
    );
    scheduler.initialize();

    let sub = RecordingSubscriber::new("a");
    scheduler.register(&sub.as_handle(), TAG, 500);

    // Surface drops into ambient; the host disables the scheduler.
    host.set_ambient(true);
    scheduler.disable();
    clock.set(120_000);
    scheduler.pump();
    assert_eq!(sub.wake_count(), 0);
    assert_eq!(host.time_ticks(), 0);

    // Back to interactive: everything re-arms on fresh boundaries.
    host.set_ambient(false);
    scheduler.enable();
    assert_eq!(driver.deadline_for(TAG), Some(120_500));
    assert_eq!(driver.deadline_for(INTERACTIVE_TIME_TICK), Some(180_000));
    clock.set(120_500);
    scheduler.pump();
    assert_eq!(sub.wake_count(), 1);
}
