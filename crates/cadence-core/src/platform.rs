//! Platform abstraction traits for the scheduler's host services.
//!
//! These traits let the scheduler delegate surface state, timing, and
//! timer bookkeeping to the host environment, so the core stays free of
//! any particular windowing or timer backend.

use crate::Tag;

/// The host surface the scheduler drives.
///
/// The scheduler reads visibility and power state from here on every
/// wake-up and reports tick and redraw events back; it never manages the
/// surface lifecycle itself.
pub trait HostSurface {
    /// Whether the surface is currently visible.
    fn is_visible(&self) -> bool;

    /// Whether the surface is in the low-power ambient display state.
    fn is_in_ambient_mode(&self) -> bool;

    /// Delivered once per interactive time tick while the surface is active.
    fn on_time_tick(&self);

    /// Request a redraw of the surface.
    fn invalidate(&self);
}

/// Provides the wall-clock timeline shared by the scheduler and its
/// timer driver.
pub trait Clock {
    /// Milliseconds since the clock's epoch. Periodic firings are aligned
    /// to absolute boundaries of this timeline.
    fn now_millis(&self) -> u64;
}

/// A single logical timer source with per-tag one-shot wake-ups.
///
/// Implementations must hold at most one pending wake-up per tag; the
/// `is_pending` guard is what prevents duplicate timers when a tag is
/// started twice before it fires.
pub trait TimerDriver {
    /// True while a wake-up for `tag` is scheduled and not yet fired or
    /// cancelled.
    fn is_pending(&self, tag: Tag) -> bool;

    /// Arms a one-shot wake-up for `tag` after `delay_millis`. No-op when
    /// a wake-up for the tag is already pending.
    fn schedule_after(&mut self, tag: Tag, delay_millis: u64);

    /// Removes any pending wake-up for `tag`. No-op when none is pending.
    fn cancel(&mut self, tag: Tag);

    /// Pops the earliest wake-up whose deadline is at or before
    /// `now_millis`, or `None` when nothing is due.
    fn poll_expired(&mut self, now_millis: u64) -> Option<Tag>;

    /// Earliest pending deadline, for hosts that sleep between wake-ups.
    fn next_deadline(&self) -> Option<u64>;
}
