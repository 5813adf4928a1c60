#![doc = r"Core scheduling runtime for the Cadence periodic dispatcher."]

pub mod intervals;
pub mod platform;
pub mod scheduler;
pub mod subscribers;
pub mod time_text;

pub use intervals::IntervalRegistry;
pub use platform::{Clock, HostSurface, TimerDriver};
pub use scheduler::{Scheduler, SchedulerHandle, INTERACTIVE_TIME_TICK};
pub use subscribers::{RemoveOutcome, Subscriber, SubscriberHandle, SubscriberTable, WakeError};
pub use time_text::{TextBounds, TextMeasurer, TimeField, TimeFormat, TimeSnapshot, TimeText};

/// Identifier for an interval class. Tags are opaque to the scheduler;
/// the single reserved value is [`INTERACTIVE_TIME_TICK`].
pub type Tag = u32;
