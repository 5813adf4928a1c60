//! Console clock driven by the Cadence scheduler.
//!
//! A seconds hand subscriber fires on one-second boundaries and the
//! reserved interactive tick lands on each minute. Run with
//! `RUST_LOG=debug` to watch the scheduler traffic.

use std::rc::Rc;
use std::thread;
use std::time::Duration;

use cadence_core::{Clock, HostSurface, Subscriber, SubscriberHandle, Tag, WakeError};
use cadence_runtime_std::{StdRuntime, SystemClock};

const SECONDS_TAG: Tag = 0x10;

struct ConsoleHost;

impl HostSurface for ConsoleHost {
    fn is_visible(&self) -> bool {
        true
    }

    fn is_in_ambient_mode(&self) -> bool {
        false
    }

    fn on_time_tick(&self) {
        println!("-- minute tick --");
    }

    fn invalidate(&self) {
        log::debug!("redraw requested");
    }
}

struct SecondsHand {
    clock: Rc<SystemClock>,
}

impl Subscriber for SecondsHand {
    fn name(&self) -> &str {
        "seconds-hand"
    }

    fn on_wake(&self, _tag: Tag) -> Result<(), WakeError> {
        let seconds = self.clock.now_millis() / 1_000 % 60;
        println!("second hand at :{seconds:02}");
        Ok(())
    }

    fn should_invalidate(&self) -> bool {
        true
    }
}

fn main() {
    env_logger::init();

    let runtime = StdRuntime::new();
    let clock = runtime.clock();
    let scheduler = runtime.scheduler(Rc::new(ConsoleHost));
    scheduler.initialize();

    let seconds: SubscriberHandle = Rc::new(SecondsHand {
        clock: clock.clone(),
    });
    scheduler.register(&seconds, SECONDS_TAG, 1_000);

    loop {
        let now = clock.now_millis();
        match scheduler.next_deadline() {
            Some(deadline) if deadline > now => {
                thread::sleep(Duration::from_millis(deadline - now));
            }
            Some(_) => {}
            None => break,
        }
        scheduler.pump();
    }
}
