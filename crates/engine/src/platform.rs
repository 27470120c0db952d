//! Platform implementations of the capability traits.
//!
//! - [`SystemClock`]: real monotonic time
//! - [`ManualClock`]: time that only moves when told to

use crate::traits::Clock;
use std::sync::Mutex;
use std::time::{Duration, Instant};

// ===========================================================================
// System clock – wraps Instant::now
// ===========================================================================

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

// ===========================================================================
// Manual clock – deterministic time for tests and scenarios
// ===========================================================================

/// Clock frozen at its creation instant until [`ManualClock::advance`].
pub struct ManualClock {
    now: Mutex<Instant>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Instant::now()),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}
