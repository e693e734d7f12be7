//! Wall-clock abstraction.
//!
//! The workflow stamps verification and resolution times through this
//! trait so tests can pin the clock instead of racing `Utc::now()`.

use chrono::{DateTime, Utc};
use std::sync::Mutex;

pub trait Clock: Send {
    fn now(&self) -> DateTime<Utc>;
}

/// Production clock: reads the system time.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Settable clock for tests. Time only moves when `set` is called.
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap() = now;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

// Lets a test hold a handle to the clock it handed to the workflow.
impl<C: Clock + Sync> Clock for std::sync::Arc<C> {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }
}
