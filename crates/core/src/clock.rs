//! Wall-clock port.
//!
//! Entitlement decisions compare token timestamps against "now", so the
//! current time is injected rather than read ad hoc. Production code uses
//! [`SystemClock`]; tests pin time with [`FixedClock`].

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};

/// Source of the current UTC time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// System clock backed by `Utc::now()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl SystemClock {
    pub fn new() -> Self {
        Self
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Controllable clock for deterministic tests.
///
/// Clones share the same underlying instant, so advancing one clone is
/// visible through all of them.
#[derive(Debug, Clone)]
pub struct FixedClock {
    current: Arc<Mutex<DateTime<Utc>>>,
}

impl FixedClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            current: Arc::new(Mutex::new(start)),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        *current += by;
    }

    pub fn set(&self, at: DateTime<Utc>) {
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        *current = at;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.current.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }
}
