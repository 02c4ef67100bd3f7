use chrono::{DateTime, Duration, Utc};
use std::sync::{Arc, Mutex};

/// Time source for recordings and celebration expiry.
///
/// `Manual` clocks are shared: cloning one and advancing either copy moves
/// both, so a test can hand a clock to a session and still drive it.
#[derive(Debug, Clone, Default)]
pub enum Clock {
    #[default]
    System,
    Manual(Arc<Mutex<DateTime<Utc>>>),
}

impl Clock {
    #[must_use]
    pub fn system() -> Self {
        Self::System
    }

    /// A clock frozen at `at` until advanced.
    #[must_use]
    pub fn manual(at: DateTime<Utc>) -> Self {
        Self::Manual(Arc::new(Mutex::new(at)))
    }

    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        match self {
            Clock::System => Utc::now(),
            Clock::Manual(at) => match at.lock() {
                Ok(guard) => *guard,
                Err(poisoned) => *poisoned.into_inner(),
            },
        }
    }

    /// Move a manual clock forward. No effect on the system clock.
    pub fn advance(&self, delta: Duration) {
        if let Clock::Manual(at) = self {
            let mut guard = match at.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            *guard += delta;
        }
    }

    #[must_use]
    pub fn is_manual(&self) -> bool {
        matches!(self, Clock::Manual(_))
    }
}

/// Deterministic timestamp for tests (2023-11-14T22:13:20Z).
pub const FIXED_TEST_TIMESTAMP: i64 = 1_700_000_000;

/// # Panics
///
/// Panics if the fixed timestamp cannot be represented.
#[must_use]
pub fn fixed_now() -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(FIXED_TEST_TIMESTAMP, 0)
        .expect("fixed timestamp should be valid")
}

/// A manual clock starting at [`fixed_now`].
#[must_use]
pub fn fixed_clock() -> Clock {
    Clock::manual(fixed_now())
}
