//! # Tixchain Testing
//!
//! Testing utilities for tixchain reducers.
//!
//! This crate provides:
//! - [`FixedClock`]: deterministic, manually advanced time
//! - [`ReducerTest`]: Given-When-Then harness for reducers
//! - [`assertions`]: helpers for inspecting returned effects
//!
//! ## Example
//!
//! ```ignore
//! use tixchain_testing::{test_clock, ReducerTest};
//!
//! ReducerTest::new(PurchaseReducer::new())
//!     .with_env(PurchaseEnvironment::new(chain.shared(), Arc::new(test_clock())))
//!     .given_state(loaded_state)
//!     .when_action(PurchaseAction::Purchase { buyer: Some(buyer) })
//!     .then_state(|state| assert!(state.status.status().is_processing()))
//!     .run();
//! ```

use chrono::{DateTime, Duration, Utc};
use std::sync::{Arc, RwLock};
use tixchain_core::environment::Clock;

mod reducer_test;

pub use reducer_test::{assertions, ReducerTest};

/// Mock implementations of Environment traits
pub mod mocks {
    use super::{Arc, Clock, DateTime, Duration, RwLock, Utc};

    /// Fixed clock for deterministic tests
    ///
    /// Returns the same instant until moved with [`FixedClock::set`] or
    /// [`FixedClock::advance`]. Clones share the same instant, so a test can
    /// keep one clone and move time under an environment that holds another.
    ///
    /// # Example
    ///
    /// ```
    /// use tixchain_testing::mocks::FixedClock;
    /// use tixchain_core::environment::Clock;
    /// use chrono::{Duration, Utc};
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let before = clock.now();
    /// clock.advance(Duration::days(1));
    /// assert_eq!(clock.now() - before, Duration::days(1));
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: Arc<RwLock<DateTime<Utc>>>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub fn new(time: DateTime<Utc>) -> Self {
            Self {
                time: Arc::new(RwLock::new(time)),
            }
        }

        /// Move the clock to `time`
        pub fn set(&self, time: DateTime<Utc>) {
            let mut guard = self
                .time
                .write()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            *guard = time;
        }

        /// Move the clock forward by `by`
        pub fn advance(&self, by: Duration) {
            let mut guard = self
                .time
                .write()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            *guard += by;
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            *self
                .time
                .read()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// Panics if the hardcoded timestamp fails to parse, which cannot happen.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }
}

pub use mocks::{test_clock, FixedClock};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_clock_is_stable() {
        let clock = test_clock();
        assert_eq!(clock.now(), clock.now());
    }

    #[test]
    fn clones_share_time() {
        let clock = test_clock();
        let shared = clock.clone();
        let start = clock.now();

        shared.advance(Duration::hours(2));
        assert_eq!(clock.now(), start + Duration::hours(2));

        clock.set(start);
        assert_eq!(shared.now(), start);
    }
}
