//! # Salegate Testing
//!
//! Testing utilities for salegate reducers.
//!
//! This crate provides:
//! - [`FixedClock`] so the time gate can be placed on either side of a sale start
//! - [`ReducerTest`], a Given-When-Then harness for single transitions
//! - Effect assertions in [`assertions`]
//!
//! ## Example
//!
//! ```ignore
//! use salegate_testing::{ReducerTest, FixedClock};
//!
//! ReducerTest::new(ReserverReducer::new())
//!     .with_env(env_with_clock(FixedClock::at("2025-01-01T12:00:00Z")))
//!     .given_state(state_waiting_for_sale())
//!     .when_action(ReserverAction::GateTick)
//!     .then_state(|s| assert_eq!(s.phase, Phase::WaitingForSale))
//!     .run();
//! ```

use chrono::{DateTime, Utc};
use salegate_core::environment::Clock;


pub use reducer_test::{assertions, ReducerTest};

/// Mock implementations of Environment traits
pub mod mocks {
    use super::{Clock, DateTime, Utc};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use salegate_testing::mocks::FixedClock;
    /// use salegate_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }

        /// Create a fixed clock from an RFC 3339 timestamp
        ///
        /// # Panics
        ///
        /// Panics if `timestamp` is not valid RFC 3339. Only meant for
        /// hardcoded test fixtures.
        #[must_use]
        #[allow(clippy::expect_used)]
        pub fn at(timestamp: &str) -> Self {
            Self::new(
                DateTime::parse_from_rfc3339(timestamp)
                    .expect("test timestamp should be RFC 3339")
                    .with_timezone(&Utc),
            )
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    #[must_use]
    pub fn test_clock() -> FixedClock {
        FixedClock::at("2025-01-01T00:00:00Z")
    }
}

pub use mocks::{test_clock, FixedClock};
