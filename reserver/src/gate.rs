//! Time gate holding the agent until the sale opens

use chrono::{DateTime, Utc};
use std::time::Duration;

/// Shortest sleep scheduled while closed, so a sub-millisecond remainder
/// does not turn into a busy loop
const MIN_WAKE: Duration = Duration::from_millis(1);

/// Whether the gate lets the agent through
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GateStatus {
    /// Sale start has been reached
    Open,
    /// Sale start is still ahead
    Closed {
        /// Time left until sale start
        remaining: Duration,
    },
}

/// Compares the clock against the sale start and paces re-checks
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimeGate {
    poll_interval: Duration,
    report_countdown: bool,
}

impl TimeGate {
    /// Gate that re-checks at most every `poll_interval`
    #[must_use]
    pub const fn new(poll_interval: Duration, report_countdown: bool) -> Self {
        Self {
            poll_interval,
            report_countdown,
        }
    }

    /// Open once `now` is at or past `sale_start_at`
    #[must_use]
    pub fn check(&self, now: DateTime<Utc>, sale_start_at: DateTime<Utc>) -> GateStatus {
        match (sale_start_at - now).to_std() {
            Ok(remaining) if !remaining.is_zero() => GateStatus::Closed { remaining },
            _ => GateStatus::Open,
        }
    }

    /// Sleep before the next check: the poll interval, or less when the sale
    /// opens sooner
    #[must_use]
    pub fn next_wake(&self, remaining: Duration) -> Duration {
        self.poll_interval.min(remaining).max(MIN_WAKE)
    }

    /// Whether closed checks should log a countdown line
    #[must_use]
    pub const fn reports_countdown(&self) -> bool {
        self.report_countdown
    }
}

impl Default for TimeGate {
    fn default() -> Self {
        Self::new(Duration::from_secs(1), true)
    }
}

/// Render a remaining duration as `H:MM:SS`, or `D day(s), H:MM:SS`
#[must_use]
pub fn format_remaining(remaining: Duration) -> String {
    let total = remaining.as_secs();
    let days = total / 86_400;
    let hours = (total % 86_400) / 3_600;
    let minutes = (total % 3_600) / 60;
    let seconds = total % 60;

    match days {
        0 => format!("{hours}:{minutes:02}:{seconds:02}"),
        1 => format!("1 day, {hours}:{minutes:02}:{seconds:02}"),
        n => format!("{n} days, {hours}:{minutes:02}:{seconds:02}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;
    use salegate_core::environment::Clock;
    use salegate_testing::mocks::test_clock;

    #[test]
    fn test_future_sale_is_closed() {
        let gate = TimeGate::default();
        let now = test_clock().now();
        let start = now + TimeDelta::seconds(90);

        assert_eq!(
            gate.check(now, start),
            GateStatus::Closed { remaining: Duration::from_secs(90) }
        );
    }

    #[test]
    fn test_past_and_exact_sale_is_open() {
        let gate = TimeGate::default();
        let now = test_clock().now();

        assert_eq!(gate.check(now, now), GateStatus::Open);
        assert_eq!(gate.check(now, now - TimeDelta::hours(3)), GateStatus::Open);
    }

    #[test]
    fn test_next_wake_never_overshoots() {
        let gate = TimeGate::new(Duration::from_secs(1), true);

        assert_eq!(gate.next_wake(Duration::from_secs(30)), Duration::from_secs(1));
        assert_eq!(gate.next_wake(Duration::from_millis(250)), Duration::from_millis(250));
        assert_eq!(gate.next_wake(Duration::from_nanos(10)), MIN_WAKE);
    }

    #[test]
    fn test_format_remaining() {
        assert_eq!(format_remaining(Duration::from_secs(5)), "0:00:05");
        assert_eq!(format_remaining(Duration::from_secs(3_725)), "1:02:05");
        assert_eq!(format_remaining(Duration::from_secs(86_400 + 61)), "1 day, 0:01:01");
        assert_eq!(format_remaining(Duration::from_secs(3 * 86_400)), "3 days, 0:00:00");
    }
}
