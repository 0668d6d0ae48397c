use crate::domain::Timestamp;
use chrono::Duration;

// ============================================================================
// TRAITS
// ============================================================================

/// Basic clock trait - provides current time
///
/// Every timestamp the ledger, snapshot stream and candle aggregator record
/// comes from a `Clock`, so tests can pin and advance time explicitly.
pub trait Clock: Send + Sync {
    /// Get current time from this clock's perspective
    fn now(&self) -> Timestamp;

    /// Get current time as milliseconds since Unix epoch
    fn now_millis(&self) -> i64 {
        self.now().timestamp_millis()
    }

    /// Get current time as whole seconds since Unix epoch
    fn now_secs(&self) -> i64 {
        self.now().timestamp()
    }
}

/// A clock that can be controlled (for simulation)
pub trait ControllableClock: Clock {
    /// Advance time by a duration
    fn advance(&self, duration: Duration);

    /// Set time to a specific value
    fn set_time(&self, time: Timestamp);
}
