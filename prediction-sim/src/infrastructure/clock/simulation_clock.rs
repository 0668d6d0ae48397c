use crate::domain::{Clock, ControllableClock, Timestamp};
use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use std::sync::Arc;

/// Simulation clock shared by the ledger, the snapshot stream and the
/// candle scheduler.
///
/// In `RealTime` it follows the wall clock from a movable reference point.
/// In `Fixed` it only moves through `advance` and `set_time`, which is how
/// tests pin candle buckets.
#[derive(Debug)]
pub struct SimulationClock {
    inner: Arc<RwLock<ClockState>>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum TimeScale {
    RealTime,
    /// Time only advances via explicit advance() calls
    Fixed,
}

#[derive(Debug)]
struct ClockState {
    /// The reference point in simulated time
    simulated_time: DateTime<Utc>,
    /// The wall clock time when simulation started/was last reset
    wall_clock_reference: DateTime<Utc>,
    time_scale: TimeScale,
}

impl ClockState {
    fn current(&self) -> Timestamp {
        match self.time_scale {
            TimeScale::Fixed => self.simulated_time,
            TimeScale::RealTime => self.simulated_time + (Utc::now() - self.wall_clock_reference),
        }
    }
}

impl SimulationClock {
    pub fn new() -> Self {
        let now = Utc::now();
        SimulationClock {
            inner: Arc::new(RwLock::new(ClockState {
                simulated_time: now,
                wall_clock_reference: now,
                time_scale: TimeScale::RealTime,
            })),
        }
    }

    /// Create a clock starting at a specific time (in Fixed mode)
    pub fn at(time: DateTime<Utc>) -> Self {
        SimulationClock {
            inner: Arc::new(RwLock::new(ClockState {
                simulated_time: time,
                wall_clock_reference: Utc::now(),
                time_scale: TimeScale::Fixed,
            })),
        }
    }

    /// Create a clock in fixed mode at current time
    pub fn fixed() -> Self {
        Self::at(Utc::now())
    }
}

impl Default for SimulationClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for SimulationClock {
    fn clone(&self) -> Self {
        SimulationClock {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Clock for SimulationClock {
    fn now(&self) -> Timestamp {
        self.inner.read().current()
    }
}

impl ControllableClock for SimulationClock {
    fn advance(&self, duration: Duration) {
        let mut state = self.inner.write();
        state.simulated_time = state.current() + duration;
        state.wall_clock_reference = Utc::now();
    }

    fn set_time(&self, time: Timestamp) {
        let mut state = self.inner.write();
        state.simulated_time = time;
        state.wall_clock_reference = Utc::now();
    }
}
