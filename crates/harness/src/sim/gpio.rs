//! GPIO level-change detection.
//!
//! A pure level-change detector: a record is produced whenever the monitored output differs
//! from the previously observed value. A one-iteration glitch and a sustained change look the
//! same; there is no debouncing and no edge counting.

use std::fmt;

use crate::common::time::SimTime;

/// One observed change of the monitored output.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GpioTransition {
    /// Simulated time of the observation.
    pub time: SimTime,
    /// New output level.
    pub level: bool,
}

impl fmt::Display for GpioTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} output q is {}",
            self.time,
            if self.level { "ON" } else { "OFF" }
        )
    }
}

/// Last observed value of the monitored output.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GpioEdgeContext {
    last_value: bool,
}

impl GpioEdgeContext {
    /// Creates a context that considers `initial` the current level.
    pub const fn new(initial: bool) -> Self {
        Self {
            last_value: initial,
        }
    }

    /// The most recently observed level.
    pub const fn last_value(&self) -> bool {
        self.last_value
    }

    /// Compares `level` with the stored value; on a difference stores it and returns a record.
    pub const fn observe(&mut self, time: SimTime, level: bool) -> Option<GpioTransition> {
        if self.last_value == level {
            return None;
        }
        self.last_value = level;
        Some(GpioTransition { time, level })
    }
}
