//! Simulated time.
//!
//! The harness keeps a single monotonically increasing counter in nanoseconds. It is the
//! clock source for the model (clock edges are derived from it) and the timestamp for every
//! trace sample and console record.

use std::fmt;

use serde::Deserialize;

/// A point in simulated time, in nanoseconds since the start of the run.
///
/// Time only moves forward: the only mutation is [`SimTime::advance`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(transparent)]
pub struct SimTime(pub u64);

impl SimTime {
    /// Time zero.
    pub const ZERO: Self = Self(0);

    /// Creates a time value from raw nanoseconds.
    #[inline(always)]
    pub const fn new(ns: u64) -> Self {
        Self(ns)
    }

    /// Converts a whole number of seconds into simulated time using `scale` units per second.
    ///
    /// Saturates at `u64::MAX` rather than wrapping.
    pub const fn from_seconds(seconds: u64, scale: u64) -> Self {
        Self(seconds.saturating_mul(scale))
    }

    /// Returns the raw nanosecond value.
    #[inline(always)]
    pub const fn val(self) -> u64 {
        self.0
    }

    /// Returns `true` if this time falls exactly on a multiple of `period`.
    ///
    /// A zero period never aligns.
    #[inline(always)]
    pub const fn is_aligned_to(self, period: u64) -> bool {
        period != 0 && self.0 % period == 0
    }

    /// Advances time by `step` nanoseconds, saturating at the end of the time base.
    #[inline(always)]
    pub const fn advance(&mut self, step: u64) {
        self.0 = self.0.saturating_add(step);
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for SimTime {
    fn from(ns: u64) -> Self {
        Self(ns)
    }
}
