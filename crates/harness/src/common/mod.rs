//! Common utilities and types used throughout the harness.
//!
//! This module provides the building blocks shared by the driver, the trace writers
//! and the configuration layer. It includes:
//! 1. **Simulated Time:** A strong type for the nanosecond time base.
//! 2. **Constants:** Default clock period, reset length and time scale.
//! 3. **Error Handling:** The harness error type.

/// Default timing constants.
pub mod constants;

/// Error types.
pub mod error;

/// Simulated time type.
pub mod time;

pub use constants::{DEFAULT_HALF_PERIOD, DEFAULT_RESET_THRESHOLD, NS_PER_SECOND};
pub use error::HarnessError;
pub use time::SimTime;
