//! Cycle-driven co-simulation harness for clocked hardware models.
//!
//! This crate drives an opaque, steppable hardware model from the host side with the following:
//! 1. **Driver:** Fixed-timestep loop that applies clock and reset, evaluates the model, and samples outputs.
//! 2. **Termination:** Model completion, simulated-time budget, or operator interrupt via a write-once stop flag.
//! 3. **Tracing:** Optional VCD waveform capture (delayed by a start offset) and a binary PC trace.
//! 4. **Observation:** GPIO level-change reporting and end-of-run statistics.
//! 5. **Tooling:** Firmware image conversion (ELF to flat binary to word-per-line hex) and a reference model.

/// Common types and constants (simulated time, timing defaults, errors).
pub mod common;
/// Run configuration (defaults, JSON loading, `+plusarg` launch parameters).
pub mod config;
/// Model capability traits and the built-in reference model.
pub mod model;
/// Simulation driver, edge detector, stop flag, and firmware tools.
pub mod sim;
/// Run statistics collection and reporting.
pub mod stats;
/// Waveform and PC trace writers.
pub mod trace;

/// Launch configuration; use `RunConfig::default()` or load from JSON / plusargs.
pub use crate::config::RunConfig;
/// Error type returned by fallible setup operations.
pub use crate::common::error::HarnessError;
/// Simulated time in nanoseconds.
pub use crate::common::time::SimTime;
/// Capability interface of a steppable hardware model.
pub use crate::model::Model;
/// The simulation driver; construct with `Driver::new`.
pub use crate::sim::driver::{Driver, RunOutcome, RunReport};
