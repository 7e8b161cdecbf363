//! Simulation control.
//!
//! Provides the driver loop, its observation and interrupt helpers, and the firmware
//! preparation used before a run.

/// Simulation driver and run outcome types.
pub mod driver;
/// ELF and binary to hex image conversion.
pub mod firmware;
/// GPIO level-change detection.
pub mod gpio;
/// Operator interrupt stop flag.
pub mod interrupt;

pub use driver::{Driver, FinishedRun, RunOutcome, RunReport};
pub use gpio::{GpioEdgeContext, GpioTransition};
pub use interrupt::StopFlag;
