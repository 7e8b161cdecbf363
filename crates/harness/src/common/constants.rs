//! Global Harness Constants.
//!
//! This module defines the timing constants used by the driver and the
//! configuration defaults. It includes:
//! 1. **Clock Constants:** Half period of the model clock.
//! 2. **Reset Constants:** How long reset stays asserted after time zero.
//! 3. **Scale Constants:** Conversion from launch-parameter seconds to time units.
//! 4. **Output Constants:** Default file names for the optional trace outputs.

/// Half period of the model clock in nanoseconds (1 MHz clock).
pub const DEFAULT_HALF_PERIOD: u64 = 500;

/// Reset is asserted while simulated time is below this value (nanoseconds).
pub const DEFAULT_RESET_THRESHOLD: u64 = 2000;

/// Simulated time units per second of a seconds-valued launch parameter.
pub const NS_PER_SECOND: u64 = 1_000_000_000;

/// Default waveform output file name.
pub const DEFAULT_TRACE_PATH: &str = "trace.vcd";

/// Default PC trace output file name.
pub const DEFAULT_TRACE_PC_PATH: &str = "trace.bin";
