//! Trace outputs.
//!
//! Two optional sinks can be attached to a run. It provides:
//! 1. **Waveforms:** The `WaveformRecorder` trait and a VCD implementation.
//! 2. **PC Trace:** The `PcRecorder` trait and a binary little-endian implementation.
//!
//! Both traits require an idempotent `close`: the driver calls it exactly once at shutdown,
//! but a recorder may also be closed early if a write fails mid-run.

use std::io;

use crate::common::time::SimTime;
use crate::model::SignalDecl;

/// Binary program-counter trace writer.
pub mod pc;

/// Value Change Dump waveform writer.
pub mod vcd;

pub use pc::PcTraceWriter;
pub use vcd::VcdRecorder;

/// Sink for waveform samples keyed by simulated time.
pub trait WaveformRecorder {
    /// Declares the traced signals. Called once, before the first `dump`.
    fn declare(&mut self, signals: &[SignalDecl]) -> io::Result<()>;
    /// Records the values of all declared signals at `time`.
    ///
    /// `values` holds one entry per declared signal, in declaration order.
    fn dump(&mut self, time: SimTime, values: &[u64]) -> io::Result<()>;
    /// Flushes pending samples and finalizes the output.
    fn close(&mut self) -> io::Result<()>;
}

/// Sink for retired program-counter values.
pub trait PcRecorder {
    /// Appends one retired PC.
    fn record(&mut self, pc: u32) -> io::Result<()>;
    /// Flushes and releases the stream.
    fn close(&mut self) -> io::Result<()>;
}

impl<R: WaveformRecorder + ?Sized> WaveformRecorder for Box<R> {
    fn declare(&mut self, signals: &[SignalDecl]) -> io::Result<()> {
        (**self).declare(signals)
    }
    fn dump(&mut self, time: SimTime, values: &[u64]) -> io::Result<()> {
        (**self).dump(time, values)
    }
    fn close(&mut self) -> io::Result<()> {
        (**self).close()
    }
}

impl<R: PcRecorder + ?Sized> PcRecorder for Box<R> {
    fn record(&mut self, pc: u32) -> io::Result<()> {
        (**self).record(pc)
    }
    fn close(&mut self) -> io::Result<()> {
        (**self).close()
    }
}
