//! Run statistics collection and reporting.
//!
//! This module tracks what a run did. It provides:
//! 1. **Loop counters:** Iterations and clock edges.
//! 2. **Output counters:** Waveform samples, GPIO transitions, and PC trace records.
//! 3. **Throughput:** Simulated time reached against host wall-clock time.

use std::io::{self, Write};
use std::time::{Duration, Instant};

use crate::common::time::SimTime;

/// Counters collected by the driver over one run.
#[derive(Clone, Debug)]
pub struct RunStats {
    start_time: Instant,
    elapsed: Option<Duration>,
    /// Loop iterations executed (one model evaluation each).
    pub iterations: u64,
    /// Clock toggles driven into the model.
    pub clock_edges: u64,
    /// Clock toggles that drove the clock high.
    pub rising_edges: u64,
    /// Iterations that appended a waveform sample.
    pub trace_samples: u64,
    /// GPIO level changes reported.
    pub gpio_transitions: u64,
    /// PCs appended to the PC trace.
    pub pc_records: u64,
    /// Simulated time when the loop exited.
    pub final_time: SimTime,
}

impl Default for RunStats {
    fn default() -> Self {
        Self {
            start_time: Instant::now(),
            elapsed: None,
            iterations: 0,
            clock_edges: 0,
            rising_edges: 0,
            trace_samples: 0,
            gpio_transitions: 0,
            pc_records: 0,
            final_time: SimTime::ZERO,
        }
    }
}

impl RunStats {
    /// Freezes the wall-clock duration. Later calls keep the first value.
    pub fn finish(&mut self, final_time: SimTime) {
        self.final_time = final_time;
        if self.elapsed.is_none() {
            self.elapsed = Some(self.start_time.elapsed());
        }
    }

    /// Host time spent in the run so far, or in total once finished.
    pub fn host_time(&self) -> Duration {
        self.elapsed.unwrap_or_else(|| self.start_time.elapsed())
    }

    /// Writes the statistics block to `out`.
    ///
    /// # Errors
    ///
    /// Propagates write errors from `out`.
    pub fn write_to(&self, out: &mut impl Write) -> io::Result<()> {
        let seconds = self.host_time().as_secs_f64();
        let khz = if seconds > 0.0 {
            (self.rising_edges as f64 / seconds) / 1000.0
        } else {
            0.0
        };
        writeln!(out, "\n==========================================================")?;
        writeln!(out, "SIMULATION RUN STATISTICS")?;
        writeln!(out, "==========================================================")?;
        writeln!(out, "host_seconds             {seconds:.4} s")?;
        writeln!(out, "sim_time                 {} ns", self.final_time)?;
        writeln!(out, "sim_iterations           {}", self.iterations)?;
        writeln!(out, "sim_clock_cycles         {}", self.rising_edges)?;
        writeln!(out, "sim_clock_edges          {}", self.clock_edges)?;
        writeln!(out, "sim_freq                 {khz:.2} kHz")?;
        writeln!(out, "----------------------------------------------------------")?;
        writeln!(out, "trace.samples            {}", self.trace_samples)?;
        writeln!(out, "trace.pc_records         {}", self.pc_records)?;
        writeln!(out, "gpio.transitions         {}", self.gpio_transitions)?;
        writeln!(out, "==========================================================")
    }

    /// Prints the statistics block to stdout.
    pub fn print(&self) {
        let _ = self.write_to(&mut io::stdout().lock());
    }
}
