//! Simulation driver: owns the time base, the model, and the optional trace outputs.
//!
//! One loop iteration performs, in order:
//! 1. **Termination check:** recorded timeout, operator interrupt, or model completion.
//! 2. **Trace latch:** waveform capture turns on for good once time passes `vcd_start`.
//! 3. **Reset:** driven as a pure function of time (`time < reset_threshold`).
//! 4. **Evaluate:** exactly one `Model::eval`.
//! 5. **Sample:** waveform sample and retired PC, when enabled.
//! 6. **Observe:** GPIO level-change detection.
//! 7. **Budget:** a reached timeout is recorded; the loop exits at the next check.
//! 8. **Clock:** toggled when time is a multiple of the half period.
//! 9. **Advance:** time moves forward by half of the half period.
//!
//! Shutdown closes the PC trace, then the waveform, exactly once on every exit path.

use std::fmt;
use std::io::{self, Write};

use crate::common::error::HarnessError;
use crate::common::time::SimTime;
use crate::config::RunConfig;
use crate::model::Model;
use crate::sim::gpio::GpioEdgeContext;
use crate::sim::interrupt::StopFlag;
use crate::stats::RunStats;
use crate::trace::{PcRecorder, PcTraceWriter, VcdRecorder, WaveformRecorder};

/// Why a run ended. Produced exactly once, when the loop exits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RunOutcome {
    /// The model raised its completion signal.
    ModelSignaledCompletion,
    /// Simulated time reached the configured budget.
    TimeoutExpired,
    /// An operator interrupt was observed.
    InterruptRequested,
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::ModelSignaledCompletion => "model signalled completion",
            Self::TimeoutExpired => "timeout expired",
            Self::InterruptRequested => "interrupt requested",
        };
        f.write_str(text)
    }
}

/// Summary of a finished run.
#[derive(Clone, Debug)]
pub struct RunReport {
    /// Termination reason.
    pub outcome: RunOutcome,
    /// Simulated time when the loop exited.
    pub final_time: SimTime,
    /// Counters collected during the run.
    pub stats: RunStats,
}

impl RunReport {
    /// Process exit status for this run.
    ///
    /// Always zero: the termination reason is reported on the console only.
    pub const fn exit_code(&self) -> i32 {
        0
    }
}

/// A finished run together with the resources handed back by the driver.
#[derive(Debug)]
pub struct FinishedRun<M, W> {
    /// Outcome and statistics.
    pub report: RunReport,
    /// The model, in its final state.
    pub model: M,
    /// The console writer.
    pub console: W,
}

/// Returns `true` if reset is asserted at `time`.
#[inline]
pub const fn reset_asserted(time: SimTime, threshold: u64) -> bool {
    time.val() < threshold
}

/// Per-run mutable state. Nothing here outlives the driver.
#[derive(Debug)]
struct RunState {
    time: SimTime,
    clock: bool,
    reset: bool,
    gpio: GpioEdgeContext,
    tracing_active: bool,
    pending: Option<RunOutcome>,
}

/// Fixed-timestep co-simulation driver.
pub struct Driver<M: Model, W: Write = io::Stdout> {
    model: M,
    config: RunConfig,
    console: W,
    stop: StopFlag,
    waveform: Option<Box<dyn WaveformRecorder>>,
    pc_trace: Option<Box<dyn PcRecorder>>,
    state: RunState,
    stats: RunStats,
    samples: Vec<u64>,
}

impl<M: Model + fmt::Debug, W: Write> fmt::Debug for Driver<M, W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Driver")
            .field("model", &self.model)
            .field("config", &self.config)
            .field("state", &self.state)
            .field("waveform", &self.waveform.is_some())
            .field("pc_trace", &self.pc_trace.is_some())
            .finish_non_exhaustive()
    }
}

impl<M: Model> Driver<M, io::Stdout> {
    /// Creates a driver that writes console records to stdout.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the timing parameters fail validation.
    pub fn with_stdout(model: M, config: RunConfig) -> Result<Self, HarnessError> {
        Self::new(model, config, io::stdout())
    }
}

impl<M: Model, W: Write> Driver<M, W> {
    /// Creates a driver for `model` and drives the clock high.
    ///
    /// No trace outputs are attached; use [`Driver::open_trace_outputs`] or the `attach_*`
    /// methods.
    ///
    /// # Arguments
    ///
    /// * `model` - The model to simulate. Owned by the driver until the run finishes.
    /// * `config` - Launch parameters; read-only from here on.
    /// * `console` - Destination for GPIO records and termination messages.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the timing parameters fail validation.
    pub fn new(mut model: M, config: RunConfig, console: W) -> Result<Self, HarnessError> {
        config.validate()?;
        model.set_clock(true);
        Ok(Self {
            model,
            config,
            console,
            stop: StopFlag::new(),
            waveform: None,
            pc_trace: None,
            state: RunState {
                time: SimTime::ZERO,
                clock: true,
                reset: true,
                gpio: GpioEdgeContext::default(),
                tracing_active: false,
                pending: None,
            },
            stats: RunStats::default(),
            samples: Vec::new(),
        })
    }

    /// Replaces the stop flag, typically with one wired to an interrupt handler.
    #[must_use]
    pub fn with_stop_flag(mut self, stop: StopFlag) -> Self {
        self.stop = stop;
        self
    }

    /// The flag that, once set, ends the run at the next iteration.
    pub const fn stop_flag(&self) -> &StopFlag {
        &self.stop
    }

    /// Opens the trace files named in the configuration.
    ///
    /// A file that cannot be opened disables its feature for this run; the run itself proceeds.
    pub fn open_trace_outputs(&mut self) {
        if self.config.trace {
            match VcdRecorder::create(&self.config.trace_path) {
                Ok(recorder) => self.attach_waveform(Box::new(recorder)),
                Err(e) => tracing::warn!("waveform tracing disabled: {e}"),
            }
        }
        if self.config.trace_pc {
            match PcTraceWriter::create(&self.config.trace_pc_path) {
                Ok(writer) => self.attach_pc_trace(Box::new(writer)),
                Err(e) => tracing::warn!("pc tracing disabled: {e}"),
            }
        }
    }

    /// Attaches a waveform recorder and declares the model's signals to it.
    ///
    /// Samples are written only once time has passed `vcd_start`.
    pub fn attach_waveform(&mut self, mut recorder: Box<dyn WaveformRecorder>) {
        let signals = self.model.signals();
        if let Err(e) = recorder.declare(&signals) {
            tracing::warn!("waveform tracing disabled: {e}");
            if let Err(e) = recorder.close() {
                tracing::warn!("failed to close waveform trace: {e}");
            }
            return;
        }
        tracing::debug!(signals = signals.len(), vcd_start = %self.config.vcd_start, "waveform attached");
        self.waveform = Some(recorder);
    }

    /// Attaches a PC trace sink.
    pub fn attach_pc_trace(&mut self, recorder: Box<dyn PcRecorder>) {
        tracing::debug!("pc trace attached");
        self.pc_trace = Some(recorder);
    }

    /// Current simulated time.
    pub const fn time(&self) -> SimTime {
        self.state.time
    }

    /// Level currently driven on the model clock.
    pub const fn clock(&self) -> bool {
        self.state.clock
    }

    /// Reset level driven on the most recent iteration.
    pub const fn reset(&self) -> bool {
        self.state.reset
    }

    /// Returns `true` once waveform capture has been latched on.
    pub const fn tracing_active(&self) -> bool {
        self.state.tracing_active
    }

    /// Returns `true` if a waveform recorder is attached.
    pub const fn tracing_enabled(&self) -> bool {
        self.waveform.is_some()
    }

    /// Returns `true` if a PC trace sink is attached.
    pub const fn pc_tracing_enabled(&self) -> bool {
        self.pc_trace.is_some()
    }

    /// The run configuration.
    pub const fn config(&self) -> &RunConfig {
        &self.config
    }

    /// The model under simulation.
    pub const fn model(&self) -> &M {
        &self.model
    }

    /// The console writer.
    pub const fn console(&self) -> &W {
        &self.console
    }

    /// Counters collected so far.
    pub const fn stats(&self) -> &RunStats {
        &self.stats
    }

    /// Runs one iteration unless a termination condition holds.
    ///
    /// Returns the outcome, without iterating, if the run should stop. Calling `step` after
    /// that keeps returning the same outcome.
    pub fn step(&mut self) -> Option<RunOutcome> {
        if let Some(outcome) = self.termination() {
            return Some(outcome);
        }
        self.iterate();
        None
    }

    /// Runs until a termination condition holds, then shuts down.
    ///
    /// The PC trace is closed first and the waveform second, once each, whatever the outcome.
    pub fn run(mut self) -> FinishedRun<M, W> {
        tracing::info!(
            half_period = self.config.half_period,
            reset_threshold = self.config.reset_threshold,
            timeout = %self.config.timeout,
            "simulation started"
        );
        if let Some(budget) = self.config.timeout() {
            let _ = writeln!(self.console, "Timeout set: {budget} ns");
        }

        let outcome = loop {
            if let Some(outcome) = self.step() {
                break outcome;
            }
        };
        if outcome == RunOutcome::InterruptRequested {
            let _ = writeln!(self.console, "\nCaught ctrl-c");
        }

        self.shutdown();
        self.stats.finish(self.state.time);
        let _ = self.console.flush();
        tracing::info!(%outcome, time = %self.state.time, iterations = self.stats.iterations, "simulation finished");

        FinishedRun {
            report: RunReport {
                outcome,
                final_time: self.state.time,
                stats: self.stats,
            },
            model: self.model,
            console: self.console,
        }
    }

    fn termination(&self) -> Option<RunOutcome> {
        if let Some(outcome) = self.state.pending {
            return Some(outcome);
        }
        if self.stop.is_requested() {
            return Some(RunOutcome::InterruptRequested);
        }
        if self.model.got_finish() {
            return Some(RunOutcome::ModelSignaledCompletion);
        }
        None
    }

    fn iterate(&mut self) {
        let now = self.state.time;

        if !self.state.tracing_active && self.waveform.is_some() && now > self.config.vcd_start {
            self.state.tracing_active = true;
            tracing::debug!(time = %now, "waveform capture started");
        }

        let reset = reset_asserted(now, self.config.reset_threshold);
        if reset != self.state.reset {
            tracing::debug!(time = %now, reset, "reset changed");
        }
        self.state.reset = reset;
        self.model.set_reset(reset);

        self.model.eval();
        self.stats.iterations += 1;

        if self.state.tracing_active {
            self.dump_sample(now);
        }
        if self.pc_trace.is_some() {
            if let Some(pc) = self.model.retired_pc() {
                self.record_pc(pc);
            }
        }

        if let Some(transition) = self.state.gpio.observe(now, self.model.gpio()) {
            self.stats.gpio_transitions += 1;
            let _ = writeln!(self.console, "{transition}");
        }

        if let Some(budget) = self.config.timeout() {
            if now >= budget && self.state.pending.is_none() {
                self.state.pending = Some(RunOutcome::TimeoutExpired);
                let _ = writeln!(self.console, "Timeout: Exiting at time {now}");
                let _ = writeln!(self.console, "Timeout: {budget} \t MainTime: {now}");
            }
        }

        if now.is_aligned_to(self.config.half_period) {
            self.state.clock = !self.state.clock;
            self.model.set_clock(self.state.clock);
            self.stats.clock_edges += 1;
            if self.state.clock {
                self.stats.rising_edges += 1;
            }
        }

        #[cfg(feature = "always-trace")]
        tracing::trace!(time = %now, clock = self.state.clock, reset, "iteration");

        self.state.time.advance(self.config.time_step());
    }

    fn dump_sample(&mut self, now: SimTime) {
        let Some(recorder) = self.waveform.as_mut() else {
            return;
        };
        self.samples.clear();
        self.model.sample(&mut self.samples);
        match recorder.dump(now, &self.samples) {
            Ok(()) => self.stats.trace_samples += 1,
            Err(e) => {
                tracing::warn!(time = %now, "waveform write failed, tracing disabled: {e}");
                if let Some(mut recorder) = self.waveform.take() {
                    if let Err(e) = recorder.close() {
                        tracing::warn!("failed to close waveform trace: {e}");
                    }
                }
            }
        }
    }

    fn record_pc(&mut self, pc: u32) {
        let Some(recorder) = self.pc_trace.as_mut() else {
            return;
        };
        match recorder.record(pc) {
            Ok(()) => self.stats.pc_records += 1,
            Err(e) => {
                tracing::warn!("pc trace write failed, pc tracing disabled: {e}");
                if let Some(mut recorder) = self.pc_trace.take() {
                    if let Err(e) = recorder.close() {
                        tracing::warn!("failed to close pc trace: {e}");
                    }
                }
            }
        }
    }

    fn shutdown(&mut self) {
        if let Some(mut recorder) = self.pc_trace.take() {
            if let Err(e) = recorder.close() {
                tracing::warn!("failed to close pc trace: {e}");
            }
        }
        if let Some(mut recorder) = self.waveform.take() {
            if let Err(e) = recorder.close() {
                tracing::warn!("failed to close waveform trace: {e}");
            }
        }
    }
}
