//! Model trait for steppable hardware simulations.
//!
//! This module defines the `Model` trait implemented by every simulation backend the driver
//! can run. It provides:
//! 1. **Stimulus:** Clock and reset input setters.
//! 2. **Evaluation:** A single atomic `eval` that settles all signals for the current inputs.
//! 3. **Observation:** The monitored GPIO output, the completion flag, and an optional retired PC.
//! 4. **Tracing:** Signal declarations and value sampling for waveform recorders.
//!
//! Evaluation cannot fail: a model always produces a result for a given input state.

/// A signal exposed to waveform recorders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalDecl {
    /// Signal name as it appears in the waveform.
    pub name: String,
    /// Width in bits (1 for scalar signals, at most 64).
    pub width: u32,
}

impl SignalDecl {
    /// Creates a signal declaration.
    pub fn new(name: impl Into<String>, width: u32) -> Self {
        Self {
            name: name.into(),
            width,
        }
    }

    /// Creates a one-bit signal declaration.
    pub fn scalar(name: impl Into<String>) -> Self {
        Self::new(name, 1)
    }
}

/// Trait for clocked hardware models driven by the harness.
///
/// The driver owns the model for the duration of a run and calls, per iteration:
/// `set_reset`, `eval`, optional sampling and `retired_pc`, `gpio`, and on clock
/// boundaries `set_clock`. `got_finish` is polled once at the top of each iteration.
pub trait Model {
    /// Drives the clock input.
    fn set_clock(&mut self, level: bool);
    /// Drives the reset input; `true` means reset is asserted.
    fn set_reset(&mut self, asserted: bool);
    /// Settles all signal propagation for the current inputs.
    fn eval(&mut self);
    /// Reads the monitored GPIO output.
    fn gpio(&self) -> bool;
    /// Returns `true` once the model has signalled internal completion.
    fn got_finish(&self) -> bool;

    /// Returns the PC retired by the most recent `eval`, if the model reports one.
    fn retired_pc(&self) -> Option<u32> {
        None
    }

    /// Returns the signals this model exposes for waveform tracing.
    fn signals(&self) -> Vec<SignalDecl> {
        Vec::new()
    }

    /// Appends current signal values to `values`, one per entry of `signals()`, in order.
    fn sample(&self, values: &mut Vec<u64>) {
        let _ = values;
    }
}

impl<M: Model + ?Sized> Model for Box<M> {
    fn set_clock(&mut self, level: bool) {
        (**self).set_clock(level);
    }
    fn set_reset(&mut self, asserted: bool) {
        (**self).set_reset(asserted);
    }
    fn eval(&mut self) {
        (**self).eval();
    }
    fn gpio(&self) -> bool {
        (**self).gpio()
    }
    fn got_finish(&self) -> bool {
        (**self).got_finish()
    }
    fn retired_pc(&self) -> Option<u32> {
        (**self).retired_pc()
    }
    fn signals(&self) -> Vec<SignalDecl> {
        (**self).signals()
    }
    fn sample(&self, values: &mut Vec<u64>) {
        (**self).sample(values);
    }
}
