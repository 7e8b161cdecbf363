//! Blinking-GPIO reference model.
//!
//! A behavioral stand-in for a small SoC running a blink loop. It performs:
//! 1. **Clocking:** Counts rising clock edges while reset is deasserted.
//! 2. **GPIO:** Toggles its `q` output every `toggle_cycles` cycles.
//! 3. **Retirement:** Retires one instruction per cycle with a PC advancing by 4.
//! 4. **Completion:** Optionally raises `got_finish` after a fixed number of toggles.
//!
//! Reset is synchronous to evaluation: while asserted, all state returns to its initial value.

use crate::model::traits::{Model, SignalDecl};

/// Reset vector of the reference model.
pub const RESET_PC: u32 = 0x0000_0000;

/// Behavioral model with a single GPIO output.
#[derive(Debug, Clone)]
pub struct BlinkyModel {
    clk: bool,
    prev_clk: bool,
    reset: bool,
    q: bool,
    cycle: u64,
    toggles: u64,
    pc: u32,
    retired: Option<u32>,
    toggle_cycles: u64,
    finish_after: Option<u64>,
    finished: bool,
}

impl BlinkyModel {
    /// Creates a model that toggles `q` every `toggle_cycles` rising edges (minimum 1).
    pub fn new(toggle_cycles: u64) -> Self {
        Self {
            clk: false,
            prev_clk: false,
            reset: true,
            q: false,
            cycle: 0,
            toggles: 0,
            pc: RESET_PC,
            retired: None,
            toggle_cycles: toggle_cycles.max(1),
            finish_after: None,
            finished: false,
        }
    }

    /// Signals completion after `toggles` GPIO toggles. Zero disables completion.
    #[must_use]
    pub const fn with_finish_after(mut self, toggles: u64) -> Self {
        self.finish_after = if toggles == 0 { None } else { Some(toggles) };
        self
    }

    /// Rising clock edges counted since reset was released.
    pub const fn cycle(&self) -> u64 {
        self.cycle
    }

    /// GPIO toggles since reset was released.
    pub const fn toggles(&self) -> u64 {
        self.toggles
    }

    fn clear(&mut self) {
        self.q = false;
        self.cycle = 0;
        self.toggles = 0;
        self.pc = RESET_PC;
        self.finished = false;
    }
}

impl Model for BlinkyModel {
    fn set_clock(&mut self, level: bool) {
        self.clk = level;
    }

    fn set_reset(&mut self, asserted: bool) {
        self.reset = asserted;
    }

    fn eval(&mut self) {
        let rising = self.clk && !self.prev_clk;
        self.prev_clk = self.clk;
        self.retired = None;

        if self.reset {
            self.clear();
            return;
        }
        if !rising || self.finished {
            return;
        }

        self.retired = Some(self.pc);
        self.pc = self.pc.wrapping_add(4);
        self.cycle += 1;
        if self.cycle % self.toggle_cycles == 0 {
            self.q = !self.q;
            self.toggles += 1;
            if self.finish_after.is_some_and(|n| self.toggles >= n) {
                self.finished = true;
            }
        }
    }

    fn gpio(&self) -> bool {
        self.q
    }

    fn got_finish(&self) -> bool {
        self.finished
    }

    fn retired_pc(&self) -> Option<u32> {
        self.retired
    }

    fn signals(&self) -> Vec<SignalDecl> {
        vec![
            SignalDecl::scalar("clk_i"),
            SignalDecl::scalar("rst_in"),
            SignalDecl::scalar("q"),
            SignalDecl::new("pc", 32),
        ]
    }

    fn sample(&self, values: &mut Vec<u64>) {
        values.extend([
            u64::from(self.clk),
            u64::from(!self.reset),
            u64::from(self.q),
            u64::from(self.pc),
        ]);
    }
}
