//! Operator interrupt handling.
//!
//! An interrupt only ever flips a shared flag from `false` to `true`. The handler does no
//! logging and touches no other state; the simulation loop polls the flag once per iteration
//! and does the reporting itself.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::common::error::HarnessError;

/// Write-once stop request shared between the interrupt handler and the driver.
#[derive(Clone, Debug, Default)]
pub struct StopFlag {
    requested: Arc<AtomicBool>,
}

impl StopFlag {
    /// Creates a flag in the not-requested state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests a stop. Idempotent; the flag is never cleared.
    #[inline]
    pub fn request(&self) {
        self.requested.store(true, Ordering::Release);
    }

    /// Returns `true` once a stop has been requested.
    #[inline]
    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::Acquire)
    }

    /// Routes Ctrl-C into this flag.
    ///
    /// Only one handler may be installed per process.
    ///
    /// # Errors
    ///
    /// Returns `InterruptHandler` if a handler is already installed or the platform refuses it.
    pub fn install_interrupt_handler(&self) -> Result<(), HarnessError> {
        let flag = self.clone();
        ctrlc::set_handler(move || flag.request())?;
        Ok(())
    }
}
