//! Hardware model components.
//!
//! The harness never looks inside a model; it talks to it through the [`Model`] capability
//! trait. This module also ships a small behavioral model so the driver can be exercised
//! end to end without an HDL backend.

/// Blinking-GPIO reference model.
pub mod blinky;

/// Model capability traits.
pub mod traits;

pub use blinky::BlinkyModel;
pub use traits::{Model, SignalDecl};
