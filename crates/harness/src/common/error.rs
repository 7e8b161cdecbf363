//! Harness error definitions.
//!
//! Errors only arise during setup and in the standalone firmware tools. It provides:
//! 1. **Trace Errors:** Failure to create or write an optional trace output.
//! 2. **Launch Errors:** Malformed `+plusarg` launch parameters.
//! 3. **Config Errors:** Invalid timing parameters and malformed JSON configuration.
//! 4. **Image Errors:** Unreadable or unusable firmware images.
//!
//! Nothing in this module crosses the simulation loop boundary: a trace failure during a run
//! disables that trace instead of ending the run.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors produced by the harness outside of the simulation loop.
#[derive(Debug, Error)]
pub enum HarnessError {
    /// An optional trace output could not be opened or written.
    #[error("trace output {}: {source}", path.display())]
    TraceIo {
        /// Path of the trace file.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// A `+key=value` launch parameter had a value that is not a non-negative integer.
    #[error("invalid value `{value}` for launch parameter `+{key}`")]
    InvalidPlusArg {
        /// Parameter name without the leading `+`.
        key: String,
        /// The offending value text.
        value: String,
    },

    /// The run configuration violates a timing constraint.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A JSON configuration file could not be read.
    #[error("failed to read config {}: {source}", path.display())]
    ConfigRead {
        /// Path of the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// A JSON configuration could not be parsed.
    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] serde_json::Error),

    /// The interrupt handler could not be installed.
    #[error("failed to install interrupt handler: {0}")]
    InterruptHandler(#[from] ctrlc::Error),

    /// A firmware image could not be read or written.
    #[error("image {}: {source}", path.display())]
    ImageIo {
        /// Path of the image file.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// An ELF image could not be parsed.
    #[error("malformed ELF image: {0}")]
    Elf(#[from] object::Error),

    /// An ELF image had no loadable bytes.
    #[error("ELF image has no loadable segments")]
    EmptyImage,
}
