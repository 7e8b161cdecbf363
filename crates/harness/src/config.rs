//! Configuration system for the harness.
//!
//! This module defines the launch configuration of a single run. It provides:
//! 1. **Defaults:** Clock half period, reset length, time scale and trace file names.
//! 2. **Structures:** `RunConfig`, an immutable snapshot handed to the driver.
//! 3. **Launch Parameters:** A typed parser for `+key=value` plusargs as passed to
//!    Verilator-style testbenches (`+vcd=1 +timeout=5 +vcd_start=2 +trace_pc=1`).
//!
//! Configuration layers apply in order: `RunConfig::default()`, an optional JSON file,
//! then plusargs and command-line flags. The result is validated once and never mutated
//! after the driver is constructed.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::common::error::HarnessError;
use crate::common::time::SimTime;

/// Default configuration constants for a run.
mod defaults {
    use std::path::PathBuf;

    use crate::common::constants;

    pub fn half_period() -> u64 {
        constants::DEFAULT_HALF_PERIOD
    }

    pub fn reset_threshold() -> u64 {
        constants::DEFAULT_RESET_THRESHOLD
    }

    pub fn time_scale() -> u64 {
        constants::NS_PER_SECOND
    }

    pub fn trace_path() -> PathBuf {
        PathBuf::from(constants::DEFAULT_TRACE_PATH)
    }

    pub fn trace_pc_path() -> PathBuf {
        PathBuf::from(constants::DEFAULT_TRACE_PC_PATH)
    }
}

/// Launch parameters of one simulation run.
///
/// All time values are in simulated nanoseconds. A zero `timeout` means no time budget.
///
/// # Example
///
/// ```
/// use fsoc_tb_core::config::RunConfig;
///
/// let json = r#"{ "trace": true, "vcd_start": 4000, "timeout": 1000000 }"#;
/// let config: RunConfig = serde_json::from_str(json).unwrap();
/// assert!(config.trace);
/// assert_eq!(config.vcd_start.val(), 4000);
/// assert_eq!(config.half_period, 500);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RunConfig {
    /// Record a waveform trace.
    #[serde(default)]
    pub trace: bool,

    /// Waveform output file.
    #[serde(default = "defaults::trace_path")]
    pub trace_path: PathBuf,

    /// No waveform samples are written at or before this time.
    #[serde(default)]
    pub vcd_start: SimTime,

    /// Open the binary PC trace stream.
    #[serde(default)]
    pub trace_pc: bool,

    /// PC trace output file.
    #[serde(default = "defaults::trace_pc_path")]
    pub trace_pc_path: PathBuf,

    /// Simulated-time budget; zero disables it.
    #[serde(default)]
    pub timeout: SimTime,

    /// Half period of the model clock. Must be even and nonzero.
    #[serde(default = "defaults::half_period")]
    pub half_period: u64,

    /// Reset is asserted while time is below this value.
    #[serde(default = "defaults::reset_threshold")]
    pub reset_threshold: u64,

    /// Time units per second for seconds-valued launch parameters.
    #[serde(default = "defaults::time_scale")]
    pub time_scale: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            trace: false,
            trace_path: defaults::trace_path(),
            vcd_start: SimTime::ZERO,
            trace_pc: false,
            trace_pc_path: defaults::trace_pc_path(),
            timeout: SimTime::ZERO,
            half_period: defaults::half_period(),
            reset_threshold: defaults::reset_threshold(),
            time_scale: defaults::time_scale(),
        }
    }
}

impl RunConfig {
    /// Loads a configuration from a JSON file. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigRead` if the file cannot be read and `ConfigParse` if it is not valid JSON
    /// for this structure.
    pub fn from_json_file(path: &Path) -> Result<Self, HarnessError> {
        let text = fs::read_to_string(path).map_err(|source| HarnessError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Applies Verilator-style launch parameters on top of this configuration.
    ///
    /// Recognized keys are `vcd`, `trace_pc` (presence enables; the value is ignored),
    /// `timeout` and `vcd_start` (whole seconds, scaled by `time_scale`). Unknown keys are left
    /// for the model, as a Verilator testbench would.
    ///
    /// The enable switches also accept the bare form: `+vcd` and `+trace_pc` without `=value`
    /// turn their feature on just like `+vcd=1`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPlusArg` if `timeout` or `vcd_start` is not a non-negative integer.
    pub fn apply_plusargs(&mut self, args: &PlusArgs) -> Result<(), HarnessError> {
        if args.contains("vcd") {
            self.trace = true;
        }
        if args.contains("trace_pc") {
            self.trace_pc = true;
        }
        if let Some(secs) = args.get_u64("timeout")? {
            self.timeout = SimTime::from_seconds(secs, self.time_scale);
        }
        if let Some(secs) = args.get_u64("vcd_start")? {
            self.vcd_start = SimTime::from_seconds(secs, self.time_scale);
        }
        Ok(())
    }

    /// Checks the timing parameters.
    ///
    /// The driver advances time by `half_period / 2` per iteration and toggles the clock when
    /// time is a multiple of `half_period`, so the half period must be even and nonzero for every
    /// clock edge to land on an iteration.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` describing the violated constraint.
    pub fn validate(&self) -> Result<(), HarnessError> {
        if self.half_period < 2 {
            return Err(HarnessError::InvalidConfig(format!(
                "half_period must be at least 2, got {}",
                self.half_period
            )));
        }
        if self.half_period % 2 != 0 {
            return Err(HarnessError::InvalidConfig(format!(
                "half_period must be even, got {}",
                self.half_period
            )));
        }
        if self.time_scale == 0 {
            return Err(HarnessError::InvalidConfig(
                "time_scale must be nonzero".to_string(),
            ));
        }
        Ok(())
    }

    /// Simulated time added per loop iteration.
    #[inline]
    pub const fn time_step(&self) -> u64 {
        self.half_period / 2
    }

    /// Returns the time budget if one is set.
    #[inline]
    pub const fn timeout(&self) -> Option<SimTime> {
        if self.timeout.val() == 0 {
            None
        } else {
            Some(self.timeout)
        }
    }
}

/// Parsed `+key[=value]` launch parameters.
///
/// Arguments that do not start with `+` are ignored. When a key is repeated, the last value wins.
///
/// ```
/// use fsoc_tb_core::config::PlusArgs;
///
/// let args = PlusArgs::parse(["+vcd=1", "+timeout=3", "--ignored", "+firmware=prog.hex"]);
/// assert!(args.contains("vcd"));
/// assert_eq!(args.get("firmware"), Some("prog.hex"));
/// assert_eq!(args.get_u64("timeout").unwrap(), Some(3));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlusArgs {
    entries: BTreeMap<String, String>,
}

impl PlusArgs {
    /// Collects plusargs from an argument list.
    pub fn parse<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut entries = BTreeMap::new();
        for arg in args {
            let Some(body) = arg.as_ref().strip_prefix('+') else {
                continue;
            };
            let (key, value) = body.split_once('=').unwrap_or((body, ""));
            if key.is_empty() {
                continue;
            }
            let _ = entries.insert(key.to_string(), value.to_string());
        }
        Self { entries }
    }

    /// Returns `true` if `+key` was given, with or without a value.
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Returns the raw value of `+key=value`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Returns the value of `+key=value` parsed as an unsigned integer.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPlusArg` if the key is present but its value is not a `u64`.
    pub fn get_u64(&self, key: &str) -> Result<Option<u64>, HarnessError> {
        self.get(key)
            .map(|value| {
                value
                    .trim()
                    .parse::<u64>()
                    .map_err(|_| HarnessError::InvalidPlusArg {
                        key: key.to_string(),
                        value: value.to_string(),
                    })
            })
            .transpose()
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no plusargs were given.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
