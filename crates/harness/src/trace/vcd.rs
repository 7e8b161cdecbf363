//! Value Change Dump (IEEE 1364) waveform writer.
//!
//! The header declares every model signal under a single `top` scope with a 1 ns timescale.
//! The first dump writes all values; later dumps write only the signals that changed, and
//! skip the timestamp entirely when nothing changed.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use vcd_ng::{IdCode, TimescaleUnit, Value, VecValue, Writer};

use crate::common::error::HarnessError;
use crate::common::time::SimTime;
use crate::model::SignalDecl;
use crate::trace::WaveformRecorder;

/// A declared wire and the last value written for it.
#[derive(Debug)]
struct Wire {
    id: IdCode,
    width: u32,
    last: Option<u64>,
}

/// VCD writer over any byte sink.
pub struct VcdRecorder<W: Write> {
    writer: Option<Writer<W>>,
    wires: Vec<Wire>,
    bits: Vec<Value>,
    samples: u64,
}

impl<W: Write> std::fmt::Debug for VcdRecorder<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VcdRecorder")
            .field("wires", &self.wires.len())
            .field("samples", &self.samples)
            .field("closed", &self.writer.is_none())
            .finish()
    }
}

impl VcdRecorder<BufWriter<File>> {
    /// Creates (or truncates) a VCD file at `path`.
    ///
    /// # Errors
    ///
    /// Returns `TraceIo` if the file cannot be created.
    pub fn create(path: &Path) -> Result<Self, HarnessError> {
        let file = File::create(path).map_err(|source| HarnessError::TraceIo {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write> VcdRecorder<W> {
    /// Wraps a writer. Nothing is written until `declare`.
    pub fn new(out: W) -> Self {
        Self {
            writer: Some(Writer::new(out)),
            wires: Vec::new(),
            bits: Vec::new(),
            samples: 0,
        }
    }

    /// Number of timestamps written so far.
    pub const fn samples(&self) -> u64 {
        self.samples
    }

    fn writer(&mut self) -> io::Result<&mut Writer<W>> {
        self.writer
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::BrokenPipe, "waveform already closed"))
    }
}

fn bit(value: u64) -> Value {
    if value & 1 == 1 { Value::V1 } else { Value::V0 }
}

impl<W: Write> WaveformRecorder for VcdRecorder<W> {
    fn declare(&mut self, signals: &[SignalDecl]) -> io::Result<()> {
        let writer = self.writer()?;
        writer.timescale(1, TimescaleUnit::NS)?;
        writer.add_module("top")?;
        let mut wires = Vec::with_capacity(signals.len());
        for signal in signals {
            let width = signal.width.clamp(1, 64);
            let id = writer.add_wire(width, &signal.name)?;
            wires.push(Wire {
                id,
                width,
                last: None,
            });
        }
        writer.upscope()?;
        writer.enddefinitions()?;
        self.wires = wires;
        Ok(())
    }

    fn dump(&mut self, time: SimTime, values: &[u64]) -> io::Result<()> {
        let changed = self
            .wires
            .iter()
            .zip(values)
            .any(|(wire, &value)| wire.last != Some(value));
        if !changed {
            return Ok(());
        }

        let Some(writer) = self.writer.as_mut() else {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "waveform already closed"));
        };
        writer.timestamp(time.val())?;
        for (wire, &value) in self.wires.iter_mut().zip(values) {
            if wire.last == Some(value) {
                continue;
            }
            if wire.width == 1 {
                writer.change_scalar(wire.id, bit(value))?;
            } else {
                self.bits.clear();
                self.bits
                    .extend((0..wire.width).rev().map(|i| bit(value >> i)));
                writer.change_vector(wire.id, &VecValue::from(self.bits.clone()))?;
            }
            wire.last = Some(value);
        }
        self.samples += 1;
        Ok(())
    }

    fn close(&mut self) -> io::Result<()> {
        // Dropping the writer flushes the buffered sink.
        drop(self.writer.take());
        Ok(())
    }
}
