//! Binary program-counter trace.
//!
//! Each retired PC is written as a 4-byte little-endian word with no header or framing, so
//! the file length is always a multiple of four and record `n` sits at byte offset `4 * n`.

use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::common::error::HarnessError;
use crate::trace::PcRecorder;

/// PC trace writer over any byte sink.
#[derive(Debug)]
pub struct PcTraceWriter<W: Write> {
    out: W,
    records: u64,
    closed: bool,
}

impl PcTraceWriter<BufWriter<File>> {
    /// Creates (or truncates) a PC trace file at `path`.
    ///
    /// # Errors
    ///
    /// Returns `TraceIo` if the file cannot be opened for writing.
    pub fn create(path: &Path) -> Result<Self, HarnessError> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .map_err(|source| HarnessError::TraceIo {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write> PcTraceWriter<W> {
    /// Wraps a writer.
    pub const fn new(out: W) -> Self {
        Self {
            out,
            records: 0,
            closed: false,
        }
    }

    /// Number of PCs written.
    pub const fn records(&self) -> u64 {
        self.records
    }

    /// Returns the underlying writer.
    pub const fn get_ref(&self) -> &W {
        &self.out
    }

    /// Returns `true` once `close` has run.
    pub const fn is_closed(&self) -> bool {
        self.closed
    }
}

impl<W: Write> PcRecorder for PcTraceWriter<W> {
    fn record(&mut self, pc: u32) -> io::Result<()> {
        if self.closed {
            return Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "pc trace already closed",
            ));
        }
        self.out.write_all(&pc.to_le_bytes())?;
        self.records += 1;
        Ok(())
    }

    fn close(&mut self) -> io::Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.out.flush()
    }
}
