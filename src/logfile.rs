// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rack-modbus-logger project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Append-only record sink
//!
//! The log file is plain UTF-8 text, one comma-separated record per line,
//! no header. Each record is written with a single `write_all` so a line is
//! never interleaved or partially visible to readers relying on OS append
//! semantics.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Destination for serialized measurement records.
///
/// The scheduler only depends on this trait; tests collect lines in memory
/// instead of touching the filesystem.
pub trait RecordSink: Send {
    /// Append one complete line (newline included) to the sink.
    fn append(&mut self, line: &str) -> io::Result<()>;
}

impl<T: RecordSink + ?Sized> RecordSink for &mut T {
    fn append(&mut self, line: &str) -> io::Result<()> {
        (**self).append(line)
    }
}

/// [`RecordSink`] appending to a file on disk.
pub struct FileSink {
    path: PathBuf,
    file: File,
}

impl FileSink {
    /// Open (or create) the log file in append mode.
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self { path, file })
    }

    /// The path records are appended to.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RecordSink for FileSink {
    fn append(&mut self, line: &str) -> io::Result<()> {
        self.file.write_all(line.as_bytes())?;
        // Flush per record: already-logged lines must survive an external
        // interrupt mid-round.
        self.file.flush()
    }
}

/// In-memory [`RecordSink`] collecting lines for assertions.
#[derive(Debug, Default)]
pub struct MemorySink {
    lines: Vec<String>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }
}

impl RecordSink for MemorySink {
    fn append(&mut self, line: &str) -> io::Result<()> {
        self.lines.push(line.to_string());
        Ok(())
    }
}
