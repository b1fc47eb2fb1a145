//! Line-delimited JSON plumbing: a batched appender and whole-file readers.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;

use crate::schema::Event;
use crate::Result;

/// Append-oriented JSONL writer. Records buffer in memory and hit the file
/// every `flush_every` appends; `close` flushes the remainder.
pub struct JsonlWriter {
    path: PathBuf,
    flush_every: usize,
    buffer: Vec<String>,
}

impl JsonlWriter {
    pub fn new(path: &Path, flush_every: usize) -> Result<Self> {
        ensure_parent(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            flush_every: flush_every.max(1),
            buffer: Vec::new(),
        })
    }

    pub fn append<T: Serialize>(&mut self, record: &T) -> Result<()> {
        self.buffer.push(serde_json::to_string(record)?);
        if self.buffer.len() >= self.flush_every {
            self.flush()?;
        }
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        let mut payload = self.buffer.join("\n");
        payload.push('\n');
        file.write_all(payload.as_bytes())?;
        self.buffer.clear();
        Ok(())
    }

    /// Flush everything out; the file is complete once this returns.
    pub fn close(mut self) -> Result<()> {
        self.flush()
    }
}

/// Read typed events from a JSONL file. Blank lines are skipped; a
/// malformed event line is an error, events files are our own format.
pub fn read_events(path: &Path) -> Result<Vec<Event>> {
    let reader = BufReader::new(File::open(path)?);
    let mut events = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        events.push(serde_json::from_str(line)?);
    }
    Ok(events)
}

/// Read loose JSON rows from a JSONL file, skipping blank lines.
pub fn read_rows(path: &Path) -> Result<Vec<Value>> {
    let reader = BufReader::new(File::open(path)?);
    let mut rows = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        rows.push(serde_json::from_str(line)?);
    }
    Ok(rows)
}

/// Overwrite `path` with one serialized record per line.
pub fn write_rows<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    ensure_parent(path)?;
    let mut payload = String::new();
    for row in rows {
        payload.push_str(&serde_json::to_string(row)?);
        payload.push('\n');
    }
    fs::write(path, payload)?;
    Ok(())
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
