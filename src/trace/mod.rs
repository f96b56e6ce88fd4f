//! # Frame Trace Module
//!
//! Records every frame written to the module as JSON Lines, for offline
//! inspection of what the module was told.
//!
//! This module handles:
//! - Formatting frames as JSONL records (timestamp, kind, raw bytes, decoded channels)
//! - Rotating to a new file after N records
//! - Retaining only the last M files
//!
//! ## Record Format
//!
//! ```text
//! {"timestamp":"2024-05-01T12:00:00.000+00:00","module":"external","kind":"normal","bytes":"55 0F 02 00 ...","channels":[1024,...]}
//! ```

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{Local, SecondsFormat, Utc};
use serde::Serialize;
use tracing::{debug, info};

use crate::error::Result;
use crate::multi::frame::{FrameKind, WireFrame};
use crate::multi::protocol::{ModuleIndex, MULTI_CHANS};

/// Trace file name prefix
const TRACE_FILE_PREFIX: &str = "frames_";

/// Trace file extension
const TRACE_FILE_SUFFIX: &str = ".jsonl";

/// One JSONL record
#[derive(Debug, Serialize)]
pub struct TraceRecord {
    pub timestamp: String,
    pub module: ModuleIndex,
    pub kind: FrameKind,
    pub bytes: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channels: Option<[u16; MULTI_CHANS]>,
}

impl TraceRecord {
    pub fn from_frame(module: ModuleIndex, frame: &WireFrame) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, false),
            module,
            kind: frame.kind(),
            bytes: hex_bytes(frame.as_bytes()),
            channels: frame.channels(),
        }
    }
}

/// Space-separated uppercase hex
fn hex_bytes(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Rotating JSONL frame logger
#[derive(Debug)]
pub struct FrameTrace {
    log_dir: PathBuf,
    max_records_per_file: usize,
    max_files_to_keep: usize,
    writer: Option<BufWriter<File>>,
    records_in_file: usize,
    file_sequence: u64,
}

impl FrameTrace {
    /// Create a trace writing into `log_dir`
    ///
    /// The directory is created if missing. No file is opened until the first
    /// record.
    pub fn new<P: AsRef<Path>>(log_dir: P, max_records_per_file: usize, max_files_to_keep: usize) -> Result<Self> {
        let log_dir = log_dir.as_ref().to_path_buf();
        fs::create_dir_all(&log_dir)?;
        info!("Frame trace enabled in {}", log_dir.display());

        Ok(Self {
            log_dir,
            max_records_per_file: max_records_per_file.max(1),
            max_files_to_keep: max_files_to_keep.max(1),
            writer: None,
            records_in_file: 0,
            file_sequence: 0,
        })
    }

    /// Append a frame to the trace
    ///
    /// Records are buffered; call [`FrameTrace::flush`] once per batch.
    pub fn record(&mut self, module: ModuleIndex, frame: &WireFrame) -> Result<()> {
        if self.writer.is_none() || self.records_in_file >= self.max_records_per_file {
            self.rotate()?;
        }

        let record = TraceRecord::from_frame(module, frame);
        let line = serde_json::to_string(&record)?;

        if let Some(writer) = self.writer.as_mut() {
            writeln!(writer, "{}", line)?;
        }
        self.records_in_file += 1;
        Ok(())
    }

    /// Push buffered records to the current file
    pub fn flush(&mut self) -> Result<()> {
        if let Some(writer) = self.writer.as_mut() {
            writer.flush()?;
        }
        Ok(())
    }

    fn rotate(&mut self) -> Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
        }

        self.file_sequence += 1;
        let name = format!(
            "{}{}_{:04}{}",
            TRACE_FILE_PREFIX,
            Local::now().format("%Y%m%d_%H%M%S"),
            self.file_sequence,
            TRACE_FILE_SUFFIX
        );
        let path = self.log_dir.join(name);
        debug!("Opening trace file {}", path.display());

        self.writer = Some(BufWriter::new(File::create(&path)?));
        self.records_in_file = 0;
        self.prune()
    }

    /// Delete the oldest trace files beyond the retention limit
    fn prune(&self) -> Result<()> {
        let mut files = trace_files(&self.log_dir)?;
        if files.len() <= self.max_files_to_keep {
            return Ok(());
        }

        // Names carry a timestamp and sequence number, so name order is age order
        files.sort();
        let excess = files.len() - self.max_files_to_keep;
        for path in files.into_iter().take(excess) {
            debug!("Removing old trace file {}", path.display());
            fs::remove_file(path)?;
        }
        Ok(())
    }
}

/// Trace files in a directory, in no particular order
pub fn trace_files(log_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(log_dir)? {
        let path = entry?.path();
        let is_trace = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.starts_with(TRACE_FILE_PREFIX) && n.ends_with(TRACE_FILE_SUFFIX))
            .unwrap_or(false);
        if is_trace {
            files.push(path);
        }
    }
    Ok(files)
}
