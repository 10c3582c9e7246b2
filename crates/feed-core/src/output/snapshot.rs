//! Snapshot Output
//!
//! Periodic opinion polls written to `<output>/snapshots/` and a single
//! run summary at the end.

use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use feed_events::{OpinionSnapshot, RunSummary};

/// File name of the run summary inside the output directory
pub const SUMMARY_FILE: &str = "summary.json";

/// Write any serializable value as pretty JSON, creating parent directories.
pub fn write_json<T: Serialize>(value: &T, path: impl AsRef<Path>) -> io::Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    fs::write(path, json)
}

/// Decides when to poll and where snapshots go
#[derive(Debug, Clone)]
pub struct SnapshotWriter {
    output_dir: PathBuf,
    snapshot_interval: u64,
    next_sequence: u64,
}

impl SnapshotWriter {
    pub fn new(output_dir: impl Into<PathBuf>, snapshot_interval: u64) -> Self {
        Self {
            output_dir: output_dir.into(),
            snapshot_interval: snapshot_interval.max(1),
            next_sequence: 1,
        }
    }

    pub fn should_snapshot(&self, tick: u64) -> bool {
        tick % self.snapshot_interval == 0
    }

    /// Sequence number for the next snapshot.
    pub fn next_sequence(&mut self) -> u64 {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        sequence
    }

    pub fn snapshot_count(&self) -> u64 {
        self.next_sequence - 1
    }

    pub fn snapshot_path(&self, trial: u32, tick: u64) -> PathBuf {
        self.output_dir
            .join("snapshots")
            .join(format!("trial_{:03}", trial))
            .join(format!("snap_{:06}.json", tick))
    }

    pub fn write_snapshot(&self, trial: u32, snapshot: &OpinionSnapshot) -> io::Result<PathBuf> {
        let path = self.snapshot_path(trial, snapshot.tick);
        write_json(snapshot, &path)?;
        Ok(path)
    }

    pub fn write_summary(&self, summary: &RunSummary) -> io::Result<PathBuf> {
        let path = self.output_dir.join(SUMMARY_FILE);
        write_json(summary, &path)?;
        Ok(path)
    }
}
