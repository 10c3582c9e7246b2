//! Output Module
//!
//! Writes opinion snapshots and the run summary as JSON.

pub mod snapshot;

pub use snapshot::{write_json, SnapshotWriter, SUMMARY_FILE};
