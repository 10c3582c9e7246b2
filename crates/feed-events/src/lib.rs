//! Shared content and output types for the feed simulation.
//!
//! This crate contains pure data structures with no simulation logic.
//! It is a dependency for the simulation crate and for anything that reads
//! its output files.

pub mod post;
pub mod snapshot;

// Re-export post types
pub use post::{Post, PostError, PostId, PostTuple, POST_TUPLE_ARITY};

// Re-export snapshot types
pub use snapshot::{
    generate_snapshot_id, AgentOpinion, OpinionHistogram, OpinionSnapshot, RunSummary,
    TrialSummary, HISTOGRAM_BINS,
};
