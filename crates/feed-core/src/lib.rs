//! Feed Simulation Engine Library
//!
//! Opinion dynamics on a social network: people post, read what their
//! neighbors and a ranking algorithm put in front of them, and drift
//! toward what engaged them.

use bevy_ecs::prelude::*;
use rand::rngs::SmallRng;

pub mod components;
pub mod config;
pub mod output;
pub mod setup;
pub mod simulation;
pub mod systems;

pub use components::*;
pub use config::{
    default_config_toml, AgentConfig, ConfigError, FeedConfig, SimConfig, SimulationConfig,
};
pub use simulation::{Simulation, SimulationError};
pub use systems::{FeedRanker, RankingPolicy, TickStats};

/// Seeded random number generator resource
#[derive(Resource)]
pub struct SimRng(pub SmallRng);
