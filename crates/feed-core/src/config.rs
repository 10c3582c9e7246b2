//! Configuration loading for the feed simulation.
//!
//! All run parameters are loaded from a TOML configuration file. Every
//! section is optional and falls back to the calibrated defaults.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::systems::ranking::RankingPolicy;

/// Complete simulation configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SimConfig {
    /// Population, graph and run length
    #[serde(default)]
    pub simulation: SimulationConfig,
    /// Agent behavior constants
    #[serde(default)]
    pub agents: AgentConfig,
    /// Feed ranking settings
    #[serde(default)]
    pub feed: FeedConfig,
}

impl SimConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Parses configuration from a TOML string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Serializes the configuration back to TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Rejects values the simulation cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let sim = &self.simulation;
        if sim.population == 0 {
            return Err(ConfigError::invalid("simulation.population", "must be at least 1"));
        }
        if sim.window_size == 0 {
            return Err(ConfigError::invalid("simulation.window_size", "must be at least 1"));
        }
        if !(sim.avg_degree.is_finite() && sim.avg_degree >= 0.0) {
            return Err(ConfigError::invalid("simulation.avg_degree", "must be non-negative"));
        }
        if sim.snapshot_interval == 0 {
            return Err(ConfigError::invalid("simulation.snapshot_interval", "must be at least 1"));
        }

        let agents = &self.agents;
        if agents.remembered_times == 0 {
            return Err(ConfigError::invalid("agents.remembered_times", "must be at least 1"));
        }
        check_probability("agents.notification_check_prob", agents.notification_check_prob)?;
        check_probability("agents.spontaneous_online_prob", agents.spontaneous_online_prob)?;
        check_probability("agents.stay_online_floor", agents.stay_online_floor)?;
        check_probability("agents.initial_opinion_mean", agents.initial_opinion_mean)?;
        check_probability("agents.max_expected_engagement", agents.max_expected_engagement)?;
        check_deviation("agents.post_noise_sd", agents.post_noise_sd)?;
        check_deviation("agents.read_noise_sd", agents.read_noise_sd)?;
        check_deviation("agents.initial_opinion_sd", agents.initial_opinion_sd)?;

        if !(self.feed.tolerance.is_finite() && self.feed.tolerance > 0.0) {
            return Err(ConfigError::invalid("feed.tolerance", "must be positive"));
        }
        if self.feed.feed_capacity == 0 {
            return Err(ConfigError::invalid("feed.feed_capacity", "must be at least 1"));
        }
        Ok(())
    }
}

fn check_probability(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::invalid(field, "must lie in [0, 1]"))
    }
}

fn check_deviation(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::invalid(field, "must be a non-negative number"))
    }
}

/// Population, graph and run length.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Number of agents
    pub population: usize,
    /// Target mean degree of the random social graph
    pub avg_degree: f64,
    /// Ticks per trial
    pub ticks: u64,
    /// Seed for every random draw of the run
    pub seed: u64,
    /// Number of ticks the content store keeps (K)
    pub window_size: usize,
    /// Ticks between opinion snapshots
    pub snapshot_interval: u64,
    /// Repeated trials on the same population and graph
    pub trials: u32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            population: 10,
            avg_degree: 3.0,
            ticks: 100,
            seed: 42,
            window_size: 7,
            snapshot_interval: 10,
            trials: 1,
        }
    }
}

/// Agent behavior constants.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Ticks a read post keeps influencing belief
    pub remembered_times: u64,
    /// Chance an offline agent with notifications looks at them
    pub notification_check_prob: f64,
    /// Chance an offline agent comes back on its own
    pub spontaneous_online_prob: f64,
    /// Lower bound on the stay-online probability
    pub stay_online_floor: f64,
    /// Spread of a new post's leaning around its author's opinion
    pub post_noise_sd: f64,
    /// Spread of the per-tick read count around `consumption`
    pub read_noise_sd: f64,
    pub initial_opinion_mean: f64,
    pub initial_opinion_sd: f64,
    /// Consumption is drawn from [0, max_consumption)
    pub max_consumption: u32,
    /// Expected engagement is drawn from [0, max_expected_engagement)
    pub max_expected_engagement: f64,
    pub begin_online: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            remembered_times: 20,
            notification_check_prob: 0.10,
            spontaneous_online_prob: 0.05,
            stay_online_floor: 0.05,
            post_noise_sd: 0.05,
            read_noise_sd: 1.0,
            initial_opinion_mean: 0.5,
            initial_opinion_sd: 0.05,
            max_consumption: 5,
            max_expected_engagement: 0.5,
            begin_online: true,
        }
    }
}

/// Feed ranking settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub policy: RankingPolicy,
    /// Maximum distance between post leaning and opinion under `filter_bubble`
    pub tolerance: f64,
    /// Leave out posts already read during the current epoch
    pub skip_read: bool,
    /// Top-ranked posts kept in a feed after each refresh
    pub feed_capacity: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            policy: RankingPolicy::Engagement,
            tolerance: 0.3,
            skip_read: false,
            feed_capacity: 20,
        }
    }
}

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
    #[error("invalid value for {field}: {reason}")]
    Invalid {
        field: &'static str,
        reason: &'static str,
    },
}

impl ConfigError {
    fn invalid(field: &'static str, reason: &'static str) -> Self {
        ConfigError::Invalid { field, reason }
    }
}

/// Generates a default configuration file content.
pub fn default_config_toml() -> String {
    r#"# Feed Simulation Configuration

[simulation]
population = 10
avg_degree = 3.0
ticks = 100
seed = 42
# ticks of content the ranker can draw from
window_size = 7
snapshot_interval = 10
trials = 1

[agents]
remembered_times = 20
notification_check_prob = 0.10
spontaneous_online_prob = 0.05
stay_online_floor = 0.05
post_noise_sd = 0.05
read_noise_sd = 1.0
initial_opinion_mean = 0.5
initial_opinion_sd = 0.05
max_consumption = 5
max_expected_engagement = 0.5
begin_online = true

[feed]
# "engagement" or "filter_bubble"
policy = "engagement"
tolerance = 0.3
skip_read = false
# unread posts are replaced by the new ranking every tick
feed_capacity = 20
"#
    .to_string()
}
