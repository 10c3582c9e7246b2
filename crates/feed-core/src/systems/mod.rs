//! ECS Systems
//!
//! Engagement scoring, belief update, agent behavior, feed ranking and the
//! two per-tick passes.

pub mod behavior;
pub mod belief;
pub mod engagement;
pub mod ranking;
pub mod tick;

// Re-export commonly used items
pub use behavior::{gaussian, CycleReport, FeedRead};
pub use belief::{weighted_mean, BeliefRule, Impression, MemoryWindow, SEED_IMPRESSIONS};
pub use engagement::{bias_density, bias_factor, how_engaging, predict_engagement, skew_mean};
pub use ranking::{FeedRanker, RankingPolicy};
pub use tick::{
    consumption_pass, posting_pass, SimulationFault, SimulationState, TickFault, TickStats,
};
