//! Snapshot Types
//!
//! Serialization structs for population opinion snapshots and run summaries.
//!
//! Snapshots capture the distribution of opinions at a point in time and are
//! meant for external analysis and plotting.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Number of equal-width histogram bins over [0, 1].
pub const HISTOGRAM_BINS: usize = 20;

/// Generates a snapshot ID with the given sequence number.
pub fn generate_snapshot_id(sequence: u64) -> String {
    format!("snap_{:06}", sequence)
}

/// One agent's state at snapshot time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentOpinion {
    pub node: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub opinion: f64,
    pub initial_opinion: f64,
    pub is_online: bool,
}

/// Equal-width histogram of opinions over [0, 1]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpinionHistogram {
    pub bin_width: f64,
    pub counts: Vec<u32>,
}

impl OpinionHistogram {
    pub fn from_values(values: impl IntoIterator<Item = f64>) -> Self {
        let mut counts = vec![0u32; HISTOGRAM_BINS];
        for value in values {
            // 1.0 belongs to the last bin
            let bin = ((value.clamp(0.0, 1.0) * HISTOGRAM_BINS as f64) as usize)
                .min(HISTOGRAM_BINS - 1);
            counts[bin] += 1;
        }
        Self {
            bin_width: 1.0 / HISTOGRAM_BINS as f64,
            counts,
        }
    }

    pub fn total(&self) -> u32 {
        self.counts.iter().sum()
    }
}

/// Population opinion poll at one tick
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpinionSnapshot {
    pub snapshot_id: String,
    pub tick: u64,
    pub mean_opinion: f64,
    /// Population standard deviation of opinion
    pub polarization: f64,
    pub online_count: usize,
    pub histogram: OpinionHistogram,
    #[serde(default)]
    pub agents: Vec<AgentOpinion>,
}

impl OpinionSnapshot {
    pub fn new(snapshot_id: impl Into<String>, tick: u64, agents: Vec<AgentOpinion>) -> Self {
        let n = agents.len();
        let (mean_opinion, polarization) = if n == 0 {
            (0.0, 0.0)
        } else {
            let mean = agents.iter().map(|a| a.opinion).sum::<f64>() / n as f64;
            let variance = agents
                .iter()
                .map(|a| (a.opinion - mean).powi(2))
                .sum::<f64>()
                / n as f64;
            (mean, variance.sqrt())
        };

        Self {
            snapshot_id: snapshot_id.into(),
            tick,
            mean_opinion,
            polarization,
            online_count: agents.iter().filter(|a| a.is_online).count(),
            histogram: OpinionHistogram::from_values(agents.iter().map(|a| a.opinion)),
            agents,
        }
    }
}

/// Final state of one trial
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrialSummary {
    pub trial: u32,
    pub ticks: u64,
    pub mean_opinion: f64,
    pub polarization: f64,
    pub online_count: usize,
}

/// Summary written once at the end of a run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub seed: u64,
    pub population: usize,
    pub ticks_per_trial: u64,
    pub policy: String,
    #[serde(default)]
    pub trials: Vec<TrialSummary>,
}

impl RunSummary {
    pub fn new(
        seed: u64,
        population: usize,
        ticks_per_trial: u64,
        policy: impl Into<String>,
    ) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            seed,
            population,
            ticks_per_trial,
            policy: policy.into(),
            trials: Vec::new(),
        }
    }

    pub fn record_trial(&mut self, trial: u32, snapshot: &OpinionSnapshot) {
        self.trials.push(TrialSummary {
            trial,
            ticks: snapshot.tick,
            mean_opinion: snapshot.mean_opinion,
            polarization: snapshot.polarization,
            online_count: snapshot.online_count,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agent(node: u32, opinion: f64, is_online: bool) -> AgentOpinion {
        AgentOpinion {
            node,
            name: None,
            opinion,
            initial_opinion: 0.5,
            is_online,
        }
    }

    #[test]
    fn test_snapshot_id_format() {
        assert_eq!(generate_snapshot_id(1), "snap_000001");
        assert_eq!(generate_snapshot_id(123456), "snap_123456");
    }

    #[test]
    fn test_histogram_edges() {
        let hist = OpinionHistogram::from_values([0.0, 0.04, 0.05, 0.5, 1.0]);

        assert_eq!(hist.counts.len(), HISTOGRAM_BINS);
        assert_eq!(hist.counts[0], 2);
        assert_eq!(hist.counts[1], 1);
        assert_eq!(hist.counts[10], 1);
        assert_eq!(hist.counts[HISTOGRAM_BINS - 1], 1);
        assert_eq!(hist.total(), 5);
    }

    #[test]
    fn test_snapshot_statistics() {
        let snapshot = OpinionSnapshot::new(
            "snap_000001",
            10,
            vec![agent(0, 0.25, true), agent(1, 0.75, false)],
        );

        assert!((snapshot.mean_opinion - 0.5).abs() < 1e-12);
        assert!((snapshot.polarization - 0.25).abs() < 1e-12);
        assert_eq!(snapshot.online_count, 1);
        assert_eq!(snapshot.histogram.total(), 2);
    }

    #[test]
    fn test_empty_snapshot() {
        let snapshot = OpinionSnapshot::new("snap_000001", 0, Vec::new());
        assert_eq!(snapshot.mean_opinion, 0.0);
        assert_eq!(snapshot.polarization, 0.0);
    }

    #[test]
    fn test_summary_serialization() {
        let mut summary = RunSummary::new(42, 2, 10, "engagement");
        let snapshot = OpinionSnapshot::new("snap_000001", 10, vec![agent(0, 0.4, true)]);
        summary.record_trial(0, &snapshot);

        let json = serde_json::to_string_pretty(&summary).unwrap();
        let parsed: RunSummary = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.run_id, summary.run_id);
        assert_eq!(parsed.trials.len(), 1);
        assert_eq!(parsed.trials[0].ticks, 10);
    }
}
