//! Belief Update
//!
//! Agents remember a short window of `(time_step, weight, leaning)`
//! impressions and derive their opinion from it. The rule that turns the
//! window into an opinion is a plain function pointer held per agent, so
//! individual agents can be given a different rule.

use std::collections::VecDeque;

/// Number of neutral entries a fresh window starts with
pub const SEED_IMPRESSIONS: usize = 5;

/// Turns a memory window into an opinion. `None` leaves the opinion as is.
pub type BeliefRule = fn(&MemoryWindow) -> Option<f64>;

/// One remembered read
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Impression {
    pub time_step: u64,
    /// Engagement the post produced when it was read
    pub weight: f64,
    pub leaning: f64,
}

/// Bounded, time-ordered memory of recent reads
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryWindow {
    entries: VecDeque<Impression>,
}

impl MemoryWindow {
    /// A window holding only the neutral seed entries at `opinion`.
    pub fn seeded(opinion: f64, time_step: u64) -> Self {
        let mut window = Self {
            entries: VecDeque::with_capacity(SEED_IMPRESSIONS * 4),
        };
        window.reseed(opinion, time_step);
        window
    }

    fn reseed(&mut self, opinion: f64, time_step: u64) {
        self.entries.clear();
        self.entries.extend((0..SEED_IMPRESSIONS).map(|_| Impression {
            time_step,
            weight: 1.0,
            leaning: opinion,
        }));
    }

    pub fn push(&mut self, impression: Impression) {
        self.entries.push_back(impression);
    }

    /// Drops impressions older than `remembered` ticks relative to
    /// `current_step`. A window that would end up empty is reseeded at
    /// `opinion`, which leaves the opinion it implies unchanged.
    pub fn prune(&mut self, current_step: u64, remembered: u64, opinion: f64) {
        while self
            .entries
            .front()
            .is_some_and(|e| e.time_step + remembered <= current_step)
        {
            self.entries.pop_front();
        }
        if self.entries.is_empty() {
            self.reseed(opinion, current_step);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Impression> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn oldest_step(&self) -> Option<u64> {
        self.entries.front().map(|e| e.time_step)
    }
}

/// Engagement-weighted mean leaning of the window.
pub fn weighted_mean(window: &MemoryWindow) -> Option<f64> {
    let (weighted, total) = window
        .iter()
        .fold((0.0, 0.0), |(num, den), e| (num + e.weight * e.leaning, den + e.weight));
    (total > 0.0).then(|| weighted / total)
}
