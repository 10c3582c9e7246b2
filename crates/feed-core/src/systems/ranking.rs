//! Feed Ranking
//!
//! Builds a personalized feed from the content store by predicting how
//! engaging each candidate would be to the person and ordering by that
//! prediction. The filter-bubble policy first narrows candidates to posts
//! close to the person's opinion.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::warn;

use feed_events::{Post, PostId, PostTuple};

use crate::components::person::Person;
use crate::components::store::ContentStore;
use crate::config::FeedConfig;
use crate::systems::engagement::predict_engagement;

/// Which posts the ranker is allowed to recommend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RankingPolicy {
    /// Every stored post is a candidate
    #[default]
    Engagement,
    /// Only posts whose leaning is within the tolerance of the opinion
    FilterBubble,
}

impl RankingPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            RankingPolicy::Engagement => "engagement",
            RankingPolicy::FilterBubble => "filter_bubble",
        }
    }
}

/// Engagement-maximizing feed builder
#[derive(Debug, Clone, PartialEq)]
pub struct FeedRanker {
    pub policy: RankingPolicy,
    pub tolerance: f64,
    pub skip_read: bool,
    pub feed_capacity: usize,
}

impl Default for FeedRanker {
    fn default() -> Self {
        Self::from_config(&FeedConfig::default())
    }
}

impl FeedRanker {
    pub fn from_config(config: &FeedConfig) -> Self {
        Self {
            policy: config.policy,
            tolerance: config.tolerance,
            skip_read: config.skip_read,
            feed_capacity: config.feed_capacity,
        }
    }

    pub fn with_policy(mut self, policy: RankingPolicy) -> Self {
        self.policy = policy;
        self
    }

    fn candidates<'a>(&self, opinion: f64, store: &'a ContentStore) -> Vec<&'a PostTuple> {
        match self.policy {
            RankingPolicy::Engagement => store.iter().collect(),
            RankingPolicy::FilterBubble => store
                .in_range(opinion - self.tolerance, opinion + self.tolerance)
                .filter(|t| (t[0] - opinion).abs() < self.tolerance)
                .collect(),
        }
    }

    /// Scores every eligible stored post for `person`, highest predicted
    /// engagement first. Ties keep store order.
    ///
    /// With `skip_read` set, posts read this epoch and posts still waiting
    /// in the notification queue are left out.
    pub fn rank(&self, person: &Person, store: &ContentStore) -> Vec<(f64, Post)> {
        let opinion = person.opinion();
        let epoch = person.history().current();
        let queued: Vec<PostId> = if self.skip_read {
            person.notifications().iter().map(Post::id).collect()
        } else {
            Vec::new()
        };

        let mut scored: Vec<(f64, Post)> = self
            .candidates(opinion, store)
            .into_iter()
            .filter_map(|tuple| match Post::from_tuple(*tuple) {
                Ok(post) => Some(post),
                Err(err) => {
                    warn!(%err, "skipping malformed stored post");
                    None
                }
            })
            .filter(|post| !epoch.has_authored(post.id()))
            .filter(|post| !(self.skip_read && epoch.has_read(post.id())))
            .filter(|post| !queued.contains(&post.id()))
            .map(|post| (predict_engagement(&post, opinion), post))
            .collect();

        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));
        scored
    }

    /// Replaces the person's unread feed with the top `feed_capacity`
    /// ranked posts and records them as shown. Returns the feed length.
    pub fn send_news(&self, person: &mut Person, store: &ContentStore) -> usize {
        let mut ranked = self.rank(person, store);
        ranked.truncate(self.feed_capacity);
        let count = ranked.len();
        person
            .history_mut()
            .current_mut()
            .record_shown(ranked.iter().map(|(_, post)| post));
        person.refresh_feed(ranked.into_iter().map(|(_, post)| post), self.feed_capacity);
        count
    }
}
