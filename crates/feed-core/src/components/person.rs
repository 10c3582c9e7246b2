//! Person Components
//!
//! The per-agent state: behavioral parameters, current belief, inbound
//! queues, memory window and history.

use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use thiserror::Error;

use feed_events::Post;

use crate::components::history::History;
use crate::systems::belief::{weighted_mean, BeliefRule, MemoryWindow};

/// Errors raised when building a person from raw parameters.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PersonError {
    #[error("consumption must be non-negative, got {0}")]
    NegativeConsumption(i64),
    #[error("consumption {0} does not fit in 32 bits")]
    ExcessiveConsumption(i64),
    #[error("{field} must lie in [0, 1], got {value}")]
    OutOfRange { field: &'static str, value: f64 },
}

/// Parameters a person is created from. All reals are 0.0 to 1.0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonTraits {
    /// Mean number of feed posts read per online tick
    pub consumption: i64,
    /// Interest a notification needs to pull the person back online
    pub expected_engagement: f64,
    /// Chance of posting on an online tick
    pub activity: f64,
    pub initial_opinion: f64,
    pub begin_online: bool,
    #[serde(default)]
    pub name: Option<String>,
}

impl Default for PersonTraits {
    fn default() -> Self {
        Self {
            consumption: 2,
            expected_engagement: 0.25,
            activity: 0.5,
            initial_opinion: 0.5,
            begin_online: true,
            name: None,
        }
    }
}

impl PersonTraits {
    pub fn validate(&self) -> Result<(), PersonError> {
        if self.consumption < 0 {
            return Err(PersonError::NegativeConsumption(self.consumption));
        }
        if u32::try_from(self.consumption).is_err() {
            return Err(PersonError::ExcessiveConsumption(self.consumption));
        }
        for (field, value) in [
            ("expected_engagement", self.expected_engagement),
            ("activity", self.activity),
            ("initial_opinion", self.initial_opinion),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(PersonError::OutOfRange { field, value });
            }
        }
        Ok(())
    }
}

/// A simulated social media user
#[derive(Component, Debug, Clone)]
pub struct Person {
    pub(crate) name: Option<String>,
    pub(crate) consumption: u32,
    pub(crate) expected_engagement: f64,
    pub(crate) activity: f64,
    pub(crate) opinion: f64,
    pub(crate) initial_opinion: f64,
    pub(crate) begin_online: bool,
    pub(crate) is_online: bool,
    /// Posts pushed by neighbors, cleared whenever they are checked
    pub(crate) notifications: Vec<Post>,
    /// Posts assigned by the ranker, consumed front first
    pub(crate) feed: VecDeque<Post>,
    pub(crate) memory: MemoryWindow,
    /// Ticks since the last reset
    pub(crate) time_step: u64,
    pub(crate) history: History,
    pub(crate) update_rule: BeliefRule,
}

impl Person {
    pub fn new(traits: PersonTraits) -> Result<Self, PersonError> {
        traits.validate()?;
        let consumption = u32::try_from(traits.consumption)
            .map_err(|_| PersonError::ExcessiveConsumption(traits.consumption))?;
        Ok(Self {
            name: traits.name,
            consumption,
            expected_engagement: traits.expected_engagement,
            activity: traits.activity,
            opinion: traits.initial_opinion,
            initial_opinion: traits.initial_opinion,
            begin_online: traits.begin_online,
            is_online: traits.begin_online,
            notifications: Vec::new(),
            feed: VecDeque::new(),
            memory: MemoryWindow::seeded(traits.initial_opinion, 0),
            time_step: 0,
            history: History::new(),
            update_rule: weighted_mean,
        })
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Swaps the rule that turns the memory window into an opinion.
    pub fn with_update_rule(mut self, rule: BeliefRule) -> Self {
        self.update_rule = rule;
        self
    }

    /// Delivers a post from a neighbor.
    pub fn notify(&mut self, post: Post) {
        self.notifications.push(post);
    }

    /// Replaces the unread backlog with a fresh ranking, keeping the top
    /// `capacity` posts.
    pub fn refresh_feed(&mut self, posts: impl IntoIterator<Item = Post>, capacity: usize) {
        self.feed.clear();
        self.feed.extend(posts.into_iter().take(capacity));
    }

    /// Restores the state the person was created with and opens a new
    /// history epoch. Behavioral parameters and the update rule are kept.
    pub fn reset(&mut self) {
        self.opinion = self.initial_opinion;
        self.is_online = self.begin_online;
        self.notifications.clear();
        self.feed.clear();
        self.time_step = 0;
        self.memory = MemoryWindow::seeded(self.initial_opinion, 0);
        self.history.new_epoch();
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn consumption(&self) -> u32 {
        self.consumption
    }

    pub fn expected_engagement(&self) -> f64 {
        self.expected_engagement
    }

    pub fn activity(&self) -> f64 {
        self.activity
    }

    pub fn opinion(&self) -> f64 {
        self.opinion
    }

    pub fn initial_opinion(&self) -> f64 {
        self.initial_opinion
    }

    pub fn is_online(&self) -> bool {
        self.is_online
    }

    pub fn notifications(&self) -> &[Post] {
        &self.notifications
    }

    pub fn feed(&self) -> &VecDeque<Post> {
        &self.feed
    }

    pub fn memory(&self) -> &MemoryWindow {
        &self.memory
    }

    pub fn time_step(&self) -> u64 {
        self.time_step
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn history_mut(&mut self) -> &mut History {
        &mut self.history
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use feed_events::PostId;

    fn post(id: u64) -> Post {
        Post::new(PostId(id), 0.5, 0.5).unwrap()
    }

    #[test]
    fn test_negative_consumption_rejected() {
        let traits = PersonTraits {
            consumption: -1,
            ..Default::default()
        };
        assert_eq!(
            Person::new(traits).unwrap_err(),
            PersonError::NegativeConsumption(-1)
        );
    }

    #[test]
    fn test_out_of_range_activity_rejected() {
        let traits = PersonTraits {
            activity: 1.5,
            ..Default::default()
        };
        assert!(matches!(
            Person::new(traits),
            Err(PersonError::OutOfRange { field: "activity", .. })
        ));
    }

    #[test]
    fn test_consumption_must_fit_u32() {
        let traits = PersonTraits {
            consumption: i64::from(u32::MAX) + 1,
            ..Default::default()
        };
        assert_eq!(
            Person::new(traits).unwrap_err(),
            PersonError::ExcessiveConsumption(4_294_967_296)
        );

        let traits = PersonTraits {
            consumption: i64::from(u32::MAX),
            ..Default::default()
        };
        assert_eq!(Person::new(traits).unwrap().consumption(), u32::MAX);
    }

    #[test]
    fn test_refresh_feed_drops_backlog_and_keeps_top() {
        let mut person = Person::new(PersonTraits::default()).unwrap();
        person.refresh_feed((0..5).map(post), 10);
        person.refresh_feed((10..15).map(post), 3);

        let ids: Vec<u64> = person.feed().iter().map(|p| p.id().0).collect();
        assert_eq!(ids, vec![10, 11, 12]);
    }

    #[test]
    fn test_reset_restores_initial_state() {
        let traits = PersonTraits {
            initial_opinion: 0.3,
            begin_online: false,
            ..Default::default()
        };
        let mut person = Person::new(traits).unwrap().with_name("Ada");
        person.opinion = 0.8;
        person.is_online = true;
        person.time_step = 12;
        person.notify(post(1));
        person.refresh_feed([post(2)], 8);
        person.history_mut().store_data(0.8);

        person.reset();
        person.reset();

        assert_eq!(person.opinion(), 0.3);
        assert!(!person.is_online());
        assert!(person.notifications().is_empty());
        assert!(person.feed().is_empty());
        assert_eq!(person.time_step(), 0);
        assert_eq!(person.history().epoch_count(), 3);
        assert!(person.history().current().is_empty());
        assert_eq!(person.name(), Some("Ada"));
    }
}
