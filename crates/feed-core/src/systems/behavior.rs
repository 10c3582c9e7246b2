//! Behavior System
//!
//! Posting, reading and the online/offline state machine. Every stochastic
//! decision draws from the generator passed in by the caller.

use rand::distributions::Distribution;
use rand::Rng;
use statrs::distribution::Normal;
use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};
use tracing::{debug, warn};

use feed_events::Post;

use crate::components::person::Person;
use crate::components::store::PostIdAllocator;
use crate::config::AgentConfig;
use crate::systems::belief::Impression;
use crate::systems::engagement::how_engaging;

/// Draws from `Normal(mean, sd)`, falling back to `mean` when `sd` is not
/// a usable deviation.
pub fn gaussian<R: Rng + ?Sized>(rng: &mut R, mean: f64, sd: f64) -> f64 {
    if sd == 0.0 {
        return mean;
    }
    match Normal::new(mean, sd) {
        Ok(normal) => normal.sample(rng),
        Err(err) => {
            warn!(mean, sd, %err, "invalid normal parameters, using mean");
            mean
        }
    }
}

/// Outcome of one pass over the feed
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FeedRead {
    /// Posts the person wanted to read this tick
    pub requested: usize,
    pub read: usize,
    pub engagement: f64,
}

impl FeedRead {
    /// The feed ran out before the person was done reading.
    pub fn starved(&self) -> bool {
        self.read < self.requested
    }
}

/// What happened to one person during one tick
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CycleReport {
    pub was_online: bool,
    pub is_online: bool,
    pub posts_read: usize,
    pub engagement: f64,
}

impl Person {
    /// Possibly writes a post. Offline people never post.
    pub fn make_post<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        ids: &mut PostIdAllocator,
        config: &AgentConfig,
    ) -> Option<Post> {
        if !self.is_online || rng.gen::<f64>() >= self.activity {
            return None;
        }

        let leaning = gaussian(rng, self.opinion, config.post_noise_sd).clamp(0.0, 1.0);
        let interest: f64 = rng.gen();
        let post = match Post::new(ids.next_id(), leaning, interest) {
            Ok(post) => post,
            Err(err) => {
                warn!(%err, "discarding malformed post");
                return None;
            }
        };
        Some(match &self.name {
            Some(name) => post.with_author(name.clone()),
            None => post,
        })
    }

    /// Reads one post: scores it at the current opinion, remembers it and
    /// updates the opinion. Returns the engagement it produced.
    fn consume(&mut self, post: Post) -> f64 {
        let engagement = how_engaging(&post, self.opinion);
        self.memory.push(Impression {
            time_step: self.time_step,
            weight: engagement,
            leaning: post.leaning(),
        });
        if let Some(opinion) = (self.update_rule)(&self.memory) {
            self.opinion = opinion.clamp(0.0, 1.0);
        }
        self.history.current_mut().record_read(post, engagement);
        engagement
    }

    /// Reads every pending notification in arrival order and clears the
    /// queue. Returns the summed engagement.
    pub fn read_notifications(&mut self) -> f64 {
        let pending = std::mem::take(&mut self.notifications);
        let mut total = 0.0;
        for post in pending {
            total += self.consume(post);
        }
        total
    }

    /// Reads around `consumption` posts from the front of the feed.
    pub fn read_feed<R: Rng + ?Sized>(&mut self, rng: &mut R, config: &AgentConfig) -> FeedRead {
        let wanted = gaussian(rng, self.consumption as f64, config.read_noise_sd).round();
        let requested = wanted.max(1.0) as usize;

        let mut outcome = FeedRead {
            requested,
            ..Default::default()
        };
        while outcome.read < requested {
            let Some(post) = self.feed.pop_front() else {
                break;
            };
            outcome.engagement += self.consume(post);
            outcome.read += 1;
        }

        if outcome.starved() {
            debug!(
                name = self.name.as_deref().unwrap_or("anonymous"),
                requested,
                read = outcome.read,
                "feed ran dry"
            );
        }
        outcome
    }

    /// Glances at notifications while offline. Goes online if any of them
    /// beats the expected engagement. The queue is cleared either way.
    pub fn check_phone(&mut self) -> bool {
        let threshold = self.expected_engagement;
        let interesting = self
            .notifications
            .iter()
            .any(|post| post.interest_value() > threshold);
        self.notifications.clear();
        if interesting {
            self.is_online = true;
        }
        interesting
    }

    /// Probability of staying online after a session that produced
    /// `total_engagement`.
    pub fn stay_online_probability(&self, total_engagement: f64, config: &AgentConfig) -> f64 {
        let appetite = self.consumption as f64 * self.expected_engagement;
        let p = FRAC_PI_2 * (total_engagement - appetite + FRAC_PI_4.tan()).atan();
        p.max(config.stay_online_floor)
    }

    /// Runs one tick of the online/offline state machine, then ages the
    /// memory window and records the tick in the history.
    pub fn cycle<R: Rng + ?Sized>(&mut self, rng: &mut R, config: &AgentConfig) -> CycleReport {
        let mut report = CycleReport {
            was_online: self.is_online,
            ..Default::default()
        };

        if self.is_online {
            let from_notifications = self.notifications.len();
            let notification_engagement = self.read_notifications();
            let feed = self.read_feed(rng, config);

            report.posts_read = from_notifications + feed.read;
            report.engagement = notification_engagement + feed.engagement;

            let p = self.stay_online_probability(report.engagement, config);
            let draw: f64 = rng.gen();
            self.is_online = draw <= p;
        } else if !self.notifications.is_empty()
            && rng.gen::<f64>() < config.notification_check_prob
        {
            self.check_phone();
        } else if rng.gen::<f64>() < config.spontaneous_online_prob {
            self.is_online = true;
        }

        self.end_tick(config);
        report.is_online = self.is_online;
        report
    }

    fn end_tick(&mut self, config: &AgentConfig) {
        self.time_step += 1;
        self.memory
            .prune(self.time_step, config.remembered_times, self.opinion);
        self.history.store_data(self.opinion);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::person::PersonTraits;
    use feed_events::PostId;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn person(traits: PersonTraits) -> Person {
        Person::new(traits).unwrap()
    }

    fn post(id: u64, leaning: f64, interest: f64) -> Post {
        Post::new(PostId(id), leaning, interest).unwrap()
    }

    #[test]
    fn test_offline_person_never_posts() {
        let mut rng = SmallRng::seed_from_u64(1);
        let mut ids = PostIdAllocator::new();
        let p = person(PersonTraits {
            activity: 1.0,
            begin_online: false,
            ..Default::default()
        });

        for _ in 0..100 {
            assert!(p.make_post(&mut rng, &mut ids, &AgentConfig::default()).is_none());
        }
        assert_eq!(ids.issued(), 0);
    }

    #[test]
    fn test_active_person_posts_near_opinion() {
        let mut rng = SmallRng::seed_from_u64(2);
        let mut ids = PostIdAllocator::new();
        let p = person(PersonTraits {
            activity: 1.0,
            initial_opinion: 0.8,
            ..Default::default()
        })
        .with_name("Ada");

        for _ in 0..200 {
            let post = p
                .make_post(&mut rng, &mut ids, &AgentConfig::default())
                .expect("activity 1.0 always posts");
            assert!((0.0..=1.0).contains(&post.leaning()));
            assert!((post.leaning() - 0.8).abs() < 0.4);
            assert_eq!(post.author(), Some("Ada"));
        }
        assert_eq!(ids.issued(), 200);
    }

    #[test]
    fn test_zero_activity_never_posts() {
        let mut rng = SmallRng::seed_from_u64(3);
        let mut ids = PostIdAllocator::new();
        let p = person(PersonTraits {
            activity: 0.0,
            ..Default::default()
        });
        for _ in 0..100 {
            assert!(p.make_post(&mut rng, &mut ids, &AgentConfig::default()).is_none());
        }
    }

    #[test]
    fn test_notifications_pull_opinion_and_clear() {
        let mut p = person(PersonTraits::default());
        p.notify(post(1, 0.9, 1.0));
        p.notify(post(2, 0.9, 1.0));

        let engagement = p.read_notifications();

        assert!(engagement > 0.0);
        assert!(p.opinion() > 0.5);
        assert!(p.notifications().is_empty());
        assert_eq!(p.memory().len(), 7);
        assert!(p.history().current().has_read(PostId(2)));
    }

    #[test]
    fn test_later_notifications_see_updated_opinion() {
        let mut p = person(PersonTraits::default());
        let second = post(2, 0.9, 1.0);
        let at_start = how_engaging(&second, p.opinion());

        p.notify(post(1, 0.9, 1.0));
        p.notify(second.clone());
        p.read_notifications();

        let recorded = p.memory().iter().last().unwrap().weight;
        assert!(recorded > at_start);
    }

    #[test]
    fn test_read_feed_reports_starvation() {
        let mut rng = SmallRng::seed_from_u64(4);
        let mut p = person(PersonTraits {
            consumption: 4,
            ..Default::default()
        });
        p.refresh_feed([post(1, 0.5, 0.5)], 10);
        let config = AgentConfig {
            read_noise_sd: 0.0,
            ..Default::default()
        };

        let outcome = p.read_feed(&mut rng, &config);

        assert_eq!(outcome.requested, 4);
        assert_eq!(outcome.read, 1);
        assert!(outcome.starved());
        assert!(p.feed().is_empty());
    }

    #[test]
    fn test_read_feed_reads_at_least_one() {
        let mut rng = SmallRng::seed_from_u64(5);
        let mut p = person(PersonTraits {
            consumption: 0,
            ..Default::default()
        });
        p.refresh_feed((0..3).map(|i| post(i, 0.5, 0.5)), 10);
        let config = AgentConfig {
            read_noise_sd: 0.0,
            ..Default::default()
        };

        let outcome = p.read_feed(&mut rng, &config);
        assert_eq!(outcome.read, 1);
        assert_eq!(p.feed().front().map(|p| p.id()), Some(PostId(1)));
    }

    #[test]
    fn test_check_phone_goes_online_on_interesting_post() {
        let mut p = person(PersonTraits {
            expected_engagement: 0.4,
            begin_online: false,
            ..Default::default()
        });
        p.notify(post(1, 0.5, 0.2));
        p.notify(post(2, 0.5, 0.6));

        assert!(p.check_phone());
        assert!(p.is_online());
        assert!(p.notifications().is_empty());
    }

    #[test]
    fn test_check_phone_clears_even_when_boring() {
        let mut p = person(PersonTraits {
            expected_engagement: 0.9,
            begin_online: false,
            ..Default::default()
        });
        p.notify(post(1, 0.5, 0.2));

        assert!(!p.check_phone());
        assert!(!p.is_online());
        assert!(p.notifications().is_empty());
        // checking is not reading
        assert_eq!(p.opinion(), 0.5);
    }

    #[test]
    fn test_stay_online_probability_floor_and_growth() {
        let p = person(PersonTraits {
            consumption: 4,
            expected_engagement: 0.5,
            ..Default::default()
        });
        let config = AgentConfig::default();

        // Far below appetite: clamped to the floor
        assert_eq!(p.stay_online_probability(-10.0, &config), 0.05);
        // Exactly at appetite: (pi/2) * atan(1) = pi^2 / 8
        let at_appetite = p.stay_online_probability(2.0, &config);
        assert!((at_appetite - std::f64::consts::PI.powi(2) / 8.0).abs() < 1e-9);
        assert!(p.stay_online_probability(3.0, &config) > at_appetite);
    }

    #[test]
    fn test_stay_online_uses_low_draw() {
        // A probability above 1 must keep the person online whatever the draw,
        // which only holds when a draw at or below p means staying.
        let mut rng = SmallRng::seed_from_u64(6);
        let config = AgentConfig::default();
        let mut p = person(PersonTraits {
            consumption: 0,
            expected_engagement: 0.0,
            ..Default::default()
        });
        for i in 0..50 {
            p.notify(post(i, 0.5, 1.0));
            p.cycle(&mut rng, &config);
            assert!(p.is_online(), "went offline on tick {i}");
        }
    }

    #[test]
    fn test_offline_person_stays_offline_without_triggers() {
        let mut rng = SmallRng::seed_from_u64(7);
        let config = AgentConfig {
            spontaneous_online_prob: 0.0,
            ..Default::default()
        };
        let mut p = person(PersonTraits {
            begin_online: false,
            ..Default::default()
        });
        for _ in 0..100 {
            let report = p.cycle(&mut rng, &config);
            assert!(!report.was_online && !report.is_online);
        }
        assert_eq!(p.time_step(), 100);
        assert_eq!(p.history().time_index(), 100);
    }

    #[test]
    fn test_spontaneous_return() {
        let mut rng = SmallRng::seed_from_u64(8);
        let config = AgentConfig {
            spontaneous_online_prob: 1.0,
            ..Default::default()
        };
        let mut p = person(PersonTraits {
            begin_online: false,
            ..Default::default()
        });
        let report = p.cycle(&mut rng, &config);
        assert!(report.is_online);
    }

    #[test]
    fn test_memory_window_stays_bounded() {
        let mut rng = SmallRng::seed_from_u64(9);
        let config = AgentConfig::default();
        let mut p = person(PersonTraits {
            consumption: 0,
            expected_engagement: 0.0,
            ..Default::default()
        });
        for i in 0..60 {
            p.notify(post(i, 0.7, 0.9));
            p.cycle(&mut rng, &config);

            let now = p.time_step();
            assert!(!p.memory().is_empty());
            assert!(p
                .memory()
                .iter()
                .all(|e| now - e.time_step < config.remembered_times));
        }
    }
}
