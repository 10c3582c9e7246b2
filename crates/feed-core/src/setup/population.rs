//! Population Spawning
//!
//! Randomized people drawn the same way for every run with a given seed.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::components::person::{Person, PersonError, PersonTraits};
use crate::config::AgentConfig;
use crate::systems::behavior::gaussian;

/// Offset separating the setup stream from the simulation stream
const SETUP_STREAM: u64 = 0x5EED_0F_5E70;

/// Generator for graph and population setup, independent of the one the
/// simulation itself draws from.
pub fn setup_rng(seed: u64) -> SmallRng {
    SmallRng::seed_from_u64(seed ^ SETUP_STREAM)
}

/// Randomized traits for one person.
pub fn random_traits<R: Rng + ?Sized>(rng: &mut R, config: &AgentConfig) -> PersonTraits {
    let initial_opinion = gaussian(rng, config.initial_opinion_mean, config.initial_opinion_sd)
        .clamp(0.0, 1.0);
    let consumption = (rng.gen::<f64>() * config.max_consumption as f64) as i64;
    let expected_engagement = rng.gen::<f64>() * config.max_expected_engagement;
    let activity = rng.gen::<f64>();

    PersonTraits {
        consumption,
        expected_engagement,
        activity,
        initial_opinion,
        begin_online: config.begin_online,
        name: None,
    }
}

/// Spawns `count` people named `person-<index>`.
pub fn spawn_population<R: Rng + ?Sized>(
    count: usize,
    rng: &mut R,
    config: &AgentConfig,
) -> Result<Vec<Person>, PersonError> {
    (0..count)
        .map(|index| {
            let traits = PersonTraits {
                name: Some(format!("person-{index}")),
                ..random_traits(rng, config)
            };
            Person::new(traits)
        })
        .collect()
}
