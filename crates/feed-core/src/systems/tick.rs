//! Tick Systems
//!
//! The two passes run every tick. `posting_pass` lets everyone post and
//! delivers notifications; `consumption_pass` ranks feeds against the
//! completed content store and advances every person's state machine.
//! The schedule chains them, so no consumption read of tick `t` starts
//! before every posting effect of tick `t` is committed.

use bevy_ecs::prelude::*;
use tracing::{debug, error};

use feed_events::Post;

use crate::components::network::{NodeId, SocialNetwork};
use crate::components::person::Person;
use crate::components::store::{ContentStore, PostIdAllocator, StoreError};
use crate::config::AgentConfig;
use crate::systems::ranking::FeedRanker;
use crate::SimRng;

/// Global simulation state resource
#[derive(Resource, Debug)]
pub struct SimulationState {
    pub current_tick: u64,
    pub store: ContentStore,
    pub post_ids: PostIdAllocator,
    pub agents: AgentConfig,
    pub ranker: FeedRanker,
}

impl SimulationState {
    pub fn new(window: usize, agents: AgentConfig, ranker: FeedRanker) -> Result<Self, StoreError> {
        Ok(Self {
            current_tick: 0,
            store: ContentStore::new(window)?,
            post_ids: PostIdAllocator::new(),
            agents,
            ranker,
        })
    }
}

/// Structural failure raised inside a system
#[derive(Debug, Clone, PartialEq)]
pub enum TickFault {
    Store(StoreError),
    MissingPayload(NodeId),
}

/// Resource: first fault seen during the current tick
#[derive(Resource, Debug, Default)]
pub struct SimulationFault(Option<TickFault>);

impl SimulationFault {
    pub fn raise(&mut self, fault: TickFault) {
        error!(?fault, "simulation fault");
        if self.0.is_none() {
            self.0 = Some(fault);
        }
    }

    pub fn is_raised(&self) -> bool {
        self.0.is_some()
    }

    pub fn take(&mut self) -> Option<TickFault> {
        self.0.take()
    }
}

/// Resource: counters for the tick that just ran
#[derive(Resource, Debug, Clone, Copy, Default, PartialEq)]
pub struct TickStats {
    pub tick: u64,
    pub posts_published: usize,
    pub notifications_sent: usize,
    pub posts_read: usize,
    pub engagement: f64,
    pub online_before: usize,
    pub online_after: usize,
}

/// System: everyone decides whether to post; new posts go into the store
/// and straight to the author's neighbors.
pub fn posting_pass(
    mut state: ResMut<SimulationState>,
    mut rng: ResMut<SimRng>,
    network: Res<SocialNetwork>,
    mut fault: ResMut<SimulationFault>,
    mut stats: ResMut<TickStats>,
    mut people: Query<&mut Person>,
) {
    let state = &mut *state;
    let rng = &mut rng.0;
    let tick = state.current_tick;
    *stats = TickStats {
        tick,
        ..Default::default()
    };
    state.store.begin_tick(tick);

    let mut published: Vec<(NodeId, Post)> = Vec::new();
    for &node in network.nodes() {
        let Some(mut person) = network.entity(node).and_then(|e| people.get_mut(e).ok()) else {
            fault.raise(TickFault::MissingPayload(node));
            return;
        };
        if person.is_online() {
            stats.online_before += 1;
        }
        let Some(post) = person.make_post(rng, &mut state.post_ids, &state.agents) else {
            continue;
        };
        if let Err(err) = state.store.insert(tick, &post) {
            fault.raise(TickFault::Store(err));
            return;
        }
        person.history_mut().current_mut().record_authored(post.id());
        published.push((node, post));
    }

    for (author, post) in &published {
        for neighbor in network.neighbors(*author) {
            let Some(mut person) = network.entity(neighbor).and_then(|e| people.get_mut(e).ok())
            else {
                fault.raise(TickFault::MissingPayload(neighbor));
                return;
            };
            person.notify(post.clone());
            stats.notifications_sent += 1;
        }
    }

    stats.posts_published = published.len();
    debug!(tick, posts = published.len(), stored = state.store.len(), "posting pass done");
}

/// System: rank a feed for everyone against the full store, then run one
/// state machine cycle per person.
pub fn consumption_pass(
    state: Res<SimulationState>,
    mut rng: ResMut<SimRng>,
    network: Res<SocialNetwork>,
    mut fault: ResMut<SimulationFault>,
    mut stats: ResMut<TickStats>,
    mut people: Query<&mut Person>,
) {
    if fault.is_raised() {
        return;
    }
    let rng = &mut rng.0;

    for &node in network.nodes() {
        let Some(mut person) = network.entity(node).and_then(|e| people.get_mut(e).ok()) else {
            fault.raise(TickFault::MissingPayload(node));
            return;
        };
        let person = &mut *person;
        state.ranker.send_news(person, &state.store);
        let report = person.cycle(rng, &state.agents);

        stats.posts_read += report.posts_read;
        stats.engagement += report.engagement;
        if report.is_online {
            stats.online_after += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::network::PetSocialGraph;
    use crate::components::person::PersonTraits;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn world_with(people: Vec<PersonTraits>, edges: &[(u32, u32)]) -> World {
        let mut graph = PetSocialGraph::with_nodes(people.len());
        for &(a, b) in edges {
            graph.add_edge(NodeId(a), NodeId(b));
        }
        let mut network = SocialNetwork::new(graph);
        let mut world = World::new();
        for (i, traits) in people.into_iter().enumerate() {
            let node = NodeId(i as u32);
            let entity = world.spawn((node, Person::new(traits).unwrap())).id();
            network.attach(node, entity);
        }
        world.insert_resource(network);
        world.insert_resource(
            SimulationState::new(3, AgentConfig::default(), FeedRanker::default()).unwrap(),
        );
        world.insert_resource(SimRng(SmallRng::seed_from_u64(99)));
        world.insert_resource(SimulationFault::default());
        world.insert_resource(TickStats::default());
        world
    }

    fn poster() -> PersonTraits {
        PersonTraits {
            activity: 1.0,
            ..Default::default()
        }
    }

    fn lurker() -> PersonTraits {
        PersonTraits {
            activity: 0.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_posting_pass_fills_store_and_notifies_neighbors() {
        let mut world = world_with(vec![poster(), lurker(), lurker()], &[(0, 1), (1, 2)]);
        let mut schedule = Schedule::default();
        schedule.add_systems(posting_pass);
        schedule.run(&mut world);

        let state = world.resource::<SimulationState>();
        assert_eq!(state.store.len(), 1);
        assert_eq!(world.resource::<TickStats>().notifications_sent, 1);

        let mut query = world.query::<(&NodeId, &Person)>();
        for (node, person) in query.iter(&world) {
            let expected = usize::from(node.0 == 1);
            assert_eq!(person.notifications().len(), expected, "{node}");
        }
    }

    #[test]
    fn test_missing_payload_raises_fault() {
        let mut world = world_with(vec![poster(), lurker()], &[(0, 1)]);
        let ghost = world.spawn_empty().id();
        world.resource_mut::<SocialNetwork>().attach(NodeId(1), ghost);

        let mut schedule = Schedule::default();
        schedule.add_systems(posting_pass);
        schedule.run(&mut world);

        assert_eq!(
            world.resource_mut::<SimulationFault>().take(),
            Some(TickFault::MissingPayload(NodeId(1)))
        );
    }
}
