//! Simulation Driver
//!
//! Owns the ECS world and the per-tick schedule. People are attached to
//! graph nodes as entities; the tick counter, content store and post ids
//! live in the `SimulationState` resource.

use bevy_ecs::prelude::*;
use bevy_ecs::schedule::ExecutorKind;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use thiserror::Error;
use tracing::{debug, info};

use feed_events::{generate_snapshot_id, AgentOpinion, OpinionSnapshot};

use crate::components::network::{NodeId, SocialGraph, SocialNetwork};
use crate::components::person::{Person, PersonError};
use crate::components::store::{ContentStore, StoreError};
use crate::config::SimConfig;
use crate::systems::ranking::FeedRanker;
use crate::systems::tick::{
    consumption_pass, posting_pass, SimulationFault, SimulationState, TickFault, TickStats,
};
use crate::SimRng;

/// Errors that abort a run.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimulationError {
    #[error("social graph is not connected")]
    GraphNotConnected,
    #[error("{0} is not part of the social graph")]
    UnknownNode(NodeId),
    #[error("no person attached to {0}")]
    MissingPayload(NodeId),
    #[error("population has {people} people but the graph has {nodes} nodes")]
    PopulationMismatch { people: usize, nodes: usize },
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Person(#[from] PersonError),
}

impl From<TickFault> for SimulationError {
    fn from(fault: TickFault) -> Self {
        match fault {
            TickFault::Store(err) => SimulationError::Store(err),
            TickFault::MissingPayload(node) => SimulationError::MissingPayload(node),
        }
    }
}

/// A population on a social graph plus the schedule that advances it
pub struct Simulation {
    world: World,
    schedule: Schedule,
}

impl Simulation {
    /// Creates an empty simulation over `graph`. People are attached
    /// afterwards with [`Simulation::attach`] or [`Simulation::populate`].
    pub fn new(
        graph: impl SocialGraph + 'static,
        config: &SimConfig,
    ) -> Result<Self, SimulationError> {
        if !graph.is_connected() {
            return Err(SimulationError::GraphNotConnected);
        }

        let state = SimulationState::new(
            config.simulation.window_size,
            config.agents.clone(),
            FeedRanker::from_config(&config.feed),
        )?;

        let mut world = World::new();
        world.insert_resource(state);
        world.insert_resource(SimRng(SmallRng::seed_from_u64(config.simulation.seed)));
        world.insert_resource(SocialNetwork::new(graph));
        world.insert_resource(SimulationFault::default());
        world.insert_resource(TickStats::default());

        let mut schedule = Schedule::default();
        schedule.set_executor_kind(ExecutorKind::SingleThreaded);
        schedule.add_systems((posting_pass, consumption_pass).chain());

        Ok(Self { world, schedule })
    }

    /// Attaches `person` to `node`, replacing whoever was there.
    pub fn attach(&mut self, node: NodeId, person: Person) -> Result<(), SimulationError> {
        if !self.world.resource::<SocialNetwork>().graph().contains(node) {
            return Err(SimulationError::UnknownNode(node));
        }
        let entity = self.world.spawn((node, person)).id();
        let replaced = self
            .world
            .resource_mut::<SocialNetwork>()
            .attach(node, entity);
        if let Some(old) = replaced {
            self.world.despawn(old);
        }
        Ok(())
    }

    /// Attaches one person per node, in node order.
    pub fn populate(&mut self, people: Vec<Person>) -> Result<(), SimulationError> {
        let nodes = self.world.resource::<SocialNetwork>().nodes().to_vec();
        if nodes.len() != people.len() {
            return Err(SimulationError::PopulationMismatch {
                people: people.len(),
                nodes: nodes.len(),
            });
        }
        for (node, person) in nodes.into_iter().zip(people) {
            self.attach(node, person)?;
        }
        Ok(())
    }

    pub fn person(&self, node: NodeId) -> Option<&Person> {
        let entity = self.world.resource::<SocialNetwork>().entity(node)?;
        self.world.get::<Person>(entity)
    }

    pub fn person_mut(&mut self, node: NodeId) -> Option<Mut<'_, Person>> {
        let entity = self.world.resource::<SocialNetwork>().entity(node)?;
        self.world.get_mut::<Person>(entity)
    }

    pub fn nodes(&self) -> Vec<NodeId> {
        self.world.resource::<SocialNetwork>().nodes().to_vec()
    }

    pub fn current_tick(&self) -> u64 {
        self.world.resource::<SimulationState>().current_tick
    }

    pub fn store(&self) -> &ContentStore {
        &self.world.resource::<SimulationState>().store
    }

    pub fn last_tick_stats(&self) -> TickStats {
        *self.world.resource::<TickStats>()
    }

    /// Runs one tick: the posting pass for everyone, then the consumption
    /// pass for everyone.
    pub fn step(&mut self) -> Result<TickStats, SimulationError> {
        let unattached = self.world.resource::<SocialNetwork>().unattached();
        if let Some(&node) = unattached.first() {
            return Err(SimulationError::MissingPayload(node));
        }

        self.schedule.run(&mut self.world);

        if let Some(fault) = self.world.resource_mut::<SimulationFault>().take() {
            return Err(fault.into());
        }

        let stats = self.last_tick_stats();
        debug!(
            tick = stats.tick,
            posts = stats.posts_published,
            online = stats.online_after,
            "tick complete"
        );
        self.world.resource_mut::<SimulationState>().current_tick += 1;
        Ok(stats)
    }

    /// Runs `ticks` ticks, stopping at the first error.
    pub fn run(&mut self, ticks: u64) -> Result<(), SimulationError> {
        for _ in 0..ticks {
            self.step()?;
        }
        Ok(())
    }

    /// Puts every person back to their initial state in a fresh epoch and
    /// empties the content store. The generator and post ids carry on, so
    /// the next trial differs from the last one.
    pub fn reset(&mut self) {
        let mut people = self.world.query::<&mut Person>();
        for mut person in people.iter_mut(&mut self.world) {
            person.reset();
        }

        {
            let mut state = self.world.resource_mut::<SimulationState>();
            state.store.clear();
            state.current_tick = 0;
        }
        *self.world.resource_mut::<TickStats>() = TickStats::default();
        info!("simulation reset");
    }

    /// Current opinion of every attached person, in node order.
    pub fn opinions(&self) -> Vec<(NodeId, f64)> {
        self.nodes()
            .into_iter()
            .filter_map(|node| self.person(node).map(|p| (node, p.opinion())))
            .collect()
    }

    /// Opinion poll of the whole population at the current tick.
    pub fn snapshot(&self, sequence: u64) -> OpinionSnapshot {
        let agents = self
            .nodes()
            .into_iter()
            .filter_map(|node| {
                self.person(node).map(|p| AgentOpinion {
                    node: node.0,
                    name: p.name().map(str::to_string),
                    opinion: p.opinion(),
                    initial_opinion: p.initial_opinion(),
                    is_online: p.is_online(),
                })
            })
            .collect();
        OpinionSnapshot::new(generate_snapshot_id(sequence), self.current_tick(), agents)
    }
}
