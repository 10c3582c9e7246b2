//! Social Network Components
//!
//! The social graph is an external collaborator: the simulation only needs
//! the node set, neighbor lists and a connectivity check. `PetSocialGraph`
//! is the petgraph-backed implementation the driver uses.

use bevy_ecs::prelude::*;
use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::unionfind::UnionFind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Identifier of a node in the social graph
#[derive(
    Component, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node_{}", self.0)
    }
}

/// What the simulation needs from a social graph. Graphs are expected to
/// be undirected.
pub trait SocialGraph: Send + Sync {
    /// Every node, in ascending order.
    fn nodes(&self) -> Vec<NodeId>;

    /// Direct neighbors of `node`, in ascending order without repeats.
    fn neighbors(&self, node: NodeId) -> Vec<NodeId>;

    fn is_connected(&self) -> bool;

    fn contains(&self, node: NodeId) -> bool {
        self.nodes().binary_search(&node).is_ok()
    }
}

/// Undirected petgraph graph whose node indices double as `NodeId`s
#[derive(Debug, Clone, Default)]
pub struct PetSocialGraph {
    graph: UnGraph<(), ()>,
}

impl PetSocialGraph {
    /// A graph of `count` isolated nodes.
    pub fn with_nodes(count: usize) -> Self {
        let mut graph = UnGraph::with_capacity(count, count * 2);
        for _ in 0..count {
            graph.add_node(());
        }
        Self { graph }
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Links two nodes. Self loops, repeated edges and unknown nodes are
    /// ignored; returns whether a new edge was added.
    pub fn add_edge(&mut self, a: NodeId, b: NodeId) -> bool {
        let count = self.graph.node_count();
        if a == b || a.0 as usize >= count || b.0 as usize >= count {
            return false;
        }
        let (ia, ib) = (NodeIndex::new(a.0 as usize), NodeIndex::new(b.0 as usize));
        if self.graph.find_edge(ia, ib).is_some() {
            return false;
        }
        self.graph.add_edge(ia, ib, ());
        true
    }

    pub fn degree(&self, node: NodeId) -> usize {
        self.neighbors(node).len()
    }

    /// Connected components, each sorted, ordered by their smallest node.
    pub fn components(&self) -> Vec<Vec<NodeId>> {
        let count = self.graph.node_count();
        let mut sets = UnionFind::<usize>::new(count);
        for edge in self.graph.edge_indices() {
            if let Some((a, b)) = self.graph.edge_endpoints(edge) {
                sets.union(a.index(), b.index());
            }
        }

        let mut grouped: BTreeMap<usize, Vec<NodeId>> = BTreeMap::new();
        for (node, label) in sets.into_labeling().into_iter().enumerate() {
            grouped.entry(label).or_default().push(NodeId(node as u32));
        }
        let mut components: Vec<Vec<NodeId>> = grouped.into_values().collect();
        components.sort_by_key(|members| members[0]);
        components
    }
}

impl SocialGraph for PetSocialGraph {
    fn nodes(&self) -> Vec<NodeId> {
        self.graph
            .node_indices()
            .map(|idx| NodeId(idx.index() as u32))
            .collect()
    }

    fn neighbors(&self, node: NodeId) -> Vec<NodeId> {
        if node.0 as usize >= self.graph.node_count() {
            return Vec::new();
        }
        let mut neighbors: Vec<NodeId> = self
            .graph
            .neighbors(NodeIndex::new(node.0 as usize))
            .map(|idx| NodeId(idx.index() as u32))
            .collect();
        neighbors.sort();
        neighbors.dedup();
        neighbors
    }

    fn is_connected(&self) -> bool {
        self.graph.node_count() > 0 && self.components().len() == 1
    }

    fn contains(&self, node: NodeId) -> bool {
        (node.0 as usize) < self.graph.node_count()
    }
}

/// Resource: the social graph plus the entity attached to each node
#[derive(Resource)]
pub struct SocialNetwork {
    graph: Box<dyn SocialGraph>,
    nodes: Vec<NodeId>,
    payloads: BTreeMap<NodeId, Entity>,
}

impl SocialNetwork {
    pub fn new(graph: impl SocialGraph + 'static) -> Self {
        let mut nodes = graph.nodes();
        nodes.sort();
        Self {
            graph: Box::new(graph),
            nodes,
            payloads: BTreeMap::new(),
        }
    }

    pub fn graph(&self) -> &dyn SocialGraph {
        self.graph.as_ref()
    }

    /// Nodes in ascending order.
    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    pub fn neighbors(&self, node: NodeId) -> Vec<NodeId> {
        self.graph.neighbors(node)
    }

    pub fn entity(&self, node: NodeId) -> Option<Entity> {
        self.payloads.get(&node).copied()
    }

    /// Records the entity carrying `node`'s person, returning the one it
    /// replaces.
    pub fn attach(&mut self, node: NodeId, entity: Entity) -> Option<Entity> {
        self.payloads.insert(node, entity)
    }

    /// Nodes that have no person attached yet.
    pub fn unattached(&self) -> Vec<NodeId> {
        self.nodes
            .iter()
            .copied()
            .filter(|node| !self.payloads.contains_key(node))
            .collect()
    }

    /// `(node, entity)` pairs in node order.
    pub fn payloads(&self) -> impl Iterator<Item = (NodeId, Entity)> + '_ {
        self.payloads.iter().map(|(node, entity)| (*node, *entity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(n: usize) -> PetSocialGraph {
        let mut graph = PetSocialGraph::with_nodes(n);
        for i in 1..n as u32 {
            graph.add_edge(NodeId(i - 1), NodeId(i));
        }
        graph
    }

    #[test]
    fn test_add_edge_ignores_loops_and_repeats() {
        let mut graph = PetSocialGraph::with_nodes(3);
        assert!(graph.add_edge(NodeId(0), NodeId(1)));
        assert!(!graph.add_edge(NodeId(1), NodeId(0)));
        assert!(!graph.add_edge(NodeId(2), NodeId(2)));
        assert!(!graph.add_edge(NodeId(0), NodeId(7)));
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn test_neighbors_are_symmetric() {
        let graph = path(4);
        assert_eq!(graph.neighbors(NodeId(1)), vec![NodeId(0), NodeId(2)]);
        assert_eq!(graph.neighbors(NodeId(0)), vec![NodeId(1)]);
        assert_eq!(graph.degree(NodeId(3)), 1);
        assert!(graph.neighbors(NodeId(9)).is_empty());
    }

    #[test]
    fn test_connectivity() {
        assert!(path(5).is_connected());
        assert!(PetSocialGraph::with_nodes(1).is_connected());
        assert!(!PetSocialGraph::with_nodes(0).is_connected());

        let mut split = PetSocialGraph::with_nodes(4);
        split.add_edge(NodeId(0), NodeId(1));
        split.add_edge(NodeId(2), NodeId(3));
        assert!(!split.is_connected());
        assert_eq!(
            split.components(),
            vec![vec![NodeId(0), NodeId(1)], vec![NodeId(2), NodeId(3)]]
        );
    }

    #[test]
    fn test_network_tracks_unattached_nodes() {
        let mut world = World::new();
        let entity = world.spawn_empty().id();
        let mut network = SocialNetwork::new(path(3));

        assert_eq!(network.unattached().len(), 3);
        assert_eq!(network.attach(NodeId(1), entity), None);
        assert_eq!(network.unattached(), vec![NodeId(0), NodeId(2)]);
        assert_eq!(network.entity(NodeId(1)), Some(entity));
    }
}
