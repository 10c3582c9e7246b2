//! Graph Generation
//!
//! Sparse random graphs that are patched until connected.

use rand::Rng;
use tracing::debug;

use crate::components::network::{NodeId, PetSocialGraph};

/// Edge probability giving a mean degree of `avg_degree` on `nodes` nodes.
pub fn edge_probability(nodes: usize, avg_degree: f64) -> f64 {
    if nodes < 2 {
        return 0.0;
    }
    (2.0 * avg_degree / (nodes - 1) as f64).clamp(0.0, 1.0)
}

/// Draws an Erdős–Rényi graph and then bridges components with random
/// edges until the graph is connected.
pub fn random_connected<R: Rng + ?Sized>(
    nodes: usize,
    avg_degree: f64,
    rng: &mut R,
) -> PetSocialGraph {
    let mut graph = PetSocialGraph::with_nodes(nodes);
    let p = edge_probability(nodes, avg_degree);

    for a in 0..nodes as u32 {
        for b in (a + 1)..nodes as u32 {
            if rng.gen::<f64>() < p {
                graph.add_edge(NodeId(a), NodeId(b));
            }
        }
    }

    let mut bridges = 0;
    loop {
        let components = graph.components();
        if components.len() <= 1 {
            break;
        }
        let first = &components[0];
        let second = &components[1];
        let a = first[rng.gen_range(0..first.len())];
        let b = second[rng.gen_range(0..second.len())];
        graph.add_edge(a, b);
        bridges += 1;
    }

    debug!(nodes, edges = graph.edge_count(), bridges, "generated social graph");
    graph
}
