//! World Setup
//!
//! Builds the random social graph and the population that lives on it.

pub mod graph;
pub mod population;

pub use graph::random_connected;
pub use population::{random_traits, setup_rng, spawn_population};
