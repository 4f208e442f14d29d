//! The inference engine for typological belief graphs.
//!
//! This module provides:
//! - **errors**: Error types for inference failures
//! - **config**: Session tunables (observation influence, autolock, seed)
//! - **belief**: Belief vectors and normalization helpers
//! - **potential**: Row-stochastic pairwise potentials
//! - **node**: Parameter nodes, observation counts, Bayesian observation update
//! - **belief_propagation**: Randomized message rounds
//! - **graph**: The inference graph and its update cycle

pub mod belief;
pub mod belief_propagation;
pub mod config;
pub mod errors;
pub mod graph;
pub mod node;
pub mod potential;
