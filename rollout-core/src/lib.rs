//! Rollout core library.
//!
//! Simulates controlled propagation of a version bump ("infection") across a
//! bipartite graph of users and classes: an unbounded flood fill and a
//! heuristically bounded spread that approaches a target fraction of the
//! population without stalling.

mod builder;
mod connectivity;
mod error;
mod population;
mod simulation;

pub use crate::{
    builder::{SimulationBuilder, TargetRangePolicy},
    error::{PopulationError, Result, SimulationError},
    population::{Class, ClassId, Population, User, UserId},
    simulation::Simulation,
};
