//! Error types for the rollout core library.
//!
//! Structural failures only: the engine has no recoverable-error taxonomy.
//! Precondition violations abort the run with a typed error instead of
//! looping or panicking.

use thiserror::Error;

/// An error produced by [`crate::Population`] arena operations.
#[non_exhaustive]
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum PopulationError {
    /// A [`crate::UserId`] did not belong to this arena.
    #[error("user handle {index} is out of bounds for this population")]
    UnknownUser {
        /// Arena index carried by the offending handle.
        index: usize,
    },
    /// A [`crate::ClassId`] did not belong to this arena.
    #[error("class handle {index} is out of bounds for this population")]
    UnknownClass {
        /// Arena index carried by the offending handle.
        index: usize,
    },
}

/// Error type produced when configuring or running [`crate::Simulation`].
#[non_exhaustive]
#[derive(Clone, Debug, Error, PartialEq)]
pub enum SimulationError {
    /// `delta` must be a finite fraction in `[0, 1]`.
    #[error("delta must be a finite fraction in [0, 1] (got {got})")]
    InvalidDelta {
        /// The rejected tolerance band supplied by the caller.
        got: f64,
    },
    /// `affected_threshold_factor` must be a finite fraction in `[0, 1]`.
    #[error("affected threshold factor must be a finite fraction in [0, 1] (got {got})")]
    InvalidAffectedThresholdFactor {
        /// The rejected factor supplied by the caller.
        got: f64,
    },
    /// The target fraction passed to a propagation run was out of range.
    #[error("target fraction must be a finite fraction in [0, 1] (got {got})")]
    InvalidTargetFraction {
        /// The rejected target supplied by the caller.
        got: f64,
    },
    /// A propagation run was requested before any users were registered.
    #[error("no users are registered; add at least one class before running")]
    EmptyPopulation,
    /// The candidate search drew only classless users and cannot force
    /// progress.
    #[error("no eligible class found after {attempts} candidate draws")]
    NoEligibleClasses {
        /// Number of draws attempted before giving up.
        attempts: usize,
    },
    /// An arena lookup failed while running the engine.
    #[error(transparent)]
    Population(#[from] PopulationError),
}

/// Convenient alias for results returned by the core API.
pub type Result<T> = core::result::Result<T, SimulationError>;
