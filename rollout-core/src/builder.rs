//! Builder for configuring infection simulations.
//!
//! Exposes the heuristic knobs of the bounded spread (target tolerance,
//! blast-radius guard, candidate retries) and validates them before
//! constructing a [`Simulation`].

use crate::{
    Result,
    error::SimulationError,
    population::Population,
    simulation::Simulation,
};

const DEFAULT_DELTA: f64 = 0.05;
const DEFAULT_AFFECTED_THRESHOLD_FACTOR: f64 = 0.005;
const DEFAULT_SIZE_LIMIT: usize = 10_000;
const DEFAULT_NUM_RETRIES: usize = 5;
const DEFAULT_RNG_SEED: u64 = 0xDECA_FBAD;

/// Controls how the "picky near the finish line" band is measured.
///
/// The two-sided check is the documented contract; the one-sided variant is a
/// historical policy retained as a toggle, not a bug fix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TargetRangePolicy {
    /// `|target − infected| < delta`: pickiness activates in a band around
    /// the target on both sides.
    #[default]
    TwoSided,
    /// `target − infected < delta`: once past the target the band never
    /// deactivates.
    OneSided,
}

/// Configures and constructs [`Simulation`] instances.
///
/// # Examples
/// ```
/// use rollout_core::{Population, SimulationBuilder};
///
/// let simulation = SimulationBuilder::new()
///     .with_delta(0.1)
///     .with_size_limit(500)
///     .build(Population::new("v1"))
///     .expect("configuration is valid");
/// assert_eq!(simulation.size_limit(), 500);
/// ```
#[derive(Debug, Clone)]
pub struct SimulationBuilder {
    delta: f64,
    affected_threshold_factor: f64,
    size_limit: usize,
    num_retries: usize,
    rng_seed: u64,
    range_policy: TargetRangePolicy,
    track_infections: bool,
}

impl Default for SimulationBuilder {
    fn default() -> Self {
        Self {
            delta: DEFAULT_DELTA,
            affected_threshold_factor: DEFAULT_AFFECTED_THRESHOLD_FACTOR,
            size_limit: DEFAULT_SIZE_LIMIT,
            num_retries: DEFAULT_NUM_RETRIES,
            rng_seed: DEFAULT_RNG_SEED,
            range_policy: TargetRangePolicy::default(),
            track_infections: true,
        }
    }
}

impl SimulationBuilder {
    /// Creates a builder populated with the default heuristics.
    ///
    /// # Examples
    /// ```
    /// use rollout_core::SimulationBuilder;
    ///
    /// let builder = SimulationBuilder::new();
    /// assert!((builder.delta() - 0.05).abs() < f64::EPSILON);
    /// assert_eq!(builder.size_limit(), 10_000);
    /// assert_eq!(builder.num_retries(), 5);
    /// ```
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the tolerance band around the target percentage within
    /// which the picky heuristics activate.
    #[must_use]
    pub fn with_delta(mut self, delta: f64) -> Self {
        self.delta = delta;
        self
    }

    /// Returns the configured tolerance band.
    #[must_use]
    pub fn delta(&self) -> f64 {
        self.delta
    }

    /// Overrides the collateral-exposure factor: inside the target band a
    /// class is only infected when its affected count stays below
    /// `factor × population size`.
    #[must_use]
    pub fn with_affected_threshold_factor(mut self, factor: f64) -> Self {
        self.affected_threshold_factor = factor;
        self
    }

    /// Returns the configured collateral-exposure factor.
    #[must_use]
    pub fn affected_threshold_factor(&self) -> f64 {
        self.affected_threshold_factor
    }

    /// Overrides the blast-radius guard: classes connected to at least this
    /// many others are never infected through the heuristic path.
    #[must_use]
    pub fn with_size_limit(mut self, limit: usize) -> Self {
        self.size_limit = limit;
        self
    }

    /// Returns the configured blast-radius guard.
    #[must_use]
    pub fn size_limit(&self) -> usize {
        self.size_limit
    }

    /// Overrides how many random candidate draws the engine makes before
    /// force-infecting the last one. Zero still draws once; the clamp keeps
    /// the escape hatch reachable.
    #[must_use]
    pub fn with_num_retries(mut self, retries: usize) -> Self {
        self.num_retries = retries;
        self
    }

    /// Returns the configured candidate-draw budget.
    #[must_use]
    pub fn num_retries(&self) -> usize {
        self.num_retries
    }

    /// Seeds the internal RNG so candidate selection is deterministic.
    #[must_use]
    pub fn with_rng_seed(mut self, seed: u64) -> Self {
        self.rng_seed = seed;
        self
    }

    /// Returns the configured RNG seed.
    #[must_use]
    pub fn rng_seed(&self) -> u64 {
        self.rng_seed
    }

    /// Selects the target-range policy variant.
    #[must_use]
    pub fn with_range_policy(mut self, policy: TargetRangePolicy) -> Self {
        self.range_policy = policy;
        self
    }

    /// Returns the configured target-range policy.
    #[must_use]
    pub fn range_policy(&self) -> TargetRangePolicy {
        self.range_policy
    }

    /// Controls whether total infection records transitioned users in the
    /// infected set. Limited infection always records; this flag mirrors the
    /// flood-fill's optional bookkeeping.
    #[must_use]
    pub fn with_infection_tracking(mut self, enabled: bool) -> Self {
        self.track_infections = enabled;
        self
    }

    /// Returns whether total infection records transitioned users.
    #[must_use]
    pub fn track_infections(&self) -> bool {
        self.track_infections
    }

    /// Validates the configuration and constructs a [`Simulation`] owning
    /// `population`.
    ///
    /// # Errors
    /// Returns [`SimulationError::InvalidDelta`] or
    /// [`SimulationError::InvalidAffectedThresholdFactor`] when either
    /// fraction is not finite or falls outside `[0, 1]`.
    ///
    /// # Examples
    /// ```
    /// use rollout_core::{Population, SimulationBuilder, SimulationError};
    ///
    /// let err = SimulationBuilder::new()
    ///     .with_delta(1.5)
    ///     .build(Population::new("v1"))
    ///     .expect_err("delta above 1 must be rejected");
    /// assert!(matches!(err, SimulationError::InvalidDelta { .. }));
    /// ```
    pub fn build(self, population: Population) -> Result<Simulation> {
        if !self.delta.is_finite() || !(0.0..=1.0).contains(&self.delta) {
            return Err(SimulationError::InvalidDelta { got: self.delta });
        }
        if !self.affected_threshold_factor.is_finite()
            || !(0.0..=1.0).contains(&self.affected_threshold_factor)
        {
            return Err(SimulationError::InvalidAffectedThresholdFactor {
                got: self.affected_threshold_factor,
            });
        }
        Ok(Simulation::new(self.into_config(), population))
    }

    fn into_config(self) -> SimulationConfig {
        SimulationConfig {
            delta: self.delta,
            affected_threshold_factor: self.affected_threshold_factor,
            size_limit: self.size_limit,
            num_retries: self.num_retries,
            rng_seed: self.rng_seed,
            range_policy: self.range_policy,
            track_infections: self.track_infections,
        }
    }
}

/// Validated configuration handed to the engine by the builder.
#[derive(Debug, Clone)]
pub(crate) struct SimulationConfig {
    pub(crate) delta: f64,
    pub(crate) affected_threshold_factor: f64,
    pub(crate) size_limit: usize,
    pub(crate) num_retries: usize,
    pub(crate) rng_seed: u64,
    pub(crate) range_policy: TargetRangePolicy,
    pub(crate) track_infections: bool,
}
