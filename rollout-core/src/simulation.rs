//! The infection engine: registration, flood fill, and bounded spread.
//!
//! [`Simulation`] owns the [`Population`] arena, the registration roster, and
//! the infected set, and exposes the two propagation entry points. Total
//! infection is an unbounded breadth-first closure; limited infection walks
//! the class-connectivity graph with adaptive heuristics and a force-infect
//! escape hatch so it can approach a target fraction without stalling.

use std::collections::{HashSet, VecDeque};

use rand::{SeedableRng, rngs::SmallRng, seq::SliceRandom};
use tracing::{info, instrument, warn};

use crate::{
    Result,
    builder::{SimulationConfig, TargetRangePolicy},
    connectivity,
    error::SimulationError,
    population::{ClassId, Population, UserId},
};

/// Runs infection simulations over a registered class graph.
///
/// Construct one through [`crate::SimulationBuilder`], register the classes
/// that participate with [`Self::add_class`], then call
/// [`Self::total_infection`] or [`Self::limited_infection`].
///
/// # Examples
/// ```
/// use rollout_core::{Population, SimulationBuilder};
///
/// let mut population = Population::new("v1");
/// let teacher = population.add_user("teacher");
/// let students: Vec<_> = (0..9)
///     .map(|i| population.add_user(format!("student-{i}")))
///     .collect();
/// let class = population.add_class(teacher, &students).expect("handles are local");
///
/// let mut simulation = SimulationBuilder::new()
///     .with_rng_seed(7)
///     .build(population)
///     .expect("configuration is valid");
/// simulation.add_class(class).expect("class exists");
/// simulation.limited_infection("v2", 1.0).expect("population is non-empty");
/// assert!((simulation.total_percentage_infected() - 1.0).abs() < f64::EPSILON);
/// ```
#[derive(Debug)]
pub struct Simulation {
    config: SimulationConfig,
    rng: SmallRng,
    population: Population,
    classes: Vec<ClassId>,
    roster: Vec<UserId>,
    roster_set: HashSet<UserId>,
    infected: HashSet<UserId>,
}

impl Simulation {
    pub(crate) fn new(config: SimulationConfig, population: Population) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(config.rng_seed),
            config,
            population,
            classes: Vec::new(),
            roster: Vec::new(),
            roster_set: HashSet::new(),
            infected: HashSet::new(),
        }
    }

    /// Registers a class for the simulation and folds its members into the
    /// roster (students first, then the teacher; each user counted once, in
    /// first-seen order).
    ///
    /// Only registered classes seed the connectivity build, and only roster
    /// users count toward the infection percentage.
    ///
    /// # Errors
    /// Returns [`SimulationError::Population`] when the handle is foreign.
    pub fn add_class(&mut self, class: ClassId) -> Result<()> {
        let (teacher, students) = {
            let found = self.population.class(class)?;
            (found.teacher(), found.students().to_vec())
        };
        self.classes.push(class);
        for student in students {
            self.track_user(student);
        }
        self.track_user(teacher);
        Ok(())
    }

    fn track_user(&mut self, user: UserId) {
        if self.roster_set.insert(user) {
            self.roster.push(user);
        }
    }

    /// Registered classes, in registration order.
    #[must_use]
    pub fn classes(&self) -> &[ClassId] {
        &self.classes
    }

    /// Deduplicated roster of every user reachable from registered classes,
    /// in first-seen order.
    #[must_use]
    pub fn users(&self) -> &[UserId] {
        &self.roster
    }

    /// Read access to the underlying arena.
    #[must_use]
    pub fn population(&self) -> &Population {
        &self.population
    }

    /// Number of users recorded as transitioned.
    #[must_use]
    pub fn infected_count(&self) -> usize {
        self.infected.len()
    }

    /// Whether a specific user has been recorded as transitioned.
    #[must_use]
    pub fn is_infected(&self, user: UserId) -> bool {
        self.infected.contains(&user)
    }

    /// Iterates transitioned users in roster order, so output is
    /// deterministic for a given seed.
    pub fn infected_users(&self) -> impl Iterator<Item = UserId> + '_ {
        self.roster
            .iter()
            .copied()
            .filter(|user| self.infected.contains(user))
    }

    /// Fraction of the roster recorded as transitioned; `0.0` for an empty
    /// roster.
    #[must_use]
    pub fn total_percentage_infected(&self) -> f64 {
        if self.roster.is_empty() {
            return 0.0;
        }
        self.infected.len() as f64 / self.roster.len() as f64
    }

    /// Whether the infected fraction has reached `target`.
    #[must_use]
    pub fn hit_target(&self, target: f64) -> bool {
        self.total_percentage_infected() >= target
    }

    /// Whether the infected fraction sits inside the pickiness band around
    /// `target`, per the configured [`TargetRangePolicy`].
    #[must_use]
    pub fn is_within_target_range(&self, target: f64) -> bool {
        let distance = target - self.total_percentage_infected();
        match self.config.range_policy {
            TargetRangePolicy::TwoSided => distance.abs() < self.config.delta,
            TargetRangePolicy::OneSided => distance < self.config.delta,
        }
    }

    /// Collateral-exposure ceiling: `affected_threshold_factor` of the
    /// roster, truncated.
    #[must_use]
    pub fn affected_threshold(&self) -> i64 {
        (self.config.affected_threshold_factor * self.roster.len() as f64) as i64
    }

    /// Estimated collateral exposure of infecting `class`: the signed sum of
    /// uninfected students across every connected class.
    ///
    /// Deliberately not deduplicated: a user reachable through two connected
    /// classes is counted twice, and overshot counters contribute negatively.
    ///
    /// # Errors
    /// Returns [`SimulationError::Population`] when the handle is foreign.
    pub fn students_affected(&self, class: ClassId) -> Result<i64> {
        let mut total = 0_i64;
        for &other in self.population.class(class)?.connected() {
            total += self.population.class(other)?.uninfected_students();
        }
        Ok(total)
    }

    /// The candidate filter for heuristic spread: rejects classes whose
    /// connectivity reaches `size_limit`, and, inside the target band,
    /// classes whose collateral exposure meets the affected threshold.
    ///
    /// # Errors
    /// Returns [`SimulationError::Population`] when the handle is foreign.
    pub fn meets_requirements(&self, class: ClassId, target: f64) -> Result<bool> {
        if self.population.class(class)?.connected().len() >= self.config.size_limit {
            return Ok(false);
        }
        if self.is_within_target_range(target) {
            return Ok(self.students_affected(class)? < self.affected_threshold());
        }
        Ok(true)
    }

    /// Configured pickiness band width.
    #[must_use]
    pub fn delta(&self) -> f64 {
        self.config.delta
    }

    /// Configured blast-radius guard.
    #[must_use]
    pub fn size_limit(&self) -> usize {
        self.config.size_limit
    }

    /// Configured candidate-draw budget.
    #[must_use]
    pub fn num_retries(&self) -> usize {
        self.config.num_retries
    }

    /// Annotates every registered class with its one-hop class adjacency.
    ///
    /// Runs automatically at the start of [`Self::limited_infection`];
    /// calling it again after enrolment changes refreshes the sets (unions
    /// in, never removes).
    ///
    /// # Errors
    /// Returns [`SimulationError::Population`] if the arena and registration
    /// list have diverged, which cannot happen through this API.
    #[instrument(name = "engine.build_connectivity", skip(self), fields(classes = self.classes.len()))]
    pub fn build_connectivity(&mut self) -> Result<()> {
        connectivity::build(&mut self.population, &self.classes)?;
        Ok(())
    }

    /// Flood-fills the new version across everything reachable from `seed`
    /// via teach/take edges.
    ///
    /// Transitioned users are recorded in the infected set only when
    /// infection tracking is enabled; the traversal itself is unaffected by
    /// the flag.
    ///
    /// # Errors
    /// Returns [`SimulationError::EmptyPopulation`] before any users are
    /// registered and [`SimulationError::Population`] for a foreign seed
    /// handle.
    #[instrument(
        name = "engine.total_infection",
        skip(self),
        fields(new_version = %new_version, users = self.roster.len()),
    )]
    pub fn total_infection(&mut self, seed: UserId, new_version: &str) -> Result<()> {
        if self.roster.is_empty() {
            warn!("total infection requested on an empty roster");
            return Err(SimulationError::EmptyPopulation);
        }
        self.population.user(seed)?;

        let mut queue = VecDeque::from([seed]);
        let mut transitions = 0_usize;
        while let Some(user) = queue.pop_front() {
            if self.population.user(user)?.version() == new_version {
                continue;
            }
            self.population.set_version(user, new_version)?;
            transitions += 1;
            if self.config.track_infections {
                self.infected.insert(user);
            }
            let (teaches, takes) = {
                let found = self.population.user(user)?;
                (found.teaches().to_vec(), found.takes().to_vec())
            };
            for class in teaches {
                queue.extend(self.population.class(class)?.students().iter().copied());
            }
            for class in takes {
                queue.push_back(self.population.class(class)?.teacher());
            }
        }
        info!(transitions, "flood fill reached closure");
        Ok(())
    }

    /// Spreads the new version along class connectivity until the infected
    /// fraction reaches `target`.
    ///
    /// Far from the target the walk infects every dequeued class; inside the
    /// pickiness band it only accepts classes with low collateral exposure;
    /// classes with connectivity at or above the size limit are never
    /// accepted on the heuristic path. When the queue runs dry the engine
    /// draws random candidates, and if every draw looks bad it force-infects
    /// the last one so the walk cannot stall. The final fraction can
    /// overshoot `target` by roughly one class's blast radius.
    ///
    /// # Errors
    /// Returns [`SimulationError::InvalidTargetFraction`] for targets outside
    /// `[0, 1]`, [`SimulationError::EmptyPopulation`] before any users are
    /// registered, and [`SimulationError::NoEligibleClasses`] when the
    /// candidate search draws only classless users.
    #[instrument(
        name = "engine.limited_infection",
        skip(self),
        fields(new_version = %new_version, target, users = self.roster.len()),
    )]
    pub fn limited_infection(&mut self, new_version: &str, target: f64) -> Result<()> {
        if !target.is_finite() || !(0.0..=1.0).contains(&target) {
            return Err(SimulationError::InvalidTargetFraction { got: target });
        }
        if self.roster.is_empty() {
            warn!("limited infection requested on an empty roster");
            return Err(SimulationError::EmptyPopulation);
        }
        self.build_connectivity()?;

        let mut queue: VecDeque<ClassId> = VecDeque::new();
        let mut force_infect = false;
        while !self.hit_target(target) {
            if queue.is_empty() {
                force_infect = self.replenish(target, &mut queue)?;
            }
            let Some(class) = queue.pop_front() else {
                continue;
            };
            if force_infect {
                self.infect_class(class, new_version, &mut queue)?;
                force_infect = false;
                continue;
            }
            if self.is_saturated(class, new_version)? {
                // Nothing left to transition here; enqueueing its
                // connections again would only let the walk orbit.
                continue;
            }
            if self.meets_requirements(class, target)? {
                self.infect_class(class, new_version, &mut queue)?;
            }
        }
        info!(
            infected = self.infected.len(),
            percentage = self.total_percentage_infected(),
            "limited infection reached its target"
        );
        Ok(())
    }

    /// Draws candidates until one passes the filter. On a dry streak the last
    /// drawn class is enqueued anyway and the caller is told to force it.
    fn replenish(&mut self, target: f64, queue: &mut VecDeque<ClassId>) -> Result<bool> {
        // A zero retry budget still gets one draw; otherwise the escape
        // hatch could never arm and the loop would spin.
        let attempts = self.config.num_retries.max(1);
        let mut last_drawn = None;
        for _ in 0..attempts {
            let Some(candidate) = self.draw_candidate()? else {
                continue;
            };
            last_drawn = Some(candidate);
            if self.meets_requirements(candidate, target)? {
                queue.push_back(candidate);
                return Ok(false);
            }
        }
        let Some(candidate) = last_drawn else {
            return Err(SimulationError::NoEligibleClasses { attempts });
        };
        queue.push_back(candidate);
        Ok(true)
    }

    /// Draws a uniformly random roster user not yet recorded as infected,
    /// or `None` when everyone has transitioned (or nothing is registered).
    ///
    /// Drivers use this to pick a flood-fill seed; the limited walk uses it
    /// for candidate selection.
    pub fn sample_uninfected_user(&mut self) -> Option<UserId> {
        let uninfected: Vec<UserId> = self
            .roster
            .iter()
            .copied()
            .filter(|user| !self.infected.contains(user))
            .collect();
        uninfected.choose(&mut self.rng).copied()
    }

    /// Picks a uniformly random class of a uniformly random uninfected
    /// roster user. `None` when the drawn user has no classes (a failed
    /// attempt, not an error) or when nobody is left to draw.
    fn draw_candidate(&mut self) -> Result<Option<ClassId>> {
        let Some(user) = self.sample_uninfected_user() else {
            return Ok(None);
        };
        let classes = self.population.classes_of(user)?;
        Ok(classes.choose(&mut self.rng).copied())
    }

    fn is_saturated(&self, class: ClassId, new_version: &str) -> Result<bool> {
        for member in self.population.members(class)? {
            if self.population.user(member)?.version() != new_version {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Transitions every member of `class` that still carries an old
    /// version, attributes the event to every class each transitioned user
    /// belongs to, then enqueues the class's connections.
    fn infect_class(
        &mut self,
        class: ClassId,
        new_version: &str,
        queue: &mut VecDeque<ClassId>,
    ) -> Result<()> {
        for member in self.population.members(class)? {
            if self.population.user(member)?.version() == new_version {
                continue;
            }
            self.population.set_version(member, new_version)?;
            self.infected.insert(member);
            for touched in self.population.classes_of(member)? {
                self.population.record_infection(touched)?;
            }
        }
        let connected: Vec<ClassId> = self
            .population
            .class(class)?
            .connected()
            .iter()
            .copied()
            .collect();
        queue.extend(connected);
        Ok(())
    }

    #[cfg(test)]
    fn mark_infected(&mut self, user: UserId) {
        self.infected.insert(user);
    }
}
