//! Integration tests for the simulation engine's public API.

mod common;

use common::{BASE_VERSION, NEW_VERSION, sample};
use rollout_core::{Population, SimulationBuilder, SimulationError, TargetRangePolicy, UserId};
use rollout_test_support::graph::{jumble, random_population};
use rstest::rstest;

#[rstest]
fn builder_defaults_match_the_documented_heuristics() {
    let builder = SimulationBuilder::new();
    assert!((builder.delta() - 0.05).abs() < f64::EPSILON);
    assert!((builder.affected_threshold_factor() - 0.005).abs() < f64::EPSILON);
    assert_eq!(builder.size_limit(), 10_000);
    assert_eq!(builder.num_retries(), 5);
    assert_eq!(builder.range_policy(), TargetRangePolicy::TwoSided);
    assert!(builder.track_infections());
}

#[rstest]
#[case::negative(-0.01)]
#[case::above_one(1.01)]
#[case::nan(f64::NAN)]
fn builder_rejects_out_of_range_delta(#[case] delta: f64) {
    let err = SimulationBuilder::new()
        .with_delta(delta)
        .build(Population::new(BASE_VERSION))
        .expect_err("delta outside [0, 1] must be rejected");
    assert!(matches!(err, SimulationError::InvalidDelta { .. }));
}

#[rstest]
fn builder_rejects_out_of_range_threshold_factor() {
    let err = SimulationBuilder::new()
        .with_affected_threshold_factor(2.0)
        .build(Population::new(BASE_VERSION))
        .expect_err("factor outside [0, 1] must be rejected");
    assert!(matches!(
        err,
        SimulationError::InvalidAffectedThresholdFactor { .. }
    ));
}

#[rstest]
fn total_infection_covers_exactly_the_reachable_component() {
    let mut fixture = sample();
    // A disjoint island the flood fill must never touch.
    let islander = fixture.population.add_user("islander");
    let island_teacher = fixture.population.add_user("island-teacher");
    let island = fixture
        .population
        .add_class(island_teacher, &[islander])
        .expect("handles are local");

    let mut simulation = SimulationBuilder::new()
        .build(fixture.population)
        .expect("defaults are valid");
    for class in [fixture.class1, fixture.class2, fixture.class3, island] {
        simulation.add_class(class).expect("class exists");
    }

    simulation
        .total_infection(fixture.teacher1, NEW_VERSION)
        .expect("roster is non-empty");

    let population = simulation.population();
    let component: Vec<UserId> = [fixture.teacher1, fixture.teacher2, fixture.z, fixture.y]
        .into_iter()
        .chain(fixture.students1.iter().copied())
        .collect();
    for user in component {
        assert_eq!(
            population.user(user).expect("user exists").version(),
            NEW_VERSION
        );
        assert!(simulation.is_infected(user));
    }
    for user in [islander, island_teacher] {
        assert_eq!(
            population.user(user).expect("user exists").version(),
            BASE_VERSION
        );
        assert!(!simulation.is_infected(user));
    }
    assert_eq!(simulation.infected_count(), 11);
}

#[rstest]
fn total_infection_spreads_upstream_from_a_student() {
    let fixture = sample();
    let seed = fixture.z;
    let mut simulation = SimulationBuilder::new()
        .build(fixture.population)
        .expect("defaults are valid");
    for class in [fixture.class1, fixture.class2, fixture.class3] {
        simulation.add_class(class).expect("class exists");
    }

    // z takes class 3 → teacher c → class 1 → everyone, including bb via a.
    simulation
        .total_infection(seed, NEW_VERSION)
        .expect("roster is non-empty");
    assert_eq!(simulation.infected_count(), simulation.users().len());
}

#[rstest]
fn limited_infection_reaches_the_requested_fraction() {
    let fixture = sample();
    let mut simulation = SimulationBuilder::new()
        .with_rng_seed(11)
        .build(fixture.population)
        .expect("defaults are valid");
    for class in [fixture.class1, fixture.class2, fixture.class3] {
        simulation.add_class(class).expect("class exists");
    }

    simulation
        .limited_infection(NEW_VERSION, 0.25)
        .expect("roster is non-empty");
    assert!(simulation.hit_target(0.25));
    assert!(simulation.infected_count() <= simulation.users().len());
}

#[rstest]
fn limited_infection_converges_on_a_large_jumbled_graph() {
    let mut graph = random_population(97, 1_000, 20, BASE_VERSION);
    jumble(&mut graph, 53);
    let mut simulation = graph
        .into_simulation(SimulationBuilder::new().with_rng_seed(29))
        .expect("defaults are valid");

    simulation
        .limited_infection(NEW_VERSION, 0.25)
        .expect("roster is non-empty");

    let percentage = simulation.total_percentage_infected();
    assert!(percentage >= 0.25, "undershot the target: {percentage}");
    // Overshoot is bounded by roughly one class's blast radius.
    assert!(percentage < 0.30, "overshot the target: {percentage}");
}

#[rstest]
fn successive_runs_only_grow_the_infected_set() {
    let mut graph = random_population(7, 60, 12, BASE_VERSION);
    jumble(&mut graph, 13);
    let mut simulation = graph
        .into_simulation(SimulationBuilder::new().with_rng_seed(3))
        .expect("defaults are valid");

    simulation
        .limited_infection(NEW_VERSION, 0.2)
        .expect("roster is non-empty");
    let first_count = simulation.infected_count();
    let first_percentage = simulation.total_percentage_infected();

    simulation
        .limited_infection(NEW_VERSION, 0.4)
        .expect("roster is non-empty");
    assert!(simulation.infected_count() >= first_count);
    assert!(simulation.total_percentage_infected() >= first_percentage);
    assert!(simulation.hit_target(0.4));
}

#[rstest]
fn identical_seeds_produce_identical_outcomes() {
    let run = |engine_seed: u64| {
        let mut graph = random_population(41, 40, 10, BASE_VERSION);
        jumble(&mut graph, 17);
        let mut simulation = graph
            .into_simulation(SimulationBuilder::new().with_rng_seed(engine_seed))
            .expect("defaults are valid");
        simulation
            .limited_infection(NEW_VERSION, 0.3)
            .expect("roster is non-empty");
        simulation.infected_users().collect::<Vec<_>>()
    };

    assert_eq!(run(5), run(5));
}

#[rstest]
fn infected_users_iterates_in_roster_order() {
    let fixture = sample();
    let mut simulation = SimulationBuilder::new()
        .build(fixture.population)
        .expect("defaults are valid");
    for class in [fixture.class1, fixture.class2, fixture.class3] {
        simulation.add_class(class).expect("class exists");
    }
    simulation
        .total_infection(fixture.teacher1, NEW_VERSION)
        .expect("roster is non-empty");

    let listed: Vec<UserId> = simulation.infected_users().collect();
    let expected: Vec<UserId> = simulation
        .users()
        .iter()
        .copied()
        .filter(|&user| simulation.is_infected(user))
        .collect();
    assert_eq!(listed, expected);
}

#[rstest]
fn foreign_seed_handles_are_rejected() {
    let fixture = sample();
    let mut other_arena = Population::new(BASE_VERSION);
    // Pad the other arena so the handle falls outside the sample's range.
    for _ in 0..20 {
        other_arena.add_user("padding");
    }
    let stray = other_arena.add_user("stray");

    let mut simulation = SimulationBuilder::new()
        .build(fixture.population)
        .expect("defaults are valid");
    simulation.add_class(fixture.class1).expect("class exists");

    let err = simulation
        .total_infection(stray, NEW_VERSION)
        .expect_err("foreign handles must be rejected");
    assert!(matches!(
        err,
        SimulationError::Population(rollout_core::PopulationError::UnknownUser { .. })
    ));
}
