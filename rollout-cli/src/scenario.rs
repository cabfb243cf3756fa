//! Ready-made populations for the rollout CLI.
//!
//! The `demo` scenario is a small hand-built graph of three classes tied
//! together by shared students and a student who teaches. The `random`
//! scenario generates an arbitrary population from a seed so larger rollouts
//! stay reproducible from the command line.

use rand::{Rng, SeedableRng, rngs::SmallRng};
use rollout_core::{ClassId, Population, PopulationError};
use thiserror::Error;

/// A population with its classes, ready to register with a simulation.
#[derive(Debug)]
pub struct Scenario {
    /// Short label rendered in the run summary.
    pub label: String,
    /// The user/class arena.
    pub population: Population,
    /// Every class in the arena, in creation order.
    pub classes: Vec<ClassId>,
}

/// Shape of a generated population.
#[derive(Debug, Clone)]
pub struct RandomSpec {
    /// Number of classes to create.
    pub classes: usize,
    /// Upper bound on students per class, inclusive.
    pub max_class_size: usize,
    /// Extra cross-enrolments linking otherwise separate classes.
    pub cross_links: usize,
    /// Seed for the generator.
    pub seed: u64,
}

/// Errors raised while assembling a scenario.
#[derive(Debug, Error)]
pub enum ScenarioError {
    /// A random scenario was asked for classes that could hold nobody.
    #[error("`max-class-size` must be at least one")]
    EmptyClasses,
    /// The arena rejected a handle while wiring the graph.
    #[error(transparent)]
    Population(#[from] PopulationError),
}

/// Builds the three-class demo graph.
///
/// Teacher `aa` runs a class of students `a` through `g`; teacher `bb` runs a
/// class containing only the cross-enrolled `a`; student `c` teaches a third
/// class holding `d`, `z`, and `y`.
///
/// # Errors
/// Returns [`ScenarioError`] if the arena rejects a handle; the graph is
/// hand-built, so this does not happen in practice.
pub fn demo(base_version: &str) -> Result<Scenario, ScenarioError> {
    let mut population = Population::new(base_version);

    let aa = population.add_user("aa");
    let students: Vec<_> = ["a", "b", "c", "d", "e", "f", "g"]
        .iter()
        .map(|name| population.add_user(*name))
        .collect();
    let class1 = population.add_class(aa, &students)?;

    let bb = population.add_user("bb");
    let class2 = population.add_class(bb, &students[..1])?;

    let z = population.add_user("z");
    let y = population.add_user("y");
    let class3 = population.add_class(students[2], &[students[3], z, y])?;

    Ok(Scenario {
        label: "demo".to_owned(),
        population,
        classes: vec![class1, class2, class3],
    })
}

/// Generates a random population from `spec`.
///
/// Each class gets its own teacher and between one and `max_class_size`
/// students; `cross_links` then enrols already-created users into other
/// classes, stitching the components together.
///
/// # Errors
/// Returns [`ScenarioError::EmptyClasses`] when `max_class_size` is zero.
pub fn random(spec: &RandomSpec, base_version: &str) -> Result<Scenario, ScenarioError> {
    if spec.max_class_size == 0 {
        return Err(ScenarioError::EmptyClasses);
    }
    let mut rng = SmallRng::seed_from_u64(spec.seed);
    let mut population = Population::new(base_version);
    let mut classes = Vec::with_capacity(spec.classes);
    let mut everyone = Vec::new();

    for index in 0..spec.classes {
        let teacher = population.add_user(format!("teacher-{index}"));
        let students: Vec<_> = (0..rng.gen_range(1..=spec.max_class_size))
            .map(|slot| population.add_user(format!("student-{index}-{slot}")))
            .collect();
        classes.push(population.add_class(teacher, &students)?);
        everyone.push(teacher);
        everyone.extend(students);
    }

    if !classes.is_empty() {
        for _ in 0..spec.cross_links {
            let user = everyone[rng.gen_range(0..everyone.len())];
            let class = classes[rng.gen_range(0..classes.len())];
            population.enroll_student(class, user)?;
        }
    }

    Ok(Scenario {
        label: format!("random (seed {})", spec.seed),
        population,
        classes,
    })
}
