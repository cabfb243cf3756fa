//! Shared test utilities used across rollout crates.

pub mod graph {
    //! Seeded random population builders for convergence and property tests.
    //!
    //! Everything here is deterministic for a given seed so failures
    //! reproduce exactly.

    use rand::{Rng, SeedableRng, rngs::SmallRng};
    use rollout_core::{ClassId, Population, Result, Simulation, SimulationBuilder};

    /// A generated population together with the classes it contains, ready to
    /// be registered with an engine.
    #[derive(Debug, Clone)]
    pub struct RandomGraph {
        /// The generated arena.
        pub population: Population,
        /// Every generated class, in creation order.
        pub classes: Vec<ClassId>,
    }

    impl RandomGraph {
        /// Builds a [`Simulation`] from `builder` and registers every
        /// generated class with it.
        ///
        /// # Errors
        /// Returns the builder's validation error unchanged.
        pub fn into_simulation(self, builder: SimulationBuilder) -> Result<Simulation> {
            let classes = self.classes;
            let mut simulation = builder.build(self.population)?;
            for class in classes {
                simulation.add_class(class)?;
            }
            Ok(simulation)
        }
    }

    /// Generates `classes` disjoint classes, each with a fresh teacher and a
    /// uniformly random roster of `0..max_class_size` fresh students.
    ///
    /// # Panics
    /// Panics when `max_class_size` is zero; an empty size range has no
    /// meaning.
    #[must_use]
    pub fn random_population(
        seed: u64,
        classes: usize,
        max_class_size: usize,
        base_version: &str,
    ) -> RandomGraph {
        assert!(max_class_size > 0, "max_class_size must be at least 1");
        let mut rng = SmallRng::seed_from_u64(seed);
        let mut population = Population::new(base_version);
        let mut created = Vec::with_capacity(classes);
        for class_index in 0..classes {
            let class_size = rng.gen_range(0..max_class_size);
            let students: Vec<_> = (0..class_size)
                .map(|student| population.add_user(format!("student-{student},{class_index}")))
                .collect();
            let teacher = population.add_user(format!("teacher-{class_index}"));
            let class = population
                .add_class(teacher, &students)
                .expect("handles are local");
            created.push(class);
        }
        RandomGraph {
            population,
            classes: created,
        }
    }

    /// Draws random student and teacher relationships between classes so the
    /// graph stops being disjoint: for every class, a random prefix of its
    /// members is cross-enrolled into another random class, and one of its
    /// members re-teaches that class.
    ///
    /// # Panics
    /// Panics when `graph` is empty; there is nothing to link.
    pub fn jumble(graph: &mut RandomGraph, seed: u64) {
        assert!(!graph.classes.is_empty(), "cannot jumble an empty graph");
        let mut rng = SmallRng::seed_from_u64(seed);
        for index in 0..graph.classes.len() {
            let class = graph.classes[index];
            let other = graph.classes[rng.gen_range(0..graph.classes.len())];
            let members = graph
                .population
                .members(class)
                .expect("handles are local");
            let rogue_students = rng.gen_range(0..members.len());
            for &user in members.iter().take(rogue_students) {
                graph
                    .population
                    .enroll_student(other, user)
                    .expect("handles are local");
            }
            let rogue_teacher = members[rng.gen_range(0..members.len() / 4 + 1)];
            graph
                .population
                .assign_teacher(other, rogue_teacher)
                .expect("handles are local");
        }
    }

}
