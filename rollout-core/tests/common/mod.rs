//! Fixtures shared by the rollout-core integration suites.

use rollout_core::{ClassId, Population, UserId};

pub const BASE_VERSION: &str = "00000";
pub const NEW_VERSION: &str = "00001";

/// The hand-built demo graph: three classes tied together by shared students
/// and a student who teaches.
pub struct Sample {
    pub population: Population,
    /// Teacher `aa` with students `a`..`g`.
    pub class1: ClassId,
    /// Teacher `bb` with student `a` cross-enrolled from class 1.
    pub class2: ClassId,
    /// Taught by student `c` of class 1; students `d` (also class 1), `z`, `y`.
    pub class3: ClassId,
    pub teacher1: UserId,
    pub teacher2: UserId,
    /// Students `a`..`g` of class 1, in order.
    pub students1: Vec<UserId>,
    pub z: UserId,
    pub y: UserId,
}

pub fn sample() -> Sample {
    let mut population = Population::new(BASE_VERSION);

    let teacher1 = population.add_user("aa");
    let students1: Vec<UserId> = ["a", "b", "c", "d", "e", "f", "g"]
        .iter()
        .map(|name| population.add_user(*name))
        .collect();
    let class1 = population
        .add_class(teacher1, &students1)
        .expect("handles are local");

    let teacher2 = population.add_user("bb");
    let class2 = population
        .add_class(teacher2, &students1[..1])
        .expect("handles are local");

    let z = population.add_user("z");
    let y = population.add_user("y");
    let class3 = population
        .add_class(students1[2], &[students1[3], z, y])
        .expect("handles are local");

    Sample {
        population,
        class1,
        class2,
        class3,
        teacher1,
        teacher2,
        students1,
        z,
        y,
    }
}
