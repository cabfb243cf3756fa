//! One-shot computation of the class-level spreading graph.
//!
//! Two classes are connected when they share at least one user, teacher or
//! student. The pass unions every member's full class multiset into each
//! registered class's `connected` set and strips the self edge. Re-running it
//! is idempotent; it is not incremental, so enrolment changes after a build
//! are invisible until the next build.

use std::collections::BTreeSet;

use crate::{
    error::PopulationError,
    population::{ClassId, Population},
};

/// Annotates every class in `classes` with its one-hop class adjacency.
///
/// Cost is O(classes × avg class size × avg classes per user). Symmetry is
/// emergent: if A shares a user with B, the shared user's class list puts
/// each in the other's set.
pub(crate) fn build(
    population: &mut Population,
    classes: &[ClassId],
) -> Result<(), PopulationError> {
    for &class in classes {
        let mut reachable = BTreeSet::new();
        for member in population.members(class)? {
            reachable.extend(population.classes_of(member)?);
        }
        population.extend_connected(class, reachable)?;
    }
    Ok(())
}
