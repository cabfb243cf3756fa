//! Arena-backed population graph of users and classes.
//!
//! [`Population`] owns every [`User`] and [`Class`] in indexed arenas;
//! cross-references between the two sides of the bipartite graph are
//! [`UserId`]/[`ClassId`] handles rather than owning pointers, which keeps the
//! mutually referential roster mutable without interior mutability.

use std::collections::BTreeSet;

use crate::error::PopulationError;

/// Handle to a [`User`] stored in a [`Population`] arena.
///
/// # Examples
/// ```
/// use rollout_core::Population;
///
/// let mut population = Population::new("v1");
/// let id = population.add_user("alice");
/// assert_eq!(id.index(), 0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserId(usize);

impl UserId {
    /// Returns the arena index backing this handle.
    #[rustfmt::skip]
    #[must_use]
    pub const fn index(self) -> usize { self.0 }
}

/// Handle to a [`Class`] stored in a [`Population`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassId(usize);

impl ClassId {
    /// Returns the arena index backing this handle.
    #[rustfmt::skip]
    #[must_use]
    pub const fn index(self) -> usize { self.0 }
}

/// A participant in the graph: teacher of some classes, student in others.
#[derive(Debug, Clone)]
pub struct User {
    name: String,
    version: String,
    teaches: Vec<ClassId>,
    takes: Vec<ClassId>,
}

impl User {
    /// Returns the display name. Names are labels, not identity; two users
    /// may share one and the arena will not object.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the state tag the user currently carries.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Classes this user teaches, in enrolment order.
    #[must_use]
    pub fn teaches(&self) -> &[ClassId] {
        &self.teaches
    }

    /// Classes this user takes as a student, in enrolment order.
    #[must_use]
    pub fn takes(&self) -> &[ClassId] {
        &self.takes
    }
}

/// A class: one teacher, an ordered student roster, and propagation state.
#[derive(Debug, Clone)]
pub struct Class {
    teacher: UserId,
    students: Vec<UserId>,
    infected_count: usize,
    connected: BTreeSet<ClassId>,
}

impl Class {
    /// Returns the current teacher.
    #[must_use]
    pub fn teacher(&self) -> UserId {
        self.teacher
    }

    /// Returns the student roster. Duplicates are permitted: a re-enrolled
    /// student appears once per enrolment.
    #[must_use]
    pub fn students(&self) -> &[UserId] {
        &self.students
    }

    /// Count of infection events attributed to this class.
    ///
    /// This is an event counter, not a census: every user transition bumps
    /// the counter of every class that user belongs to, so under heavy
    /// cross-enrolment it can exceed the roster size. It is never clamped.
    #[must_use]
    pub fn infected_count(&self) -> usize {
        self.infected_count
    }

    /// Classes sharing at least one user with this one. Empty until
    /// [`crate::Simulation::build_connectivity`] runs.
    #[must_use]
    pub fn connected(&self) -> &BTreeSet<ClassId> {
        &self.connected
    }

    /// Whether the attributed-event counter has reached the roster size.
    ///
    /// Because [`Self::infected_count`] can overshoot, this is a heuristic
    /// saturation signal rather than a guarantee that every student
    /// transitioned.
    #[must_use]
    pub fn is_completely_infected(&self) -> bool {
        self.infected_count >= self.students.len()
    }

    /// Roster size minus attributed infection events, as signed arithmetic.
    ///
    /// Negative when the counter has overshot the roster; callers summing
    /// this across connected classes want the excess to cancel out, not
    /// saturate.
    #[must_use]
    pub fn uninfected_students(&self) -> i64 {
        self.students.len() as i64 - self.infected_count as i64
    }

    /// Fraction of the roster covered by attributed infection events.
    /// Returns `0.0` for an empty roster and may exceed `1.0` when the
    /// counter has overshot.
    #[must_use]
    pub fn percentage_students_infected(&self) -> f64 {
        if self.students.is_empty() {
            return 0.0;
        }
        self.infected_count as f64 / self.students.len() as f64
    }

    pub(crate) fn record_infection(&mut self) {
        self.infected_count += 1;
    }
}

/// The arena holding every user and class of a simulation's graph.
///
/// Enrolment wiring is bidirectional: adding a student to a class records the
/// class in the student's `takes` list, and assigning a teacher records it in
/// their `teaches` list.
///
/// # Examples
/// ```
/// use rollout_core::Population;
///
/// let mut population = Population::new("v1");
/// let teacher = population.add_user("ms-tanaka");
/// let alice = population.add_user("alice");
/// let bob = population.add_user("bob");
/// let class = population
///     .add_class(teacher, &[alice, bob])
///     .expect("handles come from this arena");
/// assert_eq!(population.class(class).expect("class exists").students().len(), 2);
/// assert_eq!(population.user(alice).expect("user exists").takes(), &[class]);
/// ```
#[derive(Debug, Clone)]
pub struct Population {
    base_version: String,
    users: Vec<User>,
    classes: Vec<Class>,
}

impl Population {
    /// Creates an empty arena whose users start at `base_version`.
    #[must_use]
    pub fn new(base_version: impl Into<String>) -> Self {
        Self {
            base_version: base_version.into(),
            users: Vec::new(),
            classes: Vec::new(),
        }
    }

    /// Returns the version tag every user starts with.
    #[must_use]
    pub fn base_version(&self) -> &str {
        &self.base_version
    }

    /// Adds a user carrying the base version and returns their handle.
    pub fn add_user(&mut self, name: impl Into<String>) -> UserId {
        let id = UserId(self.users.len());
        self.users.push(User {
            name: name.into(),
            version: self.base_version.clone(),
            teaches: Vec::new(),
            takes: Vec::new(),
        });
        id
    }

    /// Creates a class with the given teacher and initial student roster.
    ///
    /// # Errors
    /// Returns [`PopulationError::UnknownUser`] when `teacher` or any student
    /// handle does not belong to this arena.
    pub fn add_class(
        &mut self,
        teacher: UserId,
        students: &[UserId],
    ) -> Result<ClassId, PopulationError> {
        self.check_user(teacher)?;
        for &student in students {
            self.check_user(student)?;
        }
        let id = ClassId(self.classes.len());
        self.classes.push(Class {
            teacher,
            students: Vec::new(),
            infected_count: 0,
            connected: BTreeSet::new(),
        });
        self.user_mut(teacher)?.teaches.push(id);
        for &student in students {
            self.enroll_student(id, student)?;
        }
        Ok(id)
    }

    /// Appends a student to a class roster and records the class in the
    /// student's `takes` list. Re-enrolment adds a second roster entry.
    ///
    /// # Errors
    /// Returns [`PopulationError`] when either handle is foreign.
    pub fn enroll_student(
        &mut self,
        class: ClassId,
        student: UserId,
    ) -> Result<(), PopulationError> {
        self.check_user(student)?;
        self.class_mut(class)?.students.push(student);
        self.user_mut(student)?.takes.push(class);
        Ok(())
    }

    /// Replaces a class's teacher.
    ///
    /// The previous teacher keeps the class in their `teaches` list; only the
    /// class-side reference is replaced. This asymmetry is deliberate and
    /// visible to the connectivity builder.
    ///
    /// # Errors
    /// Returns [`PopulationError`] when either handle is foreign.
    pub fn assign_teacher(
        &mut self,
        class: ClassId,
        teacher: UserId,
    ) -> Result<(), PopulationError> {
        self.check_user(teacher)?;
        self.class_mut(class)?.teacher = teacher;
        self.user_mut(teacher)?.teaches.push(class);
        Ok(())
    }

    /// Looks up a user by handle.
    ///
    /// # Errors
    /// Returns [`PopulationError::UnknownUser`] for foreign handles.
    pub fn user(&self, id: UserId) -> Result<&User, PopulationError> {
        self.users
            .get(id.0)
            .ok_or(PopulationError::UnknownUser { index: id.0 })
    }

    /// Looks up a class by handle.
    ///
    /// # Errors
    /// Returns [`PopulationError::UnknownClass`] for foreign handles.
    pub fn class(&self, id: ClassId) -> Result<&Class, PopulationError> {
        self.classes
            .get(id.0)
            .ok_or(PopulationError::UnknownClass { index: id.0 })
    }

    /// Number of users in the arena.
    #[must_use]
    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    /// Number of classes in the arena.
    #[must_use]
    pub fn class_count(&self) -> usize {
        self.classes.len()
    }

    /// Iterates every class handle in creation order.
    pub fn class_ids(&self) -> impl Iterator<Item = ClassId> + '_ {
        (0..self.classes.len()).map(ClassId)
    }

    /// Every class the user belongs to: `takes` first, then `teaches`.
    /// A multiset; duplicates survive re-enrolment.
    ///
    /// # Errors
    /// Returns [`PopulationError::UnknownUser`] for foreign handles.
    pub fn classes_of(&self, id: UserId) -> Result<Vec<ClassId>, PopulationError> {
        let user = self.user(id)?;
        let mut classes = Vec::with_capacity(user.takes.len() + user.teaches.len());
        classes.extend_from_slice(&user.takes);
        classes.extend_from_slice(&user.teaches);
        Ok(classes)
    }

    /// Full membership of a class: teacher first, then the student roster.
    ///
    /// # Errors
    /// Returns [`PopulationError::UnknownClass`] for foreign handles.
    pub fn members(&self, id: ClassId) -> Result<Vec<UserId>, PopulationError> {
        let class = self.class(id)?;
        let mut members = Vec::with_capacity(class.students.len() + 1);
        members.push(class.teacher);
        members.extend_from_slice(&class.students);
        Ok(members)
    }

    pub(crate) fn set_version(
        &mut self,
        id: UserId,
        version: &str,
    ) -> Result<(), PopulationError> {
        self.user_mut(id)?.version = version.to_owned();
        Ok(())
    }

    pub(crate) fn record_infection(&mut self, id: ClassId) -> Result<(), PopulationError> {
        self.class_mut(id)?.record_infection();
        Ok(())
    }

    pub(crate) fn extend_connected(
        &mut self,
        id: ClassId,
        others: impl IntoIterator<Item = ClassId>,
    ) -> Result<(), PopulationError> {
        let class = self.class_mut(id)?;
        class.connected.extend(others);
        class.connected.remove(&id);
        Ok(())
    }

    fn check_user(&self, id: UserId) -> Result<(), PopulationError> {
        if id.0 < self.users.len() {
            Ok(())
        } else {
            Err(PopulationError::UnknownUser { index: id.0 })
        }
    }

    fn user_mut(&mut self, id: UserId) -> Result<&mut User, PopulationError> {
        self.users
            .get_mut(id.0)
            .ok_or(PopulationError::UnknownUser { index: id.0 })
    }

    fn class_mut(&mut self, id: ClassId) -> Result<&mut Class, PopulationError> {
        self.classes
            .get_mut(id.0)
            .ok_or(PopulationError::UnknownClass { index: id.0 })
    }
}
