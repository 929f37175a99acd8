use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::person::Person;

#[derive(Default)]
struct AggregateInner {
    people: Vec<Person>,
    seen: HashSet<(String, String)>,
}

/// Shared result set. No two entries ever share a (first name, last name) pair.
///
/// The existence check and the insert happen under one lock, so concurrent
/// workers cannot both admit the same identity.
#[derive(Default)]
pub struct Aggregate {
    inner: Mutex<AggregateInner>,
}

impl Aggregate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Admits `person` unless its identity is already present. First seen wins.
    pub fn try_insert(&self, person: Person) -> bool {
        let mut guard = self.lock();
        if !guard.seen.insert(person.identity()) {
            return false;
        }
        guard.people.push(person);
        true
    }

    pub fn len(&self) -> usize {
        self.lock().people.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Admitted people in insertion order. Order across workers is arbitrary.
    pub fn into_people(self) -> Vec<Person> {
        self.inner
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
            .people
    }

    fn lock(&self) -> MutexGuard<'_, AggregateInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl FromIterator<Person> for Aggregate {
    fn from_iter<I: IntoIterator<Item = Person>>(iter: I) -> Self {
        let aggregate = Aggregate::new();
        for person in iter {
            aggregate.try_insert(person);
        }
        aggregate
    }
}
