pub mod atomic;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::model::Person;

// Insertion order breaks birth-order ties, so it survives removals and JSON.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityStore {
    people: IndexMap<String, Person>,
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<&Person> {
        self.people.get(id)
    }

    pub(crate) fn get_mut(&mut self, id: &str) -> Option<&mut Person> {
        self.people.get_mut(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.people.contains_key(id)
    }

    pub fn upsert(&mut self, person: Person) {
        self.people.insert(person.id.clone(), person);
    }

    pub fn remove(&mut self, id: &str) -> Option<Person> {
        self.people.shift_remove(id)
    }

    pub fn len(&self) -> usize {
        self.people.len()
    }

    pub fn is_empty(&self) -> bool {
        self.people.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Person> {
        self.people.values()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Person> {
        self.people.values_mut()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.people.keys().map(String::as_str)
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.people.get_index_of(id)
    }
}

impl FromIterator<Person> for EntityStore {
    fn from_iter<T: IntoIterator<Item = Person>>(iter: T) -> Self {
        let mut store = Self::new();
        for person in iter {
            store.upsert(person);
        }
        store
    }
}
