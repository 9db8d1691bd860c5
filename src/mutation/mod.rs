mod ops;
mod panel;
mod reorder;

use crate::model::{Person, Tree};
use crate::store::EntityStore;

pub use panel::{PanelReport, PanelRow, PanelTarget};

pub fn generate_person_id(store: &EntityStore, name: &str) -> String {
    let base: String = name
        .split_whitespace()
        .next()
        .map(|token| {
            token
                .chars()
                .filter(|c| c.is_alphanumeric())
                .flat_map(char::to_lowercase)
                .collect::<String>()
        })
        .filter(|base| !base.is_empty())
        .unwrap_or_else(|| "person".to_string());

    let mut suffix: u64 = 1;
    loop {
        let candidate = format!("{base}{suffix}");
        if !store.contains(&candidate) {
            return candidate;
        }
        suffix += 1;
    }
}

pub fn next_birth_order<'a>(people: impl IntoIterator<Item = &'a Person>) -> i64 {
    people
        .into_iter()
        .filter_map(|person| person.birth_order)
        .max()
        .unwrap_or(0)
        + 1
}

impl Tree {
    // Unordered people get numbers after the current max, in display order,
    // so a newcomer appended with the returned order lands last.
    fn seal_birth_orders(&mut self, ids: &[String]) -> i64 {
        let mut next = next_birth_order(ids.iter().filter_map(|id| self.people.get(id)));
        for id in ids {
            if let Some(person) = self.people.get_mut(id) {
                if person.birth_order.is_none() {
                    person.birth_order = Some(next);
                    next += 1;
                }
            }
        }
        next
    }

    fn ensure_reachable(&mut self, id: &str) {
        let Some(person) = self.people.get(id) else {
            return;
        };
        if !person.is_parentless() || self.is_root(id) {
            return;
        }
        let anchored = person
            .spouse_id
            .as_deref()
            .and_then(|spouse_id| self.people.get(spouse_id))
            .is_some_and(|spouse| !spouse.is_parentless() || self.is_root(&spouse.id));
        if !anchored {
            tracing::debug!(tree = %self.id, person = %id, "promoted to root");
            self.root_person_ids.push(id.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_use_first_token_and_smallest_free_suffix() {
        let mut store = EntityStore::new();
        assert_eq!(generate_person_id(&store, "Robert Johnson"), "robert1");
        store.upsert(Person::new("robert1", "Robert Johnson"));
        store.upsert(Person::new("robert3", "Robert Smith"));
        assert_eq!(generate_person_id(&store, "robert jr"), "robert2");
        assert_eq!(generate_person_id(&store, "  O'Neil  "), "oneil1");
        assert_eq!(generate_person_id(&store, "!!!"), "person1");
    }

    #[test]
    fn next_order_starts_at_one_and_ignores_unordered() {
        assert_eq!(next_birth_order(std::iter::empty()), 1);
        let mut a = Person::new("a1", "A");
        a.birth_order = Some(4);
        let b = Person::new("b1", "B");
        assert_eq!(next_birth_order([&a, &b]), 5);
    }
}
