use std::collections::{HashMap, HashSet, VecDeque};

use crate::model::Person;
use crate::store::EntityStore;

pub fn spouse_of<'a>(store: &'a EntityStore, id: &str) -> Option<&'a Person> {
    let spouse_id = store.get(id)?.spouse_id.as_deref()?;
    store.get(spouse_id)
}

pub fn parents_of<'a>(store: &'a EntityStore, id: &str) -> Vec<&'a Person> {
    store
        .get(id)
        .map(|person| {
            person
                .parent_ids
                .iter()
                .filter_map(|parent| store.get(parent))
                .collect()
        })
        .unwrap_or_default()
}

pub fn children_of<'a>(store: &'a EntityStore, id: &str) -> Vec<&'a Person> {
    if !store.contains(id) {
        return Vec::new();
    }
    let mut children: Vec<&Person> = store.iter().filter(|person| person.has_parent(id)).collect();
    sort_by_birth_order(&mut children);
    children
}

pub fn siblings_of<'a>(store: &'a EntityStore, id: &str) -> Vec<&'a Person> {
    let Some(subject) = store.get(id) else {
        return Vec::new();
    };
    let mut siblings: Vec<&Person> = store
        .iter()
        .filter(|other| other.id != subject.id)
        .filter(|other| other.parent_ids.iter().any(|parent| subject.has_parent(parent)))
        .collect();
    sort_by_birth_order(&mut siblings);
    siblings
}

pub fn household_children<'a>(store: &'a EntityStore, id: &str) -> Vec<&'a Person> {
    let mut children = children_of(store, id);
    let Some(spouse) = spouse_of(store, id) else {
        return children;
    };
    if !spouse.is_parentless() {
        return children;
    }
    let before = children.len();
    for child in store.iter() {
        if child.has_parent(&spouse.id) && !child.has_parent(id) {
            children.push(child);
        }
    }
    if children.len() != before {
        sort_by_birth_order(&mut children);
    }
    children
}

pub fn descendants_of<'a>(store: &'a EntityStore, id: &str) -> Vec<&'a Person> {
    let mut out = Vec::new();
    let mut visited = HashSet::new();
    visited.insert(id.to_string());
    collect_descendants(store, id, &mut visited, &mut out);
    out
}

fn collect_descendants<'a>(
    store: &'a EntityStore,
    id: &str,
    visited: &mut HashSet<String>,
    out: &mut Vec<&'a Person>,
) {
    for child in children_of(store, id) {
        if !visited.insert(child.id.clone()) {
            continue;
        }
        out.push(child);
        collect_descendants(store, &child.id, visited, out);
    }
}

pub fn count_descendants(store: &EntityStore, id: &str) -> usize {
    descendants_of(store, id).len()
}

pub fn is_ancestor(store: &EntityStore, ancestor: &str, id: &str) -> bool {
    let mut queue: VecDeque<&str> = VecDeque::new();
    let mut visited: HashSet<&str> = HashSet::new();
    if let Some(person) = store.get(id) {
        queue.extend(person.parent_ids.iter().map(String::as_str));
    }
    while let Some(current) = queue.pop_front() {
        if current == ancestor {
            return true;
        }
        if !visited.insert(current) {
            continue;
        }
        if let Some(person) = store.get(current) {
            queue.extend(person.parent_ids.iter().map(String::as_str));
        }
    }
    false
}

pub fn ancestor_chain_from_root(store: &EntityStore, roots: &[String], id: &str) -> Vec<String> {
    let mut predecessor: HashMap<String, Option<String>> = HashMap::new();
    let mut queue: VecDeque<String> = VecDeque::new();
    for root in roots {
        if store.contains(root) && !predecessor.contains_key(root) {
            predecessor.insert(root.clone(), None);
            queue.push_back(root.clone());
        }
    }

    while let Some(current) = queue.pop_front() {
        if current == id {
            let mut chain = vec![current.clone()];
            let mut cursor = predecessor.get(&current).cloned().flatten();
            while let Some(step) = cursor {
                cursor = predecessor.get(&step).cloned().flatten();
                chain.push(step);
            }
            chain.reverse();
            return chain;
        }
        for child in household_children(store, &current) {
            if !predecessor.contains_key(&child.id) {
                predecessor.insert(child.id.clone(), Some(current.clone()));
                queue.push_back(child.id.clone());
            }
        }
    }
    Vec::new()
}

pub fn sort_by_birth_order(people: &mut [&Person]) {
    people.sort_by_key(|person| person.birth_order_key());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn person(id: &str, parents: &[&str], order: Option<i64>) -> Person {
        let mut p = Person::new(id, id);
        p.parent_ids = parents.iter().map(|s| s.to_string()).collect();
        p.birth_order = order;
        p
    }

    fn ids(people: &[&Person]) -> Vec<String> {
        people.iter().map(|p| p.id.clone()).collect()
    }

    fn family() -> EntityStore {
        let mut mom = person("mom1", &[], None);
        mom.spouse_id = Some("dad1".to_string());
        let mut dad = person("dad1", &[], None);
        dad.spouse_id = Some("mom1".to_string());
        vec![
            mom,
            dad,
            person("late1", &["mom1", "dad1"], None),
            person("third1", &["mom1", "dad1"], Some(3)),
            person("first1", &["mom1", "dad1"], Some(1)),
            person("tie1", &["mom1", "dad1"], Some(3)),
            person("half1", &["dad1"], Some(2)),
            person("grand1", &["first1"], Some(1)),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn children_are_ordered_with_missing_last_and_stable_ties() {
        let store = family();
        assert_eq!(
            ids(&children_of(&store, "mom1")),
            vec!["first1", "third1", "tie1", "late1"]
        );
        assert_eq!(
            ids(&children_of(&store, "dad1")),
            vec!["first1", "half1", "third1", "tie1", "late1"]
        );
    }

    #[test]
    fn siblings_include_half_siblings() {
        let store = family();
        let siblings = ids(&siblings_of(&store, "first1"));
        assert_eq!(siblings, vec!["half1", "third1", "tie1", "late1"]);
        assert!(siblings_of(&store, "mom1").is_empty());
        assert!(siblings_of(&store, "ghost").is_empty());
    }

    #[test]
    fn household_children_adds_married_in_spouses_children_once() {
        let store = family();
        let household = ids(&household_children(&store, "mom1"));
        assert_eq!(household, vec!["first1", "half1", "third1", "tie1", "late1"]);
    }

    #[test]
    fn descendants_visit_each_person_once() {
        let store = family();
        let descendants = ids(&descendants_of(&store, "mom1"));
        assert_eq!(descendants, vec!["first1", "grand1", "third1", "tie1", "late1"]);
        assert_eq!(count_descendants(&store, "first1"), 1);
        assert!(descendants_of(&store, "ghost").is_empty());
    }

    #[test]
    fn spouse_and_parents_resolve_or_degrade() {
        let store = family();
        assert_eq!(spouse_of(&store, "mom1").map(|p| p.id.as_str()), Some("dad1"));
        assert!(spouse_of(&store, "grand1").is_none());
        assert_eq!(ids(&parents_of(&store, "first1")), vec!["mom1", "dad1"]);
        assert!(parents_of(&store, "ghost").is_empty());
    }

    #[test]
    fn ancestry_walks_parent_links() {
        let store = family();
        assert!(is_ancestor(&store, "mom1", "grand1"));
        assert!(!is_ancestor(&store, "grand1", "mom1"));
        assert!(!is_ancestor(&store, "mom1", "mom1"));
    }

    #[test]
    fn chain_from_root_follows_breadth_first_layers() {
        let store = family();
        let roots = vec!["mom1".to_string()];
        assert_eq!(
            ancestor_chain_from_root(&store, &roots, "grand1"),
            vec!["mom1", "first1", "grand1"]
        );
        assert_eq!(ancestor_chain_from_root(&store, &roots, "mom1"), vec!["mom1"]);
        assert!(ancestor_chain_from_root(&store, &roots, "ghost").is_empty());
    }
}
