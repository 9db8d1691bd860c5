use std::collections::HashSet;

use serde::Serialize;

use crate::layout::{married_in_spouse, sorted_roots};
use crate::model::{Person, Tree};
use crate::resolve;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SiblingCluster {
    pub parent_ids: Vec<String>,
    pub member_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Generation {
    pub number: usize,
    pub clusters: Vec<SiblingCluster>,
    pub child_total: usize,
}

impl Generation {
    pub fn member_ids(&self) -> impl Iterator<Item = &str> {
        self.clusters
            .iter()
            .flat_map(|cluster| cluster.member_ids.iter().map(String::as_str))
    }
}

pub fn build_generations(tree: &Tree) -> Vec<Generation> {
    let mut placed: HashSet<&str> = HashSet::new();
    let mut row: Vec<&Person> = Vec::new();
    for root in sorted_roots(tree) {
        if placed.insert(root.id.as_str()) {
            row.push(root);
            if let Some(spouse) = married_in_spouse(tree, &root.id) {
                placed.insert(spouse.id.as_str());
            }
        }
    }

    let mut out = Vec::new();
    while !row.is_empty() {
        let mut next: Vec<&Person> = Vec::new();
        let mut child_ids: HashSet<&str> = HashSet::new();
        for person in &row {
            let children = resolve::household_children(&tree.people, &person.id);
            child_ids.extend(children.iter().map(|child| child.id.as_str()));
            if tree.collapsed_ids.contains(&person.id) {
                continue;
            }
            for child in children {
                if placed.insert(child.id.as_str()) {
                    next.push(child);
                }
            }
        }

        out.push(Generation {
            number: out.len() + 1,
            clusters: cluster_by_parents(&row),
            child_total: child_ids.len(),
        });
        row = next;
    }
    out
}

fn cluster_by_parents(row: &[&Person]) -> Vec<SiblingCluster> {
    let mut clusters: Vec<(Vec<String>, Vec<&Person>)> = Vec::new();
    for &person in row {
        let mut key = person.parent_ids.clone();
        key.sort();
        match clusters.iter_mut().find(|(existing, _)| *existing == key) {
            Some((_, members)) => members.push(person),
            None => clusters.push((key, vec![person])),
        }
    }
    clusters
        .into_iter()
        .map(|(parent_ids, mut members)| {
            resolve::sort_by_birth_order(&mut members);
            SiblingCluster {
                parent_ids,
                member_ids: members.into_iter().map(|p| p.id.clone()).collect(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn add(tree: &mut Tree, id: &str, parents: &[&str], order: Option<i64>) {
        let mut person = Person::new(id, id);
        person.parent_ids = parents.iter().map(|s| s.to_string()).collect();
        person.birth_order = order;
        if parents.is_empty() {
            tree.root_person_ids.push(id.to_string());
        }
        tree.people.upsert(person);
    }

    fn member_rows(generations: &[Generation]) -> Vec<Vec<&str>> {
        generations.iter().map(|g| g.member_ids().collect()).collect()
    }

    #[test]
    fn cousins_form_separate_clusters() {
        let mut tree = Tree::new("t", "T");
        add(&mut tree, "gran1", &[], Some(1));
        add(&mut tree, "ann1", &["gran1"], Some(1));
        add(&mut tree, "bob1", &["gran1"], Some(2));
        add(&mut tree, "bob_kid1", &["bob1"], Some(1));
        add(&mut tree, "ann_kid2", &["ann1"], Some(2));
        add(&mut tree, "ann_kid1", &["ann1"], Some(1));

        let generations = build_generations(&tree);
        assert_eq!(generations.len(), 3);
        assert_eq!(generations[2].clusters.len(), 2);
        assert_eq!(generations[2].clusters[0].parent_ids, vec!["ann1"]);
        assert_eq!(
            generations[2].clusters[0].member_ids,
            vec!["ann_kid1", "ann_kid2"]
        );
        assert_eq!(generations[2].clusters[1].member_ids, vec!["bob_kid1"]);
        assert_eq!(generations[0].child_total, 2);
    }

    #[test]
    fn person_reachable_from_two_roots_is_placed_once() {
        let mut tree = Tree::new("t", "T");
        add(&mut tree, "left1", &[], Some(1));
        add(&mut tree, "right1", &[], Some(2));
        add(&mut tree, "joint1", &["left1", "right1"], Some(1));
        add(&mut tree, "deep1", &["joint1"], Some(1));
        add(&mut tree, "late_left1", &["left1"], Some(2));

        let generations = build_generations(&tree);
        let rows = member_rows(&generations);
        assert_eq!(rows[0], vec!["left1", "right1"]);
        let all: Vec<&str> = rows.iter().flatten().copied().collect();
        let unique: HashSet<&str> = all.iter().copied().collect();
        assert_eq!(all.len(), unique.len());
        assert_eq!(all.iter().filter(|id| **id == "joint1").count(), 1);
        assert!(rows[2].contains(&"deep1"));
    }

    #[test]
    fn root_spouse_children_count_toward_first_generation() {
        let mut tree = Tree::new("t", "T");
        add(&mut tree, "robert1", &[], Some(1));
        let mut eleanor = Person::new("eleanor1", "Eleanor");
        eleanor.spouse_id = Some("robert1".to_string());
        tree.people.upsert(eleanor);
        if let Some(robert) = tree.people.get_mut("robert1") {
            robert.spouse_id = Some("eleanor1".to_string());
        }
        add(&mut tree, "shared1", &["robert1", "eleanor1"], Some(1));
        add(&mut tree, "stepkid1", &["eleanor1"], Some(2));

        let generations = build_generations(&tree);
        assert_eq!(generations[0].child_total, 2);
        assert_eq!(generations[1].clusters.len(), 2);
    }

    #[test]
    fn couple_listed_as_two_roots_shares_one_slot() {
        let mut tree = Tree::new("t", "T");
        add(&mut tree, "robert1", &[], Some(1));
        add(&mut tree, "eleanor1", &[], Some(2));
        for (a, b) in [("robert1", "eleanor1"), ("eleanor1", "robert1")] {
            if let Some(person) = tree.people.get_mut(a) {
                person.spouse_id = Some(b.to_string());
            }
        }
        add(&mut tree, "kid1", &["robert1", "eleanor1"], Some(1));

        let generations = build_generations(&tree);
        let rows = member_rows(&generations);
        assert_eq!(rows, vec![vec!["robert1"], vec!["kid1"]]);
    }

    #[test]
    fn collapsed_people_stop_descent() {
        let mut tree = Tree::new("t", "T");
        add(&mut tree, "gran1", &[], Some(1));
        add(&mut tree, "kid1", &["gran1"], Some(1));
        tree.collapsed_ids.insert("gran1".to_string());

        let generations = build_generations(&tree);
        assert_eq!(generations.len(), 1);
        assert_eq!(generations[0].child_total, 1);
    }
}
