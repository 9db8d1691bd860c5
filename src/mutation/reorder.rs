use std::collections::HashSet;

use tracing::debug;

use crate::model::Tree;
use crate::resolve;

impl Tree {
    pub fn reorder_children(&mut self, parent_id: &str, ids: &[String]) -> bool {
        if !self.people.contains(parent_id) || ids.is_empty() {
            return false;
        }
        let children: HashSet<&str> = resolve::household_children(&self.people, parent_id)
            .into_iter()
            .map(|child| child.id.as_str())
            .collect();
        if !all_distinct_members(ids, |id| children.contains(id)) {
            return false;
        }
        self.number_in_order(ids);
        debug!(tree = %self.id, parent = %parent_id, ids = ?ids, "reordered children");
        true
    }

    pub fn reorder_roots(&mut self, ids: &[String]) -> bool {
        if ids.is_empty() || !all_distinct_members(ids, |id| self.is_root(id)) {
            return false;
        }
        self.number_in_order(ids);
        let mut roots = ids.to_vec();
        roots.extend(
            self.root_person_ids
                .iter()
                .filter(|root| !ids.contains(*root))
                .cloned(),
        );
        self.root_person_ids = roots;
        debug!(tree = %self.id, ids = ?ids, "reordered roots");
        true
    }

    pub fn apply_reorder(&mut self, parent_id: Option<&str>, ids: &[String]) -> bool {
        match parent_id {
            Some(parent_id) => self.reorder_children(parent_id, ids),
            None => self.reorder_roots(ids),
        }
    }

    fn number_in_order(&mut self, ids: &[String]) {
        for (position, id) in ids.iter().enumerate() {
            if let Some(person) = self.people.get_mut(id) {
                person.birth_order = Some(position as i64 + 1);
            }
        }
    }
}

fn all_distinct_members(ids: &[String], member: impl Fn(&str) -> bool) -> bool {
    let mut seen = HashSet::new();
    ids.iter().all(|id| seen.insert(id.as_str()) && member(id))
}
