use std::collections::HashSet;

use tracing::{debug, warn};

use crate::error::ValidationError;
use crate::model::{Person, PersonPatch, Tree};
use crate::mutation::generate_person_id;
use crate::resolve;

impl Tree {
    pub fn add_person(
        &mut self,
        name: &str,
        parent_ids: &[String],
        spouse_id: Option<&str>,
        birth_order: Option<i64>,
    ) -> Option<String> {
        let name = name.trim();
        if name.is_empty() || parent_ids.len() > 2 {
            return None;
        }
        if parent_ids.len() == 2 && parent_ids[0] == parent_ids[1] {
            return None;
        }
        if parent_ids.iter().any(|parent| !self.people.contains(parent)) {
            return None;
        }
        if let Some(spouse_id) = spouse_id {
            let available = self
                .people
                .get(spouse_id)
                .is_some_and(|spouse| spouse.spouse_id.is_none());
            if !available {
                return None;
            }
        }

        let id = generate_person_id(&self.people, name);
        let mut person = Person::new(id.clone(), name);
        person.parent_ids = parent_ids.to_vec();
        person.spouse_id = spouse_id.map(ToOwned::to_owned);
        person.birth_order = birth_order;
        let is_root = person.is_parentless() && person.spouse_id.is_none();

        if let Some(spouse) = spouse_id.and_then(|spouse_id| self.people.get_mut(spouse_id)) {
            spouse.spouse_id = Some(id.clone());
        }
        self.people.upsert(person);
        if is_root {
            self.root_person_ids.push(id.clone());
        }
        debug!(tree = %self.id, person = %id, "added person");
        Some(id)
    }

    pub fn add_child(&mut self, parent_id: &str, name: &str) -> Option<String> {
        let parent = self.people.get(parent_id)?;
        let mut parents = vec![parent.id.clone()];
        if let Some(spouse_id) = &parent.spouse_id {
            if self.people.contains(spouse_id) {
                parents.push(spouse_id.clone());
            }
        }
        let children: Vec<String> = resolve::children_of(&self.people, parent_id)
            .into_iter()
            .map(|child| child.id.clone())
            .collect();
        if name.trim().is_empty() {
            return None;
        }
        let order = self.seal_birth_orders(&children);
        self.add_person(name, &parents, None, Some(order))
    }

    pub fn add_sibling(&mut self, person_id: &str, name: &str) -> Option<String> {
        let person = self.people.get(person_id)?;
        if person.is_parentless() || name.trim().is_empty() {
            return None;
        }
        let parents = person.parent_ids.clone();
        let mut group = vec![person];
        group.extend(resolve::siblings_of(&self.people, person_id));
        resolve::sort_by_birth_order(&mut group);
        let group: Vec<String> = group.into_iter().map(|p| p.id.clone()).collect();
        let order = self.seal_birth_orders(&group);
        self.add_person(name, &parents, None, Some(order))
    }

    pub fn add_root_sibling(&mut self, person_id: &str, name: &str) -> Option<String> {
        if !self.is_root(person_id) || !self.people.contains(person_id) || name.trim().is_empty() {
            return None;
        }
        let roots: Vec<String> = crate::layout::sorted_roots(self)
            .into_iter()
            .map(|root| root.id.clone())
            .collect();
        let order = self.seal_birth_orders(&roots);
        self.add_person(name, &[], None, Some(order))
    }

    pub fn add_spouse(&mut self, person_id: &str, name: &str) -> Option<String> {
        let person = self.people.get(person_id)?;
        if person.spouse_id.is_some() {
            return None;
        }
        self.add_person(name, &[], Some(person_id), None)
    }

    pub fn delete_spouse(&mut self, person_id: &str, spouse_id: &str) -> bool {
        let linked = self
            .people
            .get(person_id)
            .is_some_and(|person| person.spouse_id.as_deref() == Some(spouse_id));
        if !linked {
            return false;
        }
        self.remove_person(spouse_id)
    }

    pub fn update_person(
        &mut self,
        person_id: &str,
        patch: PersonPatch,
    ) -> Result<bool, ValidationError> {
        let Some(person) = self.people.get_mut(person_id) else {
            return Ok(false);
        };
        patch.validate_against(person)?;
        let before = person.clone();
        patch.apply_to(person);
        let changed = *person != before;
        if changed {
            debug!(tree = %self.id, person = %person_id, "updated person");
        }
        Ok(changed)
    }

    pub fn set_parents(
        &mut self,
        person_id: &str,
        parent_ids: &[String],
    ) -> Result<bool, ValidationError> {
        let Some(person) = self.people.get(person_id) else {
            return Ok(false);
        };
        if parent_ids.len() > 2 {
            return Err(ValidationError::TooManyParents(parent_ids.len()));
        }
        let mut seen = HashSet::new();
        for parent in parent_ids {
            if !seen.insert(parent.as_str()) {
                return Err(ValidationError::DuplicateParent(parent.clone()));
            }
            if !self.people.contains(parent) {
                return Err(ValidationError::UnknownPerson(parent.clone()));
            }
            if parent == person_id || resolve::is_ancestor(&self.people, person_id, parent) {
                return Err(ValidationError::WouldCreateCycle {
                    parent: parent.clone(),
                    child: person_id.to_string(),
                });
            }
        }
        if person.parent_ids == parent_ids {
            return Ok(false);
        }

        let previous = person.parent_ids.clone();
        if let Some(person) = self.people.get_mut(person_id) {
            person.parent_ids = parent_ids.to_vec();
        }
        if parent_ids.is_empty() {
            self.ensure_reachable(person_id);
        } else {
            self.root_person_ids.retain(|root| root != person_id);
        }
        debug!(
            tree = %self.id,
            person = %person_id,
            from = ?previous,
            to = ?parent_ids,
            "set parents"
        );
        Ok(true)
    }

    // Anyone left without parents or an anchoring spouse becomes a root.
    pub fn remove_person(&mut self, person_id: &str) -> bool {
        let Some(removed) = self.people.remove(person_id) else {
            return false;
        };

        let mut detached = Vec::new();
        if let Some(spouse_id) = &removed.spouse_id {
            if let Some(spouse) = self.people.get_mut(spouse_id) {
                if spouse.spouse_id.as_deref() == Some(person_id) {
                    spouse.spouse_id = None;
                    detached.push(spouse_id.clone());
                }
            }
        }
        for person in self.people.iter_mut() {
            if person.has_parent(person_id) {
                person.parent_ids.retain(|parent| parent != person_id);
                detached.push(person.id.clone());
            }
        }
        self.root_person_ids.retain(|root| root != person_id);
        self.collapsed_ids.remove(person_id);

        for id in &detached {
            self.ensure_reachable(id);
        }
        debug!(tree = %self.id, person = %person_id, "removed person");
        true
    }

    // Spouses who married into the branch survive, unlinked.
    pub fn delete_branch(&mut self, person_id: &str) -> Vec<String> {
        if !self.people.contains(person_id) {
            return Vec::new();
        }
        let descendants: Vec<String> = resolve::descendants_of(&self.people, person_id)
            .into_iter()
            .map(|person| person.id.clone())
            .collect();
        let doomed: HashSet<&str> = descendants
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(person_id))
            .collect();

        let mut widowed = Vec::new();
        for id in &descendants {
            let Some(removed) = self.people.remove(id) else {
                continue;
            };
            self.collapsed_ids.remove(id);
            if let Some(spouse_id) = removed.spouse_id {
                if !doomed.contains(spouse_id.as_str()) {
                    widowed.push(spouse_id);
                }
            }
        }
        self.root_person_ids.retain(|root| !doomed.contains(root.as_str()) || root == person_id);

        for spouse_id in &widowed {
            if let Some(spouse) = self.people.get_mut(spouse_id) {
                spouse.spouse_id = None;
            }
        }
        self.remove_person(person_id);
        for spouse_id in &widowed {
            self.ensure_reachable(spouse_id);
        }

        let mut deleted = Vec::with_capacity(descendants.len() + 1);
        deleted.push(person_id.to_string());
        deleted.extend(descendants);
        debug!(tree = %self.id, person = %person_id, count = deleted.len(), "deleted branch");
        deleted
    }

    pub fn toggle_collapse(&mut self, person_id: &str) -> Option<bool> {
        if resolve::household_children(&self.people, person_id).is_empty() {
            return None;
        }
        let collapsed = if self.collapsed_ids.remove(person_id) {
            false
        } else {
            self.collapsed_ids.insert(person_id.to_string());
            true
        };
        debug!(tree = %self.id, person = %person_id, collapsed, "toggled collapse");
        Some(collapsed)
    }

    pub fn prune_collapsed(&mut self) -> Vec<String> {
        let stale: Vec<String> = self
            .collapsed_ids
            .iter()
            .filter(|id| resolve::household_children(&self.people, id).is_empty())
            .cloned()
            .collect();
        for id in &stale {
            self.collapsed_ids.remove(id);
        }
        if !stale.is_empty() {
            warn!(tree = %self.id, ids = ?stale, "pruned stale collapse flags");
        }
        stale
    }
}
