use indexmap::IndexMap;

use crate::model::tree::{Tree, TreeSummary};

#[derive(Debug, Clone, PartialEq)]
pub struct Workspace {
    active: Tree,
    others: IndexMap<String, Tree>,
}

impl Workspace {
    pub fn new(active: Tree) -> Self {
        Self {
            active,
            others: IndexMap::new(),
        }
    }

    pub fn from_trees(
        mut trees: IndexMap<String, Tree>,
        active_id: Option<&str>,
        default_title: &str,
    ) -> Self {
        let active = active_id
            .and_then(|id| trees.shift_remove(id))
            .or_else(|| trees.shift_remove_index(0).map(|(_, tree)| tree))
            .unwrap_or_else(|| Tree::with_generated_id(default_title));
        Self {
            active,
            others: trees,
        }
    }

    pub fn active(&self) -> &Tree {
        &self.active
    }

    pub fn active_mut(&mut self) -> &mut Tree {
        &mut self.active
    }

    pub fn active_id(&self) -> &str {
        &self.active.id
    }

    pub fn get(&self, id: &str) -> Option<&Tree> {
        if self.active.id == id {
            Some(&self.active)
        } else {
            self.others.get(id)
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn activate(&mut self, id: &str) -> bool {
        if self.active.id == id {
            return true;
        }
        let Some(next) = self.others.shift_remove(id) else {
            return false;
        };
        let previous = std::mem::replace(&mut self.active, next);
        self.others.insert(previous.id.clone(), previous);
        true
    }

    pub fn insert(&mut self, tree: Tree) {
        if tree.id == self.active.id {
            self.active = tree;
        } else {
            self.others.insert(tree.id.clone(), tree);
        }
    }

    pub fn remove(&mut self, id: &str, default_title: &str) -> Option<Tree> {
        if self.active.id != id {
            return self.others.shift_remove(id);
        }
        let next = self
            .others
            .shift_remove_index(0)
            .map(|(_, tree)| tree)
            .unwrap_or_else(|| Tree::with_generated_id(default_title));
        Some(std::mem::replace(&mut self.active, next))
    }

    pub fn trees(&self) -> Vec<&Tree> {
        let mut out: Vec<&Tree> = std::iter::once(&self.active)
            .chain(self.others.values())
            .collect();
        out.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        out
    }

    pub fn summaries(&self) -> Vec<TreeSummary> {
        self.trees().into_iter().map(Tree::summary).collect()
    }

    pub fn len(&self) -> usize {
        self.others.len() + 1
    }
}
