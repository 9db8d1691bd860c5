use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::layout::sorted_roots;
use crate::model::Tree;
use crate::resolve;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum PanelTarget {
    ChildrenOf(String),
    SiblingsOf(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PanelRow {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
}

impl PanelRow {
    pub fn existing(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            name: name.into(),
        }
    }

    pub fn new_person(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
        }
    }

    fn is_blank(&self) -> bool {
        self.name.trim().is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PanelReport {
    pub updated: Vec<String>,
    pub created: Vec<String>,
    pub deleted: Vec<String>,
}

struct PanelScope {
    parent_ids: Vec<String>,
    members: Vec<String>,
    root_level: bool,
}

impl Tree {
    pub fn reconcile_panel(
        &mut self,
        target: &PanelTarget,
        rows: &[PanelRow],
    ) -> Option<PanelReport> {
        let scope = self.panel_scope(target)?;
        let mut seen = HashSet::new();
        for id in rows.iter().filter_map(|row| row.id.as_deref()) {
            if !seen.insert(id) || !scope.members.iter().any(|member| member == id) {
                return None;
            }
        }

        let mut report = PanelReport::default();
        for row in rows.iter().filter(|row| row.is_blank()) {
            if let Some(id) = &row.id {
                report.deleted.extend(self.delete_branch(id));
            }
        }

        let mut position: i64 = 0;
        let mut ordered = Vec::new();
        for row in rows.iter().filter(|row| !row.is_blank()) {
            match &row.id {
                Some(id) => {
                    let Some(person) = self.people.get_mut(id) else {
                        continue;
                    };
                    position += 1;
                    person.name = row.name.trim().to_string();
                    person.birth_order = Some(position);
                    report.updated.push(id.clone());
                    ordered.push(id.clone());
                }
                None => {
                    let parents: Vec<String> = scope
                        .parent_ids
                        .iter()
                        .filter(|id| self.people.contains(id))
                        .cloned()
                        .collect();
                    if !scope.parent_ids.is_empty() && parents.is_empty() {
                        continue;
                    }
                    position += 1;
                    if let Some(id) = self.add_person(&row.name, &parents, None, Some(position)) {
                        report.created.push(id.clone());
                        ordered.push(id);
                    }
                }
            }
        }

        if scope.root_level {
            let rest: Vec<String> = self
                .root_person_ids
                .iter()
                .filter(|root| !ordered.contains(*root))
                .cloned()
                .collect();
            let mut roots = ordered;
            roots.extend(rest);
            roots.retain(|id| self.people.contains(id));
            self.root_person_ids = roots;
        }
        debug!(
            tree = %self.id,
            updated = report.updated.len(),
            created = report.created.len(),
            deleted = report.deleted.len(),
            "reconciled panel"
        );
        Some(report)
    }

    fn panel_scope(&self, target: &PanelTarget) -> Option<PanelScope> {
        match target {
            PanelTarget::ChildrenOf(parent_id) => {
                let parent = self.people.get(parent_id)?;
                let mut parent_ids = vec![parent.id.clone()];
                if let Some(spouse) = resolve::spouse_of(&self.people, parent_id) {
                    parent_ids.push(spouse.id.clone());
                }
                let members = resolve::children_of(&self.people, parent_id)
                    .into_iter()
                    .map(|child| child.id.clone())
                    .collect();
                Some(PanelScope {
                    parent_ids,
                    members,
                    root_level: false,
                })
            }
            PanelTarget::SiblingsOf(person_id) => {
                let person = self.people.get(person_id)?;
                if person.is_parentless() {
                    if !self.is_root(person_id) {
                        return None;
                    }
                    let members = sorted_roots(self)
                        .into_iter()
                        .map(|root| root.id.clone())
                        .collect();
                    return Some(PanelScope {
                        parent_ids: Vec::new(),
                        members,
                        root_level: true,
                    });
                }
                let mut group = vec![person];
                group.extend(resolve::siblings_of(&self.people, person_id));
                resolve::sort_by_birth_order(&mut group);
                Some(PanelScope {
                    parent_ids: person.parent_ids.clone(),
                    members: group.into_iter().map(|p| p.id.clone()).collect(),
                    root_level: false,
                })
            }
        }
    }
}
