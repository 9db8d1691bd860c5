use std::collections::{BTreeSet, HashSet};
use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::resolve;
use crate::store::EntityStore;

pub const DEFAULT_TREE_TITLE: &str = "My Family Tree";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tree {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub tagline: String,
    #[serde(default)]
    pub root_person_ids: Vec<String>,
    #[serde(default)]
    pub collapsed_ids: BTreeSet<String>,
    #[serde(default)]
    pub people: EntityStore,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeSummary {
    pub id: String,
    pub title: String,
    pub tagline: String,
    pub people_count: usize,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InvariantViolation {
    DanglingParent { person: String, parent: String },
    TooManyParents { person: String },
    DanglingSpouse { person: String, spouse: String },
    AsymmetricSpouse { person: String, spouse: String },
    DanglingRoot { person: String },
    RootWithParents { person: String },
    UnreachableParentless { person: String },
    AncestryCycle { person: String },
    StaleCollapsed { person: String },
}

impl Tree {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        let now = now_iso8601();
        Self {
            id: id.into(),
            title: title.into(),
            tagline: String::new(),
            root_person_ids: Vec::new(),
            collapsed_ids: BTreeSet::new(),
            people: EntityStore::new(),
            created_at: now.clone(),
            updated_at: now,
        }
    }

    pub fn with_generated_id(title: impl Into<String>) -> Self {
        let title = title.into();
        let id = generate_tree_id(&title, Utc::now());
        Self::new(id, title)
    }

    pub fn touch(&mut self) {
        self.updated_at = now_iso8601();
    }

    pub fn is_root(&self, id: &str) -> bool {
        self.root_person_ids.iter().any(|root| root == id)
    }

    pub fn summary(&self) -> TreeSummary {
        TreeSummary {
            id: self.id.clone(),
            title: self.title.clone(),
            tagline: self.tagline.clone(),
            people_count: self.people.len(),
            created_at: self.created_at.clone(),
            updated_at: self.updated_at.clone(),
        }
    }

    pub fn same_content(&self, other: &Tree) -> bool {
        self.id == other.id
            && self.title == other.title
            && self.tagline == other.tagline
            && self.root_person_ids == other.root_person_ids
            && self.collapsed_ids == other.collapsed_ids
            && self.people == other.people
            && self.people.ids().eq(other.people.ids())
    }

    pub fn derive_root_ids(people: &EntityStore) -> Vec<String> {
        let mut roots: Vec<String> = Vec::new();
        for person in people.iter().filter(|person| person.is_parentless()) {
            let married_in = person
                .spouse_id
                .as_deref()
                .and_then(|spouse_id| people.get(spouse_id))
                .is_some_and(|spouse| {
                    !spouse.is_parentless() || roots.iter().any(|root| *root == spouse.id)
                });
            if !married_in {
                roots.push(person.id.clone());
            }
        }
        roots
    }

    pub fn check_invariants(&self) -> Vec<InvariantViolation> {
        let mut out = Vec::new();
        let roots: HashSet<&str> = self.root_person_ids.iter().map(String::as_str).collect();

        for person in self.people.iter() {
            if person.parent_ids.len() > 2 {
                out.push(InvariantViolation::TooManyParents {
                    person: person.id.clone(),
                });
            }
            for parent in &person.parent_ids {
                if !self.people.contains(parent) {
                    out.push(InvariantViolation::DanglingParent {
                        person: person.id.clone(),
                        parent: parent.clone(),
                    });
                }
            }
            if let Some(spouse_id) = &person.spouse_id {
                match self.people.get(spouse_id) {
                    None => out.push(InvariantViolation::DanglingSpouse {
                        person: person.id.clone(),
                        spouse: spouse_id.clone(),
                    }),
                    Some(spouse) if spouse.spouse_id.as_deref() != Some(person.id.as_str()) => {
                        out.push(InvariantViolation::AsymmetricSpouse {
                            person: person.id.clone(),
                            spouse: spouse_id.clone(),
                        })
                    }
                    Some(_) => {}
                }
            }
            let is_root = roots.contains(person.id.as_str());
            if is_root && !person.is_parentless() {
                out.push(InvariantViolation::RootWithParents {
                    person: person.id.clone(),
                });
            }
            if !is_root && person.is_parentless() && person.spouse_id.is_none() {
                out.push(InvariantViolation::UnreachableParentless {
                    person: person.id.clone(),
                });
            }
            if resolve::is_ancestor(&self.people, &person.id, &person.id) {
                out.push(InvariantViolation::AncestryCycle {
                    person: person.id.clone(),
                });
            }
        }

        for root in &self.root_person_ids {
            if !self.people.contains(root) {
                out.push(InvariantViolation::DanglingRoot {
                    person: root.clone(),
                });
            }
        }

        for id in &self.collapsed_ids {
            if resolve::household_children(&self.people, id).is_empty() {
                out.push(InvariantViolation::StaleCollapsed { person: id.clone() });
            }
        }
        out
    }
}

pub fn now_iso8601() -> String {
    Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
}

pub fn generate_tree_id(title: &str, now: DateTime<Utc>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(title.as_bytes());
    hasher.update(b"\0");
    hasher.update(now.timestamp_nanos_opt().unwrap_or_default().to_le_bytes());
    let digest = hasher.finalize();
    let mut out = String::from("tree-");
    for byte in digest.iter().take(6) {
        let _ = write!(&mut out, "{byte:02x}");
    }
    out
}
