use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::error::PersistError;
use crate::model::tree::{DEFAULT_TREE_TITLE, generate_tree_id, now_iso8601};
use crate::model::{Tree, TreeSummary, Workspace};
use crate::persist::PersistenceAdapter;
use crate::store::EntityStore;
use crate::store::atomic::atomic_write_json;

pub const SNAPSHOT_VERSION: u64 = 2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotFile {
    pub version: u64,
    #[serde(default)]
    pub active_tree_id: Option<String>,
    #[serde(default)]
    pub trees: IndexMap<String, Tree>,
}

impl Default for SnapshotFile {
    fn default() -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            active_tree_id: None,
            trees: IndexMap::new(),
        }
    }
}

impl SnapshotFile {
    pub fn from_workspace(workspace: &Workspace) -> Self {
        let trees = workspace
            .trees()
            .into_iter()
            .map(|tree| (tree.id.clone(), tree.clone()))
            .collect();
        Self {
            version: SNAPSHOT_VERSION,
            active_tree_id: Some(workspace.active_id().to_string()),
            trees,
        }
    }

    pub fn into_workspace(self, default_title: &str) -> Workspace {
        Workspace::from_trees(self.trees, self.active_tree_id.as_deref(), default_title)
    }

    pub fn parse(bytes: &[u8]) -> Result<Self, PersistError> {
        let value: Value = serde_json::from_slice(bytes)?;
        let version = match value.get("version") {
            None | Some(Value::Null) => 1,
            Some(raw) => raw
                .as_u64()
                .ok_or_else(|| PersistError::Corrupt(format!("version is {raw}")))?,
        };
        let mut file = match version {
            1 => migrate_v1(value)?,
            SNAPSHOT_VERSION => serde_json::from_value::<SnapshotFile>(value)?,
            other => return Err(PersistError::UnsupportedVersion(other)),
        };
        for (key, tree) in file.trees.iter_mut() {
            if tree.id.is_empty() {
                tree.id = key.clone();
            }
            repair_roots(tree);
        }
        Ok(file)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyTree {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    tagline: String,
    #[serde(default)]
    root_person_ids: Vec<String>,
    #[serde(default)]
    collapsed_ids: std::collections::BTreeSet<String>,
    #[serde(default)]
    people: EntityStore,
    #[serde(default)]
    saved_at: Option<String>,
}

fn migrate_v1(value: Value) -> Result<SnapshotFile, PersistError> {
    let legacy: LegacyTree = serde_json::from_value(value)?;
    let title = legacy
        .title
        .filter(|title| !title.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_TREE_TITLE.to_string());
    // Same legacy file, same id, whether or not the migration was saved.
    let saved = legacy
        .saved_at
        .as_deref()
        .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
        .map(|at| at.with_timezone(&Utc))
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
    let id = generate_tree_id(&title, saved);
    let stamp = legacy.saved_at.unwrap_or_else(now_iso8601);

    let tree = Tree {
        id: id.clone(),
        title,
        tagline: legacy.tagline,
        root_person_ids: legacy.root_person_ids,
        collapsed_ids: legacy.collapsed_ids,
        people: legacy.people,
        created_at: stamp.clone(),
        updated_at: stamp,
    };
    info!(tree = %id, people = tree.people.len(), "migrated version 1 snapshot");

    let mut trees = IndexMap::new();
    trees.insert(id.clone(), tree);
    Ok(SnapshotFile {
        version: SNAPSHOT_VERSION,
        active_tree_id: Some(id),
        trees,
    })
}

fn repair_roots(tree: &mut Tree) {
    if tree.root_person_ids.is_empty() && !tree.people.is_empty() {
        tree.root_person_ids = Tree::derive_root_ids(&tree.people);
        info!(tree = %tree.id, roots = tree.root_person_ids.len(), "derived missing root ids");
    }
}

#[derive(Debug, Clone)]
pub struct LocalStore {
    path: PathBuf,
}

impl LocalStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn read(&self) -> Result<Option<SnapshotFile>, PersistError> {
        match fs::read(&self.path) {
            Ok(bytes) => SnapshotFile::parse(&bytes).map(Some),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    pub fn write(&self, file: &SnapshotFile) -> Result<(), PersistError> {
        atomic_write_json(&self.path, file)
    }

    pub fn load_workspace(&self, default_title: &str) -> Result<Workspace, PersistError> {
        let workspace = match self.read()? {
            Some(file) => file.into_workspace(default_title),
            None => Workspace::new(Tree::with_generated_id(default_title)),
        };
        info!(
            path = %self.path.display(),
            trees = workspace.len(),
            active = %workspace.active_id(),
            "loaded workspace"
        );
        Ok(workspace)
    }

    pub fn save_workspace(&self, workspace: &Workspace) -> Result<(), PersistError> {
        self.write(&SnapshotFile::from_workspace(workspace))?;
        info!(path = %self.path.display(), trees = workspace.len(), "saved workspace");
        Ok(())
    }
}

impl PersistenceAdapter for LocalStore {
    fn load_snapshot(&self, tree_id: &str) -> Result<Option<Tree>, PersistError> {
        Ok(self
            .read()?
            .and_then(|mut file| file.trees.shift_remove(tree_id)))
    }

    fn save_snapshot(&self, tree: &Tree) -> Result<(), PersistError> {
        let mut file = self.read()?.unwrap_or_default();
        file.trees.insert(tree.id.clone(), tree.clone());
        if file.active_tree_id.is_none() {
            file.active_tree_id = Some(tree.id.clone());
        }
        self.write(&file)
    }

    fn delete_snapshot(&self, tree_id: &str) -> Result<bool, PersistError> {
        let Some(mut file) = self.read()? else {
            return Ok(false);
        };
        if file.trees.shift_remove(tree_id).is_none() {
            return Ok(false);
        }
        if file.active_tree_id.as_deref() == Some(tree_id) {
            file.active_tree_id = file.trees.keys().next().cloned();
        }
        self.write(&file)?;
        Ok(true)
    }

    fn list_snapshots(&self, _owner_id: &str) -> Result<Vec<TreeSummary>, PersistError> {
        Ok(self
            .read()?
            .map(|file| file.trees.values().map(Tree::summary).collect())
            .unwrap_or_default())
    }
}
