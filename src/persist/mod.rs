pub mod local;
pub mod remote;
pub mod sqlite;

use std::collections::BTreeSet;
use std::fmt::Write as _;

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::error::PersistError;
use crate::model::{Tree, TreeSummary, Workspace};
use crate::store::EntityStore;

pub use local::LocalStore;
pub use remote::RemoteSync;
pub use sqlite::SqliteStore;

pub trait PersistenceAdapter {
    fn load_snapshot(&self, tree_id: &str) -> Result<Option<Tree>, PersistError>;

    fn save_snapshot(&self, tree: &Tree) -> Result<(), PersistError>;

    fn delete_snapshot(&self, tree_id: &str) -> Result<bool, PersistError>;

    fn list_snapshots(&self, owner_id: &str) -> Result<Vec<TreeSummary>, PersistError>;
}

pub enum Persistence {
    LocalOnly(LocalStore),
    LocalPlusRemote { local: LocalStore, remote: RemoteSync },
}

impl Persistence {
    pub fn local(&self) -> &LocalStore {
        match self {
            Self::LocalOnly(local) | Self::LocalPlusRemote { local, .. } => local,
        }
    }

    pub fn remote(&self) -> Option<&RemoteSync> {
        match self {
            Self::LocalOnly(_) => None,
            Self::LocalPlusRemote { remote, .. } => Some(remote),
        }
    }

    pub fn remote_mut(&mut self) -> Option<&mut RemoteSync> {
        match self {
            Self::LocalOnly(_) => None,
            Self::LocalPlusRemote { remote, .. } => Some(remote),
        }
    }

    pub fn save(&mut self, workspace: &Workspace) -> Result<(), PersistError> {
        self.local().save_workspace(workspace)?;
        if let Some(remote) = self.remote_mut() {
            remote.submit(workspace.active());
        }
        Ok(())
    }

    pub fn forget_remote(&mut self, tree_id: &str) {
        if let Some(remote) = self.remote_mut() {
            remote.delete(tree_id);
        }
    }

    pub fn flush(&self) {
        if let Some(remote) = self.remote() {
            remote.flush();
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ContentView<'a> {
    id: &'a str,
    title: &'a str,
    tagline: &'a str,
    root_person_ids: &'a [String],
    collapsed_ids: &'a BTreeSet<String>,
    people: &'a EntityStore,
}

pub fn content_hash(tree: &Tree) -> String {
    let view = ContentView {
        id: &tree.id,
        title: &tree.title,
        tagline: &tree.tagline,
        root_person_ids: &tree.root_person_ids,
        collapsed_ids: &tree.collapsed_ids,
        people: &tree.people,
    };
    let bytes = serde_json::to_vec(&view).unwrap_or_default();
    let digest = Sha256::digest(&bytes);
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        let _ = write!(&mut out, "{byte:02x}");
    }
    out
}
