use std::fs;

use kinship::model::{Tree, Workspace};
use kinship::persist::local::SNAPSHOT_VERSION;
use kinship::persist::{
    LocalStore, Persistence, PersistenceAdapter, RemoteSync, SqliteStore, content_hash,
};
use kinship::session::Session;
use serde_json::Value;

fn sample_tree(id: &str) -> Tree {
    let mut tree = Tree::new(id, "The Johnsons");
    let robert = tree
        .add_person("Robert Johnson", &[], None, None)
        .expect("robert");
    tree.add_spouse(&robert, "Eleanor Johnson").expect("eleanor");
    tree.add_child(&robert, "Michael Johnson").expect("michael");
    tree
}

#[test]
fn local_snapshot_survives_reopen() {
    let temp = tempfile::tempdir().expect("tempdir");
    let store = LocalStore::new(temp.path().join("nested/trees.json"));
    let mut workspace = Workspace::new(sample_tree("first"));
    workspace.insert(sample_tree("second"));
    assert!(workspace.activate("second"));
    store.save_workspace(&workspace).expect("save");

    let raw: Value =
        serde_json::from_slice(&fs::read(store.path()).expect("read")).expect("json snapshot");
    assert_eq!(raw["version"], SNAPSHOT_VERSION);
    assert_eq!(raw["activeTreeId"], "second");

    let loaded = store.load_workspace("Family").expect("load");
    assert_eq!(loaded.active_id(), "second");
    assert_eq!(loaded.len(), 2);
    assert_eq!(loaded.get("first").map(|tree| tree.people.len()), Some(3));
}

#[test]
fn legacy_single_tree_file_is_migrated() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = temp.path().join("trees.json");
    fs::write(
        &path,
        r#"{
  "title": "Old Family",
  "savedAt": "2023-04-01T10:00:00Z",
  "people": {
    "ann1": {"id": "ann1", "name": "Ann", "parentIds": []},
    "bob1": {"id": "bob1", "name": "Bob", "parentIds": ["ann1"]}
  }
}"#,
    )
    .expect("write legacy");

    let workspace = LocalStore::new(&path).load_workspace("Family").expect("migrate");
    let tree = workspace.active();
    assert_eq!(tree.title, "Old Family");
    assert_eq!(tree.created_at, "2023-04-01T10:00:00Z");
    assert_eq!(tree.root_person_ids, vec!["ann1"]);
    assert!(tree.check_invariants().is_empty());
}

#[test]
fn sqlite_store_lists_by_owner_and_hashes_content() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = temp.path().join("remote.sqlite");
    let alice = SqliteStore::open(&path, "alice").expect("open alice");
    let tree = sample_tree("johnsons");
    alice.save_snapshot(&tree).expect("save");
    assert_eq!(
        alice.stored_hash("johnsons").expect("hash"),
        Some(content_hash(&tree))
    );
    drop(alice);

    let bob = SqliteStore::open(&path, "bob").expect("open bob");
    assert!(bob.list_snapshots("bob").expect("list").is_empty());
    let listed = bob.list_snapshots("alice").expect("list");
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].people_count, 3);
    assert_eq!(bob.load_snapshot("johnsons").expect("load"), Some(tree));
}

#[test]
fn session_pushes_and_pulls_through_remote() {
    let temp = tempfile::tempdir().expect("tempdir");
    let remote_path = temp.path().join("remote.sqlite");

    let open = |name: &str| {
        let local = LocalStore::new(temp.path().join(name).join("trees.json"));
        let store = SqliteStore::open(&remote_path, "alice").expect("open remote");
        let remote = RemoteSync::spawn(store, "alice").expect("spawn");
        Session::open(Persistence::LocalPlusRemote { local, remote }, "Family").expect("session")
    };

    let mut laptop = open("laptop");
    laptop
        .mutate(|tree| tree.add_person("Robert Johnson", &[], None, None))
        .expect("save")
        .expect("robert");
    laptop.flush();
    let tree_id = laptop.tree().id.clone();
    assert!(laptop.push_all().is_some());
    drop(laptop);

    let mut desktop = open("desktop");
    let pulled = desktop.pull().expect("pull").expect("remote configured");
    assert!(pulled.contains(&tree_id));
    assert!(desktop.switch_tree(&tree_id).expect("switch"));
    assert!(desktop.tree().people.contains("robert1"));
}

#[test]
fn legacy_tree_keeps_its_id_between_sessions() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = temp.path().join("trees.json");
    fs::write(
        &path,
        r#"{"title": "Old Family", "savedAt": "2023-04-01T10:00:00Z", "people": {}}"#,
    )
    .expect("write legacy");

    let open = || Session::open(Persistence::LocalOnly(LocalStore::new(&path)), "Family");
    let first_id = open().expect("first session").tree().id.clone();
    let mut second = open().expect("second session");
    assert_eq!(second.tree().id, first_id);
    assert!(second.switch_tree(&first_id).expect("switch"));
}
