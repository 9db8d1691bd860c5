use std::io;
use std::path::Path;

use rusqlite::{Connection, OptionalExtension, params};
use tracing::debug;

use crate::error::PersistError;
use crate::model::{Tree, TreeSummary};
use crate::persist::{PersistenceAdapter, content_hash};

const SCHEMA_VERSION: i64 = 1;

pub struct SqliteStore {
    conn: Connection,
    owner_id: String,
}

impl SqliteStore {
    pub fn open(path: &Path, owner_id: impl Into<String>) -> Result<Self, PersistError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        let store = Self {
            conn,
            owner_id: owner_id.into(),
        };
        store.init_schema()?;
        Ok(store)
    }

    pub fn open_in_memory(owner_id: impl Into<String>) -> Result<Self, PersistError> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn,
            owner_id: owner_id.into(),
        };
        store.init_schema()?;
        Ok(store)
    }

    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    fn init_schema(&self) -> Result<(), PersistError> {
        self.conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = FULL;
            ",
        )?;

        let version: i64 = self.conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
        match version {
            0 => {
                self.create_schema_v1()?;
                self.conn.execute_batch("PRAGMA user_version = 1;")?;
            }
            SCHEMA_VERSION => self.create_schema_v1()?,
            other => return Err(PersistError::UnsupportedVersion(other.max(0) as u64)),
        }
        Ok(())
    }

    fn create_schema_v1(&self) -> rusqlite::Result<()> {
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS trees (
                id TEXT PRIMARY KEY,
                owner_id TEXT NOT NULL,
                title TEXT NOT NULL,
                tagline TEXT NOT NULL DEFAULT '',
                people_count INTEGER NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                content_hash TEXT NOT NULL,
                payload BLOB NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_trees_owner ON trees(owner_id);
            ",
        )
    }

    pub fn stored_hash(&self, tree_id: &str) -> Result<Option<String>, PersistError> {
        let hash = self
            .conn
            .query_row(
                "SELECT content_hash FROM trees WHERE id = ?1",
                params![tree_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(hash)
    }
}

impl PersistenceAdapter for SqliteStore {
    fn load_snapshot(&self, tree_id: &str) -> Result<Option<Tree>, PersistError> {
        let payload: Option<Vec<u8>> = self
            .conn
            .query_row(
                "SELECT payload FROM trees WHERE id = ?1",
                params![tree_id],
                |row| row.get(0),
            )
            .optional()?;
        let Some(payload) = payload else {
            return Ok(None);
        };
        let json = decompress(&payload)?;
        Ok(Some(serde_json::from_slice(&json)?))
    }

    fn save_snapshot(&self, tree: &Tree) -> Result<(), PersistError> {
        let json = serde_json::to_vec(tree)?;
        let payload = zstd::stream::encode_all(json.as_slice(), 0)?;
        self.conn.execute(
            "INSERT INTO trees
                (id, owner_id, title, tagline, people_count, created_at, updated_at, content_hash, payload)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
             ON CONFLICT(id) DO UPDATE SET
                owner_id = excluded.owner_id,
                title = excluded.title,
                tagline = excluded.tagline,
                people_count = excluded.people_count,
                created_at = excluded.created_at,
                updated_at = excluded.updated_at,
                content_hash = excluded.content_hash,
                payload = excluded.payload",
            params![
                tree.id,
                self.owner_id,
                tree.title,
                tree.tagline,
                tree.people.len() as i64,
                tree.created_at,
                tree.updated_at,
                content_hash(tree),
                payload,
            ],
        )?;
        debug!(tree = %tree.id, bytes = payload.len(), "stored remote snapshot");
        Ok(())
    }

    fn delete_snapshot(&self, tree_id: &str) -> Result<bool, PersistError> {
        let removed = self
            .conn
            .execute("DELETE FROM trees WHERE id = ?1", params![tree_id])?;
        Ok(removed > 0)
    }

    fn list_snapshots(&self, owner_id: &str) -> Result<Vec<TreeSummary>, PersistError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, title, tagline, people_count, created_at, updated_at
             FROM trees
             WHERE owner_id = ?1
             ORDER BY created_at ASC, id ASC",
        )?;

        let mut rows = stmt.query(params![owner_id])?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            out.push(TreeSummary {
                id: row.get(0)?,
                title: row.get(1)?,
                tagline: row.get(2)?,
                people_count: row.get::<_, i64>(3)?.max(0) as usize,
                created_at: row.get(4)?,
                updated_at: row.get(5)?,
            });
        }
        Ok(out)
    }
}

fn decompress(payload: &[u8]) -> Result<Vec<u8>, PersistError> {
    zstd::stream::decode_all(payload).map_err(|err| match err.kind() {
        io::ErrorKind::Other | io::ErrorKind::InvalidData => {
            PersistError::Corrupt(format!("payload does not decompress: {err}"))
        }
        _ => PersistError::Io(err),
    })
}
