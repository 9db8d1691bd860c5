use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;

use crate::error::PersistError;

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);
pub(crate) const TEMP_PREFIX: &str = ".kinship.tmp.";

pub fn atomic_write(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        Some(_) => Path::new("."),
        None => {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("path `{}` has no parent directory", path.display()),
            ));
        }
    };
    fs::create_dir_all(parent)?;

    let tmp_path = temp_sibling(parent, path)?;
    let result = write_and_swap(&tmp_path, path, parent, bytes);
    if result.is_err() {
        let _ = fs::remove_file(&tmp_path);
    }
    result
}

pub fn atomic_write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), PersistError> {
    let mut bytes = serde_json::to_vec_pretty(value)?;
    bytes.push(b'\n');
    atomic_write(path, &bytes)?;
    Ok(())
}

fn write_and_swap(tmp_path: &Path, path: &Path, parent: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut tmp_file = OpenOptions::new()
        .create_new(true)
        .write(true)
        .open(tmp_path)?;
    tmp_file.write_all(bytes)?;
    tmp_file.flush()?;
    tmp_file.sync_all()?;
    drop(tmp_file);

    if let Err(err) = fs::rename(tmp_path, path) {
        if !path.exists() {
            return Err(err);
        }
        fs::remove_file(path)?;
        fs::rename(tmp_path, path)?;
    }
    sync_dir(parent)
}

#[cfg(unix)]
fn sync_dir(dir: &Path) -> io::Result<()> {
    File::open(dir)?.sync_all()
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> io::Result<()> {
    Ok(())
}

fn temp_sibling(parent: &Path, target: &Path) -> io::Result<PathBuf> {
    let file_name = target
        .file_name()
        .and_then(|value| value.to_str())
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "invalid target filename"))?;
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|err| io::Error::other(err.to_string()))?
        .as_nanos();
    let counter = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    Ok(parent.join(format!(
        "{TEMP_PREFIX}{file_name}.{nanos}.{}.{counter}",
        std::process::id()
    )))
}

#[cfg(test)]
mod tests {
    use super::{TEMP_PREFIX, atomic_write, atomic_write_json};
    use std::fs;

    #[test]
    fn creates_missing_parent_directories() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested/deeper/trees.json");

        atomic_write(&path, b"{}").expect("atomic write");
        assert_eq!(fs::read_to_string(&path).expect("read"), "{}");
    }

    #[test]
    fn replaces_previous_snapshot_without_leftovers() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("trees.json");
        fs::write(&path, "stale").expect("seed");

        atomic_write_json(&path, &serde_json::json!({ "version": 2 })).expect("first");
        atomic_write_json(&path, &serde_json::json!({ "version": 2, "n": 1 })).expect("second");

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).expect("read")).expect("json");
        assert_eq!(value["n"], 1);

        let leftovers = fs::read_dir(dir.path())
            .expect("list dir")
            .filter_map(Result::ok)
            .map(|entry| entry.file_name().to_string_lossy().to_string())
            .filter(|name| name.starts_with(TEMP_PREFIX))
            .collect::<Vec<_>>();
        assert!(leftovers.is_empty(), "temp files left behind: {leftovers:?}");
    }
}
