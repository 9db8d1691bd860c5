use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::model::tree::DEFAULT_TREE_TITLE;

pub const SNAPSHOT_FILE: &str = "trees.json";
pub const PROJECT_CONFIG_FILE: &str = ".kinship.project.yml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteConfig {
    pub path: String,
    pub owner: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectiveConfig {
    pub snapshot: Option<String>,
    pub remote: Option<RemoteConfig>,
    pub default_title: String,
}

impl Default for EffectiveConfig {
    fn default() -> Self {
        Self {
            snapshot: None,
            remote: None,
            default_title: DEFAULT_TREE_TITLE.to_string(),
        }
    }
}

impl EffectiveConfig {
    pub fn snapshot_path(&self, state_dir: &Path, home: &Path) -> PathBuf {
        match &self.snapshot {
            Some(path) => expand_tilde(path, home),
            None => state_dir.join(SNAPSHOT_FILE),
        }
    }

    pub fn remote_path(&self, home: &Path) -> Option<(PathBuf, &str)> {
        self.remote
            .as_ref()
            .map(|remote| (expand_tilde(&remote.path, home), remote.owner.as_str()))
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    #[serde(default)]
    snapshot: Option<String>,
    #[serde(default)]
    remote: Option<RawRemote>,
    #[serde(default)]
    default_title: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawRemote {
    #[serde(default)]
    path: Option<String>,
    #[serde(default)]
    owner: Option<String>,
}

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Yaml(serde_yaml::Error),
    InvalidRemote(String),
    InvalidTitle,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "{err}"),
            Self::Yaml(err) => write!(f, "{err}"),
            Self::InvalidRemote(reason) => write!(f, "invalid remote config: {reason}"),
            Self::InvalidTitle => write!(f, "default_title must not be empty"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(value: serde_yaml::Error) -> Self {
        Self::Yaml(value)
    }
}

#[derive(Debug, Default)]
struct MergedRemote {
    path: Option<String>,
    owner: Option<String>,
}

pub fn load_effective_config(
    cwd: &Path,
    repo_config: Option<&Path>,
    user_config: Option<&Path>,
) -> Result<EffectiveConfig, ConfigError> {
    let mut layers = Vec::new();
    if let Some(path) = user_config.filter(|path| path.exists()) {
        layers.push(load_raw(path)?);
    }
    if let Some(path) = find_nearest_project_config(cwd) {
        layers.push(load_raw(&path)?);
    }
    if let Some(path) = repo_config.filter(|path| path.exists()) {
        layers.push(load_raw(path)?);
    }
    merge_layers(layers)
}

pub fn find_nearest_project_config(start: &Path) -> Option<PathBuf> {
    for dir in start.ancestors() {
        let candidate = dir.join(PROJECT_CONFIG_FILE);
        if candidate.is_file() {
            return Some(candidate);
        }
    }
    None
}

fn merge_layers(layers: Vec<RawConfig>) -> Result<EffectiveConfig, ConfigError> {
    let mut merged = EffectiveConfig::default();
    let mut remote: Option<MergedRemote> = None;
    for layer in layers {
        if let Some(snapshot) = layer.snapshot {
            merged.snapshot = Some(snapshot);
        }
        if let Some(title) = layer.default_title {
            if title.trim().is_empty() {
                return Err(ConfigError::InvalidTitle);
            }
            merged.default_title = title.trim().to_string();
        }
        if let Some(raw) = layer.remote {
            let slot = remote.get_or_insert_with(MergedRemote::default);
            if raw.path.is_some() {
                slot.path = raw.path;
            }
            if raw.owner.is_some() {
                slot.owner = raw.owner;
            }
        }
    }
    merged.remote = remote.map(finish_remote).transpose()?;
    Ok(merged)
}

fn finish_remote(remote: MergedRemote) -> Result<RemoteConfig, ConfigError> {
    let path = remote
        .path
        .filter(|path| !path.trim().is_empty())
        .ok_or_else(|| ConfigError::InvalidRemote("remote.path is required".to_string()))?;
    let owner = remote
        .owner
        .filter(|owner| !owner.trim().is_empty())
        .ok_or_else(|| ConfigError::InvalidRemote("remote.owner is required".to_string()))?;
    Ok(RemoteConfig {
        path,
        owner: owner.trim().to_string(),
    })
}

fn load_raw(path: &Path) -> Result<RawConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_raw(&content)
}

fn parse_raw(content: &str) -> Result<RawConfig, ConfigError> {
    if content.trim().is_empty() {
        return Ok(RawConfig::default());
    }
    Ok(serde_yaml::from_str(content)?)
}

pub fn load_config_file(path: &Path) -> Result<EffectiveConfig, ConfigError> {
    merge_layers(vec![load_raw(path)?])
}

pub fn default_repo_config_yaml() -> String {
    format!(
        r#"# snapshot: ./.kinship/trees.json
# remote:
#   path: ./.kinship/remote.sqlite
#   owner: me
default_title: {DEFAULT_TREE_TITLE}
"#
    )
}

pub fn default_global_config_yaml() -> String {
    format!(
        r#"# snapshot: ~/.kinship/trees.json
# remote:
#   path: ~/.kinship/remote.sqlite
#   owner: me
default_title: {DEFAULT_TREE_TITLE}
"#
    )
}

pub fn expand_tilde(path: &str, home: &Path) -> PathBuf {
    if path == "~" {
        return home.to_path_buf();
    }
    if let Some(rest) = path.strip_prefix("~/") {
        return home.join(rest);
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::{
        ConfigError, EffectiveConfig, RemoteConfig, default_global_config_yaml,
        default_repo_config_yaml, expand_tilde, load_config_file, load_effective_config,
    };
    use std::path::Path;

    #[test]
    fn parses_snapshot_remote_and_title() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.yml");
        std::fs::write(
            &path,
            r#"snapshot: ~/trees/family.json
remote:
  path: ~/.kinship/remote.sqlite
  owner: alice
default_title: The Johnsons
"#,
        )
        .expect("write config");

        let parsed = load_config_file(&path).expect("parse config");
        assert_eq!(parsed.snapshot.as_deref(), Some("~/trees/family.json"));
        assert_eq!(
            parsed.remote,
            Some(RemoteConfig {
                path: "~/.kinship/remote.sqlite".to_string(),
                owner: "alice".to_string(),
            })
        );
        assert_eq!(parsed.default_title, "The Johnsons");
        let home = Path::new("/home/tester");
        assert_eq!(
            parsed.snapshot_path(Path::new("/work/.kinship"), home),
            Path::new("/home/tester/trees/family.json")
        );
    }

    #[test]
    fn defaults_and_generated_files_parse() {
        let dir = tempfile::tempdir().expect("tempdir");
        for (name, body) in [
            ("repo.yml", default_repo_config_yaml()),
            ("global.yml", default_global_config_yaml()),
            ("empty.yml", String::new()),
        ] {
            let path = dir.path().join(name);
            std::fs::write(&path, body).expect("write");
            let parsed = load_config_file(&path).expect("parse");
            assert_eq!(parsed.remote, None);
            assert_eq!(parsed.default_title, EffectiveConfig::default().default_title);
        }
        let parsed = EffectiveConfig::default();
        assert_eq!(
            parsed.snapshot_path(Path::new("/work/.kinship"), Path::new("/home")),
            Path::new("/work/.kinship/trees.json")
        );
    }

    #[test]
    fn expands_tilde_paths() {
        let expanded = expand_tilde("~/trees.json", Path::new("/home/tester"));
        assert_eq!(expanded, Path::new("/home/tester/trees.json"));
        assert_eq!(expand_tilde("~", Path::new("/h")), Path::new("/h"));
        assert_eq!(expand_tilde("/abs", Path::new("/h")), Path::new("/abs"));
    }

    #[test]
    fn remote_needs_path_and_owner() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.yml");
        std::fs::write(&path, "remote:\n  path: /tmp/remote.sqlite\n").expect("write");
        let err = load_config_file(&path).expect_err("owner missing");
        assert!(matches!(err, ConfigError::InvalidRemote(_)));
        assert!(err.to_string().contains("remote.owner"));
    }

    #[test]
    fn merges_user_project_and_repo_layers() {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path();
        let repo = root.join("workspace/repo");
        std::fs::create_dir_all(repo.join(".kinship")).expect("repo config dir");
        std::fs::create_dir_all(root.join("home/.kinship")).expect("home config dir");

        let user_cfg = root.join("home/.kinship/config.yml");
        std::fs::write(
            &user_cfg,
            r#"snapshot: /user/trees.json
remote:
  path: /user/remote.sqlite
  owner: alice
default_title: User Title
"#,
        )
        .expect("write user config");

        std::fs::write(
            root.join(".kinship.project.yml"),
            "default_title: Far Project\n",
        )
        .expect("write root project config");
        std::fs::write(
            root.join("workspace/.kinship.project.yml"),
            r#"remote:
  owner: family-shared
default_title: Near Project
"#,
        )
        .expect("write nearest project config");

        let repo_cfg = repo.join(".kinship/config.yml");
        std::fs::write(&repo_cfg, "snapshot: ./local.json\n").expect("write repo config");

        let merged =
            load_effective_config(&repo, Some(&repo_cfg), Some(&user_cfg)).expect("merge config");
        assert_eq!(merged.snapshot.as_deref(), Some("./local.json"));
        assert_eq!(merged.default_title, "Near Project");
        assert_eq!(
            merged.remote,
            Some(RemoteConfig {
                path: "/user/remote.sqlite".to_string(),
                owner: "family-shared".to_string(),
            })
        );
    }
}
