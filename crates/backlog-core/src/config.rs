use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::lock::LockSettings;

/// Directory holding the database, lock files and config of a project.
pub const BACKLOG_DIR: &str = ".backlog";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub locks: LockConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// SQLite file, relative to `.backlog/` unless absolute.
    #[serde(default = "default_database")]
    pub database: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database: default_database(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_lock_timeout_ms")]
    pub timeout_ms: u64,
    /// Lock directory, relative to `.backlog/` unless absolute.
    #[serde(default = "default_lock_dir")]
    pub dir: PathBuf,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            timeout_ms: default_lock_timeout_ms(),
            dir: default_lock_dir(),
        }
    }
}

impl ProjectConfig {
    /// Database path for this project. `BACKLOG_DB` overrides the config.
    #[must_use]
    pub fn database_path(&self, project_root: &Path) -> PathBuf {
        resolve_database_path(project_root, &self.storage, env::var_os("BACKLOG_DB"))
    }

    /// Lock settings, or `None` when locking is disabled.
    #[must_use]
    pub fn lock_settings(&self, project_root: &Path) -> Option<LockSettings> {
        self.locks.enabled.then(|| {
            LockSettings::new(
                project_root.join(BACKLOG_DIR).join(&self.locks.dir),
                Duration::from_millis(self.locks.timeout_ms),
            )
        })
    }
}

pub fn load_project_config(project_root: &Path) -> Result<ProjectConfig> {
    let path = project_root.join(BACKLOG_DIR).join("config.toml");
    if !path.exists() {
        return Ok(ProjectConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<ProjectConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

fn resolve_database_path(
    project_root: &Path,
    storage: &StorageConfig,
    env_override: Option<std::ffi::OsString>,
) -> PathBuf {
    if let Some(path) = env_override.filter(|p| !p.is_empty()) {
        return PathBuf::from(path);
    }
    // `join` keeps absolute paths as-is.
    project_root.join(BACKLOG_DIR).join(&storage.database)
}

const fn default_true() -> bool {
    true
}

fn default_database() -> PathBuf {
    PathBuf::from("backlog.db")
}

const fn default_lock_timeout_ms() -> u64 {
    5_000
}

fn default_lock_dir() -> PathBuf {
    PathBuf::from("locks")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_project_config_uses_defaults() {
        let root = tempfile::tempdir().expect("temp dir");
        let cfg = load_project_config(root.path()).expect("load should succeed");
        assert_eq!(cfg, ProjectConfig::default());
        assert!(cfg.locks.enabled);
        assert_eq!(cfg.locks.timeout_ms, 5_000);
        assert_eq!(cfg.storage.database, PathBuf::from("backlog.db"));
    }

    #[test]
    fn partial_config_fills_defaults() {
        let root = tempfile::tempdir().expect("temp dir");
        let dir = root.path().join(BACKLOG_DIR);
        std::fs::create_dir_all(&dir).expect("create .backlog");
        std::fs::write(
            dir.join("config.toml"),
            "[locks]\ntimeout_ms = 250\n\n[storage]\ndatabase = \"ranks.sqlite3\"\n",
        )
        .expect("write config");

        let cfg = load_project_config(root.path()).expect("parse");
        assert_eq!(cfg.locks.timeout_ms, 250);
        assert!(cfg.locks.enabled);
        assert_eq!(cfg.storage.database, PathBuf::from("ranks.sqlite3"));

        let settings = cfg.lock_settings(root.path()).expect("locks enabled");
        assert_eq!(settings.timeout, Duration::from_millis(250));
        assert_eq!(settings.dir, dir.join("locks"));
    }

    #[test]
    fn invalid_config_reports_path() {
        let root = tempfile::tempdir().expect("temp dir");
        let dir = root.path().join(BACKLOG_DIR);
        std::fs::create_dir_all(&dir).expect("create .backlog");
        std::fs::write(dir.join("config.toml"), "[locks\n").expect("write config");

        let err = load_project_config(root.path()).expect_err("must fail");
        assert!(format!("{err:#}").contains("config.toml"));
    }

    #[test]
    fn disabled_locks_yield_no_settings() {
        let cfg = ProjectConfig {
            locks: LockConfig {
                enabled: false,
                ..LockConfig::default()
            },
            ..ProjectConfig::default()
        };
        assert!(cfg.lock_settings(Path::new("/tmp/x")).is_none());
    }

    #[test]
    fn env_override_wins_over_config() {
        let storage = StorageConfig::default();
        let root = Path::new("/work/app");
        assert_eq!(
            resolve_database_path(root, &storage, None),
            PathBuf::from("/work/app/.backlog/backlog.db")
        );
        assert_eq!(
            resolve_database_path(root, &storage, Some("/tmp/other.db".into())),
            PathBuf::from("/tmp/other.db")
        );
        assert_eq!(
            resolve_database_path(root, &storage, Some("".into())),
            PathBuf::from("/work/app/.backlog/backlog.db")
        );
    }
}
