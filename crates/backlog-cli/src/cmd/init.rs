use anyhow::{Context as _, Result};
use backlog_core::config::{self, BACKLOG_DIR};
use backlog_core::db;
use clap::Args;
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::output::{OutputMode, pretty_kv, render};

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Rewrite config.toml even if `.backlog/` already exists.
    #[arg(long)]
    pub force: bool,
}

const CONFIG_TOML: &str = "[storage]\n\
    database = \"backlog.db\"\n\
    \n\
    [locks]\n\
    enabled = true\n\
    timeout_ms = 5000\n\
    dir = \"locks\"\n";

const GITIGNORE: &str = "backlog.db\nbacklog.db-*\nlocks/\n";

#[derive(Debug, Serialize)]
struct InitReport {
    directory: PathBuf,
    database: PathBuf,
    schema_version: u32,
}

/// Execute `bl init`:
///
/// ```text
/// .backlog/
///   config.toml   (storage and lock settings)
///   .gitignore    (database and lock files)
///   backlog.db    (migrated SQLite database)
/// ```
///
/// # Errors
///
/// Fails if `.backlog/` exists without `--force`, or if the directory,
/// config or database cannot be created.
pub fn run_init(args: &InitArgs, output: OutputMode, project_root: &Path) -> Result<()> {
    let dir = project_root.join(BACKLOG_DIR);
    if dir.exists() && !args.force {
        anyhow::bail!("{BACKLOG_DIR}/ already exists. Use `bl init --force` to reinitialize.");
    }

    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create {}", dir.display()))?;
    std::fs::write(dir.join("config.toml"), CONFIG_TOML)
        .with_context(|| format!("Failed to write {}/config.toml", dir.display()))?;
    std::fs::write(dir.join(".gitignore"), GITIGNORE)
        .with_context(|| format!("Failed to write {}/.gitignore", dir.display()))?;

    let config = config::load_project_config(project_root)?;
    let database = config.database_path(project_root);
    let conn = db::open_database(&database)?;
    let schema_version = db::migrations::current_schema_version(&conn)?;
    tracing::info!(db = %database.display(), schema_version, "initialized backlog project");

    let report = InitReport {
        directory: dir,
        database,
        schema_version,
    };
    render(output, &report, |r, w| {
        pretty_kv(w, "directory", r.directory.display().to_string())?;
        pretty_kv(w, "database", r.database.display().to_string())?;
        pretty_kv(w, "schema", r.schema_version.to_string())
    })
}
