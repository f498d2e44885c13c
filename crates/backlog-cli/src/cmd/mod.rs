pub mod backlog;
pub mod delete;
pub mod history;
pub mod init;
pub mod list;
pub mod move_cmd;
pub mod rank;
pub mod story;

use anyhow::Result;
use backlog_core::config::{self, BACKLOG_DIR, ProjectConfig};
use backlog_core::db::SqliteStore;
use backlog_core::error::{ErrorCode, RankError};
use backlog_core::model::{Story, StoryId};
use backlog_core::relocate::Relocator;
use backlog_core::store::StoryStore;
use std::path::{Path, PathBuf};

use crate::output::{CliError, OutputMode, render_error};

/// An initialized project: its config and open database.
pub struct Project {
    pub root: PathBuf,
    pub config: ProjectConfig,
    pub store: SqliteStore,
}

impl Project {
    /// Open the project rooted at `root`, rendering setup failures.
    pub fn open(root: &Path, output: OutputMode) -> Result<Self> {
        if !root.join(BACKLOG_DIR).is_dir() {
            let message = format!("no {BACKLOG_DIR}/ directory in {}", root.display());
            render_error(output, &CliError::from_code(&message, ErrorCode::NotInitialized))?;
            anyhow::bail!(message);
        }

        let config = match config::load_project_config(root) {
            Ok(config) => config,
            Err(err) => {
                render_error(
                    output,
                    &CliError::from_code(format!("{err:#}"), ErrorCode::ConfigParseError),
                )?;
                return Err(err);
            }
        };

        let db_path = config.database_path(root);
        let store = match SqliteStore::open(&db_path) {
            Ok(store) => store,
            Err(err) => {
                render_error(
                    output,
                    &CliError::from_code(format!("{err:#}"), ErrorCode::StorageFailed),
                )?;
                return Err(err);
            }
        };
        tracing::debug!(db = %db_path.display(), "opened project database");

        Ok(Self {
            root: root.to_path_buf(),
            config,
            store,
        })
    }

    /// Run `op` with a relocator over this project's store, history queue
    /// and lock settings.
    pub fn with_relocator<T>(
        &self,
        op: impl FnOnce(&Relocator<'_>) -> backlog_core::error::Result<T>,
    ) -> backlog_core::error::Result<T> {
        let history = self.store.history();
        let relocator = Relocator::new(&self.store, &self.store, &history);
        let relocator = match self.config.lock_settings(&self.root) {
            Some(settings) => relocator.with_locks(settings),
            None => relocator,
        };
        op(&relocator)
    }

    /// Load a story by id; a missing id is not-found.
    pub fn story(&self, id: StoryId) -> backlog_core::error::Result<Story> {
        self.store.get(id)?.ok_or(RankError::StoryNotFound(id))
    }
}
