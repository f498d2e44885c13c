//! SQLite persistence for backlogs, stories and queued history work.
//!
//! Runtime pragmas:
//! - `journal_mode = WAL` so readers do not block the rank writer
//! - `busy_timeout = 5s` to ride out short write contention
//! - `foreign_keys = ON` so stories cannot reference missing backlogs

pub mod history;
pub mod migrations;
pub mod schema;
pub mod store;

pub use history::{HistoryQueue, QueuedUpdate};
pub use store::SqliteStore;

use anyhow::{Context, Result};
use rusqlite::Connection;
use std::{path::Path, time::Duration};

/// How long a writer waits on a locked database before giving up.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Pragmas applied to every connection, in order.
const CONNECTION_PRAGMAS: &[(&str, &str)] = &[("foreign_keys", "ON"), ("synchronous", "NORMAL")];

/// Open the backlog database at `path`, creating its directory and file on
/// first use, then bring the schema up to [`migrations::LATEST_SCHEMA_VERSION`].
///
/// # Errors
///
/// Fails when the file cannot be opened, a pragma is rejected, or a
/// migration does not apply.
pub fn open_database(path: &Path) -> Result<Connection> {
    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("create database directory {}", dir.display()))?;
    }

    let mut conn = Connection::open(path)
        .with_context(|| format!("open backlog database {}", path.display()))?;
    apply_pragmas(&conn).context("configure backlog database")?;
    migrations::migrate(&mut conn).context("migrate backlog schema")?;

    tracing::debug!(path = %path.display(), "backlog database ready");
    Ok(conn)
}

fn apply_pragmas(conn: &Connection) -> rusqlite::Result<()> {
    for (name, value) in CONNECTION_PRAGMAS {
        conn.pragma_update(None, name, value)?;
    }
    // journal_mode answers with the mode actually in effect.
    conn.pragma_update_and_check(None, "journal_mode", "WAL", |_| Ok(()))?;
    conn.busy_timeout(DEFAULT_BUSY_TIMEOUT)
}
