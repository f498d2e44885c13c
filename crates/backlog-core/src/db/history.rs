//! Durable history invalidation queue.
//!
//! The engine does not recompute history itself. [`HistoryQueue`] records
//! each requested recomputation in `history_queue` so a reporting job can
//! pick them up later and acknowledge what it processed.

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, params};
use serde::Serialize;

use crate::history::HistoryUpdate;
use crate::model::BacklogId;
use crate::store::HistoryRecorder;

/// One pending recomputation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueuedUpdate {
    pub seq: i64,
    pub update: HistoryUpdate,
    pub queued_at: DateTime<Utc>,
}

/// [`HistoryRecorder`] writing to the `history_queue` table.
#[derive(Clone, Copy)]
pub struct HistoryQueue<'conn> {
    conn: &'conn Connection,
}

impl<'conn> HistoryQueue<'conn> {
    #[must_use]
    pub const fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn enqueue(&self, update: HistoryUpdate) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO history_queue (backlog_id, scope, queued_at) VALUES (?1, ?2, ?3)",
                params![
                    update.backlog().get(),
                    update.scope(),
                    Utc::now().to_rfc3339()
                ],
            )
            .with_context(|| format!("queue history update {update}"))?;
        Ok(())
    }

    /// Pending updates in the order they were queued.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or a row is malformed.
    pub fn pending(&self) -> Result<Vec<QueuedUpdate>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT seq, backlog_id, scope, queued_at FROM history_queue ORDER BY seq",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter()
            .map(|(seq, backlog, scope, queued_at)| {
                let backlog = BacklogId(backlog);
                let update = match scope.as_str() {
                    "backlog" => HistoryUpdate::Backlog(backlog),
                    "iteration" => HistoryUpdate::Iteration(backlog),
                    other => bail!("unknown history scope '{other}' at seq {seq}"),
                };
                let queued_at = DateTime::parse_from_rfc3339(&queued_at)
                    .with_context(|| format!("parse queued_at of seq {seq}"))?
                    .with_timezone(&Utc);
                Ok(QueuedUpdate {
                    seq,
                    update,
                    queued_at,
                })
            })
            .collect()
    }

    /// Drop every queued update up to and including `seq`. Returns how many
    /// rows were removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    pub fn acknowledge(&self, seq: i64) -> Result<usize> {
        let removed = self
            .conn
            .execute("DELETE FROM history_queue WHERE seq <= ?1", [seq])
            .context("acknowledge history updates")?;
        tracing::debug!(seq, removed, "acknowledged history updates");
        Ok(removed)
    }
}

impl HistoryRecorder for HistoryQueue<'_> {
    fn update_backlog_history(&self, backlog: BacklogId) -> Result<()> {
        self.enqueue(HistoryUpdate::Backlog(backlog))
    }

    fn update_iteration_history(&self, iteration: BacklogId) -> Result<()> {
        self.enqueue(HistoryUpdate::Iteration(iteration))
    }
}
