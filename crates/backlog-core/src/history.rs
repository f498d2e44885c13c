//! History invalidation dispatch.
//!
//! Whenever the story membership or rank order of a backlog changes, the
//! derived history attached to it has to be recomputed. Which recomputation
//! applies depends on the backlog kind:
//!
//! | kind      | backlog history | iteration history |
//! |-----------|-----------------|-------------------|
//! | Iteration | yes             | yes               |
//! | Project   | yes             | no                |
//! | Product   | no              | no                |
//!
//! Dispatch is stateless: invalidating the same backlog twice issues the same
//! calls twice, which the recomputation subsystem tolerates.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{RankError, Result};
use crate::model::{BacklogId, BacklogKind};
use crate::store::{BacklogRepository, HistoryRecorder};

/// One downstream recomputation call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "scope", content = "backlog", rename_all = "lowercase")]
pub enum HistoryUpdate {
    Backlog(BacklogId),
    Iteration(BacklogId),
}

impl HistoryUpdate {
    #[must_use]
    pub const fn backlog(self) -> BacklogId {
        match self {
            Self::Backlog(id) | Self::Iteration(id) => id,
        }
    }

    #[must_use]
    pub const fn scope(self) -> &'static str {
        match self {
            Self::Backlog(_) => "backlog",
            Self::Iteration(_) => "iteration",
        }
    }
}

impl fmt::Display for HistoryUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.scope(), self.backlog())
    }
}

/// The recomputation calls owed to a backlog of the given kind.
#[must_use]
pub fn updates_for(kind: BacklogKind, id: BacklogId) -> Vec<HistoryUpdate> {
    match kind {
        BacklogKind::Iteration => vec![HistoryUpdate::Backlog(id), HistoryUpdate::Iteration(id)],
        BacklogKind::Project => vec![HistoryUpdate::Backlog(id)],
        BacklogKind::Product => Vec::new(),
    }
}

/// Resolves backlogs and forwards the matching calls to a recorder.
#[derive(Clone, Copy)]
pub struct HistoryDispatcher<'a> {
    backlogs: &'a dyn BacklogRepository,
    recorder: &'a dyn HistoryRecorder,
}

impl<'a> HistoryDispatcher<'a> {
    #[must_use]
    pub fn new(backlogs: &'a dyn BacklogRepository, recorder: &'a dyn HistoryRecorder) -> Self {
        Self { backlogs, recorder }
    }

    /// Issue the history recomputation calls for one backlog.
    ///
    /// Returns the calls that were issued.
    ///
    /// # Errors
    ///
    /// [`RankError::BacklogNotFound`] when the id does not resolve, or
    /// [`RankError::Store`] when the repository or recorder fails.
    pub fn invalidate(&self, id: BacklogId) -> Result<Vec<HistoryUpdate>> {
        let backlog = self
            .backlogs
            .find_backlog(id)?
            .ok_or(RankError::BacklogNotFound(id))?;

        let updates = updates_for(backlog.kind, id);
        for update in &updates {
            match *update {
                HistoryUpdate::Backlog(id) => self.recorder.update_backlog_history(id)?,
                HistoryUpdate::Iteration(id) => self.recorder.update_iteration_history(id)?,
            }
        }
        tracing::debug!(backlog = %id, kind = %backlog.kind, calls = updates.len(), "invalidated history");
        Ok(updates)
    }

    /// Invalidate several backlogs in order. Duplicates are dispatched again.
    ///
    /// # Errors
    ///
    /// Stops at the first failing backlog; see [`Self::invalidate`].
    pub fn invalidate_all(
        &self,
        ids: impl IntoIterator<Item = BacklogId>,
    ) -> Result<Vec<HistoryUpdate>> {
        let mut issued = Vec::new();
        for id in ids {
            issued.extend(self.invalidate(id)?);
        }
        Ok(issued)
    }
}
