//! Collaborator contracts consumed by the engine.
//!
//! The engine never talks to a database directly. It reads backlogs through
//! [`BacklogRepository`], reads and writes stories through [`StoryStore`] and
//! reports derived-data invalidations to a [`HistoryRecorder`]. All methods
//! take `&self`; implementations use interior mutability (a mutex for the
//! in-memory store, SQLite's own connection state for [`crate::db`]).
//!
//! Collaborator failures are plain `anyhow` errors; the engine wraps them in
//! [`crate::error::RankError::Store`].

pub mod memory;

use anyhow::Result;

use crate::model::{Backlog, BacklogId, NewStory, Story, StoryId, UserId};

/// Read access to the backlog hierarchy.
pub trait BacklogRepository {
    /// Look up a backlog by id. `Ok(None)` when it does not exist.
    fn find_backlog(&self, id: BacklogId) -> Result<Option<Backlog>>;

    /// Users assigned to a project backlog.
    fn assigned_users(&self, project: BacklogId) -> Result<Vec<UserId>>;
}

/// Persistence for stories.
pub trait StoryStore {
    fn get(&self, id: StoryId) -> Result<Option<Story>>;

    /// Stories of a backlog ordered by rank.
    fn stories_in_backlog(&self, backlog: BacklogId) -> Result<Vec<Story>>;

    /// Stories of `backlog` with `low <= rank <= high`, ordered by rank.
    fn stories_with_rank_between(
        &self,
        backlog: BacklogId,
        low: i64,
        high: i64,
    ) -> Result<Vec<Story>>;

    /// The story with the highest rank in `backlog`, if any.
    fn last_story_in_rank(&self, backlog: BacklogId) -> Result<Option<Story>>;

    /// Persist a new story with the given rank and return its id.
    fn create(&self, draft: &NewStory, backlog: BacklogId, rank: i64) -> Result<StoryId>;

    /// Upsert one story.
    fn store(&self, story: &Story) -> Result<()>;

    /// Upsert several stories as one logical unit.
    fn store_all(&self, stories: &[Story]) -> Result<()>;

    fn remove(&self, id: StoryId) -> Result<()>;

    fn story_point_sum(&self, backlog: BacklogId) -> Result<u64>;
}

/// Trigger for recomputing derived history attached to backlogs.
pub trait HistoryRecorder {
    /// Recompute the generic backlog history (projects and iterations).
    fn update_backlog_history(&self, backlog: BacklogId) -> Result<()>;

    /// Recompute the iteration-specific burndown history.
    fn update_iteration_history(&self, iteration: BacklogId) -> Result<()>;
}
