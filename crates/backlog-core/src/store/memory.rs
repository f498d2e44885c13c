//! In-memory collaborator implementations.
//!
//! [`MemoryStore`] keeps backlogs and stories in ordered maps behind a mutex
//! and implements both [`BacklogRepository`] and [`StoryStore`].
//! [`RecordingHistory`] records every history call in order. Both are used by
//! the test suites and are handy for embedding the engine without a database.

use anyhow::{Result, bail};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::{BacklogRepository, HistoryRecorder, StoryStore};
use crate::history::HistoryUpdate;
use crate::model::{Backlog, BacklogId, NewStory, Story, StoryId, UserId};

#[derive(Debug, Default)]
struct Inner {
    backlogs: BTreeMap<BacklogId, Backlog>,
    assignees: BTreeMap<BacklogId, Vec<UserId>>,
    stories: BTreeMap<StoryId, Story>,
    next_story_id: i64,
}

/// Thread-safe in-memory backlog and story storage.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn insert_backlog(&self, backlog: Backlog) {
        self.state().backlogs.insert(backlog.id, backlog);
    }

    pub fn assign_user(&self, project: BacklogId, user: UserId) {
        self.state().assignees.entry(project).or_default().push(user);
    }

    /// Insert a story as-is, keeping its id. Later `create` calls never
    /// reuse an inserted id.
    pub fn insert_story(&self, story: Story) {
        let mut state = self.state();
        state.next_story_id = state.next_story_id.max(story.id.0);
        state.stories.insert(story.id, story);
    }

    /// Snapshot of one story.
    #[must_use]
    pub fn story(&self, id: StoryId) -> Option<Story> {
        self.state().stories.get(&id).cloned()
    }

    /// `(id, rank)` pairs of a backlog in rank order.
    #[must_use]
    pub fn ranks(&self, backlog: BacklogId) -> Vec<(StoryId, i64)> {
        let mut ranks: Vec<(StoryId, i64)> = self
            .state()
            .stories
            .values()
            .filter(|s| s.backlog == backlog)
            .map(|s| (s.id, s.rank))
            .collect();
        ranks.sort_by_key(|&(id, rank)| (rank, id));
        ranks
    }
}

impl BacklogRepository for MemoryStore {
    fn find_backlog(&self, id: BacklogId) -> Result<Option<Backlog>> {
        Ok(self.state().backlogs.get(&id).cloned())
    }

    fn assigned_users(&self, project: BacklogId) -> Result<Vec<UserId>> {
        Ok(self
            .state()
            .assignees
            .get(&project)
            .cloned()
            .unwrap_or_default())
    }
}

impl StoryStore for MemoryStore {
    fn get(&self, id: StoryId) -> Result<Option<Story>> {
        Ok(self.story(id))
    }

    fn stories_in_backlog(&self, backlog: BacklogId) -> Result<Vec<Story>> {
        self.stories_with_rank_between(backlog, i64::MIN, i64::MAX)
    }

    fn stories_with_rank_between(
        &self,
        backlog: BacklogId,
        low: i64,
        high: i64,
    ) -> Result<Vec<Story>> {
        let mut stories: Vec<Story> = self
            .state()
            .stories
            .values()
            .filter(|s| s.backlog == backlog && low <= s.rank && s.rank <= high)
            .cloned()
            .collect();
        stories.sort_by_key(|s| (s.rank, s.id));
        Ok(stories)
    }

    fn last_story_in_rank(&self, backlog: BacklogId) -> Result<Option<Story>> {
        Ok(self
            .state()
            .stories
            .values()
            .filter(|s| s.backlog == backlog)
            .max_by_key(|s| (s.rank, s.id))
            .cloned())
    }

    fn create(&self, draft: &NewStory, backlog: BacklogId, rank: i64) -> Result<StoryId> {
        let mut state = self.state();
        state.next_story_id += 1;
        let id = StoryId(state.next_story_id);
        let mut story = Story::new(id, draft.name.clone(), backlog, rank);
        story.parent = draft.parent;
        story.responsibles.clone_from(&draft.responsibles);
        story.story_points = draft.story_points;
        story.state = draft.state;
        if let Some(parent) = draft.parent.and_then(|p| state.stories.get_mut(&p)) {
            parent.children.insert(id);
        }
        state.stories.insert(id, story);
        Ok(id)
    }

    fn store(&self, story: &Story) -> Result<()> {
        self.store_all(std::slice::from_ref(story))
    }

    fn store_all(&self, stories: &[Story]) -> Result<()> {
        let mut state = self.state();
        for story in stories {
            state.stories.insert(story.id, story.clone());
        }
        Ok(())
    }

    fn remove(&self, id: StoryId) -> Result<()> {
        if self.state().stories.remove(&id).is_none() {
            bail!("cannot remove story {id}: not stored");
        }
        Ok(())
    }

    fn story_point_sum(&self, backlog: BacklogId) -> Result<u64> {
        Ok(self
            .state()
            .stories
            .values()
            .filter(|s| s.backlog == backlog)
            .filter_map(|s| s.story_points)
            .map(u64::from)
            .sum())
    }
}

/// History recorder that remembers every call.
#[derive(Debug, Default)]
pub struct RecordingHistory {
    calls: Mutex<Vec<HistoryUpdate>>,
}

impl RecordingHistory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All calls received so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<HistoryUpdate> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Drain the recorded calls.
    pub fn take(&self) -> Vec<HistoryUpdate> {
        std::mem::take(&mut *self.calls.lock().unwrap_or_else(PoisonError::into_inner))
    }

    fn push(&self, update: HistoryUpdate) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(update);
    }
}

impl HistoryRecorder for RecordingHistory {
    fn update_backlog_history(&self, backlog: BacklogId) -> Result<()> {
        self.push(HistoryUpdate::Backlog(backlog));
        Ok(())
    }

    fn update_iteration_history(&self, iteration: BacklogId) -> Result<()> {
        self.push(HistoryUpdate::Iteration(iteration));
        Ok(())
    }
}
