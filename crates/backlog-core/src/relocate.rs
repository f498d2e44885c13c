//! Story relocation and reordering.
//!
//! [`Relocator`] is the entry point the application layer talks to. It
//! combines the rank arithmetic of [`crate::rank`], the legality checks of
//! [`crate::hierarchy`] and the history fan-out of [`crate::history`] with
//! the storage collaborators.
//!
//! # Write discipline
//!
//! Every operation validates first and mutates last. The caller's `Story` is
//! only updated after the store accepted the write, so a rejected or failed
//! operation leaves it exactly as it was. Stories touched by one operation
//! (the moved story, the shifted window, a severed parent) are written with a
//! single [`StoryStore::store_all`] call.
//!
//! # Locking
//!
//! With [`LockSettings`] configured, the rank space of the backlog being
//! written is held exclusively from the window read until the batch is
//! stored. Relocations only lock the destination; the origin keeps its
//! (now gapped) ranks. Stories are read again once the lock is held, so the
//! copy a caller passes in only names the story to work on.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::error::{RankError, Result};
use crate::hierarchy::{self, RelocationPlan};
use crate::history::{HistoryDispatcher, HistoryUpdate};
use crate::lock::{BacklogLock, LockSettings};
use crate::model::{BacklogId, NewStory, Story, StoryEdit, StoryId, UserId};
use crate::rank;
use crate::store::{BacklogRepository, HistoryRecorder, StoryStore};

/// Summary of a completed relocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relocation {
    pub story: StoryId,
    pub origin: BacklogId,
    pub destination: BacklogId,
    pub rank: i64,
    /// Parent story whose link was cleared by the move.
    pub severed_parent: Option<StoryId>,
    /// Stories of the destination whose rank shifted.
    pub shifted: Vec<StoryId>,
    pub history: Vec<HistoryUpdate>,
}

/// Result of [`Relocator::update_story`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryUpdate {
    pub story: Story,
    /// Set when the update moved the story to another backlog.
    pub relocation: Option<Relocation>,
}

/// Where a relocated story lands in its destination.
#[derive(Debug, Clone, Copy)]
enum Placement {
    Bottom,
    /// Below the given story, or first when `None`.
    Below(Option<StoryId>),
}

/// Orchestrates moves and reorders over the storage collaborators.
pub struct Relocator<'a> {
    stories: &'a dyn StoryStore,
    backlogs: &'a dyn BacklogRepository,
    history: HistoryDispatcher<'a>,
    locks: Option<LockSettings>,
}

impl<'a> Relocator<'a> {
    #[must_use]
    pub fn new(
        stories: &'a dyn StoryStore,
        backlogs: &'a dyn BacklogRepository,
        recorder: &'a dyn HistoryRecorder,
    ) -> Self {
        Self {
            stories,
            backlogs,
            history: HistoryDispatcher::new(backlogs, recorder),
            locks: None,
        }
    }

    /// Serialize writes per backlog through advisory lock files.
    #[must_use]
    pub fn with_locks(mut self, settings: LockSettings) -> Self {
        self.locks = Some(settings);
        self
    }

    fn lock(&self, backlog: BacklogId) -> Result<Option<BacklogLock>> {
        match &self.locks {
            Some(settings) => Ok(Some(settings.acquire(backlog)?)),
            None => Ok(None),
        }
    }

    /// Move `story` to the bottom of `destination`.
    ///
    /// History is invalidated for both the origin and the destination.
    ///
    /// # Errors
    ///
    /// - [`RankError::BacklogNotFound`] if `destination` does not exist.
    /// - [`RankError::StoryNotFound`] if the story is no longer stored.
    /// - [`RankError::InvalidArgument`] if the story already lives in
    ///   `destination` (use [`Self::rank_to_bottom`] to reorder).
    /// - [`RankError::RelocationDenied`] if the story has children and the
    ///   destination is under another product. Nothing is written.
    pub fn move_to_backlog(&self, story: &mut Story, destination: BacklogId) -> Result<Relocation> {
        let (moved, relocation) =
            self.relocate(story.id, destination, Placement::Bottom, |_| {})?;
        *story = moved;
        Ok(relocation)
    }

    /// Rank `story` directly below `target`, or at the top of its backlog
    /// when `target` is `None`.
    ///
    /// Both stories are read again once the backlog is locked, so a stale
    /// snapshot only identifies them. Returns the other stories whose rank
    /// shifted. They are persisted together with `story`.
    ///
    /// # Errors
    ///
    /// - [`RankError::StoryNotFound`] if either story is no longer stored.
    /// - [`RankError::InvalidArgument`] if `target` belongs to another
    ///   backlog or is `story` itself, or if `story` left its backlog.
    pub fn rank_under_story(&self, story: &mut Story, target: Option<&Story>) -> Result<Vec<Story>> {
        let (moved, shifted) = self.rerank(story.id, story.backlog, target.map(|t| t.id))?;
        *story = moved;
        Ok(shifted)
    }

    /// Put `story` at the bottom of its backlog and persist it.
    ///
    /// Returns the new rank.
    ///
    /// # Errors
    ///
    /// - [`RankError::InvalidArgument`] if `backlog` is `None` or is not the
    ///   story's own backlog (use [`Self::move_to_backlog`] to relocate).
    /// - [`RankError::BacklogNotFound`] if the backlog does not exist.
    /// - [`RankError::StoryNotFound`] if the story is no longer stored.
    pub fn rank_to_bottom(&self, story: &mut Story, backlog: Option<BacklogId>) -> Result<i64> {
        let backlog = backlog.ok_or_else(|| RankError::invalid("backlog id is required"))?;
        hierarchy::require_backlog(self.backlogs, backlog)?;

        let guard = self.lock(backlog)?;
        let mut moved = self.require_story(story.id)?;
        if moved.backlog != backlog {
            return Err(RankError::invalid(format!(
                "story {} belongs to backlog {}, not {backlog}",
                moved.id, moved.backlog
            )));
        }
        let last = self.stories.last_story_in_rank(backlog)?;
        if last.as_ref().is_some_and(|last| last.id == moved.id) {
            *story = moved;
            return Ok(story.rank);
        }

        moved.rank = rank::append_to_bottom(last.as_ref());
        self.stories.store(&moved)?;
        drop(guard);
        *story = moved;
        Ok(story.rank)
    }

    /// Move `story` into `destination` and rank it below `target` there.
    ///
    /// When the backlog changes the story is first appended to the bottom of
    /// the destination and then ranked, and history is invalidated for both
    /// backlogs. A move within one backlog is a plain reorder.
    ///
    /// # Errors
    ///
    /// - [`RankError::BacklogNotFound`] if `destination` does not exist.
    /// - [`RankError::StoryNotFound`] if either story is no longer stored.
    /// - [`RankError::InvalidArgument`] if `target` is not in `destination`
    ///   or is `story` itself.
    /// - [`RankError::RelocationDenied`] as for [`Self::move_to_backlog`].
    pub fn rank_and_move(
        &self,
        story: &mut Story,
        target: Option<&Story>,
        destination: BacklogId,
    ) -> Result<Relocation> {
        hierarchy::require_backlog(self.backlogs, destination)?;
        let target = target.map(|t| t.id);
        let current = self.require_story(story.id)?;

        if current.backlog == destination {
            let (moved, shifted) = self.rerank(story.id, destination, target)?;
            *story = moved;
            return Ok(Relocation {
                story: story.id,
                origin: destination,
                destination,
                rank: story.rank,
                severed_parent: None,
                shifted: shifted.iter().map(|s| s.id).collect(),
                history: Vec::new(),
            });
        }

        let (moved, relocation) =
            self.relocate(story.id, destination, Placement::Below(target), |_| {})?;
        *story = moved;
        Ok(relocation)
    }

    /// Edit a story's fields, its responsible users and optionally its
    /// backlog.
    ///
    /// `responsibles` replaces the current set when given. A change of
    /// backlog moves the story to the bottom of the new backlog and clears
    /// responsibles that were not given explicitly; the edit is written in
    /// the same batch as the move. History of the story's backlog is
    /// invalidated, or of both backlogs after a move.
    ///
    /// # Errors
    ///
    /// - [`RankError::StoryNotFound`] if the story does not exist.
    /// - Any error of [`Self::move_to_backlog`] when the backlog changes.
    pub fn update_story(
        &self,
        id: StoryId,
        edit: &StoryEdit,
        backlog: Option<BacklogId>,
        responsibles: Option<BTreeSet<UserId>>,
    ) -> Result<StoryUpdate> {
        let current = self.require_story(id)?;

        if let Some(destination) = backlog.filter(|b| *b != current.backlog) {
            let (story, relocation) =
                self.relocate(id, destination, Placement::Bottom, |story| {
                    edit.apply(story);
                    story.responsibles = responsibles.unwrap_or_default();
                })?;
            return Ok(StoryUpdate {
                story,
                relocation: Some(relocation),
            });
        }

        let guard = self.lock(current.backlog)?;
        let mut story = self.require_story(id)?;
        edit.apply(&mut story);
        if let Some(responsibles) = responsibles {
            story.responsibles = responsibles;
        }
        self.stories.store(&story)?;
        drop(guard);

        self.history.invalidate(story.backlog)?;
        tracing::info!(story = %id, backlog = %story.backlog, "updated story");
        Ok(StoryUpdate {
            story,
            relocation: None,
        })
    }

    /// Create a story at the bottom of its backlog.
    ///
    /// # Errors
    ///
    /// - [`RankError::InvalidArgument`] if the draft names no backlog.
    /// - [`RankError::BacklogNotFound`] / [`RankError::StoryNotFound`] if the
    ///   backlog or the parent story does not exist.
    pub fn create_story(&self, draft: &NewStory) -> Result<Story> {
        let backlog = draft
            .backlog
            .ok_or_else(|| RankError::invalid("backlog id is required"))?;
        hierarchy::require_backlog(self.backlogs, backlog)?;
        if let Some(parent) = draft.parent {
            self.require_story(parent)?;
        }

        let guard = self.lock(backlog)?;
        let rank = rank::append_to_bottom(self.stories.last_story_in_rank(backlog)?.as_ref());
        let id = self.stories.create(draft, backlog, rank)?;
        drop(guard);

        self.history.invalidate(backlog)?;
        tracing::info!(story = %id, backlog = %backlog, rank, "created story");
        self.require_story(id)
    }

    /// Persist already-stored stories, for callers that batch edits.
    ///
    /// # Errors
    ///
    /// [`RankError::InvalidArgument`] if a story was never persisted or its
    /// backlog differs from the stored one (membership changes go through
    /// relocation). Nothing is written in that case.
    pub fn store_batch(&self, stories: &[Story]) -> Result<()> {
        for story in stories {
            let Some(stored) = self.stories.get(story.id)? else {
                return Err(RankError::invalid(format!(
                    "story {} has not been persisted",
                    story.id
                )));
            };
            if stored.backlog != story.backlog {
                return Err(RankError::invalid(format!(
                    "story {} cannot change backlog in a batch store",
                    story.id
                )));
            }
        }
        self.stories.store_all(stories)?;
        Ok(())
    }

    /// Delete a story that no longer has tasks or hour entries.
    ///
    /// The story is detached from its parent and its children lose their
    /// parent link. Returns the removed story.
    ///
    /// # Errors
    ///
    /// - [`RankError::StoryNotFound`] if the story does not exist.
    /// - [`RankError::DeleteDenied`] while tasks or hour entries remain.
    pub fn delete_story(&self, id: StoryId) -> Result<Story> {
        let story = self.require_story(id)?;
        if story.has_attached_work() {
            return Err(RankError::DeleteDenied {
                story: id,
                tasks: story.tasks.len(),
                hour_entries: story.hour_entries.len(),
            });
        }

        let mut touched = Vec::new();
        if let Some(mut parent) = story.parent.map(|p| self.stories.get(p)).transpose()?.flatten() {
            parent.children.remove(&id);
            touched.push(parent);
        }
        for child_id in &story.children {
            if let Some(mut child) = self.stories.get(*child_id)? {
                child.parent = None;
                touched.push(child);
            }
        }
        if !touched.is_empty() {
            self.stories.store_all(&touched)?;
        }
        self.stories.remove(id)?;
        self.history.invalidate(story.backlog)?;

        tracing::info!(story = %id, backlog = %story.backlog, "deleted story");
        Ok(story)
    }

    /// Users assigned to the project enclosing `story`.
    ///
    /// # Errors
    ///
    /// Propagates lookup failures.
    pub fn project_responsibles(&self, story: &Story) -> Result<Vec<UserId>> {
        hierarchy::project_responsibles(self.backlogs, story)
    }

    /// Sum of story points in a backlog.
    ///
    /// # Errors
    ///
    /// [`RankError::BacklogNotFound`] if the backlog does not exist.
    pub fn story_point_sum(&self, backlog: BacklogId) -> Result<u64> {
        hierarchy::require_backlog(self.backlogs, backlog)?;
        Ok(self.stories.story_point_sum(backlog)?)
    }

    fn require_story(&self, id: StoryId) -> Result<Story> {
        self.stories.get(id)?.ok_or(RankError::StoryNotFound(id))
    }

    /// Reorder story `id` inside `backlog` under the backlog lock, working
    /// on freshly read copies of the story and the target.
    fn rerank(
        &self,
        id: StoryId,
        backlog: BacklogId,
        target: Option<StoryId>,
    ) -> Result<(Story, Vec<Story>)> {
        let guard = self.lock(backlog)?;
        let mut moved = self.require_story(id)?;
        if moved.backlog != backlog {
            return Err(RankError::invalid(format!(
                "story {id} is now in backlog {}, not {backlog}",
                moved.backlog
            )));
        }
        let target = target.map(|t| self.require_story(t)).transpose()?;
        let from = moved.rank;
        let shifted = self.reposition(&mut moved, target.as_ref())?;

        let mut batch = shifted.clone();
        batch.push(moved.clone());
        self.stories.store_all(&batch)?;
        drop(guard);

        tracing::debug!(
            story = %id,
            backlog = %backlog,
            from,
            to = moved.rank,
            shifted = shifted.len(),
            "reranked story"
        );
        Ok((moved, shifted))
    }

    /// Move story `id` into another backlog under the destination lock.
    ///
    /// The story and the target are read again after locking. `adjust` runs
    /// on the moved story before the batch is stored.
    fn relocate(
        &self,
        id: StoryId,
        destination: BacklogId,
        placement: Placement,
        adjust: impl FnOnce(&mut Story),
    ) -> Result<(Story, Relocation)> {
        hierarchy::require_backlog(self.backlogs, destination)?;

        let guard = self.lock(destination)?;
        let mut moved = self.require_story(id)?;
        if moved.backlog == destination {
            return Err(RankError::invalid(format!(
                "story {id} is already in backlog {destination}"
            )));
        }
        let target = match placement {
            Placement::Below(Some(target)) => Some(self.require_target(id, target, destination)?),
            Placement::Below(None) | Placement::Bottom => None,
        };
        let plan = hierarchy::check_relocation(self.stories, self.backlogs, &moved, destination)?;

        let mut batch = Vec::with_capacity(2);
        let severed_parent = self.relocate_to_bottom(&mut moved, &plan, &mut batch)?;
        let shifted = match placement {
            Placement::Bottom => Vec::new(),
            Placement::Below(_) => self.reposition(&mut moved, target.as_ref())?,
        };
        adjust(&mut moved);
        let shifted_ids = shifted.iter().map(|s| s.id).collect();
        batch.extend(shifted);
        batch.push(moved.clone());
        self.stories.store_all(&batch)?;
        drop(guard);

        let history = self
            .history
            .invalidate_all([plan.origin, plan.destination])?;

        tracing::info!(
            story = %id,
            from = %plan.origin,
            to = %plan.destination,
            rank = moved.rank,
            "moved story to backlog"
        );

        let relocation = Relocation {
            story: id,
            origin: plan.origin,
            destination: plan.destination,
            rank: moved.rank,
            severed_parent,
            shifted: shifted_ids,
            history,
        };
        Ok((moved, relocation))
    }

    fn require_target(&self, story: StoryId, target: StoryId, destination: BacklogId) -> Result<Story> {
        if target == story {
            return Err(RankError::invalid(format!(
                "story {story} cannot be ranked under itself"
            )));
        }
        let target = self.require_story(target)?;
        if target.backlog != destination {
            return Err(RankError::invalid(format!(
                "target story {} is in backlog {}, not in destination {destination}",
                target.id, target.backlog
            )));
        }
        Ok(target)
    }

    /// Move `story` to the bottom of the plan's destination, severing the
    /// parent link when required. The severed parent (if still stored) is
    /// pushed onto `batch`; `story` itself is left for the caller to store.
    fn relocate_to_bottom(
        &self,
        story: &mut Story,
        plan: &RelocationPlan,
        batch: &mut Vec<Story>,
    ) -> Result<Option<StoryId>> {
        let last = self.stories.last_story_in_rank(plan.destination)?;
        story.backlog = plan.destination;
        story.rank = rank::append_to_bottom(last.as_ref());

        if !plan.sever_parent {
            return Ok(None);
        }
        let Some(parent_id) = story.parent.take() else {
            return Ok(None);
        };
        if let Some(mut parent) = self.stories.get(parent_id)? {
            parent.children.remove(&story.id);
            batch.push(parent);
        }
        tracing::warn!(
            story = %story.id,
            parent = %parent_id,
            "severed parent link: parent lives under another product"
        );
        Ok(Some(parent_id))
    }

    /// Rank `story` below `target` inside its current backlog. Returns the
    /// shifted stories without writing anything.
    fn reposition(&self, story: &mut Story, target: Option<&Story>) -> Result<Vec<Story>> {
        let plan = rank::plan_move(story, target)?;
        let shifted = match plan.shift {
            Some(window) => {
                let candidates =
                    self.stories
                        .stories_with_rank_between(story.backlog, window.low, window.high)?;
                rank::apply_shift(&window, story, candidates)
            }
            None => Vec::new(),
        };
        story.rank = plan.new_rank;
        Ok(shifted)
    }
}

#[cfg(test)]
mod tests {
    use super::Relocator;
    use crate::error::RankError;
    use crate::history::HistoryUpdate;
    use crate::model::{
        Backlog, BacklogId, NewStory, Story, StoryEdit, StoryId, StoryState, TaskId, UserId,
    };
    use crate::store::StoryStore;
    use std::collections::BTreeSet;
    use crate::store::memory::{MemoryStore, RecordingHistory};

    const PRODUCT: BacklogId = BacklogId(1);
    const PROJECT: BacklogId = BacklogId(2);
    const ITERATION: BacklogId = BacklogId(5834);

    fn store() -> MemoryStore {
        let store = MemoryStore::new();
        store.insert_backlog(Backlog::product(PRODUCT, "Product"));
        store.insert_backlog(Backlog::project(PROJECT, "Project", PRODUCT));
        store.insert_backlog(Backlog::iteration(ITERATION, "Iteration", PROJECT));
        store
    }

    #[test]
    fn store_batch_requires_persisted_stories() {
        let store = store();
        let history = RecordingHistory::new();
        let relocator = Relocator::new(&store, &store, &history);

        let mut ghost = Story::new(StoryId(1), "ghost", ITERATION, 0);
        let err = relocator.store_batch(std::slice::from_ref(&ghost)).unwrap_err();
        assert!(matches!(err, RankError::InvalidArgument(_)));

        ghost.rank = 4;
        store.insert_story(ghost.clone());
        ghost.rank = 9;
        relocator.store_batch(std::slice::from_ref(&ghost)).unwrap();
        assert_eq!(store.story(StoryId(1)).unwrap().rank, 9);

        ghost.backlog = PROJECT;
        assert!(relocator.store_batch(&[ghost]).is_err());
    }

    #[test]
    fn rank_to_bottom_is_noop_for_last_story() {
        let store = store();
        let history = RecordingHistory::new();
        let relocator = Relocator::new(&store, &store, &history);
        let mut story = Story::new(StoryId(1), "only", ITERATION, 7);
        store.insert_story(story.clone());

        assert_eq!(relocator.rank_to_bottom(&mut story, Some(ITERATION)).unwrap(), 7);
    }

    #[test]
    fn rank_to_bottom_rejects_foreign_backlog() {
        let store = store();
        let history = RecordingHistory::new();
        let relocator = Relocator::new(&store, &store, &history);
        let mut story = Story::new(StoryId(1), "s", ITERATION, 0);
        store.insert_story(story.clone());

        assert!(matches!(
            relocator.rank_to_bottom(&mut story, Some(PROJECT)),
            Err(RankError::InvalidArgument(_))
        ));
    }

    #[test]
    fn rank_to_bottom_uses_stored_backlog() {
        let store = store();
        let history = RecordingHistory::new();
        let relocator = Relocator::new(&store, &store, &history);
        store.insert_story(Story::new(StoryId(1), "stays", PROJECT, 0));
        store.insert_story(Story::new(StoryId(2), "moved away", PROJECT, 1));
        let mut stale = store.story(StoryId(2)).unwrap();
        let mut moved = store.story(StoryId(2)).unwrap();
        relocator.move_to_backlog(&mut moved, ITERATION).unwrap();

        assert!(matches!(
            relocator.rank_to_bottom(&mut stale, Some(PROJECT)),
            Err(RankError::InvalidArgument(_))
        ));
        assert_eq!(store.ranks(PROJECT), vec![(StoryId(1), 0)]);
        assert_eq!(store.ranks(ITERATION), vec![(StoryId(2), 0)]);
    }

    #[test]
    fn update_story_edits_fields_in_place() {
        let store = store();
        let history = RecordingHistory::new();
        let relocator = Relocator::new(&store, &store, &history);
        let mut story = Story::new(StoryId(4), "draft", ITERATION, 6);
        story.responsibles.insert(UserId(1));
        store.insert_story(story);

        let edit = StoryEdit {
            name: Some("Foo item".into()),
            story_points: Some(333),
            state: Some(StoryState::Pending),
        };
        let responsibles = BTreeSet::from([UserId(123), UserId(222)]);
        let update = relocator
            .update_story(StoryId(4), &edit, Some(ITERATION), Some(responsibles.clone()))
            .unwrap();

        assert!(update.relocation.is_none());
        let stored = store.story(StoryId(4)).unwrap();
        assert_eq!(stored, update.story);
        assert_eq!(stored.name, "Foo item");
        assert_eq!(stored.story_points, Some(333));
        assert_eq!(stored.state, StoryState::Pending);
        assert_eq!(stored.responsibles, responsibles);
        assert_eq!((stored.backlog, stored.rank), (ITERATION, 6));
        assert_eq!(
            history.calls(),
            vec![
                HistoryUpdate::Backlog(ITERATION),
                HistoryUpdate::Iteration(ITERATION),
            ]
        );
    }

    #[test]
    fn update_story_with_new_backlog_moves_and_clears_responsibles() {
        let store = store();
        let history = RecordingHistory::new();
        let relocator = Relocator::new(&store, &store, &history);
        store.insert_story(Story::new(StoryId(9), "resident", PROJECT, 3));
        let mut story = Story::new(StoryId(4), "mover", ITERATION, 0);
        story.responsibles.extend([UserId(1), UserId(2)]);
        store.insert_story(story);

        let edit = StoryEdit {
            name: Some("renamed".into()),
            ..StoryEdit::default()
        };
        let update = relocator
            .update_story(StoryId(4), &edit, Some(PROJECT), None)
            .unwrap();

        let relocation = update.relocation.unwrap();
        assert_eq!((relocation.origin, relocation.destination), (ITERATION, PROJECT));
        let stored = store.story(StoryId(4)).unwrap();
        assert_eq!(stored.backlog, PROJECT);
        assert_eq!(stored.rank, 4);
        assert_eq!(stored.name, "renamed");
        assert!(stored.responsibles.is_empty());
        assert_eq!(history.calls().len(), 3);
    }

    #[test]
    fn update_story_of_missing_story_is_not_found() {
        let store = store();
        let history = RecordingHistory::new();
        let relocator = Relocator::new(&store, &store, &history);

        assert!(matches!(
            relocator.update_story(StoryId(222), &StoryEdit::default(), Some(PROJECT), None),
            Err(RankError::StoryNotFound(StoryId(222)))
        ));
        assert!(history.calls().is_empty());
    }

    #[test]
    fn denied_update_writes_nothing() {
        let store = store();
        store.insert_backlog(Backlog::product(BacklogId(10), "Other"));
        let history = RecordingHistory::new();
        let relocator = Relocator::new(&store, &store, &history);
        let mut parent = Story::new(StoryId(1), "epic", PROJECT, 0);
        parent.children.insert(StoryId(2));
        let mut child = Story::new(StoryId(2), "child", ITERATION, 0);
        child.parent = Some(StoryId(1));
        store.insert_story(parent.clone());
        store.insert_story(child);

        let edit = StoryEdit {
            name: Some("lost".into()),
            ..StoryEdit::default()
        };
        let err = relocator
            .update_story(StoryId(1), &edit, Some(BacklogId(10)), None)
            .unwrap_err();
        assert!(err.is_not_permitted());
        assert_eq!(store.story(StoryId(1)).unwrap(), parent);
        assert!(history.calls().is_empty());
    }

    #[test]
    fn create_story_appends_and_invalidates() {
        let store = store();
        let history = RecordingHistory::new();
        let relocator = Relocator::new(&store, &store, &history);
        store.insert_story(Story::new(StoryId(3), "last", ITERATION, 12));

        let created = relocator
            .create_story(&NewStory::named("Foofaa", ITERATION))
            .unwrap();
        assert_eq!(created.rank, 13);
        assert_eq!(created.backlog, ITERATION);
        assert_eq!(
            history.calls(),
            vec![
                HistoryUpdate::Backlog(ITERATION),
                HistoryUpdate::Iteration(ITERATION),
            ]
        );
    }

    #[test]
    fn create_story_validates_backlog() {
        let store = store();
        let history = RecordingHistory::new();
        let relocator = Relocator::new(&store, &store, &history);

        let mut draft = NewStory::named("x", BacklogId(222));
        assert!(matches!(
            relocator.create_story(&draft),
            Err(RankError::BacklogNotFound(BacklogId(222)))
        ));
        draft.backlog = None;
        assert!(matches!(
            relocator.create_story(&draft),
            Err(RankError::InvalidArgument(_))
        ));
        assert!(history.calls().is_empty());
    }

    #[test]
    fn delete_requires_detached_work() {
        let store = store();
        let history = RecordingHistory::new();
        let relocator = Relocator::new(&store, &store, &history);
        let mut story = Story::new(StoryId(666), "busy", ITERATION, 0);
        story.tasks.push(TaskId(1));
        store.insert_story(story);

        let err = relocator.delete_story(StoryId(666)).unwrap_err();
        assert!(err.is_not_permitted());
        assert!(store.story(StoryId(666)).is_some());
        assert!(history.calls().is_empty());
    }

    #[test]
    fn delete_unlinks_family_and_invalidates() {
        let store = store();
        let history = RecordingHistory::new();
        let relocator = Relocator::new(&store, &store, &history);

        let mut parent = Story::new(StoryId(1), "epic", PROJECT, 0);
        parent.children.insert(StoryId(2));
        let mut middle = Story::new(StoryId(2), "feature", PROJECT, 1);
        middle.parent = Some(StoryId(1));
        middle.children.insert(StoryId(3));
        let mut leaf = Story::new(StoryId(3), "leaf", ITERATION, 0);
        leaf.parent = Some(StoryId(2));
        for s in [parent, middle, leaf] {
            store.insert_story(s);
        }

        let removed = relocator.delete_story(StoryId(2)).unwrap();
        assert_eq!(removed.id, StoryId(2));
        assert!(store.get(StoryId(2)).unwrap().is_none());
        assert!(store.story(StoryId(1)).unwrap().children.is_empty());
        assert_eq!(store.story(StoryId(3)).unwrap().parent, None);
        assert_eq!(history.calls(), vec![HistoryUpdate::Backlog(PROJECT)]);

        assert!(matches!(
            relocator.delete_story(StoryId(2)),
            Err(RankError::StoryNotFound(StoryId(2)))
        ));
    }

    #[test]
    fn story_point_sum_checks_backlog() {
        let store = store();
        let history = RecordingHistory::new();
        let relocator = Relocator::new(&store, &store, &history);
        for (id, points) in [(1, Some(3)), (2, None), (3, Some(3))] {
            let mut s = Story::new(StoryId(id), "s", PRODUCT, id);
            s.story_points = points;
            store.insert_story(s);
        }

        assert_eq!(relocator.story_point_sum(PRODUCT).unwrap(), 6);
        assert!(relocator.story_point_sum(BacklogId(404)).is_err());
    }
}
