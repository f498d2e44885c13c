//! Minimal-disturbance rank arithmetic.
//!
//! A backlog orders its stories by an integer rank that is unique within the
//! backlog but not necessarily dense. Moving a story only touches the
//! contiguous band of ranks between its old and new position:
//!
//! - Moving **earlier** (target rank below the current one, or to the top when
//!   there is no target): the story takes `target + 1` and every other story in
//!   `[target + 1, current - 1]` moves down one slot (`+1`).
//! - Moving **later**: the story takes `target` and every other story in
//!   `[current + 1, target]` moves up one slot (`-1`).
//!
//! Everything outside the band keeps its rank, so a reorder costs O(window)
//! writes instead of a renumbering of the whole backlog.

use serde::{Deserialize, Serialize};

use crate::error::{RankError, Result};
use crate::model::Story;

/// Rank used as the virtual predecessor of the first story.
pub const TOP_SENTINEL: i64 = -1;

/// Rank assigned to the first story of an empty backlog.
pub const FIRST_RANK: i64 = 0;

/// Direction in which the stories of a shift window move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShiftDelta {
    /// Ranks grow by one (stories slide towards the bottom).
    Increment,
    /// Ranks shrink by one (stories slide towards the top).
    Decrement,
}

impl ShiftDelta {
    #[must_use]
    pub const fn as_i64(self) -> i64 {
        match self {
            Self::Increment => 1,
            Self::Decrement => -1,
        }
    }

    #[must_use]
    pub const fn apply(self, rank: i64) -> i64 {
        rank + self.as_i64()
    }
}

/// Inclusive rank range whose stories shift by `delta`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShiftWindow {
    pub low: i64,
    pub high: i64,
    pub delta: ShiftDelta,
}

impl ShiftWindow {
    #[must_use]
    pub const fn contains(&self, rank: i64) -> bool {
        self.low <= rank && rank <= self.high
    }
}

/// Result of planning a reorder inside one backlog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankMove {
    pub new_rank: i64,
    /// `None` when no other story needs to move (adjacent positions).
    pub shift: Option<ShiftWindow>,
}

/// Compute the new rank of a story currently at `current_rank` that should
/// end up directly below the story ranked `target_rank` (or at the very top
/// when `target_rank` is `None`).
///
/// # Errors
///
/// Returns [`RankError::InvalidArgument`] when the target rank equals the
/// current rank, which only happens when a story is ranked under itself.
pub fn compute_move(current_rank: i64, target_rank: Option<i64>) -> Result<RankMove> {
    let target = target_rank.unwrap_or(TOP_SENTINEL);

    if target < current_rank {
        let low = target + 1;
        let high = current_rank - 1;
        Ok(RankMove {
            new_rank: low,
            shift: (low <= high).then_some(ShiftWindow {
                low,
                high,
                delta: ShiftDelta::Increment,
            }),
        })
    } else if target > current_rank {
        Ok(RankMove {
            new_rank: target,
            shift: Some(ShiftWindow {
                low: current_rank + 1,
                high: target,
                delta: ShiftDelta::Decrement,
            }),
        })
    } else {
        Err(RankError::invalid(format!(
            "target rank {target} equals the moving story's rank"
        )))
    }
}

/// Story-level wrapper around [`compute_move`] that checks both stories share
/// a backlog.
///
/// # Errors
///
/// Returns [`RankError::InvalidArgument`] when `target` belongs to another
/// backlog, is the moving story itself, or sits on the same rank.
pub fn plan_move(story: &Story, target: Option<&Story>) -> Result<RankMove> {
    if let Some(target) = target {
        if target.backlog != story.backlog {
            return Err(RankError::invalid(format!(
                "story {} (backlog {}) cannot be ranked against story {} of backlog {}",
                story.id, story.backlog, target.id, target.backlog
            )));
        }
        if target.id == story.id {
            return Err(RankError::invalid(format!(
                "story {} cannot be ranked under itself",
                story.id
            )));
        }
    }
    let plan = compute_move(story.rank, target.map(|t| t.rank))?;
    tracing::debug!(
        story = %story.id,
        from = story.rank,
        to = plan.new_rank,
        window = ?plan.shift,
        "planned rank move"
    );
    Ok(plan)
}

/// Rank that places a story after `last`, the current bottom story of a
/// backlog, or [`FIRST_RANK`] when the backlog is empty.
#[must_use]
pub fn append_to_bottom(last: Option<&Story>) -> i64 {
    last.map_or(FIRST_RANK, |story| story.rank + 1)
}

/// Apply a shift window to the stories read from it, skipping the moving
/// story and anything the window query returned outside the range.
///
/// Returns the stories whose rank changed.
pub fn apply_shift(window: &ShiftWindow, moving: &Story, candidates: Vec<Story>) -> Vec<Story> {
    candidates
        .into_iter()
        .filter(|s| s.id != moving.id && window.contains(s.rank))
        .map(|mut s| {
            s.rank = window.delta.apply(s.rank);
            s
        })
        .collect()
}
