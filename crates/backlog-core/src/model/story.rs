use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::{fmt, str::FromStr};

use super::{BacklogId, HourEntryId, ParseEnumError, StoryId, TaskId, UserId, normalize};

/// Progress state of a story.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoryState {
    #[default]
    NotStarted,
    Started,
    Pending,
    Blocked,
    Implemented,
    Done,
}

impl StoryState {
    pub(crate) const fn as_str(self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::Started => "started",
            Self::Pending => "pending",
            Self::Blocked => "blocked",
            Self::Implemented => "implemented",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for StoryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StoryState {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "not_started" => Ok(Self::NotStarted),
            "started" => Ok(Self::Started),
            "pending" => Ok(Self::Pending),
            "blocked" => Ok(Self::Blocked),
            "implemented" => Ok(Self::Implemented),
            "done" => Ok(Self::Done),
            _ => Err(ParseEnumError {
                expected: "story state",
                got: s.to_string(),
            }),
        }
    }
}

/// A persisted story.
///
/// `rank` is only meaningful relative to other stories of the same
/// `backlog`: no two stories of one backlog share a rank, but gaps between
/// consecutive ranks are allowed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Story {
    pub id: StoryId,
    pub name: String,
    pub rank: i64,
    pub backlog: BacklogId,
    #[serde(default)]
    pub parent: Option<StoryId>,
    #[serde(default)]
    pub children: BTreeSet<StoryId>,
    #[serde(default)]
    pub responsibles: BTreeSet<UserId>,
    #[serde(default)]
    pub tasks: Vec<TaskId>,
    #[serde(default)]
    pub hour_entries: Vec<HourEntryId>,
    #[serde(default)]
    pub story_points: Option<u32>,
    #[serde(default)]
    pub state: StoryState,
}

impl Story {
    /// A bare story with no relations, mostly useful for fixtures.
    #[must_use]
    pub fn new(id: StoryId, name: impl Into<String>, backlog: BacklogId, rank: i64) -> Self {
        Self {
            id,
            name: name.into(),
            rank,
            backlog,
            parent: None,
            children: BTreeSet::new(),
            responsibles: BTreeSet::new(),
            tasks: Vec::new(),
            hour_entries: Vec::new(),
            story_points: None,
            state: StoryState::default(),
        }
    }

    #[must_use]
    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    /// Whether tasks or hour entries still hang off this story.
    #[must_use]
    pub fn has_attached_work(&self) -> bool {
        !self.tasks.is_empty() || !self.hour_entries.is_empty()
    }
}

/// Fields for a story that has not been persisted yet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewStory {
    pub name: String,
    pub backlog: Option<BacklogId>,
    pub parent: Option<StoryId>,
    pub responsibles: BTreeSet<UserId>,
    pub story_points: Option<u32>,
    pub state: StoryState,
}

impl NewStory {
    #[must_use]
    pub fn named(name: impl Into<String>, backlog: BacklogId) -> Self {
        Self {
            name: name.into(),
            backlog: Some(backlog),
            ..Self::default()
        }
    }
}

/// Field changes for an existing story. `None` leaves a field alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoryEdit {
    pub name: Option<String>,
    pub story_points: Option<u32>,
    pub state: Option<StoryState>,
}

impl StoryEdit {
    pub fn apply(&self, story: &mut Story) {
        if let Some(name) = &self.name {
            story.name.clone_from(name);
        }
        if let Some(points) = self.story_points {
            story.story_points = Some(points);
        }
        if let Some(state) = self.state {
            story.state = state;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Story, StoryEdit, StoryState};
    use crate::model::{BacklogId, StoryId, TaskId};
    use std::str::FromStr;

    #[test]
    fn state_parse_accepts_legacy_spellings() {
        assert_eq!(
            StoryState::from_str("NOT_STARTED").unwrap(),
            StoryState::NotStarted
        );
        assert_eq!(
            StoryState::from_str("not-started").unwrap(),
            StoryState::NotStarted
        );
        assert!(StoryState::from_str("wip").is_err());
    }

    #[test]
    fn story_json_fills_missing_relations() {
        let story: Story =
            serde_json::from_str(r#"{"id":7,"name":"Login","rank":3,"backlog":11}"#).unwrap();
        assert_eq!(story.id, StoryId(7));
        assert_eq!(story.backlog, BacklogId(11));
        assert!(story.children.is_empty());
        assert_eq!(story.state, StoryState::NotStarted);
    }

    #[test]
    fn attached_work_tracks_tasks() {
        let mut story = Story::new(StoryId(1), "s", BacklogId(1), 0);
        assert!(!story.has_attached_work());
        story.tasks.push(TaskId(9));
        assert!(story.has_attached_work());
    }

    #[test]
    fn edit_touches_only_given_fields() {
        let mut story = Story::new(StoryId(1), "Login", BacklogId(1), 4);
        story.story_points = Some(5);
        let edit = StoryEdit {
            state: Some(StoryState::Pending),
            ..StoryEdit::default()
        };
        edit.apply(&mut story);
        assert_eq!(story.name, "Login");
        assert_eq!(story.story_points, Some(5));
        assert_eq!(story.state, StoryState::Pending);
        assert_eq!(story.rank, 4);
    }
}
