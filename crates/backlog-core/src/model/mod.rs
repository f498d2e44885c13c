//! Domain model: backlogs, stories and their identifiers.

pub mod backlog;
pub mod ids;
pub mod story;

pub use backlog::{Backlog, BacklogKind};
pub use ids::{BacklogId, HourEntryId, StoryId, TaskId, UserId};
pub use story::{NewStory, Story, StoryEdit, StoryState};

use std::fmt;

/// Error returned when parsing an enum value from text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseEnumError {
    pub expected: &'static str,
    pub got: String,
}

impl fmt::Display for ParseEnumError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid {}: '{}'", self.expected, self.got)
    }
}

impl std::error::Error for ParseEnumError {}

pub(crate) fn normalize(input: &str) -> String {
    input.trim().to_ascii_lowercase().replace(['-', ' '], "_")
}
