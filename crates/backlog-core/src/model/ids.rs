//! Integer identifiers for persisted records.
//!
//! Every identifier is a thin newtype over `i64` so that a story id can never
//! be passed where a backlog id is expected. They serialize as bare integers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

macro_rules! record_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            #[must_use]
            pub const fn get(self) -> i64 {
                self.0
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim().parse::<i64>().map(Self)
            }
        }
    };
}

record_id!(
    /// Identifier of a Product, Project or Iteration.
    BacklogId
);
record_id!(
    /// Identifier of a story.
    StoryId
);
record_id!(
    /// Identifier of a user that can be responsible for stories.
    UserId
);
record_id!(TaskId);
record_id!(HourEntryId);
