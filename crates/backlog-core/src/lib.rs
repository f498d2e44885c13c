//! backlog-core library.
//!
//! Story ranking inside a backlog, relocation of stories between backlogs of
//! the Product → Project → Iteration hierarchy, and history invalidation
//! after every membership or order change.
//!
//! # Conventions
//!
//! - **Errors**: domain operations return [`error::RankError`]; storage
//!   collaborators use `anyhow::Result`.
//! - **Logging**: `tracing` macros with structured fields.

pub mod config;
pub mod db;
pub mod error;
pub mod hierarchy;
pub mod history;
pub mod lock;
pub mod model;
pub mod rank;
pub mod relocate;
pub mod store;

pub use error::{ErrorCode, RankError};
pub use history::{HistoryDispatcher, HistoryUpdate};
pub use model::{
    Backlog, BacklogId, BacklogKind, NewStory, Story, StoryEdit, StoryId, StoryState, UserId,
};
pub use relocate::{Relocation, Relocator, StoryUpdate};
pub use store::{BacklogRepository, HistoryRecorder, StoryStore};
