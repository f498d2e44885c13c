use std::fmt;

use crate::lock::LockError;
use crate::model::{BacklogId, StoryId};

/// Machine-readable error codes for agent-friendly decision making.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    NotInitialized,
    ConfigParseError,
    StoryNotFound,
    BacklogNotFound,
    InvalidArgument,
    RelocationNotPermitted,
    DeleteNotPermitted,
    CorruptHierarchy,
    StorageFailed,
    LockContention,
    InternalUnexpected,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::NotInitialized => "E1001",
            Self::ConfigParseError => "E1002",
            Self::StoryNotFound => "E2001",
            Self::BacklogNotFound => "E2002",
            Self::InvalidArgument => "E2003",
            Self::RelocationNotPermitted => "E2004",
            Self::DeleteNotPermitted => "E2005",
            Self::CorruptHierarchy => "E3001",
            Self::StorageFailed => "E5001",
            Self::LockContention => "E5002",
            Self::InternalUnexpected => "E9001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::NotInitialized => "Backlog database not initialized",
            Self::ConfigParseError => "Config file parse error",
            Self::StoryNotFound => "Story not found",
            Self::BacklogNotFound => "Backlog not found",
            Self::InvalidArgument => "Invalid argument",
            Self::RelocationNotPermitted => "Relocation not permitted",
            Self::DeleteNotPermitted => "Delete not permitted",
            Self::CorruptHierarchy => "Corrupt backlog hierarchy",
            Self::StorageFailed => "Storage operation failed",
            Self::LockContention => "Lock contention",
            Self::InternalUnexpected => "Internal unexpected error",
        }
    }

    /// Optional remediation hint that can be surfaced to operators and agents.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::NotInitialized => Some("Run `bl init` to create the backlog database."),
            Self::ConfigParseError => Some("Fix syntax in .backlog/config.toml and retry."),
            Self::StoryNotFound | Self::BacklogNotFound => None,
            Self::InvalidArgument => {
                Some("Rank against a story of the same backlog; use `bl move` to relocate.")
            }
            Self::RelocationNotPermitted => {
                Some("Move the child stories first, or pick a backlog under the same product.")
            }
            Self::DeleteNotPermitted => {
                Some("Move or delete the story's tasks and hour entries before deleting it.")
            }
            Self::CorruptHierarchy => {
                Some("Every backlog chain must end at a product; fix the parent references.")
            }
            Self::StorageFailed => Some("Check the database file and write permissions."),
            Self::LockContention => Some("Retry after the other `bl` process releases its lock."),
            Self::InternalUnexpected => Some("Retry once. If persistent, report a bug with logs."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Errors surfaced by the ranking and relocation operations.
///
/// None of these are retried internally; the caller decides what to do.
#[derive(Debug, thiserror::Error)]
pub enum RankError {
    /// A required argument was absent or inconsistent (for example ranking
    /// against a story of another backlog).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("story not found: {0}")]
    StoryNotFound(StoryId),

    #[error("backlog not found: {0}")]
    BacklogNotFound(BacklogId),

    /// The move would separate a parent story from its children's product.
    #[error(
        "story {story} has child stories and cannot move from product {from_product} to product {to_product}"
    )]
    RelocationDenied {
        story: StoryId,
        from_product: BacklogId,
        to_product: BacklogId,
    },

    #[error("story {story} still has {tasks} task(s) and {hour_entries} hour entry(ies) attached")]
    DeleteDenied {
        story: StoryId,
        tasks: usize,
        hour_entries: usize,
    },

    /// The parent chain of a backlog does not end at a product.
    #[error("backlog {backlog}: {reason}")]
    CorruptHierarchy {
        backlog: BacklogId,
        reason: &'static str,
    },

    #[error(transparent)]
    Lock(#[from] LockError),

    /// A collaborator (store, repository, history recorder) failed.
    #[error("storage error: {0:#}")]
    Store(#[from] anyhow::Error),
}

impl RankError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Machine-readable code associated with this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidArgument(_) => ErrorCode::InvalidArgument,
            Self::StoryNotFound(_) => ErrorCode::StoryNotFound,
            Self::BacklogNotFound(_) => ErrorCode::BacklogNotFound,
            Self::RelocationDenied { .. } => ErrorCode::RelocationNotPermitted,
            Self::DeleteDenied { .. } => ErrorCode::DeleteNotPermitted,
            Self::CorruptHierarchy { .. } => ErrorCode::CorruptHierarchy,
            Self::Lock(err) => err.code(),
            Self::Store(_) => ErrorCode::StorageFailed,
        }
    }

    /// Optional remediation hint for operators and agents.
    #[must_use]
    pub const fn hint(&self) -> Option<&'static str> {
        self.code().hint()
    }

    /// `true` for the not-permitted family (structural violations).
    #[must_use]
    pub const fn is_not_permitted(&self) -> bool {
        matches!(self, Self::RelocationDenied { .. } | Self::DeleteDenied { .. })
    }

    /// `true` for the not-found family.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::StoryNotFound(_) | Self::BacklogNotFound(_))
    }
}

pub type Result<T, E = RankError> = std::result::Result<T, E>;
