//! Backlog hierarchy queries and relocation legality.
//!
//! Backlogs form a shallow tree: Product → Project → Iteration (iterations may
//! also hang directly under a product). Two questions matter when a story
//! changes backlog:
//!
//! - Which **product** encloses a backlog? [`parent_product`] walks the
//!   `parent` references until it reaches a Product.
//! - Is the move **legal**? [`check_relocation`] forbids moving a story that
//!   has child stories into another product, and tells the caller to sever
//!   the story's own parent link when that parent lives under another product
//!   than the destination.
//!
//! # Corrupt hierarchies
//!
//! A chain that is longer than the hierarchy depth, loops back on itself,
//! ends in a non-Product root or references a missing parent is reported as
//! [`RankError::CorruptHierarchy`].

use serde::{Deserialize, Serialize};

use crate::error::{RankError, Result};
use crate::model::{Backlog, BacklogId, BacklogKind, Story, UserId};
use crate::store::{BacklogRepository, StoryStore};

/// Number of levels in the backlog hierarchy.
pub const MAX_DEPTH: usize = 3;

/// Resolve a backlog by id.
///
/// # Errors
///
/// [`RankError::BacklogNotFound`] if it does not exist.
pub fn require_backlog(backlogs: &dyn BacklogRepository, id: BacklogId) -> Result<Backlog> {
    backlogs
        .find_backlog(id)?
        .ok_or(RankError::BacklogNotFound(id))
}

/// Find the Product enclosing `id` (a Product encloses itself).
///
/// # Errors
///
/// [`RankError::BacklogNotFound`] when `id` itself does not resolve and
/// [`RankError::CorruptHierarchy`] when the parent chain is malformed.
pub fn parent_product(backlogs: &dyn BacklogRepository, id: BacklogId) -> Result<Backlog> {
    let mut current = require_backlog(backlogs, id)?;

    for _ in 0..MAX_DEPTH {
        match (current.kind, current.parent) {
            (BacklogKind::Product, None) => return Ok(current),
            (BacklogKind::Product, Some(_)) => {
                return Err(RankError::CorruptHierarchy {
                    backlog: current.id,
                    reason: "product has a parent backlog",
                });
            }
            (_, None) => {
                return Err(RankError::CorruptHierarchy {
                    backlog: current.id,
                    reason: "parent chain ends without a product",
                });
            }
            (_, Some(parent)) => {
                current =
                    backlogs
                        .find_backlog(parent)?
                        .ok_or(RankError::CorruptHierarchy {
                            backlog: current.id,
                            reason: "parent backlog does not exist",
                        })?;
            }
        }
    }

    Err(RankError::CorruptHierarchy {
        backlog: id,
        reason: "parent chain is deeper than product/project/iteration or cyclic",
    })
}

/// Outcome of a successful relocation check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelocationPlan {
    pub origin: BacklogId,
    pub destination: BacklogId,
    /// Product of the destination backlog.
    pub destination_product: BacklogId,
    /// Clear the story's parent link as part of the move.
    pub sever_parent: bool,
}

/// Decide whether `story` may move to `destination`.
///
/// # Errors
///
/// [`RankError::RelocationDenied`] when the story has children and the
/// destination lies under another product. Lookup failures propagate.
pub fn check_relocation(
    stories: &dyn StoryStore,
    backlogs: &dyn BacklogRepository,
    story: &Story,
    destination: BacklogId,
) -> Result<RelocationPlan> {
    let destination_product = parent_product(backlogs, destination)?.id;

    if story.has_children() {
        let origin_product = parent_product(backlogs, story.backlog)?.id;
        if origin_product != destination_product {
            return Err(RankError::RelocationDenied {
                story: story.id,
                from_product: origin_product,
                to_product: destination_product,
            });
        }
    }

    let sever_parent = match story.parent {
        None => false,
        Some(parent_id) => match stories.get(parent_id)? {
            Some(parent) => parent_product(backlogs, parent.backlog)?.id != destination_product,
            None => {
                tracing::warn!(story = %story.id, parent = %parent_id, "parent story is missing");
                true
            }
        },
    };

    Ok(RelocationPlan {
        origin: story.backlog,
        destination,
        destination_product,
        sever_parent,
    })
}

/// Users responsible for the project a story belongs to.
///
/// Iteration stories use the iteration's parent project, project stories use
/// their own project; product stories (and standalone iterations directly
/// under a product) have no project and yield nothing.
///
/// # Errors
///
/// Propagates lookup failures.
pub fn project_responsibles(backlogs: &dyn BacklogRepository, story: &Story) -> Result<Vec<UserId>> {
    let backlog = require_backlog(backlogs, story.backlog)?;
    let project = match backlog.kind {
        BacklogKind::Project => Some(backlog.id),
        BacklogKind::Iteration => match backlog.parent {
            Some(parent) => {
                let parent = require_backlog(backlogs, parent)?;
                (parent.kind == BacklogKind::Project).then_some(parent.id)
            }
            None => None,
        },
        BacklogKind::Product => None,
    };

    match project {
        Some(project) => Ok(backlogs.assigned_users(project)?),
        None => Ok(Vec::new()),
    }
}
