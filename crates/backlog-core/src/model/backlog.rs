use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use super::{BacklogId, ParseEnumError, normalize};

/// The three levels of the backlog hierarchy.
///
/// A Product is always a root. Projects hang under Products and Iterations
/// hang under Projects (or directly under a Product for standalone
/// iterations).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BacklogKind {
    Product,
    Project,
    Iteration,
}

impl BacklogKind {
    pub(crate) const fn as_str(self) -> &'static str {
        match self {
            Self::Product => "product",
            Self::Project => "project",
            Self::Iteration => "iteration",
        }
    }

    /// Whether a backlog of this kind may carry a parent reference.
    #[must_use]
    pub const fn has_parent(self) -> bool {
        !matches!(self, Self::Product)
    }
}

impl fmt::Display for BacklogKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BacklogKind {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "product" => Ok(Self::Product),
            "project" => Ok(Self::Project),
            "iteration" => Ok(Self::Iteration),
            _ => Err(ParseEnumError {
                expected: "backlog kind",
                got: s.to_string(),
            }),
        }
    }
}

/// A container of stories with its own rank space.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Backlog {
    pub id: BacklogId,
    pub name: String,
    pub kind: BacklogKind,
    /// Enclosing backlog. Always `None` for a Product.
    pub parent: Option<BacklogId>,
}

impl Backlog {
    #[must_use]
    pub fn product(id: BacklogId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            kind: BacklogKind::Product,
            parent: None,
        }
    }

    #[must_use]
    pub fn project(id: BacklogId, name: impl Into<String>, product: BacklogId) -> Self {
        Self {
            id,
            name: name.into(),
            kind: BacklogKind::Project,
            parent: Some(product),
        }
    }

    #[must_use]
    pub fn iteration(id: BacklogId, name: impl Into<String>, parent: BacklogId) -> Self {
        Self {
            id,
            name: name.into(),
            kind: BacklogKind::Iteration,
            parent: Some(parent),
        }
    }

    #[must_use]
    pub const fn is_product(&self) -> bool {
        matches!(self.kind, BacklogKind::Product)
    }
}
