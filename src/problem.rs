//! Path selection instances and their solutions.
//!
//! An instance is a set of nodes and a set of candidate routes, each route being
//! the set of nodes it crosses. The *symptom* of a node is the set of routes
//! crossing it. A selection of routes *covers* the network when every symptom
//! meets the selection, and makes it *1-identifiable* when, in addition, every
//! pair of nodes is separated by a selected route crossing exactly one of them.

pub mod instance;
pub mod pair;
pub mod solution;

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

pub use instance::{compute_symptoms, Instance, Route};
pub use pair::{hash_pair, hash_pair_signed, pair_count, pairs};
pub use solution::{Solution, WEIGHT_EPSILON};

/// Index of a node in an instance.
pub type NodeId = usize;

/// Stable index of a candidate route in an instance.
pub type RouteId = usize;

/// What the selected routes must achieve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Goal {
    /// Every node is crossed by a selected route.
    Cover,
    /// Every node is covered and every pair of nodes is separated.
    #[default]
    OneId,
}

impl Goal {
    /// Whether pairwise distinguishability constraints are part of the model.
    pub fn needs_pairs(self) -> bool {
        matches!(self, Goal::OneId)
    }
}

impl fmt::Display for Goal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Goal::Cover => write!(f, "cover"),
            Goal::OneId => write!(f, "1id"),
        }
    }
}

impl FromStr for Goal {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cover" => Ok(Goal::Cover),
            "1id" => Ok(Goal::OneId),
            other => Err(Error::InvalidArgument(format!(
                "unknown goal '{other}', expected 'cover' or '1id'"
            ))),
        }
    }
}
