//! Draw core: win-penalty weights, seeded weighted sampling and the two-phase
//! allocation engine. Nothing in here touches the database.

pub mod engine;
pub mod sampler;
pub mod weights;

use std::collections::HashMap;
use thiserror::Error;

pub use engine::{Allocation, AllocationEngine, DrawItem, DrawOutcome, RestRule, WeightSnapshot};
pub use sampler::{seeded_rng, weighted_choice};
pub use weights::{WinPenalty, item_competition_score};

/// participant id -> (item id -> points). Missing entries mean 0 points.
pub type VoteMatrix = HashMap<i64, HashMap<i64, i32>>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DrawError {
    #[error("No items have been imported")]
    NoItems,

    #[error("No participants are registered")]
    NoParticipants,

    #[error("Empty or non-positive weights")]
    EmptyWeights,
}
