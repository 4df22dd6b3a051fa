use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::entities::run_entity;

use super::SubmissionStatus;

#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
pub struct RunDrawRequest {
    /// Seed string; defaults to the current unix time in seconds
    #[serde(default)]
    pub seed: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DrawResponse {
    pub run_id: String,
    pub seed: String,
    pub allocation_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RunResponse {
    pub id: String,
    pub seed: String,
    pub created_at: DateTime<Utc>,
}

impl From<run_entity::Model> for RunResponse {
    fn from(m: run_entity::Model) -> Self {
        RunResponse {
            id: m.id,
            seed: m.seed,
            created_at: m.created_at,
        }
    }
}

/// Allocation joined with item and participant names
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AllocationResponse {
    pub id: i64,
    pub item_id: i64,
    pub item_name: String,
    pub category: String,
    pub participant_id: Option<i64>,
    pub participant_name: Option<String>,
    /// "A", "B" or "B_rest"
    pub phase: String,
    #[schema(value_type = Object)]
    pub weight_snapshot: serde_json::Value,
}

/// Winnings of one participant (or the unclaimed pile when `participant_id` is None)
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ParticipantWinnings {
    pub participant_id: Option<i64>,
    pub participant_name: Option<String>,
    pub count: usize,
    /// Item names, sorted
    pub items: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ResultsResponse {
    pub run: RunResponse,
    pub allocations: Vec<AllocationResponse>,
    pub by_participant: Vec<ParticipantWinnings>,
}

/// Change counters for pollers
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct VersionsResponse {
    pub votes_version: i64,
    pub items_version: i64,
    pub alloc_version: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OverviewResponse {
    pub item_count: usize,
    pub participant_count: usize,
    pub point_budget: i32,
    pub submitted_count: usize,
    pub participants: Vec<SubmissionStatus>,
    pub latest_run_id: Option<String>,
}
