use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;

/// Full vote set of one participant; replaces whatever was stored before.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct SubmitVotesRequest {
    /// item id -> points
    pub votes: BTreeMap<i64, i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct VotesResponse {
    pub participant_id: i64,
    /// item id -> points (items without a row are 0)
    pub votes: BTreeMap<i64, i32>,
    pub total: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct VoteDetailResponse {
    pub item_id: i64,
    pub category: String,
    pub item_name: String,
    pub points: i32,
}

/// Per-participant submission state for the admin overview
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SubmissionStatus {
    pub participant_id: i64,
    pub name: String,
    pub vote_sum: i64,
    /// Sum matches the point budget (always true when the budget is 0)
    pub submitted: bool,
}
