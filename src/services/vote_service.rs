use crate::config::RaffleConfig;
use crate::entities::{
    item_entity as items, meta_entity as meta, participant_entity as participants,
    vote_entity as votes,
};
use crate::error::{AppError, AppResult};
use crate::models::{SubmissionStatus, VoteDetailResponse, VotesResponse};
use crate::services::bump_version;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Applies the submission rules to a raw vote set:
/// 1. negative points become 0
/// 2. points are capped at `max_per_item` when it is > 0
/// 3. the sum must equal `point_budget` when it is > 0
/// 4. at least `min_voted_items` entries must be > 0
pub fn prepare_votes(
    raw: &BTreeMap<i64, i32>,
    rules: &RaffleConfig,
) -> AppResult<BTreeMap<i64, i32>> {
    let prepared: BTreeMap<i64, i32> = raw
        .iter()
        .map(|(&item_id, &points)| {
            let mut points = points.max(0);
            if rules.max_per_item > 0 {
                points = points.min(rules.max_per_item);
            }
            (item_id, points)
        })
        .collect();

    let sum: i64 = prepared.values().map(|&p| i64::from(p)).sum();
    if rules.point_budget > 0 && sum != i64::from(rules.point_budget) {
        return Err(AppError::ValidationError(format!(
            "Points must add up to exactly {} (currently {})",
            rules.point_budget, sum
        )));
    }

    let voted = prepared.values().filter(|&&p| p > 0).count();
    if voted < rules.min_voted_items {
        return Err(AppError::ValidationError(format!(
            "Vote on at least {} items (currently {})",
            rules.min_voted_items, voted
        )));
    }

    Ok(prepared)
}

#[derive(Clone)]
pub struct VoteService {
    pool: DatabaseConnection,
    rules: RaffleConfig,
}

impl VoteService {
    pub fn new(pool: DatabaseConnection, rules: RaffleConfig) -> Self {
        Self { pool, rules }
    }

    /// item id -> points for one participant. Items without a row are absent.
    pub async fn get_votes(&self, participant_id: i64) -> AppResult<BTreeMap<i64, i32>> {
        let rows = votes::Entity::find()
            .filter(votes::Column::ParticipantId.eq(participant_id))
            .all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(|v| (v.item_id, v.points)).collect())
    }

    pub async fn get_votes_response(&self, participant_id: i64) -> AppResult<VotesResponse> {
        self.ensure_participant(participant_id).await?;
        let vote_set = self.get_votes(participant_id).await?;
        let total = vote_set.values().map(|&p| i64::from(p)).sum();
        Ok(VotesResponse {
            participant_id,
            votes: vote_set,
            total,
        })
    }

    /// Votes with item names, ordered by category then item name.
    pub async fn get_votes_detailed(
        &self,
        participant_id: i64,
    ) -> AppResult<Vec<VoteDetailResponse>> {
        self.ensure_participant(participant_id).await?;
        let vote_set = self.get_votes(participant_id).await?;
        let item_list = items::Entity::find()
            .order_by_asc(items::Column::Category)
            .order_by_asc(items::Column::Name)
            .all(&self.pool)
            .await?;

        Ok(item_list
            .into_iter()
            .filter_map(|it| {
                vote_set.get(&it.id).map(|&points| VoteDetailResponse {
                    item_id: it.id,
                    category: it.category,
                    item_name: it.name,
                    points,
                })
            })
            .collect())
    }

    /// Validates and stores a participant's full vote set.
    /// On any failure the previously stored votes stay as they were.
    pub async fn submit_votes(
        &self,
        participant_id: i64,
        raw: &BTreeMap<i64, i32>,
    ) -> AppResult<VotesResponse> {
        self.ensure_participant(participant_id).await?;
        let prepared = prepare_votes(raw, &self.rules)?;

        let known: HashSet<i64> = items::Entity::find()
            .all(&self.pool)
            .await?
            .into_iter()
            .map(|it| it.id)
            .collect();
        if let Some(unknown) = prepared.keys().find(|&&id| !known.contains(&id)) {
            return Err(AppError::ValidationError(format!("Unknown item id {unknown}")));
        }

        self.replace_votes(participant_id, &prepared).await?;

        let total = prepared.values().map(|&p| i64::from(p)).sum();
        Ok(VotesResponse {
            participant_id,
            votes: prepared,
            total,
        })
    }

    /// Deletes every vote row of the participant and inserts `vote_set`, in one
    /// transaction, so readers never see a partial set.
    pub async fn replace_votes(
        &self,
        participant_id: i64,
        vote_set: &BTreeMap<i64, i32>,
    ) -> AppResult<()> {
        let txn = self.pool.begin().await?;

        votes::Entity::delete_many()
            .filter(votes::Column::ParticipantId.eq(participant_id))
            .exec(&txn)
            .await?;

        if !vote_set.is_empty() {
            let rows = vote_set.iter().map(|(&item_id, &points)| votes::ActiveModel {
                participant_id: Set(participant_id),
                item_id: Set(item_id),
                points: Set(points),
            });
            votes::Entity::insert_many(rows).exec(&txn).await?;
        }

        bump_version(&txn, meta::VOTES_VERSION).await?;
        txn.commit().await?;
        Ok(())
    }

    pub async fn vote_sum(&self, participant_id: i64) -> AppResult<i64> {
        Ok(self
            .get_votes(participant_id)
            .await?
            .values()
            .map(|&p| i64::from(p))
            .sum())
    }

    /// True once the participant stored any vote row, or when no budget applies.
    pub async fn has_submitted(&self, participant_id: i64) -> AppResult<bool> {
        if self.rules.point_budget == 0 {
            return Ok(true);
        }
        let row = votes::Entity::find()
            .filter(votes::Column::ParticipantId.eq(participant_id))
            .one(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    /// Submission state of one participant.
    pub async fn status(&self, participant_id: i64) -> AppResult<SubmissionStatus> {
        let participant = participants::Entity::find_by_id(participant_id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Participant not found".to_string()))?;

        let vote_sum = self.vote_sum(participant_id).await?;
        let budget = i64::from(self.rules.point_budget);
        let submitted = self.has_submitted(participant_id).await? && (budget == 0 || vote_sum == budget);
        Ok(SubmissionStatus {
            participant_id,
            name: participant.name,
            vote_sum,
            submitted,
        })
    }

    /// Vote sums for everyone, oldest registration first.
    pub async fn submission_statuses(&self) -> AppResult<Vec<SubmissionStatus>> {
        let people = participants::Entity::find()
            .order_by_asc(participants::Column::CreatedAt)
            .order_by_asc(participants::Column::Name)
            .all(&self.pool)
            .await?;

        let mut sums: HashMap<i64, (i64, bool)> = HashMap::new();
        for v in votes::Entity::find().all(&self.pool).await? {
            let entry = sums.entry(v.participant_id).or_insert((0, false));
            entry.0 += i64::from(v.points);
            entry.1 = true;
        }

        let budget = i64::from(self.rules.point_budget);
        Ok(people
            .into_iter()
            .map(|p| {
                let (vote_sum, has_rows) = sums.get(&p.id).copied().unwrap_or((0, false));
                let submitted = budget == 0 || (has_rows && vote_sum == budget);
                SubmissionStatus {
                    participant_id: p.id,
                    name: p.name,
                    vote_sum,
                    submitted,
                }
            })
            .collect())
    }

    async fn ensure_participant(&self, participant_id: i64) -> AppResult<()> {
        participants::Entity::find_by_id(participant_id)
            .one(&self.pool)
            .await?
            .map(|_| ())
            .ok_or_else(|| AppError::NotFound("Participant not found".to_string()))
    }
}
