use crate::allocation::{AllocationEngine, DrawItem, VoteMatrix, WinPenalty};
use crate::entities::{
    allocation_entity as allocations, item_entity as items, meta_entity as meta,
    participant_entity as participants, run_entity as runs, vote_entity as votes,
};
use crate::error::{AppError, AppResult};
use crate::models::{
    AllocationResponse, DrawResponse, OverviewResponse, ParticipantWinnings, ResultsResponse,
    RunResponse,
};
use crate::services::{AdminLock, VoteService, bump_version};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use std::collections::{BTreeMap, HashMap};

/// Time-derived seed used when the admin leaves the seed blank.
pub fn default_seed() -> String {
    Utc::now().timestamp().to_string()
}

/// The supplied seed as given, or the default when it is missing or blank.
pub fn resolve_seed(seed: Option<String>) -> String {
    seed.filter(|s| !s.trim().is_empty())
        .unwrap_or_else(default_seed)
}

#[derive(Clone)]
pub struct DrawService {
    pool: DatabaseConnection,
    vote_service: VoteService,
    penalty: WinPenalty,
    point_budget: i32,
    admin_lock: AdminLock,
}

impl DrawService {
    pub fn new(
        pool: DatabaseConnection,
        vote_service: VoteService,
        penalty: WinPenalty,
        point_budget: i32,
        admin_lock: AdminLock,
    ) -> Self {
        Self {
            pool,
            vote_service,
            penalty,
            point_budget,
            admin_lock,
        }
    }

    /// Runs the draw (Draw)
    ///
    /// Steps:
    /// 1. load items, participants and all votes
    /// 2. compute the full two-phase allocation in memory
    /// 3. in one transaction: clear old runs/allocations, write the run and
    ///    every allocation row in draw order
    ///
    /// A precondition failure (no items / no participants) returns before
    /// anything is written.
    pub async fn run_draw(&self, seed: Option<String>) -> AppResult<DrawResponse> {
        let seed = resolve_seed(seed);

        // one draw (or clear / import) at a time
        let _guard = self.admin_lock.lock().await;

        // items, participants and votes from one snapshot
        let read = self.pool.begin().await?;
        let item_list = items::Entity::find()
            .order_by_asc(items::Column::Id)
            .all(&read)
            .await?;
        let participant_ids: Vec<i64> = participants::Entity::find()
            .order_by_asc(participants::Column::Id)
            .all(&read)
            .await?
            .into_iter()
            .map(|p| p.id)
            .collect();

        let mut matrix = VoteMatrix::new();
        for v in votes::Entity::find().all(&read).await? {
            matrix
                .entry(v.participant_id)
                .or_default()
                .insert(v.item_id, v.points);
        }
        read.commit().await?;

        let draw_items: Vec<DrawItem> = item_list
            .iter()
            .map(|it| DrawItem {
                id: it.id,
                name: it.name.clone(),
                quantity: it.quantity,
            })
            .collect();

        log::info!(
            "Starting draw: seed={seed}, items={}, participants={}",
            draw_items.len(),
            participant_ids.len()
        );

        let outcome =
            AllocationEngine::new(&self.penalty).draw(&seed, &draw_items, &participant_ids, &matrix)?;

        let now = Utc::now();
        let run_id = format!("run_{}", now.timestamp());

        let mut rows = Vec::with_capacity(outcome.allocations.len());
        for alloc in &outcome.allocations {
            rows.push(allocations::ActiveModel {
                run_id: Set(run_id.clone()),
                item_id: Set(alloc.item_id),
                participant_id: Set(alloc.participant_id),
                weight_snapshot: Set(serde_json::to_value(&alloc.snapshot)?),
                created_at: Set(now),
                ..Default::default()
            });
        }

        let txn = self.pool.begin().await?;
        allocations::Entity::delete_many().exec(&txn).await?;
        runs::Entity::delete_many().exec(&txn).await?;

        runs::ActiveModel {
            id: Set(run_id.clone()),
            seed: Set(seed.clone()),
            created_at: Set(now),
        }
        .insert(&txn)
        .await?;

        // ids follow insertion order, which keeps the draw order queryable
        for chunk in rows.chunks(500) {
            allocations::Entity::insert_many(chunk.to_vec())
                .exec(&txn)
                .await?;
        }

        bump_version(&txn, meta::ALLOC_VERSION).await?;
        txn.commit().await?;

        log::info!(
            "Draw {run_id} finished: {} allocations, wins={:?}",
            outcome.allocations.len(),
            outcome.win_counts
        );

        Ok(DrawResponse {
            run_id,
            seed,
            allocation_count: outcome.allocations.len(),
        })
    }

    /// Removes items, votes, allocations and runs.
    pub async fn clear_all(&self) -> AppResult<()> {
        let _guard = self.admin_lock.lock().await;
        let txn = self.pool.begin().await?;

        allocations::Entity::delete_many().exec(&txn).await?;
        runs::Entity::delete_many().exec(&txn).await?;
        votes::Entity::delete_many().exec(&txn).await?;
        items::Entity::delete_many().exec(&txn).await?;

        bump_version(&txn, meta::ITEMS_VERSION).await?;
        bump_version(&txn, meta::VOTES_VERSION).await?;
        bump_version(&txn, meta::ALLOC_VERSION).await?;
        txn.commit().await?;

        log::warn!("Cleared items, votes and results");
        Ok(())
    }

    /// Removes allocations and runs only; votes and items stay.
    pub async fn clear_results(&self) -> AppResult<()> {
        let _guard = self.admin_lock.lock().await;
        let txn = self.pool.begin().await?;

        allocations::Entity::delete_many().exec(&txn).await?;
        runs::Entity::delete_many().exec(&txn).await?;

        bump_version(&txn, meta::ALLOC_VERSION).await?;
        txn.commit().await?;

        log::warn!("Cleared draw results");
        Ok(())
    }

    pub async fn latest_run(&self) -> AppResult<Option<runs::Model>> {
        Ok(runs::Entity::find()
            .order_by_desc(runs::Column::CreatedAt)
            .order_by_desc(runs::Column::Id)
            .one(&self.pool)
            .await?)
    }

    /// Allocation rows of a run in draw order.
    pub async fn allocations_for_run(&self, run_id: &str) -> AppResult<Vec<allocations::Model>> {
        Ok(allocations::Entity::find()
            .filter(allocations::Column::RunId.eq(run_id))
            .order_by_asc(allocations::Column::Id)
            .all(&self.pool)
            .await?)
    }

    /// Results of a run: allocations by category and item name, plus a
    /// per-participant summary (most units first, then name).
    pub async fn results(&self, run_id: &str) -> AppResult<ResultsResponse> {
        let run = runs::Entity::find_by_id(run_id.to_string())
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Run {run_id} not found")))?;

        let rows = self.allocations_for_run(run_id).await?;
        let item_by_id: HashMap<i64, items::Model> = items::Entity::find()
            .all(&self.pool)
            .await?
            .into_iter()
            .map(|it| (it.id, it))
            .collect();
        let name_by_id: HashMap<i64, String> = participants::Entity::find()
            .all(&self.pool)
            .await?
            .into_iter()
            .map(|p| (p.id, p.name))
            .collect();

        let mut allocations_out: Vec<AllocationResponse> = rows
            .into_iter()
            .map(|row| {
                let item = item_by_id.get(&row.item_id);
                let phase = row
                    .weight_snapshot
                    .get("phase")
                    .and_then(|p| p.as_str())
                    .unwrap_or_default()
                    .to_string();
                AllocationResponse {
                    id: row.id,
                    item_id: row.item_id,
                    item_name: item.map(|it| it.name.clone()).unwrap_or_default(),
                    category: item.map(|it| it.category.clone()).unwrap_or_default(),
                    participant_id: row.participant_id,
                    participant_name: row
                        .participant_id
                        .and_then(|pid| name_by_id.get(&pid).cloned()),
                    phase,
                    weight_snapshot: row.weight_snapshot,
                }
            })
            .collect();
        allocations_out.sort_by(|a, b| {
            a.category
                .cmp(&b.category)
                .then_with(|| a.item_name.cmp(&b.item_name))
                .then_with(|| a.id.cmp(&b.id))
        });

        let by_participant = summarize_by_participant(&allocations_out);

        Ok(ResultsResponse {
            run: RunResponse::from(run),
            allocations: allocations_out,
            by_participant,
        })
    }

    pub async fn latest_results(&self) -> AppResult<Option<ResultsResponse>> {
        match self.latest_run().await? {
            Some(run) => Ok(Some(self.results(&run.id).await?)),
            None => Ok(None),
        }
    }

    /// Admin dashboard numbers.
    pub async fn overview(&self) -> AppResult<OverviewResponse> {
        let item_count = items::Entity::find().count(&self.pool).await? as usize;
        let statuses = self.vote_service.submission_statuses().await?;
        let latest_run_id = self.latest_run().await?.map(|r| r.id);

        Ok(OverviewResponse {
            item_count,
            participant_count: statuses.len(),
            point_budget: self.point_budget,
            submitted_count: statuses.iter().filter(|s| s.submitted).count(),
            participants: statuses,
            latest_run_id,
        })
    }
}

fn summarize_by_participant(rows: &[AllocationResponse]) -> Vec<ParticipantWinnings> {
    let mut grouped: BTreeMap<Option<i64>, ParticipantWinnings> = BTreeMap::new();
    for row in rows {
        let entry = grouped
            .entry(row.participant_id)
            .or_insert_with(|| ParticipantWinnings {
                participant_id: row.participant_id,
                participant_name: row.participant_name.clone(),
                count: 0,
                items: Vec::new(),
            });
        entry.count += 1;
        entry.items.push(row.item_name.clone());
    }

    let mut out: Vec<ParticipantWinnings> = grouped.into_values().collect();
    for w in &mut out {
        w.items.sort();
    }
    out.sort_by(|a, b| {
        b.count.cmp(&a.count).then_with(|| {
            let an = a.participant_name.as_deref().unwrap_or_default().to_lowercase();
            let bn = b.participant_name.as_deref().unwrap_or_default().to_lowercase();
            an.cmp(&bn)
        })
    });
    out
}
