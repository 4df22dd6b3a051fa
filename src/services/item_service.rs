use crate::entities::{
    allocation_entity as allocations, item_entity as items, meta_entity as meta,
    run_entity as runs, vote_entity as votes,
};
use crate::error::AppResult;
use crate::models::{ImportItemRow, ItemResponse, ItemTotalsResponse};
use crate::services::{AdminLock, bump_version};
use sea_orm::{DatabaseConnection, EntityTrait, QueryOrder, Set, TransactionTrait};
use std::collections::HashMap;

/// Import row after clean-up, ready to insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewItem {
    pub name: String,
    pub category: String,
    pub quantity: i32,
}

/// Reads a quantity cell: integers, floats and numeric strings are accepted,
/// anything else becomes 1; values below 1 become 1.
pub fn coerce_quantity(value: Option<&serde_json::Value>) -> i32 {
    let parsed = match value {
        Some(serde_json::Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        Some(serde_json::Value::String(s)) => {
            let s = s.trim();
            s.parse::<i64>().ok().or_else(|| {
                s.parse::<f64>()
                    .ok()
                    .filter(|f| f.is_finite())
                    .map(|f| f.trunc() as i64)
            })
        }
        _ => None,
    };
    parsed
        .unwrap_or(1)
        .clamp(1, i64::from(i32::MAX)) as i32
}

/// Trims names and categories, drops rows without a name and fixes quantities.
pub fn normalize_rows(rows: &[ImportItemRow]) -> Vec<NewItem> {
    rows.iter()
        .filter_map(|row| {
            let name = row.name.trim();
            if name.is_empty() {
                return None;
            }
            Some(NewItem {
                name: name.to_string(),
                category: row
                    .category
                    .as_deref()
                    .map(str::trim)
                    .unwrap_or_default()
                    .to_string(),
                quantity: coerce_quantity(row.quantity.as_ref()),
            })
        })
        .collect()
}

#[derive(Clone)]
pub struct ItemService {
    pool: DatabaseConnection,
    admin_lock: AdminLock,
}

impl ItemService {
    pub fn new(pool: DatabaseConnection, admin_lock: AdminLock) -> Self {
        Self { pool, admin_lock }
    }

    /// Items ordered by category, then name.
    pub async fn list(&self) -> AppResult<Vec<ItemResponse>> {
        let list = items::Entity::find()
            .order_by_asc(items::Column::Category)
            .order_by_asc(items::Column::Name)
            .all(&self.pool)
            .await?;
        Ok(list.into_iter().map(Into::into).collect())
    }

    /// Items with total points and voter counts, most wanted first.
    pub async fn list_with_totals(&self) -> AppResult<Vec<ItemTotalsResponse>> {
        let item_list = items::Entity::find().all(&self.pool).await?;
        let vote_list = votes::Entity::find().all(&self.pool).await?;

        let mut totals: HashMap<i64, (i64, i64)> = HashMap::new();
        for v in vote_list {
            let entry = totals.entry(v.item_id).or_insert((0, 0));
            entry.0 += i64::from(v.points);
            if v.points > 0 {
                entry.1 += 1;
            }
        }

        let mut out: Vec<ItemTotalsResponse> = item_list
            .into_iter()
            .map(|it| {
                let (total_points, voters) = totals.get(&it.id).copied().unwrap_or((0, 0));
                ItemTotalsResponse {
                    id: it.id,
                    name: it.name,
                    category: it.category,
                    quantity: it.quantity,
                    total_points,
                    voters,
                }
            })
            .collect();
        out.sort_by(|a, b| {
            b.total_points
                .cmp(&a.total_points)
                .then_with(|| a.category.cmp(&b.category))
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(out)
    }

    /// Replaces the whole catalog. Votes, allocations and runs go with it.
    pub async fn import(&self, rows: &[ImportItemRow]) -> AppResult<usize> {
        let new_items = normalize_rows(rows);

        let _guard = self.admin_lock.lock().await;
        let txn = self.pool.begin().await?;

        allocations::Entity::delete_many().exec(&txn).await?;
        runs::Entity::delete_many().exec(&txn).await?;
        votes::Entity::delete_many().exec(&txn).await?;
        items::Entity::delete_many().exec(&txn).await?;

        if !new_items.is_empty() {
            let models = new_items.iter().map(|it| items::ActiveModel {
                name: Set(it.name.clone()),
                category: Set(it.category.clone()),
                quantity: Set(it.quantity),
                ..Default::default()
            });
            items::Entity::insert_many(models).exec(&txn).await?;
        }

        bump_version(&txn, meta::ITEMS_VERSION).await?;
        bump_version(&txn, meta::VOTES_VERSION).await?;
        bump_version(&txn, meta::ALLOC_VERSION).await?;
        txn.commit().await?;

        log::info!(
            "Imported {} items ({} rows received); votes and results cleared",
            new_items.len(),
            rows.len()
        );
        Ok(new_items.len())
    }
}
