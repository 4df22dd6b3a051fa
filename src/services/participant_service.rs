use crate::entities::{
    allocation_entity as allocations, meta_entity as meta, participant_entity as participants,
    vote_entity as votes,
};
use crate::error::{AppError, AppResult};
use crate::models::ParticipantResponse;
use crate::services::{AdminLock, bump_version};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};

#[derive(Clone)]
pub struct ParticipantService {
    pool: DatabaseConnection,
    admin_lock: AdminLock,
}

impl ParticipantService {
    pub fn new(pool: DatabaseConnection, admin_lock: AdminLock) -> Self {
        Self { pool, admin_lock }
    }

    /// Registers a participant, or returns the existing one with the same name.
    pub async fn register(&self, name: &str) -> AppResult<ParticipantResponse> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::ValidationError(
                "Name must not be empty".to_string(),
            ));
        }

        if let Some(existing) = self.find_by_name(name).await? {
            return Ok(existing.into());
        }

        let inserted = participants::ActiveModel {
            name: Set(name.to_string()),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&self.pool)
        .await;

        match inserted {
            Ok(model) => {
                log::info!("Registered participant {} ({})", model.name, model.id);
                Ok(model.into())
            }
            // lost a race against a concurrent registration of the same name
            Err(e) => match self.find_by_name(name).await? {
                Some(existing) => Ok(existing.into()),
                None => Err(e.into()),
            },
        }
    }

    /// All participants, oldest registration first.
    pub async fn list(&self) -> AppResult<Vec<ParticipantResponse>> {
        let list = participants::Entity::find()
            .order_by_asc(participants::Column::CreatedAt)
            .order_by_asc(participants::Column::Name)
            .all(&self.pool)
            .await?;
        Ok(list.into_iter().map(Into::into).collect())
    }

    pub async fn get(&self, participant_id: i64) -> AppResult<ParticipantResponse> {
        participants::Entity::find_by_id(participant_id)
            .one(&self.pool)
            .await?
            .map(Into::into)
            .ok_or_else(|| AppError::NotFound("Participant not found".to_string()))
    }

    /// Removes a participant together with their votes and any units they won.
    /// Waits for a running draw so its allocations never point at a deleted row.
    pub async fn delete(&self, participant_id: i64) -> AppResult<()> {
        let _guard = self.admin_lock.lock().await;
        let txn = self.pool.begin().await?;

        let participant = participants::Entity::find_by_id(participant_id)
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::NotFound("Participant not found".to_string()))?;

        votes::Entity::delete_many()
            .filter(votes::Column::ParticipantId.eq(participant_id))
            .exec(&txn)
            .await?;
        allocations::Entity::delete_many()
            .filter(allocations::Column::ParticipantId.eq(participant_id))
            .exec(&txn)
            .await?;
        participants::Entity::delete_by_id(participant_id)
            .exec(&txn)
            .await?;

        bump_version(&txn, meta::VOTES_VERSION).await?;
        bump_version(&txn, meta::ALLOC_VERSION).await?;
        txn.commit().await?;

        log::info!(
            "Deleted participant {} ({}) with votes and allocations",
            participant.name,
            participant_id
        );
        Ok(())
    }

    async fn find_by_name(&self, name: &str) -> AppResult<Option<participants::Model>> {
        Ok(participants::Entity::find()
            .filter(participants::Column::Name.eq(name))
            .one(&self.pool)
            .await?)
    }
}
