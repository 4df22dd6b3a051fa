use crate::entities::meta_entity as meta;
use crate::error::AppResult;
use crate::models::VersionsResponse;
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter};

/// Bumps one change counter. Call with the transaction that made the change.
pub async fn bump_version<C: ConnectionTrait>(conn: &C, key: &str) -> Result<(), DbErr> {
    meta::Entity::update_many()
        .col_expr(meta::Column::Value, Expr::col(meta::Column::Value).add(1))
        .filter(meta::Column::Key.eq(key))
        .exec(conn)
        .await?;
    Ok(())
}

#[derive(Clone)]
pub struct MetaService {
    pool: DatabaseConnection,
}

impl MetaService {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self { pool }
    }

    pub async fn versions(&self) -> AppResult<VersionsResponse> {
        let rows = meta::Entity::find().all(&self.pool).await?;
        let mut versions = VersionsResponse::default();
        for row in rows {
            match row.key.as_str() {
                meta::VOTES_VERSION => versions.votes_version = row.value,
                meta::ITEMS_VERSION => versions.items_version = row.value,
                meta::ALLOC_VERSION => versions.alloc_version = row.value,
                _ => {}
            }
        }
        Ok(versions)
    }
}
