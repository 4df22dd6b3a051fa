use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

pub const VOTES_VERSION: &str = "votes_version";
pub const ITEMS_VERSION: &str = "items_version";
pub const ALLOC_VERSION: &str = "alloc_version";

/// Monotonic change counters, bumped whenever votes, items or results change.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "meta")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub key: String,
    pub value: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
