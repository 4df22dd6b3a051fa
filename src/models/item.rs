use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::entities::item_entity;

/// One row of an item import. Mirrors the spreadsheet columns
/// `name`, `category` (optional) and `quantity` (optional).
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct ImportItemRow {
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    /// Number or numeric string; anything else counts as 1
    #[serde(default)]
    #[schema(value_type = Option<Object>)]
    pub quantity: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct ImportItemsRequest {
    pub items: Vec<ImportItemRow>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ImportItemsResponse {
    /// Rows actually stored (blank names are skipped)
    pub imported: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ItemResponse {
    pub id: i64,
    pub name: String,
    pub category: String,
    pub quantity: i32,
}

impl From<item_entity::Model> for ItemResponse {
    fn from(m: item_entity::Model) -> Self {
        ItemResponse {
            id: m.id,
            name: m.name,
            category: m.category,
            quantity: m.quantity,
        }
    }
}

/// Item with the points everyone put on it
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ItemTotalsResponse {
    pub id: i64,
    pub name: String,
    pub category: String,
    pub quantity: i32,
    /// Sum of all participants' points
    pub total_points: i64,
    /// Participants with points > 0 on this item
    pub voters: i64,
}
