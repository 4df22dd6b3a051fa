use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::entities::participant_entity;

/// Registration request (existing names return the existing participant)
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct RegisterParticipantRequest {
    /// Display name, trimmed; must not be empty
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ParticipantResponse {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl From<participant_entity::Model> for ParticipantResponse {
    fn from(m: participant_entity::Model) -> Self {
        ParticipantResponse {
            id: m.id,
            name: m.name,
            created_at: m.created_at,
        }
    }
}
