// src/models/audit.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// Uma entrada por operação bem-sucedida, gravada na mesma transação
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuditLog {
    pub id: Uuid,
    pub actor_id: Uuid,

    #[schema(example = "prevalidate_invoice")]
    pub action: String,

    #[schema(example = "invoice")]
    pub entity: String,
    pub entity_id: Uuid,

    #[schema(value_type = Object)]
    pub details: serde_json::Value,

    pub created_at: DateTime<Utc>,
}

impl AuditLog {
    pub fn new(
        actor_id: Uuid,
        action: &str,
        entity: &str,
        entity_id: Uuid,
        details: serde_json::Value,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            actor_id,
            action: action.to_string(),
            entity: entity.to_string(),
            entity_id,
            details,
            created_at: at,
        }
    }
}
