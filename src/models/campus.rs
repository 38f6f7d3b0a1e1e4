// src/models/campus.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// O local físico de ensino (Site)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Campus {
    #[schema(example = "550e8400-e29b-41d4-a716-446655440010")]
    pub id: Uuid,

    #[schema(example = "Roquette")]
    pub name: String,

    #[schema(example = "12 rue de la Roquette, Paris")]
    pub address: Option<String>,

    // Referência fraca: o diretor não pertence ao campus
    pub director_id: Option<Uuid>,

    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssignDirectorPayload {
    #[schema(example = "550e8400-e29b-41d4-a716-446655440000")]
    pub director_id: Uuid,
}
