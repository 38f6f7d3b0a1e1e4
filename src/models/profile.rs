// src/models/profile.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Enums (Mapeando o Postgres) ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "user_role", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    SuperAdmin,
    DirecteurCampus,
    Comptable,
    Enseignant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::SuperAdmin => "SUPER_ADMIN",
            Role::DirecteurCampus => "DIRECTEUR_CAMPUS",
            Role::Comptable => "COMPTABLE",
            Role::Enseignant => "ENSEIGNANT",
        }
    }

    /// Papéis que fazem a validação financeira e marcam o pagamento.
    pub fn is_finance(self) -> bool {
        match self {
            Role::SuperAdmin | Role::Comptable => true,
            Role::DirecteurCampus | Role::Enseignant => false,
        }
    }

    /// Papéis cujo campus é obrigatório para agir.
    pub fn is_campus_scoped(self) -> bool {
        match self {
            Role::DirecteurCampus | Role::Enseignant => true,
            Role::SuperAdmin | Role::Comptable => false,
        }
    }
}

// --- Structs ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    #[schema(example = "550e8400-e29b-41d4-a716-446655440000")]
    pub id: Uuid,

    #[schema(example = "direction.paris@ecole.fr")]
    pub email: String,

    #[schema(example = "Claire Martin")]
    pub full_name: String,

    pub role: Role,

    pub campus_id: Option<Uuid>,

    pub created_at: DateTime<Utc>,
}

impl Profile {
    /// O campus do ator, exigido para papéis com escopo de campus.
    pub fn scoped_campus(&self) -> Option<Uuid> {
        if self.role.is_campus_scoped() {
            self.campus_id
        } else {
            None
        }
    }
}
