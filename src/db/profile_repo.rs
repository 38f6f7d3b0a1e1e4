// src/db/profile_repo.rs

use sqlx::{Executor, Postgres};
use uuid::Uuid;
use crate::{common::error::AppError, models::profile::Profile};

// O repositório de perfis, responsável pelas interações com a tabela 'profiles'
#[derive(Clone, Default)]
pub struct ProfileRepository;

impl ProfileRepository {
    pub fn new() -> Self {
        Self
    }

    // Busca um perfil pelo seu ID (sempre relido: papel e campus nunca vêm do cliente)
    pub async fn find_by_id<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Profile>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let profile = sqlx::query_as::<_, Profile>("SELECT * FROM profiles WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await?;

        Ok(profile)
    }

    pub async fn set_campus<'e, E>(
        &self,
        executor: E,
        profile_id: Uuid,
        campus_id: Option<Uuid>,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("UPDATE profiles SET campus_id = $1 WHERE id = $2")
            .bind(campus_id)
            .bind(profile_id)
            .execute(executor)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::ProfileNotFound(profile_id));
        }
        Ok(())
    }
}
