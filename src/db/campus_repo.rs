// src/db/campus_repo.rs

use sqlx::{Executor, Postgres};
use uuid::Uuid;
use crate::{common::error::AppError, models::campus::Campus};

#[derive(Clone, Default)]
pub struct CampusRepository;

impl CampusRepository {
    pub fn new() -> Self {
        Self
    }

    pub async fn find_by_id<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Campus>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let campus = sqlx::query_as::<_, Campus>("SELECT * FROM campus WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await?;

        Ok(campus)
    }

    /// Mesmo que `find_by_id`, mas trava a linha até o fim da transação.
    pub async fn lock_by_id<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Campus>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let campus = sqlx::query_as::<_, Campus>("SELECT * FROM campus WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(executor)
            .await?;

        Ok(campus)
    }

    /// Campus atualmente dirigido por este perfil (a referência inversa).
    pub async fn find_by_director<'e, E>(
        &self,
        executor: E,
        director_id: Uuid,
    ) -> Result<Option<Campus>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let campus = sqlx::query_as::<_, Campus>("SELECT * FROM campus WHERE director_id = $1 FOR UPDATE")
            .bind(director_id)
            .fetch_optional(executor)
            .await?;

        Ok(campus)
    }

    pub async fn list_all<'e, E>(&self, executor: E) -> Result<Vec<Campus>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let campuses = sqlx::query_as::<_, Campus>("SELECT * FROM campus ORDER BY name ASC")
            .fetch_all(executor)
            .await?;

        Ok(campuses)
    }

    pub async fn set_director<'e, E>(
        &self,
        executor: E,
        campus_id: Uuid,
        director_id: Option<Uuid>,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("UPDATE campus SET director_id = $1 WHERE id = $2")
            .bind(director_id)
            .bind(campus_id)
            .execute(executor)
            .await
            .map_err(|e| {
                // O índice único garante um diretor por campus
                if let sqlx::Error::Database(db_err) = &e {
                    if db_err.is_unique_violation() {
                        return AppError::InvalidState("Este diretor já está atribuído a outro campus.".into());
                    }
                }
                e.into()
            })?;

        Ok(())
    }
}
