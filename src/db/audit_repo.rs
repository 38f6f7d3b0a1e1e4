// src/db/audit_repo.rs

use sqlx::{Executor, Postgres};
use crate::{common::error::AppError, models::audit::AuditLog};

#[derive(Clone, Default)]
pub struct AuditRepository;

impl AuditRepository {
    pub fn new() -> Self {
        Self
    }

    pub async fn insert<'e, E>(&self, executor: E, entry: &AuditLog) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            INSERT INTO audit_logs (id, actor_id, action, entity, entity_id, details, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
            .bind(entry.id)
            .bind(entry.actor_id)
            .bind(&entry.action)
            .bind(&entry.entity)
            .bind(entry.entity_id)
            .bind(&entry.details)
            .bind(entry.created_at)
            .execute(executor)
            .await?;

        Ok(())
    }
}
