// src/db/invoice_repo.rs

use chrono::NaiveDate;
use sqlx::{Executor, Postgres};
use uuid::Uuid;
use crate::{
    common::error::AppError,
    db::store::InvoiceScope,
    models::invoice::{Invoice, InvoiceFilter, InvoiceLine},
};

#[derive(Clone, Default)]
pub struct InvoiceRepository;

impl InvoiceRepository {
    pub fn new() -> Self {
        Self
    }

    // =========================================================================
    //  FATURAS
    // =========================================================================

    pub async fn find_by_id<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Invoice>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let invoice = sqlx::query_as::<_, Invoice>("SELECT * FROM invoices WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await?;

        Ok(invoice)
    }

    // Trava a linha da fatura até o fim da transação: chamadas concorrentes
    // sobre a mesma fatura ficam serializadas.
    pub async fn lock_by_id<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Invoice>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let invoice = sqlx::query_as::<_, Invoice>("SELECT * FROM invoices WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(executor)
            .await?;

        Ok(invoice)
    }

    pub async fn lock_for_period<'e, E>(
        &self,
        executor: E,
        teacher_id: Uuid,
        campus_id: Uuid,
        month_year: NaiveDate,
    ) -> Result<Option<Invoice>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let invoice = sqlx::query_as::<_, Invoice>(
            r#"
            SELECT * FROM invoices
            WHERE teacher_id = $1 AND campus_id = $2 AND month_year = $3
            FOR UPDATE
            "#,
        )
            .bind(teacher_id)
            .bind(campus_id)
            .bind(month_year)
            .fetch_optional(executor)
            .await?;

        Ok(invoice)
    }

    pub async fn list<'e, E>(
        &self,
        executor: E,
        scope: InvoiceScope,
        filter: &InvoiceFilter,
    ) -> Result<Vec<Invoice>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let (campus_id, teacher_id) = match scope {
            InvoiceScope::All => (None, None),
            InvoiceScope::Campus(id) => (Some(id), None),
            InvoiceScope::Teacher(id) => (None, Some(id)),
        };

        let invoices = sqlx::query_as::<_, Invoice>(
            r#"
            SELECT * FROM invoices
            WHERE ($1::uuid IS NULL OR campus_id = $1)
              AND ($2::uuid IS NULL OR teacher_id = $2)
              AND ($3::invoice_status IS NULL OR status = $3)
              AND ($4::date IS NULL OR month_year = $4)
            ORDER BY month_year DESC, created_at DESC
            "#,
        )
            .bind(campus_id)
            .bind(teacher_id)
            .bind(filter.status)
            .bind(filter.month_year)
            .fetch_all(executor)
            .await?;

        Ok(invoices)
    }

    pub async fn insert<'e, E>(&self, executor: E, invoice: &Invoice) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            INSERT INTO invoices (
                id, teacher_id, campus_id, month_year, status, total_amount,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
            .bind(invoice.id)
            .bind(invoice.teacher_id)
            .bind(invoice.campus_id)
            .bind(invoice.month_year)
            .bind(invoice.status)
            .bind(invoice.total_amount)
            .bind(invoice.created_at)
            .bind(invoice.updated_at)
            .execute(executor)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(db_err) = &e {
                    if db_err.is_unique_violation() {
                        return AppError::InvalidState("Já existe uma fatura para este professor, campus e mês.".into());
                    }
                }
                e.into()
            })?;

        Ok(())
    }

    pub async fn update<'e, E>(&self, executor: E, invoice: &Invoice) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            UPDATE invoices
            SET status = $2, total_amount = $3,
                prevalidated_by = $4, prevalidated_at = $5,
                validated_by = $6, validated_at = $7,
                paid_by = $8, paid_at = $9, payment_date = $10,
                updated_at = $11
            WHERE id = $1
            "#,
        )
            .bind(invoice.id)
            .bind(invoice.status)
            .bind(invoice.total_amount)
            .bind(invoice.prevalidated_by)
            .bind(invoice.prevalidated_at)
            .bind(invoice.validated_by)
            .bind(invoice.validated_at)
            .bind(invoice.paid_by)
            .bind(invoice.paid_at)
            .bind(invoice.payment_date)
            .bind(invoice.updated_at)
            .execute(executor)
            .await?;

        Ok(())
    }

    // =========================================================================
    //  LINHAS
    // =========================================================================

    pub async fn find_line<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<InvoiceLine>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let line = sqlx::query_as::<_, InvoiceLine>("SELECT * FROM invoice_lines WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await?;

        Ok(line)
    }

    pub async fn list_lines<'e, E>(
        &self,
        executor: E,
        invoice_id: Uuid,
    ) -> Result<Vec<InvoiceLine>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let lines = sqlx::query_as::<_, InvoiceLine>(
            "SELECT * FROM invoice_lines WHERE invoice_id = $1 ORDER BY date ASC, start_time ASC, id ASC",
        )
            .bind(invoice_id)
            .fetch_all(executor)
            .await?;

        Ok(lines)
    }

    pub async fn insert_line<'e, E>(&self, executor: E, line: &InvoiceLine) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            INSERT INTO invoice_lines (
                id, invoice_id, campus_id, date, start_time, end_time,
                program, class_name, description,
                quantite_heures, prix_unitaire, total_ttc, is_late, status,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            "#,
        )
            .bind(line.id)
            .bind(line.invoice_id)
            .bind(line.campus_id)
            .bind(line.date)
            .bind(line.start_time)
            .bind(line.end_time)
            .bind(&line.program)
            .bind(&line.class_name)
            .bind(&line.description)
            .bind(line.quantite_heures)
            .bind(line.prix_unitaire)
            .bind(line.total_ttc)
            .bind(line.is_late)
            .bind(line.status)
            .bind(line.created_at)
            .bind(line.updated_at)
            .execute(executor)
            .await?;

        Ok(())
    }

    pub async fn update_line<'e, E>(&self, executor: E, line: &InvoiceLine) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            UPDATE invoice_lines
            SET date = $2, start_time = $3, end_time = $4,
                program = $5, class_name = $6, description = $7,
                quantite_heures = $8, prix_unitaire = $9, total_ttc = $10,
                is_late = $11, status = $12, observations = $13,
                prevalidated_by = $14, prevalidated_at = $15,
                validated_by = $16, validated_at = $17,
                paid_by = $18, paid_at = $19, payment_date = $20,
                rejected_by = $21, rejected_at = $22,
                updated_at = $23
            WHERE id = $1
            "#,
        )
            .bind(line.id)
            .bind(line.date)
            .bind(line.start_time)
            .bind(line.end_time)
            .bind(&line.program)
            .bind(&line.class_name)
            .bind(&line.description)
            .bind(line.quantite_heures)
            .bind(line.prix_unitaire)
            .bind(line.total_ttc)
            .bind(line.is_late)
            .bind(line.status)
            .bind(&line.observations)
            .bind(line.prevalidated_by)
            .bind(line.prevalidated_at)
            .bind(line.validated_by)
            .bind(line.validated_at)
            .bind(line.paid_by)
            .bind(line.paid_at)
            .bind(line.payment_date)
            .bind(line.rejected_by)
            .bind(line.rejected_at)
            .bind(line.updated_at)
            .execute(executor)
            .await?;

        Ok(())
    }
}
