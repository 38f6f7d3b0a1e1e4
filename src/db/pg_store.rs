// src/db/pg_store.rs

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{
        store::{InvoiceScope, WorkflowStore, WorkflowTx},
        AuditRepository, CampusRepository, InvoiceRepository, ProfileRepository,
    },
    models::{
        audit::AuditLog,
        campus::Campus,
        invoice::{Invoice, InvoiceFilter, InvoiceLine},
        profile::Profile,
    },
};

#[derive(Clone)]
pub struct PgWorkflowStore {
    pool: PgPool,
    profiles: ProfileRepository,
    campuses: CampusRepository,
    invoices: InvoiceRepository,
    audit: AuditRepository,
}

impl PgWorkflowStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            profiles: ProfileRepository::new(),
            campuses: CampusRepository::new(),
            invoices: InvoiceRepository::new(),
            audit: AuditRepository::new(),
        }
    }
}

#[async_trait]
impl WorkflowStore for PgWorkflowStore {
    async fn begin(&self) -> Result<Box<dyn WorkflowTx>, AppError> {
        let tx = self.pool.begin().await?;

        Ok(Box::new(PgWorkflowTx {
            tx,
            profiles: self.profiles.clone(),
            campuses: self.campuses.clone(),
            invoices: self.invoices.clone(),
            audit: self.audit.clone(),
        }))
    }
}

// Todos os repositórios recebem `&mut *self.tx`: tudo roda na mesma transação.
// Se o valor for descartado sem commit, o sqlx faz rollback.
pub struct PgWorkflowTx {
    tx: Transaction<'static, Postgres>,
    profiles: ProfileRepository,
    campuses: CampusRepository,
    invoices: InvoiceRepository,
    audit: AuditRepository,
}

#[async_trait]
impl WorkflowTx for PgWorkflowTx {
    async fn find_profile(&mut self, id: Uuid) -> Result<Option<Profile>, AppError> {
        self.profiles.find_by_id(&mut *self.tx, id).await
    }

    async fn find_campus(&mut self, id: Uuid) -> Result<Option<Campus>, AppError> {
        self.campuses.find_by_id(&mut *self.tx, id).await
    }

    async fn lock_campus(&mut self, id: Uuid) -> Result<Option<Campus>, AppError> {
        self.campuses.lock_by_id(&mut *self.tx, id).await
    }

    async fn find_campus_by_director(&mut self, director_id: Uuid) -> Result<Option<Campus>, AppError> {
        self.campuses.find_by_director(&mut *self.tx, director_id).await
    }

    async fn list_campuses(&mut self) -> Result<Vec<Campus>, AppError> {
        self.campuses.list_all(&mut *self.tx).await
    }

    async fn find_invoice(&mut self, id: Uuid) -> Result<Option<Invoice>, AppError> {
        self.invoices.find_by_id(&mut *self.tx, id).await
    }

    async fn lock_invoice(&mut self, id: Uuid) -> Result<Option<Invoice>, AppError> {
        self.invoices.lock_by_id(&mut *self.tx, id).await
    }

    async fn lock_invoice_for_period(
        &mut self,
        teacher_id: Uuid,
        campus_id: Uuid,
        month_year: NaiveDate,
    ) -> Result<Option<Invoice>, AppError> {
        self.invoices
            .lock_for_period(&mut *self.tx, teacher_id, campus_id, month_year)
            .await
    }

    async fn list_invoices(&mut self, scope: InvoiceScope, filter: &InvoiceFilter) -> Result<Vec<Invoice>, AppError> {
        self.invoices.list(&mut *self.tx, scope, filter).await
    }

    async fn find_line(&mut self, id: Uuid) -> Result<Option<InvoiceLine>, AppError> {
        self.invoices.find_line(&mut *self.tx, id).await
    }

    async fn list_lines(&mut self, invoice_id: Uuid) -> Result<Vec<InvoiceLine>, AppError> {
        self.invoices.list_lines(&mut *self.tx, invoice_id).await
    }

    async fn insert_invoice(&mut self, invoice: &Invoice) -> Result<(), AppError> {
        self.invoices.insert(&mut *self.tx, invoice).await
    }

    async fn update_invoice(&mut self, invoice: &Invoice) -> Result<(), AppError> {
        self.invoices.update(&mut *self.tx, invoice).await
    }

    async fn insert_line(&mut self, line: &InvoiceLine) -> Result<(), AppError> {
        self.invoices.insert_line(&mut *self.tx, line).await
    }

    async fn update_line(&mut self, line: &InvoiceLine) -> Result<(), AppError> {
        self.invoices.update_line(&mut *self.tx, line).await
    }

    async fn set_profile_campus(&mut self, profile_id: Uuid, campus_id: Option<Uuid>) -> Result<(), AppError> {
        self.profiles.set_campus(&mut *self.tx, profile_id, campus_id).await
    }

    async fn set_campus_director(&mut self, campus_id: Uuid, director_id: Option<Uuid>) -> Result<(), AppError> {
        self.campuses.set_director(&mut *self.tx, campus_id, director_id).await
    }

    async fn insert_audit_log(&mut self, entry: &AuditLog) -> Result<(), AppError> {
        self.audit.insert(&mut *self.tx, entry).await
    }

    async fn commit(self: Box<Self>) -> Result<(), AppError> {
        self.tx.commit().await?;
        Ok(())
    }
}
