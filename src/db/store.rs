// src/db/store.rs

use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{
        audit::AuditLog,
        campus::Campus,
        invoice::{Invoice, InvoiceFilter, InvoiceLine},
        profile::Profile,
    },
};

/// Quais faturas um ator pode enxergar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvoiceScope {
    All,
    Campus(Uuid),
    Teacher(Uuid),
}

/// Fonte de transações. Cada operação do fluxo abre exatamente uma.
#[async_trait]
pub trait WorkflowStore: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn WorkflowTx>, AppError>;
}

/// Uma transação aberta. Se for descartada sem `commit`, nada é gravado.
#[async_trait]
pub trait WorkflowTx: Send {
    async fn find_profile(&mut self, id: Uuid) -> Result<Option<Profile>, AppError>;

    async fn find_campus(&mut self, id: Uuid) -> Result<Option<Campus>, AppError>;
    /// Leitura com trava de linha, para quem vai alterar o campus.
    async fn lock_campus(&mut self, id: Uuid) -> Result<Option<Campus>, AppError>;
    async fn find_campus_by_director(&mut self, director_id: Uuid) -> Result<Option<Campus>, AppError>;
    async fn list_campuses(&mut self) -> Result<Vec<Campus>, AppError>;

    async fn find_invoice(&mut self, id: Uuid) -> Result<Option<Invoice>, AppError>;

    // As buscas abaixo travam a fatura até o fim da transação
    async fn lock_invoice(&mut self, id: Uuid) -> Result<Option<Invoice>, AppError>;
    async fn lock_invoice_for_period(
        &mut self,
        teacher_id: Uuid,
        campus_id: Uuid,
        month_year: NaiveDate,
    ) -> Result<Option<Invoice>, AppError>;
    async fn list_invoices(&mut self, scope: InvoiceScope, filter: &InvoiceFilter) -> Result<Vec<Invoice>, AppError>;

    async fn find_line(&mut self, id: Uuid) -> Result<Option<InvoiceLine>, AppError>;
    async fn list_lines(&mut self, invoice_id: Uuid) -> Result<Vec<InvoiceLine>, AppError>;

    async fn insert_invoice(&mut self, invoice: &Invoice) -> Result<(), AppError>;
    async fn update_invoice(&mut self, invoice: &Invoice) -> Result<(), AppError>;
    async fn insert_line(&mut self, line: &InvoiceLine) -> Result<(), AppError>;
    async fn update_line(&mut self, line: &InvoiceLine) -> Result<(), AppError>;

    async fn set_profile_campus(&mut self, profile_id: Uuid, campus_id: Option<Uuid>) -> Result<(), AppError>;
    async fn set_campus_director(&mut self, campus_id: Uuid, director_id: Option<Uuid>) -> Result<(), AppError>;

    async fn insert_audit_log(&mut self, entry: &AuditLog) -> Result<(), AppError>;

    async fn commit(self: Box<Self>) -> Result<(), AppError>;
}
