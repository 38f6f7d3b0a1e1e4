// src/db/memory_store.rs
//
// Armazenamento em memória usado pelos testes dos serviços. Uma transação
// segura o mutex do estado inteiro e trabalha sobre uma cópia; o commit
// substitui o estado pela cópia, o drop simplesmente a descarta.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::store::{InvoiceScope, WorkflowStore, WorkflowTx},
    models::{
        audit::AuditLog,
        campus::Campus,
        invoice::{Invoice, InvoiceFilter, InvoiceLine},
        profile::Profile,
    },
};

#[derive(Debug, Clone, Default)]
pub struct MemoryState {
    pub profiles: HashMap<Uuid, Profile>,
    pub campuses: HashMap<Uuid, Campus>,
    pub invoices: HashMap<Uuid, Invoice>,
    // Ordem de inserção preservada, como o ORDER BY do Postgres
    pub lines: Vec<InvoiceLine>,
    pub audit_logs: Vec<AuditLog>,
}

#[derive(Clone, Default)]
pub struct MemoryWorkflowStore {
    state: Arc<Mutex<MemoryState>>,
    fail_commits: Arc<AtomicBool>,
}

impl MemoryWorkflowStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_profile(&self, profile: Profile) {
        self.state.lock().await.profiles.insert(profile.id, profile);
    }

    pub async fn insert_campus(&self, campus: Campus) {
        self.state.lock().await.campuses.insert(campus.id, campus);
    }

    pub async fn snapshot(&self) -> MemoryState {
        self.state.lock().await.clone()
    }

    /// A partir daqui todo commit falha, simulando uma queda do banco.
    pub fn fail_commits(&self) {
        self.fail_commits.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl WorkflowStore for MemoryWorkflowStore {
    async fn begin(&self) -> Result<Box<dyn WorkflowTx>, AppError> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();

        Ok(Box::new(MemoryTx {
            guard,
            working,
            fail_commit: self.fail_commits.load(Ordering::SeqCst),
        }))
    }
}

pub struct MemoryTx {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
    fail_commit: bool,
}

#[async_trait]
impl WorkflowTx for MemoryTx {
    async fn find_profile(&mut self, id: Uuid) -> Result<Option<Profile>, AppError> {
        Ok(self.working.profiles.get(&id).cloned())
    }

    async fn find_campus(&mut self, id: Uuid) -> Result<Option<Campus>, AppError> {
        Ok(self.working.campuses.get(&id).cloned())
    }

    // A transação já detém o estado inteiro
    async fn lock_campus(&mut self, id: Uuid) -> Result<Option<Campus>, AppError> {
        self.find_campus(id).await
    }

    async fn find_campus_by_director(&mut self, director_id: Uuid) -> Result<Option<Campus>, AppError> {
        Ok(self
            .working
            .campuses
            .values()
            .find(|campus| campus.director_id == Some(director_id))
            .cloned())
    }

    async fn list_campuses(&mut self) -> Result<Vec<Campus>, AppError> {
        let mut campuses: Vec<Campus> = self.working.campuses.values().cloned().collect();
        campuses.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(campuses)
    }

    async fn find_invoice(&mut self, id: Uuid) -> Result<Option<Invoice>, AppError> {
        Ok(self.working.invoices.get(&id).cloned())
    }

    async fn lock_invoice(&mut self, id: Uuid) -> Result<Option<Invoice>, AppError> {
        Ok(self.working.invoices.get(&id).cloned())
    }

    async fn lock_invoice_for_period(
        &mut self,
        teacher_id: Uuid,
        campus_id: Uuid,
        month_year: NaiveDate,
    ) -> Result<Option<Invoice>, AppError> {
        Ok(self
            .working
            .invoices
            .values()
            .find(|invoice| {
                invoice.teacher_id == teacher_id
                    && invoice.campus_id == campus_id
                    && invoice.month_year == month_year
            })
            .cloned())
    }

    async fn list_invoices(&mut self, scope: InvoiceScope, filter: &InvoiceFilter) -> Result<Vec<Invoice>, AppError> {
        let mut invoices: Vec<Invoice> = self
            .working
            .invoices
            .values()
            .filter(|invoice| match scope {
                InvoiceScope::All => true,
                InvoiceScope::Campus(id) => invoice.campus_id == id,
                InvoiceScope::Teacher(id) => invoice.teacher_id == id,
            })
            .filter(|invoice| filter.status.is_none_or(|status| invoice.status == status))
            .filter(|invoice| filter.month_year.is_none_or(|month| invoice.month_year == month))
            .cloned()
            .collect();

        invoices.sort_by(|a, b| {
            b.month_year
                .cmp(&a.month_year)
                .then_with(|| b.created_at.cmp(&a.created_at))
        });
        Ok(invoices)
    }

    async fn find_line(&mut self, id: Uuid) -> Result<Option<InvoiceLine>, AppError> {
        Ok(self.working.lines.iter().find(|line| line.id == id).cloned())
    }

    async fn list_lines(&mut self, invoice_id: Uuid) -> Result<Vec<InvoiceLine>, AppError> {
        Ok(self
            .working
            .lines
            .iter()
            .filter(|line| line.invoice_id == invoice_id)
            .cloned()
            .collect())
    }

    async fn insert_invoice(&mut self, invoice: &Invoice) -> Result<(), AppError> {
        self.working.invoices.insert(invoice.id, invoice.clone());
        Ok(())
    }

    async fn update_invoice(&mut self, invoice: &Invoice) -> Result<(), AppError> {
        match self.working.invoices.get_mut(&invoice.id) {
            Some(stored) => {
                *stored = invoice.clone();
                Ok(())
            }
            None => Err(AppError::InvoiceNotFound(invoice.id)),
        }
    }

    async fn insert_line(&mut self, line: &InvoiceLine) -> Result<(), AppError> {
        let campus_matches = self
            .working
            .invoices
            .get(&line.invoice_id)
            .is_some_and(|invoice| invoice.campus_id == line.campus_id);

        // Mesmo papel da chave estrangeira composta (invoice_id, campus_id)
        if !campus_matches {
            return Err(AppError::Persistence("invoice_lines (invoice_id, campus_id) fora da fatura".into()));
        }
        self.working.lines.push(line.clone());
        Ok(())
    }

    async fn update_line(&mut self, line: &InvoiceLine) -> Result<(), AppError> {
        match self.working.lines.iter_mut().find(|stored| stored.id == line.id) {
            Some(stored) => {
                *stored = line.clone();
                Ok(())
            }
            None => Err(AppError::LineNotFound(line.id)),
        }
    }

    async fn set_profile_campus(&mut self, profile_id: Uuid, campus_id: Option<Uuid>) -> Result<(), AppError> {
        let profile = self
            .working
            .profiles
            .get_mut(&profile_id)
            .ok_or(AppError::ProfileNotFound(profile_id))?;
        profile.campus_id = campus_id;
        Ok(())
    }

    async fn set_campus_director(&mut self, campus_id: Uuid, director_id: Option<Uuid>) -> Result<(), AppError> {
        if let Some(director) = director_id {
            let taken = self
                .working
                .campuses
                .values()
                .any(|campus| campus.id != campus_id && campus.director_id == Some(director));
            if taken {
                return Err(AppError::InvalidState("Este diretor já está atribuído a outro campus.".into()));
            }
        }

        let campus = self
            .working
            .campuses
            .get_mut(&campus_id)
            .ok_or(AppError::CampusNotFound(campus_id))?;
        campus.director_id = director_id;
        Ok(())
    }

    async fn insert_audit_log(&mut self, entry: &AuditLog) -> Result<(), AppError> {
        self.working.audit_logs.push(entry.clone());
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), AppError> {
        if self.fail_commit {
            return Err(AppError::Persistence("commit recusado".into()));
        }
        let MemoryTx { mut guard, working, .. } = *self;
        *guard = working;
        Ok(())
    }
}
