// src/services/workflow_service.rs

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde_json::json;
use tracing::{Instrument, Span};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{WorkflowStore, WorkflowTx},
    models::{
        audit::AuditLog,
        invoice::{Invoice, InvoiceLine, InvoiceStatus, WorkflowOutcome, MAX_AMOUNT},
    },
    services::authorization,
};

/// O motor do fluxo: pré-validação (diretor), validação e pagamento
/// (contabilidade) e rejeição de linhas.
///
/// Cada operação abre uma única transação no `WorkflowStore`: as linhas, o
/// status agregado e o total da fatura são gravados juntos ou não são gravados.
/// O serviço não guarda estado entre chamadas.
#[derive(Clone)]
pub struct WorkflowService {
    store: Arc<dyn WorkflowStore>,
    span: Span,
}

impl WorkflowService {
    pub fn new(store: Arc<dyn WorkflowStore>, span: Span) -> Self {
        Self { store, span }
    }

    /// Pré-valida as linhas pendentes da fatura (todas, ou só `line_ids`).
    /// Linhas em outro status são ignoradas; repetir a chamada não altera nada.
    pub async fn prevalidate_lines(
        &self,
        invoice_id: Uuid,
        actor_id: Uuid,
        line_ids: Option<&[Uuid]>,
        observations: Option<&str>,
    ) -> Result<WorkflowOutcome, AppError> {
        let span = tracing::info_span!(parent: &self.span, "prevalidate_lines", %invoice_id, %actor_id);
        self.prevalidate_in_tx(invoice_id, actor_id, line_ids, observations)
            .instrument(span)
            .await
    }

    async fn prevalidate_in_tx(
        &self,
        invoice_id: Uuid,
        actor_id: Uuid,
        line_ids: Option<&[Uuid]>,
        observations: Option<&str>,
    ) -> Result<WorkflowOutcome, AppError> {
        let mut tx = self.store.begin().await?;

        let actor = authorization::load_actor(&mut *tx, actor_id).await?;
        authorization::require_director(&actor)?;

        let mut invoice = tx
            .lock_invoice(invoice_id)
            .await?
            .ok_or(AppError::InvoiceNotFound(invoice_id))?;
        authorization::require_director_of(&actor, invoice.campus_id)?;

        let mut lines = tx.list_lines(invoice_id).await?;
        let now = Utc::now();
        let note = observations.map(str::trim).filter(|note| !note.is_empty());

        let mut updated_ids = Vec::new();
        for line in lines
            .iter_mut()
            .filter(|line| line_ids.is_none_or(|ids| ids.contains(&line.id)))
        {
            if line.prevalidate(actor.id, now, note) {
                tx.update_line(line).await?;
                updated_ids.push(line.id);
            }
        }

        let advanced = invoice.sync_status(&lines, actor.id, now);
        if updated_ids.is_empty() && !advanced {
            tracing::info!("Nenhuma linha pendente entre as selecionadas");
            return Ok(WorkflowOutcome::applied(
                "Nenhuma linha pendente para pré-validar.",
                0,
                invoice.status,
            ));
        }

        save_invoice(&mut *tx, &mut invoice, &lines).await?;
        tx.insert_audit_log(&AuditLog::new(
            actor.id,
            "prevalidate_invoice",
            "invoice",
            invoice.id,
            json!({
                "lineIds": updated_ids,
                "observations": note,
                "invoiceStatus": invoice.status,
            }),
            now,
        ))
        .await?;
        tx.commit().await?;

        let count = updated_ids.len() as u32;
        tracing::info!(lines_updated = count, invoice_status = %invoice.status, "Linhas pré-validadas");

        Ok(WorkflowOutcome::applied(
            format!("{} linha(s) pré-validada(s)", count),
            count,
            invoice.status,
        ))
    }

    /// Validação financeira da fatura inteira. Exige fatura `prevalidated`.
    pub async fn validate_invoice(&self, invoice_id: Uuid, actor_id: Uuid) -> Result<WorkflowOutcome, AppError> {
        let span = tracing::info_span!(parent: &self.span, "validate_invoice", %invoice_id, %actor_id);
        self.finance_transition(invoice_id, actor_id, FinanceStep::Validate)
            .instrument(span)
            .await
    }

    /// Marca a fatura inteira como paga na data informada. Exige fatura `validated`.
    pub async fn mark_invoice_paid(
        &self,
        invoice_id: Uuid,
        actor_id: Uuid,
        payment_date: NaiveDate,
    ) -> Result<WorkflowOutcome, AppError> {
        let span = tracing::info_span!(parent: &self.span, "mark_invoice_paid", %invoice_id, %actor_id, %payment_date);
        self.finance_transition(invoice_id, actor_id, FinanceStep::Pay(payment_date))
            .instrument(span)
            .await
    }

    async fn finance_transition(
        &self,
        invoice_id: Uuid,
        actor_id: Uuid,
        step: FinanceStep,
    ) -> Result<WorkflowOutcome, AppError> {
        let mut tx = self.store.begin().await?;

        let actor = authorization::load_actor(&mut *tx, actor_id).await?;
        authorization::require_finance(&actor)?;

        let mut invoice = tx
            .lock_invoice(invoice_id)
            .await?
            .ok_or(AppError::InvoiceNotFound(invoice_id))?;

        let (from, to) = step.statuses();
        if invoice.status != from {
            return Err(AppError::InvalidState(format!(
                "A fatura está '{}': apenas uma fatura '{}' pode passar para '{}'.",
                invoice.status, from, to
            )));
        }

        let mut lines = tx.list_lines(invoice_id).await?;

        // Nenhuma linha ativa pode ter ficado para trás
        if let Some(behind) = lines
            .iter()
            .find(|line| line.status != from && line.status != InvoiceStatus::Rejected)
        {
            return Err(AppError::InvalidState(format!(
                "A linha {} está '{}', mas a fatura está '{}'.",
                behind.id, behind.status, from
            )));
        }

        let now = Utc::now();
        let mut updated = 0u32;
        for line in lines.iter_mut() {
            if step.apply(line, actor.id, now) {
                tx.update_line(line).await?;
                updated += 1;
            }
        }

        invoice.sync_status(&lines, actor.id, now);
        if invoice.status != to {
            return Err(AppError::InvalidState(format!(
                "A fatura não pôde passar para '{}': nenhuma linha ativa.",
                to
            )));
        }
        if let FinanceStep::Pay(payment_date) = step {
            invoice.payment_date = Some(payment_date);
        }

        save_invoice(&mut *tx, &mut invoice, &lines).await?;
        tx.insert_audit_log(&AuditLog::new(
            actor.id,
            step.action(),
            "invoice",
            invoice.id,
            json!({
                "linesUpdated": updated,
                "paymentDate": invoice.payment_date,
            }),
            now,
        ))
        .await?;
        tx.commit().await?;

        tracing::info!(lines_updated = updated, invoice_status = %invoice.status, "Fatura atualizada");

        Ok(WorkflowOutcome::applied(
            format!("Fatura passou para '{}' ({} linha(s))", to, updated),
            updated,
            invoice.status,
        ))
    }

    /// Rejeita uma linha pendente ou pré-validada do campus do diretor.
    /// As linhas irmãs não são afetadas; o status agregado da fatura é recalculado.
    pub async fn reject_line(
        &self,
        line_id: Uuid,
        actor_id: Uuid,
        observations: &str,
    ) -> Result<WorkflowOutcome, AppError> {
        let span = tracing::info_span!(parent: &self.span, "reject_line", %line_id, %actor_id);
        self.reject_in_tx(line_id, actor_id, observations)
            .instrument(span)
            .await
    }

    async fn reject_in_tx(&self, line_id: Uuid, actor_id: Uuid, observations: &str) -> Result<WorkflowOutcome, AppError> {
        let note = observations.trim();
        if note.is_empty() {
            return Err(AppError::InvalidInput("Uma observação é obrigatória para rejeitar uma linha.".into()));
        }

        let mut tx = self.store.begin().await?;

        let actor = authorization::load_actor(&mut *tx, actor_id).await?;
        let own_campus = authorization::require_director(&actor)?;

        let line = tx.find_line(line_id).await?.ok_or(AppError::LineNotFound(line_id))?;
        if line.campus_id != own_campus {
            return Err(AppError::campus_mismatch());
        }

        // Trava a fatura e relê as linhas já sob a trava
        let mut invoice = tx
            .lock_invoice(line.invoice_id)
            .await?
            .ok_or(AppError::InvoiceNotFound(line.invoice_id))?;
        let mut lines = tx.list_lines(invoice.id).await?;

        let now = Utc::now();
        let target = lines
            .iter_mut()
            .find(|candidate| candidate.id == line_id)
            .ok_or(AppError::LineNotFound(line_id))?;
        let previous = target.status;
        if !target.reject(actor.id, now, note) {
            return Err(AppError::InvalidState(format!(
                "A linha está '{}': só linhas 'pending' ou 'prevalidated' podem ser rejeitadas.",
                previous
            )));
        }
        tx.update_line(target).await?;

        invoice.sync_status(&lines, actor.id, now);
        save_invoice(&mut *tx, &mut invoice, &lines).await?;
        tx.insert_audit_log(&AuditLog::new(
            actor.id,
            "reject_line",
            "invoice_line",
            line_id,
            json!({
                "invoiceId": invoice.id,
                "previousStatus": previous,
                "observations": note,
                "invoiceStatus": invoice.status,
            }),
            now,
        ))
        .await?;
        tx.commit().await?;

        tracing::info!(invoice_status = %invoice.status, "Linha rejeitada");

        Ok(WorkflowOutcome::applied("Linha rejeitada", 1, invoice.status))
    }
}

#[derive(Debug, Clone, Copy)]
enum FinanceStep {
    Validate,
    Pay(NaiveDate),
}

impl FinanceStep {
    fn statuses(self) -> (InvoiceStatus, InvoiceStatus) {
        match self {
            FinanceStep::Validate => (InvoiceStatus::Prevalidated, InvoiceStatus::Validated),
            FinanceStep::Pay(_) => (InvoiceStatus::Validated, InvoiceStatus::Paid),
        }
    }

    fn action(self) -> &'static str {
        match self {
            FinanceStep::Validate => "validate_invoice",
            FinanceStep::Pay(_) => "mark_invoice_paid",
        }
    }

    fn apply(self, line: &mut InvoiceLine, actor_id: Uuid, at: DateTime<Utc>) -> bool {
        match self {
            FinanceStep::Validate => line.validate(actor_id, at),
            FinanceStep::Pay(payment_date) => line.mark_paid(actor_id, at, payment_date),
        }
    }
}

/// Recalcula o total, confere a consistência com as linhas e grava a fatura.
/// Qualquer operação que mexe em linhas passa por aqui antes do commit.
pub(crate) async fn save_invoice(
    tx: &mut dyn WorkflowTx,
    invoice: &mut Invoice,
    lines: &[InvoiceLine],
) -> Result<(), AppError> {
    if !invoice.recompute_total(lines) {
        return Err(AppError::InvalidInput(format!(
            "O total da fatura não pode passar de {}.",
            MAX_AMOUNT
        )));
    }
    if !invoice.is_consistent_with(lines) {
        return Err(AppError::InvalidState(format!(
            "A fatura {} ficaria à frente das próprias linhas.",
            invoice.id
        )));
    }
    tx.update_invoice(invoice).await
}
