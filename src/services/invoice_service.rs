// src/services/invoice_service.rs

use std::sync::Arc;

use chrono::{NaiveTime, Utc};
use rust_decimal::Decimal;
use serde_json::json;
use tracing::{Instrument, Span};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::WorkflowStore,
    models::{
        audit::AuditLog,
        invoice::{
            period_start, Invoice, InvoiceDetail, InvoiceFilter, InvoiceLine, InvoiceStatus, SubmitInvoicePayload,
            UpdateLinePayload, MAX_AMOUNT, MAX_HOURS, MAX_UNIT_PRICE, MONEY_SCALE,
        },
        profile::{Profile, Role},
    },
    services::{authorization, workflow_service::save_invoice},
};

/// Lançamento de horas pelos professores e leitura das faturas.
#[derive(Clone)]
pub struct InvoiceService {
    store: Arc<dyn WorkflowStore>,
    span: Span,
}

impl InvoiceService {
    pub fn new(store: Arc<dyn WorkflowStore>, span: Span) -> Self {
        Self { store, span }
    }

    /// Cria a fatura do mês (ou completa a que ainda está pendente) com as
    /// linhas informadas.
    pub async fn submit_invoice(
        &self,
        actor_id: Uuid,
        payload: &SubmitInvoicePayload,
    ) -> Result<InvoiceDetail, AppError> {
        let span = tracing::info_span!(
            parent: &self.span,
            "submit_invoice",
            %actor_id,
            campus_id = %payload.campus_id,
            month_year = %payload.month_year
        );
        self.submit_in_tx(actor_id, payload).instrument(span).await
    }

    async fn submit_in_tx(&self, actor_id: Uuid, payload: &SubmitInvoicePayload) -> Result<InvoiceDetail, AppError> {
        if payload.lines.is_empty() {
            return Err(AppError::InvalidInput("Informe ao menos uma linha.".into()));
        }
        let totals = payload
            .lines
            .iter()
            .map(|input| check_line_values(input.quantite_heures, input.prix_unitaire, input.start_time, input.end_time))
            .collect::<Result<Vec<_>, _>>()?;

        let mut tx = self.store.begin().await?;
        let actor = authorization::load_actor(&mut *tx, actor_id).await?;

        let teacher = match actor.role {
            Role::Enseignant => {
                if payload.teacher_id.is_some_and(|id| id != actor.id) {
                    return Err(AppError::Forbidden(
                        "Um professor só pode lançar as próprias horas.".into(),
                    ));
                }
                if actor.campus_id != Some(payload.campus_id) {
                    return Err(AppError::Forbidden(
                        "Um professor só pode lançar horas no próprio campus.".into(),
                    ));
                }
                actor.clone()
            }
            Role::SuperAdmin => {
                let teacher_id = payload
                    .teacher_id
                    .ok_or_else(|| AppError::InvalidInput("Informe o professor da fatura.".into()))?;
                let teacher = tx
                    .find_profile(teacher_id)
                    .await?
                    .ok_or(AppError::ProfileNotFound(teacher_id))?;
                ensure_teacher(&teacher)?;
                if teacher.campus_id != Some(payload.campus_id) {
                    return Err(AppError::Forbidden(
                        "O professor não pertence a este campus.".into(),
                    ));
                }
                teacher
            }
            Role::DirecteurCampus | Role::Comptable => {
                return Err(AppError::Forbidden(format!(
                    "O papel {} não pode lançar horas.",
                    actor.role.as_str()
                )));
            }
        };

        tx.find_campus(payload.campus_id)
            .await?
            .ok_or(AppError::CampusNotFound(payload.campus_id))?;

        let now = Utc::now();
        let period = period_start(payload.month_year);

        let mut invoice = match tx
            .lock_invoice_for_period(teacher.id, payload.campus_id, period)
            .await?
        {
            Some(existing) if existing.status == InvoiceStatus::Pending => existing,
            Some(existing) => {
                return Err(AppError::InvalidState(format!(
                    "A fatura de {} já está '{}' e não aceita novas linhas.",
                    period.format("%m/%Y"),
                    existing.status
                )));
            }
            None => {
                let invoice = Invoice::new(teacher.id, payload.campus_id, period, now);
                tx.insert_invoice(&invoice).await?;
                invoice
            }
        };

        for (input, total_ttc) in payload.lines.iter().zip(totals) {
            tx.insert_line(&InvoiceLine::new(&invoice, input, total_ttc, now)).await?;
        }

        let lines = tx.list_lines(invoice.id).await?;
        invoice.updated_at = now;
        save_invoice(&mut *tx, &mut invoice, &lines).await?;
        tx.insert_audit_log(&AuditLog::new(
            actor.id,
            "submit_invoice",
            "invoice",
            invoice.id,
            json!({
                "teacherId": teacher.id,
                "linesAdded": payload.lines.len(),
                "totalAmount": invoice.total_amount,
            }),
            now,
        ))
        .await?;
        tx.commit().await?;

        tracing::info!(
            invoice_id = %invoice.id,
            lines_added = payload.lines.len(),
            total_amount = %invoice.total_amount,
            "Fatura lançada"
        );

        Ok(detail(invoice, lines))
    }

    /// Corrige uma linha ainda pendente e recalcula os totais.
    pub async fn update_line(
        &self,
        actor_id: Uuid,
        line_id: Uuid,
        changes: &UpdateLinePayload,
    ) -> Result<InvoiceLine, AppError> {
        let span = tracing::info_span!(parent: &self.span, "update_line", %actor_id, %line_id);
        self.update_line_in_tx(actor_id, line_id, changes).instrument(span).await
    }

    async fn update_line_in_tx(
        &self,
        actor_id: Uuid,
        line_id: Uuid,
        changes: &UpdateLinePayload,
    ) -> Result<InvoiceLine, AppError> {
        let mut tx = self.store.begin().await?;
        let actor = authorization::load_actor(&mut *tx, actor_id).await?;

        let line = tx.find_line(line_id).await?.ok_or(AppError::LineNotFound(line_id))?;
        let mut invoice = tx
            .lock_invoice(line.invoice_id)
            .await?
            .ok_or(AppError::InvoiceNotFound(line.invoice_id))?;
        authorization::require_line_editor(&actor, &invoice)?;

        let mut lines = tx.list_lines(invoice.id).await?;
        let line = lines
            .iter_mut()
            .find(|candidate| candidate.id == line_id)
            .ok_or(AppError::LineNotFound(line_id))?;
        if line.status != InvoiceStatus::Pending {
            return Err(AppError::InvalidState(format!(
                "A linha está '{}': só linhas pendentes podem ser alteradas.",
                line.status
            )));
        }

        apply_changes(line, changes);
        let total_ttc = check_line_values(line.quantite_heures, line.prix_unitaire, line.start_time, line.end_time)?;

        let now = Utc::now();
        line.total_ttc = total_ttc;
        line.updated_at = now;
        tx.update_line(line).await?;
        let updated = line.clone();

        invoice.updated_at = now;
        save_invoice(&mut *tx, &mut invoice, &lines).await?;
        tx.insert_audit_log(&AuditLog::new(
            actor.id,
            "update_line",
            "invoice_line",
            line_id,
            json!({ "invoiceId": invoice.id, "totalTtc": updated.total_ttc }),
            now,
        ))
        .await?;
        tx.commit().await?;

        tracing::info!(invoice_id = %invoice.id, total_amount = %invoice.total_amount, "Linha alterada");
        Ok(updated)
    }

    pub async fn get_invoice(&self, actor_id: Uuid, invoice_id: Uuid) -> Result<InvoiceDetail, AppError> {
        let span = tracing::debug_span!(parent: &self.span, "get_invoice", %actor_id, %invoice_id);
        async {
            let mut tx = self.store.begin().await?;
            let actor = authorization::load_actor(&mut *tx, actor_id).await?;

            let invoice = tx
                .find_invoice(invoice_id)
                .await?
                .ok_or(AppError::InvoiceNotFound(invoice_id))?;
            authorization::require_read_access(&actor, &invoice)?;

            let lines = tx.list_lines(invoice_id).await?;
            Ok(detail(invoice, lines))
        }
        .instrument(span)
        .await
    }

    /// Faturas visíveis para o ator, do período mais recente ao mais antigo.
    pub async fn list_invoices(&self, actor_id: Uuid, filter: &InvoiceFilter) -> Result<Vec<Invoice>, AppError> {
        let span = tracing::debug_span!(parent: &self.span, "list_invoices", %actor_id);
        async {
            let mut tx = self.store.begin().await?;
            let actor = authorization::load_actor(&mut *tx, actor_id).await?;
            let scope = authorization::invoice_scope(&actor)?;

            let filter = InvoiceFilter {
                status: filter.status,
                month_year: filter.month_year.map(period_start),
            };
            tx.list_invoices(scope, &filter).await
        }
        .instrument(span)
        .await
    }
}

fn detail(invoice: Invoice, lines: Vec<InvoiceLine>) -> InvoiceDetail {
    let payable_amount = Invoice::payable_amount(&lines);
    InvoiceDetail {
        invoice,
        lines,
        payable_amount,
    }
}

fn ensure_teacher(profile: &Profile) -> Result<(), AppError> {
    match profile.role {
        Role::Enseignant => Ok(()),
        Role::SuperAdmin | Role::DirecteurCampus | Role::Comptable => Err(AppError::InvalidInput(format!(
            "O perfil {} não é de um professor.",
            profile.id
        ))),
    }
}

/// Confere os valores de uma linha e devolve o total dela.
fn check_line_values(
    quantite_heures: Decimal,
    prix_unitaire: Decimal,
    start_time: NaiveTime,
    end_time: NaiveTime,
) -> Result<Decimal, AppError> {
    if quantite_heures <= Decimal::ZERO {
        return Err(AppError::InvalidInput("A quantidade de horas deve ser positiva.".into()));
    }
    if prix_unitaire < Decimal::ZERO {
        return Err(AppError::InvalidInput("O preço unitário não pode ser negativo.".into()));
    }
    if quantite_heures.round_dp(MONEY_SCALE) != quantite_heures
        || prix_unitaire.round_dp(MONEY_SCALE) != prix_unitaire
    {
        return Err(AppError::InvalidInput(
            "Horas e preço unitário aceitam no máximo duas casas decimais.".into(),
        ));
    }
    if quantite_heures > MAX_HOURS {
        return Err(AppError::InvalidInput(format!(
            "A quantidade de horas não pode passar de {}.",
            MAX_HOURS
        )));
    }
    if prix_unitaire > MAX_UNIT_PRICE {
        return Err(AppError::InvalidInput(format!(
            "O preço unitário não pode passar de {}.",
            MAX_UNIT_PRICE
        )));
    }
    if end_time <= start_time {
        return Err(AppError::InvalidInput("O horário de fim deve ser depois do início.".into()));
    }
    InvoiceLine::compute_total(quantite_heures, prix_unitaire).ok_or_else(|| {
        AppError::InvalidInput(format!("O total da linha não pode passar de {}.", MAX_AMOUNT))
    })
}

fn apply_changes(line: &mut InvoiceLine, changes: &UpdateLinePayload) {
    if let Some(date) = changes.date {
        line.date = date;
    }
    if let Some(start_time) = changes.start_time {
        line.start_time = start_time;
    }
    if let Some(end_time) = changes.end_time {
        line.end_time = end_time;
    }
    if let Some(program) = &changes.program {
        line.program = Some(program.clone());
    }
    if let Some(class_name) = &changes.class_name {
        line.class_name = Some(class_name.clone());
    }
    if let Some(description) = &changes.description {
        line.description = Some(description.clone());
    }
    if let Some(hours) = changes.quantite_heures {
        line.quantite_heures = hours;
    }
    if let Some(price) = changes.prix_unitaire {
        line.prix_unitaire = price;
    }
    if let Some(is_late) = changes.is_late {
        line.is_late = is_late;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        common::error::ErrorKind,
        services::{
            test_support::{february, line_input, profile, World},
            workflow_service::WorkflowService,
        },
    };
    use chrono::NaiveDate;

    fn service(world: &World) -> InvoiceService {
        InvoiceService::new(world.shared_store(), World::span())
    }

    fn submission(world: &World, amounts: &[i64]) -> SubmitInvoicePayload {
        SubmitInvoicePayload {
            teacher_id: None,
            campus_id: world.campus_a.id,
            month_year: NaiveDate::from_ymd_opt(2025, 2, 17).unwrap(),
            lines: amounts
                .iter()
                .enumerate()
                .map(|(i, amount)| line_input(i as u32 + 3, *amount))
                .collect(),
        }
    }

    #[tokio::test]
    async fn teacher_submits_a_pending_invoice() {
        let world = World::new().await;
        let invoices = service(&world);

        let detail = invoices
            .submit_invoice(world.teacher.id, &submission(&world, &[100, 150]))
            .await
            .unwrap();

        assert_eq!(detail.invoice.status, InvoiceStatus::Pending);
        assert_eq!(detail.invoice.month_year, february());
        assert_eq!(detail.invoice.teacher_id, world.teacher.id);
        assert_eq!(detail.invoice.total_amount, Decimal::from(250));
        assert_eq!(detail.lines.len(), 2);
        assert!(detail
            .lines
            .iter()
            .all(|line| line.campus_id == world.campus_a.id && line.status == InvoiceStatus::Pending));

        let state = world.store.snapshot().await;
        assert_eq!(state.invoices.len(), 1);
        assert_eq!(state.audit_logs[0].action, "submit_invoice");
    }

    #[tokio::test]
    async fn second_submission_appends_to_the_pending_invoice() {
        let world = World::new().await;
        let invoices = service(&world);

        let first = invoices
            .submit_invoice(world.teacher.id, &submission(&world, &[100]))
            .await
            .unwrap();
        let second = invoices
            .submit_invoice(world.teacher.id, &submission(&world, &[40]))
            .await
            .unwrap();

        assert_eq!(first.invoice.id, second.invoice.id);
        assert_eq!(second.lines.len(), 2);
        assert_eq!(second.invoice.total_amount, Decimal::from(140));
    }

    #[tokio::test]
    async fn invoice_under_review_accepts_no_new_lines() {
        let world = World::new().await;
        let invoices = service(&world);
        let workflow = WorkflowService::new(world.shared_store(), World::span());

        let detail = invoices
            .submit_invoice(world.teacher.id, &submission(&world, &[100]))
            .await
            .unwrap();
        workflow
            .prevalidate_lines(detail.invoice.id, world.director_a.id, None, None)
            .await
            .unwrap();

        let err = invoices
            .submit_invoice(world.teacher.id, &submission(&world, &[40]))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
    }

    #[tokio::test]
    async fn submission_rules() {
        let world = World::new().await;
        let invoices = service(&world);

        let mut other_campus = submission(&world, &[100]);
        other_campus.campus_id = world.campus_b.id;
        let err = invoices.submit_invoice(world.teacher.id, &other_campus).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authorization);

        let err = invoices
            .submit_invoice(world.director_a.id, &submission(&world, &[100]))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authorization);

        let err = invoices
            .submit_invoice(world.teacher.id, &submission(&world, &[]))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let mut no_hours = submission(&world, &[100]);
        no_hours.lines[0].quantite_heures = Decimal::ZERO;
        let err = invoices.submit_invoice(world.teacher.id, &no_hours).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        assert!(world.store.snapshot().await.invoices.is_empty());
    }

    #[tokio::test]
    async fn admin_submits_on_behalf_of_a_teacher() {
        let world = World::new().await;
        let invoices = service(&world);

        let mut payload = submission(&world, &[100]);
        let err = invoices.submit_invoice(world.admin.id, &payload).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        payload.teacher_id = Some(world.accountant.id);
        let err = invoices.submit_invoice(world.admin.id, &payload).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let elsewhere = profile(Role::Enseignant, Some(world.campus_b.id));
        world.store.insert_profile(elsewhere.clone()).await;
        payload.teacher_id = Some(elsewhere.id);
        let err = invoices.submit_invoice(world.admin.id, &payload).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authorization);
        assert!(world.store.snapshot().await.invoices.is_empty());

        payload.teacher_id = Some(world.teacher.id);
        let detail = invoices.submit_invoice(world.admin.id, &payload).await.unwrap();
        assert_eq!(detail.invoice.teacher_id, world.teacher.id);
    }

    #[tokio::test]
    async fn line_values_must_fit_the_stored_precision() {
        let world = World::new().await;
        let invoices = service(&world);

        let mut huge = submission(&world, &[2]);
        huge.lines[0].quantite_heures = Decimal::MAX;
        let err = invoices.submit_invoice(world.teacher.id, &huge).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let mut thousandths = submission(&world, &[45]);
        thousandths.lines[0].quantite_heures = Decimal::new(1333, 3);
        let err = invoices.submit_invoice(world.teacher.id, &thousandths).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let mut too_many_hours = submission(&world, &[45]);
        too_many_hours.lines[0].quantite_heures = Decimal::from(10_000);
        let err = invoices.submit_invoice(world.teacher.id, &too_many_hours).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let mut pricey = submission(&world, &[1]);
        pricey.lines[0].prix_unitaire = Decimal::from(100_000_000);
        let err = invoices.submit_invoice(world.teacher.id, &pricey).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        // Cabe em cada coluna, mas o produto passa do limite do total
        let mut line_overflow = submission(&world, &[1]);
        line_overflow.lines[0].quantite_heures = MAX_HOURS;
        line_overflow.lines[0].prix_unitaire = MAX_UNIT_PRICE;
        let err = invoices.submit_invoice(world.teacher.id, &line_overflow).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        // Cada linha cabe, a soma da fatura não
        let mut invoice_overflow = submission(&world, &[1, 1]);
        for line in &mut invoice_overflow.lines {
            line.quantite_heures = Decimal::from(100);
            line.prix_unitaire = Decimal::from(99_999_999);
        }
        let err = invoices.submit_invoice(world.teacher.id, &invoice_overflow).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        assert!(world.store.snapshot().await.invoices.is_empty());

        let mut trailing_zeros = submission(&world, &[45]);
        trailing_zeros.lines[0].quantite_heures = Decimal::new(1330, 3);
        let detail = invoices.submit_invoice(world.teacher.id, &trailing_zeros).await.unwrap();
        assert_eq!(detail.invoice.total_amount, Decimal::new(5985, 2));
    }

    #[tokio::test]
    async fn oversized_update_leaves_the_line_untouched() {
        let world = World::new().await;
        let invoices = service(&world);
        let (invoice_id, line_ids) = world.seed_invoice(&[100]).await;

        let changes = UpdateLinePayload {
            prix_unitaire: Some(Decimal::MAX),
            ..Default::default()
        };
        let err = invoices.update_line(world.teacher.id, line_ids[0], &changes).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let changes = UpdateLinePayload {
            prix_unitaire: Some(Decimal::new(12345, 3)),
            ..Default::default()
        };
        let err = invoices.update_line(world.teacher.id, line_ids[0], &changes).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let state = world.store.snapshot().await;
        assert_eq!(state.lines[0].total_ttc, Decimal::from(100));
        assert_eq!(state.invoices[&invoice_id].total_amount, Decimal::from(100));
    }

    #[tokio::test]
    async fn updating_a_line_recomputes_both_totals() {
        let world = World::new().await;
        let invoices = service(&world);
        let (invoice_id, line_ids) = world.seed_invoice(&[100, 150]).await;

        let changes = UpdateLinePayload {
            quantite_heures: Some(Decimal::new(25, 1)),
            is_late: Some(true),
            ..Default::default()
        };
        let line = invoices.update_line(world.teacher.id, line_ids[0], &changes).await.unwrap();
        assert_eq!(line.total_ttc, Decimal::from(250));
        assert!(line.is_late);

        let state = world.store.snapshot().await;
        assert_eq!(state.invoices[&invoice_id].total_amount, Decimal::from(400));
    }

    #[tokio::test]
    async fn only_pending_lines_of_the_owner_can_change() {
        let world = World::new().await;
        let invoices = service(&world);
        let workflow = WorkflowService::new(world.shared_store(), World::span());
        let (invoice_id, line_ids) = world.seed_invoice(&[100]).await;

        let changes = UpdateLinePayload {
            prix_unitaire: Some(Decimal::from(120)),
            ..Default::default()
        };
        let err = invoices.update_line(world.director_a.id, line_ids[0], &changes).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authorization);

        workflow
            .prevalidate_lines(invoice_id, world.director_a.id, None, None)
            .await
            .unwrap();
        let err = invoices.update_line(world.teacher.id, line_ids[0], &changes).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);

        let state = world.store.snapshot().await;
        assert_eq!(state.invoices[&invoice_id].total_amount, Decimal::from(100));
    }

    #[tokio::test]
    async fn reads_are_scoped_by_role() {
        let world = World::new().await;
        let invoices = service(&world);
        let workflow = WorkflowService::new(world.shared_store(), World::span());
        let (invoice_id, line_ids) = world.seed_invoice(&[100, 150]).await;

        workflow.reject_line(line_ids[1], world.director_a.id, "absent").await.unwrap();

        let detail = invoices.get_invoice(world.director_a.id, invoice_id).await.unwrap();
        assert_eq!(detail.invoice.total_amount, Decimal::from(250));
        assert_eq!(detail.payable_amount, Decimal::from(100));

        let err = invoices.get_invoice(world.director_b.id, invoice_id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authorization);

        let all = InvoiceFilter::default();
        assert_eq!(invoices.list_invoices(world.accountant.id, &all).await.unwrap().len(), 1);
        assert_eq!(invoices.list_invoices(world.teacher.id, &all).await.unwrap().len(), 1);
        assert!(invoices.list_invoices(world.director_b.id, &all).await.unwrap().is_empty());

        let paid_only = InvoiceFilter {
            status: Some(InvoiceStatus::Paid),
            month_year: None,
        };
        assert!(invoices.list_invoices(world.admin.id, &paid_only).await.unwrap().is_empty());

        let mid_february = InvoiceFilter {
            status: None,
            month_year: NaiveDate::from_ymd_opt(2025, 2, 20),
        };
        assert_eq!(invoices.list_invoices(world.admin.id, &mid_february).await.unwrap().len(), 1);
    }
}
