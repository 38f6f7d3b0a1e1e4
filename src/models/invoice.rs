// src/models/invoice.rs

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

/// Prefixo gravado nas observações de uma rejeição, para não confundir com
/// as notas de pré-validação.
pub const REJECTION_TAG: &str = "[REJET]";

// Maiores valores aceitos pelas colunas NUMERIC(6,2), NUMERIC(10,2) e NUMERIC(12,2)
pub const MAX_HOURS: Decimal = Decimal::from_parts(999_999, 0, 0, false, 2);
pub const MAX_UNIT_PRICE: Decimal = Decimal::from_parts(1_410_065_407, 2, 0, false, 2);
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(3_567_587_327, 232, 0, false, 2);

/// Casas decimais gravadas em horas, preços e totais.
pub const MONEY_SCALE: u32 = 2;

/// Soma sem estourar: `None` se passar de `MAX_AMOUNT`.
fn checked_sum(amounts: impl IntoIterator<Item = Decimal>) -> Option<Decimal> {
    amounts
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, amount| acc.checked_add(amount))
        .filter(|total| *total <= MAX_AMOUNT)
}

// --- Enums (Mapeando o Postgres) ---

/// Estado de uma linha e, de forma agregada, da fatura.
///
/// ```text
/// pending --prevalidate--> prevalidated --validate--> validated --pay--> paid
/// pending | prevalidated --reject--> rejected
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "invoice_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    Pending,
    Prevalidated,
    Validated,
    Paid,
    Rejected,
}

impl InvoiceStatus {
    // Posição no caminho principal; `rejected` fica fora dele
    fn progress(self) -> Option<u8> {
        match self {
            InvoiceStatus::Pending => Some(0),
            InvoiceStatus::Prevalidated => Some(1),
            InvoiceStatus::Validated => Some(2),
            InvoiceStatus::Paid => Some(3),
            InvoiceStatus::Rejected => None,
        }
    }

    /// Transições permitidas. Nenhuma etapa pode ser pulada.
    pub fn can_transition_to(self, next: InvoiceStatus) -> bool {
        matches!(
            (self, next),
            (InvoiceStatus::Pending, InvoiceStatus::Prevalidated)
                | (InvoiceStatus::Prevalidated, InvoiceStatus::Validated)
                | (InvoiceStatus::Validated, InvoiceStatus::Paid)
                | (InvoiceStatus::Pending, InvoiceStatus::Rejected)
                | (InvoiceStatus::Prevalidated, InvoiceStatus::Rejected)
        )
    }

    /// Status que a fatura deve ter dadas as suas linhas: o mais atrasado entre
    /// as linhas não rejeitadas. Se todas forem rejeitadas, a fatura é rejeitada;
    /// sem linhas, continua pendente.
    pub fn aggregate<I>(statuses: I) -> InvoiceStatus
    where
        I: IntoIterator<Item = InvoiceStatus>,
    {
        let mut seen_any = false;
        let mut weakest: Option<InvoiceStatus> = None;

        for status in statuses {
            seen_any = true;
            if status == InvoiceStatus::Rejected {
                continue;
            }
            weakest = match weakest {
                Some(current) if current.progress() <= status.progress() => Some(current),
                _ => Some(status),
            };
        }

        match (seen_any, weakest) {
            (false, _) => InvoiceStatus::Pending,
            (true, None) => InvoiceStatus::Rejected,
            (true, Some(status)) => status,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            InvoiceStatus::Pending => "pending",
            InvoiceStatus::Prevalidated => "prevalidated",
            InvoiceStatus::Validated => "validated",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Primeiro dia do mês: é assim que o período de uma fatura é guardado.
pub fn period_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

// --- Structs ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    #[schema(example = "550e8400-e29b-41d4-a716-446655440100")]
    pub id: Uuid,

    pub teacher_id: Uuid,
    pub campus_id: Uuid,

    #[schema(value_type = String, format = Date, example = "2025-02-01")]
    pub month_year: NaiveDate,

    pub status: InvoiceStatus,

    // Sempre a soma de total_ttc das linhas
    #[schema(example = "250.00")]
    pub total_amount: Decimal,

    pub prevalidated_by: Option<Uuid>,
    pub prevalidated_at: Option<DateTime<Utc>>,
    pub validated_by: Option<Uuid>,
    pub validated_at: Option<DateTime<Utc>>,
    pub paid_by: Option<Uuid>,
    pub paid_at: Option<DateTime<Utc>>,

    #[schema(value_type = Option<String>, format = Date, example = "2025-03-01")]
    pub payment_date: Option<NaiveDate>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Invoice {
    pub fn new(teacher_id: Uuid, campus_id: Uuid, month_year: NaiveDate, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            teacher_id,
            campus_id,
            month_year: period_start(month_year),
            status: InvoiceStatus::Pending,
            total_amount: Decimal::ZERO,
            prevalidated_by: None,
            prevalidated_at: None,
            validated_by: None,
            validated_at: None,
            paid_by: None,
            paid_at: None,
            payment_date: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Recalcula o total a partir das linhas. Devolve `false`, sem mexer no
    /// total, se a soma não cabe na coluna.
    pub fn recompute_total(&mut self, lines: &[InvoiceLine]) -> bool {
        match checked_sum(lines.iter().map(|line| line.total_ttc)) {
            Some(total) => {
                self.total_amount = total;
                true
            }
            None => false,
        }
    }

    /// Avança (ou rejeita) a fatura conforme as linhas. Só aplica transições
    /// válidas; devolve `true` se o status mudou.
    pub fn sync_status(&mut self, lines: &[InvoiceLine], actor_id: Uuid, at: DateTime<Utc>) -> bool {
        let target = InvoiceStatus::aggregate(lines.iter().map(|line| line.status));
        if target == self.status || !self.status.can_transition_to(target) {
            return false;
        }

        match target {
            InvoiceStatus::Prevalidated => {
                self.prevalidated_by = Some(actor_id);
                self.prevalidated_at = Some(at);
            }
            InvoiceStatus::Validated => {
                self.validated_by = Some(actor_id);
                self.validated_at = Some(at);
            }
            InvoiceStatus::Paid => {
                self.paid_by = Some(actor_id);
                self.paid_at = Some(at);
            }
            InvoiceStatus::Pending | InvoiceStatus::Rejected => {}
        }
        self.status = target;
        self.updated_at = at;
        true
    }

    /// Total igual à soma das linhas e status nunca à frente da linha mais atrasada.
    pub fn is_consistent_with(&self, lines: &[InvoiceLine]) -> bool {
        if checked_sum(lines.iter().map(|line| line.total_ttc)) != Some(self.total_amount) {
            return false;
        }

        let weakest = InvoiceStatus::aggregate(lines.iter().map(|line| line.status));
        match (self.status.progress(), weakest.progress()) {
            (Some(invoice), Some(lines)) => invoice <= lines,
            (None, None) => true,
            _ => false,
        }
    }

    /// Valor efetivamente pagável: linhas rejeitadas não entram.
    pub fn payable_amount(lines: &[InvoiceLine]) -> Decimal {
        lines
            .iter()
            .filter(|line| line.status != InvoiceStatus::Rejected)
            .fold(Decimal::ZERO, |acc, line| acc.saturating_add(line.total_ttc))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceLine {
    #[schema(example = "550e8400-e29b-41d4-a716-446655440200")]
    pub id: Uuid,

    pub invoice_id: Uuid,

    // Âncora de autorização: sempre igual ao campus da fatura
    pub campus_id: Uuid,

    #[schema(value_type = String, format = Date, example = "2025-02-12")]
    pub date: NaiveDate,
    #[schema(value_type = String, example = "09:00:00")]
    pub start_time: NaiveTime,
    #[schema(value_type = String, example = "12:00:00")]
    pub end_time: NaiveTime,

    #[schema(example = "BTS MCO")]
    pub program: Option<String>,
    #[schema(example = "MCO1")]
    pub class_name: Option<String>,
    pub description: Option<String>,

    #[schema(example = "3.00")]
    pub quantite_heures: Decimal,
    #[schema(example = "45.00")]
    pub prix_unitaire: Decimal,
    #[schema(example = "135.00")]
    pub total_ttc: Decimal,

    pub is_late: bool,
    pub status: InvoiceStatus,
    pub observations: Option<String>,

    pub prevalidated_by: Option<Uuid>,
    pub prevalidated_at: Option<DateTime<Utc>>,
    pub validated_by: Option<Uuid>,
    pub validated_at: Option<DateTime<Utc>>,
    pub paid_by: Option<Uuid>,
    pub paid_at: Option<DateTime<Utc>>,
    #[schema(value_type = Option<String>, format = Date)]
    pub payment_date: Option<NaiveDate>,
    pub rejected_by: Option<Uuid>,
    pub rejected_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl InvoiceLine {
    /// Horas × preço unitário, arredondado a centavos. `None` se o produto
    /// estoura ou não cabe em `total_ttc`.
    pub fn compute_total(quantite_heures: Decimal, prix_unitaire: Decimal) -> Option<Decimal> {
        quantite_heures
            .checked_mul(prix_unitaire)
            .map(|total| total.round_dp(MONEY_SCALE))
            .filter(|total| *total <= MAX_AMOUNT)
    }

    /// Nova linha pendente, herdando o campus da fatura. O total já vem
    /// calculado por `compute_total`.
    pub fn new(invoice: &Invoice, input: &NewInvoiceLine, total_ttc: Decimal, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            invoice_id: invoice.id,
            campus_id: invoice.campus_id,
            date: input.date,
            start_time: input.start_time,
            end_time: input.end_time,
            program: input.program.clone(),
            class_name: input.class_name.clone(),
            description: input.description.clone(),
            quantite_heures: input.quantite_heures,
            prix_unitaire: input.prix_unitaire,
            total_ttc,
            is_late: input.is_late,
            status: InvoiceStatus::Pending,
            observations: None,
            prevalidated_by: None,
            prevalidated_at: None,
            validated_by: None,
            validated_at: None,
            paid_by: None,
            paid_at: None,
            payment_date: None,
            rejected_by: None,
            rejected_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn prevalidate(&mut self, actor_id: Uuid, at: DateTime<Utc>, observations: Option<&str>) -> bool {
        if self.status != InvoiceStatus::Pending {
            return false;
        }
        self.status = InvoiceStatus::Prevalidated;
        self.prevalidated_by = Some(actor_id);
        self.prevalidated_at = Some(at);
        if let Some(note) = observations {
            self.observations = Some(note.to_string());
        }
        self.updated_at = at;
        true
    }

    pub fn validate(&mut self, actor_id: Uuid, at: DateTime<Utc>) -> bool {
        if self.status != InvoiceStatus::Prevalidated {
            return false;
        }
        self.status = InvoiceStatus::Validated;
        self.validated_by = Some(actor_id);
        self.validated_at = Some(at);
        self.updated_at = at;
        true
    }

    pub fn mark_paid(&mut self, actor_id: Uuid, at: DateTime<Utc>, payment_date: NaiveDate) -> bool {
        if self.status != InvoiceStatus::Validated {
            return false;
        }
        self.status = InvoiceStatus::Paid;
        self.paid_by = Some(actor_id);
        self.paid_at = Some(at);
        self.payment_date = Some(payment_date);
        self.updated_at = at;
        true
    }

    pub fn reject(&mut self, actor_id: Uuid, at: DateTime<Utc>, observations: &str) -> bool {
        if !self.status.can_transition_to(InvoiceStatus::Rejected) {
            return false;
        }
        self.status = InvoiceStatus::Rejected;
        self.rejected_by = Some(actor_id);
        self.rejected_at = Some(at);
        self.observations = Some(format!("{} {}", REJECTION_TAG, observations));
        self.updated_at = at;
        true
    }
}

// --- Payloads ---

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewInvoiceLine {
    #[schema(value_type = String, format = Date, example = "2025-02-12")]
    pub date: NaiveDate,
    #[schema(value_type = String, example = "09:00:00")]
    pub start_time: NaiveTime,
    #[schema(value_type = String, example = "12:00:00")]
    pub end_time: NaiveTime,

    #[validate(length(max = 120))]
    pub program: Option<String>,
    #[validate(length(max = 120))]
    pub class_name: Option<String>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,

    #[schema(example = "3.00")]
    pub quantite_heures: Decimal,
    #[schema(example = "45.00")]
    pub prix_unitaire: Decimal,

    #[serde(default)]
    pub is_late: bool,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmitInvoicePayload {
    // Só o SUPER_ADMIN informa outro professor; senão é o próprio ator
    pub teacher_id: Option<Uuid>,

    pub campus_id: Uuid,

    #[schema(value_type = String, format = Date, example = "2025-02-01")]
    pub month_year: NaiveDate,

    #[validate(length(min = 1, message = "Informe ao menos uma linha."), nested)]
    pub lines: Vec<NewInvoiceLine>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLinePayload {
    #[schema(value_type = Option<String>, format = Date)]
    pub date: Option<NaiveDate>,
    #[schema(value_type = Option<String>)]
    pub start_time: Option<NaiveTime>,
    #[schema(value_type = Option<String>)]
    pub end_time: Option<NaiveTime>,
    #[validate(length(max = 120))]
    pub program: Option<String>,
    #[validate(length(max = 120))]
    pub class_name: Option<String>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    pub quantite_heures: Option<Decimal>,
    pub prix_unitaire: Option<Decimal>,
    pub is_late: Option<bool>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PrevalidatePayload {
    // Ausente = todas as linhas da fatura
    pub line_ids: Option<Vec<Uuid>>,

    #[validate(length(max = 2000))]
    pub observations: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RejectLinePayload {
    #[validate(length(min = 1, max = 2000, message = "A observação é obrigatória."))]
    #[schema(example = "Cours non assuré ce jour-là")]
    pub observations: String,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MarkPaidPayload {
    #[schema(value_type = String, format = Date, example = "2025-03-01")]
    pub payment_date: NaiveDate,
}

#[derive(Debug, Default, Clone, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct InvoiceFilter {
    pub status: Option<InvoiceStatus>,
    #[param(value_type = Option<String>, format = Date)]
    pub month_year: Option<NaiveDate>,
}

// --- Respostas ---

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceDetail {
    #[serde(flatten)]
    pub invoice: Invoice,
    pub lines: Vec<InvoiceLine>,
    #[schema(example = "250.00")]
    pub payable_amount: Decimal,
}

/// Resultado estruturado de uma transição.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowOutcome {
    pub success: bool,
    #[schema(example = "2 linha(s) pré-validada(s)")]
    pub message: String,
    pub lines_updated: u32,
    pub invoice_status: InvoiceStatus,
}

impl WorkflowOutcome {
    pub fn applied(message: impl Into<String>, lines_updated: u32, invoice_status: InvoiceStatus) -> Self {
        Self {
            success: true,
            message: message.into(),
            lines_updated,
            invoice_status,
        }
    }
}
