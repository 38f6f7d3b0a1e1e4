// src/handlers/invoices.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::auth::AuthenticatedActor,
    models::invoice::{
        Invoice, InvoiceDetail, InvoiceFilter, InvoiceLine, MarkPaidPayload, PrevalidatePayload, RejectLinePayload,
        SubmitInvoicePayload, UpdateLinePayload, WorkflowOutcome,
    },
};

// =============================================================================
//  1. LANÇAMENTO E LEITURA
// =============================================================================

// POST /api/invoices
#[utoipa::path(
    post,
    path = "/api/invoices",
    tag = "Invoices",
    request_body = SubmitInvoicePayload,
    responses(
        (status = 201, description = "Fatura criada ou completada", body = InvoiceDetail),
        (status = 403, description = "Papel ou campus não permitido"),
        (status = 409, description = "Fatura do mês já em validação")
    ),
    security(("api_jwt" = []))
)]
pub async fn submit_invoice(
    State(app_state): State<AppState>,
    AuthenticatedActor(actor_id): AuthenticatedActor,
    Json(payload): Json<SubmitInvoicePayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let detail = app_state.invoice_service.submit_invoice(actor_id, &payload).await?;

    Ok((StatusCode::CREATED, Json(detail)))
}

// GET /api/invoices
#[utoipa::path(
    get,
    path = "/api/invoices",
    tag = "Invoices",
    params(InvoiceFilter),
    responses(
        (status = 200, description = "Faturas visíveis para o usuário", body = Vec<Invoice>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_invoices(
    State(app_state): State<AppState>,
    AuthenticatedActor(actor_id): AuthenticatedActor,
    Query(filter): Query<InvoiceFilter>,
) -> Result<impl IntoResponse, ApiError> {
    let invoices = app_state.invoice_service.list_invoices(actor_id, &filter).await?;
    Ok(Json(invoices))
}

// GET /api/invoices/{id}
#[utoipa::path(
    get,
    path = "/api/invoices/{id}",
    tag = "Invoices",
    params(("id" = Uuid, Path, description = "ID da fatura")),
    responses(
        (status = 200, description = "Fatura com as linhas", body = InvoiceDetail),
        (status = 404, description = "Fatura não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_invoice(
    State(app_state): State<AppState>,
    AuthenticatedActor(actor_id): AuthenticatedActor,
    Path(invoice_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let detail = app_state.invoice_service.get_invoice(actor_id, invoice_id).await?;
    Ok(Json(detail))
}

// PATCH /api/invoices/lines/{line_id}
#[utoipa::path(
    patch,
    path = "/api/invoices/lines/{line_id}",
    tag = "Invoices",
    request_body = UpdateLinePayload,
    params(("line_id" = Uuid, Path, description = "ID da linha")),
    responses(
        (status = 200, description = "Linha alterada", body = InvoiceLine),
        (status = 409, description = "Linha já não está pendente")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_line(
    State(app_state): State<AppState>,
    AuthenticatedActor(actor_id): AuthenticatedActor,
    Path(line_id): Path<Uuid>,
    Json(payload): Json<UpdateLinePayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let line = app_state.invoice_service.update_line(actor_id, line_id, &payload).await?;
    Ok(Json(line))
}

// =============================================================================
//  2. FLUXO DE VALIDAÇÃO
// =============================================================================

// POST /api/invoices/{id}/prevalidate
#[utoipa::path(
    post,
    path = "/api/invoices/{id}/prevalidate",
    tag = "Workflow",
    request_body(content = PrevalidatePayload, description = "Opcional; sem corpo, todas as linhas pendentes"),
    params(("id" = Uuid, Path, description = "ID da fatura")),
    responses(
        (status = 200, description = "Linhas pendentes pré-validadas", body = WorkflowOutcome),
        (status = 403, description = "Diretor de outro campus")
    ),
    security(("api_jwt" = []))
)]
pub async fn prevalidate_invoice(
    State(app_state): State<AppState>,
    AuthenticatedActor(actor_id): AuthenticatedActor,
    Path(invoice_id): Path<Uuid>,
    payload: Option<Json<PrevalidatePayload>>,
) -> Result<impl IntoResponse, ApiError> {
    // Sem corpo: todas as linhas, sem observação
    let payload = payload.map(|Json(payload)| payload).unwrap_or_default();
    payload.validate().map_err(AppError::ValidationError)?;

    let outcome = app_state
        .workflow_service
        .prevalidate_lines(
            invoice_id,
            actor_id,
            payload.line_ids.as_deref(),
            payload.observations.as_deref(),
        )
        .await?;

    Ok(Json(outcome))
}

// POST /api/invoices/{id}/validate
#[utoipa::path(
    post,
    path = "/api/invoices/{id}/validate",
    tag = "Workflow",
    params(("id" = Uuid, Path, description = "ID da fatura")),
    responses(
        (status = 200, description = "Fatura validada", body = WorkflowOutcome),
        (status = 409, description = "Fatura não está pré-validada")
    ),
    security(("api_jwt" = []))
)]
pub async fn validate_invoice(
    State(app_state): State<AppState>,
    AuthenticatedActor(actor_id): AuthenticatedActor,
    Path(invoice_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let outcome = app_state.workflow_service.validate_invoice(invoice_id, actor_id).await?;
    Ok(Json(outcome))
}

// POST /api/invoices/{id}/pay
#[utoipa::path(
    post,
    path = "/api/invoices/{id}/pay",
    tag = "Workflow",
    request_body = MarkPaidPayload,
    params(("id" = Uuid, Path, description = "ID da fatura")),
    responses(
        (status = 200, description = "Fatura paga", body = WorkflowOutcome),
        (status = 409, description = "Fatura não está validada")
    ),
    security(("api_jwt" = []))
)]
pub async fn mark_invoice_paid(
    State(app_state): State<AppState>,
    AuthenticatedActor(actor_id): AuthenticatedActor,
    Path(invoice_id): Path<Uuid>,
    Json(payload): Json<MarkPaidPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let outcome = app_state
        .workflow_service
        .mark_invoice_paid(invoice_id, actor_id, payload.payment_date)
        .await?;

    Ok(Json(outcome))
}

// POST /api/invoices/lines/{line_id}/reject
#[utoipa::path(
    post,
    path = "/api/invoices/lines/{line_id}/reject",
    tag = "Workflow",
    request_body = RejectLinePayload,
    params(("line_id" = Uuid, Path, description = "ID da linha")),
    responses(
        (status = 200, description = "Linha rejeitada", body = WorkflowOutcome),
        (status = 409, description = "Linha já validada, paga ou rejeitada"),
        (status = 422, description = "Observação ausente")
    ),
    security(("api_jwt" = []))
)]
pub async fn reject_line(
    State(app_state): State<AppState>,
    AuthenticatedActor(actor_id): AuthenticatedActor,
    Path(line_id): Path<Uuid>,
    Json(payload): Json<RejectLinePayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let outcome = app_state
        .workflow_service
        .reject_line(line_id, actor_id, &payload.observations)
        .await?;

    Ok(Json(outcome))
}
