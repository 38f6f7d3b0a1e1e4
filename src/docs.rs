// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use crate::handlers;
use crate::models;
use crate::common;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Invoices ---
        handlers::invoices::submit_invoice,
        handlers::invoices::list_invoices,
        handlers::invoices::get_invoice,
        handlers::invoices::update_line,

        // --- Workflow ---
        handlers::invoices::prevalidate_invoice,
        handlers::invoices::validate_invoice,
        handlers::invoices::mark_invoice_paid,
        handlers::invoices::reject_line,

        // --- Campus ---
        handlers::campus::list_campuses,
        handlers::campus::assign_director,
    ),
    components(
        schemas(
            // --- Perfis e Campus ---
            models::profile::Role,
            models::profile::Profile,
            models::campus::Campus,
            models::campus::AssignDirectorPayload,

            // --- Invoices ---
            models::invoice::InvoiceStatus,
            models::invoice::Invoice,
            models::invoice::InvoiceLine,
            models::invoice::InvoiceDetail,
            models::invoice::WorkflowOutcome,

            // --- Payloads ---
            models::invoice::NewInvoiceLine,
            models::invoice::SubmitInvoicePayload,
            models::invoice::UpdateLinePayload,
            models::invoice::PrevalidatePayload,
            models::invoice::RejectLinePayload,
            models::invoice::MarkPaidPayload,

            // --- Auditoria e Erros ---
            models::audit::AuditLog,
            common::error::ErrorKind,
        )
    ),
    tags(
        (name = "Invoices", description = "Lançamento e consulta de faturas"),
        (name = "Workflow", description = "Pré-validação, validação, pagamento e rejeição"),
        (name = "Campus", description = "Campi e atribuição de diretores")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(
                Http::new(HttpAuthScheme::Bearer)
            ),
        );
    }
}
