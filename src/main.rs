//src/main.rs

use axum::{
    middleware as axum_middleware,
    routing::{get, patch, post},
    Router,
};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod common;
mod config;
mod db;
mod docs;
mod handlers;
mod middleware;
mod models;
mod services;

use crate::config::{AppState, Settings};
use crate::docs::ApiDoc;
use crate::middleware::auth::auth_guard;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    let settings = Settings::from_env()?;
    let app_state = AppState::new(&settings).await?;

    // Faz o app rodar as migrações do SQLx na inicialização
    sqlx::migrate!().run(&app_state.db_pool).await?;
    tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

    let invoice_routes = Router::new()
        .route(
            "/",
            post(handlers::invoices::submit_invoice).get(handlers::invoices::list_invoices),
        )
        .route("/{id}", get(handlers::invoices::get_invoice))
        .route("/{id}/prevalidate", post(handlers::invoices::prevalidate_invoice))
        .route("/{id}/validate", post(handlers::invoices::validate_invoice))
        .route("/{id}/pay", post(handlers::invoices::mark_invoice_paid))
        .route("/lines/{line_id}", patch(handlers::invoices::update_line))
        .route("/lines/{line_id}/reject", post(handlers::invoices::reject_line))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    let campus_routes = Router::new()
        .route("/", get(handlers::campus::list_campuses))
        .route("/{id}/director", post(handlers::campus::assign_director))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    // Combina tudo no router principal
    let app = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/api/health", get(|| async { "OK" }))
        .nest("/api/invoices", invoice_routes)
        .nest("/api/campuses", campus_routes)
        .with_state(app_state);

    // Inicia o servidor
    let listener = TcpListener::bind(settings.bind_addr).await?;
    tracing::info!("🚀 Servidor escutando em {}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
