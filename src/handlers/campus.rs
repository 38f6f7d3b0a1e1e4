// src/handlers/campus.rs

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::{
    common::error::ApiError,
    config::AppState,
    middleware::auth::AuthenticatedActor,
    models::campus::{AssignDirectorPayload, Campus},
};

// GET /api/campuses
#[utoipa::path(
    get,
    path = "/api/campuses",
    tag = "Campus",
    responses(
        (status = 200, description = "Campi em ordem alfabética", body = Vec<Campus>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_campuses(
    State(app_state): State<AppState>,
    _actor: AuthenticatedActor,
) -> Result<impl IntoResponse, ApiError> {
    let campuses = app_state.campus_service.list_campuses().await?;
    Ok(Json(campuses))
}

// POST /api/campuses/{id}/director
#[utoipa::path(
    post,
    path = "/api/campuses/{id}/director",
    tag = "Campus",
    request_body = AssignDirectorPayload,
    params(("id" = Uuid, Path, description = "ID do campus")),
    responses(
        (status = 200, description = "Diretor atribuído", body = Campus),
        (status = 403, description = "Apenas SUPER_ADMIN")
    ),
    security(("api_jwt" = []))
)]
pub async fn assign_director(
    State(app_state): State<AppState>,
    AuthenticatedActor(actor_id): AuthenticatedActor,
    Path(campus_id): Path<Uuid>,
    Json(payload): Json<AssignDirectorPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let campus = app_state
        .campus_service
        .assign_director_to_campus(actor_id, campus_id, payload.director_id)
        .await?;

    Ok(Json(campus))
}
