// src/middleware/auth.rs

use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use uuid::Uuid;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
};

/// Confere o bearer token e deixa o id do perfil nos extensions da requisição.
pub async fn auth_guard(
    State(app_state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let TypedHeader(Authorization(bearer)) = bearer.ok_or(AppError::InvalidToken)?;
    let profile_id = app_state.auth_service.validate_token(bearer.token())?;

    request.extensions_mut().insert(AuthenticatedActor(profile_id));
    Ok(next.run(request).await)
}

// Extrator para obter o ator autenticado diretamente nos handlers
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedActor(pub Uuid);

impl<S> FromRequestParts<S> for AuthenticatedActor
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedActor>()
            .copied()
            .ok_or_else(|| AppError::InvalidToken.into())
    }
}
