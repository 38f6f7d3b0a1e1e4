// src/services/auth.rs

use jsonwebtoken::{decode, DecodingKey, Validation};
use uuid::Uuid;

use crate::{common::error::AppError, models::auth::Claims};

/// Lê o bearer token. Os tokens são emitidos pelo provedor de identidade;
/// aqui só se confere a assinatura e a validade.
#[derive(Clone)]
pub struct AuthService {
    jwt_secret: String,
}

impl AuthService {
    pub fn new(jwt_secret: String) -> Self {
        Self { jwt_secret }
    }

    /// Devolve o id do perfil (`sub`). Papel e campus não vêm do token.
    pub fn validate_token(&self, token: &str) -> Result<Uuid, AppError> {
        let validation = Validation::default();
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_ref()),
            &validation,
        )
        .map_err(|e| {
            tracing::debug!("Token recusado: {}", e);
            AppError::InvalidToken
        })?;

        Ok(token_data.claims.sub)
    }
}
