use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

/// Categoria devolvida ao chamador junto com a mensagem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    NotFound,
    Authorization,
    InvalidState,
    Persistence,
    Validation,
    Authentication,
}

// Nosso tipo de erro, com `thiserror` para melhor ergonomia.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Fatura {0} não encontrada")]
    InvoiceNotFound(Uuid),

    #[error("Linha de fatura {0} não encontrada")]
    LineNotFound(Uuid),

    #[error("Perfil {0} não encontrado")]
    ProfileNotFound(Uuid),

    #[error("Campus {0} não encontrado")]
    CampusNotFound(Uuid),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    InvalidState(String),

    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("{0}")]
    InvalidInput(String),

    #[error("Token inválido")]
    InvalidToken,

    // Variante para erros de banco de dados
    #[error("Erro de banco de dados: {0}")]
    DatabaseError(#[from] sqlx::Error),

    // Falhas do armazenamento que não vêm do sqlx (ex.: commit recusado)
    #[error("Falha de persistência: {0}")]
    Persistence(String),

    // Variante genérica para qualquer outro erro inesperado
    #[error("Erro interno do servidor")]
    InternalServerError(#[from] anyhow::Error),
}

impl AppError {
    /// O diretor tentou agir fora do próprio campus.
    pub fn campus_mismatch() -> Self {
        AppError::Forbidden("directeur can only act on own campus".into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::InvoiceNotFound(_)
            | AppError::LineNotFound(_)
            | AppError::ProfileNotFound(_)
            | AppError::CampusNotFound(_) => ErrorKind::NotFound,
            AppError::Forbidden(_) => ErrorKind::Authorization,
            AppError::InvalidState(_) => ErrorKind::InvalidState,
            AppError::ValidationError(_) | AppError::InvalidInput(_) => ErrorKind::Validation,
            AppError::InvalidToken => ErrorKind::Authentication,
            AppError::DatabaseError(_)
            | AppError::Persistence(_)
            | AppError::InternalServerError(_) => ErrorKind::Persistence,
        }
    }

    pub fn to_api_error(&self) -> ApiError {
        let kind = self.kind();
        let status = match kind {
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Authorization => StatusCode::FORBIDDEN,
            ErrorKind::InvalidState => StatusCode::CONFLICT,
            ErrorKind::Validation => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorKind::Authentication => StatusCode::UNAUTHORIZED,
            ErrorKind::Persistence => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let details = match self {
            AppError::ValidationError(errors) => {
                let mut details = std::collections::HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .map(|e| e.message.as_ref().map(|m| m.to_string()).unwrap_or_else(|| e.code.to_string()))
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                Some(json!(details))
            }
            _ => None,
        };

        // Detalhes de banco não vazam para o cliente
        let error = match kind {
            ErrorKind::Persistence => {
                tracing::error!("Erro Interno do Servidor: {}", self);
                "Ocorreu um erro inesperado ao gravar os dados.".to_string()
            }
            ErrorKind::Validation if details.is_some() => "Um ou mais campos são inválidos.".to_string(),
            _ => self.to_string(),
        };

        ApiError {
            status,
            kind,
            error,
            details,
        }
    }
}

/// A resposta de erro que sai pela API.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub kind: ErrorKind,
    pub error: String,
    pub details: Option<serde_json::Value>,
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        err.to_api_error()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut body = json!({
            "success": false,
            "kind": self.kind,
            "error": self.error,
        });
        if let Some(details) = self.details {
            body["details"] = details;
        }
        (self.status, Json(body)).into_response()
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.to_api_error().into_response()
    }
}
