use crate::application::use_cases::{
    AdminError, BotError, ErrorKind, QueryError, ResolveError, TradeError,
};
use crate::presentation::rest::dto::ErrorResponse;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// API error type
#[derive(Debug)]
pub struct ApiError {
    pub code: ErrorKind,
    pub message: String,
    pub status: StatusCode,
}

impl ApiError {
    pub fn new(code: ErrorKind, message: impl Into<String>) -> Self {
        let status = match code {
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::InsufficientBalance | ErrorKind::InsufficientShares => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ErrorKind::InvalidState => StatusCode::CONFLICT,
            ErrorKind::StoreFailure => StatusCode::INTERNAL_SERVER_ERROR,
        };
        ApiError {
            code,
            message: message.into(),
            status,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    pub fn invalid_parameter(param: &str, reason: &str) -> Self {
        Self::validation(format!("Illegal parameter '{}': {}", param, reason))
    }
}

macro_rules! impl_from_use_case_error {
    ($($error:ty),* $(,)?) => {
        $(
            impl From<$error> for ApiError {
                fn from(e: $error) -> Self {
                    let kind = e.kind();
                    if kind == ErrorKind::StoreFailure {
                        tracing::error!(error = %e, "Store failure");
                    }
                    ApiError::new(kind, e.to_string())
                }
            }
        )*
    };
}

impl_from_use_case_error!(TradeError, ResolveError, QueryError, AdminError, BotError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse::new(self.code, self.message));
        (self.status, body).into_response()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "API Error {}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}
