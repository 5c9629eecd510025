use crate::config::ConfigError;
use crate::store::StoreError;
use crate::store::auth::AuthError;
use axum::http::StatusCode;
use thiserror::Error;

#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        let status = match &err {
            StoreError::InvalidRecord(_) => StatusCode::BAD_REQUEST,
            StoreError::RowNotFound(_) => StatusCode::NOT_FOUND,
            StoreError::SchemaMismatch { .. } => StatusCode::CONFLICT,
            StoreError::WriteFailed(_) => StatusCode::BAD_GATEWAY,
            StoreError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        (self.status, self.message).into_response()
    }
}

/// Failures that stop the process before it serves anything.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("authentication: {0}")]
    Auth(#[from] AuthError),

    #[error("store: {0}")]
    Store(#[from] StoreError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_map_to_statuses() {
        let cases = [
            (StoreError::InvalidRecord("x".into()), StatusCode::BAD_REQUEST),
            (StoreError::RowNotFound("x".into()), StatusCode::NOT_FOUND),
            (StoreError::WriteFailed("x".into()), StatusCode::BAD_GATEWAY),
            (StoreError::Unavailable("x".into()), StatusCode::SERVICE_UNAVAILABLE),
            (
                StoreError::SchemaMismatch {
                    worksheet: "Sheet1".into(),
                    expected: vec!["DATE".into()],
                    found: vec!["WHEN".into()],
                },
                StatusCode::CONFLICT,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(AppError::from(err).status, status);
        }
    }
}
