//! Application error types.
//!
//! Every auth failure is handled where it is detected and converted here,
//! at the boundary, into the structured error body. Only infrastructure
//! faults surface as 500, with the real cause kept in logs.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use tessera_core::auth::AuthError;

use crate::models::ErrorResponse;

/// Convenience alias for handler return types.
pub type AppResult<T> = Result<T, AppError>;

/// Application-level errors with HTTP status mapping.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Auth(#[from] AuthError),
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        AppError::Auth(AuthError::Db(e))
    }
}

impl AppError {
    fn status(&self) -> StatusCode {
        let AppError::Auth(auth) = self;
        match auth {
            AuthError::AuthoritiesMissing => StatusCode::FORBIDDEN,
            AuthError::ClientIdRequired
            | AuthError::ClientSecretRequired
            | AuthError::PasswordRequired
            | AuthError::EntrypointRequired
            | AuthError::ClientIdInvalid => StatusCode::BAD_REQUEST,
            AuthError::SigningKey(_) | AuthError::Db(_) | AuthError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            _ => StatusCode::UNAUTHORIZED,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let AppError::Auth(auth) = &self;

        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %auth, "internal error");
            "Internal error occurred at backend".to_string()
        } else {
            tracing::warn!(code = %auth.code(), error = %auth, "request rejected");
            auth.to_string()
        };

        let body = ErrorResponse {
            code: auth.code(),
            message,
            breadcrumb_id: None,
            token_expired: auth.is_token_expired(),
        };

        // The breadcrumb middleware finds the body in the response
        // extensions and stamps the correlation id into it.
        let mut response = (status, Json(body.clone())).into_response();
        response.extensions_mut().insert(body);
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_the_taxonomy() {
        assert_eq!(
            AppError::Auth(AuthError::IncorrectPassword).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::Auth(AuthError::AuthoritiesMissing).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AppError::Auth(AuthError::PasswordRequired).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Auth(AuthError::Internal("boom".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn principal_lookups_never_surface_as_404() {
        use tessera_core::auth::entrypoint::EntrypointKind;
        // 401, not 404: avoids user enumeration
        assert_eq!(
            AppError::Auth(AuthError::PrincipalNotFound(EntrypointKind::Email)).status(),
            StatusCode::UNAUTHORIZED
        );
    }
}
