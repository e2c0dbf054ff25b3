use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Request-level error taxonomy. Every handler failure is one of these and
/// is turned into a status + `{"error": ...}` body at the boundary.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Authentication required")]
    Unauthenticated,
    #[error("You do not have permission to perform this action.")]
    Forbidden,
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("User with this email does not exist.")]
    UnknownEmail,
    #[error("Invalid or expired token.")]
    InvalidResetToken,
    #[error("Token has expired.")]
    ExpiredResetToken,
    #[error("failed to send email")]
    MailDelivery(#[source] anyhow::Error),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_)
            | ApiError::InvalidCredentials
            | ApiError::UnknownEmail
            | ApiError::InvalidResetToken
            | ApiError::ExpiredResetToken => StatusCode::BAD_REQUEST,
            ApiError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::MailDelivery(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ApiError::Internal(e) => {
                error!(error = %e, "internal error");
                "Internal server error".to_string()
            }
            ApiError::MailDelivery(e) => {
                error!(error = %e, "mail delivery failed");
                self.to_string()
            }
            _ => self.to_string(),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_match_the_taxonomy() {
        assert_eq!(
            ApiError::Validation("bad".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::InvalidCredentials.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::Unauthenticated.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::Forbidden.status(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::NotFound("blog").status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::UnknownEmail.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::InvalidResetToken.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::ExpiredResetToken.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::MailDelivery(anyhow::anyhow!("smtp down")).status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            ApiError::Internal(anyhow::anyhow!("boom")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn internal_message_is_generic() {
        let err = ApiError::Internal(anyhow::anyhow!("connection refused on 10.0.0.3"));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn reset_token_errors_use_distinct_messages() {
        assert_eq!(
            ApiError::InvalidResetToken.to_string(),
            "Invalid or expired token."
        );
        assert_eq!(ApiError::ExpiredResetToken.to_string(), "Token has expired.");
    }
}
