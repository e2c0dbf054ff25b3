use axum::{
    extract::{Path, State},
    routing::post,
    Json, Router,
};
use serde_json::{json, Value};
use tracing::instrument;

use crate::{
    auth::services::is_valid_email,
    error::ApiError,
    state::AppState,
};

use super::dto::{ForgotPasswordRequest, ResetPasswordRequest};
use super::services;

pub fn forgot_routes() -> Router<AppState> {
    Router::new().route("/forgot-password/", post(forgot_password))
}

pub fn reset_routes() -> Router<AppState> {
    Router::new().route("/reset-password/:token/", post(reset_password))
}

#[instrument(skip(state, payload))]
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(mut payload): Json<ForgotPasswordRequest>,
) -> Result<Json<Value>, ApiError> {
    payload.email = payload.email.trim().to_lowercase();
    if !is_valid_email(&payload.email) {
        return Err(ApiError::Validation("Enter a valid email address.".into()));
    }

    services::request_reset(&state, &payload.email).await?;
    Ok(Json(json!({
        "message": "Password reset link has been sent to your email."
    })))
}

#[instrument(skip(state, payload))]
pub async fn reset_password(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<Json<Value>, ApiError> {
    services::reset_password(&state, &token, &payload.new_password).await?;
    Ok(Json(json!({
        "message": "Password has been reset successfully."
    })))
}
