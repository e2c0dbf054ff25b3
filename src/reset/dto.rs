use serde::Deserialize;

/// Request body for /forgot-password/.
#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

/// Request body for /reset-password/{token}/. The token itself travels in
/// the path: it is both identifier and proof of possession, so no user id
/// is accepted here.
#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub new_password: String,
}
