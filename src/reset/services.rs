use anyhow::Context;
use base64ct::{Base64UrlUnpadded, Encoding};
use rand::{rngs::OsRng, RngCore};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::{info, warn};

use crate::auth::repo::User;
use crate::auth::services::hash_password;
use crate::error::ApiError;
use crate::reset::repo::PasswordResetToken;
use crate::state::AppState;

/// 32 random bytes, base64url without padding: 43 characters, 256 bits.
/// The value doubles as row identifier and proof of possession.
pub fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    Base64UrlUnpadded::encode_string(&bytes)
}

pub(crate) fn validate_new_password(new_password: &str) -> Result<(), ApiError> {
    if new_password.len() < 8 {
        return Err(ApiError::Validation(
            "Ensure this field has at least 8 characters.".into(),
        ));
    }
    Ok(())
}

/// Issue a reset token for the account behind `email` and mail out the
/// link. Earlier outstanding tokens for the same user stay valid until
/// they expire or get consumed. A mail failure fails the request; the
/// orphaned row is harmless and dies at its expiry.
pub async fn request_reset(st: &AppState, email: &str) -> Result<(), ApiError> {
    let user = User::find_by_email(&st.db, email)
        .await?
        .ok_or(ApiError::UnknownEmail)?;

    let token = generate_token();
    let expires_at =
        OffsetDateTime::now_utc() + TimeDuration::minutes(st.config.reset_token_ttl_minutes);
    let row = PasswordResetToken::create(&st.db, user.id, &token, expires_at).await?;

    let reset_link = format!("{}/api/reset-password/{}/", st.config.public_base_url, token);
    st.mailer
        .send(
            &user.email,
            "Password Reset Request",
            &format!("Click the link to reset your password: {reset_link}"),
        )
        .await
        .map_err(ApiError::MailDelivery)?;

    info!(user_id = %user.id, token_id = %row.id, "reset token issued");
    Ok(())
}

/// Consume a reset token and set the new credential.
///
/// Order matters:
///   1. unknown token -> InvalidResetToken
///   2. expired token -> deleted on the spot, ExpiredResetToken
///   3. weak password -> rejected WITHOUT consuming, so the user can retry
///   4. conditional delete + credential update in one transaction; a
///      concurrent consumer losing the race observes InvalidResetToken
pub async fn reset_password(
    st: &AppState,
    token: &str,
    new_password: &str,
) -> Result<(), ApiError> {
    let row = PasswordResetToken::find_by_token(&st.db, token)
        .await?
        .ok_or(ApiError::InvalidResetToken)?;

    if OffsetDateTime::now_utc() > row.expires_at {
        PasswordResetToken::delete(&st.db, row.id).await?;
        warn!(token_id = %row.id, user_id = %row.user_id, "expired reset token destroyed");
        return Err(ApiError::ExpiredResetToken);
    }

    validate_new_password(new_password)?;

    // argon2 work happens before the transaction opens
    let password_hash = hash_password(new_password)?;

    let mut tx = st.db.begin().await.context("begin reset tx")?;
    if !PasswordResetToken::consume_tx(&mut tx, row.id).await? {
        return Err(ApiError::InvalidResetToken);
    }
    User::set_password_tx(&mut tx, row.user_id, &password_hash).await?;
    tx.commit().await.context("commit reset tx")?;

    info!(user_id = %row.user_id, token_id = %row.id, "password reset");
    Ok(())
}

#[cfg(test)]
mod token_tests {
    use super::*;

    #[test]
    fn token_is_43_urlsafe_chars() {
        let token = generate_token();
        assert_eq!(token.len(), 43);
        assert!(token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn tokens_do_not_repeat() {
        let mut seen = std::collections::HashSet::new();
        for _ in 0..1000 {
            assert!(seen.insert(generate_token()));
        }
    }

    #[test]
    fn token_round_trips_as_256_bits() {
        let token = generate_token();
        let mut buf = [0u8; 32];
        let decoded = Base64UrlUnpadded::decode(&token, &mut buf).expect("valid base64url");
        assert_eq!(decoded.len(), 32);
    }
}

#[cfg(test)]
mod policy_tests {
    use super::*;

    #[test]
    fn eight_chars_is_the_floor() {
        assert!(validate_new_password("newpass123").is_ok());
        assert!(validate_new_password("12345678").is_ok());
        assert!(matches!(
            validate_new_password("1234567"),
            Err(ApiError::Validation(_))
        ));
        assert!(matches!(
            validate_new_password(""),
            Err(ApiError::Validation(_))
        ));
    }
}
