//! Refresh-token rotation store.
//!
//! One row per issued refresh token, keyed by jti. Consumption is a
//! single atomic delete-and-return: after a successful `consume` the row
//! is gone, so a second presentation of the same token — stolen or
//! replayed — is permanently rejectable.

use sqlx::PgPool;
use tracing::info;

use super::AuthError;
use super::identity::AuthIdentity;
use super::queries;
use super::tokens::IssuedRefreshToken;
use crate::models::auth::{LoginProvider, RefreshTokenRow, TokenClaims};
use crate::uuid::uuidv7;

/// Status written for every live row.
const STATUS_ACTIVE: &str = "ACTIVE";

/// Persist the rotation row for a freshly issued refresh token.
///
/// Called after the response is built: a crash beforehand yields a token
/// whose refresh leg fails on first use, never a dangling row.
pub async fn persist(
    pool: &PgPool,
    identity: &AuthIdentity,
    issued: &IssuedRefreshToken,
) -> Result<(), AuthError> {
    let client_id = uuid::Uuid::parse_str(&identity.client().client_id)
        .map_err(|e| AuthError::Internal(format!("identity client id: {e}")))?;
    let user_id = identity
        .user()
        .map(|u| uuid::Uuid::parse_str(&u.user_id))
        .transpose()
        .map_err(|e| AuthError::Internal(format!("identity user id: {e}")))?;

    let row = RefreshTokenRow {
        id: uuidv7(),
        jti: issued.jti.clone(),
        client_id,
        user_id,
        authentication_type: identity.authentication_type(),
        issued_at: chrono::Utc::now(),
        expires_at: issued.expires_at,
        status: STATUS_ACTIVE.to_string(),
        login_provider: identity.user().map(|_| LoginProvider::Local),
        sso_token_data: None,
    };
    queries::insert_refresh_token(pool, &row).await?;
    info!(jti = %issued.jti, "refresh token persisted");
    Ok(())
}

/// Consume the rotation row for a presented refresh token.
///
/// The row is deleted in the same statement that reads it; an absent row
/// (already used, forged, or reaped) is `RefreshTokenInvalid`. The
/// token's embedded remote address is then re-checked against the caller
/// before any rotation proceeds, so a stolen token presented from a
/// different network origin never yields a working replacement.
pub async fn consume(
    pool: &PgPool,
    claims: &TokenClaims,
    caller_address: &str,
) -> Result<RefreshTokenRow, AuthError> {
    let jti = claims.jti.as_deref().ok_or(AuthError::RefreshTokenInvalid)?;
    let row = queries::consume_refresh_token(pool, jti)
        .await?
        .ok_or(AuthError::RefreshTokenInvalid)?;

    if claims.remote_address != caller_address {
        return Err(AuthError::RemoteAddressMismatch);
    }
    if chrono::Utc::now() > row.expires_at {
        return Err(AuthError::RefreshTokenExpired);
    }
    info!(jti = %row.jti, "refresh token consumed");
    Ok(row)
}

/// Revoke a refresh token at logout. Idempotent: a missing row is fine.
pub async fn revoke(pool: &PgPool, jti: &str) -> Result<(), AuthError> {
    queries::delete_refresh_token(pool, jti).await?;
    Ok(())
}
