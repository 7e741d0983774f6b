//! Credential verification.
//!
//! Resolves and checks user and client credentials against the store.
//! Classification of the submitted credential combination runs first,
//! because it selects which verification path executes.

use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use super::AuthError;
use super::entrypoint::Entrypoint;
use super::password::verify_password;
use super::queries;
use crate::models::auth::{AuthenticationType, ClientRecord, ClientStatus, UserRecord};

/// The two accepted credential combinations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginKind<'a> {
    User {
        entrypoint: &'a str,
        password: &'a str,
        client_id: &'a str,
        client_secret: &'a str,
    },
    Client {
        client_id: &'a str,
        client_secret: &'a str,
    },
}

impl LoginKind<'_> {
    pub fn authentication_type(&self) -> AuthenticationType {
        match self {
            LoginKind::User { .. } => AuthenticationType::UserLogin,
            LoginKind::Client { .. } => AuthenticationType::ClientLogin,
        }
    }
}

/// Classify the submitted credential combination.
///
/// Exactly two shapes are accepted: client-only credentials
/// (`CLIENT_LOGIN`) and the full user + client set (`USER_LOGIN`). Partial
/// combinations are rejected explicitly instead of defaulting to a user
/// login.
pub fn classify_login<'a>(
    entrypoint: Option<&'a str>,
    password: Option<&'a str>,
    client_id: Option<&'a str>,
    client_secret: Option<&'a str>,
) -> Result<LoginKind<'a>, AuthError> {
    let client_id = client_id.ok_or(AuthError::ClientIdRequired)?;
    let client_secret = client_secret.ok_or(AuthError::ClientSecretRequired)?;
    match (entrypoint, password) {
        (None, None) => Ok(LoginKind::Client {
            client_id,
            client_secret,
        }),
        (Some(entrypoint), Some(password)) => Ok(LoginKind::User {
            entrypoint,
            password,
            client_id,
            client_secret,
        }),
        (Some(_), None) => Err(AuthError::PasswordRequired),
        (None, Some(_)) => Err(AuthError::EntrypointRequired),
    }
}

/// Parse a submitted client id.
pub fn parse_client_id(value: &str) -> Result<Uuid, AuthError> {
    Uuid::parse_str(value).map_err(|_| AuthError::ClientIdInvalid)
}

/// Verify user credentials: resolve by entrypoint kind, check the password
/// hash, then the account status.
pub async fn verify_user(
    pool: &PgPool,
    entrypoint: &str,
    password: &str,
) -> Result<(UserRecord, Vec<String>), AuthError> {
    let entrypoint = Entrypoint::parse(entrypoint);
    info!(kind = %entrypoint.kind, "verifying user credentials");

    let user = queries::find_user_by_entrypoint(pool, &entrypoint)
        .await?
        .ok_or(AuthError::PrincipalNotFound(entrypoint.kind))?;

    // SSO-only accounts have no local password and cannot password-login
    let hash = user
        .password_hash
        .as_deref()
        .ok_or(AuthError::IncorrectPassword)?;
    if !verify_password(password, hash)? {
        return Err(AuthError::IncorrectPassword);
    }

    check_account_status(&user)?;
    let roles = queries::user_roles(pool, user.user_id).await?;
    Ok((user, roles))
}

/// Re-verify a user resolved from a refresh token: status checks only.
pub async fn verify_user_by_id(
    pool: &PgPool,
    user_id: Uuid,
) -> Result<(UserRecord, Vec<String>), AuthError> {
    let user = queries::find_user_by_id(pool, user_id)
        .await?
        .ok_or(AuthError::UserNotFound)?;
    check_account_status(&user)?;
    let roles = queries::user_roles(pool, user.user_id).await?;
    Ok((user, roles))
}

/// Verify client credentials: pre-shared secret equality, expiry, status.
pub async fn verify_client(
    pool: &PgPool,
    client_id: Uuid,
    client_secret: &str,
) -> Result<(ClientRecord, Vec<String>), AuthError> {
    let client = queries::find_client_by_id(pool, client_id)
        .await?
        .ok_or(AuthError::ClientNotFound)?;

    if client.client_secret != client_secret {
        return Err(AuthError::ClientSecretInvalid);
    }
    check_client_status(&client)?;
    let scopes = queries::client_scopes(pool, client.client_id).await?;
    Ok((client, scopes))
}

/// Re-verify a client resolved from a refresh token: expiry and status only.
pub async fn verify_client_by_id(
    pool: &PgPool,
    client_id: Uuid,
) -> Result<(ClientRecord, Vec<String>), AuthError> {
    let client = queries::find_client_by_id(pool, client_id)
        .await?
        .ok_or(AuthError::ClientNotFound)?;
    check_client_status(&client)?;
    let scopes = queries::client_scopes(pool, client.client_id).await?;
    Ok((client, scopes))
}

fn check_account_status(user: &UserRecord) -> Result<(), AuthError> {
    if !user.enabled {
        return Err(AuthError::AccountDisabled);
    }
    if user.account_locked {
        return Err(AuthError::AccountLocked);
    }
    Ok(())
}

fn check_client_status(client: &ClientRecord) -> Result<(), AuthError> {
    if chrono::Utc::now() > client.expires_at {
        return Err(AuthError::ClientExpired);
    }
    if client.status != ClientStatus::Active {
        return Err(AuthError::ClientInactive);
    }
    Ok(())
}
