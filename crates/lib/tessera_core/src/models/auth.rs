//! Authentication domain models.
//!
//! These are internal domain models, distinct from the API request/response
//! payloads (which carry `#[serde(rename)]` for camelCase etc.).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::AuthError;

/// How the presented credentials were classified.
///
/// `UserLogin` carries both user and client credentials (users always
/// authenticate through a registered client); `ClientLogin` carries client
/// credentials only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthenticationType {
    UserLogin,
    ClientLogin,
}

impl AuthenticationType {
    pub fn as_str(self) -> &'static str {
        match self {
            AuthenticationType::UserLogin => "USER_LOGIN",
            AuthenticationType::ClientLogin => "CLIENT_LOGIN",
        }
    }

    /// Parse the database/claim representation.
    pub fn parse(value: &str) -> Result<Self, AuthError> {
        match value {
            "USER_LOGIN" => Ok(AuthenticationType::UserLogin),
            "CLIENT_LOGIN" => Ok(AuthenticationType::ClientLogin),
            other => Err(AuthError::Internal(format!(
                "unknown authentication type: {other}"
            ))),
        }
    }
}

/// Discriminates access tokens from refresh tokens at decode time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

/// Registered client category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientType {
    Internal,
    External,
}

impl ClientType {
    pub fn as_str(self) -> &'static str {
        match self {
            ClientType::Internal => "INTERNAL",
            ClientType::External => "EXTERNAL",
        }
    }

    pub fn parse(value: &str) -> Result<Self, AuthError> {
        match value {
            "INTERNAL" => Ok(ClientType::Internal),
            "EXTERNAL" => Ok(ClientType::External),
            other => Err(AuthError::Internal(format!("unknown client type: {other}"))),
        }
    }
}

/// Registered client lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientStatus {
    Active,
    Inactive,
}

impl ClientStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ClientStatus::Active => "ACTIVE",
            ClientStatus::Inactive => "INACTIVE",
        }
    }

    pub fn parse(value: &str) -> Result<Self, AuthError> {
        match value {
            "ACTIVE" => Ok(ClientStatus::Active),
            "INACTIVE" => Ok(ClientStatus::Inactive),
            other => Err(AuthError::Internal(format!(
                "unknown client status: {other}"
            ))),
        }
    }
}

/// Which provider verified the user for a given refresh-token row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoginProvider {
    Local,
    Google,
    Facebook,
}

impl LoginProvider {
    pub fn as_str(self) -> &'static str {
        match self {
            LoginProvider::Local => "LOCAL",
            LoginProvider::Google => "GOOGLE",
            LoginProvider::Facebook => "FACEBOOK",
        }
    }

    pub fn parse(value: &str) -> Result<Self, AuthError> {
        match value {
            "LOCAL" => Ok(LoginProvider::Local),
            "GOOGLE" => Ok(LoginProvider::Google),
            "FACEBOOK" => Ok(LoginProvider::Facebook),
            other => Err(AuthError::Internal(format!(
                "unknown login provider: {other}"
            ))),
        }
    }
}

/// Durable user record as read by the credential verifier.
///
/// `password_hash` is nullable: SSO-only accounts have no local password.
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub user_id: Uuid,
    pub email: String,
    pub username: String,
    pub mobile: Option<String>,
    pub password_hash: Option<String>,
    pub enabled: bool,
    pub account_locked: bool,
    pub auth_providers: Vec<String>,
    pub last_password_change: Option<DateTime<Utc>>,
}

/// Durable registered-client record.
///
/// The secret is a pre-shared value compared for equality, not a hashed
/// user password. An empty `origins` list means no origin restriction is
/// enforceable for this client.
#[derive(Debug, Clone)]
pub struct ClientRecord {
    pub client_id: Uuid,
    pub client_name: String,
    pub client_type: ClientType,
    pub client_secret: String,
    pub status: ClientStatus,
    pub origins: Vec<String>,
    pub expires_at: DateTime<Utc>,
}

/// Durable refresh-token metadata, keyed by the token's `jti` claim.
///
/// At most one live row exists per jti; consumption deletes the row.
#[derive(Debug, Clone)]
pub struct RefreshTokenRow {
    pub id: Uuid,
    pub jti: String,
    pub client_id: Uuid,
    pub user_id: Option<Uuid>,
    pub authentication_type: AuthenticationType,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub status: String,
    pub login_provider: Option<LoginProvider>,
    pub sso_token_data: Option<serde_json::Value>,
}

/// Signed token claims (wire format, camelCase).
///
/// One shape covers both token types: access tokens carry authorities and
/// the user/client profile claims, refresh tokens carry the rotation `jti`.
/// Subject is always the client id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenClaims {
    pub iss: String,
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
    #[serde(rename = "type")]
    pub token_type: TokenType,
    pub authentication_type: AuthenticationType,
    pub client_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_type: Option<ClientType>,
    #[serde(default)]
    pub origins: Vec<String>,
    pub remote_address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roles: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scopes: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authorities: Option<Vec<String>>,
}
