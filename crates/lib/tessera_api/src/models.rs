//! API request/response payloads.
//!
//! Wire shapes are camelCase; domain models live in `tessera_core`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tessera_core::models::auth::{AuthenticationType, ClientType};

/// `POST /auth/login` body. Entrypoint + password are absent for
/// client-only logins.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticateRequest {
    pub entrypoint: Option<String>,
    pub password: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
}

/// Successful login/refresh response. The refresh token itself travels in
/// the cookie, never in the body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub access_token: String,
    pub token_type: String,
    /// Access-token lifetime in seconds.
    pub expires_in: i64,
    /// True when the long (originless) TTL was applied.
    pub long_token: bool,
    pub authentication_type: AuthenticationType,
    pub client_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub roles: Vec<String>,
    pub scopes: Vec<String>,
    pub providers: Vec<String>,
    pub has_password: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_password_change: Option<DateTime<Utc>>,
}

/// `POST /auth/logout` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogoutResponse {
    pub success: bool,
}

/// `GET /auth/identity` response — the request's claims-derived identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityResponse {
    pub authentication_type: AuthenticationType,
    pub client_id: String,
    pub client_name: String,
    pub client_type: ClientType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub roles: Vec<String>,
    pub scopes: Vec<String>,
    pub origins: Vec<String>,
    pub authorities: Vec<String>,
    pub remote_address: String,
}

/// Structured error body returned on every failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    /// Stable error code (`TESSERA-1nnn`).
    pub code: String,
    pub message: String,
    /// Correlation id assigned by the breadcrumb middleware.
    pub breadcrumb_id: Option<String>,
    /// True when the failure is an expired token and a refresh may help.
    pub token_expired: bool,
}
