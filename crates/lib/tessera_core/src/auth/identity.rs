//! Canonical authenticated principal.
//!
//! `AuthIdentity` is a tagged union: the `User` variant carries the user
//! profile plus the client it authenticated through; the `Client` variant
//! carries client fields only. Downstream code dispatches on the variant
//! instead of testing conditionally-populated fields.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::AuthError;
use crate::models::auth::{
    AuthenticationType, ClientRecord, ClientType, TokenClaims, UserRecord,
};

/// Placeholder origin written into token claims when a client has no
/// registered origins (i.e. no restriction is enforceable).
pub const UNIVERSAL_ORIGIN: &str = "0.0.0.0";

/// Client half of an authenticated principal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientIdentity {
    pub client_id: String,
    pub client_name: String,
    pub client_type: ClientType,
    pub scopes: Vec<String>,
    pub origins: Vec<String>,
    /// Caller address bound at issuance, re-checked at presentation.
    pub remote_address: String,
}

/// User principal: profile fields plus the client it logged in through.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub user_id: String,
    pub username: String,
    pub email: String,
    pub mobile: Option<String>,
    pub roles: Vec<String>,
    pub providers: Vec<String>,
    pub has_password: bool,
    pub last_password_change: Option<DateTime<Utc>>,
    pub client: ClientIdentity,
}

/// The authenticated principal for a request or login.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AuthIdentity {
    User(UserIdentity),
    Client(ClientIdentity),
}

impl AuthIdentity {
    /// Assemble a user principal from verified records.
    pub fn assemble_user(
        user: &UserRecord,
        roles: Vec<String>,
        client: &ClientRecord,
        scopes: Vec<String>,
        remote_address: &str,
    ) -> Self {
        AuthIdentity::User(UserIdentity {
            user_id: user.user_id.to_string(),
            username: user.username.clone(),
            email: user.email.clone(),
            mobile: user.mobile.clone(),
            roles,
            providers: user.auth_providers.clone(),
            has_password: user.password_hash.is_some(),
            last_password_change: user.last_password_change,
            client: client_identity(client, scopes, remote_address),
        })
    }

    /// Assemble a client-only principal from a verified client record.
    pub fn assemble_client(
        client: &ClientRecord,
        scopes: Vec<String>,
        remote_address: &str,
    ) -> Self {
        AuthIdentity::Client(client_identity(client, scopes, remote_address))
    }

    /// Rebuild an identity purely from decoded access-token claims — no
    /// database round-trip, which keeps resource-request authentication
    /// stateless. Required claims missing for the declared authentication
    /// type read as a malformed token.
    pub fn from_claims(claims: &TokenClaims) -> Result<Self, AuthError> {
        let client = ClientIdentity {
            client_id: claims.client_id.clone(),
            client_name: claims.client_name.clone().unwrap_or_default(),
            client_type: claims.client_type.ok_or(AuthError::TokenMalformed)?,
            scopes: claims.scopes.clone().unwrap_or_default(),
            origins: registered_origins(&claims.origins),
            remote_address: claims.remote_address.clone(),
        };
        match claims.authentication_type {
            AuthenticationType::ClientLogin => Ok(AuthIdentity::Client(client)),
            AuthenticationType::UserLogin => Ok(AuthIdentity::User(UserIdentity {
                user_id: claims.user_id.clone().ok_or(AuthError::TokenMalformed)?,
                username: claims.username.clone().ok_or(AuthError::TokenMalformed)?,
                email: claims.email.clone().ok_or(AuthError::TokenMalformed)?,
                mobile: None,
                roles: claims.roles.clone().unwrap_or_default(),
                providers: Vec::new(),
                has_password: false,
                last_password_change: None,
                client,
            })),
        }
    }

    pub fn authentication_type(&self) -> AuthenticationType {
        match self {
            AuthIdentity::User(_) => AuthenticationType::UserLogin,
            AuthIdentity::Client(_) => AuthenticationType::ClientLogin,
        }
    }

    pub fn client(&self) -> &ClientIdentity {
        match self {
            AuthIdentity::User(user) => &user.client,
            AuthIdentity::Client(client) => client,
        }
    }

    pub fn user(&self) -> Option<&UserIdentity> {
        match self {
            AuthIdentity::User(user) => Some(user),
            AuthIdentity::Client(_) => None,
        }
    }

    /// Flat authority set: user roles first, then client scopes. Order is
    /// stable within a single response.
    pub fn authorities(&self) -> Vec<String> {
        let mut authorities = match self {
            AuthIdentity::User(user) => user.roles.clone(),
            AuthIdentity::Client(_) => Vec::new(),
        };
        authorities.extend(self.client().scopes.iter().cloned());
        authorities
    }
}

fn client_identity(client: &ClientRecord, scopes: Vec<String>, remote_address: &str) -> ClientIdentity {
    ClientIdentity {
        client_id: client.client_id.to_string(),
        client_name: client.client_name.clone(),
        client_type: client.client_type,
        scopes,
        origins: client.origins.clone(),
        remote_address: remote_address.to_string(),
    }
}

/// Claim origin lists encode "no restriction" as `["0.0.0.0"]`; normalize
/// that back to an empty list when rebuilding an identity.
fn registered_origins(claim_origins: &[String]) -> Vec<String> {
    if claim_origins.len() == 1 && claim_origins[0] == UNIVERSAL_ORIGIN {
        Vec::new()
    } else {
        claim_origins.to_vec()
    }
}
