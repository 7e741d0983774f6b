//! RS256 token codec.
//!
//! Signs access and refresh tokens for an [`AuthIdentity`] and decodes
//! presented tokens back into claims. Expiry is checked explicitly after
//! signature verification so an expired token is always classified as
//! expired, never as malformed.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, Header, Validation, decode, encode};
use uuid::Uuid;

use super::AuthError;
use super::identity::{AuthIdentity, UNIVERSAL_ORIGIN};
use super::keys::SigningKeys;
use crate::models::auth::{TokenClaims, TokenType};

/// Issuer stamped into every token.
pub const SERVICE_NAME: &str = "tessera";

/// Token lifetimes. The long access TTL applies when the request carries
/// no `Origin` header (server-to-server and tooling callers).
#[derive(Debug, Clone)]
pub struct TokenSettings {
    pub access_ttl_minutes: i64,
    pub long_access_ttl_minutes: i64,
    pub refresh_ttl_days: i64,
}

impl Default for TokenSettings {
    fn default() -> Self {
        Self {
            access_ttl_minutes: 15,
            long_access_ttl_minutes: 240,
            refresh_ttl_days: 30,
        }
    }
}

/// A freshly generated refresh token plus the rotation key persisted for it.
#[derive(Debug, Clone)]
pub struct IssuedRefreshToken {
    pub token: String,
    pub jti: String,
    pub expires_at: DateTime<Utc>,
}

/// Signs and verifies tokens with the process-wide key pair.
///
/// Stateless and CPU-bound; safe to share across request workers.
pub struct TokenCodec {
    keys: SigningKeys,
    settings: TokenSettings,
    environment: String,
}

impl TokenCodec {
    pub fn new(keys: SigningKeys, settings: TokenSettings, environment: impl Into<String>) -> Self {
        Self {
            keys,
            settings,
            environment: environment.into(),
        }
    }

    pub fn settings(&self) -> &TokenSettings {
        &self.settings
    }

    /// Access-token lifetime for a request: short when a browser `Origin`
    /// header is present, long otherwise.
    pub fn access_ttl(&self, origin: Option<&str>) -> Duration {
        match origin {
            Some(_) => Duration::minutes(self.settings.access_ttl_minutes),
            None => Duration::minutes(self.settings.long_access_ttl_minutes),
        }
    }

    /// Sign an access token for the identity.
    pub fn issue_access_token(
        &self,
        identity: &AuthIdentity,
        origin: Option<&str>,
    ) -> Result<String, AuthError> {
        let now = Utc::now();
        let exp = now + self.access_ttl(origin);
        let client = identity.client();

        let mut claims = TokenClaims {
            iss: SERVICE_NAME.to_string(),
            sub: client.client_id.clone(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
            token_type: TokenType::Access,
            authentication_type: identity.authentication_type(),
            client_id: client.client_id.clone(),
            client_name: Some(client.client_name.clone()),
            client_type: Some(client.client_type),
            origins: claim_origins(&client.origins),
            remote_address: client.remote_address.clone(),
            environment: Some(self.environment.clone()),
            jti: None,
            user_id: None,
            username: None,
            email: None,
            roles: None,
            scopes: Some(client.scopes.clone()),
            authorities: Some(identity.authorities()),
        };
        if let AuthIdentity::User(user) = identity {
            claims.user_id = Some(user.user_id.clone());
            claims.username = Some(user.username.clone());
            claims.email = Some(user.email.clone());
            claims.roles = Some(user.roles.clone());
        }
        self.sign(&claims)
    }

    /// Sign a refresh token with a fresh `jti` rotation key.
    pub fn issue_refresh_token(
        &self,
        identity: &AuthIdentity,
    ) -> Result<IssuedRefreshToken, AuthError> {
        let now = Utc::now();
        let expires_at = now + Duration::days(self.settings.refresh_ttl_days);
        let jti = Uuid::new_v4().to_string();
        let client = identity.client();

        let claims = TokenClaims {
            iss: SERVICE_NAME.to_string(),
            sub: client.client_id.clone(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            token_type: TokenType::Refresh,
            authentication_type: identity.authentication_type(),
            client_id: client.client_id.clone(),
            client_name: Some(client.client_name.clone()),
            client_type: Some(client.client_type),
            origins: claim_origins(&client.origins),
            remote_address: client.remote_address.clone(),
            environment: Some(self.environment.clone()),
            jti: Some(jti.clone()),
            user_id: identity.user().map(|u| u.user_id.clone()),
            username: None,
            email: None,
            roles: None,
            scopes: None,
            authorities: None,
        };
        Ok(IssuedRefreshToken {
            token: self.sign(&claims)?,
            jti,
            expires_at,
        })
    }

    /// Decode a presented token. Expired signatures classify as
    /// [`AuthError::TokenExpired`]; every other failure is
    /// [`AuthError::TokenMalformed`].
    pub fn decode(&self, token: &str) -> Result<TokenClaims, AuthError> {
        let claims = self.verify(token)?;
        if Utc::now().timestamp() > claims.exp {
            return Err(AuthError::TokenExpired);
        }
        Ok(claims)
    }

    /// Decode a presented refresh token; an expired one reads as
    /// [`AuthError::RefreshTokenExpired`] so callers know re-login is needed.
    pub fn decode_refresh(&self, token: &str) -> Result<TokenClaims, AuthError> {
        match self.decode(token) {
            Ok(claims) => Ok(claims),
            Err(AuthError::TokenExpired) => Err(AuthError::RefreshTokenExpired),
            Err(e) => Err(e),
        }
    }

    fn sign(&self, claims: &TokenClaims) -> Result<String, AuthError> {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(self.keys.kid().to_string());
        encode(&header, claims, self.keys.encoding_key())
            .map_err(|e| AuthError::Internal(format!("token signing failed: {e}")))
    }

    /// Verify the signature and deserialize claims, without expiry
    /// validation — the caller classifies expiry separately.
    fn verify(&self, token: &str) -> Result<TokenClaims, AuthError> {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.validate_exp = false;
        validation.set_issuer(&[SERVICE_NAME]);

        decode::<TokenClaims>(token, self.keys.decoding_key(), &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(error = %e, "token verification failed");
                AuthError::TokenMalformed
            })
    }
}

/// An empty registered-origin list encodes as the universal origin so the
/// claim is always present.
fn claim_origins(origins: &[String]) -> Vec<String> {
    if origins.is_empty() {
        vec![UNIVERSAL_ORIGIN.to_string()]
    } else {
        origins.to_vec()
    }
}
