//! Token authenticator middleware.
//!
//! Runs on every request. A missing bearer token is not an error — the
//! request continues anonymous and protected handlers reject it via
//! [`CurrentIdentity`]. A presented token walks the full check sequence:
//! decode, token-type check, claims-only identity rebuild, then the
//! request-time policy (remote-address binding; path trust tiers for
//! client-only tokens). Any rejection short-circuits with the structured
//! error body.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::header::AUTHORIZATION,
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Response},
};

use tessera_core::auth::AuthError;
use tessera_core::auth::identity::AuthIdentity;
use tessera_core::models::auth::TokenType;

use crate::AppState;
use crate::error::AppError;
use crate::middleware::paths;
use crate::request_info::RequestInfo;

/// The authenticated principal, available to handlers once the
/// authenticator has accepted a token.
#[derive(Debug, Clone)]
pub struct CurrentIdentity(pub AuthIdentity);

impl<S> FromRequestParts<S> for CurrentIdentity
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentIdentity>()
            .cloned()
            .ok_or(AppError::Auth(AuthError::AccessTokenRequired))
    }
}

/// Axum middleware: authenticate a bearer token when one is presented.
pub async fn authenticate(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(token) = bearer_token(&request) else {
        return next.run(request).await;
    };

    let info = RequestInfo::from_headers(request.headers(), request.extensions());
    match authenticate_token(&state, &token, &info, request.uri().path()) {
        Ok(identity) => {
            request.extensions_mut().insert(CurrentIdentity(identity));
            next.run(request).await
        }
        Err(e) => AppError::Auth(e).into_response(),
    }
}

/// Extract `Bearer <token>` from the Authorization header. Anything else
/// reads as "no token presented".
fn bearer_token(request: &Request) -> Option<String> {
    request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string)
}

/// Decode the token, rebuild the identity from claims alone, and apply
/// the request-time policy checks.
fn authenticate_token(
    state: &AppState,
    token: &str,
    info: &RequestInfo,
    path: &str,
) -> Result<AuthIdentity, AuthError> {
    let claims = state.codec.decode(token)?;

    // Refresh tokens never authenticate a resource request
    if claims.token_type == TokenType::Refresh {
        return Err(AuthError::RefreshTokenNotAllowed);
    }

    let identity = AuthIdentity::from_claims(&claims)?;
    match &identity {
        AuthIdentity::User(_) => {
            if state.config.enforce_remote_address {
                check_remote_address(&identity, info)?;
            }
        }
        AuthIdentity::Client(_) => {
            check_client_path(state, path)?;
            check_remote_address(&identity, info)?;
        }
    }
    Ok(identity)
}

/// The address bound at issuance must equal the caller's resolved address.
fn check_remote_address(identity: &AuthIdentity, info: &RequestInfo) -> Result<(), AuthError> {
    if identity.client().remote_address != info.remote_address {
        tracing::warn!(
            bound = %identity.client().remote_address,
            caller = %info.remote_address,
            "remote address mismatch"
        );
        return Err(AuthError::RemoteAddressMismatch);
    }
    Ok(())
}

/// Client-only tokens may only reach the configured client paths or the
/// globally excluded ones.
fn check_client_path(state: &AppState, path: &str) -> Result<(), AuthError> {
    let config = &state.config;
    let allowed = paths::any_matches(&config.client_auth_paths, &config.context_path, path)
        || paths::any_matches(&config.excluded_paths, &config.context_path, path);
    if !allowed {
        tracing::warn!(path, "path not reachable with client-only credentials");
        return Err(AuthError::FullAuthenticationRequired);
    }
    Ok(())
}
