//! Authentication service — login, refresh rotation, and logout flows.

use axum_extra::extract::cookie::Cookie;
use tracing::info;

use tessera_core::auth::identity::AuthIdentity;
use tessera_core::auth::{AuthError, rotation, verifier};
use tessera_core::models::auth::AuthenticationType;

use crate::AppState;
use crate::error::AppResult;
use crate::models::{AuthResponse, AuthenticateRequest, LogoutResponse};
use crate::request_info::RequestInfo;
use crate::services::{cookies, guard};

/// Authenticate submitted credentials and issue a token pair.
///
/// User logins additionally get the refresh cookie; client logins receive
/// only the access token in the body.
pub async fn login(
    state: &AppState,
    info: &RequestInfo,
    request: &AuthenticateRequest,
) -> AppResult<(AuthResponse, Option<Cookie<'static>>)> {
    let kind = verifier::classify_login(
        request.entrypoint.as_deref(),
        request.password.as_deref(),
        request.client_id.as_deref(),
        request.client_secret.as_deref(),
    )?;

    let identity = match kind {
        verifier::LoginKind::User {
            entrypoint,
            password,
            client_id,
            client_secret,
        } => {
            let (user, roles) = verifier::verify_user(&state.pool, entrypoint, password).await?;
            let client_id = verifier::parse_client_id(client_id)?;
            let (client, scopes) =
                verifier::verify_client(&state.pool, client_id, client_secret).await?;
            AuthIdentity::assemble_user(&user, roles, &client, scopes, &info.remote_address)
        }
        verifier::LoginKind::Client {
            client_id,
            client_secret,
        } => {
            let client_id = verifier::parse_client_id(client_id)?;
            let (client, scopes) =
                verifier::verify_client(&state.pool, client_id, client_secret).await?;
            AuthIdentity::assemble_client(&client, scopes, &info.remote_address)
        }
    };

    guard::validate_origins(&identity, info.origin.as_deref(), &state.config)?;
    info!(
        client_id = %identity.client().client_id,
        authentication_type = identity.authentication_type().as_str(),
        "login verified"
    );
    issue_tokens(state, &identity, info).await
}

/// Rotate a presented refresh token into a fresh token pair.
///
/// The old rotation row is consumed (deleted) before anything new is
/// issued; a second presentation of the same token fails permanently.
pub async fn refresh(
    state: &AppState,
    info: &RequestInfo,
    refresh_token: Option<&str>,
) -> AppResult<(AuthResponse, Option<Cookie<'static>>)> {
    let token = refresh_token.ok_or(AuthError::NotLoggedIn)?;
    let claims = state.codec.decode_refresh(token)?;
    let row = rotation::consume(&state.pool, &claims, &info.remote_address).await?;

    let identity = match row.authentication_type {
        AuthenticationType::UserLogin => {
            let user_id = row.user_id.ok_or(AuthError::RefreshTokenInvalid)?;
            let (user, roles) = verifier::verify_user_by_id(&state.pool, user_id).await?;
            let (client, scopes) =
                verifier::verify_client_by_id(&state.pool, row.client_id).await?;
            AuthIdentity::assemble_user(&user, roles, &client, scopes, &info.remote_address)
        }
        AuthenticationType::ClientLogin => {
            let (client, scopes) =
                verifier::verify_client_by_id(&state.pool, row.client_id).await?;
            AuthIdentity::assemble_client(&client, scopes, &info.remote_address)
        }
    };

    guard::validate_origins(&identity, info.origin.as_deref(), &state.config)?;
    info!(jti = %row.jti, "refresh token rotated");
    issue_tokens(state, &identity, info).await
}

/// Revoke the presented refresh token. Idempotent and tolerant: a missing
/// or undecodable token still logs the caller out.
pub async fn logout(state: &AppState, refresh_token: Option<&str>) -> AppResult<LogoutResponse> {
    if let Some(token) = refresh_token {
        match state.codec.decode_refresh(token) {
            Ok(claims) => {
                if let Some(jti) = claims.jti.as_deref() {
                    rotation::revoke(&state.pool, jti).await?;
                    info!(jti, "refresh token revoked at logout");
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "ignoring undecodable refresh token at logout");
            }
        }
    }
    Ok(LogoutResponse { success: true })
}

/// Issue the access token and rotation row for a verified identity.
///
/// Issuance order: sign tokens → build the response and cookie → persist
/// the rotation row. A crash before persistence leaves a token whose
/// refresh leg fails on first use, never a dangling row.
async fn issue_tokens(
    state: &AppState,
    identity: &AuthIdentity,
    info: &RequestInfo,
) -> AppResult<(AuthResponse, Option<Cookie<'static>>)> {
    let origin = info.origin.as_deref();
    let access_token = state.codec.issue_access_token(identity, origin)?;
    let issued = state.codec.issue_refresh_token(identity)?;

    let response = build_auth_response(state, identity, access_token, origin);
    let cookie = match identity {
        AuthIdentity::User(_) => {
            let max_age = state.codec.settings().refresh_ttl_days * 86_400;
            Some(cookies::refresh_cookie(
                &issued.token,
                &state.config.cookie,
                origin,
                max_age,
            ))
        }
        AuthIdentity::Client(_) => None,
    };

    rotation::persist(&state.pool, identity, &issued).await?;
    Ok((response, cookie))
}

fn build_auth_response(
    state: &AppState,
    identity: &AuthIdentity,
    access_token: String,
    origin: Option<&str>,
) -> AuthResponse {
    let user = identity.user();
    AuthResponse {
        access_token,
        token_type: "Bearer".to_string(),
        expires_in: state.codec.access_ttl(origin).num_seconds(),
        long_token: origin.is_none(),
        authentication_type: identity.authentication_type(),
        client_id: identity.client().client_id.clone(),
        user_id: user.map(|u| u.user_id.clone()),
        username: user.map(|u| u.username.clone()),
        email: user.map(|u| u.email.clone()),
        roles: user.map(|u| u.roles.clone()).unwrap_or_default(),
        scopes: identity.client().scopes.clone(),
        providers: user.map(|u| u.providers.clone()).unwrap_or_default(),
        has_password: user.map(|u| u.has_password).unwrap_or(false),
        last_password_change: user.and_then(|u| u.last_password_change),
    }
}
