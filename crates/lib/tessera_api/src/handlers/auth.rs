//! Authentication request handlers.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum_extra::extract::cookie::CookieJar;

use crate::AppState;
use crate::error::AppResult;
use crate::middleware::auth::CurrentIdentity;
use crate::models::{AuthResponse, AuthenticateRequest, IdentityResponse, LogoutResponse};
use crate::request_info::RequestInfo;
use crate::services::{auth, cookies};

/// `POST /auth/login` — authenticate user or client credentials.
pub async fn login_handler(
    State(state): State<AppState>,
    info: RequestInfo,
    jar: CookieJar,
    Json(body): Json<AuthenticateRequest>,
) -> AppResult<(StatusCode, CookieJar, Json<AuthResponse>)> {
    let (response, cookie) = auth::login(&state, &info, &body).await?;
    let jar = match cookie {
        Some(cookie) => jar.add(cookie),
        None => jar,
    };
    Ok((StatusCode::ACCEPTED, jar, Json(response)))
}

/// `POST /auth/refresh` — rotate the refresh token from the cookie.
pub async fn refresh_handler(
    State(state): State<AppState>,
    info: RequestInfo,
    jar: CookieJar,
) -> AppResult<(StatusCode, CookieJar, Json<AuthResponse>)> {
    let token = jar
        .get(&state.config.cookie.name)
        .map(|c| c.value().to_string());
    let (response, cookie) = auth::refresh(&state, &info, token.as_deref()).await?;
    let jar = match cookie {
        Some(cookie) => jar.add(cookie),
        None => jar,
    };
    Ok((StatusCode::ACCEPTED, jar, Json(response)))
}

/// `POST /auth/logout` — revoke the refresh token and clear the cookie.
pub async fn logout_handler(
    State(state): State<AppState>,
    jar: CookieJar,
) -> AppResult<(CookieJar, Json<LogoutResponse>)> {
    let token = jar
        .get(&state.config.cookie.name)
        .map(|c| c.value().to_string());
    let response = auth::logout(&state, token.as_deref()).await?;
    let jar = jar.add(cookies::clear_refresh_cookie(&state.config.cookie));
    Ok((jar, Json(response)))
}

/// `GET /auth/identity` — the authenticated identity for this request.
pub async fn identity_handler(
    CurrentIdentity(identity): CurrentIdentity,
) -> AppResult<Json<IdentityResponse>> {
    let client = identity.client();
    let user = identity.user();
    Ok(Json(IdentityResponse {
        authentication_type: identity.authentication_type(),
        client_id: client.client_id.clone(),
        client_name: client.client_name.clone(),
        client_type: client.client_type,
        user_id: user.map(|u| u.user_id.clone()),
        username: user.map(|u| u.username.clone()),
        email: user.map(|u| u.email.clone()),
        roles: user.map(|u| u.roles.clone()).unwrap_or_default(),
        scopes: client.scopes.clone(),
        origins: client.origins.clone(),
        authorities: identity.authorities(),
        remote_address: client.remote_address.clone(),
    }))
}
