//! Refresh-token cookie construction.
//!
//! The refresh token travels only as a cookie. HttpOnly is forced off for
//! localhost development origins so browser tooling can read it; every
//! other attribute comes from configuration.

use axum_extra::extract::cookie::{Cookie, SameSite};
use time::Duration;

use crate::config::CookieSettings;

/// Build the refresh-token cookie for a login/refresh response.
pub fn refresh_cookie(
    token: &str,
    settings: &CookieSettings,
    origin: Option<&str>,
    max_age_secs: i64,
) -> Cookie<'static> {
    let mut http_only = settings.http_only;
    if let Some(origin) = origin {
        http_only = !origin.contains("localhost:");
    }
    Cookie::build((settings.name.clone(), token.to_string()))
        .http_only(http_only)
        .secure(settings.secure)
        .same_site(same_site(settings))
        .path("/".to_string())
        .max_age(Duration::seconds(max_age_secs))
        .build()
}

/// Build an expired cookie that clears the refresh token.
pub fn clear_refresh_cookie(settings: &CookieSettings) -> Cookie<'static> {
    Cookie::build((settings.name.clone(), String::new()))
        .http_only(settings.http_only)
        .secure(settings.secure)
        .same_site(same_site(settings))
        .path("/".to_string())
        .max_age(Duration::ZERO)
        .build()
}

fn same_site(settings: &CookieSettings) -> SameSite {
    match settings.same_site.as_str() {
        "Strict" => SameSite::Strict,
        "None" => SameSite::None,
        _ => SameSite::Lax,
    }
}
