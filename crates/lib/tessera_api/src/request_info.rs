//! Per-request caller context.
//!
//! Resolves the caller's IP (first hop of `X-Forwarded-For`, falling back
//! to the socket peer address) and the browser `Origin` header. Carried
//! explicitly as a value — never ambient state.

use std::convert::Infallible;
use std::net::SocketAddr;

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::header::ORIGIN;
use axum::http::request::Parts;
use axum::http::{Extensions, HeaderMap};

/// Forwarded-for header consulted before the peer address.
const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Address used when neither header nor peer address is available
/// (e.g. requests driven directly through the router in tests).
const LOOPBACK: &str = "127.0.0.1";

/// The caller's resolved network context for one request.
#[derive(Debug, Clone)]
pub struct RequestInfo {
    pub remote_address: String,
    pub origin: Option<String>,
}

impl RequestInfo {
    pub fn from_headers(headers: &HeaderMap, extensions: &Extensions) -> Self {
        Self {
            remote_address: client_ip(headers, extensions),
            origin: headers
                .get(ORIGIN)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string),
        }
    }
}

impl<S> FromRequestParts<S> for RequestInfo
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(RequestInfo::from_headers(&parts.headers, &parts.extensions))
    }
}

/// First hop of `X-Forwarded-For` when present (the original client when
/// running behind a proxy), else the socket peer address.
fn client_ip(headers: &HeaderMap, extensions: &Extensions) -> String {
    if let Some(forwarded) = headers.get(X_FORWARDED_FOR).and_then(|v| v.to_str().ok()) {
        let first_hop = forwarded.split(',').next().unwrap_or(forwarded).trim();
        if !first_hop.is_empty() {
            return first_hop.to_string();
        }
    }
    extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| LOOPBACK.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn forwarded_for_takes_the_first_hop() {
        let mut headers = HeaderMap::new();
        headers.insert(
            X_FORWARDED_FOR,
            HeaderValue::from_static("203.0.113.9, 10.0.0.2, 10.0.0.3"),
        );
        let info = RequestInfo::from_headers(&headers, &Extensions::new());
        assert_eq!(info.remote_address, "203.0.113.9");
    }

    #[test]
    fn peer_address_is_the_fallback() {
        let mut extensions = Extensions::new();
        extensions.insert(ConnectInfo(SocketAddr::from(([192, 0, 2, 4], 4431))));
        let info = RequestInfo::from_headers(&HeaderMap::new(), &extensions);
        assert_eq!(info.remote_address, "192.0.2.4");
    }

    #[test]
    fn origin_header_is_captured_when_present() {
        let mut headers = HeaderMap::new();
        headers.insert(ORIGIN, HeaderValue::from_static("https://app.example.com"));
        let info = RequestInfo::from_headers(&headers, &Extensions::new());
        assert_eq!(info.origin.as_deref(), Some("https://app.example.com"));
        assert_eq!(info.remote_address, LOOPBACK);
    }
}
