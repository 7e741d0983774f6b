//! Breadcrumb middleware — per-request correlation id.
//!
//! Assigns a fresh id to every request, carries it in the request
//! extensions (explicit request-scoped state; workers share nothing), and
//! returns it in the `X-Breadcrumb-Id` response header. Error bodies
//! produced anywhere downstream get the id stamped in here, so every
//! failure a client sees can be correlated with the logs.

use axum::{
    Json,
    extract::Request,
    http::HeaderValue,
    middleware::Next,
    response::{IntoResponse, Response},
};
use uuid::Uuid;

use crate::models::ErrorResponse;

/// Response header carrying the correlation id.
pub const BREADCRUMB_HEADER: &str = "x-breadcrumb-id";

/// Request-scoped correlation id.
#[derive(Debug, Clone)]
pub struct Breadcrumb(pub String);

pub async fn breadcrumb(mut request: Request, next: Next) -> Response {
    let id = Breadcrumb(Uuid::new_v4().to_string());
    request.extensions_mut().insert(id.clone());

    let response = next.run(request).await;
    finalize(response, &id.0)
}

/// Stamp the id into the response header, rebuilding error bodies so the
/// client-visible JSON carries it too.
fn finalize(mut response: Response, id: &str) -> Response {
    if let Some(mut body) = response.extensions().get::<ErrorResponse>().cloned() {
        body.breadcrumb_id = Some(id.to_string());
        let status = response.status();
        response = (status, Json(body)).into_response();
    }
    if let Ok(value) = HeaderValue::from_str(id) {
        response.headers_mut().insert(BREADCRUMB_HEADER, value);
    }
    response
}
