//! Startup client bootstrap.
//!
//! Clients are provisioned out-of-band; the only one the service creates
//! itself is the bootstrap client, so a fresh deployment has a working
//! client id/secret pair to authenticate with.

use chrono::{Duration, Utc};
use rand::distr::Alphanumeric;
use rand::{Rng, rng};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use super::AuthError;
use super::queries;
use crate::models::auth::{ClientRecord, ClientStatus, ClientType};

/// Name of the self-provisioned client.
pub const BOOTSTRAP_CLIENT_NAME: &str = "tessera-bootstrap";

/// Scope granted to the bootstrap client.
const BOOTSTRAP_SCOPE: &str = "internal";

/// Bootstrap credentials expire after a year; rotate by deleting the row.
const BOOTSTRAP_VALIDITY_DAYS: i64 = 365;

/// Generate a pre-shared client secret (48 alphanumeric chars).
fn generate_client_secret() -> String {
    rng()
        .sample_iter(&Alphanumeric)
        .take(48)
        .map(char::from)
        .collect()
}

/// Ensure the bootstrap client exists, creating it on first start.
///
/// The generated secret is logged exactly once, at creation — it is not
/// recoverable afterwards.
pub async fn ensure_bootstrap_client(pool: &PgPool) -> Result<ClientRecord, AuthError> {
    if let Some(existing) = queries::find_client_by_name(pool, BOOTSTRAP_CLIENT_NAME).await? {
        return Ok(existing);
    }

    let client = ClientRecord {
        client_id: Uuid::new_v4(),
        client_name: BOOTSTRAP_CLIENT_NAME.to_string(),
        client_type: ClientType::Internal,
        client_secret: generate_client_secret(),
        status: ClientStatus::Active,
        origins: Vec::new(),
        expires_at: Utc::now() + Duration::days(BOOTSTRAP_VALIDITY_DAYS),
    };
    queries::insert_client(pool, &client).await?;
    queries::grant_scope(pool, client.client_id, BOOTSTRAP_SCOPE).await?;

    info!(
        client_id = %client.client_id,
        client_secret = %client.client_secret,
        "bootstrap client created — store the secret now, it is not shown again"
    );
    Ok(client)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_secrets_are_long_and_unique() {
        let a = generate_client_secret();
        let b = generate_client_secret();
        assert_eq!(a.len(), 48);
        assert_ne!(a, b);
    }
}
