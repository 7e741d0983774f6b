//! Auth-related database queries.
//!
//! The narrow store interface consumed by the verifier, the rotation
//! store, and startup bootstrap. All rows travel as plain tuples and are
//! mapped into domain records here.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::AuthError;
use super::entrypoint::{Entrypoint, EntrypointKind};
use crate::models::auth::{
    AuthenticationType, ClientRecord, ClientStatus, ClientType, LoginProvider, RefreshTokenRow,
    UserRecord,
};

type UserTuple = (
    Uuid,
    String,
    String,
    Option<String>,
    Option<String>,
    bool,
    bool,
    Vec<String>,
    Option<DateTime<Utc>>,
);

const USER_COLUMNS: &str = "user_id, email, username, mobile, password_hash, enabled, \
     account_locked, auth_providers, last_password_change";

fn map_user(row: UserTuple) -> UserRecord {
    UserRecord {
        user_id: row.0,
        email: row.1,
        username: row.2,
        mobile: row.3,
        password_hash: row.4,
        enabled: row.5,
        account_locked: row.6,
        auth_providers: row.7,
        last_password_change: row.8,
    }
}

/// Fetch a user by the column the entrypoint classified into.
pub async fn find_user_by_entrypoint(
    pool: &PgPool,
    entrypoint: &Entrypoint,
) -> Result<Option<UserRecord>, AuthError> {
    let column = match entrypoint.kind {
        EntrypointKind::Email => "email",
        EntrypointKind::Mobile => "mobile",
        EntrypointKind::Username => "username",
    };
    let query = format!("SELECT {USER_COLUMNS} FROM users WHERE {column} = $1");
    let row = sqlx::query_as::<_, UserTuple>(&query)
        .bind(&entrypoint.value)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(map_user))
}

/// Fetch a user by id (refresh-token path).
pub async fn find_user_by_id(
    pool: &PgPool,
    user_id: Uuid,
) -> Result<Option<UserRecord>, AuthError> {
    let query = format!("SELECT {USER_COLUMNS} FROM users WHERE user_id = $1");
    let row = sqlx::query_as::<_, UserTuple>(&query)
        .bind(user_id)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(map_user))
}

/// Fetch roles for a user.
pub async fn user_roles(pool: &PgPool, user_id: Uuid) -> Result<Vec<String>, AuthError> {
    let rows =
        sqlx::query_scalar::<_, String>("SELECT role FROM user_roles WHERE user_id = $1 ORDER BY role")
            .bind(user_id)
            .fetch_all(pool)
            .await?;
    Ok(rows)
}

type ClientTuple = (
    Uuid,
    String,
    String,
    String,
    String,
    Vec<String>,
    DateTime<Utc>,
);

const CLIENT_COLUMNS: &str =
    "client_id, client_name, client_type, client_secret, status, origins, expires_at";

fn map_client(row: ClientTuple) -> Result<ClientRecord, AuthError> {
    Ok(ClientRecord {
        client_id: row.0,
        client_name: row.1,
        client_type: ClientType::parse(&row.2)?,
        client_secret: row.3,
        status: ClientStatus::parse(&row.4)?,
        origins: row.5,
        expires_at: row.6,
    })
}

/// Fetch a registered client by id.
pub async fn find_client_by_id(
    pool: &PgPool,
    client_id: Uuid,
) -> Result<Option<ClientRecord>, AuthError> {
    let query = format!("SELECT {CLIENT_COLUMNS} FROM clients WHERE client_id = $1");
    let row = sqlx::query_as::<_, ClientTuple>(&query)
        .bind(client_id)
        .fetch_optional(pool)
        .await?;
    row.map(map_client).transpose()
}

/// Fetch a registered client by name (startup bootstrap).
pub async fn find_client_by_name(
    pool: &PgPool,
    client_name: &str,
) -> Result<Option<ClientRecord>, AuthError> {
    let query = format!("SELECT {CLIENT_COLUMNS} FROM clients WHERE client_name = $1");
    let row = sqlx::query_as::<_, ClientTuple>(&query)
        .bind(client_name)
        .fetch_optional(pool)
        .await?;
    row.map(map_client).transpose()
}

/// Insert a registered client.
pub async fn insert_client(pool: &PgPool, client: &ClientRecord) -> Result<(), AuthError> {
    sqlx::query(
        "INSERT INTO clients (client_id, client_name, client_type, client_secret, status, \
         origins, expires_at) VALUES ($1, $2, $3, $4, $5, $6, $7)",
    )
    .bind(client.client_id)
    .bind(&client.client_name)
    .bind(client.client_type.as_str())
    .bind(&client.client_secret)
    .bind(client.status.as_str())
    .bind(&client.origins)
    .bind(client.expires_at)
    .execute(pool)
    .await?;
    Ok(())
}

/// Grant a scope to a client.
pub async fn grant_scope(pool: &PgPool, client_id: Uuid, scope: &str) -> Result<(), AuthError> {
    sqlx::query(
        "INSERT INTO client_scopes (client_id, scope) VALUES ($1, $2) ON CONFLICT DO NOTHING",
    )
    .bind(client_id)
    .bind(scope)
    .execute(pool)
    .await?;
    Ok(())
}

/// Fetch scopes for a client.
pub async fn client_scopes(pool: &PgPool, client_id: Uuid) -> Result<Vec<String>, AuthError> {
    let rows = sqlx::query_scalar::<_, String>(
        "SELECT scope FROM client_scopes WHERE client_id = $1 ORDER BY scope",
    )
    .bind(client_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

type RefreshTuple = (
    Uuid,
    String,
    Uuid,
    Option<Uuid>,
    String,
    DateTime<Utc>,
    DateTime<Utc>,
    String,
    Option<String>,
    Option<serde_json::Value>,
);

fn map_refresh(row: RefreshTuple) -> Result<RefreshTokenRow, AuthError> {
    Ok(RefreshTokenRow {
        id: row.0,
        jti: row.1,
        client_id: row.2,
        user_id: row.3,
        authentication_type: AuthenticationType::parse(&row.4)?,
        issued_at: row.5,
        expires_at: row.6,
        status: row.7,
        login_provider: row.8.as_deref().map(LoginProvider::parse).transpose()?,
        sso_token_data: row.9,
    })
}

/// Persist a refresh-token row.
pub async fn insert_refresh_token(pool: &PgPool, row: &RefreshTokenRow) -> Result<(), AuthError> {
    sqlx::query(
        "INSERT INTO refresh_tokens (id, jti, client_id, user_id, authentication_type, \
         issued_at, expires_at, status, login_provider, sso_token_data) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
    )
    .bind(row.id)
    .bind(&row.jti)
    .bind(row.client_id)
    .bind(row.user_id)
    .bind(row.authentication_type.as_str())
    .bind(row.issued_at)
    .bind(row.expires_at)
    .bind(&row.status)
    .bind(row.login_provider.map(LoginProvider::as_str))
    .bind(&row.sso_token_data)
    .execute(pool)
    .await?;
    Ok(())
}

/// Atomically consume a refresh-token row by jti: a single
/// `DELETE ... RETURNING`, so two concurrent presentations of the same
/// token cannot both observe the row.
pub async fn consume_refresh_token(
    pool: &PgPool,
    jti: &str,
) -> Result<Option<RefreshTokenRow>, AuthError> {
    let row = sqlx::query_as::<_, RefreshTuple>(
        "DELETE FROM refresh_tokens WHERE jti = $1 \
         RETURNING id, jti, client_id, user_id, authentication_type, issued_at, expires_at, \
         status, login_provider, sso_token_data",
    )
    .bind(jti)
    .fetch_optional(pool)
    .await?;
    row.map(map_refresh).transpose()
}

/// Delete a refresh-token row by jti, tolerating an already-missing row.
pub async fn delete_refresh_token(pool: &PgPool, jti: &str) -> Result<(), AuthError> {
    sqlx::query("DELETE FROM refresh_tokens WHERE jti = $1")
        .bind(jti)
        .execute(pool)
        .await?;
    Ok(())
}

/// Count live refresh-token rows for a client (observability/tests).
pub async fn refresh_token_count(pool: &PgPool, client_id: Uuid) -> Result<i64, AuthError> {
    let count =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM refresh_tokens WHERE client_id = $1")
            .bind(client_id)
            .fetch_one(pool)
            .await?;
    Ok(count)
}
