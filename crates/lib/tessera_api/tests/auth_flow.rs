//! Integration test — start ephemeral PG, seed a client and users, then
//! drive the full token lifecycle through the router: login, bearer
//! authentication, refresh rotation (single use), policy rejections,
//! and logout.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::header::{CONTENT_TYPE, SET_COOKIE};
use axum::http::{HeaderMap, Request, StatusCode};
use chrono::{Duration, Utc};
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

use tessera_api::config::{ApiConfig, CookieSettings};
use tessera_api::{AppState, router};
use tessera_core::auth::keys::SigningKeys;
use tessera_core::auth::tokens::{TokenCodec, TokenSettings};
use tessera_core::auth::{password, queries};
use tessera_core::db::LocalPostgres;
use tessera_core::models::auth::{ClientRecord, ClientStatus, ClientType};

const CLIENT_SECRET: &str = "client-secret-0001";
const ALICE_PASSWORD: &str = "correct-horse-battery";
const APP_ORIGIN: &str = "https://app.example.com";

struct Harness {
    pool: sqlx::PgPool,
    client_id: Uuid,
    private_pem: String,
}

impl Harness {
    fn config(&self) -> ApiConfig {
        ApiConfig {
            bind_addr: "127.0.0.1:0".into(),
            database_url: String::new(),
            environment: "test".into(),
            context_path: String::new(),
            tokens: TokenSettings::default(),
            cookie: CookieSettings {
                name: "tessera_refresh".into(),
                http_only: true,
                secure: false,
                same_site: "Lax".into(),
            },
            enforce_remote_address: false,
            client_auth_paths: vec!["/auth/identity".into(), "/client/**".into()],
            excluded_paths: vec![],
            dev_authorities: vec!["user".into()],
            client_dev_authorities: vec!["profile:read".into()],
        }
    }

    fn app(&self, config: ApiConfig) -> Router {
        let keys = SigningKeys::from_private_pem(&self.private_pem).expect("signing keys");
        let codec = Arc::new(TokenCodec::new(
            keys,
            config.tokens.clone(),
            config.environment.clone(),
        ));
        router(AppState {
            pool: self.pool.clone(),
            config,
            codec,
        })
    }
}

async fn seed(pool: &sqlx::PgPool) -> Uuid {
    let client_id = Uuid::new_v4();
    let client = ClientRecord {
        client_id,
        client_name: "acceptance-console".into(),
        client_type: ClientType::Internal,
        client_secret: CLIENT_SECRET.into(),
        status: ClientStatus::Active,
        origins: vec![APP_ORIGIN.into()],
        expires_at: Utc::now() + Duration::days(365),
    };
    queries::insert_client(pool, &client).await.expect("insert client");
    queries::grant_scope(pool, client_id, "profile:read")
        .await
        .expect("grant scope");

    seed_user(pool, "alice", "alice@example.com", ALICE_PASSWORD, true).await;
    seed_user(pool, "mallory", "mallory@example.com", ALICE_PASSWORD, false).await;

    client_id
}

async fn seed_user(pool: &sqlx::PgPool, username: &str, email: &str, pw: &str, enabled: bool) {
    let user_id = Uuid::new_v4();
    let hash = password::hash_password(pw).expect("hash password");
    sqlx::query(
        "INSERT INTO users (user_id, email, username, password_hash, enabled, account_locked, auth_providers) \
         VALUES ($1, $2, $3, $4, $5, FALSE, $6)",
    )
    .bind(user_id)
    .bind(email)
    .bind(username)
    .bind(&hash)
    .bind(enabled)
    .bind(vec!["LOCAL".to_string()])
    .execute(pool)
    .await
    .expect("insert user");

    sqlx::query("INSERT INTO user_roles (user_id, role) VALUES ($1, 'user')")
        .bind(user_id)
        .execute(pool)
        .await
        .expect("insert role");
}

async fn send(
    app: &Router,
    method: &str,
    path: &str,
    headers: &[(&str, &str)],
    body: Option<Value>,
) -> (StatusCode, HeaderMap, Value) {
    let mut builder = Request::builder().method(method).uri(path);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    let request = match body {
        Some(json) => builder
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.expect("request");
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("parse JSON body")
    };
    (status, headers, json)
}

fn login_body(user: Option<(&str, &str)>, client_id: Uuid, secret: &str) -> Value {
    let mut body = json!({ "clientId": client_id.to_string(), "clientSecret": secret });
    if let Some((entrypoint, password)) = user {
        body["entrypoint"] = json!(entrypoint);
        body["password"] = json!(password);
    }
    body
}

/// The `name=value` pair of the refresh cookie set by a response.
fn refresh_cookie_pair(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with("tessera_refresh="))
        .map(|v| v.split(';').next().unwrap_or(v).to_string())
}

#[tokio::test]
async fn auth_token_lifecycle() {
    let mut db = LocalPostgres::ephemeral().await.expect("LocalPostgres::ephemeral");
    db.setup().await.expect("db setup");
    db.start().await.expect("db start");

    let pool = sqlx::PgPool::connect(&db.connection_url())
        .await
        .expect("connect to ephemeral PG");
    tessera_api::migrate(&pool).await.expect("migrate");

    let client_id = seed(&pool).await;
    let harness = Harness {
        pool: pool.clone(),
        client_id,
        private_pem: SigningKeys::generate().expect("generate keys").1,
    };

    let app = harness.app(harness.config());

    user_login_and_rotation(&harness, &app).await;
    credential_rejections(&harness, &app).await;
    client_login_and_path_tiers(&harness, &app).await;
    remote_address_binding(&harness).await;
    logout_revokes_the_rotation_row(&harness, &app).await;

    db.stop().await.expect("db stop");
}

async fn user_login_and_rotation(harness: &Harness, app: &Router) {
    let xff = [("x-forwarded-for", "10.1.1.1"), ("origin", APP_ORIGIN)];

    // Login with correct credentials and a registered origin
    let (status, headers, body) = send(
        app,
        "POST",
        "/auth/login",
        &xff,
        Some(login_body(
            Some(("alice@example.com", ALICE_PASSWORD)),
            harness.client_id,
            CLIENT_SECRET,
        )),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["authenticationType"], "USER_LOGIN");
    assert_eq!(body["username"], "alice");
    assert!(body["roles"].as_array().unwrap().contains(&json!("user")));
    assert!(!body["longToken"].as_bool().unwrap());

    let access_token = body["accessToken"].as_str().expect("access token").to_string();
    let cookie = refresh_cookie_pair(&headers).expect("refresh cookie set");

    // Bearer authentication rebuilds the identity from claims alone
    let bearer = format!("Bearer {access_token}");
    let mut with_auth = xff.to_vec();
    with_auth.push(("authorization", &bearer));
    let (status, _, body) = send(app, "GET", "/auth/identity", &with_auth, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "alice@example.com");
    assert_eq!(body["authorities"], json!(["user", "profile:read"]));
    assert_eq!(body["remoteAddress"], "10.1.1.1");

    // A refresh token never authenticates a resource request
    let refresh_token = cookie.split_once('=').unwrap().1.to_string();
    let refresh_bearer = format!("Bearer {refresh_token}");
    let mut with_refresh = xff.to_vec();
    with_refresh.push(("authorization", &refresh_bearer));
    let (status, _, body) = send(app, "GET", "/auth/identity", &with_refresh, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "TESSERA-1028");

    // First refresh succeeds and rotates the cookie
    let mut with_cookie = xff.to_vec();
    with_cookie.push(("cookie", &cookie));
    let (status, headers, body) = send(app, "POST", "/auth/refresh", &with_cookie, None).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["authenticationType"], "USER_LOGIN");
    let rotated = refresh_cookie_pair(&headers).expect("rotated cookie");
    assert_ne!(rotated, cookie);

    // The consumed token is permanently rejected
    let (status, headers, body) = send(app, "POST", "/auth/refresh", &with_cookie, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "TESSERA-1041");
    assert!(body["breadcrumbId"].is_string());
    assert!(headers.contains_key("x-breadcrumb-id"));

    // Refresh without any cookie reads as not logged in
    let (status, _, body) = send(app, "POST", "/auth/refresh", &xff, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "TESSERA-1040");
}

async fn credential_rejections(harness: &Harness, app: &Router) {
    let xff = [("x-forwarded-for", "10.1.1.2"), ("origin", APP_ORIGIN)];

    // Wrong client secret: 401, and no rotation row is created
    let before = queries::refresh_token_count(&harness.pool, harness.client_id)
        .await
        .expect("count");
    let (status, _, body) = send(
        app,
        "POST",
        "/auth/login",
        &xff,
        Some(login_body(
            Some(("alice@example.com", ALICE_PASSWORD)),
            harness.client_id,
            "wrong-secret",
        )),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "TESSERA-1016");
    let after = queries::refresh_token_count(&harness.pool, harness.client_id)
        .await
        .expect("count");
    assert_eq!(before, after);

    // Disabled user with the correct password
    let (status, _, body) = send(
        app,
        "POST",
        "/auth/login",
        &xff,
        Some(login_body(
            Some(("mallory@example.com", ALICE_PASSWORD)),
            harness.client_id,
            CLIENT_SECRET,
        )),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "TESSERA-1008");

    // Wrong password
    let (status, _, body) = send(
        app,
        "POST",
        "/auth/login",
        &xff,
        Some(login_body(
            Some(("alice@example.com", "nope")),
            harness.client_id,
            CLIENT_SECRET,
        )),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "TESSERA-1007");

    // Unregistered origin fails the guard even with valid credentials
    let (status, _, body) = send(
        app,
        "POST",
        "/auth/login",
        &[("x-forwarded-for", "10.1.1.2"), ("origin", "https://evil.example.com")],
        Some(login_body(
            Some(("alice@example.com", ALICE_PASSWORD)),
            harness.client_id,
            CLIENT_SECRET,
        )),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "TESSERA-1025");

    // Entrypoint without a password is rejected explicitly
    let mut partial = login_body(None, harness.client_id, CLIENT_SECRET);
    partial["entrypoint"] = json!("alice@example.com");
    let (status, _, body) = send(app, "POST", "/auth/login", &xff, Some(partial)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "TESSERA-1020");
}

async fn client_login_and_path_tiers(harness: &Harness, app: &Router) {
    // Originless client login passes via the minimum-authority path
    // (the client holds profile:read) and gets the long token
    let xff = [("x-forwarded-for", "10.2.2.2")];
    let (status, headers, body) = send(
        app,
        "POST",
        "/auth/login",
        &xff,
        Some(login_body(None, harness.client_id, CLIENT_SECRET)),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["authenticationType"], "CLIENT_LOGIN");
    assert!(body["longToken"].as_bool().unwrap());
    assert!(body.get("userId").is_none());
    assert!(refresh_cookie_pair(&headers).is_none(), "client logins get no cookie");

    let access_token = body["accessToken"].as_str().unwrap().to_string();
    let bearer = format!("Bearer {access_token}");

    // /auth/identity is in the configured client paths
    let mut with_auth = xff.to_vec();
    with_auth.push(("authorization", &bearer));
    let (status, _, body) = send(app, "GET", "/auth/identity", &with_auth, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["authenticationType"], "CLIENT_LOGIN");

    // With /auth/identity removed from the client paths the same token
    // needs full user authentication
    let mut narrow = harness.config();
    narrow.client_auth_paths = vec!["/client/**".into()];
    let narrow_app = harness.app(narrow);
    let (status, _, body) = send(&narrow_app, "GET", "/auth/identity", &with_auth, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "TESSERA-1030");
}

async fn remote_address_binding(harness: &Harness) {
    let mut config = harness.config();
    config.enforce_remote_address = true;
    let app = harness.app(config);

    let here = [("x-forwarded-for", "10.9.9.9")];
    let (status, headers, body) = send(
        &app,
        "POST",
        "/auth/login",
        &here,
        Some(login_body(
            Some(("alice@example.com", ALICE_PASSWORD)),
            harness.client_id,
            CLIENT_SECRET,
        )),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    let access_token = body["accessToken"].as_str().unwrap().to_string();
    let cookie = refresh_cookie_pair(&headers).expect("refresh cookie");
    let bearer = format!("Bearer {access_token}");

    // Presented from a different address: rejected outright
    let (status, _, body) = send(
        &app,
        "GET",
        "/auth/identity",
        &[("x-forwarded-for", "10.8.8.8"), ("authorization", &bearer)],
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "TESSERA-1031");

    // Presented from the bound address: accepted
    let (status, _, _) = send(
        &app,
        "GET",
        "/auth/identity",
        &[("x-forwarded-for", "10.9.9.9"), ("authorization", &bearer)],
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // Refresh from elsewhere fails the binding — and consumes the row,
    // so the token is dead even from the original address afterwards
    let (status, _, body) = send(
        &app,
        "POST",
        "/auth/refresh",
        &[("x-forwarded-for", "10.8.8.8"), ("cookie", &cookie)],
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "TESSERA-1031");

    let (status, _, body) = send(
        &app,
        "POST",
        "/auth/refresh",
        &[("x-forwarded-for", "10.9.9.9"), ("cookie", &cookie)],
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "TESSERA-1041");
}

async fn logout_revokes_the_rotation_row(harness: &Harness, app: &Router) {
    let xff = [("x-forwarded-for", "10.3.3.3"), ("origin", APP_ORIGIN)];
    let (status, headers, _) = send(
        app,
        "POST",
        "/auth/login",
        &xff,
        Some(login_body(
            Some(("alice@example.com", ALICE_PASSWORD)),
            harness.client_id,
            CLIENT_SECRET,
        )),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    let cookie = refresh_cookie_pair(&headers).expect("refresh cookie");

    let mut with_cookie = xff.to_vec();
    with_cookie.push(("cookie", &cookie));
    let (status, headers, body) = send(app, "POST", "/auth/logout", &with_cookie, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    // Logout clears the cookie
    let cleared = refresh_cookie_pair(&headers).expect("clearing cookie");
    assert_eq!(cleared, "tessera_refresh=");

    // The revoked token can no longer refresh
    let (status, _, body) = send(app, "POST", "/auth/refresh", &with_cookie, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "TESSERA-1041");

    // Logout is idempotent — a second call without a live row still succeeds
    let (status, _, body) = send(app, "POST", "/auth/logout", &with_cookie, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
}
