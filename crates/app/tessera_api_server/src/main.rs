//! Tessera API server binary.
//!
//! Loads configuration, resolves the signing key pair, runs migrations,
//! ensures the bootstrap client exists, and serves the auth API.

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use sqlx::postgres::PgPoolOptions;
use tracing::info;

use tessera_core::auth::{bootstrap, keys::SigningKeys, tokens::TokenCodec};

/// CLI arguments for the API server.
#[derive(Parser, Debug)]
#[command(name = "tessera_api_server", about = "Tessera identity/token service")]
struct Args {
    /// Address to bind (overrides BIND_ADDR).
    #[arg(long)]
    bind_addr: Option<String>,

    /// PostgreSQL connection URL.
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "postgres://localhost:5432/tessera"
    )]
    database_url: String,

    /// Maximum number of database connections in the pool.
    #[arg(long, default_value_t = 5)]
    max_connections: u32,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "info,tessera_api=debug,tessera_core=debug".parse().unwrap()
            }),
        )
        .init();

    let args = Args::parse();

    let mut config = tessera_api::config::ApiConfig::from_env();
    if let Some(bind_addr) = args.bind_addr {
        config.bind_addr = bind_addr;
    }
    config.database_url = args.database_url.clone();

    info!(database_url = %config.database_url, bind_addr = %config.bind_addr, "starting tessera_api_server");

    let pool = PgPoolOptions::new()
        .max_connections(args.max_connections)
        .acquire_timeout(std::time::Duration::from_secs(30))
        .connect(&config.database_url)
        .await?;

    info!("running database migrations");
    tessera_api::migrate(&pool).await?;

    // Key pair is loaded once and shared read-only for the process lifetime.
    let keys = SigningKeys::resolve()?;
    info!(kid = %keys.kid(), "signing key resolved");
    let codec = Arc::new(TokenCodec::new(
        keys,
        config.tokens.clone(),
        config.environment.clone(),
    ));

    let client = bootstrap::ensure_bootstrap_client(&pool).await?;
    info!(client_id = %client.client_id, "bootstrap client ready");

    let state = tessera_api::AppState {
        pool,
        config: config.clone(),
        codec,
    };
    let app = tessera_api::router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!(addr = %listener.local_addr()?, "auth API listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
