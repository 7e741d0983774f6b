//! Local PostgreSQL lifecycle management.
//!
//! Spawns `initdb`, `pg_ctl`, and `pg_isready` to run a PostgreSQL
//! instance on demand — primarily for integration tests, which get an
//! ephemeral database without depending on an external server.

use std::net::TcpListener;
use std::path::PathBuf;
use std::time::Duration;

use sqlx::postgres::PgPool;
use thiserror::Error;
use tokio::process::Command;
use tokio::time::sleep;
use tracing::debug;

/// Default database name.
const DEFAULT_DATABASE: &str = "tessera";

/// Maximum time to wait for PostgreSQL to become ready.
const PG_READY_TIMEOUT: Duration = Duration::from_secs(30);

/// Poll interval when waiting for PostgreSQL readiness.
const PG_READY_POLL: Duration = Duration::from_millis(200);

/// Errors from local database lifecycle operations.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("PostgreSQL command failed: {0}")]
    Command(String),

    #[error("SQL error: {0}")]
    Sql(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("pg_config not found on PATH")]
    PgConfigNotFound,

    #[error("PostgreSQL not ready after {0:?}")]
    ReadyTimeout(Duration),
}

/// Result type for local database operations.
pub type Result<T> = std::result::Result<T, DbError>;

/// Manages a locally spawned PostgreSQL instance.
pub struct LocalPostgres {
    bin_dir: PathBuf,
    data_dir: PathBuf,
    database_name: String,
    port: u16,
    started: bool,
    /// Holds the tempdir so it lives as long as the instance.
    _tempdir: Option<tempfile::TempDir>,
}

impl LocalPostgres {
    /// Create an instance with ephemeral storage, cleaned up on drop.
    ///
    /// PG binaries are discovered via `pg_config --bindir` on PATH.
    pub async fn ephemeral() -> Result<Self> {
        let tempdir = tempfile::tempdir()?;
        let data_dir = tempdir.path().join("pgdata");
        let bin_dir = discover_bin_dir().await?;

        Ok(Self {
            bin_dir,
            data_dir,
            database_name: DEFAULT_DATABASE.to_string(),
            port: 0,
            started: false,
            _tempdir: Some(tempdir),
        })
    }

    /// Initialize the data directory. Skips when already initialized.
    pub async fn setup(&mut self) -> Result<()> {
        if self.data_dir.join("PG_VERSION").exists() {
            debug!("data directory already initialized, skipping initdb");
            return Ok(());
        }

        let initdb = self.bin_dir.join("initdb");
        let output = Command::new(&initdb)
            .arg("-D")
            .arg(&self.data_dir)
            .arg("--no-locale")
            .arg("--encoding=UTF8")
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DbError::Command(format!("initdb failed: {stderr}")));
        }
        Ok(())
    }

    /// Start the server and ensure the application database exists.
    pub async fn start(&mut self) -> Result<()> {
        if self.port == 0 {
            self.port = find_free_port()?;
        }

        let pg_ctl = self.bin_dir.join("pg_ctl");
        let port_opt = format!(
            "-p {} -k {} -h localhost",
            self.port,
            self.data_dir.display()
        );
        let logfile = self.data_dir.join("postgresql.log");

        let output = Command::new(&pg_ctl)
            .arg("-D")
            .arg(&self.data_dir)
            .arg("-o")
            .arg(&port_opt)
            .arg("-l")
            .arg(&logfile)
            .arg("start")
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DbError::Command(format!("pg_ctl start failed: {stderr}")));
        }

        self.wait_for_ready().await?;
        self.started = true;
        self.create_database_if_missing().await?;

        debug!(url = %self.connection_url(), "local PostgreSQL ready");
        Ok(())
    }

    /// Stop the server gracefully.
    pub async fn stop(&mut self) -> Result<()> {
        if !self.started {
            return Ok(());
        }

        let pg_ctl = self.bin_dir.join("pg_ctl");
        let output = Command::new(&pg_ctl)
            .arg("-D")
            .arg(&self.data_dir)
            .arg("-m")
            .arg("fast")
            .arg("stop")
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DbError::Command(format!("pg_ctl stop failed: {stderr}")));
        }

        self.started = false;
        Ok(())
    }

    /// Connection URL for the application database.
    pub fn connection_url(&self) -> String {
        format!("postgresql://localhost:{}/{}", self.port, self.database_name)
    }

    /// Port the server listens on (0 until started).
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Wait for readiness, polling `pg_isready`.
    async fn wait_for_ready(&self) -> Result<()> {
        let pg_isready = self.bin_dir.join("pg_isready");
        let deadline = tokio::time::Instant::now() + PG_READY_TIMEOUT;

        loop {
            let output = Command::new(&pg_isready)
                .arg("-p")
                .arg(self.port.to_string())
                .arg("-h")
                .arg("localhost")
                .output()
                .await?;

            if output.status.success() {
                return Ok(());
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(DbError::ReadyTimeout(PG_READY_TIMEOUT));
            }
            sleep(PG_READY_POLL).await;
        }
    }

    /// Create the application database when absent.
    async fn create_database_if_missing(&self) -> Result<()> {
        let maintenance_url = format!("postgresql://localhost:{}/postgres", self.port);
        let pool = PgPool::connect(&maintenance_url).await?;

        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)")
                .bind(&self.database_name)
                .fetch_one(&pool)
                .await?;

        if !exists {
            // CREATE DATABASE cannot use bind parameters
            let sql = format!("CREATE DATABASE \"{}\"", self.database_name);
            sqlx::query(&sql).execute(&pool).await?;
        }

        pool.close().await;
        Ok(())
    }
}

/// Discover the PG bin directory via `pg_config --bindir`.
async fn discover_bin_dir() -> Result<PathBuf> {
    let output = Command::new("pg_config")
        .arg("--bindir")
        .output()
        .await
        .map_err(|_| DbError::PgConfigNotFound)?;

    if !output.status.success() {
        return Err(DbError::PgConfigNotFound);
    }
    let bin_dir = String::from_utf8_lossy(&output.stdout).trim().to_string();
    Ok(PathBuf::from(bin_dir))
}

/// Find a free ephemeral port by binding to port 0.
fn find_free_port() -> Result<u16> {
    let listener = TcpListener::bind("127.0.0.1:0")?;
    let port = listener.local_addr()?.port();
    Ok(port)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn ephemeral_instance_starts_at_port_zero() {
        let db = LocalPostgres::ephemeral().await.expect("ephemeral instance");
        assert_eq!(0, db.port());
    }

    #[tokio::test]
    async fn lifecycle_setup_start_stop() -> Result<()> {
        let mut db = LocalPostgres::ephemeral().await?;

        db.setup().await?;
        db.start().await?;
        assert_ne!(0, db.port());

        let url = db.connection_url();
        assert!(url.starts_with("postgresql://"));
        assert!(url.contains("tessera"));

        db.stop().await?;
        Ok(())
    }
}
