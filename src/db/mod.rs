//! Database module for feedy.
//!
//! This module provides the sqlx connection pool and migration management.
//! Exactly one of the `sqlite` or `postgres` features selects the backend.

use sqlx::pool::PoolOptions;
use tracing::{debug, info};

use crate::config::DatabaseConfig;
use crate::Result;

#[cfg(all(feature = "sqlite", feature = "postgres"))]
compile_error!("features \"sqlite\" and \"postgres\" are mutually exclusive");

#[cfg(not(any(feature = "sqlite", feature = "postgres")))]
compile_error!("one of the features \"sqlite\" or \"postgres\" must be enabled");

/// Database backend selected at compile time.
#[cfg(feature = "sqlite")]
pub type DbBackend = sqlx::Sqlite;
#[cfg(feature = "postgres")]
pub type DbBackend = sqlx::Postgres;

/// Connection pool for the selected backend.
pub type DbPool = sqlx::Pool<DbBackend>;

/// Database wrapper owning the connection pool.
#[derive(Clone)]
pub struct Database {
    pool: DbPool,
}

impl Database {
    /// Connect using the configured URL and apply pending migrations.
    ///
    /// For SQLite file databases the parent directory is created first.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        info!(url = %redact_url(&config.url), "Opening database");

        #[cfg(feature = "sqlite")]
        if let Some(path) = sqlite_file_path(&config.url) {
            if let Some(parent) = std::path::Path::new(path).parent() {
                if !parent.as_os_str().is_empty() && !parent.exists() {
                    std::fs::create_dir_all(parent)?;
                }
            }
        }

        let pool = PoolOptions::<DbBackend>::new()
            .max_connections(config.max_connections)
            .connect(&config.url)
            .await?;

        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    /// Open an in-memory database for testing.
    ///
    /// The pool holds a single connection that is never recycled, since every
    /// new SQLite memory connection would see an empty database.
    #[cfg(feature = "sqlite")]
    pub async fn open_in_memory() -> Result<Self> {
        debug!("Opening in-memory database");
        let pool = PoolOptions::<DbBackend>::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;

        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    /// Apply embedded migrations.
    pub async fn migrate(&self) -> Result<()> {
        #[cfg(feature = "sqlite")]
        sqlx::migrate!("./migrations/sqlite").run(&self.pool).await?;
        #[cfg(feature = "postgres")]
        sqlx::migrate!("./migrations/postgres").run(&self.pool).await?;

        debug!("Migrations applied");
        Ok(())
    }

    /// Get the connection pool.
    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// Close every pooled connection.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// Filesystem path of a SQLite URL, or `None` for in-memory databases.
#[cfg_attr(not(feature = "sqlite"), allow(dead_code))]
fn sqlite_file_path(url: &str) -> Option<&str> {
    let rest = url
        .strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"))?;
    let path = rest.split('?').next().unwrap_or_default();
    if path.is_empty() || path == ":memory:" {
        return None;
    }
    Some(path)
}

/// Hide the password part of a connection URL.
fn redact_url(url: &str) -> String {
    match url::Url::parse(url) {
        Ok(mut parsed) if parsed.password().is_some() => {
            let _ = parsed.set_password(Some("****"));
            parsed.to_string()
        }
        _ => url.to_string(),
    }
}
