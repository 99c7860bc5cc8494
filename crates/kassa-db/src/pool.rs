//! # Database Pool Management
//!
//! Connection pool creation and configuration for SQLite.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Database Connection Pool                           │
//! │                                                                         │
//! │  Sync process startup                                                  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbConfig::from_env() / DbConfig::new(path)                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Database::new(config).await                                           │
//! │       ├── Registry::build()   ← mapping metadata checked first         │
//! │       ├── SqlitePool          ← WAL, NORMAL sync, foreign keys on      │
//! │       └── migrations          ← if run_migrations                      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  db.sales() / db.closes() / db.corrections() / db.errors()             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Every repository call: db.begin() ──► work ──► commit                 │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## WAL Mode
//! SQLite WAL (Write-Ahead Logging) mode is enabled for:
//! - Readers don't block writers
//! - Writers don't block readers
//! - Better crash recovery

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::registry::Registry;
use crate::repository::{
    CloseRepository, CorrectionRepository, ErrorRepository, SaleRepository,
};

/// Database file used when `KASSA_DB_PATH` is not set.
pub const DEFAULT_DATABASE_PATH: &str = "kassa.db";

// =============================================================================
// Configuration
// =============================================================================

/// Database configuration.
///
/// ## Example
/// ```rust,ignore
/// let config = DbConfig::new("/var/lib/kassa/kassa.db")
///     .max_connections(5)
///     .min_connections(1);
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Path to the SQLite database file.
    pub database_path: PathBuf,

    /// Maximum number of connections in the pool.
    /// Default: 5
    pub max_connections: u32,

    /// Minimum number of connections to keep alive.
    /// Default: 1
    pub min_connections: u32,

    /// Pool acquire timeout.
    /// Default: 30 seconds
    pub connect_timeout: Duration,

    /// Idle timeout before closing a connection.
    /// Default: 10 minutes
    pub idle_timeout: Duration,

    /// Whether to run migrations on connect.
    /// Default: true
    pub run_migrations: bool,
}

impl DbConfig {
    /// Creates a new database configuration with the given path.
    ///
    /// The file is created if it doesn't exist.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 5,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            run_migrations: true,
        }
    }

    /// Sets the maximum number of connections.
    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Sets the minimum number of connections.
    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    /// Sets the connection timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the idle timeout.
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Sets whether to run migrations on connect.
    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    /// Creates an in-memory database configuration (for testing).
    ///
    /// ## Usage
    /// ```rust,ignore
    /// let db = Database::new(DbConfig::in_memory()).await?;
    /// // Database is isolated, perfect for tests
    /// ```
    pub fn in_memory() -> Self {
        DbConfig {
            database_path: PathBuf::from(":memory:"),
            max_connections: 1, // In-memory requires single connection
            min_connections: 1,
            connect_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(60),
            run_migrations: true,
        }
    }

    /// Builds a configuration from the process environment.
    ///
    /// ## Variables
    /// | Variable                   | Meaning                      | Default    |
    /// |----------------------------|------------------------------|------------|
    /// | `KASSA_DB_PATH`            | database file                | `kassa.db` |
    /// | `KASSA_DB_MAX_CONNECTIONS` | pool size, positive integer  | `5`        |
    /// | `KASSA_DB_RUN_MIGRATIONS`  | `true`/`false`/`1`/`0`       | `true`     |
    ///
    /// A variable that is set but unparseable is a configuration error, not
    /// silently ignored.
    pub fn from_env() -> DbResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// [`DbConfig::from_env`] over an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> DbResult<Self> {
        let path = lookup("KASSA_DB_PATH").unwrap_or_else(|| DEFAULT_DATABASE_PATH.to_string());
        let mut config = DbConfig::new(path);

        if let Some(raw) = lookup("KASSA_DB_MAX_CONNECTIONS") {
            match raw.trim().parse::<u32>() {
                Ok(max) if max > 0 => {
                    debug!(max_connections = max, "Overriding pool size from environment");
                    config.max_connections = max;
                    config.min_connections = config.min_connections.min(max);
                }
                _ => {
                    return Err(DbError::configuration(format!(
                        "KASSA_DB_MAX_CONNECTIONS must be a positive integer, got '{raw}'"
                    )))
                }
            }
        }

        if let Some(raw) = lookup("KASSA_DB_RUN_MIGRATIONS") {
            config.run_migrations = match raw.trim().to_lowercase().as_str() {
                "true" | "1" | "yes" => true,
                "false" | "0" | "no" => false,
                _ => {
                    return Err(DbError::configuration(format!(
                        "KASSA_DB_RUN_MIGRATIONS must be a boolean, got '{raw}'"
                    )))
                }
            };
        }

        Ok(config)
    }
}

// =============================================================================
// Database
// =============================================================================

/// Main database handle providing repository access.
///
/// Cheap to clone: the pool, the registry and the transaction counter are
/// all shared.
///
/// ## Usage
/// ```rust,ignore
/// let db = Database::new(DbConfig::from_env()?).await?;
///
/// let pending = db.sales().not_completed().await?;
/// for sale in pending {
///     // send to backend, then:
///     db.sales().update(&sale_with_result).await?;
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Database {
    /// The SQLite connection pool.
    pool: SqlitePool,

    /// Validated column mappings.
    registry: Arc<Registry>,

    /// Transactions opened through this handle (and its clones).
    transactions: Arc<AtomicU64>,
}

impl Database {
    /// Creates a new database connection pool.
    ///
    /// ## What This Does
    /// 1. Builds and validates the mapping registry
    /// 2. Creates the database file if it doesn't exist
    /// 3. Configures SQLite:
    ///    - WAL mode for concurrent reads
    ///    - NORMAL synchronous (balance of safety/speed)
    ///    - Foreign keys enabled (child rows cascade with their root)
    /// 4. Creates the connection pool
    /// 5. Runs migrations (if enabled)
    ///
    /// ## Returns
    /// * `Ok(Database)` - Ready-to-use database handle
    /// * `Err(DbError)` - Bad mapping metadata, connection or migration failed
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(
            path = %config.database_path.display(),
            "Initializing database connection"
        );

        let registry = Registry::build()?;
        debug!("Column mappings validated");

        // sqlite://path creates file if not exists
        let connect_url = format!("sqlite://{}?mode=rwc", config.database_path.display());

        let connect_options = SqliteConnectOptions::from_str(&connect_url)
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            // SQLite has them disabled by default
            .foreign_keys(true)
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.connect_timeout)
            .idle_timeout(Some(config.idle_timeout))
            .connect_with(connect_options)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        info!(
            max_connections = config.max_connections,
            "Database pool created"
        );

        let db = Database {
            pool,
            registry: Arc::new(registry),
            transactions: Arc::new(AtomicU64::new(0)),
        };

        if config.run_migrations {
            db.run_migrations().await?;
        }

        Ok(db)
    }

    /// Runs database migrations.
    ///
    /// Called by `new()` when `run_migrations` is set. Idempotent.
    pub async fn run_migrations(&self) -> DbResult<()> {
        info!("Running database migrations");
        migrations::run_migrations(&self.pool).await?;
        info!("Migrations complete");
        Ok(())
    }

    /// Returns `(embedded, applied)` migration counts.
    pub async fn migration_status(&self) -> DbResult<(usize, usize)> {
        migrations::migration_status(&self.pool).await
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Returns the validated mapping registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Opens a transaction.
    ///
    /// Dropping the returned transaction without committing rolls it back.
    pub async fn begin(&self) -> DbResult<Transaction<'static, Sqlite>> {
        self.transactions.fetch_add(1, Ordering::Relaxed);
        self.pool.begin().await.map_err(DbError::transaction)
    }

    /// Number of transactions opened so far through this handle.
    pub fn transactions_started(&self) -> u64 {
        self.transactions.load(Ordering::Relaxed)
    }

    /// Returns the sale request repository.
    ///
    /// ## Example
    /// ```rust,ignore
    /// let pending = db.sales().not_completed().await?;
    /// ```
    pub fn sales(&self) -> SaleRepository {
        SaleRepository::new(self.clone())
    }

    /// Returns the shift close request repository.
    pub fn closes(&self) -> CloseRepository {
        CloseRepository::new(self.clone())
    }

    /// Returns the correction request repository.
    pub fn corrections(&self) -> CorrectionRepository {
        CorrectionRepository::new(self.clone())
    }

    /// Returns the sync error repository.
    pub fn errors(&self) -> ErrorRepository {
        ErrorRepository::new(self.clone())
    }

    /// Closes the database connection pool.
    ///
    /// After calling close, every repository operation that needs storage
    /// fails with `DbError::ConnectionFailed`.
    pub async fn close(&self) {
        info!("Closing database connection pool");
        self.pool.close().await;
    }

    /// Checks if the database is healthy (can execute queries).
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .is_ok()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
