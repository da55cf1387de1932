//! # Database Pool Management
//!
//! Connection pool creation and configuration for the embedded SQLite store.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Database Lifecycle                                 │
//! │                                                                         │
//! │  DbConfig::from_env()  ← TAPAS_DB_PATH / TAPAS_DB_DIR / ./db/tapas.db  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Database::connect(config)                                             │
//! │       ├── create the database directory if missing                     │
//! │       ├── open SqlitePool (WAL, foreign keys on)                       │
//! │       └── run migrations; a brand-new file is removed if they fail     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  db.configuration() / db.catalog() / db.bills()  ← repositories        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  db.close()  ← on application shutdown                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## WAL Mode
//! File databases use WAL so the ticket printer thread can read bills while
//! the till writes new ones.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::repository::bill::BillRepository;
use crate::repository::catalog::CatalogRepository;
use crate::repository::configuration::ConfigurationRepository;

/// Special path selecting a private in-memory database.
const IN_MEMORY: &str = ":memory:";

/// File name used inside the database directory.
pub const DEFAULT_DB_FILE: &str = "tapas.db";

/// Directory used when neither `TAPAS_DB_PATH` nor `TAPAS_DB_DIR` is set.
pub const DEFAULT_DB_DIR: &str = "db";

// =============================================================================
// Configuration
// =============================================================================

/// Database configuration.
///
/// ## Example
/// ```rust,ignore
/// let config = DbConfig::new("/var/lib/tapas/tapas.db")
///     .max_connections(4)
///     .run_migrations(true);
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Path to the SQLite database file, or `:memory:`.
    pub database_path: PathBuf,

    /// Maximum number of connections in the pool.
    /// Default: 5
    pub max_connections: u32,

    /// Minimum number of connections to keep alive.
    /// Default: 1
    pub min_connections: u32,

    /// Time to wait for a free connection.
    /// Default: 30 seconds
    pub connect_timeout: Duration,

    /// Idle time before a connection is closed. `None` keeps them forever.
    /// Default: 10 minutes
    pub idle_timeout: Option<Duration>,

    /// Whether to run migrations on connect.
    /// Default: true
    pub run_migrations: bool,
}

impl DbConfig {
    /// Creates a configuration for the database file at `path`.
    ///
    /// The file and its parent directory are created on connect.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 5,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Some(Duration::from_secs(600)),
            run_migrations: true,
        }
    }

    /// Creates a configuration for `tapas.db` inside `dir`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        DbConfig::new(dir.as_ref().join(DEFAULT_DB_FILE))
    }

    /// Builds the configuration from the process environment.
    ///
    /// ## Environment Variables
    /// - `TAPAS_DB_PATH`: full path of the database file (wins)
    /// - `TAPAS_DB_DIR`: directory holding `tapas.db` (default `./db`)
    pub fn from_env() -> Self {
        DbConfig::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`DbConfig::from_env`] with an injectable variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(path) = non_empty("TAPAS_DB_PATH") {
            return DbConfig::new(path);
        }

        let dir = non_empty("TAPAS_DB_DIR").unwrap_or_else(|| DEFAULT_DB_DIR.to_string());
        DbConfig::in_dir(dir)
    }

    /// Creates an in-memory database configuration (for testing).
    ///
    /// Every call yields a separate, empty database.
    pub fn in_memory() -> Self {
        DbConfig {
            database_path: PathBuf::from(IN_MEMORY),
            max_connections: 1,
            min_connections: 1,
            connect_timeout: Duration::from_secs(5),
            // The database lives only as long as its connection
            idle_timeout: None,
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

    /// Sets whether to run migrations on connect.
    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    pub fn is_in_memory(&self) -> bool {
        self.database_path.as_os_str() == IN_MEMORY
    }

    fn connect_options(&self) -> DbResult<SqliteConnectOptions> {
        let options = if self.is_in_memory() {
            SqliteConnectOptions::from_str("sqlite::memory:")
                .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
        } else {
            SqliteConnectOptions::new()
                .filename(&self.database_path)
                .create_if_missing(true)
                .journal_mode(SqliteJournalMode::Wal)
        };

        Ok(options
            .synchronous(SqliteSynchronous::Normal)
            // Products and bill lines cascade on delete
            .foreign_keys(true))
    }
}

// =============================================================================
// Database
// =============================================================================

/// Main database handle providing repository access.
///
/// Cloning is cheap: clones share the same pool.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens (creating if needed) the database and applies migrations.
    ///
    /// ## What This Does
    /// 1. Makes sure the database directory exists and is writable
    /// 2. Opens the pool with WAL, NORMAL synchronous, foreign keys on
    /// 3. Runs migrations (if enabled)
    ///
    /// ## Errors
    /// - `DbError::ConnectionFailed` - directory unusable or SQLite refused to open
    /// - `DbError::MigrationFailed` - schema could not be created; a database
    ///   file created by this call is deleted again
    pub async fn connect(config: DbConfig) -> DbResult<Self> {
        info!(
            path = %config.database_path.display(),
            "Initializing database connection"
        );

        let fresh = !config.is_in_memory() && !config.database_path.exists();
        if !config.is_in_memory() {
            prepare_directory(&config.database_path)?;
        }

        let connect_options = config.connect_options()?;
        debug!(fresh, "Connection options configured");

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.connect_timeout)
            .idle_timeout(config.idle_timeout)
            .max_lifetime(config.idle_timeout.map(|idle| idle * 3))
            .connect_with(connect_options)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        info!(max_connections = config.max_connections, "Database pool created");

        let db = Database { pool };

        if config.run_migrations {
            if let Err(err) = db.run_migrations().await {
                db.close().await;
                if fresh {
                    warn!(
                        path = %config.database_path.display(),
                        error = %err,
                        "Schema creation failed, removing new database file"
                    );
                    remove_database_files(&config.database_path);
                }
                return Err(err);
            }
        }

        Ok(db)
    }

    /// Runs database migrations.
    ///
    /// Called by `connect()` unless `run_migrations` is false.
    pub async fn run_migrations(&self) -> DbResult<()> {
        migrations::run_migrations(&self.pool).await
    }

    /// Returns `(total, applied)` migration counts.
    pub async fn migration_status(&self) -> DbResult<(usize, usize)> {
        migrations::migration_status(&self.pool).await
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Returns the configuration repository.
    pub fn configuration(&self) -> ConfigurationRepository {
        ConfigurationRepository::new(self.pool.clone())
    }

    /// Returns the catalog (categories and products) repository.
    pub fn catalog(&self) -> CatalogRepository {
        CatalogRepository::new(self.pool.clone())
    }

    /// Returns the bill repository.
    pub fn bills(&self) -> BillRepository {
        BillRepository::new(self.pool.clone())
    }

    /// Closes the connection pool.
    ///
    /// Afterwards every repository call fails with `ConnectionFailed`.
    pub async fn close(&self) {
        info!("Closing database connection pool");
        self.pool.close().await;
    }

    pub fn is_closed(&self) -> bool {
        self.pool.is_closed()
    }

    /// Checks if the database can execute queries.
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}

/// Creates the parent directory of `db_path` and checks it is writable.
fn prepare_directory(db_path: &Path) -> DbResult<()> {
    let Some(dir) = db_path.parent().filter(|d| !d.as_os_str().is_empty()) else {
        return Ok(());
    };

    std::fs::create_dir_all(dir).map_err(|e| {
        DbError::ConnectionFailed(format!("Can't create db directory [{}]: {e}", dir.display()))
    })?;

    let metadata = std::fs::metadata(dir).map_err(|e| {
        DbError::ConnectionFailed(format!("Can't read db directory [{}]: {e}", dir.display()))
    })?;

    if !metadata.is_dir() || metadata.permissions().readonly() {
        return Err(DbError::ConnectionFailed(format!(
            "db directory [{}] is not writable",
            dir.display()
        )));
    }

    Ok(())
}

/// Deletes a database file and its WAL side files. Missing files are ignored.
fn remove_database_files(db_path: &Path) {
    for suffix in ["", "-wal", "-shm"] {
        let mut name = db_path.as_os_str().to_owned();
        name.push(suffix);
        let path = PathBuf::from(name);
        if let Err(err) = std::fs::remove_file(&path) {
            if err.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %path.display(), error = %err, "Could not remove database file");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_database() {
        let db = Database::connect(DbConfig::in_memory()).await.unwrap();

        assert!(db.health_check().await);
        let (total, applied) = db.migration_status().await.unwrap();
        assert_eq!(total, applied);
        assert!(total >= 1);
    }

    #[tokio::test]
    async fn test_in_memory_databases_are_isolated() {
        let a = Database::connect(DbConfig::in_memory()).await.unwrap();
        let b = Database::connect(DbConfig::in_memory()).await.unwrap();

        sqlx::query("INSERT INTO categories (caption) VALUES ('Postres')")
            .execute(a.pool())
            .await
            .unwrap();

        let in_b: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM categories")
            .fetch_one(b.pool())
            .await
            .unwrap();
        assert_eq!(in_b, 0);
    }

    #[tokio::test]
    async fn test_closed_database_fails() {
        let db = Database::connect(DbConfig::in_memory()).await.unwrap();
        db.close().await;

        assert!(db.is_closed());
        assert!(!db.health_check().await);
    }

    #[test]
    fn test_config_builder() {
        let config = DbConfig::new("/tmp/test.db")
            .max_connections(10)
            .min_connections(2)
            .run_migrations(false);

        assert_eq!(config.max_connections, 10);
        assert_eq!(config.min_connections, 2);
        assert!(!config.run_migrations);
        assert!(!config.is_in_memory());
        assert!(DbConfig::in_memory().is_in_memory());
    }

    #[test]
    fn test_config_from_lookup() {
        let config = DbConfig::from_lookup(|_| None);
        assert_eq!(config.database_path, Path::new("db").join("tapas.db"));

        let config = DbConfig::from_lookup(|key| {
            (key == "TAPAS_DB_DIR").then(|| "/srv/bar".to_string())
        });
        assert_eq!(config.database_path, Path::new("/srv/bar/tapas.db"));

        let config = DbConfig::from_lookup(|key| match key {
            "TAPAS_DB_PATH" => Some("/tmp/other.sqlite".to_string()),
            "TAPAS_DB_DIR" => Some("/srv/bar".to_string()),
            _ => None,
        });
        assert_eq!(config.database_path, Path::new("/tmp/other.sqlite"));
    }

    #[test]
    fn test_remove_database_files() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("x.db");
        for name in ["x.db", "x.db-wal", "x.db-shm", "other.db"] {
            std::fs::write(dir.path().join(name), b"junk").unwrap();
        }

        remove_database_files(&db_path);

        assert!(!db_path.exists());
        assert!(!dir.path().join("x.db-wal").exists());
        assert!(!dir.path().join("x.db-shm").exists());
        assert!(dir.path().join("other.db").exists());
    }

    #[test]
    fn test_remove_database_files_tolerates_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("x.db");
        std::fs::write(&db_path, b"junk").unwrap();

        // No -wal / -shm present
        remove_database_files(&db_path);
        assert!(!db_path.exists());

        remove_database_files(&db_path);
    }

    #[tokio::test]
    async fn test_failed_setup_keeps_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("x.db");
        std::fs::write(&db_path, b"this is not a sqlite database, just text").unwrap();

        let result = Database::connect(DbConfig::new(&db_path)).await;

        assert!(result.is_err());
        assert!(db_path.exists());
    }

    #[test]
    fn test_config_from_lookup_ignores_blank_values() {
        let config = DbConfig::from_lookup(|_| Some("  ".to_string()));
        assert_eq!(config.database_path, Path::new("db").join("tapas.db"));
    }
}
