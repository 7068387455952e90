#[cfg(feature = "postgres")]
pub mod postgres;
#[cfg(feature = "sqlite")]
pub mod sqlite;

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use taskmanager_core::task::{NewTask, Task, TaskFilter, TaskPatch};

#[cfg(feature = "postgres")]
pub use postgres::PostgresDatabase;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;

/// Used when `DATABASE_URL` is unset: a `tasks.db` file in the working directory.
pub const DEFAULT_DATABASE_URL: &str = "sqlite:///tasks.db";

#[derive(Debug, Error)]
pub enum DbError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("database error: {0}")]
    Internal(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid database configuration: {0}")]
    Config(String),
}

/// Where the task table lives, parsed from a connection URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DbConfig {
    /// `None` means an in-memory database.
    Sqlite { path: Option<PathBuf> },
    Postgres { url: String },
}

impl DbConfig {
    /// Parse a connection URL.
    ///
    /// SQLite accepts `sqlite:///relative.db`, `sqlite:////absolute.db`,
    /// `sqlite://file.db`, and `sqlite://` or `sqlite::memory:` for an
    /// in-memory store. Postgres accepts `postgres://` and `postgresql://`.
    pub fn from_url(url: &str) -> Result<Self, DbError> {
        let url = url.trim();
        if let Some(rest) = url.strip_prefix("sqlite:") {
            let rest = rest
                .strip_prefix("///")
                .or_else(|| rest.strip_prefix("//"))
                .unwrap_or(rest);
            let rest = rest.split('?').next().unwrap_or_default();
            let path = match rest {
                "" | ":memory:" => None,
                p => Some(PathBuf::from(p)),
            };
            return Ok(DbConfig::Sqlite { path });
        }
        if url.starts_with("postgres://") || url.starts_with("postgresql://") {
            return Ok(DbConfig::Postgres {
                url: url.to_string(),
            });
        }
        Err(DbError::Config(format!(
            "unsupported database url scheme: {url}"
        )))
    }

    pub fn backend_name(&self) -> &'static str {
        match self {
            DbConfig::Sqlite { .. } => "sqlite",
            DbConfig::Postgres { .. } => "postgres",
        }
    }
}

/// Repository over the `tasks` table.
///
/// Implementations hold no task rules: callers hand in already-validated
/// `NewTask`/`TaskPatch` values and get plain `Task` records back.
#[async_trait]
pub trait Database: Send + Sync {
    /// Round-trip a trivial query to prove the store is reachable.
    async fn ping(&self) -> Result<(), DbError>;

    async fn create_task(&self, input: &NewTask) -> Result<Task, DbError>;
    async fn get_task(&self, id: i64) -> Result<Task, DbError>;
    /// Newest first by `created_at`, ties broken by `id`.
    async fn list_tasks(&self, filter: &TaskFilter) -> Result<Vec<Task>, DbError>;
    async fn update_task(&self, id: i64, patch: &TaskPatch) -> Result<Task, DbError>;
    async fn delete_task(&self, id: i64) -> Result<(), DbError>;
}

/// Open the backend named by `config`, creating the schema if needed.
pub async fn open_database(config: &DbConfig) -> Result<Arc<dyn Database>, DbError> {
    tracing::debug!(backend = config.backend_name(), "opening database");
    match config {
        #[cfg(feature = "sqlite")]
        DbConfig::Sqlite { path: Some(path) } => {
            Ok(Arc::new(SqliteDatabase::open_path(path)?))
        }
        #[cfg(feature = "sqlite")]
        DbConfig::Sqlite { path: None } => Ok(Arc::new(SqliteDatabase::open_in_memory()?)),
        #[cfg(feature = "postgres")]
        DbConfig::Postgres { url } => Ok(Arc::new(PostgresDatabase::connect(url).await?)),
        #[allow(unreachable_patterns)]
        other => Err(DbError::Config(format!(
            "{} support is not compiled in",
            other.backend_name()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_url_is_relative_sqlite_file() {
        assert_eq!(
            DbConfig::from_url(DEFAULT_DATABASE_URL).unwrap(),
            DbConfig::Sqlite {
                path: Some(PathBuf::from("tasks.db"))
            }
        );
    }

    #[test]
    fn four_slashes_is_absolute() {
        assert_eq!(
            DbConfig::from_url("sqlite:////var/lib/tasks.db").unwrap(),
            DbConfig::Sqlite {
                path: Some(PathBuf::from("/var/lib/tasks.db"))
            }
        );
    }

    #[test]
    fn memory_forms() {
        for url in ["sqlite://", "sqlite::memory:", "sqlite:///:memory:"] {
            assert_eq!(
                DbConfig::from_url(url).unwrap(),
                DbConfig::Sqlite { path: None },
                "{url}"
            );
        }
    }

    #[test]
    fn postgres_urls() {
        let cfg = DbConfig::from_url("postgresql://u:p@localhost/tasks").unwrap();
        assert_eq!(cfg.backend_name(), "postgres");
        assert!(DbConfig::from_url("postgres://localhost/tasks").is_ok());
    }

    #[test]
    fn unknown_scheme_rejected() {
        let err = DbConfig::from_url("mysql://localhost/tasks").unwrap_err();
        assert!(matches!(err, DbError::Config(_)));
    }
}
