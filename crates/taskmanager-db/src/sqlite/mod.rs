pub(crate) mod migrations;
pub mod queries;

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::Connection;

use taskmanager_core::task::{NewTask, Task, TaskFilter, TaskPatch};

use crate::{Database, DbError};

/// Extension trait that converts `rusqlite::Result<T>` into `Result<T, DbError>`.
///
/// Calling `.to_db()?` is the shortest way to map errors inside the query
/// modules.
pub(crate) trait SqliteResultExt<T> {
    fn to_db(self) -> Result<T, DbError>;
}

impl<T> SqliteResultExt<T> for rusqlite::Result<T> {
    fn to_db(self) -> Result<T, DbError> {
        self.map_err(map_sqlite_err)
    }
}

#[derive(Clone)]
pub struct SqliteDatabase {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteDatabase {
    pub fn open_path(path: &Path) -> Result<Self, DbError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path).to_db()?;
        conn.execute_batch(
            "PRAGMA journal_mode=WAL;
             PRAGMA busy_timeout=5000;",
        )
        .to_db()?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory().to_db()?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self, DbError> {
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    pub(crate) fn with_conn<F, T>(&self, f: F) -> Result<T, DbError>
    where
        F: FnOnce(&Connection) -> Result<T, DbError>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|_| DbError::Internal("lock poisoned".into()))?;
        f(&conn)
    }

    fn run_migrations(&self) -> Result<(), DbError> {
        self.with_conn(migrations::run)
    }

    pub fn ping_sync(&self) -> Result<(), DbError> {
        self.with_conn(|conn| {
            conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
                .to_db()?;
            Ok(())
        })
    }
}

/// Map a `rusqlite::Error` into a `DbError::Internal`.
pub(crate) fn map_sqlite_err(e: rusqlite::Error) -> DbError {
    DbError::Internal(e.to_string())
}

/// Run a synchronous query on the blocking pool.
async fn blocking<F, T>(f: F) -> Result<T, DbError>
where
    F: FnOnce() -> Result<T, DbError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| DbError::Internal(e.to_string()))?
}

#[async_trait]
impl Database for SqliteDatabase {
    async fn ping(&self) -> Result<(), DbError> {
        let db = self.clone();
        blocking(move || db.ping_sync()).await
    }

    async fn create_task(&self, input: &NewTask) -> Result<Task, DbError> {
        let db = self.clone();
        let input = input.clone();
        blocking(move || db.create_task_sync(&input)).await
    }

    async fn get_task(&self, id: i64) -> Result<Task, DbError> {
        let db = self.clone();
        blocking(move || db.get_task_sync(id)).await
    }

    async fn list_tasks(&self, filter: &TaskFilter) -> Result<Vec<Task>, DbError> {
        let db = self.clone();
        let filter = filter.clone();
        blocking(move || db.list_tasks_sync(&filter)).await
    }

    async fn update_task(&self, id: i64, patch: &TaskPatch) -> Result<Task, DbError> {
        let db = self.clone();
        let patch = patch.clone();
        blocking(move || db.update_task_sync(id, &patch)).await
    }

    async fn delete_task(&self, id: i64) -> Result<(), DbError> {
        let db = self.clone();
        blocking(move || db.delete_task_sync(id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_in_memory_returns_working_db() {
        let db = SqliteDatabase::open_in_memory().unwrap();
        db.with_conn(|conn| {
            let count: i64 = conn
                .query_row(
                    "SELECT count(*) FROM sqlite_master WHERE name = 'tasks'",
                    [],
                    |row| row.get(0),
                )
                .to_db()?;
            assert_eq!(count, 1);
            Ok(())
        })
        .unwrap();
        db.ping_sync().unwrap();
    }

    #[test]
    fn open_path_creates_file_and_parent_dirs() {
        let tmp = tempfile::tempdir().unwrap();
        let db_path = tmp.path().join("nested").join("tasks.db");
        assert!(!db_path.exists());

        let _db = SqliteDatabase::open_path(&db_path).unwrap();
        assert!(db_path.exists());
    }

    #[test]
    fn reopening_keeps_rows() {
        let tmp = tempfile::tempdir().unwrap();
        let db_path = tmp.path().join("tasks.db");

        let id = {
            let db = SqliteDatabase::open_path(&db_path).unwrap();
            db.create_task_sync(&NewTask {
                title: "persisted".into(),
                description: None,
                status: "pending".into(),
                due_date: None,
            })
            .unwrap()
            .id
        };

        let db = SqliteDatabase::open_path(&db_path).unwrap();
        assert_eq!(db.get_task_sync(id).unwrap().title, "persisted");
    }
}
