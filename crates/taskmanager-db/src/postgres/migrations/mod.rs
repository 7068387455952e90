use sqlx::PgPool;

use super::pg_err;
use crate::DbError;

/// Fixed key for the advisory lock that serialises schema creation across
/// processes booting at the same time.
const MIGRATION_LOCK_KEY: i64 = 0x7461_736b_6d67_7200; // "taskmgr\0"

pub async fn run(pool: &PgPool) -> Result<(), DbError> {
    // Session-level lock; pin one connection so lock and unlock share it.
    let mut conn = pool
        .acquire()
        .await
        .map_err(pg_err)?;

    sqlx::query("SELECT pg_advisory_lock($1)")
        .bind(MIGRATION_LOCK_KEY)
        .execute(&mut *conn)
        .await
        .map_err(pg_err)?;

    let result = sqlx::raw_sql(
        "CREATE TABLE IF NOT EXISTS tasks (
             id          BIGSERIAL PRIMARY KEY,
             title       TEXT NOT NULL,
             description TEXT,
             status      TEXT NOT NULL DEFAULT 'pending',
             due_date    TIMESTAMPTZ,
             created_at  TIMESTAMPTZ NOT NULL
         );
         CREATE INDEX IF NOT EXISTS idx_tasks_status     ON tasks(status);
         CREATE INDEX IF NOT EXISTS idx_tasks_created_at ON tasks(created_at);",
    )
    .execute(&mut *conn)
    .await
    .map(|_| ())
    .map_err(pg_err);

    let _ = sqlx::query("SELECT pg_advisory_unlock($1)")
        .bind(MIGRATION_LOCK_KEY)
        .execute(&mut *conn)
        .await;

    result
}
