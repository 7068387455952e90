use chrono::{DateTime, Utc};

use taskmanager_core::task::{NewTask, Task, TaskFilter, TaskPatch};

use super::super::{pg_err, pg_not_found, PostgresDatabase};
use crate::DbError;

#[derive(sqlx::FromRow)]
struct TaskRow {
    id: i64,
    title: String,
    description: Option<String>,
    status: String,
    due_date: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl From<TaskRow> for Task {
    fn from(r: TaskRow) -> Self {
        Task {
            id: r.id,
            title: r.title,
            description: r.description,
            status: r.status,
            due_date: r.due_date,
            created_at: r.created_at,
        }
    }
}

impl PostgresDatabase {
    pub(crate) async fn pg_create_task(&self, input: &NewTask) -> Result<Task, DbError> {
        let now = Utc::now();

        let row = sqlx::query_as::<_, TaskRow>(
            "INSERT INTO tasks (title, description, status, due_date, created_at)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING *",
        )
        .bind(&input.title)
        .bind(&input.description)
        .bind(&input.status)
        .bind(input.due_date)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(pg_err)?;

        Ok(row.into())
    }

    pub(crate) async fn pg_get_task(&self, id: i64) -> Result<Task, DbError> {
        let row = sqlx::query_as::<_, TaskRow>("SELECT * FROM tasks WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(pg_err)?
            .ok_or_else(|| pg_not_found(&format!("task {id}")))?;

        Ok(row.into())
    }

    pub(crate) async fn pg_list_tasks(&self, filter: &TaskFilter) -> Result<Vec<Task>, DbError> {
        let rows = match filter.status {
            Some(ref status) => {
                sqlx::query_as::<_, TaskRow>(
                    "SELECT * FROM tasks WHERE status = $1 ORDER BY created_at DESC, id DESC",
                )
                .bind(status)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query_as::<_, TaskRow>(
                    "SELECT * FROM tasks ORDER BY created_at DESC, id DESC",
                )
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(pg_err)?;

        Ok(rows.into_iter().map(|r| r.into()).collect())
    }

    pub(crate) async fn pg_update_task(
        &self,
        id: i64,
        patch: &TaskPatch,
    ) -> Result<Task, DbError> {
        if patch.is_empty() {
            return self.pg_get_task(id).await;
        }

        enum ParamValue {
            Str(String),
            OptStr(Option<String>),
            OptTimestamp(Option<DateTime<Utc>>),
        }
        let mut sets: Vec<String> = Vec::new();
        let mut params: Vec<ParamValue> = Vec::new();

        if let Some(ref title) = patch.title {
            params.push(ParamValue::Str(title.clone()));
            sets.push(format!("title = ${}", params.len()));
        }
        if let Some(ref description) = patch.description {
            params.push(ParamValue::OptStr(description.clone()));
            sets.push(format!("description = ${}", params.len()));
        }
        if let Some(ref status) = patch.status {
            params.push(ParamValue::Str(status.clone()));
            sets.push(format!("status = ${}", params.len()));
        }
        if let Some(due_date) = patch.due_date {
            params.push(ParamValue::OptTimestamp(due_date));
            sets.push(format!("due_date = ${}", params.len()));
        }

        let sql = format!(
            "UPDATE tasks SET {} WHERE id = ${} RETURNING *",
            sets.join(", "),
            params.len() + 1
        );

        let mut query = sqlx::query_as::<_, TaskRow>(&sql);
        for p in params {
            query = match p {
                ParamValue::Str(s) => query.bind(s),
                ParamValue::OptStr(s) => query.bind(s),
                ParamValue::OptTimestamp(t) => query.bind(t),
            };
        }
        query = query.bind(id);

        let row = query
            .fetch_optional(&self.pool)
            .await
            .map_err(pg_err)?
            .ok_or_else(|| pg_not_found(&format!("task {id}")))?;

        Ok(row.into())
    }

    pub(crate) async fn pg_delete_task(&self, id: i64) -> Result<(), DbError> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(pg_err)?;

        if result.rows_affected() == 0 {
            return Err(pg_not_found(&format!("task {id}")));
        }

        Ok(())
    }
}
