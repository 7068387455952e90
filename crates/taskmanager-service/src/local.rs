use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use taskmanager_core::task::{
    parse_iso8601, CreateTask, NewTask, Task, TaskFilter, TaskPatch, UpdateTask, DEFAULT_STATUS,
};
use taskmanager_db::{Database, DbError};

use crate::{ServiceError, TaskService};

pub const TITLE_REQUIRED_ERROR: &str = "title is required";
pub const DUE_DATE_FORMAT_ERROR: &str = "Invalid due_date format, use ISO 8601";

/// Local implementation: validates payloads, then delegates to the datastore.
#[derive(Clone)]
pub struct LocalService {
    db: Arc<dyn Database>,
}

impl LocalService {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }
}

impl From<DbError> for ServiceError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::NotFound(what) => ServiceError::NotFound(format!("{what} not found")),
            other => ServiceError::Internal(other.to_string()),
        }
    }
}

/// Empty and missing both count as "no due date".
fn parse_due_date(raw: Option<&str>) -> Result<Option<DateTime<Utc>>, ServiceError> {
    match raw {
        None | Some("") => Ok(None),
        Some(s) => parse_iso8601(s)
            .map(Some)
            .map_err(|_| ServiceError::InvalidInput(DUE_DATE_FORMAT_ERROR.into())),
    }
}

fn validate_create(input: &CreateTask) -> Result<NewTask, ServiceError> {
    let title = match input.title.as_deref() {
        Some(t) if !t.is_empty() => t.to_string(),
        _ => return Err(ServiceError::InvalidInput(TITLE_REQUIRED_ERROR.into())),
    };
    let due_date = parse_due_date(input.due_date.as_deref())?;

    Ok(NewTask {
        title,
        description: input.description.clone(),
        status: input
            .status
            .clone()
            .unwrap_or_else(|| DEFAULT_STATUS.to_string()),
        due_date,
    })
}

fn non_null(field: &str, value: &Option<Option<String>>) -> Result<Option<String>, ServiceError> {
    match value {
        None => Ok(None),
        Some(Some(v)) => Ok(Some(v.clone())),
        Some(None) => Err(ServiceError::InvalidInput(format!("{field} cannot be null"))),
    }
}

/// Turn a wire payload into a patch. Everything is checked here so that a bad
/// field rejects the whole request before anything is written.
fn validate_update(update: &UpdateTask) -> Result<TaskPatch, ServiceError> {
    let due_date = match &update.due_date {
        None => None,
        Some(raw) => Some(parse_due_date(raw.as_deref())?),
    };

    Ok(TaskPatch {
        title: non_null("title", &update.title)?,
        description: update.description.clone(),
        status: non_null("status", &update.status)?,
        due_date,
    })
}

#[async_trait]
impl TaskService for LocalService {
    async fn list_tasks(&self, filter: &TaskFilter) -> Result<Vec<Task>, ServiceError> {
        Ok(self.db.list_tasks(filter).await?)
    }

    async fn get_task(&self, id: i64) -> Result<Task, ServiceError> {
        Ok(self.db.get_task(id).await?)
    }

    async fn create_task(&self, input: &CreateTask) -> Result<Task, ServiceError> {
        let new_task = validate_create(input)?;
        let task = self.db.create_task(&new_task).await?;
        tracing::debug!(id = task.id, status = %task.status, "task created");
        Ok(task)
    }

    async fn update_task(&self, id: i64, update: &UpdateTask) -> Result<Task, ServiceError> {
        // Existence is checked before the payload so a missing task reads as 404.
        self.db.get_task(id).await?;
        let patch = validate_update(update)?;
        let task = self.db.update_task(id, &patch).await?;
        tracing::debug!(id, "task updated");
        Ok(task)
    }

    async fn delete_task(&self, id: i64) -> Result<(), ServiceError> {
        self.db.delete_task(id).await?;
        tracing::debug!(id, "task deleted");
        Ok(())
    }
}
