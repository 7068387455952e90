// Backend-agnostic integration tests for the Database trait.
//
// Each public async function accepts `&dyn Database` so that the same logic
// can be exercised against both the SQLite and Postgres backends.

use chrono::{TimeZone, Utc};
use taskmanager_core::task::{NewTask, TaskFilter, TaskPatch};
use taskmanager_db::{Database, DbError};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn make_task(title: &str, status: &str) -> NewTask {
    NewTask {
        title: title.to_string(),
        description: None,
        status: status.to_string(),
        due_date: None,
    }
}

// ---------------------------------------------------------------------------
// Task tests
// ---------------------------------------------------------------------------

pub async fn test_ping(db: &dyn Database) {
    db.ping().await.unwrap();
}

/// Create, get, update, delete.
pub async fn test_task_crud(db: &dyn Database) {
    let due = Utc.with_ymd_and_hms(2024, 12, 24, 18, 0, 0).unwrap();
    let task = db
        .create_task(&NewTask {
            title: "Wrap presents".into(),
            description: Some("all of them".into()),
            status: "pending".into(),
            due_date: Some(due),
        })
        .await
        .unwrap();
    assert_eq!(task.title, "Wrap presents");
    assert_eq!(task.due_date, Some(due));

    let fetched = db.get_task(task.id).await.unwrap();
    assert_eq!(fetched.id, task.id);
    assert_eq!(fetched.description.as_deref(), Some("all of them"));

    let updated = db
        .update_task(
            task.id,
            &TaskPatch {
                title: Some("Wrap some presents".into()),
                description: Some(None),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.title, "Wrap some presents");
    assert_eq!(updated.description, None);
    assert_eq!(updated.status, "pending");
    assert_eq!(updated.due_date, Some(due));

    db.delete_task(task.id).await.unwrap();
    assert!(matches!(
        db.get_task(task.id).await,
        Err(DbError::NotFound(_))
    ));
}

/// Exact-match status filter, newest first.
pub async fn test_task_filtering(db: &dyn Database) {
    let mut done_ids = Vec::new();
    for i in 0..5 {
        let status = if i % 2 == 0 { "done" } else { "pending" };
        let t = db
            .create_task(&make_task(&format!("task {i}"), status))
            .await
            .unwrap();
        if status == "done" {
            done_ids.push(t.id);
        }
    }
    done_ids.reverse();

    let done = db
        .list_tasks(&TaskFilter::with_status("done"))
        .await
        .unwrap();
    let ids: Vec<i64> = done.iter().map(|t| t.id).collect();
    assert_eq!(ids, done_ids);
    assert!(done.iter().all(|t| t.status == "done"));

    let all = db.list_tasks(&TaskFilter::default()).await.unwrap();
    assert_eq!(all.len(), 5);
    assert!(all.windows(2).all(|w| w[0].created_at >= w[1].created_at));
}

/// Clearing and setting due dates through a patch.
pub async fn test_due_date_patch(db: &dyn Database) {
    let task = db.create_task(&make_task("dated", "pending")).await.unwrap();
    assert_eq!(task.due_date, None);

    let due = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
    let set = db
        .update_task(
            task.id,
            &TaskPatch {
                due_date: Some(Some(due)),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(set.due_date, Some(due));

    let untouched = db
        .update_task(
            task.id,
            &TaskPatch {
                status: Some("done".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(untouched.due_date, Some(due));

    let cleared = db
        .update_task(
            task.id,
            &TaskPatch {
                due_date: Some(None),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(cleared.due_date, None);
    assert_eq!(cleared.status, "done");
}

pub async fn test_missing_task(db: &dyn Database) {
    assert!(matches!(db.get_task(9999).await, Err(DbError::NotFound(_))));
    assert!(matches!(
        db.delete_task(9999).await,
        Err(DbError::NotFound(_))
    ));
    assert!(matches!(
        db.update_task(
            9999,
            &TaskPatch {
                status: Some("done".into()),
                ..Default::default()
            }
        )
        .await,
        Err(DbError::NotFound(_))
    ));
}
