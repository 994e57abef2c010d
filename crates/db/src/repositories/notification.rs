use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use staffdesk_core::domain::notification::{Notification, NotificationId};

use super::{NotificationRepository, RepositoryError};
use crate::DbPool;

pub struct SqlNotificationRepository {
    pool: DbPool,
}

impl SqlNotificationRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn decode<E: std::fmt::Display>(error: E) -> RepositoryError {
    RepositoryError::Decode(error.to_string())
}

fn row_to_notification(row: &SqliteRow) -> Result<Notification, RepositoryError> {
    let id: String = row.try_get("id").map_err(decode)?;
    let user_id: String = row.try_get("user_id").map_err(decode)?;
    let title: String = row.try_get("title").map_err(decode)?;
    let body: String = row.try_get("body").map_err(decode)?;
    let kind: String = row.try_get("kind").map_err(decode)?;
    let is_read: i64 = row.try_get("is_read").map_err(decode)?;
    let created_at: String = row.try_get("created_at").map_err(decode)?;

    Ok(Notification {
        id: NotificationId(id),
        recipient_user_id: user_id,
        title,
        body,
        kind,
        is_read: is_read != 0,
        created_at: DateTime::parse_from_rfc3339(&created_at)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(decode)?,
    })
}

#[async_trait::async_trait]
impl NotificationRepository for SqlNotificationRepository {
    async fn insert(&self, notification: Notification) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO notifications (id, user_id, title, body, kind, is_read, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&notification.id.0)
        .bind(&notification.recipient_user_id)
        .bind(&notification.title)
        .bind(&notification.body)
        .bind(&notification.kind)
        .bind(i64::from(notification.is_read))
        .bind(notification.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<Notification>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, user_id, title, body, kind, is_read, created_at
             FROM notifications WHERE user_id = ? ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_notification).collect()
    }

    async fn mark_read(&self, id: &NotificationId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("UPDATE notifications SET is_read = 1 WHERE id = ?")
            .bind(&id.0)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
