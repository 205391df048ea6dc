//! PostgreSQL 通知 Repository 实现

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pulse_common::types::NotificationId;
use pulse_errors::{AppError, AppResult};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::notification::Notification;
use crate::domain::repositories::NotificationRepository;
use crate::domain::rules::Severity;

pub struct PostgresNotificationRepository {
    pool: PgPool,
}

impl PostgresNotificationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct NotificationRow {
    id: Uuid,
    notification_type: String,
    title: String,
    description: String,
    severity: String,
    read: bool,
    metric_value: Decimal,
    threshold_value: Decimal,
    comparison_period: String,
    created_at: DateTime<Utc>,
}

impl NotificationRow {
    fn into_notification(self) -> AppResult<Notification> {
        let severity = match self.severity.as_str() {
            "info" => Severity::Info,
            "warning" => Severity::Warning,
            "critical" => Severity::Critical,
            other => {
                return Err(AppError::database(format!(
                    "Unknown notification severity: {}",
                    other
                )))
            }
        };
        Ok(Notification {
            id: NotificationId::from_uuid(self.id),
            notification_type: self.notification_type,
            title: self.title,
            description: self.description,
            severity,
            read: self.read,
            metric_value: self.metric_value,
            threshold_value: self.threshold_value,
            comparison_period: self.comparison_period,
            created_at: self.created_at,
        })
    }
}

#[async_trait]
impl NotificationRepository for PostgresNotificationRepository {
    async fn exists_since(
        &self,
        notification_type: &str,
        since: DateTime<Utc>,
    ) -> AppResult<bool> {
        let row: (bool,) = sqlx::query_as(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM notifications
                WHERE notification_type = $1 AND created_at >= $2
            )
            "#,
        )
        .bind(notification_type)
        .bind(since)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to check notification cooldown: {}", e)))?;
        Ok(row.0)
    }

    async fn insert(&self, notification: &Notification) -> AppResult<NotificationId> {
        sqlx::query(
            r#"
            INSERT INTO notifications (id, notification_type, title, description, severity,
                                       read, metric_value, threshold_value, comparison_period,
                                       created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(notification.id.0)
        .bind(&notification.notification_type)
        .bind(&notification.title)
        .bind(&notification.description)
        .bind(notification.severity.as_str())
        .bind(notification.read)
        .bind(notification.metric_value)
        .bind(notification.threshold_value)
        .bind(&notification.comparison_period)
        .bind(notification.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to insert notification: {}", e)))?;
        Ok(notification.id)
    }

    async fn mark_read(&self, id: NotificationId) -> AppResult<bool> {
        let result = sqlx::query("UPDATE notifications SET read = TRUE WHERE id = $1")
            .bind(id.0)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to mark notification read: {}", e)))?;
        Ok(result.rows_affected() > 0)
    }

    async fn mark_all_read(&self) -> AppResult<u64> {
        let result = sqlx::query("UPDATE notifications SET read = TRUE WHERE read = FALSE")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to mark notifications read: {}", e)))?;
        Ok(result.rows_affected())
    }

    async fn list_recent(&self, limit: u32) -> AppResult<Vec<Notification>> {
        let rows: Vec<NotificationRow> = sqlx::query_as(
            r#"
            SELECT id, notification_type, title, description, severity, read,
                   metric_value, threshold_value, comparison_period, created_at
            FROM notifications
            ORDER BY created_at DESC
            LIMIT $1
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to list notifications: {}", e)))?;

        rows.into_iter()
            .map(NotificationRow::into_notification)
            .collect()
    }

    async fn count_unread(&self) -> AppResult<i64> {
        let row: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM notifications WHERE read = FALSE")
                .fetch_one(&self.pool)
                .await
                .map_err(|e| AppError::database(format!("Failed to count notifications: {}", e)))?;
        Ok(row.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notification_row_severity_parsing() {
        let row = NotificationRow {
            id: Uuid::now_v7(),
            notification_type: "success_rate_low".to_string(),
            title: "Success rate below threshold".to_string(),
            description: String::new(),
            severity: "critical".to_string(),
            read: false,
            metric_value: Decimal::from(50),
            threshold_value: Decimal::from(70),
            comparison_period: "Last 7 days".to_string(),
            created_at: Utc::now(),
        };
        assert_eq!(row.into_notification().unwrap().severity, Severity::Critical);
    }

    #[test]
    fn test_notification_row_rejects_unknown_severity() {
        let row = NotificationRow {
            id: Uuid::now_v7(),
            notification_type: "success_rate_low".to_string(),
            title: String::new(),
            description: String::new(),
            severity: "fatal".to_string(),
            read: false,
            metric_value: Decimal::ZERO,
            threshold_value: Decimal::ZERO,
            comparison_period: String::new(),
            created_at: Utc::now(),
        };
        assert!(row.into_notification().is_err());
    }
}
