use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};

use crate::routes::dashboard::COURSE_NOT_FINISHED;

#[derive(Debug, Serialize, FromRow)]
pub struct Notification {
    pub id: i64,
    pub course_id: i64,
    pub content_type: String,
    pub content_item_id: i64,
    pub message: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct MarkReadRequest {
    pub notification_id: i64,
}

impl Notification {
    pub async fn for_student(pool: &PgPool, student_id: i64) -> Result<Vec<Self>, sqlx::Error> {
        let sql = format!(
            r#"
            SELECT n.id, n.course_id, n.content_type, n.content_item_id, n.message, n.is_read, n.created_at
            FROM notifications n
            JOIN courses c ON c.id = n.course_id
            JOIN course_students cs ON cs.course_id = n.course_id
            WHERE cs.student_id = $1 AND {COURSE_NOT_FINISHED}
            ORDER BY n.created_at DESC
            "#
        );
        sqlx::query_as::<_, Notification>(&sql)
            .bind(student_id)
            .fetch_all(pool)
            .await
    }

    pub async fn unread_count(pool: &PgPool, student_id: i64) -> Result<i64, sqlx::Error> {
        let sql = format!(
            r#"
            SELECT COUNT(*)
            FROM notifications n
            JOIN courses c ON c.id = n.course_id
            JOIN course_students cs ON cs.course_id = n.course_id
            WHERE cs.student_id = $1 AND n.is_read = FALSE AND {COURSE_NOT_FINISHED}
            "#
        );
        sqlx::query_scalar::<_, i64>(&sql)
            .bind(student_id)
            .fetch_one(pool)
            .await
    }

    /// 只允许学生标记自己课程下的通知
    pub async fn mark_read(
        pool: &PgPool,
        student_id: i64,
        notification_id: i64,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE notifications n
            SET is_read = TRUE
            FROM course_students cs
            WHERE n.id = $2 AND cs.course_id = n.course_id AND cs.student_id = $1
            "#,
        )
        .bind(student_id)
        .bind(notification_id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn mark_all_read(pool: &PgPool, student_id: i64) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE notifications n
            SET is_read = TRUE
            FROM course_students cs
            WHERE cs.course_id = n.course_id AND cs.student_id = $1 AND n.is_read = FALSE
            "#,
        )
        .bind(student_id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected())
    }
}
