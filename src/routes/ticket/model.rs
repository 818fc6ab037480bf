use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};

#[derive(Debug, Serialize, FromRow)]
pub struct Ticket {
    pub id: i64,
    pub student_id: i64,
    pub subject: String,
    pub message: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateTicketRequest {
    pub subject: String,
    pub message: String,
}

impl Ticket {
    pub async fn for_student(pool: &PgPool, student_id: i64) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Ticket>(
            r#"
            SELECT id, student_id, subject, message, status, created_at, updated_at
            FROM tickets
            WHERE student_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(student_id)
        .fetch_all(pool)
        .await
    }

    /// 操作者作为显式参数传入，写入方不依赖任何环境态
    pub async fn create(
        pool: &PgPool,
        student_id: i64,
        subject: &str,
        message: &str,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Ticket>(
            r#"
            INSERT INTO tickets (student_id, subject, message, status)
            VALUES ($1, $2, $3, 'NE')
            RETURNING id, student_id, subject, message, status, created_at, updated_at
            "#,
        )
        .bind(student_id)
        .bind(subject)
        .bind(message)
        .fetch_one(pool)
        .await
    }
}
