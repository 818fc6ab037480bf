use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};

use crate::routes::dashboard::COURSE_NOT_FINISHED;

#[derive(Debug, Serialize, FromRow)]
pub struct Assignment {
    pub id: i64,
    pub course_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub slug: String,
    pub due_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, FromRow)]
pub struct AssignmentSubmission {
    pub id: i64,
    pub assignment_id: i64,
    pub student_id: i64,
    pub github_link: Option<String>,
    pub status: String,
    pub grade: Option<f64>,
    pub feedback: Option<String>,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct SubmitAssignmentRequest {
    pub assignment_id: i64,
    pub github_link: String,
}

impl Assignment {
    pub async fn for_student(pool: &PgPool, student_id: i64) -> Result<Vec<Self>, sqlx::Error> {
        let sql = format!(
            r#"
            SELECT a.id, a.course_id, a.title, a.description, a.slug, a.due_date, a.created_at
            FROM assignments a
            JOIN courses c ON c.id = a.course_id
            JOIN course_students cs ON cs.course_id = c.id
            WHERE cs.student_id = $1 AND {COURSE_NOT_FINISHED}
            ORDER BY a.created_at DESC
            "#
        );
        sqlx::query_as::<_, Assignment>(&sql)
            .bind(student_id)
            .fetch_all(pool)
            .await
    }

    /// 校验作业归属：必须属于该学生选修的未完结课程
    pub async fn find_for_student(
        pool: &PgPool,
        assignment_id: i64,
        student_id: i64,
    ) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!(
            r#"
            SELECT a.id, a.course_id, a.title, a.description, a.slug, a.due_date, a.created_at
            FROM assignments a
            JOIN courses c ON c.id = a.course_id
            JOIN course_students cs ON cs.course_id = c.id
            WHERE a.id = $1 AND cs.student_id = $2 AND {COURSE_NOT_FINISHED}
            "#
        );
        sqlx::query_as::<_, Assignment>(&sql)
            .bind(assignment_id)
            .bind(student_id)
            .fetch_optional(pool)
            .await
    }
}

impl AssignmentSubmission {
    pub async fn for_student(pool: &PgPool, student_id: i64) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, AssignmentSubmission>(
            r#"
            SELECT id, assignment_id, student_id, github_link, status, grade, feedback, submitted_at
            FROM assignment_submissions
            WHERE student_id = $1
            "#,
        )
        .bind(student_id)
        .fetch_all(pool)
        .await
    }

    /// 每个学生对每份作业只有一条提交记录，重复提交覆盖链接并刷新时间
    pub async fn upsert(
        pool: &PgPool,
        assignment_id: i64,
        student_id: i64,
        github_link: &str,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, AssignmentSubmission>(
            r#"
            INSERT INTO assignment_submissions (assignment_id, student_id, github_link, status, submitted_at)
            VALUES ($1, $2, $3, 'submitted', NOW())
            ON CONFLICT (assignment_id, student_id)
            DO UPDATE SET github_link = EXCLUDED.github_link, status = 'submitted', submitted_at = NOW()
            RETURNING id, assignment_id, student_id, github_link, status, grade, feedback, submitted_at
            "#,
        )
        .bind(assignment_id)
        .bind(student_id)
        .bind(github_link)
        .fetch_one(pool)
        .await
    }
}
