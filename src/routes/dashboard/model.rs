use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgPool};

/// 软删除约定：所有课程读取显式排除已完结（FI）状态，
/// 别名固定为 c
pub const COURSE_NOT_FINISHED: &str = "c.status <> 'FI'";

#[derive(Debug, Serialize, FromRow)]
pub struct Course {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub slug: String,
    pub manual_progress: i32,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, FromRow)]
pub struct VideoItem {
    pub id: i64,
    pub course_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub duration: Option<String>,
    pub src: String,
    pub sort_order: i32,
}

#[derive(Debug, Serialize, FromRow)]
pub struct RoadmapStep {
    pub id: i64,
    pub course_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub details: Option<String>,
    pub status: String,
    pub sort_order: i32,
}

#[derive(Debug, Serialize, FromRow)]
pub struct CourseScore {
    pub course_id: i64,
    pub score: Option<f64>,
    pub registered_at: DateTime<Utc>,
}

impl Course {
    pub async fn for_student(pool: &PgPool, student_id: i64) -> Result<Vec<Self>, sqlx::Error> {
        let sql = format!(
            r#"
            SELECT c.id, c.title, c.description, c.slug, c.manual_progress, c.status, c.created_at
            FROM courses c
            JOIN course_students cs ON cs.course_id = c.id
            WHERE cs.student_id = $1 AND {COURSE_NOT_FINISHED}
            ORDER BY c.title
            "#
        );
        sqlx::query_as::<_, Course>(&sql)
            .bind(student_id)
            .fetch_all(pool)
            .await
    }

    pub async fn find_enrolled(
        pool: &PgPool,
        course_id: i64,
        student_id: i64,
    ) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!(
            r#"
            SELECT c.id, c.title, c.description, c.slug, c.manual_progress, c.status, c.created_at
            FROM courses c
            JOIN course_students cs ON cs.course_id = c.id
            WHERE c.id = $1 AND cs.student_id = $2 AND {COURSE_NOT_FINISHED}
            "#
        );
        sqlx::query_as::<_, Course>(&sql)
            .bind(course_id)
            .bind(student_id)
            .fetch_optional(pool)
            .await
    }

    /// 课程进度：手动值优先，否则按已完成路线图步骤占比
    pub fn progress_percent(&self, completed_steps: usize, total_steps: usize) -> u8 {
        if self.manual_progress > 0 {
            return self.manual_progress.clamp(0, 100) as u8;
        }
        if total_steps == 0 {
            return 0;
        }
        ((completed_steps as f64 / total_steps as f64) * 100.0) as u8
    }
}

impl VideoItem {
    pub async fn for_student(pool: &PgPool, student_id: i64) -> Result<Vec<Self>, sqlx::Error> {
        let sql = format!(
            r#"
            SELECT v.id, v.course_id, v.title, v.description, v.duration, v.src, v.sort_order
            FROM videos v
            JOIN courses c ON c.id = v.course_id
            JOIN course_students cs ON cs.course_id = c.id
            WHERE cs.student_id = $1 AND {COURSE_NOT_FINISHED}
            ORDER BY v.sort_order
            "#
        );
        sqlx::query_as::<_, VideoItem>(&sql)
            .bind(student_id)
            .fetch_all(pool)
            .await
    }
}

impl RoadmapStep {
    pub async fn for_student(pool: &PgPool, student_id: i64) -> Result<Vec<Self>, sqlx::Error> {
        let sql = format!(
            r#"
            SELECT r.id, r.course_id, r.title, r.description, r.details, r.status, r.sort_order
            FROM roadmap_steps r
            JOIN courses c ON c.id = r.course_id
            JOIN course_students cs ON cs.course_id = c.id
            WHERE cs.student_id = $1 AND {COURSE_NOT_FINISHED}
            ORDER BY r.sort_order
            "#
        );
        sqlx::query_as::<_, RoadmapStep>(&sql)
            .bind(student_id)
            .fetch_all(pool)
            .await
    }
}

impl CourseScore {
    pub async fn for_student(pool: &PgPool, student_id: i64) -> Result<Vec<Self>, sqlx::Error> {
        let sql = format!(
            r#"
            SELECT cs.course_id, cs.score, cs.registered_at
            FROM course_students cs
            JOIN courses c ON c.id = cs.course_id
            WHERE cs.student_id = $1 AND {COURSE_NOT_FINISHED}
            "#
        );
        sqlx::query_as::<_, CourseScore>(&sql)
            .bind(student_id)
            .fetch_all(pool)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn course(manual_progress: i32) -> Course {
        Course {
            id: 1,
            title: "Rust 101".into(),
            description: None,
            slug: "rust-101".into(),
            manual_progress,
            status: "ST".into(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn manual_progress_overrides_roadmap() {
        assert_eq!(course(70).progress_percent(0, 10), 70);
        assert_eq!(course(130).progress_percent(0, 10), 100);
    }

    #[test]
    fn progress_follows_completed_steps() {
        assert_eq!(course(0).progress_percent(3, 4), 75);
        assert_eq!(course(0).progress_percent(0, 4), 0);
        assert_eq!(course(0).progress_percent(4, 4), 100);
    }

    #[test]
    fn empty_roadmap_means_zero_progress() {
        assert_eq!(course(0).progress_percent(0, 0), 0);
    }
}
