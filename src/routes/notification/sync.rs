use std::collections::HashSet;

use sqlx::{FromRow, PgPool};

use crate::routes::dashboard::COURSE_NOT_FINISHED;

/// 课程内容类别，决定通知消息模板与去重键
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentKind {
    Video,
    Assignment,
    ResourceLink,
    RoadmapStep,
}

impl ContentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Video => "video",
            ContentKind::Assignment => "assignment",
            ContentKind::ResourceLink => "resource_link",
            ContentKind::RoadmapStep => "roadmap_step",
        }
    }

    /// 各类别的固定消息模板
    pub fn message(&self, title: &str) -> String {
        match self {
            ContentKind::Video => format!("New video added: {}", title),
            ContentKind::Assignment => format!("New assignment posted: {}", title),
            ContentKind::ResourceLink => format!("New resource link added: {}", title),
            ContentKind::RoadmapStep => format!("New roadmap step added: {}", title),
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct ContentItem {
    pub course_id: i64,
    pub item_id: i64,
    pub title: String,
}

/// 补课式通知同步：扫描学生所有未完结课程的内容，为还没有
/// 对应通知的条目补一条未读通知。幂等；并发下的重复插入由
/// (course, content_type, content_item_id) 唯一约束吃掉。
/// 返回新建的通知条数。
pub async fn sync_notifications(pool: &PgPool, student_id: i64) -> Result<u64, sqlx::Error> {
    let queries = [
        (
            ContentKind::Video,
            format!(
                r#"
                SELECT v.course_id, v.id AS item_id, v.title
                FROM videos v
                JOIN courses c ON c.id = v.course_id
                JOIN course_students cs ON cs.course_id = c.id
                WHERE cs.student_id = $1 AND {COURSE_NOT_FINISHED}
                "#
            ),
        ),
        (
            ContentKind::Assignment,
            format!(
                r#"
                SELECT a.course_id, a.id AS item_id, a.title
                FROM assignments a
                JOIN courses c ON c.id = a.course_id
                JOIN course_students cs ON cs.course_id = c.id
                WHERE cs.student_id = $1 AND {COURSE_NOT_FINISHED}
                "#
            ),
        ),
        (
            ContentKind::ResourceLink,
            format!(
                r#"
                SELECT s.course_id, l.id AS item_id, l.title
                FROM resource_links l
                JOIN resource_sections s ON s.id = l.section_id
                JOIN courses c ON c.id = s.course_id
                JOIN course_students cs ON cs.course_id = c.id
                WHERE cs.student_id = $1 AND {COURSE_NOT_FINISHED}
                "#
            ),
        ),
        (
            ContentKind::RoadmapStep,
            format!(
                r#"
                SELECT r.course_id, r.id AS item_id, r.title
                FROM roadmap_steps r
                JOIN courses c ON c.id = r.course_id
                JOIN course_students cs ON cs.course_id = c.id
                WHERE cs.student_id = $1 AND {COURSE_NOT_FINISHED}
                "#
            ),
        ),
    ];

    let mut items: Vec<(ContentKind, ContentItem)> = Vec::new();
    for (kind, sql) in &queries {
        let rows = sqlx::query_as::<_, ContentItem>(sql)
            .bind(student_id)
            .fetch_all(pool)
            .await?;
        items.extend(rows.into_iter().map(|row| (*kind, row)));
    }

    let existing: HashSet<(i64, String, i64)> = sqlx::query_as::<_, (i64, String, i64)>(
        r#"
        SELECT n.course_id, n.content_type, n.content_item_id
        FROM notifications n
        JOIN course_students cs ON cs.course_id = n.course_id
        WHERE cs.student_id = $1
        "#,
    )
    .bind(student_id)
    .fetch_all(pool)
    .await?
    .into_iter()
    .collect();

    let mut created = 0u64;
    for (kind, item) in missing_notifications(&items, &existing) {
        let result = sqlx::query(
            r#"
            INSERT INTO notifications (course_id, content_type, content_item_id, message, is_read, created_at)
            VALUES ($1, $2, $3, $4, FALSE, NOW())
            ON CONFLICT (course_id, content_type, content_item_id) DO NOTHING
            "#,
        )
        .bind(item.course_id)
        .bind(kind.as_str())
        .bind(item.item_id)
        .bind(kind.message(&item.title))
        .execute(pool)
        .await?;
        created += result.rows_affected();
    }

    if created > 0 {
        tracing::debug!("Created {} notifications for student {}", created, student_id);
    }
    Ok(created)
}

/// 纯函数：在现存通知键之外还缺通知的内容条目
fn missing_notifications<'a>(
    items: &'a [(ContentKind, ContentItem)],
    existing: &HashSet<(i64, String, i64)>,
) -> Vec<(ContentKind, &'a ContentItem)> {
    items
        .iter()
        .filter(|(kind, item)| {
            !existing.contains(&(item.course_id, kind.as_str().to_string(), item.item_id))
        })
        .map(|(kind, item)| (*kind, item))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(course_id: i64, item_id: i64, title: &str) -> ContentItem {
        ContentItem {
            course_id,
            item_id,
            title: title.into(),
        }
    }

    fn key(kind: ContentKind, item: &ContentItem) -> (i64, String, i64) {
        (item.course_id, kind.as_str().to_string(), item.item_id)
    }

    #[test]
    fn all_items_missing_on_first_pass() {
        let items = vec![
            (ContentKind::Video, item(1, 10, "Intro")),
            (ContentKind::Assignment, item(1, 20, "Homework 1")),
        ];
        let missing = missing_notifications(&items, &HashSet::new());
        assert_eq!(missing.len(), 2);
    }

    #[test]
    fn second_pass_finds_nothing_to_create() {
        let items = vec![
            (ContentKind::Video, item(1, 10, "Intro")),
            (ContentKind::RoadmapStep, item(2, 5, "Setup")),
        ];

        // 第一轮产生的键全部入集后，第二轮为空
        let existing: HashSet<_> = items.iter().map(|(k, i)| key(*k, i)).collect();
        assert!(missing_notifications(&items, &existing).is_empty());
    }

    #[test]
    fn same_item_id_in_different_categories_is_distinct() {
        let items = vec![
            (ContentKind::Video, item(1, 7, "Generics")),
            (ContentKind::Assignment, item(1, 7, "Generics")),
        ];
        let existing: HashSet<_> = [key(ContentKind::Video, &items[0].1)].into();
        let missing = missing_notifications(&items, &existing);
        assert_eq!(missing.len(), 1);
        assert_eq!(missing[0].0, ContentKind::Assignment);
    }

    #[test]
    fn message_templates_are_stable_per_category() {
        assert_eq!(
            ContentKind::Video.message("Ownership"),
            "New video added: Ownership"
        );
        assert_eq!(
            ContentKind::Assignment.message("Borrow checker"),
            "New assignment posted: Borrow checker"
        );
        assert_eq!(
            ContentKind::ResourceLink.message("The Book"),
            "New resource link added: The Book"
        );
        assert_eq!(
            ContentKind::RoadmapStep.message("Traits"),
            "New roadmap step added: Traits"
        );
    }
}
