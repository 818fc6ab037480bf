use std::collections::HashMap;

use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Serialize;

use crate::{
    AppState,
    middleware::AuthUser,
    routes::assignment::Assignment,
    routes::notification::{Notification, sync_notifications},
    routes::ticket::Ticket,
    utils::{error_codes, error_to_api_response, success_to_api_response},
};

use super::model::{Course, CourseScore, RoadmapStep, VideoItem};

#[derive(Debug, Serialize)]
pub struct CourseOverview {
    #[serde(flatten)]
    pub course: Course,
    pub progress_percent: u8,
    pub score: Option<f64>,
    pub roadmap: Vec<RoadmapStep>,
}

#[derive(Debug, Serialize)]
pub struct DashboardHomeResponse {
    pub courses: Vec<CourseOverview>,
    pub videos: Vec<VideoItem>,
    pub assignments: Vec<Assignment>,
    pub notifications: Vec<Notification>,
    pub new_notifications_count: i64,
    pub tickets: Vec<Ticket>,
}

#[axum::debug_handler]
pub async fn home(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> impl IntoResponse {
    // 懒同步：进入仪表盘前补齐课程内容缺失的通知
    if let Err(e) = sync_notifications(&state.pool, user.id).await {
        tracing::error!("Notification sync failed for student {}: {}", user.id, e);
    }

    let result: Result<DashboardHomeResponse, sqlx::Error> = async {
        let courses = Course::for_student(&state.pool, user.id).await?;
        let videos = VideoItem::for_student(&state.pool, user.id).await?;
        let assignments = Assignment::for_student(&state.pool, user.id).await?;
        let notifications = Notification::for_student(&state.pool, user.id).await?;
        let new_notifications_count = Notification::unread_count(&state.pool, user.id).await?;
        let tickets = Ticket::for_student(&state.pool, user.id).await?;
        let steps = RoadmapStep::for_student(&state.pool, user.id).await?;
        let scores = CourseScore::for_student(&state.pool, user.id).await?;

        let mut scores_map: HashMap<i64, Option<f64>> =
            scores.into_iter().map(|s| (s.course_id, s.score)).collect();
        let mut steps_map: HashMap<i64, Vec<RoadmapStep>> = HashMap::new();
        for step in steps {
            steps_map.entry(step.course_id).or_default().push(step);
        }

        let courses = courses
            .into_iter()
            .map(|course| {
                let roadmap = steps_map.remove(&course.id).unwrap_or_default();
                let completed = roadmap.iter().filter(|s| s.status == "completed").count();
                let progress_percent = course.progress_percent(completed, roadmap.len());
                let score = scores_map.remove(&course.id).flatten();
                CourseOverview {
                    progress_percent,
                    score,
                    roadmap,
                    course,
                }
            })
            .collect();

        Ok(DashboardHomeResponse {
            courses,
            videos,
            assignments,
            notifications,
            new_notifications_count,
            tickets,
        })
    }
    .await;

    match result {
        Ok(data) => (StatusCode::OK, success_to_api_response(data)),
        Err(e) => {
            tracing::error!("Failed to build dashboard for student {}: {}", user.id, e);
            (
                StatusCode::OK,
                error_to_api_response(error_codes::INTERNAL_ERROR, "数据库错误".to_string()),
            )
        }
    }
}

#[axum::debug_handler]
pub async fn course_detail(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(course_id): Path<i64>,
) -> impl IntoResponse {
    match Course::find_enrolled(&state.pool, course_id, user.id).await {
        Ok(Some(course)) => (StatusCode::OK, success_to_api_response(course)),
        Ok(None) => (
            StatusCode::OK,
            error_to_api_response(error_codes::NOT_FOUND, "课程不存在或未选修".to_string()),
        ),
        Err(e) => {
            tracing::error!("Failed to load course {}: {}", course_id, e);
            (
                StatusCode::OK,
                error_to_api_response(error_codes::INTERNAL_ERROR, "数据库错误".to_string()),
            )
        }
    }
}
