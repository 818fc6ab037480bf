use std::collections::HashMap;

use axum::{
    extract::{Extension, Json, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Serialize;

use crate::{
    AppState,
    middleware::AuthUser,
    routes::dashboard::Course,
    routes::notification::Notification,
    utils::{error_codes, error_to_api_response, success_to_api_response},
};

use super::model::{Assignment, AssignmentSubmission, SubmitAssignmentRequest};

#[derive(Debug, Serialize)]
pub struct AssignmentWithSubmission {
    #[serde(flatten)]
    pub assignment: Assignment,
    pub submission: Option<AssignmentSubmission>,
}

#[derive(Debug, Serialize)]
pub struct CourseAssignments {
    pub course: Course,
    pub assignments: Vec<AssignmentWithSubmission>,
}

#[derive(Debug, Serialize)]
pub struct AssignmentsResponse {
    pub courses: Vec<CourseAssignments>,
    pub new_notifications_count: i64,
}

#[axum::debug_handler]
pub async fn list_assignments(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> impl IntoResponse {
    let result: Result<AssignmentsResponse, sqlx::Error> = async {
        let courses = Course::for_student(&state.pool, user.id).await?;
        let assignments = Assignment::for_student(&state.pool, user.id).await?;
        let submissions = AssignmentSubmission::for_student(&state.pool, user.id).await?;
        let new_notifications_count = Notification::unread_count(&state.pool, user.id).await?;

        let mut submissions_map: HashMap<i64, AssignmentSubmission> = submissions
            .into_iter()
            .map(|s| (s.assignment_id, s))
            .collect();
        let mut by_course: HashMap<i64, Vec<AssignmentWithSubmission>> = HashMap::new();
        for assignment in assignments {
            let submission = submissions_map.remove(&assignment.id);
            by_course
                .entry(assignment.course_id)
                .or_default()
                .push(AssignmentWithSubmission {
                    assignment,
                    submission,
                });
        }

        let courses = courses
            .into_iter()
            .map(|course| {
                let assignments = by_course.remove(&course.id).unwrap_or_default();
                CourseAssignments {
                    course,
                    assignments,
                }
            })
            .collect();

        Ok(AssignmentsResponse {
            courses,
            new_notifications_count,
        })
    }
    .await;

    match result {
        Ok(data) => (StatusCode::OK, success_to_api_response(data)),
        Err(e) => {
            tracing::error!("Failed to list assignments for student {}: {}", user.id, e);
            (
                StatusCode::OK,
                error_to_api_response(error_codes::INTERNAL_ERROR, "数据库错误".to_string()),
            )
        }
    }
}

#[axum::debug_handler]
pub async fn submit_assignment(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<SubmitAssignmentRequest>,
) -> impl IntoResponse {
    if req.github_link.trim().is_empty() {
        return (
            StatusCode::OK,
            error_to_api_response(error_codes::VALIDATION_ERROR, "提交链接不能为空".to_string()),
        );
    }

    match Assignment::find_for_student(&state.pool, req.assignment_id, user.id).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            return (
                StatusCode::OK,
                error_to_api_response(
                    error_codes::NOT_FOUND,
                    "作业不存在或不属于所选课程".to_string(),
                ),
            );
        }
        Err(e) => {
            tracing::error!("Failed to check assignment {}: {}", req.assignment_id, e);
            return (
                StatusCode::OK,
                error_to_api_response(error_codes::INTERNAL_ERROR, "数据库错误".to_string()),
            );
        }
    }

    match AssignmentSubmission::upsert(
        &state.pool,
        req.assignment_id,
        user.id,
        req.github_link.trim(),
    )
    .await
    {
        Ok(submission) => {
            tracing::info!(
                "Student {} submitted assignment {}",
                user.id,
                req.assignment_id
            );
            (StatusCode::OK, success_to_api_response(submission))
        }
        Err(e) => {
            tracing::error!("Failed to store submission: {}", e);
            (
                StatusCode::OK,
                error_to_api_response(error_codes::INTERNAL_ERROR, "保存提交失败".to_string()),
            )
        }
    }
}
