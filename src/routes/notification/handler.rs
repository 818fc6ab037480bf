use axum::{
    extract::{Extension, Json, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Serialize;

use crate::{
    AppState,
    middleware::AuthUser,
    utils::{error_codes, error_to_api_response, success_to_api_response},
};

use super::model::{MarkReadRequest, Notification};
use super::sync::sync_notifications;

#[derive(Debug, Serialize)]
pub struct NotificationsResponse {
    pub notifications: Vec<Notification>,
    pub new_notifications_count: i64,
}

#[axum::debug_handler]
pub async fn list_notifications(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> impl IntoResponse {
    // 读取前先补齐缺失的通知
    if let Err(e) = sync_notifications(&state.pool, user.id).await {
        tracing::error!("Notification sync failed for student {}: {}", user.id, e);
    }

    let result: Result<NotificationsResponse, sqlx::Error> = async {
        let notifications = Notification::for_student(&state.pool, user.id).await?;
        let new_notifications_count = Notification::unread_count(&state.pool, user.id).await?;
        Ok(NotificationsResponse {
            notifications,
            new_notifications_count,
        })
    }
    .await;

    match result {
        Ok(data) => (StatusCode::OK, success_to_api_response(data)),
        Err(e) => {
            tracing::error!("Failed to list notifications for student {}: {}", user.id, e);
            (
                StatusCode::OK,
                error_to_api_response(error_codes::INTERNAL_ERROR, "数据库错误".to_string()),
            )
        }
    }
}

#[axum::debug_handler]
pub async fn mark_read(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<MarkReadRequest>,
) -> impl IntoResponse {
    match Notification::mark_read(&state.pool, user.id, req.notification_id).await {
        Ok(true) => (StatusCode::OK, success_to_api_response(())),
        Ok(false) => (
            StatusCode::OK,
            error_to_api_response(error_codes::NOT_FOUND, "通知不存在".to_string()),
        ),
        Err(e) => {
            tracing::error!("Failed to mark notification {}: {}", req.notification_id, e);
            (
                StatusCode::OK,
                error_to_api_response(error_codes::INTERNAL_ERROR, "数据库错误".to_string()),
            )
        }
    }
}

#[axum::debug_handler]
pub async fn mark_all_read(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> impl IntoResponse {
    match Notification::mark_all_read(&state.pool, user.id).await {
        Ok(count) => {
            tracing::debug!("Marked {} notifications read for student {}", count, user.id);
            (StatusCode::OK, success_to_api_response(()))
        }
        Err(e) => {
            tracing::error!("Failed to mark notifications for student {}: {}", user.id, e);
            (
                StatusCode::OK,
                error_to_api_response(error_codes::INTERNAL_ERROR, "数据库错误".to_string()),
            )
        }
    }
}
