use axum::{
    extract::{Extension, Json, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::{
    AppState,
    middleware::AuthUser,
    utils::{error_codes, error_to_api_response, success_to_api_response},
};

use super::model::{CreateTicketRequest, Ticket};

#[axum::debug_handler]
pub async fn list_tickets(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> impl IntoResponse {
    match Ticket::for_student(&state.pool, user.id).await {
        Ok(tickets) => (StatusCode::OK, success_to_api_response(tickets)),
        Err(e) => {
            tracing::error!("Failed to list tickets for student {}: {}", user.id, e);
            (
                StatusCode::OK,
                error_to_api_response(error_codes::INTERNAL_ERROR, "数据库错误".to_string()),
            )
        }
    }
}

#[axum::debug_handler]
pub async fn submit_ticket(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<CreateTicketRequest>,
) -> impl IntoResponse {
    let subject = req.subject.trim();
    let message = req.message.trim();
    if subject.is_empty() || message.is_empty() {
        return (
            StatusCode::OK,
            error_to_api_response(
                error_codes::VALIDATION_ERROR,
                "主题和内容不能为空".to_string(),
            ),
        );
    }

    match Ticket::create(&state.pool, user.id, subject, message).await {
        Ok(ticket) => {
            tracing::info!("Student {} opened ticket {}", user.id, ticket.id);
            (StatusCode::OK, success_to_api_response(ticket))
        }
        Err(e) => {
            tracing::error!("Failed to create ticket for student {}: {}", user.id, e);
            (
                StatusCode::OK,
                error_to_api_response(error_codes::INTERNAL_ERROR, "提交工单失败".to_string()),
            )
        }
    }
}
