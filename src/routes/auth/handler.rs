use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, Extension, Json, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use chrono::Utc;
use uuid::Uuid;

use crate::{
    AppState,
    cache::{CachedSession, SessionCacheOperations},
    cache::operations::{auth::AuthCacheOperations, otp::OtpCacheOperations},
    middleware::{AuthUser, client_ip, remaining_seconds},
    utils::{
        SendMailError, error_codes, error_to_api_response, generate_numeric_otp, generate_token,
        send_confirmation_email, send_otp_sms, success_to_api_response,
    },
};

use super::model::{
    LoginRequest, LoginResponse, SendConfirmationRequest, SendOtpRequest,
    SessionRemainingResponse, Student, VerifyOtpRequest,
};

#[axum::debug_handler]
pub async fn login(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(req): Json<LoginRequest>,
) -> impl IntoResponse {
    let ip = client_ip(&headers, Some(addr));

    // 连续失败达到上限的 IP 在封锁窗口内直接拒绝
    match AuthCacheOperations::login_attempts(&state.redis, &ip).await {
        Ok(attempts) if attempts >= state.config.login_max_attempts => {
            tracing::warn!("IP blocked due to too many login attempts: {}", ip);
            return (
                StatusCode::TOO_MANY_REQUESTS,
                error_to_api_response(
                    error_codes::RATE_LIMIT,
                    "登录尝试过于频繁，请稍后再试".to_string(),
                ),
            );
        }
        Ok(_) => {}
        Err(e) => {
            // 计数不可用时不拦截登录
            tracing::warn!("Login attempt counter unavailable for {}: {}", ip, e);
        }
    }

    let student = match Student::find_by_username(&state.pool, &req.username).await {
        Ok(student) => student,
        Err(e) => {
            tracing::error!("Failed to load student {}: {}", req.username, e);
            return (
                StatusCode::OK,
                error_to_api_response(error_codes::INTERNAL_ERROR, "数据库错误".to_string()),
            );
        }
    };

    match student {
        Some(student) if student.verify_login(&req.password) => {
            if !student.is_active {
                tracing::warn!("Inactive account login attempt: {}", student.username);
                return (
                    StatusCode::OK,
                    error_to_api_response(error_codes::AUTH_FAILED, "账号已停用".to_string()),
                );
            }

            // 登录成功后清空失败计数
            if let Err(e) = AuthCacheOperations::clear_login_attempts(&state.redis, &ip).await {
                tracing::warn!("Failed to clear login attempts for {}: {}", ip, e);
            }

            match open_session(&state, &student).await {
                Ok(token) => {
                    tracing::info!("User logged in successfully: {}", student.username);
                    (
                        StatusCode::OK,
                        success_to_api_response(LoginResponse { token, student }),
                    )
                }
                Err(msg) => (
                    StatusCode::OK,
                    error_to_api_response(error_codes::INTERNAL_ERROR, msg),
                ),
            }
        }
        _ => {
            let attempts = AuthCacheOperations::record_failed_login(
                &state.redis,
                &ip,
                state.config.login_block_secs,
            )
            .await
            .unwrap_or(0);
            tracing::info!(
                "Failed login attempt {} for IP {} and username: {}",
                attempts,
                ip,
                req.username
            );
            (
                StatusCode::OK,
                error_to_api_response(error_codes::AUTH_FAILED, "用户名或密码错误".to_string()),
            )
        }
    }
}

#[axum::debug_handler]
pub async fn send_otp(
    State(state): State<AppState>,
    Json(req): Json<SendOtpRequest>,
) -> impl IntoResponse {
    let phone = req.phone_number.trim();
    if phone.is_empty() {
        return (
            StatusCode::OK,
            error_to_api_response(error_codes::VALIDATION_ERROR, "手机号不能为空".to_string()),
        );
    }

    let code = generate_numeric_otp(state.config.otp_length);
    if let Err(e) =
        OtpCacheOperations::store_otp(&state.redis, phone, &code, state.config.otp_expiration_secs)
            .await
    {
        tracing::error!("Failed to store OTP for {}: {}", phone, e);
        return (
            StatusCode::OK,
            error_to_api_response(error_codes::INTERNAL_ERROR, "验证码生成失败".to_string()),
        );
    }

    // 投递失败不向调用方暴露，验证码仍然有效
    if let Err(e) = send_otp_sms(&state.config, phone, &code).await {
        tracing::error!("Failed to deliver OTP to {}: {}", phone, e);
    }

    (StatusCode::OK, success_to_api_response(()))
}

#[axum::debug_handler]
pub async fn verify_otp(
    State(state): State<AppState>,
    Json(req): Json<VerifyOtpRequest>,
) -> impl IntoResponse {
    let stored = match OtpCacheOperations::take_otp(&state.redis, req.phone_number.trim()).await {
        Ok(stored) => stored,
        Err(e) => {
            tracing::error!("OTP lookup failed for {}: {}", req.phone_number, e);
            return (
                StatusCode::OK,
                error_to_api_response(error_codes::INTERNAL_ERROR, "验证码校验失败".to_string()),
            );
        }
    };

    if stored.as_deref() != Some(req.code.as_str()) {
        return (
            StatusCode::OK,
            error_to_api_response(error_codes::AUTH_FAILED, "验证码无效或已过期".to_string()),
        );
    }

    let student = match Student::find_by_phone(&state.pool, req.phone_number.trim()).await {
        Ok(Some(student)) if student.is_active => student,
        Ok(Some(_)) => {
            return (
                StatusCode::OK,
                error_to_api_response(error_codes::AUTH_FAILED, "账号已停用".to_string()),
            );
        }
        Ok(None) => {
            return (
                StatusCode::OK,
                error_to_api_response(error_codes::NOT_FOUND, "该手机号未注册".to_string()),
            );
        }
        Err(e) => {
            tracing::error!("Failed to load student by phone: {}", e);
            return (
                StatusCode::OK,
                error_to_api_response(error_codes::INTERNAL_ERROR, "数据库错误".to_string()),
            );
        }
    };

    match open_session(&state, &student).await {
        Ok(token) => {
            tracing::info!("User logged in via OTP: {}", student.username);
            (
                StatusCode::OK,
                success_to_api_response(LoginResponse { token, student }),
            )
        }
        Err(msg) => (
            StatusCode::OK,
            error_to_api_response(error_codes::INTERNAL_ERROR, msg),
        ),
    }
}

#[axum::debug_handler]
pub async fn logout(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> impl IntoResponse {
    match SessionCacheOperations::remove_session(&state.redis, &user.session_id).await {
        Ok(()) => {
            tracing::info!("User logged out: {}", user.username);
            (StatusCode::OK, success_to_api_response(()))
        }
        Err(e) => {
            tracing::error!("Failed to remove session {}: {}", user.session_id, e);
            (
                StatusCode::OK,
                error_to_api_response(error_codes::INTERNAL_ERROR, "退出登录失败".to_string()),
            )
        }
    }
}

#[axum::debug_handler]
pub async fn send_confirmation(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<SendConfirmationRequest>,
) -> impl IntoResponse {
    let ip = client_ip(&headers, Some(addr));

    match send_confirmation_email(&state.redis, &state.config, user.id, req.email.trim(), &ip).await
    {
        Ok(()) => (StatusCode::OK, success_to_api_response(())),
        Err(SendMailError::Cooldown(wait)) => (
            StatusCode::TOO_MANY_REQUESTS,
            error_to_api_response(
                error_codes::RATE_LIMIT,
                format!("Please wait {} seconds before making another request.", wait),
            ),
        ),
        Err(SendMailError::Gateway(e)) => {
            tracing::error!("Confirmation email failed for student {}: {}", user.id, e);
            (
                StatusCode::OK,
                error_to_api_response(error_codes::INTERNAL_ERROR, "发送确认邮件失败".to_string()),
            )
        }
    }
}

#[axum::debug_handler]
pub async fn session_remaining(
    State(state): State<AppState>,
    Extension(session): Extension<CachedSession>,
) -> impl IntoResponse {
    let remaining = remaining_seconds(
        &session.last_activity,
        Utc::now(),
        state.config.auto_logout_timeout_secs,
    );
    (
        StatusCode::OK,
        success_to_api_response(SessionRemainingResponse {
            remaining_seconds: remaining,
        }),
    )
}

#[axum::debug_handler]
pub async fn session_extend(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> impl IntoResponse {
    match SessionCacheOperations::touch_session(
        &state.redis,
        &user.session_id,
        state.config.session_ttl_secs,
    )
    .await
    {
        Ok(()) => (StatusCode::OK, success_to_api_response(())),
        Err(e) => {
            tracing::error!("Failed to extend session {}: {}", user.session_id, e);
            (
                StatusCode::OK,
                error_to_api_response(error_codes::INTERNAL_ERROR, "会话续期失败".to_string()),
            )
        }
    }
}

// 创建服务端会话并签发对应令牌
async fn open_session(state: &AppState, student: &Student) -> Result<String, String> {
    let session_id = Uuid::new_v4().to_string();

    SessionCacheOperations::create_session(
        &state.redis,
        &session_id,
        student.id,
        &student.username,
        state.config.session_ttl_secs,
    )
    .await
    .map_err(|e| {
        tracing::error!("Failed to create session for {}: {}", student.username, e);
        "创建会话失败".to_string()
    })?;

    generate_token(student.id, &session_id, &state.config).map_err(|e| {
        tracing::error!("Failed to issue token for {}: {}", student.username, e);
        "生成令牌失败".to_string()
    })
}
