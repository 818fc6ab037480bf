use axum::Json;
use bcrypt::{DEFAULT_COST, hash, verify};
use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand::Rng;
use redis::Client as RedisClient;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::cache::operations::auth::AuthCacheOperations;
use crate::cache::operations::cooldown::CooldownCacheOperations;
use crate::config::Config;

pub fn hash_password(password: &str) -> Result<String, bcrypt::BcryptError> {
    hash(password.as_bytes(), DEFAULT_COST)
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool, bcrypt::BcryptError> {
    verify(password.as_bytes(), hash)
}

/// 当前 Unix 时间（秒，浮点）
pub fn epoch_now() -> f64 {
    Utc::now().timestamp_millis() as f64 / 1000.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // 学生ID
    pub sid: String, // 服务端会话ID
    pub exp: i64,    // 过期时间
    pub iat: i64,    // 签发时间
}

/// 签发携带会话ID的令牌；令牌寿命与服务端会话一致，
/// 会话被销毁后令牌即失效
pub fn generate_token(
    student_id: i64,
    session_id: &str,
    config: &Config,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: student_id.to_string(),
        sid: session_id.to_string(),
        exp: now + config.session_ttl_secs as i64,
        iat: now,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
}

pub fn verify_token(token: &str, config: &Config) -> Result<Claims, jsonwebtoken::errors::Error> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        &Validation::default(),
    )?;

    Ok(token_data.claims)
}

/// 生成数字验证码，首位不为 0
pub fn generate_numeric_otp(length: usize) -> String {
    let mut rng = rand::thread_rng();
    let mut code = String::with_capacity(length);
    code.push(char::from(b'1' + rng.gen_range(0..9u8)));
    for _ in 1..length {
        code.push(char::from(b'0' + rng.gen_range(0..10u8)));
    }
    code
}

/// 把验证码推送到短信网关；未配置网关时仅记录日志
pub async fn send_otp_sms(config: &Config, phone: &str, code: &str) -> Result<(), reqwest::Error> {
    let Some(url) = &config.sms_gateway_url else {
        tracing::debug!("SMS gateway not configured, OTP for {} not delivered", phone);
        return Ok(());
    };

    let payload = serde_json::json!({
        "recipient": phone,
        "code": code,
        "ttl_seconds": config.otp_expiration_secs,
    });
    reqwest::Client::new()
        .post(url)
        .json(&payload)
        .send()
        .await?
        .error_for_status()?;

    tracing::info!("OTP sent to {}", phone);
    Ok(())
}

#[derive(Debug)]
pub enum SendMailError {
    /// 距离上一次发送的剩余等待秒数
    Cooldown(u64),
    Gateway(String),
}

/// 发送确认邮件：对收件地址做冷却检查，签发一次性令牌后
/// 投递到邮件网关。client_ip 仅用于日志。
pub async fn send_confirmation_email(
    redis: &Arc<RedisClient>,
    config: &Config,
    student_id: i64,
    to_email: &str,
    client_ip: &str,
) -> Result<(), SendMailError> {
    tracing::info!(
        "Preparing confirmation email for student {} to {} from IP {}",
        student_id,
        to_email,
        client_ip
    );

    let (allowed, wait) =
        CooldownCacheOperations::check_cooldown(redis, to_email, config.user_cooldown_secs).await;
    if !allowed {
        tracing::warn!("Cooldown violated for {}: {}s remaining", to_email, wait);
        return Err(SendMailError::Cooldown(wait));
    }

    let token = Uuid::new_v4().to_string();
    AuthCacheOperations::store_email_token(
        redis,
        student_id,
        &token,
        config.email_token_expiration_secs,
    )
    .await
    .map_err(|e| SendMailError::Gateway(e.to_string()))?;

    let Some(url) = &config.mail_gateway_url else {
        tracing::debug!("Mail gateway not configured, token for {} not delivered", to_email);
        return Ok(());
    };

    let payload = serde_json::json!({
        "to": to_email,
        "token_id": token,
        "ttl_hours": config.email_token_expiration_secs / 3600,
    });
    reqwest::Client::new()
        .post(url)
        .json(&payload)
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .map_err(|e| {
            tracing::error!("Failed to send confirmation email to {}: {}", to_email, e);
            SendMailError::Gateway(e.to_string())
        })?;

    tracing::info!("Confirmation email sent to {}", to_email);
    Ok(())
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub code: i32,
    pub msg: String,
    pub resp_data: Option<T>,
}

// 所有 handler 的返回统一包装为 Json<ApiResponse<T>>
pub fn success_to_api_response<T: Serialize>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        code: 0,
        msg: "success".into(),
        resp_data: Some(data),
    })
}

pub fn error_to_api_response<T>(code: i32, msg: String) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        code,
        msg,
        resp_data: None,
    })
}

pub mod error_codes {
    pub const SUCCESS: i32 = 0;
    pub const VALIDATION_ERROR: i32 = 1000;
    pub const AUTH_FAILED: i32 = 1002;
    pub const PERMISSION_DENIED: i32 = 1003;
    pub const NOT_FOUND: i32 = 1004;
    pub const RATE_LIMIT: i32 = 1005;
    pub const SESSION_EXPIRED: i32 = 1006;
    pub const INTERNAL_ERROR: i32 = 5000;
}

#[cfg(test)]
pub(crate) fn test_config() -> Config {
    Config {
        database_url: String::new(),
        redis_url: String::new(),
        jwt_secret: "test-secret".into(),
        server_host: "::".into(),
        server_port: 3000,
        api_base_uri: "/api".into(),
        session_ttl_secs: 86400,
        auto_logout_timeout_secs: 3600,
        user_cooldown_secs: 120,
        rate_limit_policy: crate::config::RateLimitPolicy::Identity,
        ip_limit: 1000,
        ip_window_secs: 3600,
        user_limit_per_url: 5,
        user_window_secs: 60,
        otp_length: 6,
        otp_expiration_secs: 180,
        email_token_expiration_secs: 900,
        login_max_attempts: 60,
        login_block_secs: 120,
        sms_gateway_url: None,
        mail_gateway_url: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn otp_has_requested_length_and_nonzero_first_digit() {
        for _ in 0..50 {
            let code = generate_numeric_otp(6);
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
            assert_ne!(code.chars().next(), Some('0'));
        }
    }

    #[test]
    fn token_roundtrip_preserves_session_claims() {
        let config = test_config();
        let token = generate_token(42, "sess-1", &config).unwrap();
        let claims = verify_token(&token, &config).unwrap();
        assert_eq!(claims.sub, "42");
        assert_eq!(claims.sid, "sess-1");
    }

    #[test]
    fn token_with_wrong_secret_is_rejected() {
        let config = test_config();
        let mut other = test_config();
        other.jwt_secret = "different".into();
        let token = generate_token(42, "sess-1", &config).unwrap();
        assert!(verify_token(&token, &other).is_err());
    }
}
