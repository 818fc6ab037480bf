use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, NaiveDateTime, Utc};

use crate::AppState;
use crate::cache::{CachedSession, SessionCacheOperations};
use crate::middleware::auth::AuthUser;
use crate::utils::{error_codes, error_to_api_response};

// 查询剩余时间不算用户活动，否则轮询会把会话一直续活
const REMAINING_PATH_SUFFIX: &str = "/auth/session/remaining";

/// 自动登出检查：超过配置的不活动时长即销毁会话并拦截请求，
/// 否则把活动时间刷到当前。任何内部错误都不会让请求失败。
pub async fn auto_logout(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let Some(session) = req.extensions().get::<CachedSession>().cloned() else {
        // 未认证请求不在此处理
        return Ok(next.run(req).await);
    };

    let timeout = state.config.auto_logout_timeout_secs;
    let now = Utc::now();
    let parsed = parse_last_activity(&session.last_activity);

    match parsed {
        Some(last) => {
            let elapsed = (now - last).num_milliseconds() as f64 / 1000.0;
            if elapsed > timeout as f64 {
                let username = req
                    .extensions()
                    .get::<AuthUser>()
                    .map(|u| u.username.clone())
                    .unwrap_or_else(|| "unknown".to_string());
                tracing::info!(
                    "Auto logout user {} ({}) after {:.0} seconds of inactivity",
                    session.user_id,
                    username,
                    elapsed
                );

                if let Err(e) =
                    SessionCacheOperations::remove_session(&state.redis, &session.session_id).await
                {
                    tracing::error!(
                        "Failed to invalidate session {}: {}",
                        session.session_id,
                        e
                    );
                }

                // 会话已销毁，handler 不再执行
                return Ok(session_expired());
            }
        }
        None => {
            // 时间戳损坏按首次活动处理，重置而不是报错
            tracing::warn!(
                "Error parsing last_activity for user {}, resetting to now",
                session.user_id
            );
        }
    }

    let skip_refresh = parsed.is_some() && req.uri().path().ends_with(REMAINING_PATH_SUFFIX);
    if !skip_refresh {
        if let Err(e) = SessionCacheOperations::touch_session(
            &state.redis,
            &session.session_id,
            state.config.session_ttl_secs,
        )
        .await
        {
            tracing::error!(
                "Unexpected error refreshing activity for session {}: {}",
                session.session_id,
                e
            );
        }
    }

    Ok(next.run(req).await)
}

fn session_expired() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        error_to_api_response::<()>(
            error_codes::SESSION_EXPIRED,
            "会话因长时间未活动已退出，请重新登录".to_string(),
        ),
    )
        .into_response()
}

/// 解析会话中的活动时间戳。两种历史格式：
/// 浮点 Unix 秒，或 ISO-8601 字符串（带或不带时区）。
pub(crate) fn parse_last_activity(value: &serde_json::Value) -> Option<DateTime<Utc>> {
    match value {
        serde_json::Value::Number(n) => {
            let secs = n.as_f64()?;
            DateTime::from_timestamp_millis((secs * 1000.0) as i64)
        }
        serde_json::Value::String(s) => {
            if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                return Some(dt.with_timezone(&Utc));
            }
            // 无时区的旧格式按 UTC 处理
            NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|n| n.and_utc())
        }
        _ => None,
    }
}

/// 距自动登出还剩多少秒，下限为 0；时间戳不可解析时返回整个超时时长
pub(crate) fn remaining_seconds(
    last_activity: &serde_json::Value,
    now: DateTime<Utc>,
    timeout_secs: u64,
) -> u64 {
    match parse_last_activity(last_activity) {
        Some(last) => {
            let elapsed = (now - last).num_milliseconds() as f64 / 1000.0;
            (timeout_secs as f64 - elapsed).max(0.0) as u64
        }
        None => timeout_secs,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    #[test]
    fn parses_numeric_epoch() {
        let parsed = parse_last_activity(&json!(1_700_000_000.5)).unwrap();
        assert_eq!(parsed.timestamp(), 1_700_000_000);
    }

    #[test]
    fn parses_rfc3339_string() {
        let parsed = parse_last_activity(&json!("2026-01-01T00:00:00Z")).unwrap();
        assert_eq!(parsed.timestamp(), 1_767_225_600);
    }

    #[test]
    fn parses_naive_iso_string_as_utc() {
        let parsed = parse_last_activity(&json!("2026-01-01T00:00:00.250")).unwrap();
        assert_eq!(parsed.timestamp(), 1_767_225_600);
    }

    #[test]
    fn garbage_timestamp_yields_none() {
        assert_eq!(parse_last_activity(&json!("not a date")), None);
        assert_eq!(parse_last_activity(&Value::Bool(true)), None);
        assert_eq!(parse_last_activity(&Value::Null), None);
    }

    #[test]
    fn stale_session_is_detected() {
        let last = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let now = DateTime::from_timestamp(1_700_003_700, 0).unwrap();
        let elapsed = (now - last).num_milliseconds() as f64 / 1000.0;
        assert!(elapsed > 3600.0);
    }

    #[test]
    fn remaining_time_counts_down_and_clamps() {
        let now = DateTime::from_timestamp(1_700_000_100, 0).unwrap();
        let last = json!(1_700_000_000.0);
        assert_eq!(remaining_seconds(&last, now, 3600), 3500);

        let long_ago = json!(1_699_000_000.0);
        assert_eq!(remaining_seconds(&long_ago, now, 3600), 0);
    }

    #[test]
    fn remaining_time_defaults_to_full_timeout_on_parse_failure() {
        let now = DateTime::from_timestamp(1_700_000_100, 0).unwrap();
        assert_eq!(remaining_seconds(&json!("garbage"), now, 3600), 3600);
    }
}
