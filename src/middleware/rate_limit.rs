use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Json,
    body::{Body, to_bytes},
    extract::{ConnectInfo, State},
    http::{Method, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::cache::keys::{ip_counter_key, user_counter_key};
use crate::cache::operations::counter::CounterCacheOperations;
use crate::config::{Config, RateLimitPolicy};
use crate::middleware::identity::{OTP_SEND_PATH, ResolvedIdentity, client_ip, resolve_identity};

// OTP 请求体在中间件里的缓冲上限
const MAX_BODY_PEEK_BYTES: usize = 64 * 1024;

#[derive(Clone)]
pub struct RateLimiter {
    redis: Arc<redis::Client>,
    config: Arc<Config>,
}

impl RateLimiter {
    pub fn new(redis: Arc<redis::Client>, config: Config) -> Self {
        Self {
            redis,
            config: Arc::new(config),
        }
    }

    pub async fn check_rate_limit(
        self: Arc<Self>,
        req: Request<Body>,
        next: Next,
    ) -> Result<Response, StatusCode> {
        let (mut parts, body) = req.into_parts();
        let path = parts.uri.path().to_string();

        // 仅对 OTP 发送请求缓冲包体，用于按手机号归因
        let (body, peeked) = if parts.method == Method::POST && path.starts_with(OTP_SEND_PATH) {
            match to_bytes(body, MAX_BODY_PEEK_BYTES).await {
                Ok(bytes) => {
                    let body = Body::from(bytes.clone());
                    (body, Some(bytes))
                }
                Err(e) => {
                    tracing::warn!("Failed to buffer OTP request body: {}", e);
                    return Ok((
                        StatusCode::BAD_REQUEST,
                        Json(json!({ "error": "Malformed request body." })),
                    )
                        .into_response());
                }
            }
        } else {
            (body, None)
        };

        let remote = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ci| ci.0);
        let ip = client_ip(&parts.headers, remote);
        let identity = resolve_identity(
            &parts.method,
            &path,
            &parts.headers,
            peeked.as_deref(),
            &self.config,
        );

        let (key, ceiling, window_secs) = match self.config.rate_limit_policy {
            RateLimitPolicy::Identity => {
                let subject = identity
                    .clone()
                    .unwrap_or_else(|| format!("ip_{}", ip));
                (
                    user_counter_key(&subject, &path),
                    self.config.user_limit_per_url,
                    self.config.user_window_secs,
                )
            }
            RateLimitPolicy::Ip => (
                ip_counter_key(&ip, &path),
                self.config.ip_limit,
                self.config.ip_window_secs,
            ),
        };

        match CounterCacheOperations::increment_fixed_window(&self.redis, &key, window_secs).await
        {
            Ok(count) if over_ceiling(count, ceiling) => {
                tracing::warn!(
                    "Request blocked on path {} for key {} ({} requests in window)",
                    path,
                    key,
                    count
                );
                return Ok((
                    StatusCode::TOO_MANY_REQUESTS,
                    Json(rejection_body(self.config.rate_limit_policy, window_secs)),
                )
                    .into_response());
            }
            Ok(_) => {}
            Err(e) => {
                // 缓存不可用按无历史计数处理，放行而不是拒绝
                tracing::warn!("Rate limit counter unavailable for {}: {}", key, e);
            }
        }

        parts.extensions.insert(ResolvedIdentity(identity));
        let req = Request::from_parts(parts, body);
        Ok(next.run(req).await)
    }
}

pub async fn rate_limit(
    State(limiter): State<Arc<RateLimiter>>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    limiter.check_rate_limit(req, next).await
}

/// 自增后的计数超过上限即拒绝：上限为 N 时窗口内前 N 个请求放行
pub(crate) fn over_ceiling(count: i64, ceiling: u32) -> bool {
    count > ceiling as i64
}

pub(crate) fn rejection_body(policy: RateLimitPolicy, window_secs: u64) -> serde_json::Value {
    match policy {
        RateLimitPolicy::Identity => json!({
            "error": "Too many requests for this identity on this URL. Please try again later.",
            "retry_after_seconds": window_secs,
        }),
        RateLimitPolicy::Ip => json!({
            "error": "Too many requests from this IP on this URL. Please try again later.",
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ceiling_admits_exactly_ceiling_requests() {
        for count in 1..=5 {
            assert!(!over_ceiling(count, 5), "request {} should pass", count);
        }
        assert!(over_ceiling(6, 5));
        assert!(over_ceiling(7, 5));
    }

    #[test]
    fn identity_rejection_carries_retry_hint() {
        let body = rejection_body(RateLimitPolicy::Identity, 60);
        assert_eq!(body["retry_after_seconds"], 60);
        assert_eq!(
            body["error"],
            "Too many requests for this identity on this URL. Please try again later."
        );
    }

    #[test]
    fn ip_rejection_has_no_retry_hint() {
        let body = rejection_body(RateLimitPolicy::Ip, 3600);
        assert!(body.get("retry_after_seconds").is_none());
        assert_eq!(
            body["error"],
            "Too many requests from this IP on this URL. Please try again later."
        );
    }
}
