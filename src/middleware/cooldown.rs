use std::sync::Arc;

use axum::{
    Json,
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::cache::operations::cooldown::CooldownCacheOperations;
use crate::config::Config;
use crate::middleware::identity::ResolvedIdentity;

/// 敏感请求之间的最小间隔，按解析出的调用方身份计
#[derive(Clone)]
pub struct CooldownGate {
    redis: Arc<redis::Client>,
    config: Arc<Config>,
}

impl CooldownGate {
    pub fn new(redis: Arc<redis::Client>, config: Config) -> Self {
        Self {
            redis,
            config: Arc::new(config),
        }
    }

    pub async fn enforce(
        self: Arc<Self>,
        req: Request<Body>,
        next: Next,
    ) -> Result<Response, StatusCode> {
        // 身份由外层限流中间件注入；无法归因的请求不做冷却
        let identity = req
            .extensions()
            .get::<ResolvedIdentity>()
            .and_then(|r| r.0.clone());

        if let Some(identity) = identity {
            let (allowed, wait) = CooldownCacheOperations::check_cooldown(
                &self.redis,
                &identity,
                self.config.user_cooldown_secs,
            )
            .await;

            if !allowed {
                return Ok((
                    StatusCode::TOO_MANY_REQUESTS,
                    Json(cooldown_rejection_body(wait)),
                )
                    .into_response());
            }
        }

        Ok(next.run(req).await)
    }
}

pub async fn cooldown(
    State(gate): State<Arc<CooldownGate>>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    gate.enforce(req, next).await
}

pub(crate) fn cooldown_rejection_body(wait: u64) -> serde_json::Value {
    json!({
        "error": format!("Please wait {} seconds before making another request.", wait)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejection_message_embeds_remaining_wait() {
        let body = cooldown_rejection_body(84);
        assert_eq!(
            body["error"],
            "Please wait 84 seconds before making another request."
        );
    }
}
