use redis::{AsyncCommands, Client as RedisClient};
use std::sync::Arc;

use crate::cache::keys::user_cooldown_key;
use crate::utils::epoch_now;

/// 冷却时间戳缓存操作
pub struct CooldownCacheOperations;

impl CooldownCacheOperations {
    /// 检查指定身份的冷却状态并在放行时记录本次时间戳。
    /// 返回 (是否放行, 剩余等待秒数)。缓存不可用视为无历史记录，
    /// 向放行方向失败。
    pub async fn check_cooldown(
        redis: &Arc<RedisClient>,
        identity: &str,
        period_secs: u64,
    ) -> (bool, u64) {
        let key = user_cooldown_key(identity);
        let now = epoch_now();

        match Self::last_request_at(redis, &key).await {
            Ok(last) => {
                let (allowed, wait) = cooldown_decision(last, now, period_secs);
                if !allowed {
                    return (false, wait);
                }
            }
            Err(e) => {
                tracing::warn!("Cooldown lookup unavailable for {}: {}", identity, e);
            }
        }

        if let Err(e) = Self::record_request(redis, &key, now, period_secs).await {
            tracing::warn!("Failed to record cooldown timestamp for {}: {}", identity, e);
        }

        (true, 0)
    }

    async fn last_request_at(
        redis: &Arc<RedisClient>,
        key: &str,
    ) -> Result<Option<f64>, redis::RedisError> {
        let mut conn = redis.get_multiplexed_async_connection().await?;
        let last: Option<f64> = conn.get(key).await?;
        Ok(last)
    }

    async fn record_request(
        redis: &Arc<RedisClient>,
        key: &str,
        now: f64,
        period_secs: u64,
    ) -> Result<(), redis::RedisError> {
        let mut conn = redis.get_multiplexed_async_connection().await?;
        let _: () = conn.set_ex(key, now, period_secs).await?;
        Ok(())
    }
}

/// 纯决策逻辑：距上次请求不足冷却周期则拒绝，
/// 剩余等待时间向下取整为整数秒
pub(crate) fn cooldown_decision(last: Option<f64>, now: f64, period_secs: u64) -> (bool, u64) {
    if let Some(last) = last {
        let elapsed = now - last;
        if elapsed < period_secs as f64 {
            let wait = (period_secs as f64 - elapsed).floor().max(0.0) as u64;
            return (false, wait);
        }
    }
    (true, 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_request_is_allowed() {
        assert_eq!(cooldown_decision(None, 1000.0, 120), (true, 0));
    }

    #[test]
    fn request_inside_cooldown_reports_remaining_wait() {
        // 35.5 秒前请求过，冷却 120 秒：还需等 floor(84.5) = 84 秒
        let (allowed, wait) = cooldown_decision(Some(1000.0), 1035.5, 120);
        assert!(!allowed);
        assert_eq!(wait, 84);
    }

    #[test]
    fn request_after_cooldown_is_allowed() {
        assert_eq!(cooldown_decision(Some(1000.0), 1120.0, 120), (true, 0));
        assert_eq!(cooldown_decision(Some(1000.0), 1500.0, 120), (true, 0));
    }

    #[test]
    fn wait_never_goes_negative() {
        let (_, wait) = cooldown_decision(Some(1000.0), 1119.999, 120);
        assert!(wait <= 120);
    }
}
