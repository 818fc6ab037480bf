use redis::{AsyncCommands, Client as RedisClient};
use std::sync::Arc;

use crate::cache::keys::{email_token_key, login_attempts_key};

/// 登录防护与邮件令牌缓存操作
pub struct AuthCacheOperations;

impl AuthCacheOperations {
    /// 当前 IP 的连续失败次数
    pub async fn login_attempts(
        redis: &Arc<RedisClient>,
        ip: &str,
    ) -> Result<u32, redis::RedisError> {
        let mut conn = redis.get_multiplexed_async_connection().await?;
        let attempts: Option<u32> = conn.get(login_attempts_key(ip)).await?;
        Ok(attempts.unwrap_or(0))
    }

    /// 记一次失败并刷新封锁窗口
    pub async fn record_failed_login(
        redis: &Arc<RedisClient>,
        ip: &str,
        block_secs: u64,
    ) -> Result<u32, redis::RedisError> {
        let mut conn = redis.get_multiplexed_async_connection().await?;
        let key = login_attempts_key(ip);
        let attempts: u32 = conn.incr(&key, 1).await?;
        let _: () = conn.expire(&key, block_secs as i64).await?;
        Ok(attempts)
    }

    /// 登录成功后清空失败计数
    pub async fn clear_login_attempts(
        redis: &Arc<RedisClient>,
        ip: &str,
    ) -> Result<(), redis::RedisError> {
        let mut conn = redis.get_multiplexed_async_connection().await?;
        let _: () = conn.del(login_attempts_key(ip)).await?;
        Ok(())
    }

    /// 存储邮件确认令牌
    pub async fn store_email_token(
        redis: &Arc<RedisClient>,
        student_id: i64,
        token: &str,
        ttl: u64,
    ) -> Result<(), redis::RedisError> {
        let mut conn = redis.get_multiplexed_async_connection().await?;
        let _: () = conn.set_ex(email_token_key(student_id), token, ttl).await?;
        tracing::debug!("Stored email token for student {}", student_id);
        Ok(())
    }
}
