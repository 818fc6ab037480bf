use redis::{AsyncCommands, Client as RedisClient};
use std::sync::Arc;

use crate::cache::keys::otp_key;

/// 验证码缓存操作
pub struct OtpCacheOperations;

impl OtpCacheOperations {
    /// 按手机号存储验证码
    pub async fn store_otp(
        redis: &Arc<RedisClient>,
        phone: &str,
        code: &str,
        ttl: u64,
    ) -> Result<(), redis::RedisError> {
        let mut conn = redis.get_multiplexed_async_connection().await?;
        let _: () = conn.set_ex(otp_key(phone), code, ttl).await?;
        tracing::debug!("OTP stored: key={}, ttl={}", otp_key(phone), ttl);
        Ok(())
    }

    /// 取出并消费验证码（一次性）
    pub async fn take_otp(
        redis: &Arc<RedisClient>,
        phone: &str,
    ) -> Result<Option<String>, redis::RedisError> {
        let mut conn = redis.get_multiplexed_async_connection().await?;
        let key = otp_key(phone);
        let code: Option<String> = conn.get(&key).await?;
        if code.is_some() {
            let _: () = conn.del(&key).await?;
        }
        Ok(code)
    }
}
