use redis::{AsyncCommands, Client as RedisClient};
use std::sync::Arc;

/// 固定窗口计数缓存操作
pub struct CounterCacheOperations;

impl CounterCacheOperations {
    /// 原子自增并返回窗口内计数；窗口首个请求设置 TTL。
    /// 键在读写之间过期的竞态由 INCR 语义兜底：过期后自增
    /// 会把键重建为 1，随后重新设置完整窗口 TTL。
    pub async fn increment_fixed_window(
        redis: &Arc<RedisClient>,
        key: &str,
        window_secs: u64,
    ) -> Result<i64, redis::RedisError> {
        let mut conn = redis.get_multiplexed_async_connection().await?;

        let count: i64 = conn.incr(key, 1).await?;
        if count == 1 {
            let _: () = conn.expire(key, window_secs as i64).await?;
        }

        Ok(count)
    }
}
