use redis::{AsyncCommands, Client as RedisClient};
use std::sync::Arc;

use crate::cache::keys::session_key;
use crate::cache::models::session::CachedSession;
use crate::utils::epoch_now;

/// 会话缓存操作
pub struct SessionCacheOperations;

impl SessionCacheOperations {
    /// 创建会话，last_activity 初始化为当前时间
    pub async fn create_session(
        redis: &Arc<RedisClient>,
        session_id: &str,
        user_id: i64,
        username: &str,
        ttl: u64,
    ) -> Result<CachedSession, redis::RedisError> {
        let session = CachedSession {
            session_id: session_id.to_string(),
            user_id,
            username: username.to_string(),
            created_at: chrono::Utc::now().timestamp(),
            last_activity: serde_json::Value::from(epoch_now()),
        };

        Self::store(redis, &session, ttl).await?;
        Ok(session)
    }

    /// 获取会话
    pub async fn get_session(
        redis: &Arc<RedisClient>,
        session_id: &str,
    ) -> Result<Option<CachedSession>, redis::RedisError> {
        let mut conn = redis.get_multiplexed_async_connection().await?;

        let result: Option<String> = conn.get(session_key(session_id)).await?;
        match result {
            Some(json) => {
                let session = serde_json::from_str(&json).map_err(|e| {
                    redis::RedisError::from((redis::ErrorKind::IoError, "反序列化错误", e.to_string()))
                })?;
                Ok(Some(session))
            }
            None => Ok(None),
        }
    }

    /// 销毁会话（整个键删除，不是清字段，令牌无法重放）
    pub async fn remove_session(
        redis: &Arc<RedisClient>,
        session_id: &str,
    ) -> Result<(), redis::RedisError> {
        let mut conn = redis.get_multiplexed_async_connection().await?;
        let _: () = conn.del(session_key(session_id)).await?;
        Ok(())
    }

    /// 把 last_activity 刷到当前时间；会话不存在时静默返回
    /// （可能刚被并发的自动登出销毁）
    pub async fn touch_session(
        redis: &Arc<RedisClient>,
        session_id: &str,
        ttl: u64,
    ) -> Result<(), redis::RedisError> {
        match Self::get_session(redis, session_id).await? {
            Some(mut session) => {
                session.last_activity = serde_json::Value::from(epoch_now());
                Self::store(redis, &session, ttl).await
            }
            None => Ok(()),
        }
    }

    async fn store(
        redis: &Arc<RedisClient>,
        session: &CachedSession,
        ttl: u64,
    ) -> Result<(), redis::RedisError> {
        let mut conn = redis.get_multiplexed_async_connection().await?;

        let json = serde_json::to_string(session).map_err(|e| {
            redis::RedisError::from((redis::ErrorKind::IoError, "序列化错误", e.to_string()))
        })?;
        let _: () = conn.set_ex(session_key(&session.session_id), json, ttl).await?;
        Ok(())
    }
}
