use serde::{Deserialize, Serialize};

/// 会话缓存数据模型
///
/// last_activity 兼容两种历史格式：浮点 Unix 秒或 ISO-8601 字符串，
/// 解析逻辑见 middleware::auto_logout。
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CachedSession {
    pub session_id: String,
    pub user_id: i64,
    pub username: String,
    pub created_at: i64, // Unix timestamp
    pub last_activity: serde_json::Value,
}
