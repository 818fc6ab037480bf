// 缓存模块
// 带TTL的键值缓存协作方（Redis），存放计数器、时间戳与会话

pub mod keys;
pub mod models;
pub mod operations;

pub use models::session::CachedSession;
pub use operations::session::SessionCacheOperations;
