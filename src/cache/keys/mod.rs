/// 缓存键模块
/// 提供各类缓存键生成函数

// 限流与冷却键
pub mod throttle_keys;

// 会话键
pub mod session_keys;

// 认证相关键（验证码、登录尝试、邮件令牌）
pub mod auth_keys;

pub use auth_keys::{email_token_key, login_attempts_key, otp_key};
pub use session_keys::session_key;
pub use throttle_keys::{ip_counter_key, user_cooldown_key, user_counter_key};
