use std::env;
use std::str::FromStr;
use std::time::Duration;

/// 限流策略：identity 按解析出的调用方身份+路径计数（默认），
/// ip 为按 IP+路径计数的旧版行为
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
pub enum RateLimitPolicy {
    Identity,
    Ip,
}

impl FromStr for RateLimitPolicy {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "identity" => Ok(RateLimitPolicy::Identity),
            "ip" => Ok(RateLimitPolicy::Ip),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    pub jwt_secret: String,
    pub server_host: String,
    pub server_port: u16,
    pub api_base_uri: String,
    pub session_ttl_secs: u64,
    pub auto_logout_timeout_secs: u64,
    pub user_cooldown_secs: u64,
    pub rate_limit_policy: RateLimitPolicy,
    pub ip_limit: u32,
    pub ip_window_secs: u64,
    pub user_limit_per_url: u32,
    pub user_window_secs: u64,
    pub otp_length: usize,
    pub otp_expiration_secs: u64,
    pub email_token_expiration_secs: u64,
    pub login_max_attempts: u32,
    pub login_block_secs: u64,
    pub sms_gateway_url: Option<String>,
    pub mail_gateway_url: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, env::VarError> {
        dotenv::dotenv().ok();

        Ok(Config {
            database_url: env::var("DATABASE_URL")?,
            redis_url: env::var("REDIS_URL")?,
            jwt_secret: env::var("JWT_SECRET")?,
            server_host: env_or("SERVER_HOST", "::".to_string()),
            server_port: env_or("SERVER_PORT", 3000),
            api_base_uri: env::var("API_BASE_URI").unwrap_or_else(|_| "/api".to_string()),
            session_ttl_secs: env_or("SESSION_TTL", 86400),
            auto_logout_timeout_secs: env_or("AUTO_LOGOUT_TIMEOUT", 3600),
            user_cooldown_secs: env_or("USER_LIMIT_COOLDOWN", 120),
            rate_limit_policy: env_or("RATE_LIMIT_POLICY", RateLimitPolicy::Identity),
            ip_limit: env_or("IP_LIMIT", 1000),
            ip_window_secs: env_or("IP_WINDOW_SECONDS", 3600),
            user_limit_per_url: env_or("USER_LIMIT_PER_URL", 5),
            user_window_secs: env_or("TIME_WINDOW_SECONDS", 60),
            otp_length: env_or("OTP_LENGTH", 6),
            otp_expiration_secs: env_or("OTP_EXPIRATION", 180),
            email_token_expiration_secs: env_or("EMAIL_VERIFICATION_TOKEN_EXPIRATION", 900),
            login_max_attempts: env_or("LOGIN_MAX_ATTEMPTS", 60),
            login_block_secs: env_or("LOGIN_BLOCK_DURATION", 120),
            sms_gateway_url: env::var("SMS_GATEWAY_URL").ok(),
            mail_gateway_url: env::var("MAIL_GATEWAY_URL").ok(),
        })
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }

    pub fn auto_logout_timeout(&self) -> Duration {
        Duration::from_secs(self.auto_logout_timeout_secs)
    }

    pub fn user_cooldown(&self) -> Duration {
        Duration::from_secs(self.user_cooldown_secs)
    }

    pub fn ip_window(&self) -> Duration {
        Duration::from_secs(self.ip_window_secs)
    }

    pub fn user_window(&self) -> Duration {
        Duration::from_secs(self.user_window_secs)
    }
}

// 未设置或无法解析时回退到默认值
fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limit_policy_parses_known_values() {
        assert_eq!("identity".parse(), Ok(RateLimitPolicy::Identity));
        assert_eq!("IP".parse(), Ok(RateLimitPolicy::Ip));
        assert!("token-bucket".parse::<RateLimitPolicy>().is_err());
    }

    #[test]
    fn env_or_falls_back_on_missing_key() {
        assert_eq!(env_or("CLASSROOM_TEST_UNSET_KEY", 42u32), 42);
    }
}
