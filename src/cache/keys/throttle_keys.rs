/// 按 IP+路径 的固定窗口计数键（旧版策略）
pub fn ip_counter_key(ip: &str, path: &str) -> String {
    format!("ip_counter_{}_{}", ip, path)
}

/// 按 身份+路径 的固定窗口计数键（默认策略）
pub fn user_counter_key(identity: &str, path: &str) -> String {
    format!("user_counter_{}_{}", identity, path)
}

/// 单用户冷却时间戳键
pub fn user_cooldown_key(identity: &str) -> String {
    format!("user_cooldown_{}", identity)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_embed_identity_and_path() {
        assert_eq!(
            user_counter_key("authenticated_user_42", "/api/x"),
            "user_counter_authenticated_user_42_/api/x"
        );
        assert_eq!(user_cooldown_key("unauthenticated_phone_+15550100"),
            "user_cooldown_unauthenticated_phone_+15550100");
    }
}
