/// 会话存储键
pub fn session_key(session_id: &str) -> String {
    format!("session:{}", session_id)
}
