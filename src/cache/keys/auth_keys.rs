/// 验证码键（按手机号）
pub fn otp_key(phone: &str) -> String {
    format!("otp_{}", phone)
}

/// 登录失败计数键（按 IP）
pub fn login_attempts_key(ip: &str) -> String {
    format!("login_attempts_{}", ip)
}

/// 邮件确认令牌键（按学生ID）
pub fn email_token_key(student_id: i64) -> String {
    format!("email_token_{}", student_id)
}
