use std::net::SocketAddr;

use axum::http::{HeaderMap, Method, header};

use crate::config::Config;
use crate::utils::verify_token;

/// OTP 发送路径前缀，仅在该路径上尝试从请求体解析手机号
pub const OTP_SEND_PATH: &str = "/api/auth/send_otp";

/// 由限流中间件解析后注入请求扩展，下游中间件直接复用，
/// 避免重复缓冲请求体
#[derive(Debug, Clone)]
pub struct ResolvedIdentity(pub Option<String>);

/// 客户端真实 IP：取 x-forwarded-for 第一个非空项（去空白），
/// 否则退回连接地址
pub fn client_ip(headers: &HeaderMap, remote: Option<SocketAddr>) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.split(',').map(str::trim).find(|ip| !ip.is_empty()))
        .map(str::to_string)
        .unwrap_or_else(|| {
            remote
                .map(|addr| addr.ip().to_string())
                .unwrap_or_else(|| "unknown".to_string())
        })
}

/// 解析调用方身份，优先级：
/// 1. 有效令牌的已认证用户
/// 2. OTP 发送请求体里的手机号
/// 3. X-User-Key 请求头
/// 返回 None 时由调用方退回 ip_{client_ip}
pub fn resolve_identity(
    method: &Method,
    path: &str,
    headers: &HeaderMap,
    body: Option<&[u8]>,
    config: &Config,
) -> Option<String> {
    if let Some(token) = bearer_token(headers) {
        if let Ok(claims) = verify_token(token, config) {
            return Some(format!("authenticated_user_{}", claims.sub));
        }
    }

    if *method == Method::POST && path.starts_with(OTP_SEND_PATH) {
        if let Some(bytes) = body {
            match serde_json::from_slice::<serde_json::Value>(bytes) {
                Ok(data) => {
                    if let Some(phone) = data.get("phone_number").and_then(|v| v.as_str()) {
                        if !phone.is_empty() {
                            return Some(format!("unauthenticated_phone_{}", phone));
                        }
                    }
                }
                Err(e) => {
                    // 请求体损坏不中断请求，继续向下匹配
                    tracing::warn!("Failed to extract phone_number: {}", e);
                }
            }
        }
    }

    headers
        .get("x-user-key")
        .and_then(|h| h.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::{generate_token, test_config};

    fn headers(pairs: &[(&str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (k, v) in pairs {
            map.insert(
                axum::http::HeaderName::from_bytes(k.as_bytes()).unwrap(),
                v.parse().unwrap(),
            );
        }
        map
    }

    #[test]
    fn authenticated_user_wins_over_other_sources() {
        let config = test_config();
        let token = generate_token(42, "sess-1", &config).unwrap();
        let auth_value = format!("Bearer {}", token);
        let headers = headers(&[
            ("authorization", auth_value.as_str()),
            ("x-user-key", "someone@example.com"),
        ]);

        let identity = resolve_identity(
            &Method::POST,
            OTP_SEND_PATH,
            &headers,
            Some(br#"{"phone_number": "+15550100"}"#),
            &config,
        );
        assert_eq!(identity.as_deref(), Some("authenticated_user_42"));
    }

    #[test]
    fn otp_post_resolves_phone_number() {
        let config = test_config();
        let identity = resolve_identity(
            &Method::POST,
            "/api/auth/send_otp",
            &HeaderMap::new(),
            Some(br#"{"phone_number": "+15550100"}"#),
            &config,
        );
        assert_eq!(identity.as_deref(), Some("unauthenticated_phone_+15550100"));
    }

    #[test]
    fn malformed_json_falls_through_to_header() {
        let config = test_config();
        let headers = headers(&[("x-user-key", "someone@example.com")]);
        let identity = resolve_identity(
            &Method::POST,
            OTP_SEND_PATH,
            &headers,
            Some(b"{not json"),
            &config,
        );
        assert_eq!(identity.as_deref(), Some("someone@example.com"));
    }

    #[test]
    fn phone_is_ignored_outside_otp_path() {
        let config = test_config();
        let identity = resolve_identity(
            &Method::POST,
            "/api/auth/login",
            &HeaderMap::new(),
            Some(br#"{"phone_number": "+15550100"}"#),
            &config,
        );
        assert_eq!(identity, None);
    }

    #[test]
    fn no_source_resolves_to_none() {
        let config = test_config();
        let identity =
            resolve_identity(&Method::GET, "/api/dashboard/home", &HeaderMap::new(), None, &config);
        assert_eq!(identity, None);
    }

    #[test]
    fn forwarded_for_first_entry_wins() {
        let headers = headers(&[("x-forwarded-for", " 203.0.113.9 , 10.0.0.1")]);
        assert_eq!(client_ip(&headers, None), "203.0.113.9");
    }

    #[test]
    fn falls_back_to_remote_addr() {
        let remote: SocketAddr = "192.0.2.1:5000".parse().unwrap();
        assert_eq!(client_ip(&HeaderMap::new(), Some(remote)), "192.0.2.1");
    }
}
