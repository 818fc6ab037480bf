use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::TypedHeader;
use axum_extra::headers::{Authorization, authorization::Bearer};

use crate::AppState;
use crate::cache::SessionCacheOperations;
use crate::utils::{error_codes, error_to_api_response, verify_token};

/// 已认证学生。作为请求扩展注入，需要记录操作者的持久化操作
/// 显式接收它作为参数，不使用任何进程级全局态
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: i64,
    pub username: String,
    pub session_id: String,
}

pub async fn auth_middleware(
    State(state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, Response> {
    let Some(TypedHeader(Authorization(bearer))) = bearer else {
        return Err(unauthorized("缺少认证令牌"));
    };

    let claims = match verify_token(bearer.token(), &state.config) {
        Ok(claims) => claims,
        Err(_) => return Err(unauthorized("认证令牌无效")),
    };

    // 令牌必须对应仍然存活的服务端会话
    let session = match SessionCacheOperations::get_session(&state.redis, &claims.sid).await {
        Ok(Some(session)) => session,
        Ok(None) => return Err(unauthorized("会话已失效，请重新登录")),
        Err(e) => {
            tracing::error!("Session lookup failed: {}", e);
            return Err(unauthorized("会话校验失败"));
        }
    };

    req.extensions_mut().insert(AuthUser {
        id: session.user_id,
        username: session.username.clone(),
        session_id: session.session_id.clone(),
    });
    req.extensions_mut().insert(session);

    Ok(next.run(req).await)
}

fn unauthorized(msg: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        error_to_api_response::<()>(error_codes::AUTH_FAILED, msg.to_string()),
    )
        .into_response()
}
