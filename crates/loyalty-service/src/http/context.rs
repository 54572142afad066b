//! 从请求头构造请求上下文
//!
//! - `X-Actor-Id`: 操作人（员工）ID，由上游网关认证后注入
//! - `X-Forwarded-For` / `X-Real-IP`: 客户端 IP
//! - `User-Agent`

use axum::http::HeaderMap;

use crate::context::RequestContext;

pub const ACTOR_ID_HEADER: &str = "x-actor-id";

pub fn request_context(headers: &HeaderMap) -> RequestContext {
    RequestContext {
        actor_id: header_str(headers, ACTOR_ID_HEADER).and_then(|v| v.trim().parse().ok()),
        ip_address: client_ip(headers),
        user_agent: header_str(headers, "user-agent").map(|s| s.to_string()),
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// X-Forwarded-For 可能包含多级代理，取第一个
fn client_ip(headers: &HeaderMap) -> Option<String> {
    header_str(headers, "x-forwarded-for")
        .and_then(|s| s.split(',').next())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .or_else(|| header_str(headers, "x-real-ip").map(|s| s.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_request_context_from_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(ACTOR_ID_HEADER, HeaderValue::from_static("7"));
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("10.0.0.1, 192.168.1.1"),
        );
        headers.insert("user-agent", HeaderValue::from_static("pos-terminal/2.1"));

        let ctx = request_context(&headers);
        assert_eq!(
            ctx,
            RequestContext::for_actor(7)
                .with_ip("10.0.0.1")
                .with_user_agent("pos-terminal/2.1")
        );
    }

    #[test]
    fn test_invalid_actor_is_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(ACTOR_ID_HEADER, HeaderValue::from_static("abc"));
        headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.9"));

        let ctx = request_context(&headers);
        assert_eq!(ctx.actor_id, None);
        assert_eq!(ctx.ip_address.as_deref(), Some("10.0.0.9"));
    }
}
