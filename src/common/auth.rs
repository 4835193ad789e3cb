//! 认证与客户端标识工具

use std::net::SocketAddr;

use axum::{body::Body, extract::ConnectInfo, http::Request};
use subtle::ConstantTimeEq;

/// 从 `Authorization: Bearer <token>` 中提取凭据
pub fn extract_api_key(request: &Request<Body>) -> Option<String> {
    request
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|v| v.trim().to_string())
}

/// 常量时间字符串比较（防止时序攻击）
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

/// 解析客户端标识
///
/// 优先取 `X-Forwarded-For` 链中的第一个地址，否则回退到直连对端地址
pub fn client_identity(forwarded_for: Option<&str>, peer: Option<SocketAddr>) -> String {
    if let Some(first) = forwarded_for
        .and_then(|chain| chain.split(',').next())
        .map(str::trim)
        .filter(|s| !s.is_empty())
    {
        return first.to_string();
    }

    peer.map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// 从请求中解析客户端标识
pub fn extract_client_identity(request: &Request<Body>) -> String {
    let forwarded = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok());
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0);
    client_identity(forwarded, peer)
}
