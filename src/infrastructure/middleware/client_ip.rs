// Best-effort client address for guest presence tracking

use axum::{
    extract::{ConnectInfo, FromRequestParts},
    http::{request::Parts, HeaderMap},
};
use std::convert::Infallible;
use std::net::SocketAddr;

/// Client IP taken from `X-Forwarded-For` (first hop), then `X-Real-IP`,
/// then the socket peer address. Falls back to `"unknown"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIp(pub String);

pub fn client_ip_from_headers(headers: &HeaderMap) -> Option<String> {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());
    if let Some(ip) = forwarded {
        return Some(ip.to_string());
    }

    headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        let ip = client_ip_from_headers(&parts.headers)
            .or_else(|| {
                parts
                    .extensions
                    .get::<ConnectInfo<SocketAddr>>()
                    .map(|ConnectInfo(addr)| addr.ip().to_string())
            })
            .unwrap_or_else(|| "unknown".to_string());

        async move { Ok(ClientIp(ip)) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderValue, Request};

    #[test]
    fn test_header_precedence() {
        let mut headers = HeaderMap::new();
        assert_eq!(client_ip_from_headers(&headers), None);

        headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.2"));
        assert_eq!(client_ip_from_headers(&headers).as_deref(), Some("10.0.0.2"));

        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.9, 10.0.0.1"));
        assert_eq!(client_ip_from_headers(&headers).as_deref(), Some("203.0.113.9"));
    }

    #[tokio::test]
    async fn test_falls_back_to_connect_info() {
        let (mut parts, _) = Request::builder().body(()).unwrap().into_parts();
        let addr: SocketAddr = "192.0.2.7:4000".parse().unwrap();
        parts.extensions.insert(ConnectInfo(addr));

        let ClientIp(ip) = ClientIp::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(ip, "192.0.2.7");
    }

    #[tokio::test]
    async fn test_unknown_without_any_source() {
        let (mut parts, _) = Request::builder().body(()).unwrap().into_parts();
        let ClientIp(ip) = ClientIp::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(ip, "unknown");
    }
}
