//! Per-route middleware: API key gate and rate limiting.

use axum::extract::{ConnectInfo, Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, HeaderName, HeaderValue};
use axum::middleware::Next;
use axum::response::Response;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use tracing::{debug, warn};

use crate::error::ApiError;
use crate::rate_limiter::RateLimitResult;
use crate::state::AppState;

const RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("ratelimit-limit");
const RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("ratelimit-remaining");
const RATELIMIT_RESET: HeaderName = HeaderName::from_static("ratelimit-reset");

/// Proxy headers consulted, in order, when `trust_proxy_headers` is on.
const FORWARDED_HEADERS: &[&str] = &["x-forwarded-for", "x-real-ip", "cf-connecting-ip"];

pub async fn require_api_key(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let authorized = state.gate.authorize(
        req.headers()
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok()),
    );

    if !authorized {
        warn!(path = %req.uri().path(), "Rejected request with invalid or missing API key");
        return Err(ApiError::InvalidApiKey);
    }
    Ok(next.run(req).await)
}

pub async fn rate_limit(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let ip = client_ip(&req, state.config.server.trust_proxy_headers);

    match state.limiter.check_rate_limit(ip).await {
        RateLimitResult::Allowed {
            remaining,
            reset_after,
        } => {
            let mut response = next.run(req).await;
            let headers = response.headers_mut();
            headers.insert(RATELIMIT_LIMIT, HeaderValue::from(state.limiter.limit()));
            headers.insert(RATELIMIT_REMAINING, HeaderValue::from(remaining));
            headers.insert(RATELIMIT_RESET, HeaderValue::from(reset_after.as_secs()));
            Ok(response)
        }
        RateLimitResult::Limited { retry_after } => Err(ApiError::RateLimited { retry_after }),
    }
}

/// Client address used as the rate-limit key.
pub fn client_ip(req: &Request, trust_proxy_headers: bool) -> IpAddr {
    if trust_proxy_headers {
        if let Some(ip) = forwarded_ip(req.headers()) {
            return ip;
        }
    }

    match req.extensions().get::<ConnectInfo<SocketAddr>>() {
        Some(ConnectInfo(addr)) => addr.ip(),
        None => {
            debug!("No peer address on request; using unspecified address as rate limit key");
            IpAddr::V4(Ipv4Addr::UNSPECIFIED)
        }
    }
}

fn forwarded_ip(headers: &HeaderMap) -> Option<IpAddr> {
    FORWARDED_HEADERS.iter().find_map(|name| {
        headers
            .get(*name)?
            .to_str()
            .ok()?
            .split(',')
            .next()?
            .trim()
            .parse()
            .ok()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn request(headers: &[(&str, &str)], peer: Option<&str>) -> Request {
        let mut builder = Request::builder().uri("/send-sms");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let mut req = builder.body(Body::empty()).unwrap();
        if let Some(peer) = peer {
            req.extensions_mut()
                .insert(ConnectInfo(peer.parse::<SocketAddr>().unwrap()));
        }
        req
    }

    #[test]
    fn uses_peer_address_by_default() {
        let req = request(&[("x-forwarded-for", "203.0.113.9")], Some("10.1.2.3:5555"));
        assert_eq!(client_ip(&req, false), "10.1.2.3".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn trusts_first_forwarded_address_when_enabled() {
        let req = request(
            &[("x-forwarded-for", "203.0.113.9, 10.0.0.1")],
            Some("10.1.2.3:5555"),
        );
        assert_eq!(client_ip(&req, true), "203.0.113.9".parse::<IpAddr>().unwrap());

        let req = request(&[("x-real-ip", "198.51.100.7")], None);
        assert_eq!(client_ip(&req, true), "198.51.100.7".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn garbage_forwarded_header_falls_back_to_peer() {
        let req = request(&[("x-forwarded-for", "not-an-ip")], Some("10.1.2.3:5555"));
        assert_eq!(client_ip(&req, true), "10.1.2.3".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn missing_peer_uses_unspecified() {
        let req = request(&[], None);
        assert_eq!(client_ip(&req, false), IpAddr::V4(Ipv4Addr::UNSPECIFIED));
    }
}
