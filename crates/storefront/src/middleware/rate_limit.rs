//! Rate limiting middleware using governor and `tower_governor`.
//!
//! Limiters per endpoint category:
//! - `auth_rate_limiter`: session sign-in (~10/min)
//! - `checkout_rate_limiter`: checkout steps and order submission (~30/min)
//! - `api_rate_limiter`: cart and catalog (~100/min)

use std::net::IpAddr;
use std::sync::Arc;

use axum::http::{HeaderMap, Request};
use governor::clock::QuantaInstant;
use governor::middleware::NoOpMiddleware;
use tower_governor::{GovernorError, GovernorLayer, governor::GovernorConfigBuilder};

/// Client IP headers in order of trust.
const CLIENT_IP_HEADERS: &[&str] = &["cf-connecting-ip", "x-real-ip"];

/// Key extractor for a service running behind a reverse proxy.
///
/// Tries `CF-Connecting-IP`, then `X-Real-IP`, then the first hop of
/// `X-Forwarded-For`.
#[derive(Clone, Copy)]
pub struct ProxyIpKeyExtractor;

fn client_ip(headers: &HeaderMap) -> Option<IpAddr> {
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());

    CLIENT_IP_HEADERS
        .iter()
        .find_map(|name| header(name).and_then(|s| s.trim().parse().ok()))
        .or_else(|| {
            header("x-forwarded-for")
                .and_then(|s| s.split(',').next())
                .and_then(|s| s.trim().parse().ok())
        })
}

impl tower_governor::key_extractor::KeyExtractor for ProxyIpKeyExtractor {
    type Key = IpAddr;

    fn extract<T>(&self, req: &Request<T>) -> Result<Self::Key, GovernorError> {
        client_ip(req.headers()).ok_or(GovernorError::UnableToExtractKey)
    }
}

/// Rate limiter layer type for Axum.
pub type RateLimiterLayer =
    GovernorLayer<ProxyIpKeyExtractor, NoOpMiddleware<QuantaInstant>, axum::body::Body>;

fn limiter(replenish_seconds: u64, burst: u32) -> RateLimiterLayer {
    let config = GovernorConfigBuilder::default()
        .key_extractor(ProxyIpKeyExtractor)
        .per_second(replenish_seconds)
        .burst_size(burst)
        .finish()
        .expect("rate limiter config uses positive constants");
    GovernorLayer::new(Arc::new(config))
}

/// ~10 requests per minute per IP: 1 token every 6 seconds, burst of 5.
#[must_use]
pub fn auth_rate_limiter() -> RateLimiterLayer {
    limiter(6, 5)
}

/// ~30 requests per minute per IP: 1 token every 2 seconds, burst of 20.
///
/// Postal code edits trigger lookups and quotes, so this stays below the
/// general API limit.
#[must_use]
pub fn checkout_rate_limiter() -> RateLimiterLayer {
    limiter(2, 20)
}

/// ~100 requests per minute per IP: 1 token per second, burst of 50.
#[must_use]
pub fn api_rate_limiter() -> RateLimiterLayer {
    limiter(1, 50)
}
