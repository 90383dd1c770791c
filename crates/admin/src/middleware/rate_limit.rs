//! Per-IP rate limiting of the sign-in endpoint.

use std::net::IpAddr;
use std::sync::Arc;

use axum::http::Request;
use governor::clock::QuantaInstant;
use governor::middleware::NoOpMiddleware;
use tower_governor::{GovernorError, GovernorLayer, governor::GovernorConfigBuilder};

/// Keys requests by the client address the proxy reports.
///
/// The back office runs behind a single reverse proxy that sets
/// `X-Real-IP`; `X-Forwarded-For` is the fallback.
#[derive(Clone, Copy)]
pub struct ProxyIpKeyExtractor;

impl tower_governor::key_extractor::KeyExtractor for ProxyIpKeyExtractor {
    type Key = IpAddr;

    fn extract<T>(&self, req: &Request<T>) -> Result<Self::Key, GovernorError> {
        let headers = req.headers();
        headers
            .get("x-real-ip")
            .and_then(|v| v.to_str().ok())
            .or_else(|| {
                headers
                    .get("x-forwarded-for")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.split(',').next())
            })
            .and_then(|ip| ip.trim().parse().ok())
            .ok_or(GovernorError::UnableToExtractKey)
    }
}

pub type RateLimiterLayer =
    GovernorLayer<ProxyIpKeyExtractor, NoOpMiddleware<QuantaInstant>, axum::body::Body>;

/// Sign-in attempts: 5 burst, one more every 6 seconds.
#[must_use]
pub fn auth_rate_limiter() -> RateLimiterLayer {
    let config = GovernorConfigBuilder::default()
        .key_extractor(ProxyIpKeyExtractor)
        .per_second(6)
        .burst_size(5)
        .finish()
        .expect("rate limiter config uses positive constants");
    GovernorLayer::new(Arc::new(config))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tower_governor::key_extractor::KeyExtractor;

    use super::*;

    fn request(headers: &[(&str, &str)]) -> Request<()> {
        let mut builder = Request::builder().uri("/auth/session");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(()).unwrap()
    }

    #[test]
    fn test_real_ip_wins_over_forwarded_for() {
        let req = request(&[("x-forwarded-for", "10.0.0.1"), ("x-real-ip", "203.0.113.9")]);
        let key = ProxyIpKeyExtractor.extract(&req).unwrap();
        assert_eq!(key.to_string(), "203.0.113.9");
    }

    #[test]
    fn test_first_forwarded_hop() {
        let req = request(&[("x-forwarded-for", "198.51.100.4, 10.0.0.1")]);
        let key = ProxyIpKeyExtractor.extract(&req).unwrap();
        assert_eq!(key.to_string(), "198.51.100.4");
    }

    #[test]
    fn test_missing_headers_cannot_be_keyed() {
        assert!(ProxyIpKeyExtractor.extract(&request(&[])).is_err());
    }
}
