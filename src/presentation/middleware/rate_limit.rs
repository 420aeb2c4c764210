//! Rate Limiting Middleware
//!
//! Per-client-IP limit over a rolling window. Mounted only in production.
//! Rejected requests are answered here with 429 and never reach later stages.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::config::RateLimitSettings;
use crate::infrastructure::rate_limit::{
    RateLimitDecision, RateLimitPolicy, RateLimitStore,
};

pub const RATE_LIMIT_MESSAGE: &str = "Too many requests, please try again later.";

/// Rate limiter shared by every request: a store plus the policy applied to
/// each client key.
#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn RateLimitStore>,
    policy: RateLimitPolicy,
    trust_proxy: bool,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn RateLimitStore>, policy: RateLimitPolicy, trust_proxy: bool) -> Self {
        Self {
            store,
            policy,
            trust_proxy,
        }
    }

    pub fn from_settings(store: Arc<dyn RateLimitStore>, settings: &RateLimitSettings) -> Self {
        Self::new(
            store,
            RateLimitPolicy::new(settings.max_requests, Duration::from_secs(settings.window_secs)),
            settings.trust_proxy,
        )
    }

    pub fn policy(&self) -> &RateLimitPolicy {
        &self.policy
    }

    /// Record one request for `identifier`.
    ///
    /// Store failures admit the request: an unavailable counter store must not
    /// take the API down with it.
    pub async fn check(&self, identifier: &str) -> RateLimitDecision {
        match self.store.hit(identifier, &self.policy).await {
            Ok(decision) => decision,
            Err(e) => {
                tracing::error!(error = %e, identifier, "Rate limit store failed, admitting request");
                RateLimitDecision {
                    allowed: true,
                    limit: self.policy.max_requests,
                    remaining: self.policy.max_requests,
                    reset_after: self.policy.window,
                }
            }
        }
    }
}

#[derive(Debug, Serialize)]
struct RateLimitExceededResponse {
    message: &'static str,
    retry_after: u64,
}

/// Extract the rate limit identifier from a request.
///
/// Forwarding headers are honoured only when `trust_proxy` is set; otherwise
/// any client could pick its own key.
fn extract_identifier(headers: &HeaderMap, client_ip: Option<IpAddr>, trust_proxy: bool) -> String {
    if trust_proxy {
        // First IP in the chain is the original client.
        let forwarded = headers
            .get("x-forwarded-for")
            .and_then(|h| h.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim);

        let real_ip = headers.get("x-real-ip").and_then(|h| h.to_str().ok());

        for candidate in [forwarded, real_ip].into_iter().flatten() {
            if let Ok(ip) = candidate.parse::<IpAddr>() {
                return format!("ip:{}", ip);
            }
        }
    }

    match client_ip {
        Some(ip) => format!("ip:{}", ip),
        None => {
            tracing::warn!("Could not determine client identifier for rate limiting");
            "ip:unknown".to_string()
        }
    }
}

/// Rate limiting middleware.
pub async fn rate_limit(
    State(limiter): State<RateLimiter>,
    request: Request,
    next: Next,
) -> Response {
    let client_ip = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0.ip());
    let identifier = extract_identifier(request.headers(), client_ip, limiter.trust_proxy);

    let decision = limiter.check(&identifier).await;
    if decision.allowed {
        let mut response = next.run(request).await;
        add_rate_limit_headers(response.headers_mut(), &decision);
        response
    } else {
        tracing::warn!(
            identifier = %identifier,
            method = %request.method(),
            path = %request.uri().path(),
            "Rate limit exceeded"
        );
        create_rate_limit_response(&decision)
    }
}

/// Add rate limit headers to a response.
fn add_rate_limit_headers(headers: &mut HeaderMap, decision: &RateLimitDecision) {
    let reset_at = chrono::Utc::now().timestamp() + decision.retry_after_secs() as i64;

    headers.insert("x-ratelimit-limit", HeaderValue::from(decision.limit));
    headers.insert("x-ratelimit-remaining", HeaderValue::from(decision.remaining));
    headers.insert("x-ratelimit-reset", HeaderValue::from(reset_at));
}

/// Create a 429 Too Many Requests response.
fn create_rate_limit_response(decision: &RateLimitDecision) -> Response {
    let retry_after = decision.retry_after_secs();
    let body = RateLimitExceededResponse {
        message: RATE_LIMIT_MESSAGE,
        retry_after,
    };

    let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
    let headers = response.headers_mut();
    headers.insert(header::RETRY_AFTER, HeaderValue::from(retry_after));
    add_rate_limit_headers(headers, decision);
    response
}
