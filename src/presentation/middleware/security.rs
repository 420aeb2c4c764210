//! Security Headers Middleware
//!
//! Production-only hardening headers. The default set mirrors what the
//! browser-facing storefront expects from a helmet-style configuration.

use axum::{
    body::Body,
    http::{header, HeaderName, HeaderValue, Request, Response},
};
use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};
use tower::{Layer, Service};

const DEFAULT_CSP: &str = "default-src 'self';base-uri 'self';font-src 'self' https: data:;\
form-action 'self';frame-ancestors 'self';img-src 'self' data:;object-src 'none';\
script-src 'self';script-src-attr 'none';style-src 'self' https: 'unsafe-inline';\
upgrade-insecure-requests";

/// Security headers configuration
#[derive(Clone, Debug)]
pub struct SecurityHeadersConfig {
    /// Enable HSTS header
    pub enable_hsts: bool,
    /// HSTS max-age in seconds (default: 15552000 = 180 days)
    pub hsts_max_age: u64,
    /// Include subdomains in HSTS
    pub hsts_include_subdomains: bool,
    /// Content-Security-Policy directive
    pub content_security_policy: String,
    /// Referrer-Policy value
    pub referrer_policy: String,
    /// X-Frame-Options value
    pub frame_options: String,
    /// Cross-Origin-Resource-Policy value
    pub cross_origin_resource_policy: String,
    /// Cross-Origin-Opener-Policy value
    pub cross_origin_opener_policy: String,
}

impl Default for SecurityHeadersConfig {
    fn default() -> Self {
        Self {
            enable_hsts: true,
            hsts_max_age: 15_552_000,
            hsts_include_subdomains: true,
            content_security_policy: DEFAULT_CSP.to_string(),
            referrer_policy: "no-referrer".to_string(),
            frame_options: "SAMEORIGIN".to_string(),
            cross_origin_resource_policy: "same-origin".to_string(),
            cross_origin_opener_policy: "same-origin".to_string(),
        }
    }
}

impl SecurityHeadersConfig {
    /// Resolve the configured values into concrete header pairs.
    ///
    /// Values that are not valid header values are skipped.
    fn header_pairs(&self) -> Vec<(HeaderName, HeaderValue)> {
        let mut pairs = vec![
            (header::X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff")),
            (header::X_DNS_PREFETCH_CONTROL, HeaderValue::from_static("off")),
            (HeaderName::from_static("x-download-options"), HeaderValue::from_static("noopen")),
            (
                HeaderName::from_static("x-permitted-cross-domain-policies"),
                HeaderValue::from_static("none"),
            ),
            // Disables legacy XSS auditors.
            (header::X_XSS_PROTECTION, HeaderValue::from_static("0")),
            (HeaderName::from_static("origin-agent-cluster"), HeaderValue::from_static("?1")),
        ];

        let configured = [
            (header::CONTENT_SECURITY_POLICY, &self.content_security_policy),
            (header::REFERRER_POLICY, &self.referrer_policy),
            (header::X_FRAME_OPTIONS, &self.frame_options),
            (
                HeaderName::from_static("cross-origin-resource-policy"),
                &self.cross_origin_resource_policy,
            ),
            (
                HeaderName::from_static("cross-origin-opener-policy"),
                &self.cross_origin_opener_policy,
            ),
        ];
        for (name, value) in configured {
            if let Ok(value) = HeaderValue::from_str(value) {
                pairs.push((name, value));
            }
        }

        if self.enable_hsts {
            let hsts_value = if self.hsts_include_subdomains {
                format!("max-age={}; includeSubDomains", self.hsts_max_age)
            } else {
                format!("max-age={}", self.hsts_max_age)
            };
            if let Ok(value) = HeaderValue::from_str(&hsts_value) {
                pairs.push((header::STRICT_TRANSPORT_SECURITY, value));
            }
        }

        pairs
    }
}

/// Layer that adds security headers to responses
#[derive(Clone)]
pub struct SecurityHeadersLayer {
    headers: std::sync::Arc<Vec<(HeaderName, HeaderValue)>>,
}

impl SecurityHeadersLayer {
    /// Create a new security headers layer with default configuration
    pub fn new() -> Self {
        Self::with_config(SecurityHeadersConfig::default())
    }

    /// Create a security headers layer with custom configuration
    pub fn with_config(config: SecurityHeadersConfig) -> Self {
        Self {
            headers: std::sync::Arc::new(config.header_pairs()),
        }
    }
}

impl Default for SecurityHeadersLayer {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> Layer<S> for SecurityHeadersLayer {
    type Service = SecurityHeadersMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        SecurityHeadersMiddleware {
            inner,
            headers: self.headers.clone(),
        }
    }
}

/// Middleware service that adds security headers
#[derive(Clone)]
pub struct SecurityHeadersMiddleware<S> {
    inner: S,
    headers: std::sync::Arc<Vec<(HeaderName, HeaderValue)>>,
}

impl<S> Service<Request<Body>> for SecurityHeadersMiddleware<S>
where
    S: Service<Request<Body>, Response = Response<Body>> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<Body>) -> Self::Future {
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let security_headers = self.headers.clone();

        Box::pin(async move {
            let mut response = inner.call(request).await?;
            let headers = response.headers_mut();

            headers.remove("x-powered-by");
            for (name, value) in security_headers.iter() {
                headers.insert(name.clone(), value.clone());
            }

            Ok(response)
        })
    }
}

/// Create a security headers layer with default configuration
pub fn create_security_headers_layer() -> SecurityHeadersLayer {
    SecurityHeadersLayer::new()
}
