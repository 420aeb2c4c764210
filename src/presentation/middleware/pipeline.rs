//! Middleware Pipeline
//!
//! The admission chain as an explicit ordered list of named stages. The list
//! is derived from the deployment mode and applied to a router in one place,
//! so stage order is data rather than a side effect of `.layer()` call order.
//!
//! Request flow (outermost first):
//!
//! ```text
//! error boundary -> panic capture (stages)
//!   -> Cors -> [SecurityHeaders -> Compression -> RateLimit]  (production only)
//!   -> RequestLog -> BodyParser -> CookieParser
//!   -> request timeout -> panic capture (handlers) -> router
//! ```
//!
//! Handler panics are caught inside the stages so their 500 still carries
//! CORS and security headers. Stage panics are caught just inside the
//! boundary.

use std::fmt;
use std::time::Duration;

use axum::{middleware, Router};
use tower_http::{compression::CompressionLayer, timeout::TimeoutLayer};

use crate::config::{Environment, Settings};

use super::{
    body::parse_body,
    cookies::parse_cookies,
    cors::create_cors_layer,
    error_boundary::{create_panic_layer, error_boundary, ErrorExposure},
    logging::create_trace_layer,
    rate_limit::{rate_limit, RateLimiter},
    security::create_security_headers_layer,
};

/// Named admission stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Cors,
    SecurityHeaders,
    Compression,
    RateLimit,
    RequestLog,
    BodyParser,
    CookieParser,
}

impl Stage {
    pub fn name(self) -> &'static str {
        match self {
            Stage::Cors => "cors",
            Stage::SecurityHeaders => "security-headers",
            Stage::Compression => "compression",
            Stage::RateLimit => "rate-limit",
            Stage::RequestLog => "request-log",
            Stage::BodyParser => "body-parser",
            Stage::CookieParser => "cookie-parser",
        }
    }

    /// Stages that only run in production.
    pub fn production_only(self) -> bool {
        matches!(
            self,
            Stage::SecurityHeaders | Stage::Compression | Stage::RateLimit
        )
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Canonical order of every stage.
const STAGE_ORDER: [Stage; 7] = [
    Stage::Cors,
    Stage::SecurityHeaders,
    Stage::Compression,
    Stage::RateLimit,
    Stage::RequestLog,
    Stage::BodyParser,
    Stage::CookieParser,
];

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("stage '{0}' requires a rate limiter")]
    MissingRateLimiter(Stage),
}

/// Ordered admission chain for one deployment mode.
#[derive(Clone)]
pub struct Pipeline {
    stages: Vec<Stage>,
    settings: Settings,
    rate_limiter: Option<RateLimiter>,
}

impl Pipeline {
    /// Stages mounted for `environment`, in request order.
    pub fn stages_for(environment: Environment) -> Vec<Stage> {
        STAGE_ORDER
            .into_iter()
            .filter(|stage| environment.is_production() || !stage.production_only())
            .collect()
    }

    pub fn new(settings: Settings, rate_limiter: Option<RateLimiter>) -> Self {
        Self {
            stages: Self::stages_for(settings.environment),
            settings,
            rate_limiter,
        }
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Wrap `router` in every stage.
    ///
    /// `Router::layer` makes the last applied layer the outermost, so stages
    /// are applied innermost first.
    pub fn apply(&self, router: Router) -> Result<Router, PipelineError> {
        #[allow(deprecated)]
        let mut router = router
            .layer(create_panic_layer())
            .layer(TimeoutLayer::new(Duration::from_secs(
                self.settings.server.request_timeout_secs,
            )));

        for stage in self.stages.iter().rev() {
            router = self.apply_stage(*stage, router)?;
        }

        let exposure = ErrorExposure::from_flag(self.settings.errors.expose_details);
        Ok(router
            .layer(create_panic_layer())
            .layer(middleware::from_fn_with_state(exposure, error_boundary)))
    }

    fn apply_stage(&self, stage: Stage, router: Router) -> Result<Router, PipelineError> {
        let router = match stage {
            Stage::Cors => router.layer(create_cors_layer(
                &self.settings.cors,
                self.settings.environment,
            )),
            Stage::SecurityHeaders => router.layer(create_security_headers_layer()),
            Stage::Compression => router.layer(CompressionLayer::new()),
            Stage::RateLimit => {
                let limiter = self
                    .rate_limiter
                    .clone()
                    .ok_or(PipelineError::MissingRateLimiter(stage))?;
                router.layer(middleware::from_fn_with_state(limiter, rate_limit))
            }
            Stage::RequestLog => router.layer(create_trace_layer()),
            Stage::BodyParser => router.layer(middleware::from_fn_with_state(
                self.settings.server.body_limit_bytes,
                parse_body,
            )),
            Stage::CookieParser => router.layer(middleware::from_fn(parse_cookies)),
        };
        tracing::debug!(stage = %stage, "Middleware stage mounted");
        Ok(router)
    }
}
