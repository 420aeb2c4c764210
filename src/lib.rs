//! # Storefront API
//!
//! Request admission and routing for the storefront backend:
//! - Document store connection (fatal when unavailable)
//! - Ordered middleware pipeline (CORS, security headers, compression, rate
//!   limiting, request logging, body and cookie parsing)
//! - Router table that mounts the business route groups
//! - Error boundary producing uniform 500 responses
//! - Front-end development proxy and build configuration
//!
//! ## Module Structure
//!
//! ```text
//! storefront_api/
//! +-- config/         Configuration management
//! +-- infrastructure/ Database pool and rate-limit stores
//! +-- presentation/   Router table, handlers and middleware
//! +-- frontend/       Dev proxy and front-end build config
//! +-- shared/         Common error types
//! ```

// Configuration module
pub mod config;

// Infrastructure layer - External implementations
pub mod infrastructure;

// Presentation layer - HTTP routing and admission middleware
pub mod presentation;

// Front-end tooling
pub mod frontend;

// Shared utilities
pub mod shared;

// Application startup and state management
pub mod startup;

// Telemetry and observability
pub mod telemetry;
