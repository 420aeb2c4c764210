//! Infrastructure Layer
//!
//! Contains implementations for external services:
//! - Document store connection (PostgreSQL)
//! - Rate-limit counter stores (in-memory, Redis)

pub mod database;
pub mod rate_limit;
