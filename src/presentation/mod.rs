//! Presentation Layer
//!
//! HTTP routes and the admission middleware in front of them.

pub mod http;
pub mod middleware;
