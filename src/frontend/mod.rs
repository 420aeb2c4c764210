//! Front-End Tooling
//!
//! The development proxy that fronts the UI origin and the bundler profile
//! it shares with the front-end build.

pub mod build;
pub mod proxy;

pub use build::FrontendBuildConfig;
pub use proxy::{DevProxy, ProxyError, ProxyTarget};
