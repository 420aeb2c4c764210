//! Front-end bundler profile.
//!
//! Emitted as JSON and consumed by the front-end build script, so the API and
//! the bundler agree on the proxy prefix and target.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::config::{DevProxySettings, Environment};

/// Chunk-size warning threshold, in kB.
pub const CHUNK_SIZE_WARNING_LIMIT: u32 = 1000;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FrontendBuildConfig {
    pub mode: Environment,
    pub plugins: Vec<String>,
    pub optimize_deps: OptimizeDeps,
    pub resolve: Resolve,
    pub server: DevServer,
    pub build: BuildOptions,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptimizeDeps {
    pub exclude: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resolve {
    pub alias: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DevServer {
    pub port: u16,
    pub proxy: BTreeMap<String, ProxyRule>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyRule {
    pub target: String,
    pub change_origin: bool,
    pub secure: bool,
    pub rewrite: PathRewrite,
}

/// Regex replacement applied to the request path.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PathRewrite {
    pub pattern: String,
    pub replacement: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildOptions {
    pub sourcemap: bool,
    pub rollup_options: RollupOptions,
    pub chunk_size_warning_limit: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RollupOptions {
    pub output: RollupOutput,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RollupOutput {
    pub manual_chunks: BTreeMap<String, Vec<String>>,
}

impl FrontendBuildConfig {
    pub fn for_mode(mode: Environment, proxy: &DevProxySettings) -> Self {
        let rule = ProxyRule {
            target: proxy.target.clone(),
            change_origin: true,
            secure: mode.is_production(),
            rewrite: PathRewrite {
                pattern: format!("^{}", proxy.path_prefix),
                replacement: String::new(),
            },
        };

        Self {
            mode,
            plugins: vec!["react".into()],
            optimize_deps: OptimizeDeps {
                exclude: vec!["lucide-react".into()],
            },
            resolve: Resolve {
                alias: BTreeMap::from([("@".into(), "./src".into())]),
            },
            server: DevServer {
                port: proxy.port,
                proxy: BTreeMap::from([(proxy.path_prefix.clone(), rule)]),
            },
            build: BuildOptions {
                sourcemap: !mode.is_production(),
                rollup_options: RollupOptions {
                    output: RollupOutput {
                        manual_chunks: BTreeMap::from([(
                            "vendor".into(),
                            vec!["react".into(), "react-dom".into()],
                        )]),
                    },
                },
                chunk_size_warning_limit: CHUNK_SIZE_WARNING_LIMIT,
            },
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
