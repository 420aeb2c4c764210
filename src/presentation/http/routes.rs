//! Route Configuration
//!
//! The router table mounts route groups in a fixed order and validates the
//! combined endpoint set before anything is served. Overlapping or ambiguous
//! registrations are startup errors, never first-match-wins at request time.

use std::collections::HashMap;

use axum::{http::Method, routing::get, Router};

use super::groups::{GroupKind, RouteGroup, MOUNT_ORDER, SHARED_PREFIX};
use super::handlers;
use crate::startup::AppState;

pub const TEST_SERVER_PATH: &str = "/api/test-server";
pub const LIVENESS_PATH: &str = "/health/live";
pub const READINESS_PATH: &str = "/health/ready";

const RESERVED_PATHS: [&str; 3] = [TEST_SERVER_PATH, LIVENESS_PATH, READINESS_PATH];

/// One validated endpoint with its full path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteEntry {
    pub group: GroupKind,
    pub method: Method,
    pub path: String,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RouteTableError {
    #[error("route group '{0}' is mounted more than once")]
    DuplicateGroup(GroupKind),

    #[error("{group} route '{path}' is not a valid path")]
    InvalidPath { group: GroupKind, path: String },

    #[error("{group} route '{path}' uses unsupported method {method}")]
    UnsupportedMethod {
        group: GroupKind,
        method: Method,
        path: String,
    },

    #[error("{method} {path} is registered by both '{first}' and '{second}'")]
    Duplicate {
        method: Method,
        path: String,
        first: GroupKind,
        second: GroupKind,
    },

    #[error("{group} route '{path}' falls under {prefix}, which belongs to '{owner}'")]
    Shadowed {
        group: GroupKind,
        path: String,
        prefix: &'static str,
        owner: GroupKind,
    },

    #[error("{group} route '{path}' conflicts with '{existing}' registered by '{owner}'")]
    ParamConflict {
        group: GroupKind,
        path: String,
        existing: String,
        owner: GroupKind,
    },

    #[error("{group} route '{path}' is reserved")]
    Reserved { group: GroupKind, path: String },

    #[error("{group} route '{path}' starts with a dynamic segment that would capture dedicated prefixes")]
    DynamicSharedRoot { group: GroupKind, path: String },
}

/// The mount prefix that serves `path`: the longest prefix matching on a
/// segment boundary.
pub fn owning_prefix(path: &str) -> Option<&'static str> {
    MOUNT_ORDER
        .iter()
        .map(|kind| kind.mount_prefix())
        .filter(|prefix| {
            path == *prefix
                || path
                    .strip_prefix(prefix)
                    .is_some_and(|rest| rest.starts_with('/'))
        })
        .max_by_key(|prefix| prefix.len())
}

fn dedicated_owner(prefix: &str) -> Option<GroupKind> {
    MOUNT_ORDER
        .into_iter()
        .find(|kind| kind.has_dedicated_prefix() && kind.mount_prefix() == prefix)
}

fn join(prefix: &str, path: &str) -> String {
    if path == "/" {
        prefix.to_string()
    } else {
        format!("{prefix}{path}")
    }
}

fn is_param(segment: &str) -> bool {
    segment.starts_with('{') && segment.ends_with('}')
}

fn is_catch_all(segment: &str) -> bool {
    segment.starts_with("{*") && segment.ends_with('}')
}

fn valid_path(path: &str) -> bool {
    if !path.starts_with('/') {
        return false;
    }
    let segments: Vec<&str> = path.split('/').skip(1).collect();
    let last = segments.len() - 1;
    segments.iter().enumerate().all(|(index, segment)| {
        if segment.starts_with(':') || segment.starts_with('*') {
            return false;
        }
        if !segment.contains(['{', '}']) {
            return true;
        }
        if !is_param(segment) {
            return false;
        }
        // Catch-all only as the final segment.
        if is_catch_all(segment) && index != last {
            return false;
        }
        let name = segment[1..segment.len() - 1].trim_start_matches('*');
        !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
    })
}

/// Whether a path relative to the shared prefix opens with a parameter or
/// catch-all, which would also match `auth`, `addresses` and `admin`.
fn dynamic_root(path: &str) -> bool {
    path.split('/').nth(1).is_some_and(is_param)
}

/// Whether two paths reach the same dynamic segment under different names.
fn params_conflict(a: &str, b: &str) -> bool {
    for (x, y) in a.split('/').zip(b.split('/')) {
        match (is_param(x), is_param(y)) {
            (true, true) if x != y => return true,
            (true, true) => continue,
            (false, false) if x == y => continue,
            _ => return false,
        }
    }
    false
}

/// Ordered collection of route groups.
#[derive(Default)]
pub struct RouteTable {
    groups: Vec<RouteGroup>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_groups(groups: impl IntoIterator<Item = RouteGroup>) -> Self {
        groups.into_iter().fold(Self::new(), Self::mount)
    }

    pub fn mount(mut self, group: RouteGroup) -> Self {
        self.groups.push(group);
        self
    }

    /// Check every registration and return the flattened table in mount
    /// order.
    pub fn validate(&mut self) -> Result<Vec<RouteEntry>, RouteTableError> {
        self.groups.sort_by_key(|group| {
            MOUNT_ORDER
                .iter()
                .position(|kind| *kind == group.kind())
                .unwrap_or(MOUNT_ORDER.len())
        });

        let mut entries: Vec<RouteEntry> = Vec::new();
        let mut seen: HashMap<(Method, String), GroupKind> = HashMap::new();
        let mut paths: Vec<(String, GroupKind)> = Vec::new();

        for (index, group) in self.groups.iter().enumerate() {
            let kind = group.kind();
            if self.groups[..index].iter().any(|g| g.kind() == kind) {
                return Err(RouteTableError::DuplicateGroup(kind));
            }

            for pending in &group.routes {
                let endpoint = &pending.endpoint;
                if !valid_path(&endpoint.path) {
                    return Err(RouteTableError::InvalidPath {
                        group: kind,
                        path: endpoint.path.clone(),
                    });
                }
                let path = join(kind.mount_prefix(), &endpoint.path);

                if pending.filter.is_none() {
                    return Err(RouteTableError::UnsupportedMethod {
                        group: kind,
                        method: endpoint.method.clone(),
                        path,
                    });
                }

                if RESERVED_PATHS.contains(&path.as_str()) {
                    return Err(RouteTableError::Reserved { group: kind, path });
                }

                if !kind.has_dedicated_prefix() && dynamic_root(&endpoint.path) {
                    return Err(RouteTableError::DynamicSharedRoot { group: kind, path });
                }

                if !kind.has_dedicated_prefix() {
                    if let Some(prefix) = owning_prefix(&path).filter(|p| *p != SHARED_PREFIX) {
                        if let Some(owner) = dedicated_owner(prefix) {
                            return Err(RouteTableError::Shadowed {
                                group: kind,
                                path,
                                prefix,
                                owner,
                            });
                        }
                    }
                }

                let key = (endpoint.method.clone(), path.clone());
                if let Some(first) = seen.get(&key) {
                    return Err(RouteTableError::Duplicate {
                        method: endpoint.method.clone(),
                        path,
                        first: *first,
                        second: kind,
                    });
                }

                if let Some((existing, owner)) =
                    paths.iter().find(|(p, _)| params_conflict(p, &path))
                {
                    return Err(RouteTableError::ParamConflict {
                        group: kind,
                        path,
                        existing: existing.clone(),
                        owner: *owner,
                    });
                }

                seen.insert(key, kind);
                if !paths.iter().any(|(p, _)| *p == path) {
                    paths.push((path.clone(), kind));
                }
                entries.push(RouteEntry {
                    group: kind,
                    method: endpoint.method.clone(),
                    path,
                });
            }
        }

        Ok(entries)
    }

    /// Validate and assemble the group routers.
    pub fn build(mut self) -> Result<(Router<AppState>, Vec<RouteEntry>), RouteTableError> {
        let entries = self.validate()?;

        let mut router = Router::new();
        for group in self.groups {
            let prefix = group.kind().mount_prefix();
            for pending in group.routes {
                let path = join(prefix, &pending.endpoint.path);
                router = router.route(&path, pending.method_router);
            }
        }

        Ok((router, entries))
    }
}

/// Create the main API router
pub fn create_router(state: AppState, table: RouteTable) -> Result<Router, RouteTableError> {
    let (groups, entries) = table.build()?;

    for entry in &entries {
        tracing::info!(
            group = %entry.group,
            method = %entry.method,
            path = %entry.path,
            "Route registered"
        );
    }
    tracing::info!(
        routes = entries.len(),
        test_server = TEST_SERVER_PATH,
        "Router table built"
    );

    Ok(Router::new()
        .route(TEST_SERVER_PATH, get(handlers::health::test_server))
        .route(LIVENESS_PATH, get(handlers::health::liveness))
        .route(READINESS_PATH, get(handlers::health::readiness))
        .merge(groups)
        .fallback(handlers::not_found)
        .with_state(state))
}
