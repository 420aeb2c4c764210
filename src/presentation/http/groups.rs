//! Route Groups
//!
//! A route group is a collection of endpoints owned by one business area and
//! mounted under a common path prefix. Handlers live outside this crate; they
//! register on a [`RouteGroup`] and hand it to the router table.

use std::fmt;

use axum::{
    handler::Handler,
    http::Method,
    routing::{on, MethodFilter, MethodRouter},
};

use crate::startup::AppState;

/// Business area owning a route group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GroupKind {
    Auth,
    User,
    Order,
    Address,
    Product,
    Admin,
    Return,
}

/// Registration order of the mount table.
pub const MOUNT_ORDER: [GroupKind; 7] = [
    GroupKind::Auth,
    GroupKind::User,
    GroupKind::Order,
    GroupKind::Address,
    GroupKind::Product,
    GroupKind::Admin,
    GroupKind::Return,
];

/// Prefix shared by the user, order, product and return groups.
pub const SHARED_PREFIX: &str = "/api";

impl GroupKind {
    pub fn name(self) -> &'static str {
        match self {
            GroupKind::Auth => "auth",
            GroupKind::User => "user",
            GroupKind::Order => "order",
            GroupKind::Address => "address",
            GroupKind::Product => "product",
            GroupKind::Admin => "admin",
            GroupKind::Return => "return",
        }
    }

    pub fn mount_prefix(self) -> &'static str {
        match self {
            GroupKind::Auth => "/api/auth",
            GroupKind::Address => "/api/addresses",
            GroupKind::Admin => "/api/admin",
            GroupKind::User | GroupKind::Order | GroupKind::Product | GroupKind::Return => {
                SHARED_PREFIX
            }
        }
    }

    /// Whether this group is the only one mounted at its prefix.
    pub fn has_dedicated_prefix(self) -> bool {
        self.mount_prefix() != SHARED_PREFIX
    }
}

impl fmt::Display for GroupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One declared endpoint, path relative to the group's mount prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub method: Method,
    pub path: String,
}

pub(crate) struct PendingRoute {
    pub endpoint: Endpoint,
    pub filter: Option<MethodFilter>,
    pub method_router: MethodRouter<AppState>,
}

/// Endpoints of one group, collected before the table validates them.
pub struct RouteGroup {
    kind: GroupKind,
    pub(crate) routes: Vec<PendingRoute>,
}

impl RouteGroup {
    pub fn new(kind: GroupKind) -> Self {
        Self {
            kind,
            routes: Vec::new(),
        }
    }

    pub fn kind(&self) -> GroupKind {
        self.kind
    }

    /// Declare `method path` served by `handler`. `path` is relative to the
    /// group prefix; `/` means the prefix itself.
    pub fn route<H, T>(mut self, method: Method, path: &str, handler: H) -> Self
    where
        H: Handler<T, AppState>,
        T: 'static,
    {
        let filter = MethodFilter::try_from(method.clone()).ok();
        // Unsupported methods are reported by the table; the placeholder
        // filter is never mounted.
        let method_router = on(filter.unwrap_or(MethodFilter::GET), handler);
        self.routes.push(PendingRoute {
            endpoint: Endpoint {
                method,
                path: path.to_string(),
            },
            filter,
            method_router,
        });
        self
    }

    pub fn endpoints(&self) -> impl Iterator<Item = &Endpoint> {
        self.routes.iter().map(|r| &r.endpoint)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

/// One empty group per business area, in mount order. Handler modules
/// register their endpoints on these before the router table is built.
pub fn mount_plan() -> Vec<RouteGroup> {
    MOUNT_ORDER.into_iter().map(RouteGroup::new).collect()
}
