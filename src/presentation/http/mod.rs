//! HTTP Layer
//!
//! Router table, route groups and built-in handlers.

pub mod groups;
pub mod handlers;
pub mod routes;

pub use groups::{mount_plan, Endpoint, GroupKind, RouteGroup};
pub use routes::{create_router, RouteEntry, RouteTable, RouteTableError, TEST_SERVER_PATH};
