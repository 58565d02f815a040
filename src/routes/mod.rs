//! Route registry, mounter, and the always-on common routes.

pub mod common;
pub mod mounter;
pub mod registry;

pub use common::{bootstrap_status, common_routes, common_routes_with_ready};
pub use mounter::{absolute_path, mount, MountResult};
pub use registry::{Handler, RouteEntry, RouteGroup, RouteRegistry};
