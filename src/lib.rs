//! Real-estate marketplace API: leveled schema bootstrap and route registry over PostgreSQL.

pub mod bootstrap;
pub mod capability;
pub mod config;
pub mod error;
pub mod resources;
pub mod response;
pub mod routes;
pub mod schema;
pub mod state;

pub use bootstrap::{build_app, initialize_schema, StartupError};
pub use capability::{
    resolve, task_fn, BootstrapTask, SharedTask, SkipTask, TaskOutcome, TaskProvider,
};
pub use config::BootstrapConfig;
pub use error::{AppError, ConfigError, CriticalBootstrapFailure, RouteError};
pub use routes::{mount, MountResult, RouteEntry, RouteGroup, RouteRegistry};
pub use schema::{
    ExecutionMode, Level, RunOptions, RunStats, SchemaInitializer, SchemaRegistry, Unit,
    ValidationReport,
};
pub use state::{AppState, SchemaStatus};
