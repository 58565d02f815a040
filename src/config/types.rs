//! Startup configuration.

use crate::schema::{ExecutionMode, RunOptions};
use std::collections::BTreeSet;

pub const DEFAULT_DATABASE_URL: &str = "postgres://localhost/estate";
pub const DEFAULT_API_PREFIX: &str = "/api/v1";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BootstrapConfig {
    pub database_url: String,
    /// PostgreSQL schema holding the marketplace tables.
    pub db_schema: String,
    pub max_connections: u32,
    pub bind_addr: String,
    pub api_prefix: String,
    pub stop_on_error: bool,
    /// `None` runs every level.
    pub level_filter: Option<BTreeSet<u32>>,
    /// 1 runs units sequentially; more runs same-level units concurrently.
    pub schema_parallelism: usize,
    /// Serve traffic while the schema pass is still running.
    pub schema_in_background: bool,
    pub request_body_limit: usize,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        BootstrapConfig {
            database_url: DEFAULT_DATABASE_URL.into(),
            db_schema: "public".into(),
            max_connections: 5,
            bind_addr: "0.0.0.0:3000".into(),
            api_prefix: DEFAULT_API_PREFIX.into(),
            stop_on_error: false,
            level_filter: None,
            schema_parallelism: 1,
            schema_in_background: false,
            request_body_limit: 1024 * 1024,
        }
    }
}

impl BootstrapConfig {
    pub fn run_options(&self) -> RunOptions {
        let execution = if self.schema_parallelism > 1 {
            ExecutionMode::Parallel {
                max_concurrency: self.schema_parallelism,
            }
        } else {
            ExecutionMode::Sequential
        };
        RunOptions {
            stop_on_error: self.stop_on_error,
            level_filter: self.level_filter.clone(),
            execution,
        }
    }
}
