//! Leveled schema bootstrap: registry, initializer, and DDL unit tasks.

pub mod ddl;
pub mod initializer;
pub mod registry;

pub use ddl::{ensure_database_exists, ensure_schema_exists, DdlTask, Statement, TableDef};
pub use initializer::{ExecutionMode, RunOptions, RunStats, SchemaInitializer, UnitError};
pub use registry::{Level, SchemaRegistry, Unit, ValidationIssue, ValidationReport};
