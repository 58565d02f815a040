//! Marketplace resource modules. Each module describes its table and route; the schema and
//! route registries are assembled from them in [`catalog`].

pub mod catalog;
pub mod handlers;

use crate::capability::{SharedTask, TaskProvider, GENERIC_CAPABILITY};
use crate::schema::{DdlTask, Statement, TableDef};
use sqlx::PgPool;
use std::sync::Arc;

/// Preferred schema capability of a resource module.
pub const CREATE_TABLE: &str = "create_table";

#[derive(Clone, Debug)]
pub struct ResourceModule {
    pub name: &'static str,
    pub description: &'static str,
    pub table: Option<TableDef>,
    /// Statements for modules without a table of their own (views, backfills).
    pub init: &'static [&'static str],
    /// Relative route path; `None` for modules with no HTTP surface.
    pub path: Option<&'static str>,
}

impl ResourceModule {
    /// Relation served by the read handlers: the table, or the module name for view-backed modules.
    pub fn relation(&self) -> &'static str {
        self.table.as_ref().map_or(self.name, |t| t.name)
    }

    pub fn bind<'a>(&'a self, pool: &'a PgPool, schema: &'a str) -> BoundResource<'a> {
        BoundResource {
            module: self,
            pool,
            schema,
        }
    }
}

/// A module bound to a pool and schema, exposing its bootstrap capabilities.
pub struct BoundResource<'a> {
    module: &'a ResourceModule,
    pool: &'a PgPool,
    schema: &'a str,
}

impl TaskProvider for BoundResource<'_> {
    fn capability(&self, name: &str) -> Option<SharedTask> {
        let statements = match name {
            CREATE_TABLE => self.module.table.as_ref()?.statements(self.schema),
            GENERIC_CAPABILITY if !self.module.init.is_empty() => {
                let q_schema = crate::schema::ddl::quote_ident(self.schema);
                self.module
                    .init
                    .iter()
                    .map(|s| Statement::Required(s.replace("{schema}", &q_schema)))
                    .collect()
            }
            _ => return None,
        };
        Some(Arc::new(DdlTask::new(self.pool.clone(), statements)))
    }
}
