//! Thin read handlers shared by every resource module: list with paging and read by id.

use crate::error::AppError;
use crate::response::{success_one, success_page};
use crate::resources::ResourceModule;
use crate::schema::ddl::qualified;
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::get,
    Router,
};
use serde::Deserialize;
use serde_json::Value;
use sqlx::PgPool;
use std::sync::Arc;

const DEFAULT_LIMIT: u32 = 100;
const MAX_LIMIT: u32 = 1000;

#[derive(Clone)]
pub struct ResourceState {
    pool: PgPool,
    name: &'static str,
    list_sql: Arc<str>,
    read_sql: Option<Arc<str>>,
}

impl ResourceState {
    pub fn new(pool: PgPool, schema: &str, module: &ResourceModule) -> Self {
        let relation = qualified(schema, module.relation());
        let (list_sql, read_sql): (String, Option<Arc<str>>) = if module.table.is_some() {
            (
                format!(
                    "SELECT row_to_json(t) FROM {} t ORDER BY t.id LIMIT $1 OFFSET $2",
                    relation
                ),
                Some(format!("SELECT row_to_json(t) FROM {} t WHERE t.id = $1", relation).into()),
            )
        } else {
            (
                format!("SELECT row_to_json(t) FROM {} t LIMIT $1 OFFSET $2", relation),
                None,
            )
        };
        ResourceState {
            pool,
            name: module.name,
            list_sql: list_sql.into(),
            read_sql,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl ListParams {
    /// (limit, offset) with limit defaulting to 100 and capped at 1000.
    pub fn window(&self) -> (u32, u32) {
        (
            self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT),
            self.offset.unwrap_or(0),
        )
    }
}

fn parse_id(id_str: &str) -> Result<i64, AppError> {
    id_str
        .parse()
        .map_err(|_| AppError::BadRequest(format!("invalid id: {}", id_str)))
}

async fn list(
    State(state): State<ResourceState>,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, AppError> {
    let (limit, offset) = params.window();
    tracing::debug!(sql = %state.list_sql, limit, offset, "query");
    let rows = sqlx::query_scalar::<_, Value>(&state.list_sql)
        .bind(i64::from(limit))
        .bind(i64::from(offset))
        .fetch_all(&state.pool)
        .await?;
    Ok(success_page(rows, limit, offset))
}

async fn read(
    State(state): State<ResourceState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let sql = state
        .read_sql
        .as_deref()
        .ok_or_else(|| AppError::NotFound(format!("{} has no addressable rows", state.name)))?;
    let id = parse_id(&id)?;
    tracing::debug!(sql = %sql, id, "query");
    let row = sqlx::query_scalar::<_, Value>(sql)
        .bind(id)
        .fetch_optional(&state.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("{} {}", state.name, id)))?;
    Ok(success_one(row))
}

/// `GET /` and, for table-backed modules, `GET /:id`.
pub fn resource_router(state: ResourceState) -> Router {
    let router = Router::new().route("/", get(list));
    let router = if state.read_sql.is_some() {
        router.route("/:id", get(read))
    } else {
        router
    };
    router.with_state(state)
}
