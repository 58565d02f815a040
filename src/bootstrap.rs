//! Process startup: database, schema pass, route mounting, serve.

use crate::config::BootstrapConfig;
use crate::error::{AppError, ConfigError, CriticalBootstrapFailure, RouteError};
use crate::resources::catalog;
use crate::routes::{common_routes_with_ready, mount, MountResult};
use crate::schema::{
    ensure_database_exists, ensure_schema_exists, RunOptions, RunStats, SchemaInitializer,
    SchemaRegistry,
};
use crate::state::{AppState, SchemaStatus};
use axum::Router;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use thiserror::Error;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

#[derive(Error, Debug)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    App(#[from] AppError),
    #[error("database: {0}")]
    Db(#[from] sqlx::Error),
    #[error(transparent)]
    Critical(#[from] CriticalBootstrapFailure),
    #[error(transparent)]
    Route(#[from] RouteError),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

/// Create the database if needed, then the pool, then the table schema.
pub async fn connect(config: &BootstrapConfig) -> Result<PgPool, StartupError> {
    ensure_database_exists(&config.database_url).await?;
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await?;
    ensure_schema_exists(&pool, &config.db_schema).await?;
    Ok(pool)
}

/// Run the schema pass and publish its outcome to `state`.
///
/// Best-effort failures land in [`SchemaStatus::Degraded`]; a critical abort is recorded as
/// [`SchemaStatus::Failed`] and returned.
pub async fn initialize_schema(
    state: &AppState,
    registry: &SchemaRegistry,
    options: &RunOptions,
) -> Result<RunStats, CriticalBootstrapFailure> {
    let report = registry.validate();
    for issue in &report.issues {
        tracing::warn!(level = issue.level, unit = %issue.unit, "schema unit has no callable task");
    }

    let result = SchemaInitializer::run(registry, options).await;
    let status = match &result {
        Ok(stats) => {
            for e in &stats.errors {
                tracing::warn!(unit = %e.unit_name, error = %e.message, "schema unit left uninitialized");
            }
            SchemaStatus::from_stats(stats.clone())
        }
        Err(failure) => SchemaStatus::Failed {
            message: failure.to_string(),
            stats: failure.stats.clone(),
            finished_at: chrono::Utc::now(),
        },
    };
    if let Err(e) = state.set_schema_status(status) {
        tracing::error!(error = %e, "could not record schema status");
    }
    result
}

/// Common routes at the root, resource routes under `config.api_prefix`.
pub fn build_app(
    state: &AppState,
    config: &BootstrapConfig,
) -> Result<(Router, MountResult), RouteError> {
    let registry = catalog::route_registry(state, &config.db_schema);
    let (api, mounted) = mount(Router::new(), registry, &config.api_prefix)?;
    let app = common_routes_with_ready(state.clone()).merge(api).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(RequestBodyLimitLayer::new(config.request_body_limit)),
    );
    Ok((app, mounted))
}

/// Full startup sequence; returns when the server stops.
pub async fn run(config: BootstrapConfig) -> Result<(), StartupError> {
    let pool = connect(&config).await?;
    let state = AppState::new(pool.clone());
    let registry = catalog::schema_registry(&pool, &config.db_schema)?;
    let options = config.run_options();

    if config.schema_in_background {
        let state = state.clone();
        tokio::spawn(async move {
            if let Err(failure) = initialize_schema(&state, &registry, &options).await {
                tracing::error!(error = %failure, "schema bootstrap aborted");
            }
        });
    } else {
        initialize_schema(&state, &registry, &options).await?;
    }

    let (app, mounted) = build_app(&state, &config)?;
    tracing::info!(routes = mounted.paths.len(), prefix = %config.api_prefix, "api ready");

    let listener = TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
