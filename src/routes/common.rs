//! Common routes: health, readiness, version, bootstrap status.

use crate::error::AppError;
use crate::response::success_one;
use crate::state::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use serde::Serialize;

#[derive(Serialize)]
struct HealthBody {
    status: &'static str,
}

#[derive(Serialize)]
struct ReadyBody {
    status: &'static str,
    database: &'static str,
    schema: &'static str,
}

async fn health() -> Json<HealthBody> {
    Json(HealthBody { status: "ok" })
}

async fn ready(State(state): State<AppState>) -> Result<(StatusCode, Json<ReadyBody>), AppError> {
    let schema = state.schema_status()?;
    let database = if sqlx::query("SELECT 1").fetch_optional(&state.pool).await.is_ok() {
        "ok"
    } else {
        "unavailable"
    };
    let ok = database == "ok" && schema.is_ready();
    let status = if ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    Ok((
        status,
        Json(ReadyBody {
            status: if ok { "ok" } else { "degraded" },
            database,
            schema: schema.data_layer(),
        }),
    ))
}

async fn version() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Latest schema bootstrap outcome, including the per-unit error list.
pub async fn bootstrap_status(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    Ok(success_one(state.schema_status()?))
}

/// Common routes (no state): GET /health, GET /version, GET /info.
pub fn common_routes() -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/version", get(version))
        .route("/info", get(version))
}

/// Common routes including readiness with DB and schema check.
pub fn common_routes_with_ready(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready))
        .route("/version", get(version))
        .route("/info", get(version))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::RunStats;
    use crate::state::SchemaStatus;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use sqlx::postgres::PgPoolOptions;
    use std::time::Duration;
    use tower::ServiceExt;

    fn unreachable_state() -> AppState {
        let pool = PgPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(Duration::from_millis(200))
            .connect_lazy("postgres://localhost:1/estate_test")
            .unwrap();
        AppState::new(pool)
    }

    async fn get_ready(state: AppState) -> (StatusCode, serde_json::Value) {
        let resp = common_routes_with_ready(state)
            .oneshot(Request::builder().uri("/ready").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = resp.status();
        let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn health_is_always_ok() {
        let resp = common_routes()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "ok");
    }

    #[tokio::test]
    async fn version_reports_package() {
        let resp = common_routes()
            .oneshot(Request::builder().uri("/version").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["name"], "estate-api");
    }

    #[tokio::test]
    async fn ready_while_schema_pending_is_unavailable() {
        let (status, json) = get_ready(unreachable_state()).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(json["status"], "degraded");
        assert_eq!(json["schema"], "initializing");
    }

    #[tokio::test]
    async fn ready_with_failed_units_reports_disconnected() {
        let state = unreachable_state();
        let stats = RunStats {
            total: 2,
            succeeded: 1,
            failed: 1,
            ..RunStats::default()
        };
        state.set_schema_status(SchemaStatus::from_stats(stats)).unwrap();
        let (status, json) = get_ready(state).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(json["status"], "degraded");
        assert_eq!(json["schema"], "disconnected");
    }

    #[tokio::test]
    async fn ready_needs_the_database_even_after_clean_schema_pass() {
        let state = unreachable_state();
        state
            .set_schema_status(SchemaStatus::from_stats(RunStats::default()))
            .unwrap();
        let (status, json) = get_ready(state).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(json["database"], "unavailable");
        assert_eq!(json["schema"], "connected");
    }
}
