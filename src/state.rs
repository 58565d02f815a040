//! Shared application state for all routes. Schema status is updated once the bootstrap pass ends.

use crate::error::AppError;
use crate::schema::RunStats;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use std::sync::{Arc, RwLock};

/// Outcome of the schema bootstrap as seen by the health surface.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SchemaStatus {
    Pending,
    Ready {
        stats: RunStats,
        finished_at: DateTime<Utc>,
    },
    /// Pass completed but some units failed.
    Degraded {
        stats: RunStats,
        finished_at: DateTime<Utc>,
    },
    /// Pass aborted on a critical unit.
    Failed {
        message: String,
        stats: RunStats,
        finished_at: DateTime<Utc>,
    },
}

impl SchemaStatus {
    pub fn from_stats(stats: RunStats) -> Self {
        let finished_at = Utc::now();
        if stats.is_clean() {
            SchemaStatus::Ready { stats, finished_at }
        } else {
            SchemaStatus::Degraded { stats, finished_at }
        }
    }

    /// Label for the data layer in readiness responses.
    pub fn data_layer(&self) -> &'static str {
        match self {
            SchemaStatus::Pending => "initializing",
            SchemaStatus::Ready { .. } => "connected",
            SchemaStatus::Degraded { .. } | SchemaStatus::Failed { .. } => "disconnected",
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, SchemaStatus::Ready { .. })
    }
}

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub schema: Arc<RwLock<SchemaStatus>>,
}

impl AppState {
    pub fn new(pool: PgPool) -> Self {
        AppState {
            pool,
            schema: Arc::new(RwLock::new(SchemaStatus::Pending)),
        }
    }

    pub fn schema_status(&self) -> Result<SchemaStatus, AppError> {
        let guard = self.schema.read().map_err(|_| AppError::Poisoned)?;
        Ok(guard.clone())
    }

    pub fn set_schema_status(&self, status: SchemaStatus) -> Result<(), AppError> {
        let mut guard = self.schema.write().map_err(|_| AppError::Poisoned)?;
        *guard = status;
        Ok(())
    }
}
