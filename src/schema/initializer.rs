//! Schema initializer: walks the registry level by level and runs every unit task.
//!
//! Default policy is best-effort: failures are recorded in [`RunStats::errors`] and the pass
//! continues. Only a critical unit failing under `stop_on_error` aborts the run.

use super::registry::{Level, SchemaRegistry, Unit};
use crate::capability::{SharedTask, TaskOutcome};
use crate::error::CriticalBootstrapFailure;
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// How units inside one level are executed. Levels are always strictly ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionMode {
    #[default]
    Sequential,
    /// Units of a level run concurrently, at most `max_concurrency` at a time, with a barrier
    /// before the next level.
    Parallel { max_concurrency: usize },
}

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub stop_on_error: bool,
    /// Only levels whose rank is listed; `None` selects all levels.
    pub level_filter: Option<BTreeSet<u32>>,
    pub execution: ExecutionMode,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnitError {
    pub unit_name: String,
    pub message: String,
}

/// Aggregate result of one pass. `succeeded + failed + skipped == total`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub errors: Vec<UnitError>,
    pub duration_ms: u64,
}

impl RunStats {
    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }
}

#[derive(Debug)]
enum UnitResult {
    Succeeded,
    Skipped(String),
    Failed(String),
}

pub struct SchemaInitializer;

impl SchemaInitializer {
    /// Run every selected level in ascending rank order.
    ///
    /// Returns `Err` only when `stop_on_error` is set and a critical unit fails.
    pub async fn run(
        registry: &SchemaRegistry,
        options: &RunOptions,
    ) -> Result<RunStats, CriticalBootstrapFailure> {
        let started = Instant::now();
        let mut stats = RunStats::default();

        let selected = registry.levels().iter().filter(|level| {
            options
                .level_filter
                .as_ref()
                .map_or(true, |ranks| ranks.contains(&level.rank))
        });

        for level in selected {
            tracing::info!(
                rank = level.rank,
                level = %level.name,
                units = level.units.len(),
                "schema level start"
            );
            let outcome = match options.execution {
                ExecutionMode::Sequential => run_sequential(level, options, &mut stats).await,
                ExecutionMode::Parallel { max_concurrency } => {
                    run_parallel(level, max_concurrency, options, &mut stats).await
                }
            };
            if let Err((unit_name, message)) = outcome {
                stats.duration_ms = elapsed_ms(started);
                tracing::error!(
                    unit = %unit_name,
                    rank = level.rank,
                    "critical schema unit failed, aborting bootstrap"
                );
                return Err(CriticalBootstrapFailure {
                    unit_name,
                    level: level.rank,
                    message,
                    stats,
                });
            }
        }

        stats.duration_ms = elapsed_ms(started);
        tracing::info!(
            total = stats.total,
            succeeded = stats.succeeded,
            failed = stats.failed,
            skipped = stats.skipped,
            duration_ms = stats.duration_ms,
            "schema bootstrap finished"
        );
        Ok(stats)
    }
}

/// Returns the failing critical unit when the run must stop.
async fn run_sequential(
    level: &Level,
    options: &RunOptions,
    stats: &mut RunStats,
) -> Result<(), (String, String)> {
    for unit in &level.units {
        let result = execute(unit.task.clone()).await;
        if let Some(abort) = record(unit, result, options, stats) {
            return Err(abort);
        }
    }
    Ok(())
}

async fn run_parallel(
    level: &Level,
    max_concurrency: usize,
    options: &RunOptions,
    stats: &mut RunStats,
) -> Result<(), (String, String)> {
    let permits = Arc::new(Semaphore::new(max_concurrency.max(1)));
    let mut set = JoinSet::new();
    for (index, unit) in level.units.iter().enumerate() {
        let task = unit.task.clone();
        let permits = permits.clone();
        set.spawn(async move {
            let _permit = permits.acquire_owned().await;
            (index, execute(task).await)
        });
    }

    let mut results: Vec<Option<UnitResult>> = level.units.iter().map(|_| None).collect();
    while let Some(joined) = set.join_next().await {
        // `execute` captures panics of the unit itself, so a join error here is a runtime shutdown.
        match joined {
            Ok((index, result)) => results[index] = Some(result),
            Err(e) => tracing::error!(error = %e, "schema unit worker lost"),
        }
    }

    let mut abort = None;
    for (unit, result) in level.units.iter().zip(results) {
        let result = result.unwrap_or_else(|| UnitResult::Failed("unit worker lost".to_string()));
        if let Some(failure) = record(unit, result, options, stats) {
            abort.get_or_insert(failure);
        }
    }
    abort.map_or(Ok(()), Err)
}

/// Runs the task on its own tokio task so a panic becomes a recorded failure.
async fn execute(task: Option<SharedTask>) -> UnitResult {
    let Some(task) = task else {
        return UnitResult::Skipped("no callable task".to_string());
    };
    match tokio::spawn(async move { task.run().await }).await {
        Ok(Ok(TaskOutcome::Completed)) => UnitResult::Succeeded,
        Ok(Ok(TaskOutcome::Skipped(message))) => UnitResult::Skipped(message),
        Ok(Err(e)) => UnitResult::Failed(e.to_string()),
        Err(join) if join.is_panic() => UnitResult::Failed(panic_message(join.into_panic())),
        Err(join) => UnitResult::Failed(join.to_string()),
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panicked: {}", s)
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panicked: {}", s)
    } else {
        "panicked".to_string()
    }
}

fn record(
    unit: &Unit,
    result: UnitResult,
    options: &RunOptions,
    stats: &mut RunStats,
) -> Option<(String, String)> {
    stats.total += 1;
    match result {
        UnitResult::Succeeded => {
            stats.succeeded += 1;
            tracing::debug!(unit = %unit.name, "schema unit ok");
            None
        }
        UnitResult::Skipped(message) => {
            stats.skipped += 1;
            tracing::debug!(unit = %unit.name, reason = %message, "schema unit skipped");
            None
        }
        UnitResult::Failed(message) => {
            stats.failed += 1;
            tracing::warn!(
                unit = %unit.name,
                critical = unit.critical,
                error = %message,
                "schema unit failed"
            );
            stats.errors.push(UnitError {
                unit_name: unit.name.clone(),
                message: message.clone(),
            });
            (unit.critical && options.stop_on_error).then(|| (unit.name.clone(), message))
        }
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
