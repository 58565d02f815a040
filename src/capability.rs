//! Bootstrap task contract and capability resolution.
//!
//! A resource module exposes named bootstrap capabilities through [`TaskProvider`]. The registry
//! asks for a preferred capability, falls back to the generic `init` capability, and finally to
//! [`SkipTask`], so a module without any bootstrap step never blocks startup.

use crate::error::AppError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

/// Generic capability name tried when the preferred one is absent.
pub const GENERIC_CAPABILITY: &str = "init";

/// Message reported by [`SkipTask`].
pub const SKIPPED_MESSAGE: &str = "skipped - no task available";

/// Successful result of one bootstrap task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Completed,
    /// Nothing was done; the message says why.
    Skipped(String),
}

/// One idempotent bootstrap step. Must be safe to run on every process start.
#[async_trait]
pub trait BootstrapTask: Send + Sync {
    async fn run(&self) -> Result<TaskOutcome, AppError>;
}

pub type SharedTask = Arc<dyn BootstrapTask>;

/// Any addressable bag of named bootstrap tasks.
pub trait TaskProvider {
    fn capability(&self, name: &str) -> Option<SharedTask>;
}

impl TaskProvider for HashMap<String, SharedTask> {
    fn capability(&self, name: &str) -> Option<SharedTask> {
        self.get(name).cloned()
    }
}

/// No-op stand-in for a missing capability.
#[derive(Debug, Clone, Copy, Default)]
pub struct SkipTask;

#[async_trait]
impl BootstrapTask for SkipTask {
    async fn run(&self) -> Result<TaskOutcome, AppError> {
        Ok(TaskOutcome::Skipped(SKIPPED_MESSAGE.to_string()))
    }
}

/// First present candidate, or [`SkipTask`].
pub fn resolve_first<I>(candidates: I) -> SharedTask
where
    I: IntoIterator<Item = Option<SharedTask>>,
{
    candidates
        .into_iter()
        .flatten()
        .next()
        .unwrap_or_else(|| Arc::new(SkipTask))
}

/// Resolve `preferred` on `provider`, then the generic `init` capability, then the no-op stub.
pub fn resolve<P>(provider: &P, preferred: &str) -> SharedTask
where
    P: TaskProvider + ?Sized,
{
    resolve_first([
        provider.capability(preferred),
        provider.capability(GENERIC_CAPABILITY),
    ])
}

struct FnTask<F>(F);

#[async_trait]
impl<F, Fut> BootstrapTask for FnTask<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<TaskOutcome, AppError>> + Send,
{
    async fn run(&self) -> Result<TaskOutcome, AppError> {
        (self.0)().await
    }
}

/// Wrap an async closure as a bootstrap task.
pub fn task_fn<F, Fut>(f: F) -> SharedTask
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<TaskOutcome, AppError>> + Send + 'static,
{
    Arc::new(FnTask(f))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(label: &'static str) -> SharedTask {
        task_fn(move || async move { Ok(TaskOutcome::Skipped(label.to_string())) })
    }

    async fn label_of(task: SharedTask) -> String {
        match task.run().await.expect("task runs") {
            TaskOutcome::Skipped(label) => label,
            TaskOutcome::Completed => "completed".to_string(),
        }
    }

    #[tokio::test]
    async fn preferred_capability_wins() {
        let mut module: HashMap<String, SharedTask> = HashMap::new();
        module.insert("create_table".into(), named("preferred"));
        module.insert("init".into(), named("generic"));
        assert_eq!(label_of(resolve(&module, "create_table")).await, "preferred");
    }

    #[tokio::test]
    async fn falls_back_to_init() {
        let mut module: HashMap<String, SharedTask> = HashMap::new();
        module.insert("init".into(), named("generic"));
        assert_eq!(label_of(resolve(&module, "create_table")).await, "generic");
    }

    #[tokio::test]
    async fn missing_capability_resolves_to_skip_stub() {
        let module: HashMap<String, SharedTask> = HashMap::new();
        let outcome = resolve(&module, "create_table").run().await.expect("stub never fails");
        assert_eq!(outcome, TaskOutcome::Skipped(SKIPPED_MESSAGE.to_string()));
    }

    #[tokio::test]
    async fn resolve_first_keeps_candidate_order() {
        let task = resolve_first([None, Some(named("second")), Some(named("third"))]);
        assert_eq!(label_of(task).await, "second");
    }
}
