//! Fan-out of independent per-class computations.
//!
//! Reports build one task per metric group class and hand the batch to a
//! [`ClassExecutor`]. Tasks share no mutable state, so an executor may run
//! them in any order; callers sort the combined output afterwards.

use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::stream::{self, StreamExt as _, TryStreamExt as _};
use mpa_report_metric_models::Metric;

use crate::ReportError;

/// Default number of classes computed concurrently.
pub const DEFAULT_CONCURRENCY: usize = 4;

/// One unit of per-class work.
pub struct ClassTask<'a> {
    /// Class the task computes.
    pub class_id: String,
    /// The computation.
    pub run: BoxFuture<'a, Result<Vec<Metric>, ReportError>>,
}

impl<'a> ClassTask<'a> {
    #[must_use]
    pub fn new(
        class_id: impl Into<String>,
        run: BoxFuture<'a, Result<Vec<Metric>, ReportError>>,
    ) -> Self {
        Self {
            class_id: class_id.into(),
            run,
        }
    }
}

/// Runs a batch of class tasks and concatenates their metrics.
///
/// Any failing task fails the whole batch.
#[async_trait]
pub trait ClassExecutor: Send + Sync {
    /// Runs every task.
    ///
    /// # Errors
    ///
    /// Returns the first [`ReportError`] any task produced.
    async fn execute<'a>(&self, tasks: Vec<ClassTask<'a>>) -> Result<Vec<Metric>, ReportError>;
}

/// In-process executor with bounded concurrency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalExecutor {
    concurrency: usize,
}

impl LocalExecutor {
    /// Creates an executor running at most `concurrency` tasks at a time.
    /// Zero is treated as one.
    #[must_use]
    pub const fn new(concurrency: usize) -> Self {
        Self {
            concurrency: if concurrency == 0 { 1 } else { concurrency },
        }
    }
}

impl Default for LocalExecutor {
    fn default() -> Self {
        Self::new(DEFAULT_CONCURRENCY)
    }
}

async fn run_task(task: ClassTask<'_>) -> Result<Vec<Metric>, ReportError> {
    let metrics = task.run.await?;
    log::debug!("Class {}: {} metrics", task.class_id, metrics.len());
    Ok(metrics)
}

#[async_trait]
impl ClassExecutor for LocalExecutor {
    async fn execute<'a>(&self, tasks: Vec<ClassTask<'a>>) -> Result<Vec<Metric>, ReportError> {
        log::debug!(
            "Running {} class tasks (concurrency={})",
            tasks.len(),
            self.concurrency
        );

        let batches: Vec<Vec<Metric>> = stream::iter(tasks)
            .map(run_task)
            .buffer_unordered(self.concurrency)
            .try_collect()
            .await?;

        Ok(batches.into_iter().flatten().collect())
    }
}
