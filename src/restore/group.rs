//! Concurrent layer restoration
//!
//! Every restoration is its own task. Tasks are never cancelled because a
//! sibling failed: the group waits for all of them, logs each failure, and
//! reports the first one it joined.

use crate::error::{RestorerError, RestorerResult};
use std::future::Future;
use tokio::task::JoinSet;
use tracing::warn;

/// Set of in-flight restorations
#[derive(Default)]
pub struct RestoreGroup {
    tasks: JoinSet<RestorerResult<()>>,
}

impl RestoreGroup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a restoration immediately
    pub fn spawn<F>(&mut self, task: F)
    where
        F: Future<Output = RestorerResult<()>> + Send + 'static,
    {
        self.tasks.spawn(task);
    }

    /// Number of tasks not yet joined
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Join every task. Fails with the first failure observed, wrapped in
    /// [`RestorerError::RestoringData`] with a count of the others.
    pub async fn wait(self) -> RestorerResult<()> {
        let failures = self.join_all().await;
        let mut failures = failures.into_iter();
        match failures.next() {
            Some(first) => Err(RestorerError::RestoringData {
                source: Box::new(first),
                other_failures: failures.len(),
            }),
            None => Ok(()),
        }
    }

    /// Join every task, discarding the results beyond logging them
    pub async fn drain(self) {
        self.join_all().await;
    }

    async fn join_all(mut self) -> Vec<RestorerError> {
        let mut failures = Vec::new();
        while let Some(joined) = self.tasks.join_next().await {
            let result = joined
                .map_err(|e| RestorerError::TaskJoin(e.to_string()))
                .and_then(|r| r);
            if let Err(e) = result {
                warn!("Layer restoration failed: {}", e);
                failures.push(e);
            }
        }
        failures
    }
}
