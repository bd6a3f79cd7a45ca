//! Database access
//!
//! The loader talks to its backing store through [`PolicyStore`]. The
//! Postgres implementation lives in [`service`]; tests substitute an
//! in-memory store with the same transactional behaviour.

pub mod queries;
pub mod service;

use crate::config::RetryConfig;
use crate::error::{StoreError, StoreResult};
use crate::policy::{PolicyRecord, UpsertedPolicy};
use crate::report::{LoadEvent, ProgressReporter};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::future::Future;

pub use service::PgPolicyStore;

/// Aggregate counts over the policies table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub total: i64,
    pub active: i64,
    pub inactive: i64,
    pub last_updated: Option<DateTime<Utc>>,
}

/// Statistics as seen by the orchestrator; a failed query degrades to `Unavailable`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum StatsReport {
    Available(StoreStats),
    Unavailable { error: String },
}

impl From<StoreResult<StoreStats>> for StatsReport {
    fn from(result: StoreResult<StoreStats>) -> Self {
        match result {
            Ok(stats) => StatsReport::Available(stats),
            Err(e) => StatsReport::Unavailable {
                error: e.to_string(),
            },
        }
    }
}

/// Transactional access to the policies table.
///
/// A run uses one store exclusively: `begin`, a savepoint around every
/// upsert, then a single `commit` (or `rollback`).
#[async_trait]
pub trait PolicyStore: Send {
    /// Read-only statistics over the policies table
    async fn stats(&mut self) -> StoreResult<StoreStats>;

    async fn begin(&mut self) -> StoreResult<()>;

    async fn savepoint(&mut self) -> StoreResult<()>;

    async fn release_savepoint(&mut self) -> StoreResult<()>;

    async fn rollback_to_savepoint(&mut self) -> StoreResult<()>;

    /// Insert the record, or update content/metadata/active of the row with the same name
    async fn upsert(&mut self, record: &PolicyRecord) -> StoreResult<UpsertedPolicy>;

    async fn commit(&mut self) -> StoreResult<()>;

    async fn rollback(&mut self) -> StoreResult<()>;

    /// Release the underlying connection. Safe to call more than once.
    async fn close(&mut self);
}

/// Run `attempt` until it succeeds or the retry budget is exhausted.
///
/// Sleeps `retry.delay` between attempts, never after the last one.
pub async fn connect_with_retry<T, F, Fut>(
    retry: &RetryConfig,
    reporter: &dyn ProgressReporter,
    mut attempt: F,
) -> StoreResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = StoreResult<T>>,
{
    let max_attempts = retry.max_attempts.max(1);
    let mut last_error = String::new();

    for n in 1..=max_attempts {
        match attempt().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                last_error = e.to_string();
                reporter.record(LoadEvent::ConnectAttemptFailed {
                    attempt: n,
                    max_attempts,
                    error: last_error.clone(),
                });
                if n < max_attempts {
                    tokio::time::sleep(retry.delay).await;
                }
            }
        }
    }

    Err(StoreError::Connect {
        attempts: max_attempts,
        message: last_error,
    })
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::testing::RecordingReporter;
    use std::time::Duration;

    fn fast_retry(max_attempts: u32) -> RetryConfig {
        RetryConfig {
            max_attempts,
            delay: Duration::from_millis(1),
        }
    }

    #[tokio::test]
    async fn test_retry_exhausts_budget() {
        let reporter = RecordingReporter::default();
        let mut calls = 0u32;

        let result: StoreResult<()> = connect_with_retry(&fast_retry(3), &reporter, || {
            calls += 1;
            async { Err(StoreError::Other("connection refused".to_string())) }
        })
        .await;

        assert_eq!(calls, 3);
        match result {
            Err(StoreError::Connect { attempts, message }) => {
                assert_eq!(attempts, 3);
                assert_eq!(message, "Store error: connection refused");
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(
            reporter.count(|e| matches!(e, LoadEvent::ConnectAttemptFailed { .. })),
            3
        );
    }

    #[tokio::test]
    async fn test_retry_succeeds_after_failures() {
        let reporter = RecordingReporter::default();
        let mut calls = 0u32;

        let result = connect_with_retry(&fast_retry(5), &reporter, || {
            calls += 1;
            let n = calls;
            async move {
                if n < 3 {
                    Err(StoreError::Other("starting up".to_string()))
                } else {
                    Ok(n)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(
            reporter.count(|e| matches!(e, LoadEvent::ConnectAttemptFailed { .. })),
            2
        );
    }

    #[test]
    fn test_stats_report_from_error() {
        let report = StatsReport::from(Err(StoreError::Other("no table".to_string())));
        assert_eq!(
            report,
            StatsReport::Unavailable {
                error: "Store error: no table".to_string()
            }
        );
    }
}
