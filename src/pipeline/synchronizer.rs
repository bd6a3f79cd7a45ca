//! Upsert Synchronizer
//!
//! Applies one candidate at a time inside the run's transaction. Every
//! upsert runs under its own savepoint so a failed item is rolled back in
//! isolation and later items see a clean transaction.

use crate::db::PolicyStore;
use crate::error::{StoreError, StoreResult};
use crate::policy::{PolicyRecord, UpsertedPolicy};
use crate::report::{LoadEvent, ProgressReporter};
use serde::Serialize;

/// Running count of per-item outcomes
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SyncTally {
    pub succeeded: usize,
    pub failed: usize,
}

pub struct UpsertSynchronizer<'a> {
    store: &'a mut dyn PolicyStore,
    reporter: &'a dyn ProgressReporter,
    tally: SyncTally,
}

impl<'a> UpsertSynchronizer<'a> {
    pub fn new(store: &'a mut dyn PolicyStore, reporter: &'a dyn ProgressReporter) -> Self {
        Self {
            store,
            reporter,
            tally: SyncTally::default(),
        }
    }

    pub fn tally(&self) -> SyncTally {
        self.tally
    }

    /// Upsert a single record.
    ///
    /// Returns `Ok(false)` when the item failed but the run can go on, and
    /// `Err` when the connection is gone or a savepoint statement failed.
    pub async fn sync(&mut self, record: &PolicyRecord) -> StoreResult<bool> {
        match self.upsert_isolated(record).await {
            Ok(saved) => {
                self.tally.succeeded += 1;
                self.reporter.record(LoadEvent::Saved {
                    name: record.name.clone(),
                    id: saved.id,
                    version: saved.version,
                });
                Ok(true)
            }
            Err(e) => {
                self.tally.failed += 1;
                self.reporter.record(LoadEvent::SaveFailed {
                    name: record.name.clone(),
                    error: e.to_string(),
                });
                if e.is_fatal() {
                    Err(e)
                } else {
                    Ok(false)
                }
            }
        }
    }

    async fn upsert_isolated(&mut self, record: &PolicyRecord) -> StoreResult<UpsertedPolicy> {
        self.store.savepoint().await.map_err(transaction_error)?;

        match self.store.upsert(record).await {
            Ok(saved) => {
                self.store
                    .release_savepoint()
                    .await
                    .map_err(transaction_error)?;
                Ok(saved)
            }
            Err(e) => {
                if !e.is_connection_lost() {
                    self.store
                        .rollback_to_savepoint()
                        .await
                        .map_err(transaction_error)?;
                    self.store
                        .release_savepoint()
                        .await
                        .map_err(transaction_error)?;
                }
                Err(e)
            }
        }
    }
}

/// A failed savepoint statement leaves the transaction aborted
fn transaction_error(e: StoreError) -> StoreError {
    if e.is_connection_lost() {
        e
    } else {
        StoreError::Transaction(e.to_string())
    }
}
