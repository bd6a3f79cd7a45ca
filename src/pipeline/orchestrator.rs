//! Run Orchestrator - sequences a complete policy load
//!
//! statistics → collection → synchronization → single commit → statistics.

use crate::config::PolicySourceConfig;
use crate::db::{PolicyStore, StatsReport};
use crate::error::{LoaderError, LoaderResult};
use crate::pipeline::synchronizer::UpsertSynchronizer;
use crate::policy::metadata::to_record;
use crate::policy::FileCollector;
use crate::report::{LoadEvent, ProgressReporter, StatsPhase};
use serde::Serialize;

/// Lifecycle of a loader run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Init,
    Connected,
    Collecting,
    Synchronizing,
    Committing,
    Done,
    Failed,
}

/// How a successful run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    /// Candidates were synchronized and committed
    Done,
    /// Nothing to load; no transaction was opened
    NoPolicies,
}

/// Final report of a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub outcome: RunOutcome,
    pub files_found: usize,
    /// Files that were found but never became candidates (empty or unreadable)
    pub skipped: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub before: StatsReport,
    pub after: Option<StatsReport>,
}

pub struct RunOrchestrator<'a> {
    source: &'a PolicySourceConfig,
    reporter: &'a dyn ProgressReporter,
    state: RunState,
}

impl<'a> RunOrchestrator<'a> {
    pub fn new(source: &'a PolicySourceConfig, reporter: &'a dyn ProgressReporter) -> Self {
        Self {
            source,
            reporter,
            state: RunState::Init,
        }
    }

    #[cfg(test)]
    pub fn state(&self) -> RunState {
        self.state
    }

    fn transition(&mut self, next: RunState) {
        self.state = next;
        self.reporter.record(LoadEvent::Phase(next));
    }

    async fn stats(&self, store: &mut dyn PolicyStore, phase: StatsPhase) -> StatsReport {
        let stats = StatsReport::from(store.stats().await);
        self.reporter.record(LoadEvent::Stats {
            phase,
            stats: stats.clone(),
        });
        stats
    }

    /// Run a full load against an already connected store.
    ///
    /// Per-item failures only show up in the summary. Connection loss, a
    /// broken transaction and commit failure end the run in [`RunState::Failed`].
    pub async fn run(&mut self, store: &mut dyn PolicyStore) -> LoaderResult<RunSummary> {
        self.transition(RunState::Connected);
        let before = self.stats(store, StatsPhase::Initial).await;

        self.transition(RunState::Collecting);
        let reporter = self.reporter;
        let collector = FileCollector::new(self.source, reporter);
        let paths = collector.discover();
        let files_found = paths.len();

        let mut candidates = paths
            .iter()
            .filter_map(|path| collector.read(path))
            .map(to_record)
            .peekable();

        if candidates.peek().is_none() {
            self.reporter.record(LoadEvent::NoPolicies);
            self.transition(RunState::Done);
            let summary = RunSummary {
                outcome: RunOutcome::NoPolicies,
                files_found,
                skipped: files_found,
                succeeded: 0,
                failed: 0,
                before,
                after: None,
            };
            self.reporter.record(LoadEvent::Summary(summary.clone()));
            return Ok(summary);
        }

        if let Err(e) = store.begin().await {
            self.transition(RunState::Failed);
            return Err(LoaderError::Store(e));
        }

        self.transition(RunState::Synchronizing);
        let tally = {
            let mut synchronizer = UpsertSynchronizer::new(&mut *store, reporter);
            let mut fatal = None;
            for record in candidates {
                if let Err(e) = synchronizer.sync(&record).await {
                    fatal = Some(e);
                    break;
                }
            }
            if let Some(e) = fatal {
                drop(synchronizer);
                if store.rollback().await.is_ok() {
                    self.reporter.record(LoadEvent::RolledBack);
                }
                self.transition(RunState::Failed);
                return Err(LoaderError::Store(e));
            }
            synchronizer.tally()
        };

        self.transition(RunState::Committing);
        if let Err(e) = store.commit().await {
            self.reporter.record(LoadEvent::CommitFailed {
                error: e.to_string(),
            });
            if store.rollback().await.is_ok() {
                self.reporter.record(LoadEvent::RolledBack);
            }
            self.transition(RunState::Failed);
            return Err(LoaderError::Commit(e));
        }
        self.reporter.record(LoadEvent::Committed);

        let after = self.stats(store, StatsPhase::Final).await;
        self.transition(RunState::Done);

        let summary = RunSummary {
            outcome: RunOutcome::Done,
            files_found,
            skipped: files_found - (tally.succeeded + tally.failed),
            succeeded: tally.succeeded,
            failed: tally.failed,
            before,
            after: Some(after),
        };
        self.reporter.record(LoadEvent::Summary(summary.clone()));
        Ok(summary)
    }
}
