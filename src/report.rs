//! Progress reporting
//!
//! Components never log directly. They describe what happened as a
//! [`LoadEvent`] and hand it to the [`ProgressReporter`] they were given.
//! The binary wires in [`TracingReporter`]; tests record events in memory.

use crate::db::StatsReport;
use crate::pipeline::orchestrator::{RunState, RunSummary};
use std::path::PathBuf;
use tracing::{debug, error, info, warn};

/// Which side of the run a statistics snapshot was taken on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatsPhase {
    Initial,
    Final,
}

/// Everything a run can report
#[derive(Debug, Clone, PartialEq)]
pub enum LoadEvent {
    Phase(RunState),
    ConnectAttemptFailed {
        attempt: u32,
        max_attempts: u32,
        error: String,
    },
    Connected {
        target: String,
        tls: bool,
    },
    SchemaEnsured,
    SchemaSetupFailed {
        error: String,
    },
    RootMissing {
        root: PathBuf,
    },
    FilesFound {
        root: PathBuf,
        count: usize,
    },
    Processing {
        path: String,
    },
    SkippedEmpty {
        path: String,
    },
    ReadFailed {
        path: String,
        error: String,
    },
    Saved {
        name: String,
        id: String,
        version: i64,
    },
    SaveFailed {
        name: String,
        error: String,
    },
    Stats {
        phase: StatsPhase,
        stats: StatsReport,
    },
    NoPolicies,
    Committed,
    CommitFailed {
        error: String,
    },
    RolledBack,
    Summary(RunSummary),
    ConnectionClosed,
}

/// Capability to record a progress event
pub trait ProgressReporter: Send + Sync {
    fn record(&self, event: LoadEvent);
}

/// Reporter that forwards events to `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl ProgressReporter for TracingReporter {
    fn record(&self, event: LoadEvent) {
        match event {
            LoadEvent::Phase(state) => debug!(state = ?state, "Run state changed"),
            LoadEvent::ConnectAttemptFailed {
                attempt,
                max_attempts,
                error,
            } => warn!(attempt, max_attempts, %error, "Database connection attempt failed"),
            LoadEvent::Connected { target, tls } => {
                info!(%target, tls, "✅ Connected to database successfully")
            }
            LoadEvent::SchemaEnsured => info!("✅ Policies table initialized"),
            LoadEvent::SchemaSetupFailed { error } => {
                warn!(%error, "⚠️  Could not initialize policies table")
            }
            LoadEvent::RootMissing { root } => {
                warn!(root = %root.display(), "Policy directory does not exist")
            }
            LoadEvent::FilesFound { root, count } => {
                info!(root = %root.display(), count, "📂 Found policy files")
            }
            LoadEvent::Processing { path } => debug!(%path, "Processing policy file"),
            LoadEvent::SkippedEmpty { path } => warn!(%path, "Skipping empty file"),
            LoadEvent::ReadFailed { path, error } => {
                error!(%path, %error, "Error loading policy file")
            }
            LoadEvent::Saved { name, id, version } => {
                info!(%name, %id, version, "Saved policy")
            }
            LoadEvent::SaveFailed { name, error } => {
                error!(%name, %error, "Error saving policy")
            }
            LoadEvent::Stats { phase, stats } => match stats {
                StatsReport::Available(s) => info!(
                    phase = ?phase,
                    total = s.total,
                    active = s.active,
                    inactive = s.inactive,
                    last_updated = ?s.last_updated,
                    "📊 Database state"
                ),
                StatsReport::Unavailable { error } => {
                    warn!(phase = ?phase, %error, "📊 Database statistics unavailable")
                }
            },
            LoadEvent::NoPolicies => warn!("No policies found to load"),
            LoadEvent::Committed => info!("Transaction committed successfully"),
            LoadEvent::CommitFailed { error } => error!(%error, "Error committing transaction"),
            LoadEvent::RolledBack => warn!("Transaction rolled back"),
            LoadEvent::Summary(summary) => info!(
                outcome = ?summary.outcome,
                files_found = summary.files_found,
                skipped = summary.skipped,
                succeeded = summary.succeeded,
                failed = summary.failed,
                "🏁 Policy loading completed"
            ),
            LoadEvent::ConnectionClosed => info!("👋 Database connection closed"),
        }
    }
}
