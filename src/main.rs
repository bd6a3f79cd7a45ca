//! Policy Loader
//!
//! One-shot synchronizer run at deployment time: walks a directory of Rego
//! policies, extracts their comment annotations and upserts them into the
//! `policies` table as named, versioned records.
//!
//! Exit code 0 when the run completes (even with per-item failures), 1 on
//! missing configuration, an unreachable database, or a failed commit.

mod config;
mod db;
mod error;
mod pipeline;
mod policy;
mod report;

use crate::config::Settings;
use crate::db::{PgPolicyStore, PolicyStore};
use crate::error::LoaderResult;
use crate::pipeline::orchestrator::RunState;
use crate::pipeline::{RunOrchestrator, RunSummary};
use crate::report::{LoadEvent, ProgressReporter, TracingReporter};
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env first so LOG_FORMAT and RUST_LOG are visible to tracing
    let _ = dotenvy::dotenv();
    let settings = Settings::load();
    init_tracing(settings.as_ref().map(|s| s.json_logs).unwrap_or(false));

    let settings = match settings {
        Ok(settings) => settings,
        Err(e) => {
            error!("❌ {}", e);
            return ExitCode::FAILURE;
        }
    };

    info!(
        policy_dir = %settings.policies.root.display(),
        database = %settings.database.display_url(),
        "🚀 Starting policy loader"
    );

    let reporter = TracingReporter;
    match load(&settings, &reporter).await {
        Ok(summary) => {
            info!(
                succeeded = summary.succeeded,
                failed = summary.failed,
                "Policy loader completed successfully"
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("❌ Policy loader failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Connect, run, and always close the connection once it was opened
async fn load(
    settings: &Settings,
    reporter: &dyn ProgressReporter,
) -> LoaderResult<RunSummary> {
    let mut store = match PgPolicyStore::connect(&settings.database, reporter).await {
        Ok(store) => store,
        Err(e) => {
            reporter.record(LoadEvent::Phase(RunState::Failed));
            return Err(e.into());
        }
    };

    if settings.database.ensure_schema {
        match store.ensure_schema().await {
            Ok(()) => reporter.record(LoadEvent::SchemaEnsured),
            Err(e) => reporter.record(LoadEvent::SchemaSetupFailed {
                error: e.to_string(),
            }),
        }
    }

    let mut orchestrator = RunOrchestrator::new(&settings.policies, reporter);
    let result = orchestrator.run(&mut store).await;

    store.close().await;
    reporter.record(LoadEvent::ConnectionClosed);
    result
}

/// Initialize tracing with structured logging
fn init_tracing(json: bool) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,policy_loader=debug"));

    let registry = tracing_subscriber::registry().with(env_filter);
    if json {
        registry
            .with(fmt::layer().json().with_target(true).with_level(true))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_level(true)
                    .with_file(true)
                    .with_line_number(true)
                    .compact(),
            )
            .init();
    }
}
