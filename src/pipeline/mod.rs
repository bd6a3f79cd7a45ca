//! Load Pipeline Module
//!
//! The two stages that run against the store:
//!
//! 1. **Synchronizer**: idempotent per-policy upsert under a savepoint
//! 2. **Orchestrator**: statistics, collection, synchronization and the single commit

pub mod orchestrator;
pub mod synchronizer;

pub use orchestrator::{RunOrchestrator, RunSummary};
