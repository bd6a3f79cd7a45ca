//! Policy Module
//!
//! Reading policy files from disk and turning them into store candidates:
//! - File collection (directory walk, empty/unreadable file handling)
//! - Metadata extraction (comment annotations, package declaration)
//! - Canonical naming

pub mod collector;
pub mod metadata;
pub mod types;

pub use collector::FileCollector;
pub use types::{PolicyRecord, UpsertedPolicy};
