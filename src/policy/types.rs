//! Policy data types shared by the collector, extractor and synchronizer

use serde::{Deserialize, Serialize};

/// Writer identity stored in `created_by`
pub const CREATED_BY: &str = "policy-loader";

/// A policy file read from disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyDocument {
    /// Path relative to the policy root, forward-slash normalized
    pub path: String,
    /// File name without its extension
    pub stem: String,
    pub content: String,
}

/// Annotations found in a policy's comment lines.
///
/// Absent annotations stay `None` and are omitted when serialized.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub policy_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package: Option<String>,
}

impl PolicyMetadata {
    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// A candidate row for the `policies` table.
///
/// `version` and `updated_at` belong to the store and are never set here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyRecord {
    pub name: String,
    pub path: String,
    pub content: String,
    pub metadata: PolicyMetadata,
}

impl PolicyRecord {
    pub fn created_by(&self) -> &'static str {
        CREATED_BY
    }

    pub fn metadata_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(&self.metadata)
    }
}

/// Row identity returned by a successful upsert
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpsertedPolicy {
    pub id: String,
    pub version: i64,
}
