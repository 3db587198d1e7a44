//! RAFinity FFI Interface Definition
//!
//! This file defines the public interface exposed to Swift and Kotlin via UniFFI.
//! It acts as the source of truth for shared types.

use std::collections::HashMap;

use thiserror::Error;

use crate::catalog::CatalogEntry;
use crate::session::SearchOutcome;

// ═══════════════════════════════════════════════════════════════════════════════
// RECORDS (Structs)
// ═══════════════════════════════════════════════════════════════════════════════

/// One catalog row as shown in the list and detail screens
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct EntryRecord {
    pub code: String,
    pub description: String,
    pub has_v28: bool,
    /// Display-only risk adjustment value, passed through untouched
    pub raf_score: Option<String>,
    /// Every other column of the source row
    pub extra: HashMap<String, String>,
}

impl From<&CatalogEntry> for EntryRecord {
    fn from(entry: &CatalogEntry) -> Self {
        Self {
            code: entry.code.clone(),
            description: entry.description.clone(),
            has_v28: entry.has_v28,
            raf_score: entry.raf_score.clone(),
            extra: entry
                .extra
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        }
    }
}

/// Search result container
///
/// `blocked` is set when the free-tier quota rejected the query. In that case
/// `entries` is empty and the app should present the upgrade flow.
#[derive(Debug, Clone, PartialEq, uniffi::Record)]
pub struct LookupResult {
    pub entries: Vec<EntryRecord>,
    /// Matches found before the result bound was applied ("showing 50 of N")
    pub total_count: u64,
    pub blocked: bool,
}

impl From<&SearchOutcome> for LookupResult {
    fn from(outcome: &SearchOutcome) -> Self {
        let entries: Vec<EntryRecord> = outcome.entries.iter().map(|e| EntryRecord::from(e.as_ref())).collect();
        Self {
            total_count: outcome.entries.total() as u64,
            entries,
            blocked: outcome.blocked,
        }
    }
}

/// Error type for RAFinity operations
///
/// Quota exhaustion is deliberately absent: it is reported through
/// `LookupResult::blocked`, never as an error.
#[derive(Debug, Error, uniffi::Error)]
pub enum LookupError {
    #[error("Catalog unavailable: {0}")]
    CatalogUnavailable(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Lookup not initialized")]
    NotInitialized,
    #[error("Operation cancelled")]
    Cancelled,
}

// ═══════════════════════════════════════════════════════════════════════════════
// CALLBACK INTERFACE
// ═══════════════════════════════════════════════════════════════════════════════

/// Presentation layer hooks, implemented in Swift/Kotlin.
/// Called from a background thread once per committed query.
#[uniffi::export(with_foreign)]
pub trait LookupObserver: Send + Sync {
    /// A committed query resolved (possibly to an empty, blocked result)
    fn on_results(&self, result: LookupResult);

    /// The free-tier quota is exhausted; show the upgrade flow
    fn on_upgrade_requested(&self);
}

impl From<serde_json::Error> for LookupError {
    fn from(e: serde_json::Error) -> Self {
        LookupError::CatalogUnavailable(e.to_string())
    }
}

impl From<std::io::Error> for LookupError {
    fn from(e: std::io::Error) -> Self {
        LookupError::CatalogUnavailable(e.to_string())
    }
}

impl From<validator::ValidationErrors> for LookupError {
    fn from(e: validator::ValidationErrors) -> Self {
        LookupError::InvalidConfig(e.to_string())
    }
}
