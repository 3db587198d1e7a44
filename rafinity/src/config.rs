//! Session tuning: debounce window, free-tier quota, cache and result bounds,
//! and the fuzzy matcher knobs. Every field has a default, so an empty JSON
//! object is a valid configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::interface::LookupError;

/// Quiet period before a keystroke burst is committed as a query
pub const DEFAULT_DEBOUNCE_MS: u64 = 300;
/// Committed non-empty queries allowed per session without premium
pub const DEFAULT_FREE_SEARCH_LIMIT: u32 = 10;
pub const DEFAULT_CACHE_CAPACITY: usize = 100;
pub const DEFAULT_MAX_RESULTS: usize = 50;

/// Bitap masks are u64, so no chunk can be longer than this.
pub const MAX_BITS: usize = 64;

/// Approximate matcher configuration.
///
/// Scores live on a 0 (exact) to 1 (no match) distance scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct FuzzyConfig {
    /// Highest score still accepted as a match
    #[validate(range(min = 0.0, max = 1.0))]
    pub threshold: f64,
    /// How far from `location` a match may drift before it costs a full point
    pub distance: usize,
    /// Expected character position of the match within a field
    pub location: usize,
    /// Shortest run of matching characters that counts as a hit
    #[validate(range(min = 1))]
    pub min_match_len: usize,
    /// Longer patterns are split into chunks of this many characters
    #[validate(range(min = 1, max = 64))]
    pub max_pattern_len: usize,
    #[validate(range(min = 0.0))]
    pub code_weight: f64,
    #[validate(range(min = 0.0))]
    pub description_weight: f64,
}

impl Default for FuzzyConfig {
    fn default() -> Self {
        Self {
            threshold: 0.3,
            distance: 100,
            location: 0,
            min_match_len: 2,
            max_pattern_len: 32,
            code_weight: 0.7,
            description_weight: 0.3,
        }
    }
}

impl FuzzyConfig {
    /// Field weights scaled to sum to 1, as (code, description)
    pub fn normalized_weights(&self) -> (f64, f64) {
        let total = self.code_weight + self.description_weight;
        (self.code_weight / total, self.description_weight / total)
    }
}

/// Configuration for a lookup session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct LookupConfig {
    pub debounce_ms: u64,
    pub free_search_limit: u32,
    #[validate(range(min = 1))]
    pub cache_capacity: usize,
    #[validate(range(min = 1))]
    pub max_results: usize,
    #[validate]
    pub fuzzy: FuzzyConfig,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            free_search_limit: DEFAULT_FREE_SEARCH_LIMIT,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            max_results: DEFAULT_MAX_RESULTS,
            fuzzy: FuzzyConfig::default(),
        }
    }
}

impl LookupConfig {
    /// Parse and validate a JSON configuration. Missing fields take defaults.
    pub fn from_json(json: &str) -> Result<Self, LookupError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| LookupError::InvalidConfig(e.to_string()))?;
        config.check()?;
        Ok(config)
    }

    /// Field ranges plus the cross-field rules the derive can't express
    pub fn check(&self) -> Result<(), LookupError> {
        self.validate()?;
        if self.fuzzy.code_weight + self.fuzzy.description_weight <= 0.0 {
            return Err(LookupError::InvalidConfig(
                "field weights must sum to a positive value".to_string(),
            ));
        }
        debug_assert!(self.fuzzy.max_pattern_len <= MAX_BITS);
        Ok(())
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}
