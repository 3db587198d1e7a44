//! LookupSession - per-screen search state over a shared index
//!
//! Resolution order for one committed query:
//! 1. empty → whole catalog, no charge
//! 2. quota exhausted → empty list + blocked, no lookup work at all
//! 3. charge, then exact code → cache → fuzzy (fuzzy results are cached)
//!
//! Concurrency Model:
//! - The index is immutable and shared by `Arc`; replacing the catalog swaps
//!   the `Arc` and clears the cache
//! - All mutable state sits behind one mutex, held for the whole resolution,
//!   so commits within a session are strictly serialized
//! - `search` runs the resolution on a blocking thread and can be cancelled by
//!   dropping the future

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;

use crate::cache::{CacheKey, ResultCache};
use crate::config::LookupConfig;
use crate::index::{ResultList, SearchIndex};
use crate::interface::LookupError;
use crate::quota::{PremiumStatus, QuotaGate};
use crate::runtime::{init_rayon, runtime_handle, DropGuard};

/// Mutable per-session state. Created at screen mount, never persisted.
pub struct QuerySession {
    /// Latest keystroke buffer
    pub raw_input: String,
    /// Last query dispatched to matching
    pub committed_query: String,
    /// Committed non-empty queries charged while non-premium
    pub search_count: u32,
    pub cache: ResultCache,
}

impl QuerySession {
    pub fn new(cache_capacity: usize) -> Self {
        Self {
            raw_input: String::new(),
            committed_query: String::new(),
            search_count: 0,
            cache: ResultCache::new(cache_capacity),
        }
    }
}

/// Which path produced a result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// No query: the unfiltered catalog
    All,
    Exact,
    Cached,
    Fuzzy,
    /// Refused by the free-tier quota
    Blocked,
}

/// What the presentation layer renders for one committed query
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub entries: Arc<ResultList>,
    pub blocked: bool,
    pub resolution: Resolution,
}

impl SearchOutcome {
    fn new(entries: Arc<ResultList>, resolution: Resolution) -> Self {
        Self {
            entries,
            blocked: resolution == Resolution::Blocked,
            resolution,
        }
    }
}

pub struct LookupSession {
    index: RwLock<Arc<SearchIndex>>,
    premium: PremiumStatus,
    gate: QuotaGate,
    config: LookupConfig,
    state: Mutex<QuerySession>,
}

impl LookupSession {
    pub fn new(index: Arc<SearchIndex>, premium: PremiumStatus, config: LookupConfig) -> Self {
        init_rayon();
        Self {
            index: RwLock::new(index),
            premium,
            gate: QuotaGate::new(config.free_search_limit),
            state: Mutex::new(QuerySession::new(config.cache_capacity)),
            config,
        }
    }

    pub fn config(&self) -> &LookupConfig {
        &self.config
    }

    pub fn premium(&self) -> &PremiumStatus {
        &self.premium
    }

    pub fn index(&self) -> Arc<SearchIndex> {
        Arc::clone(&self.index.read())
    }

    /// Swap in an index built from a new catalog. Cached lists point into the
    /// old catalog, so the cache is dropped.
    pub fn replace_index(&self, index: Arc<SearchIndex>) {
        let mut state = self.state.lock();
        *self.index.write() = index;
        state.cache.clear();
        tracing::info!("Search index replaced, cache cleared");
    }

    /// Remember the latest raw keystroke buffer
    pub fn record_input(&self, raw: &str) {
        self.state.lock().raw_input = raw.to_string();
    }

    /// Resolve one committed query synchronously.
    pub fn commit(&self, query: &str) -> SearchOutcome {
        let query = query.trim();
        let index = self.index();
        let mut state = self.state.lock();

        if query.is_empty() {
            state.committed_query.clear();
            return SearchOutcome::new(index.all(), Resolution::All);
        }

        let is_premium = self.premium.is_premium();
        if self.gate.should_block(&state, query, is_premium) {
            tracing::debug!(search_count = state.search_count, "Free search limit reached");
            state.committed_query = query.to_string();
            return SearchOutcome::new(Arc::new(ResultList::default()), Resolution::Blocked);
        }

        self.gate.charge(&mut state, query, is_premium);
        state.committed_query = query.to_string();
        tracing::trace!(query, search_count = state.search_count, "Committed query");

        if let Some(list) = index.exact_list(query) {
            tracing::debug!("Exact code match");
            return SearchOutcome::new(list, Resolution::Exact);
        }

        let key = CacheKey::new(query, is_premium);
        if let Some(hit) = state.cache.get(&key) {
            tracing::debug!(results = hit.len(), "Result cache hit");
            return SearchOutcome::new(hit, Resolution::Cached);
        }

        let results = Arc::new(index.fuzzy_search(query, self.config.max_results));
        if let Some(evicted) = state.cache.put(key, Arc::clone(&results)) {
            tracing::debug!(evicted = evicted.as_str(), "Evicted oldest cached result");
        }
        SearchOutcome::new(results, Resolution::Fuzzy)
    }

    /// Async variant of `commit` for foreign callers.
    ///
    /// Runs on a blocking thread. Dropping the returned future cancels the
    /// token; a resolution that has not started yet is then skipped.
    pub async fn search(self: &Arc<Self>, query: String) -> Result<SearchOutcome, LookupError> {
        let token = CancellationToken::new();
        let _guard = DropGuard::new(token.clone());

        let session = Arc::clone(self);
        let handle = runtime_handle().spawn_blocking(move || {
            if token.is_cancelled() {
                return Err(LookupError::Cancelled);
            }
            Ok(session.commit(&query))
        });

        match handle.await {
            Ok(result) => result,
            Err(_join_error) => Err(LookupError::Cancelled),
        }
    }

    /// Session remount: counter, cache and committed query start over
    pub fn reset(&self) {
        let mut state = self.state.lock();
        *state = QuerySession::new(self.config.cache_capacity);
        tracing::info!("Lookup session reset");
    }

    pub fn search_count(&self) -> u32 {
        self.state.lock().search_count
    }

    pub fn remaining_free_searches(&self) -> u32 {
        self.gate.remaining(&self.state.lock())
    }

    pub fn committed_query(&self) -> String {
        self.state.lock().committed_query.clone()
    }

    pub fn raw_input(&self) -> String {
        self.state.lock().raw_input.clone()
    }

    pub fn cached_results(&self) -> usize {
        self.state.lock().cache.len()
    }
}
