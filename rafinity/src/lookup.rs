//! RafinityLookup - main API for Swift/Kotlin interop
//!
//! One object per search screen. Owns a `LookupSession` over an index built
//! from the catalog JSON the app fetched, plus an optional keystroke pipeline
//! that reports to a foreign `LookupObserver`.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::catalog::Catalog;
use crate::config::LookupConfig;
use crate::index::SearchIndex;
use crate::interface::{EntryRecord, LookupError, LookupObserver, LookupResult};
use crate::pipeline::{QueryPipeline, ResultSink};
use crate::quota::PremiumStatus;
use crate::session::{LookupSession, SearchOutcome};

/// Forwards pipeline output to the foreign observer
struct ObserverSink {
    observer: Arc<dyn LookupObserver>,
}

impl ResultSink for ObserverSink {
    fn on_results(&self, outcome: &SearchOutcome) {
        self.observer.on_results(LookupResult::from(outcome));
    }

    fn on_upgrade_requested(&self) {
        self.observer.on_upgrade_requested();
    }
}

#[derive(uniffi::Object)]
pub struct RafinityLookup {
    session: Arc<LookupSession>,
    pipeline: Mutex<Option<QueryPipeline>>,
}

// Internal implementation (not exported via FFI)
impl RafinityLookup {
    pub fn from_catalog(catalog: Catalog, config: LookupConfig, premium: PremiumStatus) -> Self {
        let index = Arc::new(SearchIndex::build(catalog, &config.fuzzy));
        Self {
            session: Arc::new(LookupSession::new(index, premium, config)),
            pipeline: Mutex::new(None),
        }
    }

    pub fn session(&self) -> &Arc<LookupSession> {
        &self.session
    }
}

#[uniffi::export]
impl RafinityLookup {
    /// Build the index from the dataset JSON.
    ///
    /// An unreadable catalog is not an error: the lookup starts empty and
    /// every search returns nothing. An invalid `config_json` is.
    /// Starts on the free tier until `set_premium` says otherwise.
    #[uniffi::constructor]
    pub fn new(catalog_json: String, config_json: Option<String>) -> Result<Self, LookupError> {
        let config = match config_json {
            Some(json) => LookupConfig::from_json(&json)?,
            None => LookupConfig::default(),
        };

        let catalog = Catalog::from_json_slice(catalog_json.as_bytes()).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Catalog unavailable, starting with an empty index");
            Catalog::empty()
        });

        Ok(Self::from_catalog(catalog, config, PremiumStatus::default()))
    }

    /// Resolve a query directly, bypassing the debouncer.
    /// Empty query returns the whole catalog.
    pub async fn search(&self, query: String) -> Result<LookupResult, LookupError> {
        let outcome = self.session.search(query).await?;
        Ok(LookupResult::from(&outcome))
    }

    /// Start (or restart) the keystroke pipeline reporting to `observer`
    pub fn attach_observer(&self, observer: Arc<dyn LookupObserver>) {
        let sink = Arc::new(ObserverSink { observer });
        let pipeline = QueryPipeline::spawn(Arc::clone(&self.session), sink);
        *self.pipeline.lock() = Some(pipeline);
    }

    /// Stop the pipeline; pending commits are dropped
    pub fn detach_observer(&self) {
        self.pipeline.lock().take();
    }

    /// Current text of the search field, once per keystroke
    pub fn input(&self, text: String) -> Result<(), LookupError> {
        let pipeline = self.pipeline.lock();
        let pipeline = pipeline.as_ref().ok_or(LookupError::NotInitialized)?;
        pipeline.input(&text);
        Ok(())
    }

    /// Enter/return: commit the pending text without waiting
    pub fn submit(&self) -> Result<(), LookupError> {
        let pipeline = self.pipeline.lock();
        pipeline.as_ref().ok_or(LookupError::NotInitialized)?.submit();
        Ok(())
    }

    /// Called by the billing layer whenever entitlement changes
    pub fn set_premium(&self, is_premium: bool) {
        self.session.premium().set(is_premium);
    }

    pub fn is_premium(&self) -> bool {
        self.session.premium().is_premium()
    }

    /// Screen remount: quota counter and cache start over
    pub fn reset_session(&self) {
        self.session.reset();
    }

    pub fn search_count(&self) -> u32 {
        self.session.search_count()
    }

    pub fn remaining_free_searches(&self) -> u32 {
        self.session.remaining_free_searches()
    }

    /// Detail screen lookup by code (case-insensitive)
    pub fn entry(&self, code: String) -> Option<EntryRecord> {
        let index = self.session.index();
        index.exact_match(&code).map(|entry| EntryRecord::from(entry.as_ref()))
    }

    pub fn catalog_size(&self) -> u64 {
        self.session.index().len() as u64
    }

    /// Rebuild the index from a freshly fetched dataset.
    /// On a parse failure the current index stays in place.
    pub fn replace_catalog(&self, catalog_json: String) -> Result<u64, LookupError> {
        let catalog = Catalog::from_json_slice(catalog_json.as_bytes())?;
        let size = catalog.len() as u64;
        let index = SearchIndex::build(catalog, &self.session.config().fuzzy);
        self.session.replace_index(Arc::new(index));
        Ok(size)
    }
}
