//! RAFinity Core - ICD-10 / RAF lookup engine for the mobile apps
//!
//! Turns free-text input into a bounded, ranked list of diagnosis codes:
//! debounced commits, a free-tier quota, an exact-code fast path, a FIFO
//! result cache, and weighted Bitap fuzzy matching over code and description.
//!
//! Types are exported via UniFFI proc-macros (#[derive(uniffi::Record/Object)]).

pub mod cache;
pub mod catalog;
pub mod config;
pub mod debounce;
mod fuzzy;
pub mod index;
pub mod interface;
mod lookup;
pub mod pipeline;
pub mod quota;
mod runtime;
pub mod session;

pub use catalog::{load_catalog, Catalog, CatalogEntry, CatalogSource, FileCatalogSource, StaticCatalogSource};
#[cfg(feature = "http")]
pub use catalog::HttpCatalogSource;
pub use config::{FuzzyConfig, LookupConfig};
pub use index::{ResultList, SearchIndex};
pub use interface::*;
pub use lookup::RafinityLookup;
pub use quota::PremiumStatus;
pub use session::{LookupSession, Resolution, SearchOutcome};

uniffi::setup_scaffolding!("rafinity");
