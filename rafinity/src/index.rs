//! Search index over the catalog
//!
//! Two structures built once per catalog:
//! - exact table: normalized code → catalog position (O(1) fast path)
//! - fuzzy fields: pre-lowercased code and description per entry, scored with
//!   Bitap and combined with field weights
//!
//! The index is read-only after `build` and is shared across sessions by `Arc`.

use std::collections::HashMap;
use std::sync::Arc;

use rayon::prelude::*;

use crate::catalog::{normalize_code, Catalog, CatalogEntry};
use crate::config::FuzzyConfig;
use crate::fuzzy::{BitapPattern, FieldText};

/// Ordered entries, best match first (or catalog order when unfiltered).
/// Holds shared references into the catalog, never copies.
#[derive(Debug, Clone, Default)]
pub struct ResultList {
    entries: Vec<Arc<CatalogEntry>>,
    /// Candidates found before truncation to the result bound
    total: usize,
}

impl ResultList {
    pub fn new(entries: Vec<Arc<CatalogEntry>>) -> Self {
        let total = entries.len();
        Self { entries, total }
    }

    /// A truncated list that remembers how many candidates there were
    pub fn truncated(entries: Vec<Arc<CatalogEntry>>, total: usize) -> Self {
        Self {
            total: total.max(entries.len()),
            entries,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Arc<CatalogEntry>> {
        self.entries.iter()
    }

    pub fn first(&self) -> Option<&Arc<CatalogEntry>> {
        self.entries.first()
    }

    pub fn codes(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.code.as_str()).collect()
    }
}

impl<'a> IntoIterator for &'a ResultList {
    type Item = &'a Arc<CatalogEntry>;
    type IntoIter = std::slice::Iter<'a, Arc<CatalogEntry>>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

struct IndexedFields {
    code: Option<FieldText>,
    description: Option<FieldText>,
}

/// A scored candidate before truncation
#[derive(Debug, Clone, Copy)]
struct Scored {
    position: usize,
    score: f64,
}

pub struct SearchIndex {
    catalog: Catalog,
    /// Normalized code → prebuilt single-entry list, so repeats share one `Arc`
    exact: HashMap<String, Arc<ResultList>>,
    fields: Vec<IndexedFields>,
    config: FuzzyConfig,
    code_weight: f64,
    description_weight: f64,
    /// The unfiltered list, built once so "no query" costs nothing
    everything: Arc<ResultList>,
}

impl SearchIndex {
    /// Build both structures. Never fails: an empty catalog yields an index
    /// that matches nothing.
    ///
    /// Duplicate codes keep the first catalog position in the exact table.
    pub fn build(catalog: Catalog, config: &FuzzyConfig) -> Self {
        let mut exact = HashMap::with_capacity(catalog.len());
        let mut duplicates = 0usize;
        for entry in catalog.entries() {
            let key = entry.normalized_code();
            if exact.contains_key(&key) {
                duplicates += 1;
                continue;
            }
            exact.insert(key, Arc::new(ResultList::new(vec![Arc::clone(entry)])));
        }
        if duplicates > 0 {
            tracing::warn!(duplicates, "Catalog contains duplicate codes; exact lookup keeps the first");
        }

        let fields: Vec<IndexedFields> = catalog
            .entries()
            .par_iter()
            .map(|entry| IndexedFields {
                code: FieldText::new(&entry.code),
                description: FieldText::new(&entry.description),
            })
            .collect();

        let (code_weight, description_weight) = config.normalized_weights();
        let everything = Arc::new(ResultList::new(catalog.entries().to_vec()));

        tracing::info!(entries = catalog.len(), exact_keys = exact.len(), "Built search index");

        Self {
            catalog,
            exact,
            fields,
            config: config.clone(),
            code_weight,
            description_weight,
            everything,
        }
    }

    pub fn empty(config: &FuzzyConfig) -> Self {
        Self::build(Catalog::empty(), config)
    }

    pub fn len(&self) -> usize {
        self.catalog.len()
    }

    pub fn is_empty(&self) -> bool {
        self.catalog.is_empty()
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// The whole catalog in original order
    pub fn all(&self) -> Arc<ResultList> {
        Arc::clone(&self.everything)
    }

    /// Exact code lookup, case-insensitive and trimmed
    pub fn exact_match(&self, query: &str) -> Option<&Arc<CatalogEntry>> {
        self.exact.get(&normalize_code(query)).and_then(|list| list.first())
    }

    /// The shared single-entry result list for an exact code
    pub fn exact_list(&self, query: &str) -> Option<Arc<ResultList>> {
        self.exact.get(&normalize_code(query)).map(Arc::clone)
    }

    /// Weighted approximate search over code and description.
    ///
    /// Candidates are sorted by ascending combined score; equal scores keep
    /// catalog order. At most `max_results` entries are returned.
    pub fn fuzzy_search(&self, query: &str, max_results: usize) -> ResultList {
        let query = query.trim();
        if query.is_empty() || self.is_empty() {
            return ResultList::default();
        }

        let pattern = BitapPattern::new(query, self.config.max_pattern_len);

        // Indexed par_iter keeps catalog order in the collected Vec
        let mut scored: Vec<Scored> = self
            .fields
            .par_iter()
            .enumerate()
            .filter_map(|(position, fields)| {
                self.score_entry(&pattern, fields).map(|score| Scored { position, score })
            })
            .collect();

        // Stable sort: ties stay in catalog order
        scored.sort_by(|a, b| a.score.total_cmp(&b.score));
        let candidates = scored.len();
        scored.truncate(max_results);

        tracing::debug!(candidates, kept = scored.len(), "Fuzzy search finished");

        ResultList::truncated(
            scored
                .into_iter()
                .filter_map(|s| self.catalog.get(s.position).cloned())
                .collect(),
            candidates,
        )
    }

    /// Product of `score ^ (weight × norm)` over the fields that matched.
    /// A field scoring exactly 0 pins the entry to 0.
    fn score_entry(&self, pattern: &BitapPattern, fields: &IndexedFields) -> Option<f64> {
        let weighted = [
            (fields.code.as_ref(), self.code_weight),
            (fields.description.as_ref(), self.description_weight),
        ];

        let mut total = 1.0;
        let mut matched = false;
        for (field, weight) in weighted {
            let Some(field) = field else { continue };
            if let Some(score) = pattern.score(field, &self.config) {
                matched = true;
                total *= if score == 0.0 { 0.0 } else { score.powf(weight * field.norm()) };
            }
        }
        matched.then_some(total)
    }

    /// Stateless resolution: empty query → everything, exact code → that
    /// entry alone, otherwise the fuzzy ranking.
    pub fn search(&self, query: &str, max_results: usize) -> Arc<ResultList> {
        let query = query.trim();
        if query.is_empty() {
            return self.all();
        }
        if let Some(list) = self.exact_list(query) {
            return list;
        }
        Arc::new(self.fuzzy_search(query, max_results))
    }
}
