//! Diagnosis code catalog: row decoding and the one-shot catalog source.
//!
//! The dataset is an array of flat string-keyed rows. The fields the search
//! core touches get named struct members; everything else rides along in an
//! ordered passthrough bag for the detail screen.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::interface::LookupError;

pub const CODE_FIELD: &str = "Diagnosis Code (ICD-10)";
pub const DESCRIPTION_FIELD: &str = "Description";
pub const V28_FIELD: &str = "Has V28 HCC code";
pub const RAF_SCORE_FIELD: &str = "V28 CMS-HCC Model RAF Score";

/// Where the published dataset lives
pub const DEFAULT_CATALOG_URL: &str =
    "https://raw.githubusercontent.com/bwwwclark/Rafinity-data/main/icdData_full.json";

/// Lowercase + trim. Applied to catalog codes and to queries on the exact path.
pub fn normalize_code(code: &str) -> String {
    code.trim().to_lowercase()
}

/// One row of the dataset
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogEntry {
    pub code: String,
    pub description: String,
    pub has_v28: bool,
    pub raf_score: Option<String>,
    pub extra: BTreeMap<String, String>,
}

impl CatalogEntry {
    pub fn new(code: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            description: description.into(),
            has_v28: false,
            raf_score: None,
            extra: BTreeMap::new(),
        }
    }

    pub fn with_v28(mut self, has_v28: bool) -> Self {
        self.has_v28 = has_v28;
        self
    }

    pub fn with_raf_score(mut self, raf_score: impl Into<String>) -> Self {
        self.raf_score = Some(raf_score.into());
        self
    }

    /// Decode a raw row. Returns None when the code is missing or blank.
    pub fn from_row(row: &Map<String, Value>) -> Option<Self> {
        let code = row.get(CODE_FIELD).and_then(scalar_text)?;
        if code.trim().is_empty() {
            return None;
        }
        let description = row.get(DESCRIPTION_FIELD).and_then(scalar_text).unwrap_or_default();
        let has_v28 = match row.get(V28_FIELD) {
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) => {
                let s = s.trim();
                s.eq_ignore_ascii_case("yes") || s.eq_ignore_ascii_case("true")
            }
            _ => false,
        };
        let raf_score = row
            .get(RAF_SCORE_FIELD)
            .and_then(scalar_text)
            .filter(|s| !s.trim().is_empty());

        let extra = row
            .iter()
            .filter(|(k, _)| {
                !matches!(k.as_str(), CODE_FIELD | DESCRIPTION_FIELD | V28_FIELD | RAF_SCORE_FIELD)
            })
            .filter_map(|(k, v)| scalar_text(v).map(|text| (k.clone(), text)))
            .collect();

        Some(Self {
            code,
            description,
            has_v28,
            raf_score,
            extra,
        })
    }

    pub fn normalized_code(&self) -> String {
        normalize_code(&self.code)
    }
}

/// Render a JSON scalar as display text. Null and nested values yield None.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Immutable, ordered catalog. Entries are shared with result lists by `Arc`.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entries: Vec<Arc<CatalogEntry>>,
    skipped_rows: usize,
}

impl Catalog {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: Vec<CatalogEntry>) -> Self {
        Self {
            entries: entries.into_iter().map(Arc::new).collect(),
            skipped_rows: 0,
        }
    }

    /// Build from raw JSON values. Rows that are not objects or lack a code are
    /// skipped and counted, never fatal.
    pub fn from_rows(rows: Vec<Value>) -> Self {
        let total = rows.len();
        let entries: Vec<Arc<CatalogEntry>> = rows
            .iter()
            .filter_map(Value::as_object)
            .filter_map(CatalogEntry::from_row)
            .map(Arc::new)
            .collect();
        let skipped_rows = total - entries.len();
        if skipped_rows > 0 {
            tracing::warn!(skipped_rows, total, "Skipped catalog rows without a diagnosis code");
        }
        Self { entries, skipped_rows }
    }

    /// Parse the published JSON array
    pub fn from_json_slice(bytes: &[u8]) -> Result<Self, LookupError> {
        let rows: Vec<Value> = serde_json::from_slice(bytes)?;
        Ok(Self::from_rows(rows))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[Arc<CatalogEntry>] {
        &self.entries
    }

    pub fn get(&self, position: usize) -> Option<&Arc<CatalogEntry>> {
        self.entries.get(position)
    }

    /// Rows dropped during decoding
    pub fn skipped_rows(&self) -> usize {
        self.skipped_rows
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// CATALOG SOURCES
// ─────────────────────────────────────────────────────────────────────────────

/// Supplies the raw dataset exactly once per load.
#[async_trait::async_trait]
pub trait CatalogSource: Send + Sync {
    /// Human-readable origin, for logs
    fn describe(&self) -> String;

    async fn fetch(&self) -> Result<Vec<u8>, LookupError>;
}

/// Dataset stored on disk
pub struct FileCatalogSource {
    path: PathBuf,
}

impl FileCatalogSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait::async_trait]
impl CatalogSource for FileCatalogSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    async fn fetch(&self) -> Result<Vec<u8>, LookupError> {
        Ok(tokio::fs::read(&self.path).await?)
    }
}

/// Dataset already in memory (bundled asset, or bytes handed over by the app)
pub struct StaticCatalogSource {
    bytes: Vec<u8>,
}

impl StaticCatalogSource {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self { bytes: bytes.into() }
    }
}

#[async_trait::async_trait]
impl CatalogSource for StaticCatalogSource {
    fn describe(&self) -> String {
        format!("<memory: {} bytes>", self.bytes.len())
    }

    async fn fetch(&self) -> Result<Vec<u8>, LookupError> {
        Ok(self.bytes.clone())
    }
}

/// Dataset fetched over HTTPS
#[cfg(feature = "http")]
pub struct HttpCatalogSource {
    url: String,
    client: reqwest::Client,
}

#[cfg(feature = "http")]
impl HttpCatalogSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            client: reqwest::Client::new(),
        }
    }
}

#[cfg(feature = "http")]
impl Default for HttpCatalogSource {
    fn default() -> Self {
        Self::new(DEFAULT_CATALOG_URL)
    }
}

#[cfg(feature = "http")]
#[async_trait::async_trait]
impl CatalogSource for HttpCatalogSource {
    fn describe(&self) -> String {
        self.url.clone()
    }

    async fn fetch(&self) -> Result<Vec<u8>, LookupError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| LookupError::CatalogUnavailable(e.to_string()))?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| LookupError::CatalogUnavailable(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

/// Fetch and decode the catalog once.
///
/// Any failure degrades to an empty catalog: searches then return nothing
/// instead of the app crashing.
pub async fn load_catalog(source: &dyn CatalogSource) -> Catalog {
    match try_load_catalog(source).await {
        Ok(catalog) => {
            tracing::info!(
                source = %source.describe(),
                entries = catalog.len(),
                skipped = catalog.skipped_rows(),
                "Loaded catalog"
            );
            catalog
        }
        Err(e) => {
            tracing::warn!(source = %source.describe(), error = %e, "Catalog unavailable, using empty catalog");
            Catalog::empty()
        }
    }
}

async fn try_load_catalog(source: &dyn CatalogSource) -> Result<Catalog, LookupError> {
    let bytes = source.fetch().await?;
    Catalog::from_json_slice(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Map<String, Value> {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn test_row_decodes_named_fields() {
        let entry = CatalogEntry::from_row(&row(json!({
            "Diagnosis Code (ICD-10)": "E11.9",
            "Description": "Type 2 diabetes mellitus without complications",
            "Has V28 HCC code": "Yes",
            "V28 CMS-HCC Model RAF Score": "0.166",
            "V28 HCC": "38",
            "Chapter": "Endocrine"
        })))
        .unwrap();

        assert_eq!(entry.code, "E11.9");
        assert!(entry.has_v28);
        assert_eq!(entry.raf_score.as_deref(), Some("0.166"));
        assert_eq!(entry.extra.len(), 2);
        assert_eq!(entry.extra["V28 HCC"], "38");
        assert_eq!(entry.normalized_code(), "e11.9");
    }

    #[test]
    fn test_row_without_code_is_rejected() {
        assert!(CatalogEntry::from_row(&row(json!({"Description": "Cholera"}))).is_none());
        assert!(CatalogEntry::from_row(&row(json!({"Diagnosis Code (ICD-10)": "  "}))).is_none());
        assert!(CatalogEntry::from_row(&row(json!({"Diagnosis Code (ICD-10)": null}))).is_none());
    }

    #[test]
    fn test_row_optional_fields() {
        let entry = CatalogEntry::from_row(&row(json!({
            "Diagnosis Code (ICD-10)": "A00.0",
            "Has V28 HCC code": "No",
            "V28 CMS-HCC Model RAF Score": "",
            "Billable": true,
            "Weight": 1.5,
            "Notes": null
        })))
        .unwrap();

        assert_eq!(entry.description, "");
        assert!(!entry.has_v28);
        assert_eq!(entry.raf_score, None);
        assert_eq!(entry.extra["Billable"], "true");
        assert_eq!(entry.extra["Weight"], "1.5");
        assert!(!entry.extra.contains_key("Notes"));
    }

    #[test]
    fn test_catalog_skips_degenerate_rows() {
        let catalog = Catalog::from_rows(vec![
            json!({"Diagnosis Code (ICD-10)": "E11.9", "Description": "Diabetes"}),
            json!({"Description": "no code"}),
            json!("not an object"),
            json!({"Diagnosis Code (ICD-10)": "A00.0", "Description": "Cholera"}),
        ]);
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.skipped_rows(), 2);
        assert_eq!(catalog.get(1).unwrap().code, "A00.0");
    }

    #[test]
    fn test_malformed_json_is_unavailable() {
        let result = Catalog::from_json_slice(b"{\"not\": \"an array\"}");
        assert!(matches!(result, Err(LookupError::CatalogUnavailable(_))));
    }

    #[tokio::test]
    async fn test_load_from_memory() {
        let source = StaticCatalogSource::new(
            r#"[{"Diagnosis Code (ICD-10)": "E11.9", "Description": "Diabetes"}]"#,
        );
        let catalog = load_catalog(&source).await;
        assert_eq!(catalog.len(), 1);
    }

    #[tokio::test]
    async fn test_load_failure_degrades_to_empty() {
        let source = FileCatalogSource::new("/nonexistent/icdData_full.json");
        let catalog = load_catalog(&source).await;
        assert!(catalog.is_empty());

        let source = StaticCatalogSource::new("<html>502 Bad Gateway</html>");
        assert!(load_catalog(&source).await.is_empty());
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("icdData_full.json");
        std::fs::write(
            &path,
            r#"[{"Diagnosis Code (ICD-10)": "I10", "Description": "Essential (primary) hypertension"}]"#,
        )
        .unwrap();

        let catalog = load_catalog(&FileCatalogSource::new(&path)).await;
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.entries()[0].code, "I10");
    }
}
