//! Embedded ICD-10 sample catalog.
//!
//! A few dozen real diagnosis codes with V28 flags, in the same row shape as
//! the production `icdData_full.json` feed. RAF scores are sample values for
//! demos and tests, not a billing reference.

use once_cell::sync::Lazy;
use serde_json::{Map, Value};

const SAMPLE_CSV: &str = include_str!("../data/icd10_sample.csv");

static ROWS: Lazy<Vec<Value>> = Lazy::new(|| {
    parse_rows(SAMPLE_CSV).unwrap_or_else(|e| {
        eprintln!("Warning: Failed to parse embedded ICD-10 sample: {}", e);
        Vec::new()
    })
});

static ROWS_JSON: Lazy<String> =
    Lazy::new(|| serde_json::to_string(&*ROWS).unwrap_or_else(|_| "[]".to_string()));

/// Convert CSV records into flat JSON objects keyed by header name.
/// Empty cells are omitted, as the feed omits absent scores.
fn parse_rows(csv_text: &str) -> Result<Vec<Value>, csv::Error> {
    let mut reader = csv::Reader::from_reader(csv_text.as_bytes());
    let headers = reader.headers()?.clone();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let row: Map<String, Value> = headers
            .iter()
            .zip(record.iter())
            .filter(|(_, cell)| !cell.is_empty())
            .map(|(name, cell)| (name.to_string(), Value::String(cell.to_string())))
            .collect();
        rows.push(Value::Object(row));
    }
    Ok(rows)
}

/// Sample rows in feed order
pub fn catalog_rows() -> &'static [Value] {
    &ROWS
}

/// Sample rows serialized as the JSON array the app downloads
pub fn catalog_json() -> &'static str {
    &ROWS_JSON
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_parses() {
        let rows = parse_rows(SAMPLE_CSV).unwrap();
        assert_eq!(rows.len(), catalog_rows().len());
        assert!(rows.len() >= 40);
    }

    #[test]
    fn test_rows_use_feed_field_names() {
        let first = catalog_rows()[0].as_object().unwrap();
        assert_eq!(first["Diagnosis Code (ICD-10)"], "E11.9");
        assert_eq!(first["Has V28 HCC code"], "Yes");
        assert_eq!(first["V28 CMS-HCC Model RAF Score"], "0.166");
    }

    #[test]
    fn test_empty_cells_are_omitted() {
        let cholera = catalog_rows()[1].as_object().unwrap();
        assert_eq!(cholera["Description"], "Cholera due to Vibrio cholerae 01, biovar cholerae");
        assert!(!cholera.contains_key("V28 CMS-HCC Model RAF Score"));
    }

    #[test]
    fn test_json_round_trips_row_count() {
        let parsed: Vec<Value> = serde_json::from_str(catalog_json()).unwrap();
        assert_eq!(parsed.len(), catalog_rows().len());
    }
}
