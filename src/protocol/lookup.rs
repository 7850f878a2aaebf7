//! # Lookup Table
//!
//! The server's static record set. Records are read once from a JSON array and are
//! never mutated afterwards, so a table can be shared behind an `Arc` without locks.
//!
//! Queries are a linear scan with full, case-sensitive equality on
//! `(record_type, name)`. When the source contains duplicates the first record in
//! file order wins.
//!
//! ## Source format
//! ```json
//! [
//!   { "Type": "A",  "Name": "www.outlook.com", "Value": "192.168.1.1", "TTL": 3600 },
//!   { "record_type": "MX", "name": "example.com", "value": "mail.example.com", "priority": 10 }
//! ]
//! ```

use crate::error::{ProtocolError, Result};
use crate::protocol::message::{LookupQuery, LookupRecord};
use std::fs;
use std::path::Path;
use tracing::{debug, info, instrument};

/// Read-only record set
#[derive(Debug, Clone, Default)]
pub struct LookupTable {
    records: Vec<LookupRecord>,
}

impl LookupTable {
    /// Load the record set from a JSON file
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).map_err(|e| {
            ProtocolError::LoadError(format!(
                "Failed to read lookup table {}: {e}",
                path.as_ref().display()
            ))
        })?;

        let table = Self::from_json(&content)?;
        info!(records = table.len(), "Lookup table loaded");
        Ok(table)
    }

    /// Parse the record set from a JSON array
    pub fn from_json(content: &str) -> Result<Self> {
        let records: Vec<LookupRecord> = serde_json::from_str(content)
            .map_err(|e| ProtocolError::LoadError(format!("Malformed lookup table: {e}")))?;
        Ok(Self { records })
    }

    /// Build a table from records already in memory
    pub fn from_records(records: Vec<LookupRecord>) -> Self {
        Self { records }
    }

    /// A table that answers every query with `NotFound`
    pub fn empty() -> Self {
        Self::default()
    }

    /// Find the record for `(record_type, name)`
    pub fn query(&self, record_type: &str, name: &str) -> Result<&LookupRecord> {
        let found = self
            .records
            .iter()
            .find(|record| record.matches(record_type, name));

        match found {
            Some(record) => {
                debug!(record_type, name, value = %record.value, "Lookup hit");
                Ok(record)
            }
            None => {
                debug!(record_type, name, "Lookup miss");
                Err(ProtocolError::NotFound {
                    record_type: record_type.to_string(),
                    name: name.to_string(),
                })
            }
        }
    }

    /// Same as [`query`](Self::query) with the key taken from a [`LookupQuery`]
    pub fn resolve(&self, query: &LookupQuery) -> Result<&LookupRecord> {
        self.query(&query.record_type, &query.name)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[LookupRecord] {
        &self.records
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use std::io::Write;

    const RECORDS: &str = r#"[
        {"Type": "A", "Name": "www.outlook.com", "Value": "192.168.1.1", "TTL": 3600},
        {"Type": "MX", "Name": "example.com", "Value": "mail.example.com", "TTL": 3600, "Priority": 10},
        {"Type": "A", "Name": "dup.example.com", "Value": "10.0.0.1"},
        {"Type": "A", "Name": "dup.example.com", "Value": "10.0.0.2"}
    ]"#;

    #[test]
    fn test_query_exact_match() {
        let table = LookupTable::from_json(RECORDS).unwrap();
        let record = table.query("A", "www.outlook.com").unwrap();
        assert_eq!(record.value, "192.168.1.1");
        assert_eq!(record.ttl, Some(3600));
    }

    #[test]
    fn test_query_requires_both_keys() {
        let table = LookupTable::from_json(RECORDS).unwrap();
        assert!(table.query("MX", "www.outlook.com").is_err());
        assert!(table.query("A", "example.com").is_err());
    }

    #[test]
    fn test_query_is_case_sensitive() {
        let table = LookupTable::from_json(RECORDS).unwrap();
        assert!(matches!(
            table.query("a", "www.outlook.com"),
            Err(ProtocolError::NotFound { .. })
        ));
        assert!(table.query("A", "WWW.OUTLOOK.COM").is_err());
    }

    #[test]
    fn test_first_duplicate_wins() {
        let table = LookupTable::from_json(RECORDS).unwrap();
        assert_eq!(table.query("A", "dup.example.com").unwrap().value, "10.0.0.1");
    }

    #[test]
    fn test_empty_table_misses_everything() {
        let table = LookupTable::empty();
        assert!(table.is_empty());
        assert!(table.resolve(&LookupQuery::new("A", "www.outlook.com")).is_err());
    }

    #[test]
    fn test_malformed_source() {
        assert!(matches!(
            LookupTable::from_json("{\"not\": \"a list\"}"),
            Err(ProtocolError::LoadError(_))
        ));
        assert!(matches!(
            LookupTable::from_json("[{\"Type\": \"A\"}]"),
            Err(ProtocolError::LoadError(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(RECORDS.as_bytes()).unwrap();

        let table = LookupTable::load(file.path()).unwrap();
        assert_eq!(table.len(), 4);
    }

    #[test]
    fn test_load_missing_file() {
        let result = LookupTable::load("/definitely/not/here/records.json");
        assert!(matches!(result, Err(ProtocolError::LoadError(_))));
    }
}
