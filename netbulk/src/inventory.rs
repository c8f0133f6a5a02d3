//! Device inventory loaded from a CSV file with a header row.
//!
//! Headers are normalized (trimmed, lowercased, spaces become
//! underscores) so `Device Type` and `device_type` name the same field.

use std::io;
use std::path::Path;

use indexmap::IndexMap;
use serde::Serialize;

use crate::error::{InventoryError, Result};

/// Port used when a row does not name one.
pub const DEFAULT_PORT: u16 = 22;

/// One inventory row: normalized column name to cell value.
///
/// Every header column is present. Blank cells hold `""`: accessors treat
/// them as absent, while templates render them as empty text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct InventoryRow {
    fields: IndexMap<String, String>,
}

impl InventoryRow {
    /// Build a row from column/value pairs, normalizing column names.
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut fields = IndexMap::new();
        for (key, value) in pairs {
            fields.insert(normalize_header(key.as_ref()), value.as_ref().trim().to_string());
        }
        Self { fields }
    }

    /// Get a non-empty field.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields
            .get(field)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    /// Reachability field: `ip`, falling back to `host`.
    pub fn host(&self) -> Option<&str> {
        self.get("ip").or_else(|| self.get("host"))
    }

    /// Connect port, [`DEFAULT_PORT`] when absent.
    ///
    /// Spreadsheet exports often write whole numbers as `22.0`; that form
    /// is accepted too.
    pub fn port(&self) -> Result<u16> {
        let Some(raw) = self.get("port") else {
            return Ok(DEFAULT_PORT);
        };

        let digits = raw.strip_suffix(".0").unwrap_or(raw);
        digits
            .parse::<u16>()
            .ok()
            .filter(|port| *port != 0)
            .ok_or_else(|| {
                InventoryError::InvalidPort {
                    value: raw.to_string(),
                }
                .into()
            })
    }

    /// Platform name given by the row itself.
    pub fn device_type(&self) -> Option<&str> {
        self.get("device_type")
    }

    /// Number of non-empty fields.
    pub fn len(&self) -> usize {
        self.fields.values().filter(|value| !value.is_empty()).count()
    }

    /// Check whether every cell was empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Normalize a column header.
pub fn normalize_header(header: &str) -> String {
    header.trim().replace(' ', "_").to_lowercase()
}

/// Load an inventory file.
pub fn load_inventory(path: impl AsRef<Path>) -> Result<Vec<InventoryRow>> {
    let reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(InventoryError::Csv)?;
    collect_rows(reader)
}

/// Read an inventory from any reader.
pub fn read_inventory<R: io::Read>(reader: R) -> Result<Vec<InventoryRow>> {
    let reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);
    collect_rows(reader)
}

fn collect_rows<R: io::Read>(mut reader: csv::Reader<R>) -> Result<Vec<InventoryRow>> {
    let headers = reader.headers().map_err(InventoryError::Csv)?.clone();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(InventoryError::Csv)?;
        // Short records leave trailing columns blank.
        let cells = record.iter().chain(std::iter::repeat(""));
        rows.push(InventoryRow::from_pairs(headers.iter().zip(cells)));
    }
    Ok(rows)
}
