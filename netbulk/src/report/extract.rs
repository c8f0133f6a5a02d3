//! Field extraction from result artifacts.

use std::path::Path;

use indexmap::IndexMap;
use quick_xml::Reader;
use quick_xml::events::Event;
use regex::{Regex, RegexBuilder};
use serde_json::Value;

use crate::error::ReportError;

/// Column holding the device identity.
pub const DEVICE_COLUMN: &str = "Device_IP";

/// Placeholder for a regex that did not match.
pub const NO_MATCH: &str = "N/A";

/// One report row: column to value, device identity first.
pub type ReportRow = IndexMap<String, String>;

/// Column name and pattern from a regex mapping file.
#[derive(Debug, Clone)]
pub struct FieldPattern {
    pub column: String,
    pub pattern: Regex,
}

fn new_row(device: &str) -> ReportRow {
    let mut row = ReportRow::new();
    row.insert(DEVICE_COLUMN.to_string(), device.to_string());
    row
}

/// Flatten a JSON object artifact. Non-object documents yield `None`.
pub fn json_row(device: &str, content: &str) -> Option<ReportRow> {
    let Value::Object(map) = serde_json::from_str::<Value>(content).ok()? else {
        return None;
    };

    let mut row = new_row(device);
    flatten_into(&mut row, None, &map);
    Some(row)
}

fn flatten_into(row: &mut ReportRow, prefix: Option<&str>, map: &serde_json::Map<String, Value>) {
    for (key, value) in map {
        let column = match prefix {
            Some(prefix) => format!("{prefix}.{key}"),
            None => key.clone(),
        };
        if column == DEVICE_COLUMN {
            continue;
        }

        match value {
            Value::Object(nested) => flatten_into(row, Some(&column), nested),
            Value::Null => {
                row.insert(column, String::new());
            }
            Value::String(s) => {
                row.insert(column, s.clone());
            }
            other => {
                row.insert(column, other.to_string());
            }
        }
    }
}

/// Collect the root's childless children of an XML artifact.
pub fn xml_row(device: &str, content: &str) -> Option<ReportRow> {
    struct Leaf {
        tag: String,
        text: String,
        has_children: bool,
    }

    let mut reader = Reader::from_str(content);
    let mut row = new_row(device);
    let mut depth = 0usize;
    let mut current: Option<Leaf> = None;
    let mut saw_root = false;

    loop {
        match reader.read_event().ok()? {
            Event::Start(e) => {
                match depth {
                    0 => saw_root = true,
                    1 => {
                        current = Some(Leaf {
                            tag: String::from_utf8_lossy(e.local_name().as_ref()).into_owned(),
                            text: String::new(),
                            has_children: false,
                        });
                    }
                    _ => {
                        if let Some(leaf) = current.as_mut() {
                            leaf.has_children = true;
                        }
                    }
                }
                depth += 1;
            }
            Event::Empty(e) => match depth {
                0 => saw_root = true,
                1 => {
                    let tag = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                    row.insert(tag, String::new());
                }
                _ => {
                    if let Some(leaf) = current.as_mut() {
                        leaf.has_children = true;
                    }
                }
            },
            Event::Text(t) if depth == 2 => {
                if let Some(leaf) = current.as_mut() {
                    leaf.text.push_str(&t.unescape().ok()?);
                }
            }
            Event::CData(t) if depth == 2 => {
                if let Some(leaf) = current.as_mut() {
                    leaf.text.push_str(&String::from_utf8_lossy(&t));
                }
            }
            Event::End(_) => {
                depth = depth.checked_sub(1)?;
                if depth == 1 {
                    if let Some(leaf) = current.take().filter(|leaf| !leaf.has_children) {
                        row.insert(leaf.tag, leaf.text.trim().to_string());
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    (saw_root && depth == 0).then_some(row)
}

/// Apply every pattern to a text artifact. First match wins; the first
/// capture group is preferred over the whole match.
pub fn text_row(device: &str, content: &str, patterns: &[FieldPattern]) -> ReportRow {
    let mut row = new_row(device);
    for field in patterns {
        let value = match field.pattern.captures(content) {
            Some(caps) if caps.len() > 1 => caps
                .get(1)
                .map(|m| m.as_str().to_string())
                .unwrap_or_default(),
            Some(caps) => caps
                .get(0)
                .map(|m| m.as_str().to_string())
                .unwrap_or_default(),
            None => NO_MATCH.to_string(),
        };
        row.insert(field.column.clone(), value);
    }
    row
}

/// Load a regex mapping CSV with `Column` and `Regex` headers.
pub fn load_patterns(path: &Path) -> Result<Vec<FieldPattern>, ReportError> {
    let source_error = |message: String| ReportError::RegexSource(format!("{}: {message}", path.display()));

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(|e| source_error(e.to_string()))?;

    let headers = reader
        .headers()
        .map_err(|e| source_error(e.to_string()))?
        .clone();
    let position = |name: &str| {
        headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(name))
            .ok_or_else(|| source_error(format!("missing '{name}' column")))
    };
    let column_index = position("Column")?;
    let regex_index = position("Regex")?;

    let mut patterns = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| source_error(e.to_string()))?;
        let column = record.get(column_index).unwrap_or("").trim();
        let regex = record.get(regex_index).unwrap_or("");
        if column.is_empty() || regex.is_empty() {
            continue;
        }

        let pattern = RegexBuilder::new(regex)
            .multi_line(true)
            .build()
            .map_err(|e| source_error(format!("column '{column}': {e}")))?;
        patterns.push(FieldPattern {
            column: column.to_string(),
            pattern,
        });
    }
    Ok(patterns)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pattern(column: &str, regex: &str) -> FieldPattern {
        FieldPattern {
            column: column.to_string(),
            pattern: RegexBuilder::new(regex).multi_line(true).build().unwrap(),
        }
    }

    #[test]
    fn test_json_row_flattens() {
        let row = json_row(
            "10.0.0.1",
            r#"{"version": "1.2", "chassis": {"model": "mx480", "slots": 6}, "ports": [1, 2], "Device_IP": "spoofed", "serial": null}"#,
        )
        .unwrap();

        let columns: Vec<&str> = row.keys().map(String::as_str).collect();
        assert_eq!(
            columns,
            vec!["Device_IP", "version", "chassis.model", "chassis.slots", "ports", "serial"]
        );
        assert_eq!(row["Device_IP"], "10.0.0.1");
        assert_eq!(row["chassis.slots"], "6");
        assert_eq!(row["ports"], "[1,2]");
        assert_eq!(row["serial"], "");
    }

    #[test]
    fn test_json_row_skips_non_objects() {
        assert!(json_row("r1", "[1, 2, 3]").is_none());
        assert!(json_row("r1", "not json").is_none());
    }

    #[test]
    fn test_xml_row_takes_leaf_children() {
        let row = xml_row(
            "r1",
            r#"<?xml version="1.0"?>
<software-information>
    <host-name>r1</host-name>
    <product-model>mx480</product-model>
    <package-information>
        <name>os-kernel</name>
    </package-information>
    <junos-version/>
</software-information>"#,
        )
        .unwrap();

        let columns: Vec<&str> = row.keys().map(String::as_str).collect();
        assert_eq!(
            columns,
            vec!["Device_IP", "host-name", "product-model", "junos-version"]
        );
        assert_eq!(row["host-name"], "r1");
        assert_eq!(row["junos-version"], "");
    }

    #[test]
    fn test_xml_row_rejects_malformed() {
        assert!(xml_row("r1", "<a><b>1</b>").is_none());
        assert!(xml_row("r1", "plain text").is_none());
    }

    #[test]
    fn test_text_row_capture_rules() {
        let content = "Cisco IOS Software, Version 15.2(4)M\nrouter uptime is 3 weeks\nSerial: FTX123\n";
        let row = text_row(
            "r1",
            content,
            &[
                pattern("version", r"Version (\S+)"),
                pattern("uptime_line", r"^.*uptime.*$"),
                pattern("license", r"License: (\S+)"),
                pattern("serial", r"^Serial: (\w+)$"),
            ],
        );

        assert_eq!(row["version"], "15.2(4)M");
        assert_eq!(row["uptime_line"], "router uptime is 3 weeks");
        assert_eq!(row["license"], NO_MATCH);
        assert_eq!(row["serial"], "FTX123");
    }

    #[test]
    fn test_text_row_first_match_only() {
        let row = text_row(
            "r1",
            "Gi0/1 up\nGi0/2 down\n",
            &[pattern("first_if", r"^(Gi\S+)")],
        );
        assert_eq!(row["first_if"], "Gi0/1");
    }

    #[test]
    fn test_load_patterns() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("regex.csv");
        std::fs::write(&path, "Column,Regex\nversion,Version (\\S+)\n,ignored\nserial,^SN: (\\w+)$\n")
            .unwrap();

        let patterns = load_patterns(&path).unwrap();
        assert_eq!(patterns.len(), 2);
        assert_eq!(patterns[0].column, "version");
        assert!(patterns[1].pattern.is_match("x\nSN: ABC\ny"));
    }

    #[test]
    fn test_load_patterns_errors() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("regex.csv");

        std::fs::write(&path, "Name,Pattern\nversion,x\n").unwrap();
        assert!(matches!(load_patterns(&path), Err(ReportError::RegexSource(_))));

        std::fs::write(&path, "Column,Regex\nversion,(unclosed\n").unwrap();
        assert!(matches!(load_patterns(&path), Err(ReportError::RegexSource(_))));
    }
}
