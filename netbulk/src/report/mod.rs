//! Report engine: aggregate saved artifacts into one CSV table.
//!
//! Every artifact of the requested format in the results directory
//! becomes one row keyed by `Device_IP` (the artifact's file stem).
//! Columns are the union of all extracted fields in first-seen order.
//!
//! | Format | Extraction                                               |
//! |--------|----------------------------------------------------------|
//! | JSON   | object flattened to dotted keys (`chassis.model`)        |
//! | XML    | root's childless children, tag to text                   |
//! | Text   | one column per regex mapping entry, `N/A` when unmatched |
//!
//! Artifacts that do not parse are skipped.

mod extract;

pub use extract::{
    DEVICE_COLUMN, FieldPattern, NO_MATCH, ReportRow, json_row, load_patterns, text_row, xml_row,
};

use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexSet;
use log::{debug, info};

use crate::config::{OutputFormat, RunParameters};
use crate::error::ReportError;

/// What to aggregate and where to write it.
#[derive(Debug, Clone)]
pub struct ReportRequest {
    pub format: OutputFormat,
    pub regex_source: Option<PathBuf>,
    pub results_dir: PathBuf,
    pub output_dir: PathBuf,
}

impl ReportRequest {
    pub fn new(format: OutputFormat, results_dir: impl Into<PathBuf>) -> Self {
        Self {
            format,
            regex_source: None,
            results_dir: results_dir.into(),
            output_dir: PathBuf::from("."),
        }
    }

    pub fn with_regex_source(mut self, path: impl Into<PathBuf>) -> Self {
        self.regex_source = Some(path.into());
        self
    }

    pub fn with_output_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_dir = path.into();
        self
    }

    /// Request matching a run's settings.
    pub fn for_run(params: &RunParameters) -> Self {
        Self {
            format: params.format(),
            regex_source: params.regex_source().map(Path::to_path_buf),
            results_dir: params.results_dir().to_path_buf(),
            output_dir: params.report_dir().to_path_buf(),
        }
    }

    /// Path of the report file this request produces.
    pub fn output_path(&self) -> PathBuf {
        self.output_dir
            .join(format!("Final_Report_{}.csv", self.format.label()))
    }
}

/// A written report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportSummary {
    pub path: PathBuf,
    pub rows: usize,
}

impl std::fmt::Display for ReportSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Saved {} ({} devices)", self.path.display(), self.rows)
    }
}

/// Build the report described by `request`.
pub fn build_report(request: &ReportRequest) -> Result<ReportSummary, ReportError> {
    let patterns = match (request.format, request.regex_source.as_deref()) {
        (OutputFormat::Text, None) => return Err(ReportError::RegexSourceMissing),
        (OutputFormat::Text, Some(path)) => load_patterns(path)?,
        _ => Vec::new(),
    };

    if !request.results_dir.is_dir() {
        return Err(ReportError::NoResults);
    }

    let mut rows = Vec::new();
    for path in artifacts(&request.results_dir, request.format)? {
        let Some(device) = path.file_stem().map(|s| s.to_string_lossy().into_owned()) else {
            continue;
        };

        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) => {
                debug!("Skipping {}: {e}", path.display());
                continue;
            }
        };

        let row = match request.format {
            OutputFormat::Json => json_row(&device, &content),
            OutputFormat::Xml => xml_row(&device, &content),
            OutputFormat::Text => Some(text_row(&device, &content, &patterns)),
        };
        match row {
            Some(row) => rows.push(row),
            None => debug!("Skipping {}: not a usable {} document", path.display(), request.format),
        }
    }

    if rows.is_empty() {
        return Err(ReportError::NoData);
    }

    fs::create_dir_all(&request.output_dir)?;
    let path = request.output_path();
    write_table(&path, &rows)?;

    info!("Report written to {} ({} rows)", path.display(), rows.len());
    Ok(ReportSummary {
        path,
        rows: rows.len(),
    })
}

/// Artifacts of `format` in `dir`, sorted by file name.
fn artifacts(dir: &Path, format: OutputFormat) -> Result<Vec<PathBuf>, ReportError> {
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let matches = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case(format.extension()));
        if matches && path.is_file() {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

fn write_table(path: &Path, rows: &[ReportRow]) -> Result<(), ReportError> {
    let columns: IndexSet<&str> = rows
        .iter()
        .flat_map(|row| row.keys().map(String::as_str))
        .collect();

    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(&columns)?;
    for row in rows {
        writer.write_record(
            columns
                .iter()
                .map(|column| row.get(*column).map(String::as_str).unwrap_or("")),
        )?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn read_csv(path: &Path) -> Vec<Vec<String>> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_path(path)
            .unwrap();
        reader
            .records()
            .map(|r| r.unwrap().iter().map(str::to_string).collect())
            .collect()
    }

    #[test]
    fn test_json_report_union_of_columns() {
        let dir = TempDir::new().unwrap();
        let results = dir.path().join("results");
        fs::create_dir(&results).unwrap();
        fs::write(results.join("10.0.0.1.json"), r#"{"version": "1.2"}"#).unwrap();
        fs::write(
            results.join("10.0.0.2.json"),
            r#"{"version": "1.3", "chassis": {"model": "n9k"}}"#,
        )
        .unwrap();
        fs::write(results.join("10.0.0.3.json"), "[1, 2]").unwrap();
        fs::write(results.join("notes.txt"), "ignored").unwrap();

        let request = ReportRequest::new(OutputFormat::Json, &results).with_output_dir(dir.path());
        let summary = build_report(&request).unwrap();

        assert_eq!(summary.rows, 2);
        assert_eq!(summary.path, dir.path().join("Final_Report_JSON.csv"));
        assert_eq!(
            read_csv(&summary.path),
            vec![
                vec!["Device_IP", "version", "chassis.model"],
                vec!["10.0.0.1", "1.2", ""],
                vec!["10.0.0.2", "1.3", "n9k"],
            ]
        );
    }

    #[test]
    fn test_xml_report() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("r1.xml"),
            "<?xml version=\"1.0\"?>\n<info>\n    <model>mx480</model>\n    <serial>JN1</serial>\n</info>\n",
        )
        .unwrap();
        fs::write(dir.path().join("r2.xml"), "<info><model>").unwrap();

        let request = ReportRequest::new(OutputFormat::Xml, dir.path()).with_output_dir(dir.path());
        let summary = build_report(&request).unwrap();

        assert_eq!(summary.rows, 1);
        assert_eq!(
            read_csv(&summary.path),
            vec![vec!["Device_IP", "model", "serial"], vec!["r1", "mx480", "JN1"]]
        );
    }

    #[test]
    fn test_text_report() {
        let dir = TempDir::new().unwrap();
        let results = dir.path().join("results");
        fs::create_dir(&results).unwrap();
        fs::write(results.join("sw1.txt"), "Version 15.2\nuptime is 3 weeks\n").unwrap();
        fs::write(results.join("sw2.txt"), "Version 16.9\n").unwrap();
        let regex = dir.path().join("regex.csv");
        fs::write(&regex, "Column,Regex\nversion,^Version (\\S+)$\nuptime,uptime is (.+)\n").unwrap();

        let request = ReportRequest::new(OutputFormat::Text, &results)
            .with_regex_source(&regex)
            .with_output_dir(dir.path());
        let summary = build_report(&request).unwrap();

        assert_eq!(summary.path, dir.path().join("Final_Report_Text.csv"));
        assert_eq!(
            read_csv(&summary.path),
            vec![
                vec!["Device_IP", "version", "uptime"],
                vec!["sw1", "15.2", "3 weeks"],
                vec!["sw2", "16.9", "N/A"],
            ]
        );
    }

    #[test]
    fn test_text_report_without_regex() {
        let dir = TempDir::new().unwrap();
        let request = ReportRequest::new(OutputFormat::Text, dir.path().join("missing"));
        assert!(matches!(
            build_report(&request),
            Err(ReportError::RegexSourceMissing)
        ));
    }

    #[test]
    fn test_missing_results_dir() {
        let dir = TempDir::new().unwrap();
        let request = ReportRequest::new(OutputFormat::Json, dir.path().join("missing"));
        let err = build_report(&request).unwrap_err();
        assert!(matches!(err, ReportError::NoResults));
        assert_eq!(err.to_string(), "No results folder found.");
    }

    #[test]
    fn test_no_usable_artifacts() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("r1.json"), "garbage").unwrap();

        let request = ReportRequest::new(OutputFormat::Json, dir.path()).with_output_dir(dir.path());
        assert!(matches!(build_report(&request), Err(ReportError::NoData)));
        assert!(!request.output_path().exists());
    }
}
