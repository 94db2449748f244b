use chrono::{DateTime, NaiveDate, NaiveDateTime};
use reversa_domain::entities::table::{Cell, Column, Table};
use reversa_domain::repositories::dataset::{DatasetReport, DatasetRepository};
use serde::Deserialize;
use std::collections::HashSet;
use std::fs::File;
use std::path::Path;
use std::time::Instant;

const DEFAULT_INDEX_NAME: &str = "date";

#[derive(Debug, Default, Clone, Copy)]
pub struct CsvDatasetRepository;

impl CsvDatasetRepository {
    pub fn new() -> Self {
        Self
    }
}

fn record_read_metrics<T>(kind: &'static str, start: Instant, result: &Result<T, String>) {
    let result_label = if result.is_ok() { "ok" } else { "err" };
    metrics::counter!(
        "reversa.infra.dataset.read.calls_total",
        "kind" => kind,
        "result" => result_label
    )
    .increment(1);
    metrics::histogram!("reversa.infra.dataset.read_ms", "kind" => kind, "result" => result_label)
        .record(start.elapsed().as_millis() as f64);
}

impl DatasetRepository for CsvDatasetRepository {
    fn load_table(&self, path: &Path) -> Result<(Table, DatasetReport), String> {
        let start = Instant::now();
        let result = load_csv_table(path);
        record_read_metrics("table_csv", start, &result);
        result
    }

    fn load_importances(&self, path: &Path) -> Result<(Vec<String>, Vec<f64>), String> {
        let start = Instant::now();
        let result = load_importances_csv(path);
        record_read_metrics("importances_csv", start, &result);
        result
    }
}

/// Loads a CSV whose first column is the row index. Header names are
/// trimmed; rows keep their file order.
pub fn load_csv_table(path: &Path) -> Result<(Table, DatasetReport), String> {
    let file = File::open(path)
        .map_err(|err| format!("failed to open dataset CSV {}: {}", path.display(), err))?;
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::Headers)
        .from_reader(file);

    let headers = reader
        .headers()
        .map_err(|err| format!("failed to read CSV header {}: {}", path.display(), err))?
        .clone();
    if headers.is_empty() {
        return Err(format!("dataset CSV {} has no header", path.display()));
    }

    let index_name = match headers.get(0) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => DEFAULT_INDEX_NAME.to_string(),
    };
    let names: Vec<String> = headers.iter().skip(1).map(|h| h.to_string()).collect();

    let mut index = Vec::new();
    let mut cells: Vec<Vec<Cell>> = vec![Vec::new(); names.len()];
    for (row, result) in reader.records().enumerate() {
        let record = result.map_err(|err| {
            format!(
                "failed to parse CSV row {} of {}: {}",
                row + 1,
                path.display(),
                err
            )
        })?;
        index.push(record.get(0).unwrap_or_default().trim().to_string());
        for (col, raw) in record.iter().skip(1).enumerate() {
            cells[col].push(Cell::parse(raw));
        }
    }

    let columns = names
        .into_iter()
        .zip(cells)
        .map(|(name, cells)| Column { name, cells })
        .collect();
    let table = Table::from_columns(index_name, index, columns)
        .map_err(|err| format!("invalid dataset {}: {}", path.display(), err))?;

    let report = index_report(&table);
    tracing::debug!(
        path = %path.display(),
        rows = report.rows,
        columns = report.columns,
        missing_cells = report.missing_cells,
        "loaded dataset"
    );
    Ok((table, report))
}

fn index_report(table: &Table) -> DatasetReport {
    let mut report = DatasetReport {
        rows: table.len(),
        columns: table.columns().len(),
        missing_cells: table.missing_total(),
        ..DatasetReport::default()
    };

    let mut seen = HashSet::new();
    let mut last_ts: Option<i64> = None;
    for value in table.index() {
        if !seen.insert(value.as_str()) {
            report.duplicate_index += 1;
            if report.first_duplicate.is_none() {
                report.first_duplicate = Some(value.clone());
            }
        }

        let Some(ts) = parse_index_timestamp(value) else {
            report.unparsed_index += 1;
            if report.first_unparsed_index.is_none() {
                report.first_unparsed_index = Some(value.clone());
            }
            continue;
        };
        if let Some(prev) = last_ts {
            if ts < prev {
                report.out_of_order += 1;
                if report.first_out_of_order.is_none() {
                    report.first_out_of_order = Some(value.clone());
                }
            }
        }
        last_ts = Some(ts);
    }
    report
}

/// Seconds since the epoch for the index formats found in daily exports.
pub fn parse_index_timestamp(value: &str) -> Option<i64> {
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc().timestamp());
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%m/%d/%Y") {
        return date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc().timestamp());
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.timestamp());
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc().timestamp());
    }
    None
}

#[derive(Debug, Deserialize)]
struct ImportanceRecord {
    feature: String,
    importance: f64,
}

pub fn load_importances_csv(path: &Path) -> Result<(Vec<String>, Vec<f64>), String> {
    let file = File::open(path)
        .map_err(|err| format!("failed to open importances CSV {}: {}", path.display(), err))?;
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(file);

    let mut features = Vec::new();
    let mut importances = Vec::new();
    for result in reader.deserialize::<ImportanceRecord>() {
        let record = result.map_err(|err| format!("failed to parse importances row: {}", err))?;
        features.push(record.feature);
        importances.push(record.importance);
    }
    Ok((features, importances))
}
