use crate::reporting;
use reversa_domain::entities::table::Table;
use reversa_domain::repositories::artifacts::ArtifactWriter;
use reversa_domain::value_objects::trade_event::TradeEvent;
use std::fs;
use std::path::Path;
use std::time::Instant;

#[derive(Debug, Default, Clone, Copy)]
pub struct FilesystemArtifactWriter;

impl FilesystemArtifactWriter {
    pub fn new() -> Self {
        Self
    }
}

fn record_write_metrics(kind: &'static str, start: Instant, result: &Result<(), String>) {
    let result_label = if result.is_ok() { "ok" } else { "err" };
    metrics::counter!(
        "reversa.infra.artifacts.write.calls_total",
        "kind" => kind,
        "result" => result_label
    )
    .increment(1);
    metrics::histogram!("reversa.infra.artifacts.write_ms", "kind" => kind, "result" => result_label)
        .record(start.elapsed().as_millis() as f64);
}

impl ArtifactWriter for FilesystemArtifactWriter {
    fn ensure_dir(&self, path: &Path) -> Result<(), String> {
        let start = Instant::now();
        let result = fs::create_dir_all(path)
            .map_err(|err| format!("failed to create dir {}: {}", path.display(), err));
        record_write_metrics("ensure_dir", start, &result);
        result
    }

    fn write_table_csv(&self, path: &Path, table: &Table) -> Result<(), String> {
        let start = Instant::now();
        let result = reporting::write_table_csv(path, table);
        record_write_metrics("table_csv", start, &result);
        result
    }

    fn write_events_csv(&self, path: &Path, events: &[TradeEvent]) -> Result<(), String> {
        let start = Instant::now();
        let result = reporting::write_events_csv(path, events);
        record_write_metrics("events_csv", start, &result);
        result
    }

    fn write_events_jsonl(&self, path: &Path, events: &[TradeEvent]) -> Result<(), String> {
        let start = Instant::now();
        let result = reporting::write_events_jsonl(path, events);
        record_write_metrics("events_jsonl", start, &result);
        result
    }

    fn write_summary_json(&self, path: &Path, summary: &serde_json::Value) -> Result<(), String> {
        let start = Instant::now();
        let result = reporting::write_summary_json(path, summary);
        record_write_metrics("summary_json", start, &result);
        result
    }

    fn write_config_snapshot_toml(&self, path: &Path, contents: &str) -> Result<(), String> {
        let start = Instant::now();
        let result = fs::write(path, contents).map_err(|err| {
            format!(
                "failed to write config snapshot {}: {}",
                path.display(),
                err
            )
        });
        record_write_metrics("config_snapshot_toml", start, &result);
        result
    }
}
