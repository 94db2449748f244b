use crate::entities::table::Table;
use crate::value_objects::trade_event::TradeEvent;
use std::path::Path;

pub trait ArtifactWriter {
    fn ensure_dir(&self, path: &Path) -> Result<(), String>;
    fn write_table_csv(&self, path: &Path, table: &Table) -> Result<(), String>;
    fn write_events_csv(&self, path: &Path, events: &[TradeEvent]) -> Result<(), String>;
    fn write_events_jsonl(&self, path: &Path, events: &[TradeEvent]) -> Result<(), String>;
    fn write_summary_json(&self, path: &Path, summary: &serde_json::Value) -> Result<(), String>;
    fn write_config_snapshot_toml(&self, path: &Path, contents: &str) -> Result<(), String>;
}
