use reversa_application::backtesting::run_backtest;
use reversa_application::config::Config;
use reversa_application::importances::rank_from_file;
use reversa_application::preparing::run_prepare;
use reversa_application::validation::validate;
use reversa_domain::entities::table::{Cell, Column, Table};
use reversa_domain::repositories::artifacts::ArtifactWriter;
use reversa_domain::repositories::dataset::{DatasetReport, DatasetRepository};
use reversa_domain::value_objects::trade_event::TradeEvent;
use reversa_infrastructure::artifacts::FilesystemArtifactWriter;
use reversa_infrastructure::dataset::CsvDatasetRepository;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

fn unique_tmp_dir(prefix: &str) -> PathBuf {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    let dir = std::env::temp_dir().join(format!(
        "reversa_{prefix}_{}_{}",
        std::process::id(),
        now
    ));
    fs::create_dir_all(&dir).expect("create tmp dir");
    dir
}

#[derive(Default)]
struct FakeDatasetRepo {
    tables: HashMap<PathBuf, (Table, DatasetReport)>,
    importances: (Vec<String>, Vec<f64>),
}

impl FakeDatasetRepo {
    fn with_table(mut self, path: &Path, table: Table, report: DatasetReport) -> Self {
        self.tables.insert(path.to_path_buf(), (table, report));
        self
    }
}

impl DatasetRepository for FakeDatasetRepo {
    fn load_table(&self, path: &Path) -> Result<(Table, DatasetReport), String> {
        self.tables
            .get(path)
            .cloned()
            .ok_or_else(|| format!("no table at {}", path.display()))
    }

    fn load_importances(&self, _path: &Path) -> Result<(Vec<String>, Vec<f64>), String> {
        Ok(self.importances.clone())
    }
}

#[derive(Default)]
struct RecordingWriter {
    ensured_dirs: RefCell<Vec<PathBuf>>,
    tables_written: RefCell<Vec<(String, Table)>>,
    events_csv: RefCell<Option<Vec<TradeEvent>>>,
    events_jsonl: RefCell<Option<usize>>,
    summary_written: RefCell<Option<serde_json::Value>>,
    config_snapshot: RefCell<Option<String>>,
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .and_then(|name| name.to_str())
        .unwrap_or_default()
        .to_string()
}

impl ArtifactWriter for RecordingWriter {
    fn ensure_dir(&self, path: &Path) -> Result<(), String> {
        self.ensured_dirs.borrow_mut().push(path.to_path_buf());
        Ok(())
    }

    fn write_table_csv(&self, path: &Path, table: &Table) -> Result<(), String> {
        self.tables_written
            .borrow_mut()
            .push((file_name(path), table.clone()));
        Ok(())
    }

    fn write_events_csv(&self, _path: &Path, events: &[TradeEvent]) -> Result<(), String> {
        *self.events_csv.borrow_mut() = Some(events.to_vec());
        Ok(())
    }

    fn write_events_jsonl(&self, _path: &Path, events: &[TradeEvent]) -> Result<(), String> {
        *self.events_jsonl.borrow_mut() = Some(events.len());
        Ok(())
    }

    fn write_summary_json(&self, _path: &Path, summary: &serde_json::Value) -> Result<(), String> {
        *self.summary_written.borrow_mut() = Some(summary.clone());
        Ok(())
    }

    fn write_config_snapshot_toml(&self, _path: &Path, contents: &str) -> Result<(), String> {
        *self.config_snapshot.borrow_mut() = Some(contents.to_string());
        Ok(())
    }
}

fn text(values: &[&str]) -> Vec<Cell> {
    values.iter().map(|v| Cell::Text(v.to_string())).collect()
}

fn numbers(values: &[Option<f64>]) -> Vec<Cell> {
    values.iter().map(|v| Cell::from_option(*v)).collect()
}

fn table(index: &[&str], columns: Vec<(&str, Vec<Cell>)>) -> Table {
    Table::from_columns(
        "date",
        index.iter().map(|i| i.to_string()).collect(),
        columns
            .into_iter()
            .map(|(name, cells)| Column {
                name: name.to_string(),
                cells,
            })
            .collect(),
    )
    .expect("table")
}

/// Small schema: one raw price column, one label column, one derived feature.
const SMALL_PIPELINE: &str = r#"
[pipeline]
features_to_use = ["close", "close_chg"]
columns_of_interest = ["close"]
target = "label"
categorical_columns = ["label"]
thousands_columns = []
interpolate_columns = ["close"]
derived = [{ kind = "pct_change", source = "close", name = "close_chg" }]
drop_columns = []
"#;

fn config_toml(data_path: &Path, extra: &str) -> String {
    format!(
        r#"
[run]
run_id = "test_run"
init_value = 100.0
init_price = 10.0

[paths]
data_path = "{}"
out_dir = "runs"
{extra}
"#,
        data_path.display()
    )
}

fn parse(toml_str: &str) -> Config {
    toml::from_str(toml_str).expect("config should parse")
}

fn raw_table() -> Table {
    table(
        &["2021-01-04", "2021-01-05", "2021-01-06", "2021-01-07"],
        vec![
            (
                "close",
                numbers(&[Some(10.0), None, Some(20.0), Some(40.0)]),
            ),
            ("label", text(&["BUY", "WAIT", "SELL", "BUY"])),
        ],
    )
}

#[test]
fn backtest_from_signals_file_writes_all_artifacts() {
    let dir = unique_tmp_dir("uc_signals");
    let signals_path = dir.join("signals.csv");
    fs::write(&signals_path, "date,close,Target\n").expect("write signals stub");

    let toml_str = config_toml(
        Path::new("unused.csv"),
        &format!("signals_path = \"{}\"\n", signals_path.display()),
    );
    let config = parse(&toml_str);

    let signals = table(
        &["2021-03-01", "2021-03-02", "2021-03-03"],
        vec![
            ("close", numbers(&[Some(10.0), Some(20.0), Some(30.0)])),
            ("Target", text(&["BUY", "SELL", "HOLD"])),
        ],
    );
    let repo = FakeDatasetRepo::default().with_table(
        &signals_path,
        signals,
        DatasetReport::default(),
    );
    let writer = RecordingWriter::default();

    let run = run_backtest(&config, &toml_str, None, &repo, &writer).expect("backtest");

    assert_eq!(run.run_dir, PathBuf::from("runs").join("test_run"));
    assert_eq!(*writer.ensured_dirs.borrow(), vec![run.run_dir.clone()]);
    assert!((run.outcome.roi - 100.0).abs() < 1e-9);
    let events = writer.events_csv.borrow().clone().expect("events written");
    let kinds: Vec<&str> = events.iter().map(|e| e.kind()).collect();
    assert_eq!(kinds, vec!["buy", "sell", "liquidation"]);
    assert_eq!(*writer.events_jsonl.borrow(), Some(3));
    assert_eq!(writer.config_snapshot.borrow().as_deref(), Some(toml_str.as_str()));

    let summary = writer.summary_written.borrow().clone().expect("summary");
    assert_eq!(summary["run_id"], "test_run");
    assert_eq!(summary["buys"], 1);
    assert_eq!(summary["sells"], 1);
    assert_eq!(summary["input"]["sha256"].as_str().map(str::len), Some(64));
    assert!(summary["input"]["pipeline"].is_null());
    assert_eq!(summary["params"]["signals"]["sell"][1], 1);

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn backtest_without_signals_file_runs_the_pipeline() {
    let dir = unique_tmp_dir("uc_pipeline");
    let data_path = dir.join("stock.csv");
    fs::write(&data_path, "stub").expect("write data stub");

    let toml_str = config_toml(&data_path, SMALL_PIPELINE);
    let config = parse(&toml_str);
    let repo = FakeDatasetRepo::default().with_table(
        &data_path,
        raw_table(),
        DatasetReport::default(),
    );
    let writer = RecordingWriter::default();

    let out = dir.join("out");
    let run = run_backtest(&config, &toml_str, Some(out.clone()), &repo, &writer)
        .expect("backtest");

    // Row one is dropped (no previous close for the change); the position
    // opened at 40 is liquidated at 40.
    assert_eq!(run.run_dir, out.join("test_run"));
    assert_eq!(run.outcome.observations, 3);
    assert_eq!(run.outcome.roi, 0.0);
    let kinds: Vec<&str> = run.outcome.events.iter().map(|e| e.kind()).collect();
    assert_eq!(kinds, vec!["buy", "liquidation"]);

    let summary = writer.summary_written.borrow().clone().expect("summary");
    assert_eq!(summary["input"]["pipeline"]["rows_dropped"], 1);
    assert_eq!(summary["input"]["pipeline"]["interpolated_cells"], 1);

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn strict_signal_policy_rejects_unknown_labels() {
    let dir = unique_tmp_dir("uc_strict");
    let data_path = dir.join("stock.csv");
    fs::write(&data_path, "stub").expect("write data stub");

    let toml_str = config_toml(
        &data_path,
        &format!("{SMALL_PIPELINE}\n[signals]\nunknown = \"strict\"\n"),
    );
    let config = parse(&toml_str);
    let repo = FakeDatasetRepo::default().with_table(
        &data_path,
        raw_table(),
        DatasetReport::default(),
    );
    let writer = RecordingWriter::default();

    let err = run_backtest(&config, &toml_str, None, &repo, &writer).expect_err("strict");
    assert!(err.starts_with("invalid input: unrecognized signal WAIT at 2021-01-05"));
    assert!(writer.summary_written.borrow().is_none());

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn prepare_writes_the_three_views() {
    let data_path = PathBuf::from("stock.csv");
    let toml_str = config_toml(&data_path, SMALL_PIPELINE);
    let config = parse(&toml_str);
    let repo = FakeDatasetRepo::default().with_table(
        &data_path,
        raw_table(),
        DatasetReport::default(),
    );
    let writer = RecordingWriter::default();

    let output = run_prepare(&config, &toml_str, None, &repo, &writer).expect("prepare");
    assert_eq!(output.report.rows_out, 3);
    assert_eq!(output.feature_columns, 2);

    let tables = writer.tables_written.borrow();
    let names: Vec<&str> = tables.iter().map(|(name, _)| name.as_str()).collect();
    assert_eq!(names, vec!["features.csv", "target.csv", "interest.csv"]);
    let target = &tables[1].1;
    assert_eq!(target.column_names(), vec!["Target"]);
    assert_eq!(target.index()[0], "2021-01-05");
}

#[test]
fn strict_validation_fails_on_out_of_order_rows() {
    let data_path = PathBuf::from("stock.csv");
    let toml_str = config_toml(&data_path, SMALL_PIPELINE);
    let config = parse(&toml_str);
    let report = DatasetReport {
        rows: 4,
        columns: 2,
        out_of_order: 1,
        first_out_of_order: Some("2021-01-05".to_string()),
        ..DatasetReport::default()
    };
    let repo = FakeDatasetRepo::default().with_table(&data_path, raw_table(), report);

    let lenient = validate(&config, false, &repo).expect("non-strict validation");
    assert_eq!(lenient["violations"][0], "out-of-order index values");
    assert_eq!(lenient["observations"], 3);
    assert_eq!(lenient["unrecognized_signals"], 1);
    assert_eq!(lenient["target"], "label");

    let err = validate(&config, true, &repo).expect_err("strict validation");
    assert!(err.starts_with("strict validation failed"));
}

#[test]
fn validation_honours_dropped_row_limit() {
    let data_path = PathBuf::from("stock.csv");
    let toml_str = config_toml(
        &data_path,
        &format!("{SMALL_PIPELINE}\n[data_quality]\nmax_dropped_rows = 0\n"),
    );
    let config = parse(&toml_str);
    let repo = FakeDatasetRepo::default().with_table(
        &data_path,
        raw_table(),
        DatasetReport::default(),
    );

    let err = validate(&config, true, &repo).expect_err("dropped rows");
    assert!(err.contains("rows dropped by cleaning"));
}

#[test]
fn validation_flags_unknown_signals_under_strict_policy() {
    let data_path = PathBuf::from("stock.csv");
    let toml_str = config_toml(
        &data_path,
        &format!("{SMALL_PIPELINE}\n[signals]\nunknown = \"strict\"\n"),
    );
    let config = parse(&toml_str);
    let repo = FakeDatasetRepo::default().with_table(
        &data_path,
        raw_table(),
        DatasetReport::default(),
    );

    let lenient = validate(&config, false, &repo).expect("non-strict validation");
    assert_eq!(lenient["unrecognized_signals"], 1);
    assert_eq!(lenient["violations"], serde_json::json!(["unrecognized signals"]));

    let err = validate(&config, true, &repo).expect_err("strict validation");
    assert!(err.starts_with("strict validation failed"));
    assert!(err.contains("unrecognized signals"));
}

#[test]
fn validation_counts_signals_from_the_signals_file() {
    let data_path = PathBuf::from("stock.csv");
    let signals_path = PathBuf::from("signals.csv");
    let toml_str = config_toml(
        &data_path,
        &format!(
            "signals_path = \"{}\"\n{SMALL_PIPELINE}",
            signals_path.display()
        ),
    );
    let config = parse(&toml_str);
    let signals = table(
        &["2021-03-01", "2021-03-02", "2021-03-03"],
        vec![
            ("close", numbers(&[Some(10.0), None, Some(30.0)])),
            ("Target", text(&["X", "Y", "Z"])),
        ],
    );
    let repo = FakeDatasetRepo::default()
        .with_table(&data_path, raw_table(), DatasetReport::default())
        .with_table(&signals_path, signals, DatasetReport::default());

    let report = validate(&config, false, &repo).expect("validation");
    assert_eq!(report["observations"], 2);
    assert_eq!(report["unrecognized_signals"], 2);
    assert_eq!(report["signals_file"]["skipped_rows"], 1);
    assert_eq!(report["signals_file"]["path"], "signals.csv");
    assert_eq!(report["pipeline"]["rows_out"], 3);
}

#[test]
fn signals_file_missing_a_column_is_rejected() {
    let data_path = PathBuf::from("stock.csv");
    let signals_path = PathBuf::from("signals.csv");
    let toml_str = config_toml(
        &data_path,
        &format!(
            "signals_path = \"{}\"\n{SMALL_PIPELINE}",
            signals_path.display()
        ),
    );
    let config = parse(&toml_str);
    let signals = table(
        &["2021-03-01"],
        vec![("close", numbers(&[Some(10.0)]))],
    );
    let repo = FakeDatasetRepo::default()
        .with_table(&data_path, raw_table(), DatasetReport::default())
        .with_table(&signals_path, signals, DatasetReport::default());

    let err = validate(&config, false, &repo).expect_err("no Target column");
    assert_eq!(err, "signals file signals.csv: missing column: Target");
}

#[test]
fn backtest_summary_records_skipped_signal_rows() {
    let dir = unique_tmp_dir("uc_skipped");
    let signals_path = dir.join("signals.csv");
    fs::write(&signals_path, "date,close,Target\n").expect("write signals stub");

    let toml_str = config_toml(
        Path::new("unused.csv"),
        &format!("signals_path = \"{}\"\n", signals_path.display()),
    );
    let config = parse(&toml_str);
    let signals = table(
        &["2021-03-01", "2021-03-02", "2021-03-03"],
        vec![
            ("close", numbers(&[Some(10.0), Some(15.0), Some(20.0)])),
            (
                "Target",
                vec![
                    Cell::Text("BUY".to_string()),
                    Cell::Missing,
                    Cell::Text("SELL".to_string()),
                ],
            ),
        ],
    );
    let repo = FakeDatasetRepo::default().with_table(
        &signals_path,
        signals,
        DatasetReport::default(),
    );
    let writer = RecordingWriter::default();

    let run = run_backtest(&config, &toml_str, None, &repo, &writer).expect("backtest");
    assert_eq!(run.outcome.observations, 2);

    let summary = writer.summary_written.borrow().clone().expect("summary");
    assert_eq!(summary["input"]["skipped_rows"], 1);
    assert_eq!(summary["observations"], 2);

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn importances_are_ranked_ascending() {
    let repo = FakeDatasetRepo {
        importances: (
            vec!["vix".to_string(), "close".to_string(), "sma".to_string()],
            vec![0.3, 0.1, 0.2],
        ),
        ..FakeDatasetRepo::default()
    };
    let ranked = rank_from_file(Path::new("importances.csv"), &repo).expect("rank");
    let order: Vec<&str> = ranked.iter().map(|r| r.feature.as_str()).collect();
    assert_eq!(order, vec!["close", "sma", "vix"]);
}

#[test]
fn backtest_end_to_end_with_filesystem_adapters() {
    let dir = unique_tmp_dir("uc_e2e");
    let data_path = dir.join("stock.csv");
    fs::write(
        &data_path,
        "date,close,label\n\
2021-01-04,10,BUY\n\
2021-01-05,,HOLD\n\
2021-01-06,20,SELL\n\
2021-01-07,40,BUY\n",
    )
    .expect("write csv");

    let toml_str = config_toml(&data_path, SMALL_PIPELINE);
    let config = parse(&toml_str);
    let repo = CsvDatasetRepository::new();
    let writer = FilesystemArtifactWriter::new();

    let out = dir.join("runs");
    let run = run_backtest(&config, &toml_str, Some(out.clone()), &repo, &writer)
        .expect("backtest");
    assert_eq!(run.run_dir, out.join("test_run"));

    for name in ["events.csv", "events.jsonl", "summary.json", "config_snapshot.toml"] {
        assert!(run.run_dir.join(name).exists(), "missing {name}");
    }
    let events = fs::read_to_string(run.run_dir.join("events.csv")).expect("events");
    assert_eq!(events.lines().count(), 3);
    let summary: serde_json::Value = serde_json::from_str(
        &fs::read_to_string(run.run_dir.join("summary.json")).expect("summary"),
    )
    .expect("summary json");
    assert_eq!(summary["observations"], 3);
    assert_eq!(summary["roi"], 0.0);

    let _ = fs::remove_dir_all(&dir);
}
