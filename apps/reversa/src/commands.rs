use reversa_application::config::{load_config_with_source, Config};
use reversa_infrastructure::artifacts::FilesystemArtifactWriter;
use reversa_infrastructure::dataset::CsvDatasetRepository;
use std::path::{Path, PathBuf};

pub enum Command {
    Validate { config: PathBuf, strict: bool },
    Prepare { config: PathBuf, out: Option<PathBuf> },
    Backtest { config: PathBuf, out: Option<PathBuf> },
    Importances { input: PathBuf, json: bool },
}

/// Runs a command and returns what should be printed on stdout.
pub fn run(command: Command) -> Result<String, String> {
    match command {
        Command::Validate { config, strict } => {
            let (config, _) = load_config_with_source(&config)?;
            json_line(&run_validate(&config, strict)?)
        }
        Command::Prepare { config, out } => {
            let (config, config_toml) = load_config_with_source(&config)?;
            json_line(&run_prepare(&config, &config_toml, out)?)
        }
        Command::Backtest { config, out } => {
            let (config, config_toml) = load_config_with_source(&config)?;
            json_line(&run_backtest(&config, &config_toml, out)?)
        }
        Command::Importances { input, json } => run_importances(&input, json),
    }
}

fn json_line(value: &serde_json::Value) -> Result<String, String> {
    serde_json::to_string(value).map_err(|err| format!("failed to serialize result: {err}"))
}

fn run_validate(config: &Config, strict: bool) -> Result<serde_json::Value, String> {
    let dataset = CsvDatasetRepository::new();
    let report = reversa_application::validation::validate(config, strict, &dataset)?;
    Ok(serde_json::json!({
        "status": "ok",
        "mode": "validate",
        "strict": strict,
        "run_id": config.run.run_id,
        "report": report,
    }))
}

fn run_prepare(
    config: &Config,
    config_toml: &str,
    out: Option<PathBuf>,
) -> Result<serde_json::Value, String> {
    let dataset = CsvDatasetRepository::new();
    let artifacts = FilesystemArtifactWriter::new();
    let output = reversa_application::preparing::run_prepare(
        config,
        config_toml,
        out,
        &dataset,
        &artifacts,
    )?;
    let run_dir = &output.run_dir;
    Ok(serde_json::json!({
        "status": "ok",
        "mode": "prepare",
        "run_id": config.run.run_id,
        "rows_in": output.report.rows_in,
        "rows_out": output.report.rows_out,
        "feature_columns": output.feature_columns,
        "artifacts": {
            "run_dir": run_dir.display().to_string(),
            "features_csv": run_dir.join("features.csv").display().to_string(),
            "target_csv": run_dir.join("target.csv").display().to_string(),
            "interest_csv": run_dir.join("interest.csv").display().to_string(),
            "config_snapshot_toml": run_dir.join("config_snapshot.toml").display().to_string(),
        },
    }))
}

fn run_backtest(
    config: &Config,
    config_toml: &str,
    out: Option<PathBuf>,
) -> Result<serde_json::Value, String> {
    let dataset = CsvDatasetRepository::new();
    let artifacts = FilesystemArtifactWriter::new();
    let run = reversa_application::backtesting::run_backtest(
        config,
        config_toml,
        out,
        &dataset,
        &artifacts,
    )?;
    Ok(serde_json::json!({
        "status": "ok",
        "mode": "backtest",
        "run_id": config.run.run_id,
        "roi": run.outcome.roi,
        "final_cash": run.outcome.final_cash,
        "events": run.outcome.events.len(),
        "artifacts": artifacts_for_run(&run.run_dir),
    }))
}

fn artifacts_for_run(run_dir: &Path) -> serde_json::Value {
    serde_json::json!({
        "run_dir": run_dir.display().to_string(),
        "events_csv": run_dir.join("events.csv").display().to_string(),
        "events_jsonl": run_dir.join("events.jsonl").display().to_string(),
        "summary_json": run_dir.join("summary.json").display().to_string(),
        "config_snapshot_toml": run_dir.join("config_snapshot.toml").display().to_string(),
    })
}

fn run_importances(input: &Path, json: bool) -> Result<String, String> {
    let dataset = CsvDatasetRepository::new();
    let ranked = reversa_application::importances::rank_from_file(input, &dataset)?;
    if json {
        return json_line(&serde_json::json!({
            "status": "ok",
            "mode": "importances",
            "input": input.display().to_string(),
            "ranked": ranked,
        }));
    }
    Ok(reversa_application::importances::render_bars(&ranked)
        .trim_end()
        .to_string())
}
