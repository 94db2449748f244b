use crate::config::Config;
use crate::shared::{
    dataset_report_json, file_sha256, load_observations, pipeline_report_json,
    resolve_backtest_params, run_dir, LoadedObservations,
};
use reversa_domain::repositories::artifacts::ArtifactWriter;
use reversa_domain::repositories::dataset::DatasetRepository;
use reversa_domain::services::backtest::{BacktestOutcome, BacktestParams, Simulator};
use reversa_domain::value_objects::observation::Observation;
use reversa_domain::value_objects::trade_event::TradeEvent;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info_span;

#[derive(Debug, Clone)]
pub struct BacktestRun {
    pub run_dir: PathBuf,
    pub outcome: BacktestOutcome,
}

pub fn run_backtest(
    config: &Config,
    config_toml: &str,
    out: Option<PathBuf>,
    dataset: &dyn DatasetRepository,
    artifacts: &dyn ArtifactWriter,
) -> Result<BacktestRun, String> {
    let _span = info_span!("run_backtest", run_id = %config.run.run_id).entered();

    let params = resolve_backtest_params(config)?;
    if params.transaction_cost_fixed != 0.0 {
        tracing::warn!(
            transaction_cost_fixed = params.transaction_cost_fixed,
            "transaction_cost_fixed is recorded but not charged on trades"
        );
    }

    let loaded = load_observations(config, dataset)?;

    let stage_start = Instant::now();
    let outcome = simulate_logged(&config.run.run_id, &loaded.observations, &params)?;
    let engine_ms = stage_start.elapsed().as_millis() as f64;
    metrics::histogram!("reversa.backtest.engine_ms").record(engine_ms);
    metrics::gauge!("reversa.backtest.observations").set(outcome.observations as f64);
    metrics::gauge!("reversa.backtest.trades").set((outcome.buys + outcome.sells) as f64);
    metrics::gauge!("reversa.backtest.roi").set(outcome.roi);

    let run_dir = write_outputs(config, config_toml, out, &params, &loaded, &outcome, artifacts)?;
    Ok(BacktestRun { run_dir, outcome })
}

fn simulate_logged(
    run_id: &str,
    observations: &[Observation],
    params: &BacktestParams,
) -> Result<BacktestOutcome, String> {
    let mut simulator = Simulator::new(params).map_err(|err| err.to_string())?;
    for obs in observations {
        if let Some(event) = simulator.step(obs).map_err(|err| err.to_string())? {
            tracing::info!(run_id, kind = event.kind(), "{event}");
        }
    }
    let outcome = simulator.finish();
    if let Some(event @ TradeEvent::Liquidation { .. }) = outcome.events.last() {
        tracing::info!(run_id, kind = event.kind(), "{event}");
    }
    tracing::info!(
        run_id,
        roi = outcome.roi,
        final_cash = outcome.final_cash,
        buys = outcome.buys,
        sells = outcome.sells,
        "backtest finished"
    );
    Ok(outcome)
}

fn write_outputs(
    config: &Config,
    config_toml: &str,
    out: Option<PathBuf>,
    params: &BacktestParams,
    loaded: &LoadedObservations,
    outcome: &BacktestOutcome,
    artifacts: &dyn ArtifactWriter,
) -> Result<PathBuf, String> {
    let run_dir = run_dir(config, out);
    artifacts.ensure_dir(&run_dir)?;

    artifacts.write_events_csv(run_dir.join("events.csv").as_path(), &outcome.events)?;
    artifacts.write_events_jsonl(run_dir.join("events.jsonl").as_path(), &outcome.events)?;
    let summary = summary_json(config, params, loaded, outcome)?;
    artifacts.write_summary_json(run_dir.join("summary.json").as_path(), &summary)?;
    artifacts
        .write_config_snapshot_toml(run_dir.join("config_snapshot.toml").as_path(), config_toml)?;

    Ok(run_dir)
}

fn summary_json(
    config: &Config,
    params: &BacktestParams,
    loaded: &LoadedObservations,
    outcome: &BacktestOutcome,
) -> Result<serde_json::Value, String> {
    let signals = &params.signal_config;
    Ok(serde_json::json!({
        "run_id": config.run.run_id,
        "input": {
            "path": loaded.source.display().to_string(),
            "sha256": input_fingerprint(&loaded.source)?,
            "dataset": dataset_report_json(&loaded.report),
            "pipeline": loaded
                .prepared
                .as_ref()
                .map(|prepared| pipeline_report_json(&prepared.dataset.report)),
            "skipped_rows": loaded.skipped_rows,
        },
        "params": {
            "init_value": params.init_value,
            "init_price": params.init_price,
            "transaction_cost_fixed": params.transaction_cost_fixed,
            "signals": {
                "buy": signals.buy,
                "sell": signals.sell,
                "hold": signals.hold,
                "unknown": signals.unknown,
            },
        },
        "observations": outcome.observations,
        "buys": outcome.buys,
        "sells": outcome.sells,
        "events": outcome.events.len(),
        "final_cash": outcome.final_cash,
        "roi": outcome.roi,
        "roi_pct": outcome.roi_pct(),
    }))
}

fn input_fingerprint(path: &Path) -> Result<String, String> {
    let stage_start = Instant::now();
    let digest = file_sha256(path)?;
    metrics::histogram!("reversa.backtest.fingerprint_ms")
        .record(stage_start.elapsed().as_millis() as f64);
    Ok(digest)
}
