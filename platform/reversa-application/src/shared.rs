use crate::config::Config;
use crate::pipeline::{prepare_dataset, PreparedRun};
use reversa_domain::repositories::dataset::{DatasetReport, DatasetRepository};
use reversa_domain::services::backtest::BacktestParams;
use reversa_domain::services::observations::{
    observations_from_table, PRICE_COLUMN, TARGET_COLUMN,
};
use reversa_domain::services::pipeline::{PipelineReport, PipelineSpec};
use reversa_domain::services::signals::{SignalConfig, SignalPreset};
use reversa_domain::value_objects::observation::Observation;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

pub fn resolve_signal_config(config: &Config) -> Result<SignalConfig, String> {
    let section = config.signals.as_ref();
    let preset = section
        .and_then(|signals| signals.preset)
        .unwrap_or(SignalPreset::BuySell);
    let mut resolved = SignalConfig::preset(preset);

    if let Some(signals) = section {
        if let Some(buy) = &signals.buy {
            resolved.buy = buy.clone();
        }
        if let Some(sell) = &signals.sell {
            resolved.sell = sell.clone();
        }
        if let Some(hold) = &signals.hold {
            resolved.hold = hold.clone();
        }
        if let Some(unknown) = signals.unknown {
            resolved.unknown = unknown;
        }
    }

    resolved
        .check()
        .map_err(|err| format!("invalid [signals] section: {err}"))?;
    Ok(resolved)
}

pub fn resolve_backtest_params(config: &Config) -> Result<BacktestParams, String> {
    let params = BacktestParams {
        init_value: config.run.init_value,
        init_price: config.run.init_price,
        transaction_cost_fixed: config.run.transaction_cost_fixed.unwrap_or(0.0),
        signal_config: resolve_signal_config(config)?,
    };
    params.validate().map_err(|err| err.to_string())?;
    Ok(params)
}

/// Default indicator schema with any `[pipeline]` overrides applied.
pub fn resolve_pipeline_spec(config: &Config) -> PipelineSpec {
    let mut spec = PipelineSpec::default();
    let Some(pipeline) = config.pipeline.as_ref() else {
        return spec;
    };

    if let Some(value) = &pipeline.features_to_use {
        spec.features_to_use = value.clone();
    }
    if let Some(value) = &pipeline.columns_of_interest {
        spec.columns_of_interest = value.clone();
    }
    if let Some(value) = &pipeline.target {
        spec.target = value.clone();
    }
    if let Some(value) = &pipeline.categorical_columns {
        spec.categorical_columns = value.clone();
    }
    if let Some(value) = &pipeline.thousands_columns {
        spec.thousands_columns = value.clone();
    }
    if let Some(value) = &pipeline.interpolate_columns {
        spec.interpolate_columns = value.clone();
    }
    if let Some(value) = &pipeline.derived {
        spec.derived = value.clone();
    }
    if let Some(value) = &pipeline.drop_columns {
        spec.drop_columns = value.clone();
    }
    spec
}

/// Observations the backtest replays, with where they came from.
pub struct LoadedObservations {
    pub source: PathBuf,
    pub observations: Vec<Observation>,
    /// Quality report of `source`.
    pub report: DatasetReport,
    /// Signals-file rows skipped for a missing `close` or `Target`.
    pub skipped_rows: usize,
    /// Pipeline output, when the observations came from `paths.data_path`.
    pub prepared: Option<PreparedRun>,
}

/// Reads `paths.signals_path` when set, otherwise runs the pipeline over
/// `paths.data_path`.
pub fn load_observations(
    config: &Config,
    dataset: &dyn DatasetRepository,
) -> Result<LoadedObservations, String> {
    let Some(signals_path) = &config.paths.signals_path else {
        let prepared = prepare_dataset(config, dataset)?;
        let view = prepared.dataset.backtest_view()?;
        let observations = observations_from_table(&view, PRICE_COLUMN, TARGET_COLUMN)?;
        return Ok(LoadedObservations {
            source: PathBuf::from(&config.paths.data_path),
            observations,
            report: prepared.data_report.clone(),
            skipped_rows: 0,
            prepared: Some(prepared),
        });
    };

    let stage_start = Instant::now();
    let source = PathBuf::from(signals_path);
    let (table, report) = dataset.load_table(&source)?;
    let mut view = table
        .select(&[PRICE_COLUMN.to_string(), TARGET_COLUMN.to_string()])
        .map_err(|err| format!("signals file {}: {}", source.display(), err))?;
    let skipped_rows = view.drop_missing_rows();
    if skipped_rows > 0 {
        tracing::warn!(
            skipped_rows,
            path = %source.display(),
            "rows with a missing close or Target were skipped"
        );
    }
    let observations = observations_from_table(&view, PRICE_COLUMN, TARGET_COLUMN)?;
    metrics::histogram!("reversa.signals.load_ms")
        .record(stage_start.elapsed().as_millis() as f64);
    Ok(LoadedObservations {
        source,
        observations,
        report,
        skipped_rows,
        prepared: None,
    })
}

pub fn run_dir(config: &Config, out: Option<PathBuf>) -> PathBuf {
    let base_dir = out.unwrap_or_else(|| PathBuf::from(&config.paths.out_dir));
    base_dir.join(&config.run.run_id)
}

pub fn file_sha256(path: &Path) -> Result<String, String> {
    let bytes = fs::read(path)
        .map_err(|err| format!("failed to read {} for hashing: {}", path.display(), err))?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(to_hex(&hasher.finalize()[..]))
}

fn to_hex(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        out.push(HEX[(b >> 4) as usize] as char);
        out.push(HEX[(b & 0x0f) as usize] as char);
    }
    out
}

pub fn dataset_report_json(report: &DatasetReport) -> serde_json::Value {
    serde_json::json!({
        "rows": report.rows,
        "columns": report.columns,
        "missing_cells": report.missing_cells,
        "duplicate_index": report.duplicate_index,
        "first_duplicate": report.first_duplicate,
        "out_of_order": report.out_of_order,
        "first_out_of_order": report.first_out_of_order,
        "unparsed_index": report.unparsed_index,
        "first_unparsed_index": report.first_unparsed_index,
    })
}

pub fn pipeline_report_json(report: &PipelineReport) -> serde_json::Value {
    serde_json::json!({
        "rows_in": report.rows_in,
        "rows_out": report.rows_out,
        "rows_dropped": report.rows_dropped,
        "columns_dropped": report.columns_dropped,
        "interpolated_cells": report.interpolated_cells,
        "derived_columns": report.derived_columns,
    })
}
