use crate::config::Config;
use crate::pipeline::prepare_dataset;
use crate::shared::{
    dataset_report_json, load_observations, pipeline_report_json, resolve_backtest_params,
};
use reversa_domain::repositories::dataset::{DatasetReport, DatasetRepository};
use reversa_domain::services::signals::{SignalConfig, UnknownSignalPolicy};
use reversa_domain::value_objects::observation::Observation;
use std::time::Instant;
use tracing::info_span;

/// Loads the dataset, runs the pipeline and checks the result against the
/// `[data_quality]` limits. Signals are counted on the same observations a
/// backtest would replay. In strict mode any violation is an error.
pub fn validate(
    config: &Config,
    strict: bool,
    dataset: &dyn DatasetRepository,
) -> Result<serde_json::Value, String> {
    let _span = info_span!(
        "validate",
        strict = strict,
        run_id = %config.run.run_id
    )
    .entered();

    let params = resolve_backtest_params(config)?;

    let stage_start = Instant::now();
    let mut loaded = load_observations(config, dataset)?;
    let prepared = match loaded.prepared.take() {
        Some(prepared) => prepared,
        None => prepare_dataset(config, dataset)?,
    };
    let observations = &loaded.observations;
    let unrecognized = count_unrecognized(observations, &params.signal_config);
    metrics::histogram!("reversa.validate.pipeline_ms")
        .record(stage_start.elapsed().as_millis() as f64);

    let signals_file = config
        .paths
        .signals_path
        .as_ref()
        .map(|_| (&loaded.report, loaded.skipped_rows));

    let limits = config.data_quality.as_ref();
    let max_duplicates = limits.and_then(|l| l.max_duplicates).unwrap_or(0);
    let max_out_of_order = limits.and_then(|l| l.max_out_of_order).unwrap_or(0);
    let max_unparsed_index = limits.and_then(|l| l.max_unparsed_index).unwrap_or(0);
    let max_dropped_rows = limits.and_then(|l| l.max_dropped_rows);

    let data_report = &prepared.data_report;
    let pipeline_report = &prepared.dataset.report;
    let mut reports: Vec<&DatasetReport> = vec![data_report];
    if let Some((report, _)) = signals_file {
        reports.push(report);
    }

    let mut violations = Vec::new();
    for report in &reports {
        if report.duplicate_index > max_duplicates {
            violations.push("duplicate index values");
        }
        if report.out_of_order > max_out_of_order {
            violations.push("out-of-order index values");
        }
        if report.unparsed_index > max_unparsed_index {
            violations.push("unparsable index values");
        }
    }
    if max_dropped_rows.is_some_and(|max| pipeline_report.rows_dropped > max) {
        violations.push("rows dropped by cleaning");
    }
    if params.signal_config.unknown == UnknownSignalPolicy::Strict && unrecognized > 0 {
        violations.push("unrecognized signals");
    }
    violations.sort_unstable();
    violations.dedup();

    metrics::gauge!("reversa.validate.duplicates").set(data_report.duplicate_index as f64);
    metrics::gauge!("reversa.validate.out_of_order").set(data_report.out_of_order as f64);
    metrics::gauge!("reversa.validate.rows_dropped").set(pipeline_report.rows_dropped as f64);
    metrics::gauge!("reversa.validate.unrecognized_signals").set(unrecognized as f64);

    if strict && !violations.is_empty() {
        return Err(format!(
            "strict validation failed: data quality limits exceeded ({})",
            violations.join(", ")
        ));
    }

    Ok(serde_json::json!({
        "dataset": dataset_report_json(data_report),
        "pipeline": pipeline_report_json(pipeline_report),
        "target": prepared.spec.target,
        "features": prepared.dataset.features.column_names(),
        "observations": observations.len(),
        "unrecognized_signals": unrecognized,
        "signals_file": signals_file.map(|(report, skipped_rows)| serde_json::json!({
            "path": loaded.source.display().to_string(),
            "report": dataset_report_json(report),
            "skipped_rows": skipped_rows,
        })),
        "limits": {
            "max_duplicates": max_duplicates,
            "max_out_of_order": max_out_of_order,
            "max_unparsed_index": max_unparsed_index,
            "max_dropped_rows": max_dropped_rows,
        },
        "violations": violations,
        "strict": strict
    }))
}

fn count_unrecognized(observations: &[Observation], signals: &SignalConfig) -> usize {
    observations
        .iter()
        .filter(|obs| signals.classify(&obs.signal).is_none())
        .count()
}
