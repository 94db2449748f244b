use crate::config::Config;
use crate::shared::resolve_pipeline_spec;
use reversa_domain::repositories::dataset::{DatasetReport, DatasetRepository};
use reversa_domain::services::pipeline::{run_pipeline, PipelineSpec, PreparedDataset};
use std::path::Path;
use std::time::Instant;
use tracing::info_span;

#[derive(Debug, Clone)]
pub struct PreparedRun {
    pub spec: PipelineSpec,
    pub data_report: DatasetReport,
    pub dataset: PreparedDataset,
}

/// Loads `paths.data_path` and runs the feature pipeline over it.
pub fn prepare_dataset(
    config: &Config,
    dataset: &dyn DatasetRepository,
) -> Result<PreparedRun, String> {
    let spec = resolve_pipeline_spec(config);
    let _span = info_span!(
        "prepare_dataset",
        run_id = %config.run.run_id,
        data_path = %config.paths.data_path,
        target = %spec.target
    )
    .entered();

    let stage_start = Instant::now();
    let (table, data_report) = dataset.load_table(Path::new(&config.paths.data_path))?;
    metrics::histogram!("reversa.pipeline.load_ms")
        .record(stage_start.elapsed().as_millis() as f64);
    if data_report.out_of_order > 0 || data_report.duplicate_index > 0 {
        tracing::warn!(
            out_of_order = data_report.out_of_order,
            duplicates = data_report.duplicate_index,
            "row index is not strictly ascending; rows are kept in file order"
        );
    }

    let stage_start = Instant::now();
    let prepared = run_pipeline(table, &spec)
        .map_err(|err| format!("feature pipeline failed for {}: {}", config.paths.data_path, err))?;
    metrics::histogram!("reversa.pipeline.transform_ms")
        .record(stage_start.elapsed().as_millis() as f64);
    metrics::gauge!("reversa.pipeline.rows_in").set(prepared.report.rows_in as f64);
    metrics::gauge!("reversa.pipeline.rows_out").set(prepared.report.rows_out as f64);

    tracing::info!(
        rows_in = prepared.report.rows_in,
        rows_out = prepared.report.rows_out,
        interpolated = prepared.report.interpolated_cells,
        derived = prepared.report.derived_columns.len(),
        "feature pipeline done"
    );

    Ok(PreparedRun {
        spec,
        data_report,
        dataset: prepared,
    })
}
