use crate::config::Config;
use crate::pipeline::prepare_dataset;
use crate::shared::run_dir;
use reversa_domain::repositories::artifacts::ArtifactWriter;
use reversa_domain::repositories::dataset::{DatasetReport, DatasetRepository};
use reversa_domain::services::pipeline::PipelineReport;
use std::path::PathBuf;
use std::time::Instant;
use tracing::info_span;

#[derive(Debug, Clone)]
pub struct PrepareOutput {
    pub run_dir: PathBuf,
    pub data_report: DatasetReport,
    pub report: PipelineReport,
    pub feature_columns: usize,
}

/// Runs the pipeline and writes `features.csv`, `target.csv` and
/// `interest.csv` into the run directory.
pub fn run_prepare(
    config: &Config,
    config_toml: &str,
    out: Option<PathBuf>,
    dataset: &dyn DatasetRepository,
    artifacts: &dyn ArtifactWriter,
) -> Result<PrepareOutput, String> {
    let _span = info_span!("run_prepare", run_id = %config.run.run_id).entered();

    let prepared = prepare_dataset(config, dataset)?;
    let views = &prepared.dataset;

    let stage_start = Instant::now();
    let run_dir = run_dir(config, out);
    artifacts.ensure_dir(&run_dir)?;
    artifacts.write_table_csv(run_dir.join("features.csv").as_path(), &views.features)?;
    artifacts.write_table_csv(run_dir.join("target.csv").as_path(), &views.target)?;
    artifacts.write_table_csv(run_dir.join("interest.csv").as_path(), &views.interest)?;
    artifacts
        .write_config_snapshot_toml(run_dir.join("config_snapshot.toml").as_path(), config_toml)?;
    metrics::histogram!("reversa.pipeline.write_ms")
        .record(stage_start.elapsed().as_millis() as f64);

    Ok(PrepareOutput {
        run_dir,
        data_report: prepared.data_report,
        report: prepared.dataset.report.clone(),
        feature_columns: views.features.columns().len(),
    })
}
