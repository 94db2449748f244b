use reversa_domain::repositories::dataset::DatasetRepository;
use reversa_domain::services::importance::{rank_importances, FeatureImportance};
use std::fmt::Write;
use std::path::Path;
use tracing::info_span;

const BAR_WIDTH: usize = 40;

/// Reads `feature,importance` rows and returns them least important first.
pub fn rank_from_file(
    path: &Path,
    dataset: &dyn DatasetRepository,
) -> Result<Vec<FeatureImportance>, String> {
    let _span = info_span!("rank_importances", path = %path.display()).entered();
    let (features, importances) = dataset.load_importances(path)?;
    let ranked = rank_importances(&features, &importances)?;
    tracing::debug!(features = ranked.len(), "ranked feature importances");
    Ok(ranked)
}

/// Horizontal text bars scaled to the largest absolute importance.
pub fn render_bars(ranked: &[FeatureImportance]) -> String {
    let label_width = ranked.iter().map(|r| r.feature.len()).max().unwrap_or(0);
    let max = ranked
        .iter()
        .map(|r| r.importance.abs())
        .fold(0.0_f64, f64::max);

    let mut out = String::new();
    for row in ranked {
        let filled = if max > 0.0 {
            ((row.importance.abs() / max) * BAR_WIDTH as f64).round() as usize
        } else {
            0
        };
        let _ = writeln!(
            out,
            "{:<label_width$} | {:<BAR_WIDTH$} {:.4}",
            row.feature,
            "#".repeat(filled),
            row.importance
        );
    }
    out
}
