use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureImportance {
    pub feature: String,
    pub importance: f64,
}

/// Pairs feature names with a fitted model's importances and sorts them
/// ascending, least important first.
pub fn rank_importances(
    features: &[String],
    importances: &[f64],
) -> Result<Vec<FeatureImportance>, String> {
    if features.len() != importances.len() {
        return Err(format!(
            "{} feature names but {} importances",
            features.len(),
            importances.len()
        ));
    }
    if let Some(pos) = importances.iter().position(|v| !v.is_finite()) {
        return Err(format!("importance for {} is not finite", features[pos]));
    }

    let mut ranked: Vec<FeatureImportance> = features
        .iter()
        .zip(importances)
        .map(|(feature, importance)| FeatureImportance {
            feature: feature.clone(),
            importance: *importance,
        })
        .collect();
    ranked.sort_by(|a, b| a.importance.total_cmp(&b.importance));
    Ok(ranked)
}
