use reversa_domain::services::features::DerivedFeature;
use reversa_domain::services::signals::{SignalPreset, UnknownSignalPolicy};
use reversa_domain::value_objects::signal::SignalValue;
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub run: RunConfig,
    pub paths: PathsConfig,
    pub signals: Option<SignalsConfig>,
    pub pipeline: Option<PipelineConfig>,
    pub data_quality: Option<DataQualityConfig>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    pub run_id: String,
    pub init_value: f64,
    pub init_price: f64,
    /// Accepted and echoed in the summary; the simulator does not charge it.
    pub transaction_cost_fixed: Option<f64>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct PathsConfig {
    pub data_path: String,
    /// Pre-labeled `<index>,close,Target` CSV; skips the feature pipeline.
    pub signals_path: Option<String>,
    pub out_dir: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct SignalsConfig {
    pub preset: Option<SignalPreset>,
    pub buy: Option<Vec<SignalValue>>,
    pub sell: Option<Vec<SignalValue>>,
    pub hold: Option<Vec<SignalValue>>,
    pub unknown: Option<UnknownSignalPolicy>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    pub features_to_use: Option<Vec<String>>,
    pub columns_of_interest: Option<Vec<String>>,
    pub target: Option<String>,
    pub categorical_columns: Option<Vec<String>>,
    pub thousands_columns: Option<Vec<String>>,
    pub interpolate_columns: Option<Vec<String>>,
    pub derived: Option<Vec<DerivedFeature>>,
    pub drop_columns: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct DataQualityConfig {
    pub max_dropped_rows: Option<usize>,
    pub max_duplicates: Option<usize>,
    pub max_out_of_order: Option<usize>,
    pub max_unparsed_index: Option<usize>,
}

pub fn load_config_with_source(path: &Path) -> Result<(Config, String), String> {
    let contents = fs::read_to_string(path)
        .map_err(|err| format!("failed to read config {}: {}", path.display(), err))?;
    let config = toml::from_str(&contents)
        .map_err(|err| format!("failed to parse TOML {}: {}", path.display(), err))?;
    Ok((config, contents))
}
