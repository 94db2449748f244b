use crate::entities::table::{Cell, Table};
use crate::services::features::{interpolate_linear, DerivedFeature};
use crate::services::observations::{PRICE_COLUMN, TARGET_COLUMN};
use serde::Serialize;

/// Label columns shipped with the daily indicator dataset.
pub const KNOWN_TARGETS: [&str; 6] = [
    "ExactBestMajorReversals",
    "DayAfterMajorReversal",
    "4_days_ahead_TARGET",
    "5pct_20day_TARGET",
    "5pct_10day_TARGET",
    "2_5pct_5day_TARGET",
];

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSpec {
    pub features_to_use: Vec<String>,
    pub columns_of_interest: Vec<String>,
    pub target: String,
    pub categorical_columns: Vec<String>,
    pub thousands_columns: Vec<String>,
    pub interpolate_columns: Vec<String>,
    pub derived: Vec<DerivedFeature>,
    pub drop_columns: Vec<String>,
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

impl Default for PipelineSpec {
    /// Schema of the daily indicator dataset the pipeline was built for.
    fn default() -> Self {
        let mut categorical_columns = strings(&KNOWN_TARGETS);
        categorical_columns.extend(strings(&["SellIfNotBuy", "TwoStateMajorReversals"]));

        Self {
            features_to_use: strings(&[
                "pct_Diff_from_6_day_SMA",
                "Slope_6_day_SMA",
                "Slope_4_day_SMA",
                "CHLI_1Y",
                "CHLI_1M",
                "CHLI_2W",
                "CHLI_1W",
                "ADV_Issues",
                "ADV_Vol",
                "ADV_Issues_Comp",
                "ADV_Vol_Comp",
                "ImpVol",
                "daysToEarnings",
                "2yr_pct_chg",
                "10yr_pct_chg",
                "10yr_2yr_diff",
                "10_2_diff_pct_chg",
                "10_day_SMA",
                "20_day_SMA",
                "10_day_SMA_slope",
                "20_day_SMA_slope",
                "price_chg",
                "vix_chg",
            ]),
            columns_of_interest: strings(&["close", "vix", "2yr_Yield", "10yr_Yield"]),
            target: "DayAfterMajorReversal".to_string(),
            categorical_columns,
            thousands_columns: strings(&["advancedVolumeComp", "declinedVolumeComp", "newLows1W"]),
            interpolate_columns: strings(&["vix", "2yr_Yield", "10yr_Yield", "newHighs2W"]),
            derived: vec![
                DerivedFeature::pct_change("2yr_Yield", "2yr_pct_chg"),
                DerivedFeature::pct_change("10yr_Yield", "10yr_pct_chg"),
                DerivedFeature::spread("10yr_Yield", "2yr_Yield", "10yr_2yr_diff"),
                DerivedFeature::pct_change("10yr_2yr_diff", "10_2_diff_pct_chg"),
                DerivedFeature::sma("close", 10, "10_day_SMA"),
                DerivedFeature::sma("close", 20, "20_day_SMA"),
                DerivedFeature::pct_change("10_day_SMA", "10_day_SMA_slope"),
                DerivedFeature::pct_change("20_day_SMA", "20_day_SMA_slope"),
                DerivedFeature::pct_change("close", "price_chg"),
                DerivedFeature::diff("vix", "vix_chg"),
                DerivedFeature::pct_change("4_day_SMA", "Slope_4_day_SMA"),
                DerivedFeature::pct_change("6_day_SMA", "Slope_6_day_SMA"),
            ],
            drop_columns: strings(&["PutCallRatio", "daysToDividend"]),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PipelineReport {
    pub rows_in: usize,
    pub rows_out: usize,
    pub rows_dropped: usize,
    pub columns_dropped: usize,
    pub interpolated_cells: usize,
    pub derived_columns: Vec<String>,
}

/// Cleaned table plus the three aligned views handed to modelling code.
#[derive(Debug, Clone)]
pub struct PreparedDataset {
    pub cleaned: Table,
    pub features: Table,
    pub target: Table,
    pub interest: Table,
    pub report: PipelineReport,
}

impl PreparedDataset {
    /// `close` and `Target` side by side, the input shape of the backtest.
    pub fn backtest_view(&self) -> Result<Table, String> {
        let mut view = self.cleaned.select(&[PRICE_COLUMN.to_string()])?;
        let target = self
            .target
            .column(TARGET_COLUMN)
            .ok_or_else(|| format!("missing column: {TARGET_COLUMN}"))?;
        view.set_column(TARGET_COLUMN, target.cells.clone())?;
        Ok(view)
    }
}

pub fn coerce_categorical(table: &mut Table, name: &str) -> Result<(), String> {
    table.map_cells(name, |idx, cell| match cell {
        Cell::Number(value) if value.fract() != 0.0 || !value.is_finite() => Err(format!(
            "column {name} at {idx}: {value} is not a category code"
        )),
        other => Ok(other.clone()),
    })
}

/// Strips thousands separators and parses the result as an integer.
pub fn coerce_thousands(table: &mut Table, name: &str) -> Result<(), String> {
    table.map_cells(name, |idx, cell| match cell {
        Cell::Text(text) => {
            let cleaned = text.replace(',', "");
            cleaned
                .trim()
                .parse::<i64>()
                .map(|v| Cell::Number(v as f64))
                .map_err(|err| format!("column {name} at {idx}: cannot parse {text:?}: {err}"))
        }
        other => Ok(other.clone()),
    })
}

pub fn interpolate_column(table: &mut Table, name: &str) -> Result<usize, String> {
    let mut values = table.numeric(name)?;
    let filled = interpolate_linear(&mut values);
    table.set_numeric(name, values)?;
    Ok(filled)
}

/// Coerce, interpolate, derive, drop, clean and split, in that order.
pub fn run_pipeline(mut table: Table, spec: &PipelineSpec) -> Result<PreparedDataset, String> {
    let mut report = PipelineReport {
        rows_in: table.len(),
        ..PipelineReport::default()
    };

    for name in &spec.categorical_columns {
        if table.has_column(name) {
            coerce_categorical(&mut table, name)?;
        }
    }
    if !table.has_column(&spec.target) {
        return Err(format!("target column {} not found", spec.target));
    }

    for name in &spec.thousands_columns {
        coerce_thousands(&mut table, name)?;
    }

    for name in &spec.interpolate_columns {
        report.interpolated_cells += interpolate_column(&mut table, name)?;
    }

    for feature in &spec.derived {
        feature.apply(&mut table)?;
        report.derived_columns.push(feature.name().to_string());
    }

    report.columns_dropped = table.drop_columns(&spec.drop_columns);
    report.rows_dropped = table.drop_missing_rows();
    report.rows_out = table.len();

    let features = table.select(&spec.features_to_use)?;
    let mut target = table.select(std::slice::from_ref(&spec.target))?;
    target.rename_column(&spec.target, TARGET_COLUMN)?;
    let interest = table.select(&spec.columns_of_interest)?;

    Ok(PreparedDataset {
        cleaned: table,
        features,
        target,
        interest,
        report,
    })
}
