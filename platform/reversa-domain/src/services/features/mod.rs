use crate::entities::table::Table;
use serde::{Deserialize, Serialize};

mod rolling;

pub use rolling::RollingSma;

/// A column computed from existing columns and appended (or replaced) by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DerivedFeature {
    PctChange { source: String, name: String },
    Diff { source: String, name: String },
    Spread { left: String, right: String, name: String },
    Sma { source: String, window: usize, name: String },
}

impl DerivedFeature {
    pub fn pct_change(source: &str, name: &str) -> Self {
        Self::PctChange {
            source: source.to_string(),
            name: name.to_string(),
        }
    }

    pub fn diff(source: &str, name: &str) -> Self {
        Self::Diff {
            source: source.to_string(),
            name: name.to_string(),
        }
    }

    pub fn spread(left: &str, right: &str, name: &str) -> Self {
        Self::Spread {
            left: left.to_string(),
            right: right.to_string(),
            name: name.to_string(),
        }
    }

    pub fn sma(source: &str, window: usize, name: &str) -> Self {
        Self::Sma {
            source: source.to_string(),
            window,
            name: name.to_string(),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            DerivedFeature::PctChange { name, .. }
            | DerivedFeature::Diff { name, .. }
            | DerivedFeature::Spread { name, .. }
            | DerivedFeature::Sma { name, .. } => name,
        }
    }

    pub fn apply(&self, table: &mut Table) -> Result<(), String> {
        let values = match self {
            DerivedFeature::PctChange { source, .. } => pct_change(&table.numeric(source)?),
            DerivedFeature::Diff { source, .. } => diff(&table.numeric(source)?),
            DerivedFeature::Spread { left, right, .. } => {
                spread(&table.numeric(left)?, &table.numeric(right)?)
            }
            DerivedFeature::Sma { source, window, .. } => {
                if *window == 0 {
                    return Err(format!("sma window for {} must be >= 1", self.name()));
                }
                rolling_mean(&table.numeric(source)?, *window)
            }
        };
        table.set_numeric(self.name(), values)
    }
}

/// Relative change against the previous row after padding gaps forward.
/// Leading rows, zero denominators and non-finite results are missing.
pub fn pct_change(values: &[Option<f64>]) -> Vec<Option<f64>> {
    let mut out = Vec::with_capacity(values.len());
    let mut last: Option<f64> = None;
    let mut prev_padded: Option<f64> = None;
    for value in values {
        if value.is_some() {
            last = *value;
        }
        let current = last;
        let change = match (prev_padded, current) {
            (Some(prev), Some(cur)) if prev != 0.0 => {
                Some(cur / prev - 1.0).filter(|v| v.is_finite())
            }
            _ => None,
        };
        out.push(change);
        prev_padded = current;
    }
    out
}

pub fn diff(values: &[Option<f64>]) -> Vec<Option<f64>> {
    let mut out = Vec::with_capacity(values.len());
    let mut prev: Option<f64> = None;
    for value in values {
        out.push(match (prev, value) {
            (Some(p), Some(v)) => Some(v - p),
            _ => None,
        });
        prev = *value;
    }
    out
}

pub fn spread(left: &[Option<f64>], right: &[Option<f64>]) -> Vec<Option<f64>> {
    left.iter()
        .zip(right)
        .map(|(l, r)| match (l, r) {
            (Some(l), Some(r)) => Some(l - r),
            _ => None,
        })
        .collect()
}

pub fn rolling_mean(values: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    let mut sma = RollingSma::new(window);
    values.iter().map(|v| sma.update(*v)).collect()
}

/// Linear interpolation by position. Interior gaps are filled on the line
/// between their neighbours, trailing gaps take the last valid value and
/// leading gaps stay missing. Returns the number of cells filled.
pub fn interpolate_linear(values: &mut [Option<f64>]) -> usize {
    let mut filled = 0;
    let mut last_valid: Option<(usize, f64)> = None;
    let mut i = 0;
    while i < values.len() {
        match values[i] {
            Some(v) => {
                last_valid = Some((i, v));
                i += 1;
            }
            None => {
                let gap_start = i;
                while i < values.len() && values[i].is_none() {
                    i += 1;
                }
                let Some((left_idx, left_val)) = last_valid else {
                    continue;
                };
                if i < values.len() {
                    let right_val = values[i].unwrap_or(left_val);
                    let span = (i - left_idx) as f64;
                    for (j, slot) in values.iter_mut().enumerate().take(i).skip(gap_start) {
                        let t = (j - left_idx) as f64 / span;
                        *slot = Some(left_val + (right_val - left_val) * t);
                        filled += 1;
                    }
                } else {
                    for slot in values.iter_mut().skip(gap_start) {
                        *slot = Some(left_val);
                        filled += 1;
                    }
                }
            }
        }
    }
    filled
}
