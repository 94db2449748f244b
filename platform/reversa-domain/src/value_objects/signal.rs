use serde::{Deserialize, Serialize};
use std::fmt;

/// A raw trade signal as it appears in a labeled dataset.
///
/// Label generators have emitted both string labels (`BUY`, `SELL`) and small
/// integer codes over time. The two forms are kept apart: a label only ever
/// matches a label and a code only ever matches a code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SignalValue {
    Code(i64),
    Label(String),
}

impl SignalValue {
    pub fn label(value: impl Into<String>) -> Self {
        Self::Label(value.into())
    }

    /// Integral finite numbers become codes; anything else keeps its textual
    /// form so it can still be reported as unrecognized.
    pub fn from_number(value: f64) -> Self {
        if value.is_finite() && value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
            Self::Code(value as i64)
        } else {
            Self::Label(value.to_string())
        }
    }
}

impl fmt::Display for SignalValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalValue::Code(code) => write!(f, "{code}"),
            SignalValue::Label(label) => f.write_str(label),
        }
    }
}

impl From<i64> for SignalValue {
    fn from(value: i64) -> Self {
        Self::Code(value)
    }
}

impl From<&str> for SignalValue {
    fn from(value: &str) -> Self {
        Self::Label(value.to_string())
    }
}
