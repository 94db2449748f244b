use crate::value_objects::decision::Decision;
use crate::value_objects::signal::SignalValue;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownSignalPolicy {
    /// Unrecognized signals are treated as HOLD.
    #[default]
    Permissive,
    /// Unrecognized signals abort the run.
    Strict,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalPreset {
    /// Two-state labels: `BUY`/0 buys, `SELL`/1 sells.
    BuySell,
    /// Three-state labels: `BUY`/0 buys, `HOLD`/1 holds, `SELL`/2 sells.
    BuyHoldSell,
}

/// Which raw signal values map to which decision.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalConfig {
    pub buy: Vec<SignalValue>,
    pub sell: Vec<SignalValue>,
    pub hold: Vec<SignalValue>,
    pub unknown: UnknownSignalPolicy,
}

impl SignalConfig {
    pub fn preset(preset: SignalPreset) -> Self {
        match preset {
            SignalPreset::BuySell => Self::buy_sell(),
            SignalPreset::BuyHoldSell => Self::buy_hold_sell(),
        }
    }

    pub fn buy_sell() -> Self {
        Self {
            buy: vec![SignalValue::label("BUY"), SignalValue::Code(0)],
            sell: vec![SignalValue::label("SELL"), SignalValue::Code(1)],
            hold: vec![SignalValue::label("HOLD")],
            unknown: UnknownSignalPolicy::Permissive,
        }
    }

    pub fn buy_hold_sell() -> Self {
        Self {
            buy: vec![SignalValue::label("BUY"), SignalValue::Code(0)],
            sell: vec![SignalValue::label("SELL"), SignalValue::Code(2)],
            hold: vec![SignalValue::label("HOLD"), SignalValue::Code(1)],
            unknown: UnknownSignalPolicy::Permissive,
        }
    }

    pub fn with_policy(mut self, unknown: UnknownSignalPolicy) -> Self {
        self.unknown = unknown;
        self
    }

    /// A value listed under more than one decision is ambiguous.
    pub fn check(&self) -> Result<(), String> {
        for value in &self.buy {
            if self.sell.contains(value) {
                return Err(format!("signal {value} is mapped to both buy and sell"));
            }
            if self.hold.contains(value) {
                return Err(format!("signal {value} is mapped to both buy and hold"));
            }
        }
        for value in &self.sell {
            if self.hold.contains(value) {
                return Err(format!("signal {value} is mapped to both sell and hold"));
            }
        }
        Ok(())
    }

    /// Buy is matched first, then sell, then hold. `None` means the value is
    /// unrecognized; the caller applies [`UnknownSignalPolicy`].
    pub fn classify(&self, value: &SignalValue) -> Option<Decision> {
        if self.buy.contains(value) {
            Some(Decision::Buy)
        } else if self.sell.contains(value) {
            Some(Decision::Sell)
        } else if self.hold.contains(value) {
            Some(Decision::Hold)
        } else {
            None
        }
    }
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self::buy_sell()
    }
}
