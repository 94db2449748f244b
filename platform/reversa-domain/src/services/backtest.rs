//! Signal-driven single-position backtest.
//!
//! Observations are replayed in the order given. A buy signal spends as much
//! cash as whole shares allow, a sell signal liquidates the whole position and
//! any other recognized signal holds. Whatever is still held after the last
//! observation is liquidated at the last seen price. Every trade is recorded
//! as a [`TradeEvent`] in the returned log.

use crate::entities::portfolio::{PortfolioState, PositionOverflow};
use crate::services::signals::{SignalConfig, UnknownSignalPolicy};
use crate::value_objects::decision::Decision;
use crate::value_objects::observation::Observation;
use crate::value_objects::signal::SignalValue;
use crate::value_objects::trade_event::TradeEvent;

/// Every variant is an invalid-input failure; the run is aborted and no
/// partial outcome is produced.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BacktestError {
    #[error("invalid input: init_value must be finite and >= 0 (got {0})")]
    InvalidInitialValue(f64),
    #[error("invalid input: init_price must be finite and > 0 (got {0})")]
    InvalidInitialPrice(f64),
    #[error("invalid input: transaction_cost_fixed must be finite and >= 0 (got {0})")]
    InvalidTransactionCost(f64),
    #[error("invalid input: price at {index} must be finite and > 0 (got {price})")]
    InvalidPrice { index: String, price: f64 },
    #[error("invalid input: unrecognized signal {signal} at {index}")]
    UnrecognizedSignal { index: String, signal: SignalValue },
    #[error("invalid input: {0}")]
    InvalidSignalConfig(String),
    #[error("invalid input: at {index}, {source}")]
    PositionOverflow {
        index: String,
        source: PositionOverflow,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestParams {
    pub init_value: f64,
    /// Reference price used before the first observation.
    pub init_price: f64,
    /// Reserved. Validated and reported but not charged on trades.
    pub transaction_cost_fixed: f64,
    pub signal_config: SignalConfig,
}

impl BacktestParams {
    pub fn new(init_value: f64, init_price: f64, signal_config: SignalConfig) -> Self {
        Self {
            init_value,
            init_price,
            transaction_cost_fixed: 0.0,
            signal_config,
        }
    }

    pub fn validate(&self) -> Result<(), BacktestError> {
        if !self.init_value.is_finite() || self.init_value < 0.0 {
            return Err(BacktestError::InvalidInitialValue(self.init_value));
        }
        if !self.init_price.is_finite() || self.init_price <= 0.0 {
            return Err(BacktestError::InvalidInitialPrice(self.init_price));
        }
        if !self.transaction_cost_fixed.is_finite() || self.transaction_cost_fixed < 0.0 {
            return Err(BacktestError::InvalidTransactionCost(
                self.transaction_cost_fixed,
            ));
        }
        self.signal_config
            .check()
            .map_err(BacktestError::InvalidSignalConfig)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestOutcome {
    pub init_value: f64,
    pub final_cash: f64,
    pub roi: f64,
    pub observations: usize,
    pub buys: usize,
    pub sells: usize,
    pub events: Vec<TradeEvent>,
}

impl BacktestOutcome {
    pub fn roi_pct(&self) -> Option<f64> {
        (self.init_value > 0.0).then(|| self.roi / self.init_value * 100.0)
    }
}

/// Stepping form of the backtest, for callers that want to inspect the
/// portfolio between observations.
#[derive(Debug)]
pub struct Simulator<'a> {
    params: &'a BacktestParams,
    state: PortfolioState,
    events: Vec<TradeEvent>,
    last_index: Option<String>,
    observations: usize,
    buys: usize,
    sells: usize,
}

impl<'a> Simulator<'a> {
    pub fn new(params: &'a BacktestParams) -> Result<Self, BacktestError> {
        params.validate()?;
        Ok(Self {
            params,
            state: PortfolioState::new(params.init_value, params.init_price),
            events: Vec::new(),
            last_index: None,
            observations: 0,
            buys: 0,
            sells: 0,
        })
    }

    pub fn state(&self) -> &PortfolioState {
        &self.state
    }

    pub fn events(&self) -> &[TradeEvent] {
        &self.events
    }

    fn decide(&self, obs: &Observation) -> Result<Decision, BacktestError> {
        match self.params.signal_config.classify(&obs.signal) {
            Some(decision) => Ok(decision),
            None => match self.params.signal_config.unknown {
                UnknownSignalPolicy::Permissive => Ok(Decision::Hold),
                UnknownSignalPolicy::Strict => Err(BacktestError::UnrecognizedSignal {
                    index: obs.index.clone(),
                    signal: obs.signal.clone(),
                }),
            },
        }
    }

    /// Applies one observation. Nothing is mutated when it is rejected.
    pub fn step(&mut self, obs: &Observation) -> Result<Option<&TradeEvent>, BacktestError> {
        if !obs.close.is_finite() || obs.close <= 0.0 {
            return Err(BacktestError::InvalidPrice {
                index: obs.index.clone(),
                price: obs.close,
            });
        }
        let decision = self.decide(obs)?;

        let mut next = self.state.clone();
        next.mark(obs.close);
        let event = match decision {
            Decision::Buy => next
                .buy_max()
                .map_err(|source| BacktestError::PositionOverflow {
                    index: obs.index.clone(),
                    source,
                })?
                .map(|shares| TradeEvent::Buy {
                    index: obs.index.clone(),
                    shares,
                    price: obs.close,
                    remaining_cash: next.cash_balance(),
                }),
            Decision::Sell => {
                let shares = next.sell_all();
                (shares != 0).then(|| TradeEvent::Sell {
                    index: obs.index.clone(),
                    shares,
                    price: obs.close,
                    cash_balance: next.cash_balance(),
                })
            }
            Decision::Hold => None,
        };

        self.state = next;
        self.last_index = Some(obs.index.clone());
        self.observations += 1;

        match event {
            Some(event) => {
                match event {
                    TradeEvent::Buy { .. } => self.buys += 1,
                    TradeEvent::Sell { .. } => self.sells += 1,
                    TradeEvent::Liquidation { .. } => {}
                }
                self.events.push(event);
                Ok(self.events.last())
            }
            None => Ok(None),
        }
    }

    /// Liquidates the remaining position at the last price and closes the run.
    pub fn finish(mut self) -> BacktestOutcome {
        if let Some(index) = self.last_index.take() {
            let shares = self.state.sell_all();
            self.events.push(TradeEvent::Liquidation {
                index,
                shares,
                price: self.state.last_price(),
                cash_balance: self.state.cash_balance(),
            });
        }

        let final_cash = self.state.cash_balance();
        BacktestOutcome {
            init_value: self.params.init_value,
            final_cash,
            roi: final_cash - self.params.init_value,
            observations: self.observations,
            buys: self.buys,
            sells: self.sells,
            events: self.events,
        }
    }
}

pub fn simulate(
    observations: &[Observation],
    params: &BacktestParams,
) -> Result<BacktestOutcome, BacktestError> {
    let mut simulator = Simulator::new(params)?;
    for obs in observations {
        simulator.step(obs)?;
    }
    Ok(simulator.finish())
}
