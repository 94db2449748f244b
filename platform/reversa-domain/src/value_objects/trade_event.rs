use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TradeEvent {
    Buy {
        index: String,
        shares: u64,
        price: f64,
        remaining_cash: f64,
    },
    Sell {
        index: String,
        shares: u64,
        price: f64,
        cash_balance: f64,
    },
    Liquidation {
        index: String,
        shares: u64,
        price: f64,
        cash_balance: f64,
    },
}

impl TradeEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            TradeEvent::Buy { .. } => "buy",
            TradeEvent::Sell { .. } => "sell",
            TradeEvent::Liquidation { .. } => "liquidation",
        }
    }

    pub fn index(&self) -> &str {
        match self {
            TradeEvent::Buy { index, .. }
            | TradeEvent::Sell { index, .. }
            | TradeEvent::Liquidation { index, .. } => index,
        }
    }

    pub fn shares(&self) -> u64 {
        match self {
            TradeEvent::Buy { shares, .. }
            | TradeEvent::Sell { shares, .. }
            | TradeEvent::Liquidation { shares, .. } => *shares,
        }
    }

    pub fn price(&self) -> f64 {
        match self {
            TradeEvent::Buy { price, .. }
            | TradeEvent::Sell { price, .. }
            | TradeEvent::Liquidation { price, .. } => *price,
        }
    }

    /// Cash held right after the event was applied.
    pub fn cash_after(&self) -> f64 {
        match self {
            TradeEvent::Buy { remaining_cash, .. } => *remaining_cash,
            TradeEvent::Sell { cash_balance, .. } | TradeEvent::Liquidation { cash_balance, .. } => {
                *cash_balance
            }
        }
    }
}

impl fmt::Display for TradeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeEvent::Buy {
                index,
                shares,
                price,
                remaining_cash,
            } => write!(
                f,
                "[{index}] bought {shares} shares at {price:.2}, remaining cash {remaining_cash:.2}"
            ),
            TradeEvent::Sell {
                index,
                shares,
                price,
                cash_balance,
            } => write!(
                f,
                "[{index}] sold {shares} shares at {price:.2}, cash balance {cash_balance:.2}"
            ),
            TradeEvent::Liquidation {
                index,
                shares,
                price,
                cash_balance,
            } => write!(
                f,
                "[{index}] liquidated {shares} remaining shares at {price:.2}, cash balance {cash_balance:.2}"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::TradeEvent;

    #[test]
    fn renders_human_readable_lines() {
        let buy = TradeEvent::Buy {
            index: "2020-01-02".to_string(),
            shares: 10,
            price: 10.0,
            remaining_cash: 0.5,
        };
        assert_eq!(
            buy.to_string(),
            "[2020-01-02] bought 10 shares at 10.00, remaining cash 0.50"
        );

        let liquidation = TradeEvent::Liquidation {
            index: "2020-01-03".to_string(),
            shares: 0,
            price: 12.5,
            cash_balance: 200.0,
        };
        assert_eq!(
            liquidation.to_string(),
            "[2020-01-03] liquidated 0 remaining shares at 12.50, cash balance 200.00"
        );
    }

    #[test]
    fn serializes_with_kind_tag() {
        let sell = TradeEvent::Sell {
            index: "d".to_string(),
            shares: 3,
            price: 2.0,
            cash_balance: 6.0,
        };
        let json = serde_json::to_value(&sell).expect("json");
        assert_eq!(json["kind"], "sell");
        assert_eq!(json["shares"], 3);
        assert_eq!(sell.cash_after(), 6.0);
    }
}
