#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
#[error("buying {wanted} shares on top of {held} exceeds the supported position size")]
pub struct PositionOverflow {
    pub held: u64,
    pub wanted: f64,
}

/// Cash and whole-share position tracked by a single simulation run.
#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioState {
    cash_balance: f64,
    shares_owned: u64,
    last_price: f64,
}

impl PortfolioState {
    pub fn new(init_value: f64, init_price: f64) -> Self {
        Self {
            cash_balance: init_value,
            shares_owned: 0,
            last_price: init_price,
        }
    }

    pub fn cash_balance(&self) -> f64 {
        self.cash_balance
    }

    pub fn shares_owned(&self) -> u64 {
        self.shares_owned
    }

    pub fn last_price(&self) -> f64 {
        self.last_price
    }

    pub fn mark(&mut self, price: f64) {
        self.last_price = price;
    }

    /// Buys as many whole shares as cash allows at the last price.
    /// Returns the number bought, or `None` when not even one share fits.
    /// A purchase whose share count does not fit the position counter is
    /// rejected and leaves the state untouched.
    pub fn buy_max(&mut self) -> Result<Option<u64>, PositionOverflow> {
        let price = self.last_price;
        if price <= 0.0 {
            return Ok(None);
        }

        let affordable = (self.cash_balance / price).floor();
        if affordable < 1.0 {
            return Ok(None);
        }
        // `u64::MAX as f64` rounds up to 2^64, which itself does not fit.
        if affordable >= u64::MAX as f64 {
            return Err(PositionOverflow {
                held: self.shares_owned,
                wanted: affordable,
            });
        }

        let mut shares = affordable as u64;
        // The quotient can round up to the next integer.
        if shares as f64 * price > self.cash_balance {
            shares -= 1;
        }
        if shares == 0 {
            return Ok(None);
        }

        let total = self
            .shares_owned
            .checked_add(shares)
            .ok_or(PositionOverflow {
                held: self.shares_owned,
                wanted: shares as f64,
            })?;
        self.shares_owned = total;
        self.cash_balance -= shares as f64 * price;
        Ok(Some(shares))
    }

    /// Sells the whole position at the last price and returns the number of
    /// shares sold (zero when flat).
    pub fn sell_all(&mut self) -> u64 {
        let shares = self.shares_owned;
        self.cash_balance += shares as f64 * self.last_price;
        self.shares_owned = 0;
        shares
    }
}
