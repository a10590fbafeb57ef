//! Portfolio ledger: balances, ratios, fee-aware trades, performance.

use chrono::NaiveDateTime;

use super::candle::Candle;
use super::order::OrderKind;

/// Exchange fee charged once per trade leg.
pub const DEFAULT_FEE_RATE: f64 = 0.0008;

const MINUTES_PER_DAY: f64 = 1440.0;
const MINUTES_PER_YEAR: f64 = 525_600.0;

/// One point of the total-value history. The seed sample carries no
/// timestamp and is skipped by date-dependent metrics.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueSample {
    pub datetime: Option<NaiveDateTime>,
    pub total_value: f64,
}

/// Running peak and maximum drawdown, both monotonic non-decreasing.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawdownState {
    pub peak_value: f64,
    pub max_drawdown_pct: f64,
}

impl DrawdownState {
    fn new(seed_value: f64) -> Self {
        DrawdownState {
            peak_value: seed_value,
            max_drawdown_pct: 0.0,
        }
    }

    fn observe(&mut self, value: f64) {
        if value > self.peak_value {
            self.peak_value = value;
        }
        let drawdown = (self.peak_value - value) / self.peak_value * 100.0;
        if drawdown > self.max_drawdown_pct {
            self.max_drawdown_pct = drawdown;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ratios {
    pub cash: f64,
    pub asset: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Balances {
    pub cash: f64,
    pub asset: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Performance {
    pub return_pct: f64,
    pub max_drawdown_pct: f64,
    pub sharpe: f64,
}

/// Cash/asset ledger for a single backtest run. Owned by the orchestrator;
/// trusts its caller to validate orders before they arrive here.
#[derive(Debug, Clone)]
pub struct PortfolioLedger {
    cash: f64,
    asset_amount: f64,
    cash_ratio: f64,
    asset_ratio: f64,
    fee_rate: f64,
    initial_cash: f64,
    value_history: Vec<ValueSample>,
    drawdown: DrawdownState,
    risk_free_rate: f64,
    interval_minutes: i64,
}

impl PortfolioLedger {
    /// `interval_minutes` is the tick length of whichever resolution drives
    /// trading decisions; it fixes the Sharpe annualization factor.
    pub fn new(
        initial_cash: f64,
        fee_rate: f64,
        risk_free_rate: f64,
        interval_minutes: i64,
    ) -> Self {
        PortfolioLedger {
            cash: initial_cash,
            asset_amount: 0.0,
            cash_ratio: 1.0,
            asset_ratio: 0.0,
            fee_rate,
            initial_cash,
            value_history: vec![ValueSample {
                datetime: None,
                total_value: initial_cash,
            }],
            drawdown: DrawdownState::new(initial_cash),
            risk_free_rate,
            interval_minutes,
        }
    }

    /// Recompute the cash/asset ratios at the candle's open (close during
    /// final liquidation bookkeeping) and record the resulting total value.
    /// Ratios are only valid as of the price used here; call this before
    /// every decision that reads them.
    pub fn update_ratios(&mut self, candle: &Candle, use_close: bool) {
        let price = if use_close { candle.close } else { candle.open };
        let total_value = self.cash + self.asset_amount * price;

        self.cash_ratio = self.cash / total_value;
        self.asset_ratio = self.asset_amount * price / total_value;

        self.record_value(candle.datetime, total_value);
    }

    /// Apply a validated order at the candle's open. `amount` is a fraction
    /// of total portfolio value. The fee reduces only the leg that changes
    /// hands: bought asset is fee-reduced, sold proceeds are fee-reduced,
    /// the opposite side moves at face value.
    pub fn apply_trade(&mut self, candle: &Candle, kind: OrderKind, amount: f64) {
        let price = candle.open;
        let total_value = self.cash + self.asset_amount * price;

        match kind {
            OrderKind::Buy => {
                let spend = total_value * amount;
                self.asset_amount += spend * (1.0 - self.fee_rate) / price;
                self.cash -= spend;
            }
            OrderKind::Sell => {
                let proceeds = total_value * amount;
                self.asset_amount -= proceeds / price;
                self.cash += proceeds * (1.0 - self.fee_rate);
            }
            OrderKind::Hold => {}
        }

        self.update_ratios(candle, false);
    }

    /// Sell the whole asset balance at the candle's close. The terminal
    /// transition of a run.
    pub fn liquidate_all(&mut self, candle: &Candle) {
        self.cash += self.asset_amount * candle.close * (1.0 - self.fee_rate);
        self.asset_amount = 0.0;
        self.update_ratios(candle, true);
    }

    pub fn ratios(&self) -> Ratios {
        Ratios {
            cash: self.cash_ratio,
            asset: self.asset_ratio,
        }
    }

    pub fn balances(&self) -> Balances {
        Balances {
            cash: self.cash,
            asset: self.asset_amount,
        }
    }

    pub fn value_history(&self) -> &[ValueSample] {
        &self.value_history
    }

    pub fn performance(&self) -> Performance {
        Performance {
            return_pct: self.compute_return(),
            max_drawdown_pct: self.drawdown.max_drawdown_pct,
            sharpe: self.compute_sharpe(),
        }
    }

    fn record_value(&mut self, datetime: NaiveDateTime, total_value: f64) {
        self.value_history.push(ValueSample {
            datetime: Some(datetime),
            total_value,
        });
        self.drawdown.observe(total_value);
    }

    fn compute_return(&self) -> f64 {
        // History is never empty: the seed sample is always present.
        let last = self.value_history.last().map(|s| s.total_value);
        let last = last.unwrap_or(self.initial_cash);
        (last - self.initial_cash) / self.initial_cash * 100.0
    }

    fn compute_sharpe(&self) -> f64 {
        let values: Vec<f64> = self
            .value_history
            .iter()
            .filter(|s| s.datetime.is_some())
            .map(|s| s.total_value)
            .collect();

        if values.len() < 2 {
            return 0.0;
        }

        let per_step_rf =
            self.risk_free_rate * (self.interval_minutes as f64 / MINUTES_PER_DAY);
        let excess: Vec<f64> = values
            .windows(2)
            .map(|w| w[1] / w[0] - 1.0 - per_step_rf)
            .collect();

        let n = excess.len() as f64;
        let mean = excess.iter().sum::<f64>() / n;
        let variance = excess.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
        let stddev = variance.sqrt();

        if stddev == 0.0 {
            return 0.0;
        }

        let periods_per_year = MINUTES_PER_YEAR / self.interval_minutes as f64;
        periods_per_year.sqrt() * mean / stddev
    }
}
