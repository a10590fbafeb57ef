//! Deterministic baseline analysis collaborators.
//!
//! The production decision sources are remote agents behind the analysis
//! ports; these adapters give the binary a self-contained stand-in so a
//! run works end to end. Classification comes from the close's distance
//! to its moving average, pulses from the candle's own return.

use crate::domain::candle::{ChartArtifact, EnrichedCandle};
use crate::domain::order::{OrderDecision, OrderKind};
use crate::domain::report::{MacroReport, MicroReport, Pulse, Trend};
use crate::ports::analysis_port::{
    AnalysisError, MacroAnalysisPort, MicroAnalysisPort, OrderContext,
};
use crate::domain::ledger::Ratios;

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

/// Regime classification from the close's deviation off the SMA feature.
pub struct SmaTrendAdapter {
    /// Fractional band around the SMA treated as sideways.
    band: f64,
}

impl SmaTrendAdapter {
    pub fn new(band: f64) -> Self {
        Self { band }
    }

    fn rate_limit_for(trend: Trend) -> f64 {
        match trend {
            Trend::Bull => 0.8,
            Trend::Sideways => 0.4,
            Trend::Bear => 0.1,
        }
    }
}

impl Default for SmaTrendAdapter {
    fn default() -> Self {
        Self::new(0.02)
    }
}

impl MacroAnalysisPort for SmaTrendAdapter {
    fn analyze(
        &mut self,
        row: &EnrichedCandle,
        _chart: &ChartArtifact,
        _ratios: Ratios,
        _feedback: Option<&str>,
    ) -> Result<MacroReport, AnalysisError> {
        let sma = row.feature("sma").ok_or_else(|| {
            AnalysisError::Unavailable("row carries no sma feature".to_string())
        })?;

        let deviation = row.candle.close / sma - 1.0;
        let classification = if deviation > self.band {
            Trend::Bull
        } else if deviation < -self.band {
            Trend::Bear
        } else {
            Trend::Sideways
        };

        let confidence = round2((deviation.abs() / self.band).min(1.0));

        Ok(MacroReport {
            classification,
            confidence,
            rate_limit: Self::rate_limit_for(classification),
            reason: format!("close deviates {:.2}% from sma", deviation * 100.0),
        })
    }
}

/// Pulse detection from the candle's own return, with orders sized toward
/// the active rate limit.
pub struct BreakoutPulseAdapter {
    /// Return (in percent) beyond which a candle counts as a breakout.
    threshold_pct: f64,
}

impl BreakoutPulseAdapter {
    pub fn new(threshold_pct: f64) -> Self {
        Self { threshold_pct }
    }
}

impl Default for BreakoutPulseAdapter {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl MicroAnalysisPort for BreakoutPulseAdapter {
    fn propose(
        &mut self,
        context: &OrderContext<'_>,
        feedback: Option<&str>,
    ) -> Result<MicroReport, AnalysisError> {
        let return_pct = context.row.feature("return_pct").ok_or_else(|| {
            AnalysisError::Unavailable("row carries no return_pct feature".to_string())
        })?;

        let pulse = if return_pct > self.threshold_pct {
            Pulse::BreakoutUp
        } else if return_pct < -self.threshold_pct {
            Pulse::BreakoutDown
        } else {
            Pulse::NoBreakout
        };
        let strength = round2((return_pct.abs() / (3.0 * self.threshold_pct)).min(1.0));

        // A rejection means the sizing disagreed with the live ratios;
        // stand down rather than re-derive the same answer.
        if feedback.is_some() {
            return Ok(MicroReport {
                pulse,
                strength,
                order: OrderDecision::hold(),
                reason: "standing down after rejection".to_string(),
            });
        }

        let rate_limit = context.macro_report.rate_limit;
        let asset = context.ratios.asset;

        let order = match pulse {
            Pulse::BreakoutUp if rate_limit > asset => {
                OrderDecision::new(OrderKind::Buy, round4(rate_limit - asset))
            }
            Pulse::BreakoutDown if asset > 0.0 => {
                OrderDecision::new(OrderKind::Sell, round4(asset))
            }
            _ => OrderDecision::hold(),
        };

        Ok(MicroReport {
            pulse,
            strength,
            order,
            reason: format!("candle return {return_pct:.2}%"),
        })
    }
}
