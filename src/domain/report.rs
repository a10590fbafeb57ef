//! Report vocabulary shared by the analysis collaborators and the recorder.

use std::fmt;
use std::str::FromStr;

use super::order::OrderDecision;

/// Macro-level market regime classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trend {
    Bull,
    Bear,
    Sideways,
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Trend::Bull => "bull",
            Trend::Bear => "bear",
            Trend::Sideways => "sideways",
        };
        write!(f, "{name}")
    }
}

impl FromStr for Trend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bull" => Ok(Trend::Bull),
            "bear" => Ok(Trend::Bear),
            "sideways" => Ok(Trend::Sideways),
            _ => Err(format!("unknown trend '{s}'")),
        }
    }
}

/// Short-horizon breakout signal at the micro resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pulse {
    BreakoutUp,
    BreakoutDown,
    NoBreakout,
}

impl fmt::Display for Pulse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Pulse::BreakoutUp => "breakout-up",
            Pulse::BreakoutDown => "breakout-down",
            Pulse::NoBreakout => "none",
        };
        write!(f, "{name}")
    }
}

/// Output of the macro analysis collaborator: regime classification plus
/// the exposure limit that bounds the period's trading.
#[derive(Debug, Clone, PartialEq)]
pub struct MacroReport {
    pub classification: Trend,
    /// Confidence in the classification, 0..=1.
    pub confidence: f64,
    /// Maximum fraction of total value that may be held in the asset,
    /// 0..=1, two-decimal by convention.
    pub rate_limit: f64,
    pub reason: String,
}

/// Output of the micro analysis collaborator: pulse signal plus the
/// proposed order, already schema-valid on arrival.
#[derive(Debug, Clone, PartialEq)]
pub struct MicroReport {
    pub pulse: Pulse,
    /// Signal strength, 0..=1, two-decimal by convention.
    pub strength: f64,
    pub order: OrderDecision,
    pub reason: String,
}
