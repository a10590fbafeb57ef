//! Analysis collaborator port traits.
//!
//! The decision-making teams are opaque: they see a price/indicator row, a
//! rendered chart and the current portfolio ratios, and answer with a
//! structured report. The orchestrator drives a bounded retry loop around
//! the micro port, feeding back the violated rule on each rejection.

use crate::domain::candle::{ChartArtifact, EnrichedCandle};
use crate::domain::ledger::Ratios;
use crate::domain::report::{MacroReport, MicroReport};

/// A collaborator failure. `Schema` answers are retried with feedback;
/// `Unavailable` aborts the retry loop and degrades the step.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AnalysisError {
    #[error("schema-invalid answer: {0}")]
    Schema(String),

    #[error("collaborator unavailable: {0}")]
    Unavailable(String),
}

/// Macro (higher-resolution) analysis: regime classification and the
/// period's exposure limit.
pub trait MacroAnalysisPort {
    fn analyze(
        &mut self,
        row: &EnrichedCandle,
        chart: &ChartArtifact,
        ratios: Ratios,
        feedback: Option<&str>,
    ) -> Result<MacroReport, AnalysisError>;
}

/// Everything the micro collaborator sees when proposing an order.
pub struct OrderContext<'a> {
    pub row: &'a EnrichedCandle,
    pub chart: &'a ChartArtifact,
    pub macro_report: &'a MacroReport,
    pub ratios: Ratios,
}

/// Micro (lower-resolution) analysis: pulse detection and a proposed
/// order. `feedback` carries the previous attempt's violated rule.
pub trait MicroAnalysisPort {
    fn propose(
        &mut self,
        context: &OrderContext<'_>,
        feedback: Option<&str>,
    ) -> Result<MicroReport, AnalysisError>;
}
