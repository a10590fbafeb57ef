//! Indicator/chart preprocessing port trait.

use crate::domain::candle::{Candle, ChartArtifact, EnrichedCandle};
use crate::domain::error::PulsetraderError;

/// Which resolution a row belongs to, for collaborators that prepare
/// timeframe-specific features.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeframeCategory {
    Higher,
    Lower,
}

/// Augments a raw candle with technical features and renders the chart
/// artifact handed to the analysis collaborators. `history` is every
/// candle of the same resolution up to and including `row`.
pub trait IndicatorPort {
    fn enrich(
        &mut self,
        history: &[Candle],
        row: &Candle,
        timeframe: TimeframeCategory,
    ) -> Result<(EnrichedCandle, ChartArtifact), PulsetraderError>;
}
