//! Candle representation for both resolutions.

use chrono::NaiveDateTime;

/// One OHLCV row at either resolution. Prices are validated positive at
/// load time; everything downstream may divide by them.
#[derive(Debug, Clone, PartialEq)]
pub struct Candle {
    pub datetime: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// A candle augmented with named indicator features by the preprocessing
/// collaborator. Feature order is preserved so reports stay stable.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedCandle {
    pub candle: Candle,
    pub features: Vec<(String, f64)>,
}

impl EnrichedCandle {
    pub fn feature(&self, name: &str) -> Option<f64> {
        self.features
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| *v)
    }
}

/// Rendered chart handed to the analysis collaborators. Opaque to the
/// engine; the shipped indicator adapter emits SVG bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartArtifact(pub Vec<u8>);
