//! Moving-average indicator adapter with a small SVG close-price chart.

use crate::domain::candle::{Candle, ChartArtifact, EnrichedCandle};
use crate::domain::error::PulsetraderError;
use crate::ports::indicator_port::{IndicatorPort, TimeframeCategory};

pub struct SmaIndicatorAdapter {
    window: usize,
}

impl SmaIndicatorAdapter {
    pub fn new(window: usize) -> Self {
        Self {
            window: window.max(1),
        }
    }
}

impl IndicatorPort for SmaIndicatorAdapter {
    fn enrich(
        &mut self,
        history: &[Candle],
        row: &Candle,
        _timeframe: TimeframeCategory,
    ) -> Result<(EnrichedCandle, ChartArtifact), PulsetraderError> {
        if history.is_empty() {
            return Err(PulsetraderError::Indicator {
                reason: "empty candle history".to_string(),
            });
        }

        let tail_start = history.len().saturating_sub(self.window);
        let tail = &history[tail_start..];
        let sma = tail.iter().map(|c| c.close).sum::<f64>() / tail.len() as f64;

        let features = vec![
            ("sma".to_string(), sma),
            ("return_pct".to_string(), (row.close - row.open) / row.open * 100.0),
            ("range_pct".to_string(), (row.high - row.low) / row.open * 100.0),
        ];

        let chart = ChartArtifact(render_close_chart(history).into_bytes());

        Ok((
            EnrichedCandle {
                candle: row.clone(),
                features,
            },
            chart,
        ))
    }
}

/// Render the close series as an SVG polyline. Collaborators treat the
/// artifact as opaque bytes; this keeps it cheap and dependency-free.
fn render_close_chart(history: &[Candle]) -> String {
    let width = 500.0;
    let height = 200.0;
    let padding = 40.0;

    let min_close = history.iter().map(|c| c.close).fold(f64::INFINITY, f64::min);
    let max_close = history
        .iter()
        .map(|c| c.close)
        .fold(f64::NEG_INFINITY, f64::max);

    let plot_width = width - 2.0 * padding;
    let plot_height = height - 2.0 * padding;

    let range = max_close - min_close;
    let scale_y = if range > 0.0 { plot_height / range } else { 1.0 };
    let scale_x = if history.len() > 1 {
        plot_width / (history.len() - 1) as f64
    } else {
        0.0
    };

    let points: Vec<String> = history
        .iter()
        .enumerate()
        .map(|(i, c)| {
            let x = padding + i as f64 * scale_x;
            let y = height - padding - (c.close - min_close) * scale_y;
            format!("{x:.1},{y:.1}")
        })
        .collect();

    format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width:.0}" height="{height:.0}"><polyline fill="none" stroke="blue" stroke-width="1" points="{}"/></svg>"#,
        points.join(" ")
    )
}
