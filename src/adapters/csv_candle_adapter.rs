//! CSV candle file adapter.
//!
//! Files are named `{market}_{tick}.csv` with a header row and columns
//! `datetime, open, high, low, close, volume`.

use chrono::NaiveDateTime;
use std::path::PathBuf;

use crate::domain::candle::Candle;
use crate::domain::error::PulsetraderError;
use crate::domain::tick::Tick;
use crate::ports::data_port::DataPort;

const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub struct CsvCandleAdapter {
    base_path: PathBuf,
}

impl CsvCandleAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, market: &str, tick: Tick) -> PathBuf {
        self.base_path.join(format!("{market}_{tick}.csv"))
    }
}

fn parse_field(
    record: &csv::StringRecord,
    index: usize,
    field: &str,
    datetime: &str,
) -> Result<f64, PulsetraderError> {
    let raw = record
        .get(index)
        .ok_or_else(|| PulsetraderError::MissingPriceField {
            field: field.to_string(),
            datetime: datetime.to_string(),
        })?;
    raw.trim()
        .parse()
        .map_err(|e| PulsetraderError::Data {
            reason: format!("invalid {field} value '{raw}' at {datetime}: {e}"),
        })
}

impl DataPort for CsvCandleAdapter {
    fn fetch_candles(
        &self,
        market: &str,
        tick: Tick,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<Candle>, PulsetraderError> {
        let path = self.csv_path(market, tick);
        let content = std::fs::read_to_string(&path).map_err(|e| PulsetraderError::Data {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

        let mut reader = csv::Reader::from_reader(content.as_bytes());
        let mut candles = Vec::new();

        for result in reader.records() {
            let record = result.map_err(|e| PulsetraderError::Data {
                reason: format!("CSV parse error in {}: {}", path.display(), e),
            })?;

            let datetime_str =
                record
                    .get(0)
                    .ok_or_else(|| PulsetraderError::MissingPriceField {
                        field: "datetime".to_string(),
                        datetime: "<unknown>".to_string(),
                    })?;
            let datetime = NaiveDateTime::parse_from_str(datetime_str.trim(), DATETIME_FORMAT)
                .map_err(|e| PulsetraderError::Data {
                    reason: format!("invalid datetime '{datetime_str}': {e}"),
                })?;

            // Half-open [start, end).
            if datetime < start || datetime >= end {
                continue;
            }

            let open = parse_field(&record, 1, "open", datetime_str)?;
            let high = parse_field(&record, 2, "high", datetime_str)?;
            let low = parse_field(&record, 3, "low", datetime_str)?;
            let close = parse_field(&record, 4, "close", datetime_str)?;
            let volume = parse_field(&record, 5, "volume", datetime_str)?;

            // Downstream code divides by prices; refuse rows that cannot
            // price a trade.
            for price in [open, high, low, close] {
                if !(price > 0.0) {
                    return Err(PulsetraderError::NonPositivePrice {
                        datetime: datetime_str.to_string(),
                        value: price,
                    });
                }
            }

            candles.push(Candle {
                datetime,
                open,
                high,
                low,
                close,
                volume,
            });
        }

        candles.sort_by_key(|c| c.datetime);
        Ok(candles)
    }
}
