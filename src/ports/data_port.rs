//! Candle data access port trait.

use chrono::NaiveDateTime;

use crate::domain::candle::Candle;
use crate::domain::error::PulsetraderError;
use crate::domain::tick::Tick;

pub trait DataPort {
    /// Fetch candles for a market at one granularity over the half-open
    /// range `[start, end)`, ascending by timestamp.
    fn fetch_candles(
        &self,
        market: &str,
        tick: Tick,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<Candle>, PulsetraderError>;
}
