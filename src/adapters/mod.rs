//! Concrete port implementations.

pub mod csv_candle_adapter;
pub mod csv_record_adapter;
pub mod heuristic_analysis;
pub mod indicator_adapter;
pub mod ini_config_adapter;
