//! Core domain types and logic.

pub mod backtest;
pub mod candle;
pub mod error;
pub mod ledger;
pub mod order;
pub mod record;
pub mod report;
pub mod tick;
