//! Shared scripted collaborators for integration tests.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use chrono::{NaiveDate, NaiveDateTime};

use pulsetrader::domain::candle::{Candle, ChartArtifact, EnrichedCandle};
use pulsetrader::domain::error::PulsetraderError;
use pulsetrader::domain::order::{OrderDecision, OrderKind};
use pulsetrader::domain::record::{Column, RecordRow};
use pulsetrader::domain::report::{MacroReport, MicroReport, Pulse, Trend};
use pulsetrader::ports::analysis_port::{
    AnalysisError, MacroAnalysisPort, MicroAnalysisPort, OrderContext,
};
use pulsetrader::ports::indicator_port::{IndicatorPort, TimeframeCategory};
use pulsetrader::ports::record_port::RecordPort;

pub fn dt(day: u32, hour: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, day)
        .unwrap()
        .and_hms_opt(hour, 0, 0)
        .unwrap()
}

pub fn candle(datetime: NaiveDateTime, open: f64, close: f64) -> Candle {
    Candle {
        datetime,
        open,
        high: open.max(close),
        low: open.min(close),
        close,
        volume: 1000.0,
    }
}

pub fn macro_report(classification: Trend, rate_limit: f64) -> MacroReport {
    MacroReport {
        classification,
        confidence: 0.9,
        rate_limit,
        reason: "scripted".to_string(),
    }
}

pub fn micro_report(kind: OrderKind, amount: f64) -> MicroReport {
    MicroReport {
        pulse: match kind {
            OrderKind::Buy => Pulse::BreakoutUp,
            OrderKind::Sell => Pulse::BreakoutDown,
            OrderKind::Hold => Pulse::NoBreakout,
        },
        strength: 0.5,
        order: OrderDecision::new(kind, amount),
        reason: "scripted".to_string(),
    }
}

/// Passes the raw candle through untouched with an empty feature set.
pub struct PassthroughIndicator {
    pub calls: usize,
}

impl PassthroughIndicator {
    pub fn new() -> Self {
        Self { calls: 0 }
    }
}

impl IndicatorPort for PassthroughIndicator {
    fn enrich(
        &mut self,
        _history: &[Candle],
        row: &Candle,
        _timeframe: TimeframeCategory,
    ) -> Result<(EnrichedCandle, ChartArtifact), PulsetraderError> {
        self.calls += 1;
        Ok((
            EnrichedCandle {
                candle: row.clone(),
                features: Vec::new(),
            },
            ChartArtifact(Vec::new()),
        ))
    }
}

/// Answers from a fixed script, one entry per call.
pub struct ScriptedMacro {
    pub script: VecDeque<Result<MacroReport, AnalysisError>>,
    pub calls: usize,
}

impl ScriptedMacro {
    pub fn new(script: Vec<Result<MacroReport, AnalysisError>>) -> Self {
        Self {
            script: script.into(),
            calls: 0,
        }
    }
}

impl MacroAnalysisPort for ScriptedMacro {
    fn analyze(
        &mut self,
        _row: &EnrichedCandle,
        _chart: &ChartArtifact,
        _ratios: pulsetrader::domain::ledger::Ratios,
        _feedback: Option<&str>,
    ) -> Result<MacroReport, AnalysisError> {
        self.calls += 1;
        self.script
            .pop_front()
            .expect("macro script exhausted")
    }
}

/// Answers from a fixed script; once the script runs dry it keeps
/// repeating `fallback`. Records the feedback it was shown.
pub struct ScriptedMicro {
    pub script: VecDeque<Result<MicroReport, AnalysisError>>,
    pub fallback: Option<Result<MicroReport, AnalysisError>>,
    pub calls: usize,
    pub feedback_seen: Vec<Option<String>>,
}

impl ScriptedMicro {
    pub fn new(script: Vec<Result<MicroReport, AnalysisError>>) -> Self {
        Self {
            script: script.into(),
            fallback: None,
            calls: 0,
            feedback_seen: Vec::new(),
        }
    }

    pub fn repeating(fallback: Result<MicroReport, AnalysisError>) -> Self {
        Self::new(Vec::new()).with_fallback(fallback)
    }

    /// Keep answering `fallback` once the script runs dry instead of
    /// panicking.
    pub fn with_fallback(mut self, fallback: Result<MicroReport, AnalysisError>) -> Self {
        self.fallback = Some(fallback);
        self
    }
}

impl MicroAnalysisPort for ScriptedMicro {
    fn propose(
        &mut self,
        _context: &OrderContext<'_>,
        feedback: Option<&str>,
    ) -> Result<MicroReport, AnalysisError> {
        self.calls += 1;
        self.feedback_seen.push(feedback.map(str::to_string));
        match self.script.pop_front() {
            Some(answer) => answer,
            None => self
                .fallback
                .clone()
                .expect("micro script exhausted with no fallback"),
        }
    }
}

/// In-memory record store whose table the test can read afterwards.
pub struct SharedRecordStore {
    pub rows: Rc<RefCell<Vec<RecordRow>>>,
}

impl SharedRecordStore {
    pub fn new() -> (Self, Rc<RefCell<Vec<RecordRow>>>) {
        let rows = Rc::new(RefCell::new(Vec::new()));
        (Self { rows: rows.clone() }, rows)
    }
}

impl RecordPort for SharedRecordStore {
    fn reset(&mut self, _columns: &[Column]) -> Result<(), PulsetraderError> {
        self.rows.borrow_mut().clear();
        Ok(())
    }

    fn persist(
        &mut self,
        _columns: &[Column],
        rows: &[RecordRow],
    ) -> Result<(), PulsetraderError> {
        *self.rows.borrow_mut() = rows.to_vec();
        Ok(())
    }
}
