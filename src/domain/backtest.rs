//! Backtest orchestrator: the nested macro/micro event loop.

use super::candle::Candle;
use super::error::PulsetraderError;
use super::ledger::{Performance, PortfolioLedger, Ratios};
use super::order::{validate_order, OrderDecision, OrderKind};
use super::record::{PeriodRecorder, RecordValue};
use super::report::{MacroReport, MicroReport, Pulse, Trend};
use super::tick::Tick;
use crate::ports::analysis_port::{
    AnalysisError, MacroAnalysisPort, MicroAnalysisPort, OrderContext,
};
use crate::ports::indicator_port::{IndicatorPort, TimeframeCategory};
use chrono::NaiveDateTime;

/// Retry budget for one decision point before degrading to Hold.
pub const DEFAULT_MAX_DECISION_RETRIES: usize = 5;

/// A rate limit below this is a designed skip of the whole period.
const ZERO_LIMIT_EPSILON: f64 = 1e-8;

#[derive(Debug, Clone)]
pub struct BacktestConfig {
    pub market: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub macro_tick: Tick,
    pub micro_tick: Tick,
    pub initial_cash: f64,
    pub fee_rate: f64,
    pub risk_free_rate: f64,
    pub macro_only: bool,
    pub max_decision_retries: usize,
}

impl BacktestConfig {
    /// Tick length of the resolution that drives trading decisions; fixes
    /// the ledger's Sharpe annualization.
    pub fn decision_interval_minutes(&self) -> i64 {
        if self.macro_only {
            self.macro_tick.interval_minutes()
        } else {
            self.micro_tick.interval_minutes()
        }
    }
}

/// The three per-run record tables.
pub struct RecorderSet {
    pub macro_reports: PeriodRecorder,
    pub micro_reports: PeriodRecorder,
    pub trades: PeriodRecorder,
}

/// The external collaborators the loop suspends on.
pub struct Collaborators<'a> {
    pub indicators: &'a mut dyn IndicatorPort,
    pub macro_analysis: &'a mut dyn MacroAnalysisPort,
    pub micro_analysis: &'a mut dyn MicroAnalysisPort,
}

/// Deterministic decision rule for macro-only mode.
pub fn macro_only_decision(
    classification: Trend,
    rate_limit: f64,
    asset_ratio: f64,
) -> OrderDecision {
    match classification {
        Trend::Bull if rate_limit > asset_ratio => {
            OrderDecision::new(OrderKind::Buy, rate_limit - asset_ratio)
        }
        Trend::Bear if rate_limit < asset_ratio => {
            OrderDecision::new(OrderKind::Sell, asset_ratio - rate_limit)
        }
        _ => OrderDecision::hold(),
    }
}

/// Drive the full nested walk over both resolutions, then liquidate at the
/// last macro row's close. The ledger and recorders are exclusively owned
/// by this loop for the duration of the run.
pub fn run_backtest(
    macro_rows: &[Candle],
    micro_rows: &[Candle],
    config: &BacktestConfig,
    ledger: &mut PortfolioLedger,
    recorders: &mut RecorderSet,
    collaborators: &mut Collaborators<'_>,
) -> Result<Performance, PulsetraderError> {
    for (index, macro_row) in macro_rows.iter().enumerate() {
        let (enriched, chart) = collaborators.indicators.enrich(
            &macro_rows[..=index],
            macro_row,
            TimeframeCategory::Higher,
        )?;

        let report = match obtain_macro_report(
            collaborators.macro_analysis,
            &enriched,
            &chart,
            ledger.ratios(),
            config.max_decision_retries,
        ) {
            Some(report) => report,
            None => {
                eprintln!(
                    "{}: macro analysis failed after {} attempts, skipping period",
                    macro_row.datetime, config.max_decision_retries
                );
                continue;
            }
        };

        eprintln!(
            "{}: {} (confidence {:.2}, rate limit {:.2})",
            macro_row.datetime, report.classification, report.confidence, report.rate_limit
        );

        recorders.macro_reports.record_step(&[
            ("datetime", RecordValue::Datetime(macro_row.datetime)),
            (
                "classification",
                RecordValue::Text(report.classification.to_string()),
            ),
            ("confidence", RecordValue::Float(report.confidence)),
            ("rate_limit", RecordValue::Float(report.rate_limit)),
        ])?;

        if report.rate_limit.abs() < ZERO_LIMIT_EPSILON {
            eprintln!(
                "{}: rate limit is zero, no capital may move this period",
                macro_row.datetime
            );
            continue;
        }

        if config.macro_only {
            run_macro_only_step(macro_row, &report, ledger, recorders)?;
        } else {
            run_micro_loop(
                macro_row,
                micro_rows,
                &report,
                config,
                ledger,
                recorders,
                collaborators,
            )?;
        }
    }

    if let Some(last) = macro_rows.last() {
        ledger.liquidate_all(last);
        record_performance(&mut recorders.trades, last.datetime, ledger)?;
        let perf = ledger.performance();
        eprintln!(
            "final: return {:.2}%, mdd {:.2}%, sharpe {:.4}",
            perf.return_pct, perf.max_drawdown_pct, perf.sharpe
        );
    }

    Ok(ledger.performance())
}

/// Macro-only mode: one deterministic trade per macro row, no inner loop.
fn run_macro_only_step(
    macro_row: &Candle,
    report: &MacroReport,
    ledger: &mut PortfolioLedger,
    recorders: &mut RecorderSet,
) -> Result<(), PulsetraderError> {
    ledger.update_ratios(macro_row, false);
    let ratios = ledger.ratios();

    let decision = macro_only_decision(report.classification, report.rate_limit, ratios.asset);
    let decision = match validate_order(decision, ratios.cash, ratios.asset, report.rate_limit)
    {
        Ok(decision) => decision,
        Err(rejection) => {
            eprintln!("{}: {}, holding", macro_row.datetime, rejection);
            OrderDecision::hold()
        }
    };

    ledger.apply_trade(macro_row, decision.kind, decision.amount);
    if decision.kind != OrderKind::Hold {
        eprintln!(
            "{}: executed {} {:.4} at open {:.2}",
            macro_row.datetime, decision.kind, decision.amount, macro_row.open
        );
    }

    record_performance(&mut recorders.trades, macro_row.datetime, ledger)
}

/// The inner walk over the micro rows of one macro period. Decisions lag
/// by one micro tick: each row first applies the decision made after the
/// previous row, so the period's first row never trades.
fn run_micro_loop(
    macro_row: &Candle,
    micro_rows: &[Candle],
    report: &MacroReport,
    config: &BacktestConfig,
    ledger: &mut PortfolioLedger,
    recorders: &mut RecorderSet,
    collaborators: &mut Collaborators<'_>,
) -> Result<(), PulsetraderError> {
    let period_end = config.macro_tick.period_end(macro_row.datetime);
    let start = micro_rows.partition_point(|c| c.datetime < macro_row.datetime);
    let end = micro_rows.partition_point(|c| c.datetime < period_end);

    let mut pending: Option<OrderDecision> = None;

    for index in start..end {
        let row = &micro_rows[index];

        ledger.update_ratios(row, false);

        if let Some(decision) = pending.take() {
            ledger.apply_trade(row, decision.kind, decision.amount);
            if decision.kind != OrderKind::Hold {
                eprintln!(
                    "{}: executed {} {:.4} at open {:.2}",
                    row.datetime, decision.kind, decision.amount, row.open
                );
            }
        }

        record_performance(&mut recorders.trades, row.datetime, ledger)?;

        let (enriched, chart) = collaborators.indicators.enrich(
            &micro_rows[..=index],
            row,
            TimeframeCategory::Lower,
        )?;

        let micro_report = obtain_micro_report(
            collaborators.micro_analysis,
            &OrderContext {
                row: &enriched,
                chart: &chart,
                macro_report: report,
                ratios: ledger.ratios(),
            },
            report.rate_limit,
            config.max_decision_retries,
        );

        eprintln!(
            "{}: pulse {} (strength {:.2}) -> {} {:.4}",
            row.datetime,
            micro_report.pulse,
            micro_report.strength,
            micro_report.order.kind,
            micro_report.order.amount
        );

        recorders.micro_reports.record_step(&[
            ("datetime", RecordValue::Datetime(row.datetime)),
            ("pulse", RecordValue::Text(micro_report.pulse.to_string())),
            ("strength", RecordValue::Float(micro_report.strength)),
            (
                "order",
                RecordValue::Text(micro_report.order.kind.to_string()),
            ),
            ("amount", RecordValue::Float(micro_report.order.amount)),
        ])?;

        pending = Some(micro_report.order);
    }

    Ok(())
}

/// Bounded retry around the macro collaborator. `None` means the period
/// must be skipped.
fn obtain_macro_report(
    port: &mut dyn MacroAnalysisPort,
    row: &super::candle::EnrichedCandle,
    chart: &super::candle::ChartArtifact,
    ratios: Ratios,
    max_retries: usize,
) -> Option<MacroReport> {
    let mut feedback: Option<String> = None;

    for _ in 0..max_retries {
        match port.analyze(row, chart, ratios, feedback.as_deref()) {
            Ok(report) => return Some(report),
            Err(AnalysisError::Schema(reason)) => feedback = Some(reason),
            Err(AnalysisError::Unavailable(reason)) => {
                eprintln!("macro analysis unavailable: {reason}");
                return None;
            }
        }
    }

    None
}

/// Bounded retry around the micro collaborator, validating every proposal.
/// Exhaustion degrades to a forced Hold; the ledger never sees an invalid
/// amount.
fn obtain_micro_report(
    port: &mut dyn MicroAnalysisPort,
    context: &OrderContext<'_>,
    rate_limit: f64,
    max_retries: usize,
) -> MicroReport {
    let mut feedback: Option<String> = None;
    let mut last_valid_schema: Option<MicroReport> = None;

    for _ in 0..max_retries {
        match port.propose(context, feedback.as_deref()) {
            Ok(report) => {
                match validate_order(
                    report.order,
                    context.ratios.cash,
                    context.ratios.asset,
                    rate_limit,
                ) {
                    Ok(order) => return MicroReport { order, ..report },
                    Err(rejection) => {
                        feedback = Some(rejection.to_string());
                        last_valid_schema = Some(report);
                    }
                }
            }
            Err(AnalysisError::Schema(reason)) => feedback = Some(reason),
            Err(AnalysisError::Unavailable(reason)) => {
                eprintln!("micro analysis unavailable: {reason}");
                break;
            }
        }
    }

    eprintln!(
        "{}: decision retries exhausted, holding",
        context.row.candle.datetime
    );
    match last_valid_schema {
        Some(report) => MicroReport {
            order: OrderDecision::hold(),
            ..report
        },
        None => MicroReport {
            pulse: Pulse::NoBreakout,
            strength: 0.0,
            order: OrderDecision::hold(),
            reason: "decision retries exhausted".to_string(),
        },
    }
}

fn record_performance(
    recorder: &mut PeriodRecorder,
    datetime: NaiveDateTime,
    ledger: &PortfolioLedger,
) -> Result<(), PulsetraderError> {
    let perf = ledger.performance();
    recorder.record_step(&[
        ("datetime", RecordValue::Datetime(datetime)),
        ("return", RecordValue::Float(perf.return_pct)),
        ("mdd", RecordValue::Float(perf.max_drawdown_pct)),
        ("sharpe", RecordValue::Float(perf.sharpe)),
    ])
}
