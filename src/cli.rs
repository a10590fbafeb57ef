//! CLI definition and dispatch.

use chrono::NaiveDateTime;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_candle_adapter::CsvCandleAdapter;
use crate::adapters::csv_record_adapter::CsvRecordStore;
use crate::adapters::heuristic_analysis::{BreakoutPulseAdapter, SmaTrendAdapter};
use crate::adapters::indicator_adapter::SmaIndicatorAdapter;
use crate::adapters::ini_config_adapter::IniConfigAdapter;
use crate::domain::backtest::{
    run_backtest, BacktestConfig, Collaborators, RecorderSet, DEFAULT_MAX_DECISION_RETRIES,
};
use crate::domain::error::PulsetraderError;
use crate::domain::ledger::{PortfolioLedger, DEFAULT_FEE_RATE};
use crate::domain::record::{PeriodRecorder, ReportCategory};
use crate::domain::tick::Tick;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;

const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const DEFAULT_SMA_WINDOW: usize = 20;

#[derive(Parser, Debug)]
#[command(name = "pulsetrader", about = "Two-resolution strategy backtester")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a backtest
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Skip the micro loop and trade directly off macro reports
        #[arg(long)]
        macro_only: bool,
    },
    /// Parse a config file and echo the resolved run settings
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Show candle counts and date ranges for both resolutions
    Info {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Backtest { config, macro_only } => run_backtest_command(&config, macro_only),
        Command::Validate { config } => run_validate(&config),
        Command::Info { config } => run_info(&config),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::from(&err)
        }
    }
}

/// Run settings resolved from the config file.
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub backtest: BacktestConfig,
    pub data_dir: PathBuf,
    pub results_dir: PathBuf,
}

pub fn load_settings(config: &dyn ConfigPort) -> Result<RunSettings, PulsetraderError> {
    let market = config.require_string("backtest", "market")?;
    let start = parse_datetime(config, "start_date")?;
    let end = parse_datetime(config, "end_date")?;
    if start >= end {
        return Err(PulsetraderError::ConfigInvalid {
            section: "backtest".to_string(),
            key: "end_date".to_string(),
            reason: "end_date must be after start_date".to_string(),
        });
    }

    let macro_tick: Tick = config.require_string("backtest", "macro_tick")?.parse()?;
    let micro_tick: Tick = config.require_string("backtest", "micro_tick")?.parse()?;

    let backtest = BacktestConfig {
        market,
        start,
        end,
        macro_tick,
        micro_tick,
        initial_cash: config.get_double("backtest", "initial_cash", 10_000_000.0),
        fee_rate: config.get_double("backtest", "fee_rate", DEFAULT_FEE_RATE),
        risk_free_rate: config.get_double("backtest", "risk_free_rate", 0.0),
        macro_only: config.get_bool("backtest", "macro_only", false),
        max_decision_retries: DEFAULT_MAX_DECISION_RETRIES,
    };

    Ok(RunSettings {
        backtest,
        data_dir: PathBuf::from(
            config
                .get_string("data", "dir")
                .unwrap_or_else(|| "data".to_string()),
        ),
        results_dir: PathBuf::from(
            config
                .get_string("results", "dir")
                .unwrap_or_else(|| "results".to_string()),
        ),
    })
}

fn parse_datetime(
    config: &dyn ConfigPort,
    key: &str,
) -> Result<NaiveDateTime, PulsetraderError> {
    let raw = config.require_string("backtest", key)?;
    NaiveDateTime::parse_from_str(&raw, DATETIME_FORMAT).map_err(|e| {
        PulsetraderError::ConfigInvalid {
            section: "backtest".to_string(),
            key: key.to_string(),
            reason: format!("'{raw}' is not a {DATETIME_FORMAT} datetime: {e}"),
        }
    })
}

fn load_config(path: &Path) -> Result<IniConfigAdapter, PulsetraderError> {
    IniConfigAdapter::from_file(path).map_err(|e| PulsetraderError::ConfigParse {
        file: path.display().to_string(),
        reason: e.to_string(),
    })
}

fn run_backtest_command(
    config_path: &Path,
    macro_only_override: bool,
) -> Result<(), PulsetraderError> {
    let config = load_config(config_path)?;
    let mut settings = load_settings(&config)?;
    if macro_only_override {
        settings.backtest.macro_only = true;
    }
    let run = &settings.backtest;

    eprintln!(
        "backtesting {} from {} to {} ({} / {}{})",
        run.market,
        run.start,
        run.end,
        run.macro_tick,
        run.micro_tick,
        if run.macro_only { ", macro-only" } else { "" }
    );

    let data = CsvCandleAdapter::new(settings.data_dir.clone());
    let macro_rows = data.fetch_candles(&run.market, run.macro_tick, run.start, run.end)?;
    let micro_rows = if run.macro_only {
        Vec::new()
    } else {
        data.fetch_candles(&run.market, run.micro_tick, run.start, run.end)?
    };

    let mut ledger = PortfolioLedger::new(
        run.initial_cash,
        run.fee_rate,
        run.risk_free_rate,
        run.decision_interval_minutes(),
    );

    let mut recorders = RecorderSet {
        macro_reports: recorder(&settings, ReportCategory::Macro)?,
        micro_reports: recorder(&settings, ReportCategory::Micro)?,
        trades: recorder(&settings, ReportCategory::Trade)?,
    };

    let mut indicators = SmaIndicatorAdapter::new(DEFAULT_SMA_WINDOW);
    let mut macro_analysis = SmaTrendAdapter::default();
    let mut micro_analysis = BreakoutPulseAdapter::default();
    let mut collaborators = Collaborators {
        indicators: &mut indicators,
        macro_analysis: &mut macro_analysis,
        micro_analysis: &mut micro_analysis,
    };

    let backtest = settings.backtest.clone();
    let perf = run_backtest(
        &macro_rows,
        &micro_rows,
        &backtest,
        &mut ledger,
        &mut recorders,
        &mut collaborators,
    )?;

    println!("market:   {}", backtest.market);
    println!("return:   {:.2}%", perf.return_pct);
    println!("mdd:      {:.2}%", perf.max_drawdown_pct);
    println!("sharpe:   {:.4}", perf.sharpe);
    println!("results:  {}", settings.results_dir.display());
    Ok(())
}

fn recorder(
    settings: &RunSettings,
    category: ReportCategory,
) -> Result<PeriodRecorder, PulsetraderError> {
    let store = CsvRecordStore::new(&settings.results_dir, category, &settings.backtest.market);
    PeriodRecorder::new(category, Box::new(store))
}

fn run_validate(config_path: &Path) -> Result<(), PulsetraderError> {
    let config = load_config(config_path)?;
    let settings = load_settings(&config)?;
    let run = &settings.backtest;

    println!("market:       {}", run.market);
    println!("range:        [{}, {})", run.start, run.end);
    println!("macro tick:   {}", run.macro_tick);
    println!("micro tick:   {}", run.micro_tick);
    println!("initial cash: {}", run.initial_cash);
    println!("fee rate:     {}", run.fee_rate);
    println!("macro only:   {}", run.macro_only);
    println!("data dir:     {}", settings.data_dir.display());
    println!("results dir:  {}", settings.results_dir.display());
    Ok(())
}

fn run_info(config_path: &Path) -> Result<(), PulsetraderError> {
    let config = load_config(config_path)?;
    let settings = load_settings(&config)?;
    let run = &settings.backtest;
    let data = CsvCandleAdapter::new(settings.data_dir.clone());

    for tick in [run.macro_tick, run.micro_tick] {
        let candles = data.fetch_candles(&run.market, tick, run.start, run.end)?;
        match (candles.first(), candles.last()) {
            (Some(first), Some(last)) => println!(
                "{} {}: {} candles, {} .. {}",
                run.market,
                tick,
                candles.len(),
                first.datetime,
                last.datetime
            ),
            _ => println!("{} {}: no candles in range", run.market, tick),
        }
    }
    Ok(())
}
