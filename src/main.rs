// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/mandiwatch

//! MandiWatch - Agricultural Market Analytics
//!
//! Command line front end for the analytics core:
//! - `analyze` runs every analysis over a JSON market series
//! - `demo` runs the same over simulated data with injected spikes and hoarding
//! - `init-config` writes the default configuration

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use mandiwatch::analysis::{MarketVolatilityIndicator, PricePrediction, SupplyDemandBalance, TrendAnalysis};
use mandiwatch::service::{InMemoryMarketData, MemoryRecordStore};
use mandiwatch::simulator::{MarketEvent, MarketSimulator, SimulationPlan};
use mandiwatch::{AnalyticsService, Config, DetectionReport, MarketKey, MarketSeries, NAME, VERSION};

/// MandiWatch - Agricultural Market Analytics
#[derive(Parser, Debug)]
#[command(name = "mandiwatch")]
#[command(author = "MandiWatch Project")]
#[command(version = VERSION)]
#[command(about = "Price spike, hoarding and supply-demand analytics for mandi data")]
struct Args {
    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Enable trace-level logging
    #[arg(long, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyze a market series read from a JSON file
    Analyze {
        /// JSON file holding a market series
        #[arg(short, long)]
        input: PathBuf,

        /// Prediction horizon in days
        #[arg(long)]
        horizon: Option<u32>,

        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Analyze simulated data with an injected spike and hoarding window
    Demo {
        /// RNG seed
        #[arg(long, default_value = "42")]
        seed: u64,

        /// Days of history to simulate
        #[arg(long, default_value = "60")]
        days: usize,

        /// Commodity name
        #[arg(long, default_value = "Onion")]
        commodity: String,
    },

    /// Write the default configuration file
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Everything derived for one series
#[derive(Debug, Serialize)]
struct MarketReport {
    detection: DetectionReport,
    balance: SupplyDemandBalance,
    trend: Option<TrendAnalysis>,
    prediction: Option<PricePrediction>,
    volatility: Option<MarketVolatilityIndicator>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.trace {
        Level::TRACE
    } else if args.debug {
        Level::DEBUG
    } else {
        Level::INFO
    };

    // Logs go to stderr so stdout stays valid JSON
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_file(args.debug)
        .with_line_number(args.debug)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("{} v{}", NAME, VERSION);

    let config_path = args.config.unwrap_or_else(Config::default_path);

    match args.command {
        Command::InitConfig { force } => {
            if config_path.exists() && !force {
                anyhow::bail!("{:?} already exists, use --force to overwrite", config_path);
            }
            if let Some(parent) = config_path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            Config::default().save(&config_path)?;
            println!("{}", config_path.display());
            Ok(())
        }
        Command::Analyze { input, horizon, pretty } => {
            let config = Config::load_or_create(&config_path)?;
            let content = std::fs::read_to_string(&input)
                .with_context(|| format!("reading {:?}", input))?;
            let series: MarketSeries = serde_json::from_str(&content)
                .with_context(|| format!("parsing market series from {:?}", input))?;

            let rt = tokio::runtime::Runtime::new()?;
            let report = rt.block_on(run_analysis(&config, series, horizon))?;
            print_json(&report, pretty)
        }
        Command::Demo { seed, days, commodity } => {
            let config = Config::load_or_create(&config_path)?;
            let series = simulate(seed, days, &commodity)?;
            info!(
                "Simulated {} days of {} (seed {})",
                days, commodity, seed
            );

            let rt = tokio::runtime::Runtime::new()?;
            let report = rt.block_on(run_analysis(&config, series, None))?;
            print_json(&report, true)
        }
    }
}

async fn run_analysis(config: &Config, series: MarketSeries, horizon: Option<u32>) -> Result<MarketReport> {
    let mut key = MarketKey::new(&series.commodity);
    key.variety = series.variety.clone();
    key.region = series.region.clone();

    let source = Arc::new(InMemoryMarketData::new(series.prices, series.inventory));
    let store = Arc::new(MemoryRecordStore::new());
    let service = AnalyticsService::new(config, source, store.clone())?;

    let detection = service.detect(&key).await?;
    let balance = service.balance(&key).await?;

    // Short histories still get a detection report and a balance
    let trend = service
        .trend(&key, None)
        .await
        .map_err(|e| warn!("Trend analysis skipped: {}", e))
        .ok();
    let prediction = service
        .predict(&key, horizon)
        .await
        .map_err(|e| warn!("Prediction skipped: {}", e))
        .ok();
    let volatility = service
        .volatility(&key, None)
        .await
        .map_err(|e| warn!("Volatility indicator skipped: {}", e))
        .ok();

    info!("{} records derived for {}", store.len(), key.commodity);

    Ok(MarketReport {
        detection,
        balance,
        trend,
        prediction,
        volatility,
    })
}

fn simulate(seed: u64, days: usize, commodity: &str) -> Result<MarketSeries> {
    let days = days.max(30);
    let start = Utc::now() - Duration::days(days as i64);

    let plan = SimulationPlan::new(commodity, start, days)
        .with_event(MarketEvent::PriceSpike {
            day: days - 5,
            factor: 1.6,
        })
        .with_event(MarketEvent::Hoarding {
            start_day: days - 20,
            days: 12,
            multiplier: 2.2,
        });

    let mut simulator = MarketSimulator::new(seed);
    Ok(MarketSeries::new(commodity)
        .with_prices(simulator.price_series(&plan)?)
        .with_inventory(simulator.inventory_series(&plan)?))
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    let out = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{}", out);
    Ok(())
}
