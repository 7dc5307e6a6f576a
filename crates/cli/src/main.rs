use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;

mod commands;

use opt_trade_core::{load_trade_config, EngineConfig};
use opt_trade_bybit::{BybitClient, Credentials};
use opt_trade_trader::TickCache;

#[derive(Parser)]
#[command(name = "opt-trade")]
#[command(about = "Options execution and risk-sizing engine", long_about = None)]
struct Cli {
    /// Trade config file (JSON); also the source of API credentials
    /// unless BYBIT_API_KEY/BYBIT_API_SECRET are set
    #[arg(short, long, default_value = "trade_config.json")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Place the configured trade and report Greek exposures
    Trade,
    /// Show open option orders and positions
    Show,
    /// Cancel all open orders and close all positions
    CancelAll,
    /// Amend price and/or quantity of an open order
    Amend {
        #[arg(long)]
        order_id: String,
        /// New price (omit to keep)
        #[arg(long)]
        price: Option<Decimal>,
        /// New quantity (omit to keep)
        #[arg(long)]
        qty: Option<Decimal>,
    },
    /// Export reconciled trade history to CSV
    ExportHistory {
        /// How many days back to fetch
        #[arg(long, default_value_t = 7)]
        days: i64,
        /// Fetch everything the venue still retains
        #[arg(long)]
        all: bool,
        /// Export delivery (settlement) records instead of executions
        #[arg(long)]
        deliveries: bool,
        /// Output CSV path
        #[arg(short, long, default_value = "recent_trades.csv")]
        output: PathBuf,
    },
    /// Place reduce-only profit targets on all long positions
    ProfitTargets {
        /// Target as a multiple of average entry price
        #[arg(long)]
        multiple: Option<Decimal>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let trade_cfg = load_trade_config(&cli.config)?;
    let engine_cfg = EngineConfig::default();
    let (api_key, api_secret) = trade_cfg.credentials()?;
    let client = BybitClient::new(Credentials::new(api_key, api_secret))
        .with_base_url(engine_cfg.base_url.clone())
        .with_recv_window(engine_cfg.recv_window_ms);
    let ticks = TickCache::new();

    match cli.command {
        Commands::Trade => commands::trade::run(&client, &ticks, &trade_cfg, &engine_cfg).await,
        Commands::Show => commands::manage::show(&client).await,
        Commands::CancelAll => commands::manage::cancel_all(&client).await,
        Commands::Amend {
            order_id,
            price,
            qty,
        } => commands::manage::amend(&client, &order_id, price, qty).await,
        Commands::ExportHistory {
            days,
            all,
            deliveries,
            output,
        } => commands::history::export(&client, &engine_cfg, days, all, deliveries, &output).await,
        Commands::ProfitTargets { multiple } => {
            let multiple = multiple.unwrap_or(engine_cfg.profit_multiple);
            commands::manage::profit_targets(&client, &ticks, multiple).await
        }
    }
}
