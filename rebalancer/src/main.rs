//! CLI entry point for tradelink.

use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use log::warn;

use tradelink_broker::Brokerage;
use tradelink_broker::tradestation::TradeStationBroker;
use tradelink_rebalancer::audit::AuditLog;
use tradelink_rebalancer::config::{Config, SyncPlan};
use tradelink_rebalancer::confirm::{AutoConfirm, ConfirmationProvider, InteractiveConfirm};
use tradelink_rebalancer::execution::{ExecutionController, SyncOutcome};
use tradelink_rebalancer::monitor::SystemClock;
use tradelink_rebalancer::report;
use tradelink_rebalancer::strategy::PvApiClient;

#[derive(Parser)]
#[command(name = "tradelink")]
#[command(about = "Keep a TradeStation account in sync with a PV-API strategy")]
#[command(version)]
struct Cli {
    /// Path to config.toml
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Plan, confirm, and execute trades until the account matches the strategy
    Sync {
        /// Path to plan.toml
        plan: PathBuf,

        /// Execute without asking for confirmation
        #[arg(short = 'y', long)]
        confirm_yes: bool,

        /// Do not record the trade dates back into plan.toml
        #[arg(long)]
        no_save: bool,
    },

    /// List brokerage accounts
    Accounts,

    /// Show account balances
    Balance {
        /// Account ID (default: every account)
        #[arg(long)]
        account: Option<String>,
    },

    /// Show account positions
    Positions {
        #[arg(long)]
        account: String,
    },

    /// Show quotes
    Quote {
        #[arg(required = true)]
        symbols: Vec<String>,
    },

    /// Show today's orders and their fills
    Orders {
        #[arg(long)]
        account: String,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();

    let cli = Cli::parse();

    let config = match Config::load(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading config: {e}");
            process::exit(1);
        }
    };

    let result = match cli.command {
        Command::Sync {
            plan,
            confirm_yes,
            no_save,
        } => sync(&config, &plan, confirm_yes, !no_save),
        Command::Accounts => show_accounts(&config),
        Command::Balance { account } => show_balance(&config, account.as_deref()),
        Command::Positions { account } => show_positions(&config, &account),
        Command::Quote { symbols } => show_quotes(&config, &symbols),
        Command::Orders { account } => show_orders(&config, &account),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn connect_broker(config: &Config) -> anyhow::Result<TradeStationBroker> {
    let token = config.broker_token()?;
    let timeout = Duration::from_secs(config.broker.timeout_secs);
    let broker = match &config.broker.base_url {
        Some(url) => TradeStationBroker::with_base_url(token, url, timeout)?,
        None => TradeStationBroker::new(token, config.broker.simulation, timeout)?,
    };
    Ok(broker.with_quote_batch(config.broker.quote_batch))
}

fn sync(config: &Config, plan_path: &Path, confirm_yes: bool, save: bool) -> anyhow::Result<()> {
    let mut plan = SyncPlan::load(plan_path)?;
    let broker = connect_broker(config)?;
    let engine = PvApiClient::new(
        config.strategy_api_key()?,
        &config.strategy.url,
        Duration::from_secs(config.strategy.timeout_secs),
    )?;
    let audit = AuditLog::open(&config.audit_path())
        .with_context(|| format!("opening {}", config.audit_path().display()))?;

    let confirm: &dyn ConfirmationProvider = if confirm_yes {
        &AutoConfirm
    } else {
        &InteractiveConfirm
    };
    let clock = SystemClock::new();
    let cancel = Arc::new(AtomicBool::new(false));
    install_shutdown_handler(Arc::clone(&cancel))?;
    let today = chrono::Local::now().date_naive();

    let report =
        ExecutionController::new(&broker, &engine, config, &plan, confirm, &clock, &*cancel)
            .with_audit(audit)
            .run(today)
            .with_context(|| {
                format!(
                    "sync of portfolio {} into account {}",
                    plan.portfolio_id, plan.account_id
                )
            })?;

    match &report.outcome {
        SyncOutcome::NotDue { next_trade_date } => {
            println!(
                "No trades necessary: next trade date {} has not arrived.",
                next_trade_date.map_or_else(|| "-".to_string(), |d| d.to_string())
            );
        }
        SyncOutcome::Declined { .. } => println!("User did not confirm transactions."),
        SyncOutcome::NotConverged {
            iterations,
            remainders,
        } => {
            println!("\nDid not converge after {iterations} iterations. Unfilled:");
            print!("{}", report::remainders_table(remainders));
        }
        SyncOutcome::Converged { iterations } => {
            println!("\nAccount is in sync ({iterations} iterations).");
            if let Some(next) = report.next_trade_date {
                println!("Next trade date: {next}");
            }
            if save {
                plan.record_trade(today, report.next_trade_date);
                plan.save(plan_path)?;
            }
        }
    }
    Ok(())
}

/// Raise `cancel` on SIGINT/SIGTERM. A second signal exits at once.
fn install_shutdown_handler(cancel: Arc<AtomicBool>) -> anyhow::Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("building signal runtime")?;
    std::thread::Builder::new()
        .name("signals".into())
        .spawn(move || runtime.block_on(watch_signals(cancel)))
        .context("spawning signal thread")?;
    Ok(())
}

async fn watch_signals(cancel: Arc<AtomicBool>) {
    loop {
        if let Err(e) = shutdown_signal().await {
            warn!("Signal handling unavailable: {e}");
            return;
        }
        if cancel.swap(true, Ordering::Relaxed) {
            eprintln!("Interrupted twice; exiting");
            process::exit(130);
        }
        warn!("Interrupt received; stopping the sync (press Ctrl-C again to exit now)");
    }
}

#[cfg(unix)]
async fn shutdown_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        res = tokio::signal::ctrl_c() => res,
        _ = terminate.recv() => Ok(()),
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}

fn show_accounts(config: &Config) -> anyhow::Result<()> {
    let broker = connect_broker(config)?;
    let accounts = broker.accounts().context("listing accounts")?;
    print!("{}", report::accounts_table(&accounts));
    Ok(())
}

fn show_balance(config: &Config, account: Option<&str>) -> anyhow::Result<()> {
    let broker = connect_broker(config)?;
    let ids: Vec<String> = match account {
        Some(id) => vec![id.to_string()],
        None => broker
            .accounts()
            .context("listing accounts")?
            .into_iter()
            .map(|a| a.account_id)
            .collect(),
    };
    for id in ids {
        let balance = broker
            .balance(&id)
            .with_context(|| format!("balance of {id}"))?;
        print!("{}", report::balance_table(&balance));
        println!();
    }
    Ok(())
}

fn show_positions(config: &Config, account: &str) -> anyhow::Result<()> {
    let broker = connect_broker(config)?;
    let positions = broker
        .positions(account)
        .with_context(|| format!("positions of {account}"))?;
    print!("{}", report::positions_table(&positions));
    Ok(())
}

fn show_quotes(config: &Config, symbols: &[String]) -> anyhow::Result<()> {
    let broker = connect_broker(config)?;
    let quotes = broker.quotes(symbols).context("fetching quotes")?;
    print!("{}", report::quotes_table(&quotes));
    Ok(())
}

fn show_orders(config: &Config, account: &str) -> anyhow::Result<()> {
    let broker = connect_broker(config)?;
    let orders = broker
        .order_status(account)
        .with_context(|| format!("orders of {account}"))?;
    print!("{}", report::fills_table(&orders));
    Ok(())
}
