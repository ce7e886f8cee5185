//! Bridge Claimer
//!
//! Operator CLI for cross-chain bridge messages.
//!
//! # Commands
//!
//! - `watch` - poll every recorded transaction and log status, processability
//!   and invocation-delay changes until the messages settle
//! - `status` - print a one-shot report per transaction
//! - `claim` - process a NEW message, retry a RETRIABLE one, or release a
//!   FAILED one back to its owner on the source chain

use std::path::PathBuf;

use alloy::primitives::B256;
use bridge_sdk::PollingEvent;
use clap::{Parser, Subcommand};
use claimer::app::App;
use claimer::config::Config;
use claimer::records::{find_transaction, load_transactions};
use eyre::eyre;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll recorded transactions until they settle
    Watch {
        /// JSON file of bridge transactions
        #[arg(short, long, value_name = "FILE")]
        txs: PathBuf,
    },
    /// Print the current status of recorded transactions
    Status {
        #[arg(short, long, value_name = "FILE")]
        txs: PathBuf,
        /// Only report this source transaction or message hash
        #[arg(long)]
        hash: Option<B256>,
    },
    /// Claim, retry or release one message
    Claim {
        #[arg(short, long, value_name = "FILE")]
        txs: PathBuf,
        /// Source transaction or message hash
        #[arg(long)]
        hash: B256,
        /// Final retry; a failing call marks the message FAILED
        #[arg(long)]
        last_attempt: bool,
        /// Submit without simulating first
        #[arg(long)]
        force: bool,
    },
}

fn main() -> eyre::Result<()> {
    color_eyre::install()?;

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async_main())
}

async fn async_main() -> eyre::Result<()> {
    init_logging();

    let cli = Cli::parse();

    let config = Config::load()?;
    info!(
        routing = %config.routing_config.display(),
        chains = config.rpc_urls.len(),
        "Configuration loaded"
    );
    let app = App::new(config)?;

    match cli.command {
        Commands::Watch { txs } => watch(&app, txs).await,
        Commands::Status { txs, hash } => status(&app, txs, hash).await,
        Commands::Claim {
            txs,
            hash,
            last_attempt,
            force,
        } => claim(&app, txs, hash, last_attempt, force).await,
    }
}

async fn watch(app: &App, txs: PathBuf) -> eyre::Result<()> {
    info!("Starting bridge claimer watch");

    let mut tasks = JoinSet::new();
    for tx in load_transactions(txs)? {
        let tx_hash = tx.hash;
        match app.registry().start_polling(tx, true).await {
            Ok(Some(mut handle)) => {
                tasks.spawn(async move {
                    while let Some(event) = handle.recv().await {
                        match event {
                            PollingEvent::Stop => break,
                            PollingEvent::Status(status) => {
                                info!(tx_hash = %tx_hash, status = %status, "Status")
                            }
                            PollingEvent::Processable(processable) => {
                                info!(tx_hash = %tx_hash, processable = processable, "Processable")
                            }
                            PollingEvent::Delay(delay) => {
                                info!(tx_hash = %tx_hash, preferred_delay = delay, "Invocation delay")
                            }
                            PollingEvent::Error(e) => {
                                error!(tx_hash = %tx_hash, error = %e, "Polling error")
                            }
                        }
                    }
                });
            }
            Ok(None) => info!(tx_hash = %tx_hash, "Already processed, skipping"),
            Err(e) => warn!(tx_hash = %tx_hash, error = %e, "Cannot poll transaction"),
        }
    }

    if tasks.is_empty() {
        info!("Nothing to watch");
        return Ok(());
    }

    tokio::select! {
        _ = wait_for_shutdown_signal() => {}
        _ = async { while tasks.join_next().await.is_some() {} } => {
            info!("All messages settled");
        }
    }

    app.shutdown().await;
    info!("Bridge claimer stopped");
    Ok(())
}

async fn status(app: &App, txs: PathBuf, hash: Option<B256>) -> eyre::Result<()> {
    let txs = load_transactions(txs)?;
    let selected: Vec<_> = match hash {
        Some(hash) => vec![find_transaction(&txs, hash)
            .ok_or_else(|| eyre!("No recorded transaction {}", hash))?],
        None => txs.iter().collect(),
    };

    for tx in selected {
        match app.status(tx).await {
            Ok(report) => println!("{}", report),
            Err(e) => println!("{} error: {}", tx.hash, e),
        }
    }
    Ok(())
}

async fn claim(
    app: &App,
    txs: PathBuf,
    hash: B256,
    last_attempt: bool,
    force: bool,
) -> eyre::Result<()> {
    let txs = load_transactions(txs)?;
    let tx = find_transaction(&txs, hash).ok_or_else(|| eyre!("No recorded transaction {}", hash))?;

    let chain_id = app.claim_chain(tx).await?;
    let wallet = app.wallet(chain_id)?;
    let prover = app.http_prover()?;

    let tx_hash = app.claim(tx, &wallet, prover, last_attempt, force).await?;
    println!("{}", tx_hash);
    Ok(())
}

fn init_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,bridge_claimer=debug,claimer=debug,bridge_sdk=debug"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

async fn wait_for_shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown");
        }
    }
}
