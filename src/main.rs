// src/main.rs
//! Bridge cycler entry point
//! Loads configuration and wallets, then runs the cycle loop.
use anyhow::{Context, Result};
use bridge_cycler::core::config::BotConfig;
use bridge_cycler::core::wallet_store::WalletStore;
use bridge_cycler::orchestrator::Scheduler;
use bridge_cycler::service::{swap_client, BotServices};
use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(name = "bridge-cycler")]
#[command(about = "Cross-chain swap and bridge cycler")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Args {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the cycle loop
    Run {
        /// Stop after this many cycles
        #[arg(long)]
        max_cycles: Option<u64>,
        /// Seed for wallet, destination and delay choices
        #[arg(long)]
        seed: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging()?;

    info!("Starting bridge-cycler v{}", env!("CARGO_PKG_VERSION"));

    let (max_cycles, seed) = match args.command {
        Some(Commands::Run { max_cycles, seed }) => (max_cycles, seed),
        None => (None, None),
    };

    let config = BotConfig::load().context("loading configuration")?;
    let wallets = WalletStore::load(&config.wallets_path).context("loading wallets")?;
    // refuse to start without a wallet to cycle
    wallets.require_active()?;

    let swap = swap_client(&config)?;
    let (interval_min, interval_max) = (config.interval_min, config.interval_max);
    let services = BotServices::connect(config)?;
    let runner = services.cycle_runner(swap);
    let scheduler =
        Scheduler::new(&runner, &wallets, services.sleeper.as_ref(), interval_min, interval_max);

    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let summary = scheduler.run(&mut rng, max_cycles).await?;
    info!(
        completed = summary.completed,
        skipped = summary.skipped,
        failed = summary.failed,
        "Stopped"
    );
    Ok(())
}

fn init_logging() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,hyper=info,reqwest=info"));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_max_level(tracing::Level::TRACE)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}
