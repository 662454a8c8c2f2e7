use anyhow::Context;
use bridge_cycler::cli::{Cli, Commands};
use bridge_cycler::core::config::BotConfig;
use bridge_cycler::core::domain::AccountBalanceSnapshot;
use bridge_cycler::core::wallet_store::WalletStore;
use bridge_cycler::orchestrator::CycleOutcome;
use bridge_cycler::service::{swap_client, BotServices};
use bridge_cycler::tools::{consolidate, distribute, TransferRecord, TransferStatus};
use clap::Parser;
use ethers::types::Address;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let config = BotConfig::load().context("loading configuration")?;
    let wallets = WalletStore::load(&config.wallets_path).context("loading wallets")?;

    match cli.command {
        Commands::Balances { address } => {
            let services = BotServices::connect(config)?;
            let reader = services.balance_reader();
            let addresses: Vec<Address> = match address {
                Some(a) => vec![a.parse().context("parsing --address")?],
                None => wallets.require_active()?.iter().map(|w| w.address).collect(),
            };
            for address in addresses {
                print_snapshot(&reader.snapshot(address).await);
            }
        }
        Commands::Consolidate { to, chain } => {
            let to: Address = to.parse().context("parsing --to")?;
            let services = BotServices::connect(config)?;
            let active = wallets.require_active()?;
            let records =
                consolidate(&services.executor(), &services.registry, &active, to, chain).await?;
            print_transfers(&records);
        }
        Commands::Distribute { from_index, chain, amount } => {
            let amount = ethers::utils::parse_ether(amount.trim()).context("parsing --amount")?;
            let services = BotServices::connect(config)?;
            let records = distribute(
                &services.executor(),
                &services.registry,
                &wallets,
                from_index,
                chain,
                amount,
            )
            .await?;
            print_transfers(&records);
        }
        Commands::Once { seed } => {
            let swap = swap_client(&config)?;
            let services = BotServices::connect(config)?;
            let runner = services.cycle_runner(swap);
            let mut rng = match seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_entropy(),
            };
            let active = wallets.require_active()?;
            let wallet = active
                .choose(&mut rng)
                .copied()
                .context("no active wallet")?;
            let outcome = runner.run_cycle(wallet, &mut rng).await;
            outcome.log(wallet.address);
            match outcome {
                CycleOutcome::Completed(report) => println!(
                    "completed: {} on {} -> {} on {} (request {}, status {})",
                    report.source_symbol,
                    report.source_chain_id,
                    report.delivered_symbol,
                    report.destination_chain_id,
                    report.request_id,
                    report.status.as_deref().unwrap_or("unknown")
                ),
                CycleOutcome::Skipped { step, reason } => println!("skipped at {}: {}", step, reason),
                CycleOutcome::Failed { step, error, retryable } => {
                    let hint = if retryable { " (transient)" } else { "" };
                    println!("failed at {}: {}{}", step, error, hint);
                    std::process::exit(1);
                }
            }
        }
    }

    Ok(())
}

fn print_snapshot(snapshot: &AccountBalanceSnapshot) {
    println!("{:?}", snapshot.address);
    for (chain_id, balances) in &snapshot.chains {
        let mut line = format!("  {:>6}  ETH {}", chain_id, balances.native.formatted);
        for (symbol, balance) in &balances.tokens {
            line.push_str(&format!("  {} {}", symbol, balance.formatted));
        }
        println!("{}", line);
    }
}

fn print_transfers(records: &[TransferRecord]) {
    if records.is_empty() {
        println!("nothing to transfer");
    }
    for r in records {
        let status = match &r.status {
            TransferStatus::Sent(hash) => format!("sent {:?}", hash),
            TransferStatus::Skipped(reason) => format!("skipped ({})", reason),
            TransferStatus::Failed(error) => format!("failed ({})", error),
        };
        println!("{:>6} {} {} {:?} -> {:?}: {}", r.chain_id, r.symbol, r.amount, r.from, r.to, status);
    }
}
