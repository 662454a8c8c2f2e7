use clap::{Parser, Subcommand};

/// Bridge cycler maintenance CLI (library-facing definitions)
#[derive(Debug, Parser)]
#[command(name = "cycler-cli", about = "Bridge cycler maintenance commands", disable_help_subcommand = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Print balances of one wallet, or of every active wallet
    Balances {
        #[arg(long)]
        address: Option<String>,
    },
    /// Move every WETH and USDC balance of the active wallets to one address
    Consolidate {
        #[arg(long)]
        to: String,
        /// Restrict to one chain id
        #[arg(long)]
        chain: Option<u64>,
    },
    /// Top up native gas on one chain from one wallet to the others
    Distribute {
        #[arg(long = "from-index")]
        from_index: usize,
        #[arg(long)]
        chain: u64,
        /// Amount in ETH, e.g. 0.002
        #[arg(long)]
        amount: String,
    },
    /// Run a single cycle on a random active wallet
    Once {
        #[arg(long)]
        seed: Option<u64>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_distribute() {
        let cli = Cli::try_parse_from([
            "cycler-cli", "distribute", "--from-index", "0", "--chain", "8453", "--amount", "0.002",
        ])
        .unwrap();
        match cli.command {
            Commands::Distribute { from_index, chain, amount } => {
                assert_eq!(from_index, 0);
                assert_eq!(chain, 8453);
                assert_eq!(amount, "0.002");
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn consolidate_chain_is_optional() {
        let cli = Cli::try_parse_from(["cycler-cli", "consolidate", "--to", "0xabc"]).unwrap();
        assert!(matches!(cli.command, Commands::Consolidate { chain: None, .. }));
    }
}
