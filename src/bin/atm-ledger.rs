use std::path::PathBuf;

use anyhow::{Context, Result};
use atm_ledger::{
    bin_utils::{Request, Service},
    command::PinPolicy,
    config::LedgerConfig,
    ledger::Ledger,
};
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "atm-ledger")]
#[command(about = "Account balances and transaction history kept in local files")]
struct Cli {
    /// Directory holding `accounts.csv` and the `tx_<account>.log` files
    #[arg(long, env = "ATM_LEDGER_DATA_DIR", default_value = ".")]
    data_dir: PathBuf,
    #[command(subcommand)]
    request: Request,
}

fn main() -> Result<()> {
    // stdout is reserved for request output
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = LedgerConfig::new(&cli.data_dir).with_pin_policy(PinPolicy::Digits(4));
    let ledger = Ledger::open(&config)
        .with_context(|| format!("Failed to open ledger in `{}`", cli.data_dir.display()))?;

    let service = Service {
        ledger: &ledger,
        output: &mut std::io::stdout(),
    };
    service.run(cli.request)
}
