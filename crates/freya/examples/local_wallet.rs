//! Local Wallet Example
//!
//! Connects a private-key wallet to the configured chains and prints the
//! native and SuperETH balances on each.
//!
//! Run with:
//! ```bash
//! FREYA_PRIVATE_KEY=0x... cargo run -p freya --example local_wallet
//! ```
//!
//! Set `FREYA_CONFIG` to a JSON config file to override the bundled chains.

use std::sync::Arc;

use anyhow::Context;
use freya::prelude::*;
use freya_supereth::LocalWallet;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let config = FreyaConfig::load()?;
    let key = std::env::var("FREYA_PRIVATE_KEY").context("FREYA_PRIVATE_KEY is not set")?;
    let registry = config.registry()?;
    let start = registry
        .find_chain(&config.default_source)
        .context("default source chain missing from the catalogue")?
        .numeric_id();

    let wallet = LocalWallet::from_private_key(&key, config.endpoints(), start)?;
    let connector = Arc::new(wallet.connector());
    let orchestrator = TransferOrchestrator::from_config(&config, Arc::new(wallet), connector)?;

    let account = orchestrator.connect().await?;
    println!("Account {account}\n");

    for chain in registry.list_chains() {
        if chain.rpc_url().is_none() {
            continue;
        }
        if let Err(e) = orchestrator.switch_chain(chain.id()).await {
            println!("{:<20} unavailable: {e}", chain.name());
            continue;
        }
        let native = orchestrator.balances().native_balance(chain.numeric_id());
        let bridged = orchestrator.balances().bridged_balance(chain.numeric_id());
        println!(
            "{:<20} {:>28} ETH {:>28} sETH",
            chain.name(),
            native.map_or_else(|| "-".to_string(), |b| b.formatted),
            bridged.map_or_else(|| "-".to_string(), |b| b.formatted),
        );
    }

    Ok(())
}
