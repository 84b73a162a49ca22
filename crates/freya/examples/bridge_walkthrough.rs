//! Bridge Walkthrough Example
//!
//! Runs a deposit, a bridge and a failed bridge against the in-memory wallet
//! and ledger, printing the status narrative of each.
//!
//! Run with:
//! ```bash
//! RUST_LOG=freya=debug cargo run -p freya --example bridge_walkthrough
//! ```

use std::sync::Arc;

use freya::prelude::*;
use freya::{ContractBinding, DEFAULT_CONTRACT_ADDRESS};
use freya_testing::{Failure, Method, TestBed};
use tracing_subscriber::EnvFilter;

const RECIPIENT: &str = "0x742D35Cc6634c0532925A3B844bc9E7595f5fFb9";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    println!("🦀 Freya Bridge Walkthrough\n");

    let bed = TestBed::new();
    let binding = ContractBinding::new(DEFAULT_CONTRACT_ADDRESS.parse()?, Arc::new(bed.ledger.clone()));
    let orchestrator =
        TransferOrchestrator::new(ChainRegistry::bundled(), Arc::new(bed.wallet.clone()), binding);

    let account = orchestrator.connect().await?;
    println!("Connected {account}");
    for chain in orchestrator.registry().list_chains() {
        println!("  {} ({})", chain.name(), chain.id());
    }

    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    let receipt = orchestrator.deposit(&"2".parse()?).await?;
    print_status(&orchestrator.status());
    println!("Deposit tx {}", receipt.tx_hash);

    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    let request = orchestrator.request("1.5", RECIPIENT)?;
    let receipt = orchestrator.bridge(&request).await?;
    print_status(&orchestrator.status());
    println!("Burn tx {}\nMint tx {}", receipt.burn_tx, receipt.mint_tx);

    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    orchestrator.switch_chain(&request.source_chain).await?;
    bed.ledger.fail_next(Method::Mint, Failure::Revert);
    let request = orchestrator.request("0.25", RECIPIENT)?;
    match orchestrator.bridge(&request).await {
        Err(FreyaError::PostBurnStuck(stuck)) => {
            print_status(&orchestrator.status());
            println!("Manual mint needed: {} base units to {} on {}", stuck.amount, stuck.recipient, stuck.target_chain);
        }
        other => println!("Unexpected outcome: {other:?}"),
    }

    Ok(())
}

fn print_status(status: &OperationStatus) {
    if let Some(kind) = status.kind {
        println!("[{kind}]");
    }
    for phase in &status.phases {
        println!("  {phase}");
    }
}
