//! Shared wiring for the orchestrator integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use alloy::primitives::{address, Address, U256};
use freya::{ChainRegistry, ContractBinding, TokenAmount, TransferOrchestrator, TransferRequest};
use freya_testing::TestBed;

/// Contract address used by every test binding
pub const SUPERETH: Address = address!("E55A698143bbb447F09b2628aAfE04991B764067");

/// Bridge recipient distinct from the wallet account
pub const RECIPIENT: &str = "0x742D35Cc6634c0532925A3B844bc9E7595f5fFb9";

/// Hex ids of the bundled catalogue
pub const BASE: &str = "0x14913";
pub const OPTIMISM: &str = "0xA8F3C";
pub const ZORA: &str = "0x7777777";

pub fn orchestrator(bed: &TestBed) -> TransferOrchestrator {
    let binding = ContractBinding::new(SUPERETH, Arc::new(bed.ledger.clone()));
    TransferOrchestrator::new(ChainRegistry::bundled(), Arc::new(bed.wallet.clone()), binding)
}

/// Connected orchestrator with an empty journal
pub async fn connected(bed: &TestBed) -> TransferOrchestrator {
    let orchestrator = orchestrator(bed);
    orchestrator.connect().await.unwrap();
    bed.journal.clear();
    orchestrator
}

pub fn amount(text: &str) -> TokenAmount {
    TokenAmount::parse(text).unwrap()
}

/// `text` in base units for `decimals`
pub fn units(text: &str, decimals: u8) -> U256 {
    amount(text).to_base_units(decimals).unwrap()
}

pub fn recipient() -> Address {
    freya::parse_recipient(RECIPIENT).unwrap()
}

pub fn request(value: &str, source: &str, target: &str) -> TransferRequest {
    TransferRequest::new(amount(value), source, target, RECIPIENT)
}
