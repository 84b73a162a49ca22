//! Orchestrator wired to the alloy backend.
//!
//! Offline tests point every chain at a closed port; the node-backed test
//! needs `anvil` on the PATH.

use std::sync::Arc;

use freya::{ChainDescriptor, ErrorKind, FreyaConfig, TransferOrchestrator};
use freya_supereth::LocalWallet;

// Anvil's first default account
const ANVIL_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

fn offline_config() -> FreyaConfig {
    let mut config = FreyaConfig::default();
    config.chains = config
        .chains
        .iter()
        .map(|chain| {
            ChainDescriptor::new(chain.id(), chain.name(), chain.numeric_id())
                .with_rpc_url("http://127.0.0.1:1")
        })
        .collect();
    config
}

fn orchestrator(config: &FreyaConfig) -> TransferOrchestrator {
    let wallet = LocalWallet::from_private_key(ANVIL_KEY, config.endpoints(), 0x14913).unwrap();
    let connector = Arc::new(wallet.connector());
    TransferOrchestrator::from_config(config, Arc::new(wallet), connector).unwrap()
}

#[tokio::test]
async fn test_connect_degrades_balances_when_node_unreachable() {
    let orchestrator = orchestrator(&offline_config());

    let account = orchestrator.connect().await.unwrap();

    assert_eq!(account.to_checksum(None), "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266");
    assert_eq!(orchestrator.session().active_chain_id(), Some(0x14913));
    assert!(orchestrator.balances().native_balance(0x14913).is_none());
    assert!(orchestrator.balances().bridged_balance(0x14913).is_none());
}

#[tokio::test]
async fn test_deposit_fails_cleanly_when_node_unreachable() {
    let orchestrator = orchestrator(&offline_config());
    orchestrator.connect().await.unwrap();

    let err = orchestrator.deposit(&"0.1".parse().unwrap()).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::TransactionFailed);
    assert!(!orchestrator.state().is_in_progress());
}

#[tokio::test]
async fn test_switch_between_configured_chains() {
    let orchestrator = orchestrator(&offline_config());
    orchestrator.connect().await.unwrap();

    orchestrator.switch_chain("0xA8F3C").await.unwrap();
    assert_eq!(orchestrator.session().active_chain_id(), Some(0xA8F3C));
    let signer = orchestrator.session().signer().await.unwrap();
    assert_eq!(signer.chain_id(), 0xA8F3C);
}

#[tokio::test]
#[ignore = "Requires anvil"]
async fn test_native_balance_from_anvil() {
    use alloy::node_bindings::Anvil;

    let anvil = Anvil::new().chain_id(0x14913).spawn();
    let mut config = FreyaConfig::default();
    config.chains = vec![
        ChainDescriptor::new("0x14913", "Base Sepolia", 0x14913).with_rpc_url(anvil.endpoint()),
        ChainDescriptor::new("0xA8F3C", "Optimism Sepolia", 0xA8F3C).with_rpc_url(anvil.endpoint()),
    ];
    let orchestrator = orchestrator(&config);

    orchestrator.connect().await.unwrap();

    let native = orchestrator.balances().native_balance(0x14913).unwrap();
    assert_eq!(native.formatted, "10000.000000000000000000");
    // No SuperETH deployment on a fresh node
    assert!(orchestrator.balances().bridged_balance(0x14913).is_none());
}
