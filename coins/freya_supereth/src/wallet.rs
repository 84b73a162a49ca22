//! A [`WalletProvider`] backed by a local private key and per-chain RPC endpoints.
//!
//! Stands in for an injected browser wallet when running headless: the active
//! chain is local state, switching only succeeds for chains with a configured
//! endpoint, and switches are announced through `ChainChanged` events.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use alloy::primitives::{Address, U256};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::signers::local::PrivateKeySigner;
use anyhow::Result;
use async_trait::async_trait;
use freya_error::WalletError;
use freya_traits::{EventListener, ListenerId, ListenerRegistry, ProviderEvent, WalletProvider};
use tracing::{debug, info};

use crate::token::AlloyTokenConnector;

/// Private-key wallet that can hop between configured chains.
#[derive(Debug)]
pub struct LocalWallet {
    signer: PrivateKeySigner,
    endpoints: BTreeMap<u64, String>,
    active_chain: AtomicU64,
    listeners: ListenerRegistry,
}

impl LocalWallet {
    /// Creates a wallet on `initial_chain`, which must have an endpoint
    pub fn new(
        signer: PrivateKeySigner,
        endpoints: impl IntoIterator<Item = (u64, String)>,
        initial_chain: u64,
    ) -> Result<Self, WalletError> {
        let endpoints: BTreeMap<u64, String> = endpoints.into_iter().collect();
        if !endpoints.contains_key(&initial_chain) {
            return Err(WalletError::UnrecognizedChain { chain_id: initial_chain });
        }
        Ok(Self {
            signer,
            endpoints,
            active_chain: AtomicU64::new(initial_chain),
            listeners: ListenerRegistry::new(),
        })
    }

    /// Creates a wallet from a hex private key (with or without `0x`)
    pub fn from_private_key(
        private_key: &str,
        endpoints: impl IntoIterator<Item = (u64, String)>,
        initial_chain: u64,
    ) -> Result<Self> {
        // Strip 0x prefix if present
        let key = private_key.trim().strip_prefix("0x").unwrap_or(private_key.trim());
        let bytes = hex::decode(key)?;
        let signer = PrivateKeySigner::from_slice(&bytes)?;
        Ok(Self::new(signer, endpoints, initial_chain)?)
    }

    /// Account controlled by the key
    pub fn address(&self) -> Address {
        self.signer.address()
    }

    /// Chain ids with a configured endpoint
    pub fn chains(&self) -> impl Iterator<Item = u64> + '_ {
        self.endpoints.keys().copied()
    }

    /// A token connector signing with the same key over the same endpoints
    pub fn connector(&self) -> AlloyTokenConnector {
        self.endpoints.iter().fold(
            AlloyTokenConnector::new(self.signer.clone()),
            |connector, (chain_id, url)| connector.with_endpoint(*chain_id, url.clone()),
        )
    }

    fn active_endpoint(&self) -> Result<&str, WalletError> {
        let chain_id = self.active_chain.load(Ordering::SeqCst);
        self.endpoints
            .get(&chain_id)
            .map(String::as_str)
            .ok_or(WalletError::UnrecognizedChain { chain_id })
    }
}

#[async_trait]
impl WalletProvider for LocalWallet {
    async fn request_accounts(&self) -> Result<Vec<Address>, WalletError> {
        Ok(vec![self.address()])
    }

    async fn chain_id(&self) -> Result<u64, WalletError> {
        Ok(self.active_chain.load(Ordering::SeqCst))
    }

    async fn switch_chain(&self, chain_id: u64) -> Result<(), WalletError> {
        if !self.endpoints.contains_key(&chain_id) {
            return Err(WalletError::UnrecognizedChain { chain_id });
        }
        let previous = self.active_chain.swap(chain_id, Ordering::SeqCst);
        if previous != chain_id {
            info!(from = previous, to = chain_id, "switched chain");
            self.listeners.emit(&ProviderEvent::ChainChanged(chain_id));
        }
        Ok(())
    }

    async fn get_balance(&self, account: Address) -> Result<U256, WalletError> {
        let rpc_url = self.active_endpoint()?;
        debug!(%account, rpc_url, "eth_getBalance");
        let provider = ProviderBuilder::new().connect_http(
            rpc_url
                .parse()
                .map_err(|e| WalletError::Transport(format!("Invalid URL: {e}")))?,
        );
        provider
            .get_balance(account)
            .await
            .map_err(|e| WalletError::Transport(format!("Failed to get balance: {e}")))
    }

    fn add_listener(&self, listener: EventListener) -> ListenerId {
        self.listeners.add(listener)
    }

    fn remove_listener(&self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    // Anvil's first default account
    const ANVIL_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    fn endpoints() -> Vec<(u64, String)> {
        vec![
            (0x14913, "http://127.0.0.1:8545".to_string()),
            (0xA8F3C, "http://127.0.0.1:8546".to_string()),
        ]
    }

    #[test]
    fn test_from_private_key() {
        let wallet = LocalWallet::from_private_key(ANVIL_KEY, endpoints(), 0x14913).unwrap();
        assert_eq!(
            wallet.address().to_checksum(None),
            "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"
        );
        assert_eq!(wallet.chains().collect::<Vec<_>>(), vec![0x14913, 0xA8F3C]);
    }

    #[test]
    fn test_from_private_key_rejects_garbage() {
        assert!(LocalWallet::from_private_key("0xzz", endpoints(), 0x14913).is_err());
        assert!(LocalWallet::from_private_key(ANVIL_KEY, endpoints(), 0x82).is_err());
    }

    #[tokio::test]
    async fn test_switch_chain_emits_event() {
        let wallet = LocalWallet::new(PrivateKeySigner::random(), endpoints(), 0x14913).unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let id = wallet.add_listener(Arc::new(move |event: &ProviderEvent| {
            sink.lock().unwrap().push(event.clone());
        }));

        wallet.switch_chain(0xA8F3C).await.unwrap();
        wallet.switch_chain(0xA8F3C).await.unwrap();
        assert_eq!(wallet.chain_id().await.unwrap(), 0xA8F3C);
        assert_eq!(*seen.lock().unwrap(), vec![ProviderEvent::ChainChanged(0xA8F3C)]);

        assert!(wallet.remove_listener(id));
        wallet.switch_chain(0x14913).await.unwrap();
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_switch_to_unconfigured_chain() {
        let wallet = LocalWallet::new(PrivateKeySigner::random(), endpoints(), 0x14913).unwrap();
        assert_eq!(
            wallet.switch_chain(0x7777777).await,
            Err(WalletError::UnrecognizedChain { chain_id: 0x7777777 })
        );
        assert_eq!(wallet.chain_id().await.unwrap(), 0x14913);
    }

    #[test]
    fn test_connector_shares_key_and_endpoints() {
        let wallet = LocalWallet::new(PrivateKeySigner::random(), endpoints(), 0x14913).unwrap();
        let connector = wallet.connector();
        assert_eq!(connector.account(), wallet.address());
        assert_eq!(connector.endpoint(0xA8F3C), Some("http://127.0.0.1:8546"));
        assert_eq!(connector.endpoint(0x82), None);
    }
}
