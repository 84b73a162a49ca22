//! alloy-backed [`TokenConnector`] and [`BridgeToken`].

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use alloy::network::{Ethereum, EthereumWallet, ReceiptResponse};
use alloy::primitives::{Address, U256};
use alloy::providers::{DynProvider, PendingTransactionBuilder, Provider, ProviderBuilder};
use alloy::signers::local::PrivateKeySigner;
use async_trait::async_trait;
use freya_error::ContractError;
use freya_traits::{BridgeToken, PendingTx, SignerHandle, TokenConnector, TxHash, TxReceipt};
use tracing::debug;

use crate::contract::SuperETH::{self, SuperETHInstance};

/// Binds SuperETH through per-chain JSON-RPC endpoints, signing with a local key.
#[derive(Clone)]
pub struct AlloyTokenConnector {
    wallet: EthereumWallet,
    account: Address,
    endpoints: BTreeMap<u64, String>,
}

impl AlloyTokenConnector {
    /// Creates a connector for `signer` with no endpoints
    pub fn new(signer: PrivateKeySigner) -> Self {
        let account = signer.address();
        Self { wallet: EthereumWallet::from(signer), account, endpoints: BTreeMap::new() }
    }

    /// Adds the RPC endpoint used for `chain_id`
    pub fn with_endpoint(mut self, chain_id: u64, rpc_url: impl Into<String>) -> Self {
        self.endpoints.insert(chain_id, rpc_url.into());
        self
    }

    /// Account this connector signs for
    pub fn account(&self) -> Address {
        self.account
    }

    /// Configured endpoint for `chain_id`
    pub fn endpoint(&self, chain_id: u64) -> Option<&str> {
        self.endpoints.get(&chain_id).map(String::as_str)
    }
}

impl fmt::Debug for AlloyTokenConnector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AlloyTokenConnector")
            .field("account", &self.account)
            .field("endpoints", &self.endpoints)
            .finish()
    }
}

impl TokenConnector for AlloyTokenConnector {
    fn connect(
        &self,
        address: Address,
        signer: &SignerHandle,
    ) -> Result<Arc<dyn BridgeToken>, ContractError> {
        if signer.account() != self.account {
            return Err(ContractError::SignerMismatch(format!(
                "handle is for {} but the key controls {}",
                signer.account(),
                self.account
            )));
        }
        let chain_id = signer.chain_id();
        let rpc_url = self.endpoint(chain_id).ok_or(ContractError::UnknownChain(chain_id))?;
        let provider = ProviderBuilder::new()
            .wallet(self.wallet.clone())
            .connect_http(rpc_url.parse().map_err(|e| ContractError::Call {
                method: "connect".into(),
                reason: format!("Invalid URL: {e}"),
            })?)
            .erased();
        debug!(chain_id, %address, "bound SuperETH");
        Ok(Arc::new(AlloyBridgeToken { contract: SuperETH::new(address, provider), chain_id }))
    }
}

/// SuperETH on one chain behind a signing provider.
pub struct AlloyBridgeToken {
    contract: SuperETHInstance<DynProvider>,
    chain_id: u64,
}

impl AlloyBridgeToken {
    fn call_error(method: &str, e: impl fmt::Display) -> ContractError {
        ContractError::Call { method: method.into(), reason: e.to_string() }
    }

    fn submit_error(method: &str, e: impl fmt::Display) -> ContractError {
        ContractError::Submission { method: method.into(), reason: e.to_string() }
    }

    fn pending(&self, method: &str, tx: PendingTransactionBuilder<Ethereum>) -> Box<dyn PendingTx> {
        let tx_hash = TxHash(*tx.tx_hash());
        debug!(chain_id = self.chain_id, method, %tx_hash, "transaction submitted");
        Box::new(AlloyPendingTx { inner: tx, tx_hash })
    }
}

#[async_trait]
impl BridgeToken for AlloyBridgeToken {
    async fn name(&self) -> Result<String, ContractError> {
        self.contract.name().call().await.map_err(|e| Self::call_error("name", e))
    }

    async fn symbol(&self) -> Result<String, ContractError> {
        self.contract.symbol().call().await.map_err(|e| Self::call_error("symbol", e))
    }

    async fn decimals(&self) -> Result<u8, ContractError> {
        self.contract.decimals().call().await.map_err(|e| Self::call_error("decimals", e))
    }

    async fn total_supply(&self) -> Result<U256, ContractError> {
        self.contract.totalSupply().call().await.map_err(|e| Self::call_error("totalSupply", e))
    }

    async fn balance_of(&self, owner: Address) -> Result<U256, ContractError> {
        self.contract.balanceOf(owner).call().await.map_err(|e| Self::call_error("balanceOf", e))
    }

    async fn deposit(&self, value: U256) -> Result<Box<dyn PendingTx>, ContractError> {
        let tx = self
            .contract
            .deposit()
            .value(value)
            .send()
            .await
            .map_err(|e| Self::submit_error("deposit", e))?;
        Ok(self.pending("deposit", tx))
    }

    async fn withdraw(&self, amount: U256) -> Result<Box<dyn PendingTx>, ContractError> {
        let tx = self
            .contract
            .withdraw(amount)
            .send()
            .await
            .map_err(|e| Self::submit_error("withdraw", e))?;
        Ok(self.pending("withdraw", tx))
    }

    async fn crosschain_burn(
        &self,
        from: Address,
        amount: U256,
    ) -> Result<Box<dyn PendingTx>, ContractError> {
        let tx = self
            .contract
            .crosschainBurn(from, amount)
            .send()
            .await
            .map_err(|e| Self::submit_error("crosschainBurn", e))?;
        Ok(self.pending("crosschainBurn", tx))
    }

    async fn crosschain_mint(
        &self,
        to: Address,
        amount: U256,
    ) -> Result<Box<dyn PendingTx>, ContractError> {
        let tx = self
            .contract
            .crosschainMint(to, amount)
            .send()
            .await
            .map_err(|e| Self::submit_error("crosschainMint", e))?;
        Ok(self.pending("crosschainMint", tx))
    }
}

/// A broadcast transaction awaiting its receipt.
pub struct AlloyPendingTx {
    inner: PendingTransactionBuilder<Ethereum>,
    tx_hash: TxHash,
}

#[async_trait]
impl PendingTx for AlloyPendingTx {
    fn tx_hash(&self) -> TxHash {
        self.tx_hash
    }

    async fn confirm(self: Box<Self>) -> Result<TxReceipt, ContractError> {
        let tx_hash = self.tx_hash;
        let receipt = self.inner.get_receipt().await.map_err(|e| ContractError::Confirmation {
            tx_hash: tx_hash.to_string(),
            reason: e.to_string(),
        })?;
        if !receipt.status() {
            return Err(ContractError::Reverted { tx_hash: tx_hash.to_string() });
        }
        Ok(TxReceipt { tx_hash, block_number: receipt.block_number() })
    }
}
