//! Typed access to the SuperETH contract for the session's current signer.

use std::fmt;
use std::sync::Arc;

use alloy::primitives::{Address, U256};
use freya_error::{ContractError, FreyaError, Result};
use freya_traits::{BridgeToken, PendingTx, SignerHandle, TokenConnector};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Token metadata read in one round
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenMetadata {
    /// ERC-20 name
    pub name: String,
    /// ERC-20 symbol
    pub symbol: String,
    /// Token decimals
    pub decimals: u8,
    /// Supply on the bound chain
    pub total_supply: U256,
}

/// Contract address plus the connector that can bind it.
#[derive(Clone)]
pub struct ContractBinding {
    address: Address,
    connector: Arc<dyn TokenConnector>,
}

impl ContractBinding {
    /// Creates a binding for the contract at `address`
    pub fn new(address: Address, connector: Arc<dyn TokenConnector>) -> Self {
        Self { address, connector }
    }

    /// Contract address
    pub fn address(&self) -> Address {
        self.address
    }

    /// Binds the contract to `signer`. Fails with `NoSigner` when there is none.
    pub fn bind(&self, signer: Option<&SignerHandle>) -> Result<BoundContract> {
        let signer = *signer.ok_or(FreyaError::NoSigner)?;
        let token = self.connector.connect(self.address, &signer).map_err(|e| {
            FreyaError::TransactionFailed(format!("could not bind contract: {e}"))
        })?;
        debug!(address = %self.address, chain_id = signer.chain_id(), epoch = signer.epoch(), "contract bound");
        Ok(BoundContract { address: self.address, signer, token })
    }
}

impl fmt::Debug for ContractBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContractBinding").field("address", &self.address).finish_non_exhaustive()
    }
}

/// The contract bound to one signer on one chain.
#[derive(Clone)]
pub struct BoundContract {
    address: Address,
    signer: SignerHandle,
    token: Arc<dyn BridgeToken>,
}

impl BoundContract {
    /// Contract address
    pub fn address(&self) -> Address {
        self.address
    }

    /// Signer the contract was bound with
    pub fn signer(&self) -> &SignerHandle {
        &self.signer
    }

    /// Chain the binding targets
    pub fn chain_id(&self) -> u64 {
        self.signer.chain_id()
    }

    /// Token decimals on the bound chain
    pub async fn decimals(&self) -> std::result::Result<u8, ContractError> {
        self.token.decimals().await
    }

    /// ERC-20 name
    pub async fn name(&self) -> std::result::Result<String, ContractError> {
        self.token.name().await
    }

    /// ERC-20 symbol
    pub async fn symbol(&self) -> std::result::Result<String, ContractError> {
        self.token.symbol().await
    }

    /// Supply on the bound chain
    pub async fn total_supply(&self) -> std::result::Result<U256, ContractError> {
        self.token.total_supply().await
    }

    /// Bridged balance of `owner`
    pub async fn balance_of(&self, owner: Address) -> std::result::Result<U256, ContractError> {
        self.token.balance_of(owner).await
    }

    /// Reads name, symbol, decimals and total supply concurrently
    pub async fn token_metadata(&self) -> std::result::Result<TokenMetadata, ContractError> {
        let (name, symbol, decimals, total_supply) = tokio::try_join!(
            self.token.name(),
            self.token.symbol(),
            self.token.decimals(),
            self.token.total_supply(),
        )?;
        Ok(TokenMetadata { name, symbol, decimals, total_supply })
    }

    /// Wraps `value` wei of native ETH
    pub async fn deposit(&self, value: U256) -> std::result::Result<Box<dyn PendingTx>, ContractError> {
        debug!(chain_id = self.chain_id(), %value, "submitting deposit");
        self.token.deposit(value).await
    }

    /// Unwraps `amount` base units back to native ETH
    pub async fn withdraw(&self, amount: U256) -> std::result::Result<Box<dyn PendingTx>, ContractError> {
        debug!(chain_id = self.chain_id(), %amount, "submitting withdraw");
        self.token.withdraw(amount).await
    }

    /// Burns `amount` from `from` on this chain
    pub async fn crosschain_burn(
        &self,
        from: Address,
        amount: U256,
    ) -> std::result::Result<Box<dyn PendingTx>, ContractError> {
        debug!(chain_id = self.chain_id(), %from, %amount, "submitting crosschainBurn");
        self.token.crosschain_burn(from, amount).await
    }

    /// Mints `amount` to `to` on this chain
    pub async fn crosschain_mint(
        &self,
        to: Address,
        amount: U256,
    ) -> std::result::Result<Box<dyn PendingTx>, ContractError> {
        debug!(chain_id = self.chain_id(), %to, %amount, "submitting crosschainMint");
        self.token.crosschain_mint(to, amount).await
    }
}

impl fmt::Debug for BoundContract {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundContract")
            .field("address", &self.address)
            .field("signer", &self.signer)
            .finish_non_exhaustive()
    }
}
