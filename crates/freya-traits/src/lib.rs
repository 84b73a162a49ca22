//! # Freya Traits
//!
//! Collaborator traits and value types for the Freya cross-chain bridge SDK.
//! The bridge core only talks to a wallet and a token contract through these
//! traits, so the same orchestration runs against alloy or an in-memory ledger.
//!
//! ## Core Traits
//!
//! - [`WalletProvider`] - Accounts, active chain, chain switching, native balance, events
//! - [`TokenConnector`] - Binds the bridged-token contract to a [`SignerHandle`]
//! - [`BridgeToken`] - Typed reads and writes on the bound contract
//! - [`PendingTx`] - A submitted transaction that can be awaited to confirmation
//!
//! ## Example
//!
//! ```ignore
//! use freya_traits::prelude::*;
//!
//! async fn bridged_balance(token: &dyn BridgeToken, owner: Address) -> Result<U256, ContractError> {
//!     token.balance_of(owner).await
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use alloy::primitives::utils::format_units;
use alloy::primitives::{Address, B256, U256};
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub use freya_error::{AmountError, ContractError, WalletError};

/// Precision of native coins on every supported chain (ether units).
pub const NATIVE_DECIMALS: u8 = 18;

// ============================================================================
// Amounts
// ============================================================================

/// An exact, user-entered decimal amount.
///
/// Conversion to base units follows `parseUnits`: more fractional digits than
/// the token's precision is an error, never a silent truncation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenAmount(Decimal);

impl TokenAmount {
    /// Wraps a decimal value
    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    /// Parses a decimal string such as `"1.5"`
    pub fn parse(text: &str) -> Result<Self, AmountError> {
        let trimmed = text.trim();
        Decimal::from_str_exact(trimmed)
            .map(Self)
            .map_err(|_| AmountError::Malformed(trimmed.to_string()))
    }

    /// Returns the underlying decimal
    pub fn value(&self) -> Decimal {
        self.0
    }

    /// Returns true if the amount is strictly greater than zero
    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    /// Converts to base units for a token with `decimals` places.
    pub fn to_base_units(&self, decimals: u8) -> Result<U256, AmountError> {
        if !self.is_positive() {
            return Err(AmountError::NotPositive(self.0.to_string()));
        }
        let normalized = self.0.normalize();
        let scale = normalized.scale();
        if scale > u32::from(decimals) {
            return Err(AmountError::TooPrecise { amount: self.0.to_string(), decimals });
        }
        let mantissa = U256::from(normalized.mantissa().unsigned_abs());
        U256::from(10u8)
            .checked_pow(U256::from(u32::from(decimals) - scale))
            .and_then(|factor| mantissa.checked_mul(factor))
            .ok_or_else(|| AmountError::Overflow(self.0.to_string()))
    }
}

impl fmt::Display for TokenAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TokenAmount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<Decimal> for TokenAmount {
    fn from(value: Decimal) -> Self {
        Self(value)
    }
}

/// Formats a base-unit value for display with `decimals` places.
pub fn format_base_units(raw: U256, decimals: u8) -> String {
    format_units(raw, decimals).unwrap_or_else(|_| raw.to_string())
}

// ============================================================================
// Transactions
// ============================================================================

/// Transaction hash
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxHash(pub B256);

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<B256> for TxHash {
    fn from(hash: B256) -> Self {
        Self(hash)
    }
}

/// A confirmed, successful transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxReceipt {
    /// Transaction hash
    pub tx_hash: TxHash,
    /// Block the transaction was included in, when the backend reports it
    pub block_number: Option<u64>,
}

/// A submitted transaction awaiting confirmation.
#[async_trait]
pub trait PendingTx: Send {
    /// Hash assigned at submission
    fn tx_hash(&self) -> TxHash;

    /// Waits until the transaction is mined.
    ///
    /// A receipt with a failed status is returned as [`ContractError::Reverted`].
    async fn confirm(self: Box<Self>) -> Result<TxReceipt, ContractError>;
}

// ============================================================================
// Signer & contract
// ============================================================================

/// A capability to sign for one account on one chain.
///
/// Handles are produced by the wallet session and become useless once the
/// session's epoch moves past `epoch`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SignerHandle {
    account: Address,
    chain_id: u64,
    epoch: u64,
}

impl SignerHandle {
    /// Creates a handle for `account` on `chain_id`
    pub fn new(account: Address, chain_id: u64, epoch: u64) -> Self {
        Self { account, chain_id, epoch }
    }

    /// Signing account
    pub fn account(&self) -> Address {
        self.account
    }

    /// Chain the handle signs for
    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Session epoch the handle was issued in
    pub fn epoch(&self) -> u64 {
        self.epoch
    }
}

/// The bridged-token contract bound to a signer.
#[async_trait]
pub trait BridgeToken: Send + Sync {
    /// Token name
    async fn name(&self) -> Result<String, ContractError>;
    /// Token symbol
    async fn symbol(&self) -> Result<String, ContractError>;
    /// Token precision
    async fn decimals(&self) -> Result<u8, ContractError>;
    /// Total supply on the bound chain
    async fn total_supply(&self) -> Result<U256, ContractError>;
    /// Balance of `owner` on the bound chain
    async fn balance_of(&self, owner: Address) -> Result<U256, ContractError>;

    /// Wraps `value` wei of native coin into the token
    async fn deposit(&self, value: U256) -> Result<Box<dyn PendingTx>, ContractError>;
    /// Unwraps `amount` base units back into native coin
    async fn withdraw(&self, amount: U256) -> Result<Box<dyn PendingTx>, ContractError>;
    /// Destroys `amount` of `from`'s balance on the bound chain
    async fn crosschain_burn(&self, from: Address, amount: U256)
        -> Result<Box<dyn PendingTx>, ContractError>;
    /// Creates `amount` for `to` on the bound chain
    async fn crosschain_mint(&self, to: Address, amount: U256)
        -> Result<Box<dyn PendingTx>, ContractError>;
}

/// Produces [`BridgeToken`] handles for a contract address and signer.
pub trait TokenConnector: Send + Sync {
    /// Binds the contract at `address` to `signer`
    fn connect(&self, address: Address, signer: &SignerHandle)
        -> Result<Arc<dyn BridgeToken>, ContractError>;
}

// ============================================================================
// Wallet provider & events
// ============================================================================

/// Events pushed by a wallet provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderEvent {
    /// The active network changed
    ChainChanged(u64),
    /// The exposed accounts changed; empty means disconnected
    AccountsChanged(Vec<Address>),
}

/// Identifies a registered listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Synchronous event callback
pub type EventListener = Arc<dyn Fn(&ProviderEvent) + Send + Sync>;

/// A set of event listeners with explicit registration and removal.
#[derive(Default)]
pub struct ListenerRegistry {
    next_id: AtomicU64,
    listeners: Mutex<Vec<(ListenerId, EventListener)>>,
}

impl ListenerRegistry {
    /// Creates an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `listener` and returns its id
    pub fn add(&self, listener: EventListener) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.lock().push((id, listener));
        id
    }

    /// Removes a listener; returns false if it was not registered
    pub fn remove(&self, id: ListenerId) -> bool {
        let mut listeners = self.lock();
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    /// Delivers `event` to every listener.
    ///
    /// Listeners are called outside the lock so they may register or remove.
    pub fn emit(&self, event: &ProviderEvent) {
        let snapshot: Vec<EventListener> =
            self.lock().iter().map(|(_, listener)| Arc::clone(listener)).collect();
        for listener in snapshot {
            listener(event);
        }
    }

    /// Number of registered listeners
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns true if nothing is registered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(ListenerId, EventListener)>> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerRegistry").field("listeners", &self.len()).finish()
    }
}

/// An injected wallet (browser extension, local key, test double).
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Asks the wallet to expose its accounts, prompting the user if needed
    async fn request_accounts(&self) -> Result<Vec<Address>, WalletError>;

    /// Chain the wallet is currently on
    async fn chain_id(&self) -> Result<u64, WalletError>;

    /// Asks the wallet to switch networks
    async fn switch_chain(&self, chain_id: u64) -> Result<(), WalletError>;

    /// Native balance of `account` on the current chain, in wei
    async fn get_balance(&self, account: Address) -> Result<U256, WalletError>;

    /// Subscribes to chain/account events
    fn add_listener(&self, listener: EventListener) -> ListenerId;

    /// Unsubscribes; returns false if the id was unknown
    fn remove_listener(&self, id: ListenerId) -> bool;
}

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        format_base_units, BridgeToken, EventListener, ListenerId, ListenerRegistry, PendingTx,
        ProviderEvent, SignerHandle, TokenAmount, TokenConnector, TxHash, TxReceipt,
        WalletProvider, NATIVE_DECIMALS,
    };
    pub use alloy::primitives::{Address, U256};
    pub use freya_error::{AmountError, ContractError, WalletError};
}
