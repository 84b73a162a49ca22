//! Ordered record of every provider and contract call made against the doubles.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use alloy::primitives::{Address, U256};

/// Contract method classes used for failure injection and confirmation gates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// `decimals()`
    Decimals,
    /// `balanceOf(address)`
    BalanceOf,
    /// `name()`, `symbol()`, `totalSupply()`
    Metadata,
    /// `deposit()`
    Deposit,
    /// `withdraw(uint256)`
    Withdraw,
    /// `crosschainBurn(address,uint256)`
    Burn,
    /// `crosschainMint(address,uint256)`
    Mint,
}

impl Method {
    /// Solidity name of the method
    pub fn name(&self) -> &'static str {
        match self {
            Method::Decimals => "decimals",
            Method::BalanceOf => "balanceOf",
            Method::Metadata => "metadata",
            Method::Deposit => "deposit",
            Method::Withdraw => "withdraw",
            Method::Burn => "crosschainBurn",
            Method::Mint => "crosschainMint",
        }
    }
}

/// One recorded call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    /// `eth_requestAccounts`
    RequestAccounts,
    /// `eth_chainId`
    ChainId,
    /// `wallet_switchEthereumChain`
    SwitchChain(u64),
    /// `eth_getBalance`
    GetBalance { chain_id: u64, account: Address },
    /// Contract bound to a signer
    Bind { chain_id: u64, account: Address },
    /// View call
    Read { chain_id: u64, method: Method },
    /// `deposit()` submitted
    Deposit { chain_id: u64, from: Address, value: U256 },
    /// `withdraw` submitted
    Withdraw { chain_id: u64, from: Address, amount: U256 },
    /// `crosschainBurn` submitted
    Burn { chain_id: u64, from: Address, amount: U256 },
    /// `crosschainMint` submitted
    Mint { chain_id: u64, to: Address, amount: U256 },
    /// A submitted write was mined successfully
    Confirmed { chain_id: u64, method: Method },
}

impl Call {
    /// Returns true for calls that change wallet or ledger state
    pub fn is_effectful(&self) -> bool {
        matches!(
            self,
            Call::SwitchChain(_)
                | Call::Deposit { .. }
                | Call::Withdraw { .. }
                | Call::Burn { .. }
                | Call::Mint { .. }
                | Call::Confirmed { .. }
        )
    }
}

/// Shared, cloneable call log.
#[derive(Debug, Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<Call>>>);

impl Journal {
    /// Creates an empty journal
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a call
    pub fn record(&self, call: Call) {
        self.lock().push(call);
    }

    /// All calls in order
    pub fn calls(&self) -> Vec<Call> {
        self.lock().clone()
    }

    /// Switches and writes only, in order
    pub fn effectful(&self) -> Vec<Call> {
        self.lock().iter().filter(|call| call.is_effectful()).cloned().collect()
    }

    /// Position of the first call matching `predicate`
    pub fn position(&self, predicate: impl Fn(&Call) -> bool) -> Option<usize> {
        self.lock().iter().position(predicate)
    }

    /// Number of calls matching `predicate`
    pub fn count(&self, predicate: impl Fn(&Call) -> bool) -> usize {
        self.lock().iter().filter(|call| predicate(call)).count()
    }

    /// Number of recorded calls
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns true if nothing was recorded
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Forgets everything recorded so far
    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Call>> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
