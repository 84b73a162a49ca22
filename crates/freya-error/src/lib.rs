//! # Freya Error
//!
//! Unified error types for the Freya cross-chain bridge SDK.
//!
//! ## Error Categories
//!
//! - [`FreyaError`] - Top-level error surfaced by the orchestrator and session
//! - [`WalletError`] - Errors reported by a wallet provider (EIP-1193 style)
//! - [`ContractError`] - Errors from contract reads, writes and confirmations
//! - [`AmountError`] - Decimal amount validation and base-unit conversion
//!
//! ## Example
//!
//! ```
//! use freya_error::{ErrorKind, FreyaError, Result};
//!
//! fn require_positive(amount: i64) -> Result<()> {
//!     if amount <= 0 {
//!         return Err(FreyaError::InvalidInput("amount must be positive".into()));
//!     }
//!     Ok(())
//! }
//!
//! let err = require_positive(0).unwrap_err();
//! assert_eq!(err.kind(), ErrorKind::InvalidInput);
//! assert!(!err.is_safely_retryable());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::fmt;

use thiserror::Error;

/// The main error type for Freya operations.
///
/// Every variant maps onto exactly one [`ErrorKind`]. Failures raised while an
/// operation is in flight are surfaced verbatim through the operation status.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FreyaError {
    // ============ Validation Errors ============
    /// User input rejected before any provider or contract call
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Chain id is not part of the configured catalogue or unknown to the wallet
    #[error("Unsupported chain: {0}")]
    UnsupportedChain(String),

    // ============ Wallet Errors ============
    /// No wallet provider, or the provider exposes no accounts
    #[error("Wallet unavailable: {0}")]
    WalletUnavailable(String),

    /// A write was attempted without a connected signer
    #[error("No signer available; connect a wallet first")]
    NoSigner,

    /// The user declined a wallet prompt
    #[error("User rejected the request: {0}")]
    UserRejected(String),

    /// The wallet refused or failed to switch networks
    #[error("Switch to chain {chain} rejected: {reason}")]
    SwitchRejected {
        /// Hex id of the requested chain
        chain: String,
        /// Reason reported by the wallet
        reason: String,
    },

    // ============ Transaction Errors ============
    /// A transaction was rejected, reverted, or its confirmation failed
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// The burn confirmed on the source chain but the mint did not complete
    #[error("{0}")]
    PostBurnStuck(Box<StuckTransfer>),

    // ============ Orchestration Errors ============
    /// Another deposit, withdraw or bridge is still in flight
    #[error("Another operation is already in progress")]
    OperationInProgress,

    // ============ Configuration Errors ============
    /// The chain catalogue or contract configuration is invalid
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Everything needed to finish a bridge by hand after the burn succeeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StuckTransfer {
    /// Hex id of the chain the tokens were burned on
    pub source_chain: String,
    /// Hex id of the chain the mint should have happened on
    pub target_chain: String,
    /// Address that should receive the minted tokens
    pub recipient: String,
    /// Burned amount in base units (decimal string)
    pub amount: String,
    /// Hash of the confirmed burn transaction
    pub burn_tx: String,
    /// The failure that stopped the mint
    pub reason: String,
}

impl fmt::Display for StuckTransfer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Burn of {} confirmed on {} (tx {}) but minting to {} on {} did not complete: {}. \
             Do not retry the bridge; mint the burned amount manually.",
            self.amount, self.source_chain, self.burn_tx, self.recipient, self.target_chain, self.reason
        )
    }
}

/// Convenient Result type using FreyaError
pub type Result<T> = std::result::Result<T, FreyaError>;

/// Error taxonomy shared by every Freya component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Bad amount, recipient or request shape
    InvalidInput,
    /// No provider or no accounts
    WalletUnavailable,
    /// Write attempted without a signer
    NoSigner,
    /// Wallet prompt declined
    UserRejected,
    /// Network switch refused
    SwitchRejected,
    /// Chain not in the catalogue or not known to the wallet
    UnsupportedChain,
    /// Submission, revert or confirmation failure
    TransactionFailed,
    /// Burn done, mint not done
    PostBurnStuck,
    /// Single-operation guard tripped
    OperationInProgress,
    /// Invalid configuration
    Config,
}

/// Error codes for programmatic error handling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum ErrorCode {
    /// Invalid input
    InvalidInput = 1001,
    /// Unsupported chain
    UnsupportedChain = 1002,
    /// Wallet unavailable
    WalletUnavailable = 2001,
    /// No signer
    NoSigner = 2002,
    /// User rejected
    UserRejected = 2003,
    /// Switch rejected
    SwitchRejected = 2004,
    /// Transaction failed
    TransactionFailed = 3001,
    /// Burned but not minted
    PostBurnStuck = 3002,
    /// Operation already in progress
    OperationInProgress = 4001,
    /// Configuration error
    Config = 9001,
}

impl FreyaError {
    /// Returns the taxonomy entry for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            FreyaError::InvalidInput(_) => ErrorKind::InvalidInput,
            FreyaError::UnsupportedChain(_) => ErrorKind::UnsupportedChain,
            FreyaError::WalletUnavailable(_) => ErrorKind::WalletUnavailable,
            FreyaError::NoSigner => ErrorKind::NoSigner,
            FreyaError::UserRejected(_) => ErrorKind::UserRejected,
            FreyaError::SwitchRejected { .. } => ErrorKind::SwitchRejected,
            FreyaError::TransactionFailed(_) => ErrorKind::TransactionFailed,
            FreyaError::PostBurnStuck(_) => ErrorKind::PostBurnStuck,
            FreyaError::OperationInProgress => ErrorKind::OperationInProgress,
            FreyaError::Config(_) => ErrorKind::Config,
        }
    }

    /// Returns the error code for this error
    pub fn code(&self) -> ErrorCode {
        match self.kind() {
            ErrorKind::InvalidInput => ErrorCode::InvalidInput,
            ErrorKind::UnsupportedChain => ErrorCode::UnsupportedChain,
            ErrorKind::WalletUnavailable => ErrorCode::WalletUnavailable,
            ErrorKind::NoSigner => ErrorCode::NoSigner,
            ErrorKind::UserRejected => ErrorCode::UserRejected,
            ErrorKind::SwitchRejected => ErrorCode::SwitchRejected,
            ErrorKind::TransactionFailed => ErrorCode::TransactionFailed,
            ErrorKind::PostBurnStuck => ErrorCode::PostBurnStuck,
            ErrorKind::OperationInProgress => ErrorCode::OperationInProgress,
            ErrorKind::Config => ErrorCode::Config,
        }
    }

    /// Returns true if re-running the same operation cannot duplicate a transfer.
    ///
    /// A [`FreyaError::PostBurnStuck`] is never retryable: the burn already
    /// happened and running the bridge again would burn a second time.
    pub fn is_safely_retryable(&self) -> bool {
        matches!(
            self,
            FreyaError::UserRejected(_)
                | FreyaError::SwitchRejected { .. }
                | FreyaError::TransactionFailed(_)
                | FreyaError::NoSigner
                | FreyaError::WalletUnavailable(_)
                | FreyaError::OperationInProgress
        )
    }

    /// Returns the stuck-transfer details of a [`FreyaError::PostBurnStuck`]
    pub fn stuck_transfer(&self) -> Option<&StuckTransfer> {
        match self {
            FreyaError::PostBurnStuck(stuck) => Some(stuck),
            _ => None,
        }
    }
}

/// Errors reported by a wallet provider.
///
/// Numeric codes follow EIP-1193 / EIP-3085 as wallets report them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WalletError {
    /// No provider is installed or reachable
    #[error("No wallet provider available")]
    Unavailable,

    /// Provider returned an empty account list
    #[error("Wallet exposes no accounts")]
    NoAccounts,

    /// The user declined the prompt (code 4001)
    #[error("User rejected the request: {0}")]
    UserRejected(String),

    /// The wallet does not know the requested chain (code 4902)
    #[error("Chain {chain_id:#x} has not been added to the wallet")]
    UnrecognizedChain {
        /// Numeric chain id that was requested
        chain_id: u64,
    },

    /// Any other JSON-RPC error
    #[error("Provider error {code}: {message}")]
    Rpc {
        /// JSON-RPC error code
        code: i64,
        /// Error message
        message: String,
    },

    /// Transport-level failure talking to the node
    #[error("Transport error: {0}")]
    Transport(String),
}

impl WalletError {
    /// EIP-1193 "User Rejected Request"
    pub const USER_REJECTED: i64 = 4001;
    /// EIP-3085 "Unrecognized chain ID"
    pub const UNRECOGNIZED_CHAIN: i64 = 4902;

    /// Builds an error from a provider-reported RPC code
    pub fn from_rpc(code: i64, message: impl Into<String>, chain_id: Option<u64>) -> Self {
        let message = message.into();
        match (code, chain_id) {
            (Self::USER_REJECTED, _) => WalletError::UserRejected(message),
            (Self::UNRECOGNIZED_CHAIN, Some(chain_id)) => WalletError::UnrecognizedChain { chain_id },
            _ => WalletError::Rpc { code, message },
        }
    }

    /// Returns the EIP-1193 code, if the error carries one
    pub fn rpc_code(&self) -> Option<i64> {
        match self {
            WalletError::UserRejected(_) => Some(Self::USER_REJECTED),
            WalletError::UnrecognizedChain { .. } => Some(Self::UNRECOGNIZED_CHAIN),
            WalletError::Rpc { code, .. } => Some(*code),
            _ => None,
        }
    }
}

/// Errors from reading or writing the bridged-token contract.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContractError {
    /// A view call failed
    #[error("Call to `{method}` failed: {reason}")]
    Call {
        /// Contract method name
        method: String,
        /// Reason
        reason: String,
    },

    /// The wallet or node rejected the transaction before it was mined
    #[error("Submitting `{method}` failed: {reason}")]
    Submission {
        /// Contract method name
        method: String,
        /// Reason
        reason: String,
    },

    /// The transaction was mined with a failed status
    #[error("Transaction {tx_hash} reverted")]
    Reverted {
        /// Transaction hash
        tx_hash: String,
    },

    /// Waiting for the receipt failed
    #[error("Confirmation of {tx_hash} failed: {reason}")]
    Confirmation {
        /// Transaction hash
        tx_hash: String,
        /// Reason
        reason: String,
    },

    /// The signer handle does not belong to this connector
    #[error("Signer mismatch: {0}")]
    SignerMismatch(String),

    /// No RPC endpoint is known for the signer's chain
    #[error("No endpoint configured for chain {0:#x}")]
    UnknownChain(u64),
}

/// Errors converting a user-entered decimal into base units.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AmountError {
    /// Text is not a decimal number
    #[error("'{0}' is not a valid decimal amount")]
    Malformed(String),

    /// Zero or negative
    #[error("Amount must be greater than zero, got {0}")]
    NotPositive(String),

    /// More fractional digits than the token supports
    #[error("Amount {amount} has more than {decimals} fractional digits")]
    TooPrecise {
        /// Offending amount
        amount: String,
        /// Token precision
        decimals: u8,
    },

    /// Result does not fit in 256 bits
    #[error("Amount {0} overflows 256 bits")]
    Overflow(String),
}

// ============ From implementations for collaborator errors ============

impl From<WalletError> for FreyaError {
    fn from(err: WalletError) -> Self {
        match err {
            WalletError::Unavailable | WalletError::NoAccounts => {
                FreyaError::WalletUnavailable(err.to_string())
            }
            WalletError::UserRejected(message) => FreyaError::UserRejected(message),
            WalletError::UnrecognizedChain { chain_id } => {
                FreyaError::UnsupportedChain(format!("{chain_id:#x}"))
            }
            WalletError::Rpc { .. } | WalletError::Transport(_) => {
                FreyaError::TransactionFailed(err.to_string())
            }
        }
    }
}

impl From<ContractError> for FreyaError {
    fn from(err: ContractError) -> Self {
        FreyaError::TransactionFailed(err.to_string())
    }
}

impl From<AmountError> for FreyaError {
    fn from(err: AmountError) -> Self {
        FreyaError::InvalidInput(err.to_string())
    }
}
