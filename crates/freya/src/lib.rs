//! # Freya
//!
//! Cross-chain orchestration for the SuperETH token: connect a wallet, wrap
//! and unwrap native ETH, and bridge by burning on one chain and minting on
//! another.
//!
//! ## Components
//!
//! - [`ChainRegistry`] - supported networks
//! - [`WalletSession`] - account, active chain and signer, kept current by provider events
//! - [`ContractBinding`] - SuperETH bound to the current signer
//! - [`BalanceReader`] - native and bridged balances per chain
//! - [`TransferOrchestrator`] - deposit, withdraw and bridge with a status narrative
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use freya::prelude::*;
//!
//! let config = FreyaConfig::load()?;
//! let orchestrator = TransferOrchestrator::from_config(&config, wallet, connector)?;
//! orchestrator.connect().await?;
//!
//! let request = orchestrator.request("1.5", "0x742D35Cc6634c0532925A3B844bc9E7595f5fFb9")?;
//! match orchestrator.bridge(&request).await {
//!     Ok(receipt) => println!("minted in {}", receipt.mint_tx),
//!     Err(FreyaError::PostBurnStuck(stuck)) => eprintln!("{stuck}"),
//!     Err(e) => eprintln!("{e}"),
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod balance;
pub mod binding;
pub mod config;
pub mod orchestrator;
pub mod registry;
pub mod session;
pub mod status;

pub use balance::{BalanceReader, BalanceSnapshot, Freshness};
pub use binding::{BoundContract, ContractBinding, TokenMetadata};
pub use config::{FreyaConfig, CONFIG_ENV, DEFAULT_CONTRACT_ADDRESS};
pub use orchestrator::{
    parse_recipient, BridgeReceipt, OperationReceipt, TransferOrchestrator, TransferRequest,
};
pub use registry::{parse_hex_chain_id, ChainDescriptor, ChainRegistry};
pub use session::WalletSession;
pub use status::{OperationKind, OperationState, OperationStatus, Outcome};

pub use freya_error::{ErrorCode, ErrorKind, FreyaError, Result, StuckTransfer};
pub use freya_traits::{
    BridgeToken, PendingTx, ProviderEvent, SignerHandle, TokenAmount, TokenConnector, TxHash,
    TxReceipt, WalletProvider,
};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        BridgeReceipt, ChainDescriptor, ChainRegistry, FreyaConfig, FreyaError, OperationKind,
        OperationStatus, TokenAmount, TransferOrchestrator, TransferRequest, WalletSession,
    };
}
