//! Freya SuperETH module
//!
//! alloy implementation of the Freya collaborator traits:
//! [`AlloyTokenConnector`] binds the SuperETH contract (see [`contract`]) to a
//! signing provider per chain, and [`LocalWallet`] plays the injected wallet
//! for headless use.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod contract;
pub mod token;
pub mod wallet;

pub use contract::{SuperETH, SUPERETH_ADDRESS};
pub use token::{AlloyBridgeToken, AlloyPendingTx, AlloyTokenConnector};
pub use wallet::LocalWallet;

/// Exposes commonly used types when working with SuperETH.
pub mod prelude {
    pub use super::contract::SUPERETH_ADDRESS;
    pub use super::token::AlloyTokenConnector;
    pub use super::wallet::LocalWallet;
}
