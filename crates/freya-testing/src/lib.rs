//! # Freya Testing Infrastructure
//!
//! Test doubles and generators for the Freya bridge SDK:
//! - [`MockWallet`] - scriptable injected wallet (accounts, chain switching, events)
//! - [`MockLedger`] - SuperETH deployed on several chains, with failure injection
//! - [`Journal`] - ordered record of every provider and contract call
//! - Edge cases and `proptest` strategies for amounts and addresses
//!
//! ## Usage
//!
//! ```rust,ignore
//! use freya_testing::*;
//!
//! let bed = TestBed::new();
//! bed.ledger.fail_next(Method::Burn, Failure::Revert);
//!
//! proptest! {
//!     #[test]
//!     fn rejects(amount in non_positive_amount()) {
//!         // ...
//!     }
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod journal;
mod ledger;
mod wallet;

pub use journal::{Call, Journal, Method};
pub use ledger::{Failure, Gate, MockLedger};
pub use wallet::MockWallet;

use alloy::primitives::{address, Address, U256};
use freya_traits::TokenAmount;
use proptest::prelude::*;
use rust_decimal::Decimal;

// ============================================================================
// Chains
// ============================================================================

/// Numeric ids of the bundled chain catalogue
pub mod chains {
    /// Optimism Sepolia (`0xA8F3C`)
    pub const OPTIMISM_SEPOLIA: u64 = 0xA8F3C;
    /// Base Sepolia (`0x14913`)
    pub const BASE_SEPOLIA: u64 = 0x14913;
    /// Zora (`0x7777777`)
    pub const ZORA: u64 = 0x7777777;
    /// Unichain (`0x82`)
    pub const UNICHAIN: u64 = 0x82;

    /// All four, in catalogue order
    pub const ALL: [u64; 4] = [OPTIMISM_SEPOLIA, BASE_SEPOLIA, ZORA, UNICHAIN];
}

// ============================================================================
// Test Bed
// ============================================================================

/// A wallet and ledger wired together, sharing one journal.
#[derive(Debug, Clone)]
pub struct TestBed {
    /// Shared call log
    pub journal: Journal,
    /// Token ledger / connector
    pub ledger: MockLedger,
    /// Wallet provider
    pub wallet: MockWallet,
    /// The wallet's first account
    pub account: Address,
}

impl TestBed {
    /// Default account exposed by the wallet
    pub const ACCOUNT: Address = address!("00000000000000000000000000000000000a11ce");

    /// Native balance seeded on every chain (10 ETH)
    pub const NATIVE_SEED_WEI: u128 = 10_000_000_000_000_000_000;

    /// Wallet on Base Sepolia that knows every catalogue chain
    pub fn new() -> Self {
        Self::on_chain(chains::BASE_SEPOLIA)
    }

    /// Same as [`TestBed::new`] with the wallet starting on `chain_id`
    pub fn on_chain(chain_id: u64) -> Self {
        let journal = Journal::new();
        let ledger = MockLedger::new(journal.clone(), chain_id);
        for chain in chains::ALL {
            ledger.set_native_balance(chain, Self::ACCOUNT, U256::from(Self::NATIVE_SEED_WEI));
        }
        let wallet = MockWallet::new(ledger.clone(), vec![Self::ACCOUNT], chains::ALL);
        Self { journal, ledger, wallet, account: Self::ACCOUNT }
    }
}

impl Default for TestBed {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Edge Cases
// ============================================================================

/// Amount strings every operation must reject
pub struct EdgeCaseAmounts;

impl EdgeCaseAmounts {
    /// Zero, negative and malformed inputs
    pub fn invalid() -> Vec<&'static str> {
        vec!["0", "0.0", "-0", "-1", "-0.000001", "", "  ", "abc", "1.2.3", "1e18"]
    }

    /// Valid amounts with more than six fractional digits
    pub fn too_precise_for_six_decimals() -> Vec<&'static str> {
        vec!["0.0000001", "1.1234567", "0.000000000000000001"]
    }
}

/// Recipient strings every bridge must reject
pub struct EdgeCaseAddresses;

impl EdgeCaseAddresses {
    /// A well-formed checksummed address
    pub const VALID: &'static str = "0x742D35Cc6634c0532925A3B844bc9E7595f5fFb9";

    /// The same address in lowercase (no checksum to verify)
    pub const VALID_LOWERCASE: &'static str = "0x742d35cc6634c0532925a3b844bc9e7595f5ffb9";

    /// Invalid Ethereum addresses
    pub fn invalid() -> Vec<&'static str> {
        vec![
            "",
            "   ",
            "0x",
            "0xGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGG", // Invalid hex
            "0x742d35Cc6634C0532925a3b844Bc9e7595f5",     // Too short
            "0x742d35Cc6634C0532925a3b844Bc9e7595f5fFb9aa", // Too long
            "0x742d35Cc6634C0532925a3b844Bc9e7595f5fFb9",   // Bad checksum
            "742d35Cc6634C0532925a3b844Bc9e7595f5fFb9",     // Missing 0x
        ]
    }
}

// ============================================================================
// Property-Based Testing Strategies
// ============================================================================

/// Generates zero or negative amounts
pub fn non_positive_amount() -> impl Strategy<Value = TokenAmount> {
    (i64::MIN..=0i64, 0u32..=18u32).prop_map(|(mantissa, scale)| {
        TokenAmount::new(Decimal::new(mantissa, scale))
    })
}

/// Generates positive amounts with at most `max_scale` fractional digits
pub fn positive_amount(max_scale: u32) -> impl Strategy<Value = TokenAmount> {
    (1i64..=1_000_000_000_000i64, 0u32..=max_scale.min(28)).prop_map(|(mantissa, scale)| {
        TokenAmount::new(Decimal::new(mantissa, scale))
    })
}

/// Generates arbitrary 20-byte addresses
pub fn any_address() -> impl Strategy<Value = Address> {
    prop::array::uniform20(any::<u8>()).prop_map(Address::from)
}

/// Generates one of the catalogue chain ids
pub fn catalogue_chain() -> impl Strategy<Value = u64> {
    prop::sample::select(chains::ALL.to_vec())
}
