//! Native and bridged balances with staleness tracking.
//!
//! Snapshots are filed per chain and stamped with the session epoch they were
//! read in. A snapshot from an older epoch, or one explicitly marked after a
//! failed refresh or a burn, reads back as [`Freshness::Stale`].

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock};

use alloy::primitives::{Address, U256};
use freya_traits::{format_base_units, NATIVE_DECIMALS};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::binding::ContractBinding;
use crate::session::WalletSession;

/// Whether a snapshot reflects the current session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Freshness {
    /// Read under the current session epoch and not invalidated since
    Fresh,
    /// May no longer match the chain
    Stale,
}

/// A balance as last read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceSnapshot {
    /// Chain the balance was read on
    pub chain_id: u64,
    /// Owner
    pub account: Address,
    /// Base units
    pub raw: U256,
    /// Decimals `raw` is expressed in
    pub decimals: u8,
    /// `raw` scaled by `decimals`
    pub formatted: String,
    /// Freshness at the time of the query
    pub freshness: Freshness,
    #[serde(skip)]
    pub(crate) epoch: u64,
}

impl BalanceSnapshot {
    fn new(chain_id: u64, account: Address, raw: U256, decimals: u8, epoch: u64) -> Self {
        Self {
            chain_id,
            account,
            raw,
            decimals,
            formatted: format_base_units(raw, decimals),
            freshness: Freshness::Fresh,
            epoch,
        }
    }

    /// Returns true if the snapshot is fresh
    pub fn is_fresh(&self) -> bool {
        self.freshness == Freshness::Fresh
    }
}

#[derive(Debug, Default)]
struct Snapshots {
    native: HashMap<u64, BalanceSnapshot>,
    bridged: HashMap<u64, BalanceSnapshot>,
    stale: HashSet<(u64, Kind)>,
}

/// Reads balances through the session and the contract binding.
#[derive(Debug)]
pub struct BalanceReader {
    session: Arc<WalletSession>,
    binding: ContractBinding,
    snapshots: RwLock<Snapshots>,
}

impl BalanceReader {
    /// Creates a reader with no snapshots
    pub fn new(session: Arc<WalletSession>, binding: ContractBinding) -> Self {
        Self { session, binding, snapshots: RwLock::new(Snapshots::default()) }
    }

    /// Reads the native ETH balance of `account` on the wallet's active chain.
    ///
    /// Failures are logged and leave the previous snapshot in place, marked stale.
    pub async fn refresh_native_balance(&self, account: Address) -> Option<BalanceSnapshot> {
        let epoch = self.session.epoch();
        let chain_id = self.session.active_chain_id()?;
        match self.session.provider().get_balance(account).await {
            Ok(raw) if self.session.epoch() == epoch => {
                let snapshot = BalanceSnapshot::new(chain_id, account, raw, NATIVE_DECIMALS, epoch);
                debug!(chain_id, %account, balance = %snapshot.formatted, "native balance");
                self.store(chain_id, snapshot.clone(), Kind::Native);
                Some(snapshot)
            }
            Ok(_) => {
                debug!(chain_id, "session changed during native balance read; discarded");
                self.mark_stale(chain_id);
                None
            }
            Err(e) => {
                warn!(chain_id, %account, error = %e, "native balance read failed");
                self.mark_stale(chain_id);
                None
            }
        }
    }

    /// Reads the SuperETH balance of `account` on the chain the signer is on.
    pub async fn refresh_bridged_balance(&self, account: Address) -> Option<BalanceSnapshot> {
        let signer = match self.session.signer().await {
            Ok(signer) => signer,
            Err(e) => {
                warn!(%account, error = %e, "no signer for bridged balance");
                return None;
            }
        };
        let chain_id = signer.chain_id();
        let read = async {
            let contract = self.binding.bind(Some(&signer))?;
            let raw = contract.balance_of(account).await?;
            let decimals = contract.decimals().await?;
            Ok::<_, freya_error::FreyaError>((raw, decimals))
        };
        match read.await {
            Ok((raw, decimals)) if self.session.is_current(&signer) => {
                let snapshot = BalanceSnapshot::new(chain_id, account, raw, decimals, signer.epoch());
                debug!(chain_id, %account, balance = %snapshot.formatted, "bridged balance");
                self.store(chain_id, snapshot.clone(), Kind::Bridged);
                Some(snapshot)
            }
            Ok(_) => {
                debug!(chain_id, "signer replaced during bridged balance read; discarded");
                self.mark_stale(chain_id);
                None
            }
            Err(e) => {
                warn!(chain_id, %account, error = %e, "bridged balance read failed");
                self.mark_stale(chain_id);
                None
            }
        }
    }

    /// Last native snapshot for `chain_id`
    pub fn native_balance(&self, chain_id: u64) -> Option<BalanceSnapshot> {
        self.lookup(chain_id, Kind::Native)
    }

    /// Last bridged snapshot for `chain_id`
    pub fn bridged_balance(&self, chain_id: u64) -> Option<BalanceSnapshot> {
        self.lookup(chain_id, Kind::Bridged)
    }

    /// Marks every snapshot for `chain_id` stale
    pub fn mark_stale(&self, chain_id: u64) {
        let mut snapshots = self.snapshots.write().unwrap_or_else(PoisonError::into_inner);
        snapshots.stale.insert((chain_id, Kind::Native));
        snapshots.stale.insert((chain_id, Kind::Bridged));
    }

    /// Marks every snapshot stale
    pub fn mark_all_stale(&self) {
        let mut snapshots = self.snapshots.write().unwrap_or_else(PoisonError::into_inner);
        let marks: Vec<(u64, Kind)> = snapshots
            .native
            .keys()
            .map(|chain_id| (*chain_id, Kind::Native))
            .chain(snapshots.bridged.keys().map(|chain_id| (*chain_id, Kind::Bridged)))
            .collect();
        snapshots.stale.extend(marks);
    }

    fn store(&self, chain_id: u64, snapshot: BalanceSnapshot, kind: Kind) {
        let mut snapshots = self.snapshots.write().unwrap_or_else(PoisonError::into_inner);
        match kind {
            Kind::Native => snapshots.native.insert(chain_id, snapshot),
            Kind::Bridged => snapshots.bridged.insert(chain_id, snapshot),
        };
        snapshots.stale.remove(&(chain_id, kind));
    }

    fn lookup(&self, chain_id: u64, kind: Kind) -> Option<BalanceSnapshot> {
        let epoch = self.session.epoch();
        let snapshots = self.snapshots.read().unwrap_or_else(PoisonError::into_inner);
        let map = match kind {
            Kind::Native => &snapshots.native,
            Kind::Bridged => &snapshots.bridged,
        };
        let mut snapshot = map.get(&chain_id)?.clone();
        if snapshot.epoch != epoch || snapshots.stale.contains(&(chain_id, kind)) {
            snapshot.freshness = Freshness::Stale;
        }
        Some(snapshot)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Kind {
    Native,
    Bridged,
}

#[cfg(test)]
mod tests {
    use super::*;
    use freya_error::WalletError;
    use freya_testing::{chains, Failure, Method, TestBed};

    async fn reader(bed: &TestBed) -> BalanceReader {
        let session = Arc::new(WalletSession::new(Arc::new(bed.wallet.clone())));
        session.connect().await.unwrap();
        let binding = ContractBinding::new(Address::repeat_byte(0x55), Arc::new(bed.ledger.clone()));
        BalanceReader::new(session, binding)
    }

    #[tokio::test]
    async fn test_native_balance_is_read_on_active_chain() {
        let bed = TestBed::new();
        let reader = reader(&bed).await;

        let snapshot = reader.refresh_native_balance(bed.account).await.unwrap();
        assert_eq!(snapshot.chain_id, chains::BASE_SEPOLIA);
        assert_eq!(snapshot.formatted, "10.000000000000000000");
        assert_eq!(reader.native_balance(chains::BASE_SEPOLIA), Some(snapshot));
        assert_eq!(reader.native_balance(chains::ZORA), None);
    }

    #[tokio::test]
    async fn test_bridged_balance_uses_contract_decimals() {
        let bed = TestBed::new();
        bed.ledger.set_decimals(chains::BASE_SEPOLIA, 6);
        bed.ledger.set_token_balance(chains::BASE_SEPOLIA, bed.account, U256::from(2_500_000u64));
        let reader = reader(&bed).await;

        let snapshot = reader.refresh_bridged_balance(bed.account).await.unwrap();
        assert_eq!(snapshot.decimals, 6);
        assert_eq!(snapshot.formatted, "2.500000");
        assert!(snapshot.is_fresh());
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_previous_snapshot_as_stale() {
        let bed = TestBed::new();
        let reader = reader(&bed).await;
        reader.refresh_native_balance(bed.account).await.unwrap();

        bed.wallet.fail_balance(WalletError::Transport("offline".into()));
        assert_eq!(reader.refresh_native_balance(bed.account).await, None);

        let snapshot = reader.native_balance(chains::BASE_SEPOLIA).unwrap();
        assert_eq!(snapshot.freshness, Freshness::Stale);
        assert_eq!(snapshot.formatted, "10.000000000000000000");
    }

    #[tokio::test]
    async fn test_failed_bridged_read_marks_stale() {
        let bed = TestBed::new();
        let reader = reader(&bed).await;
        reader.refresh_bridged_balance(bed.account).await.unwrap();

        bed.ledger.fail_next(Method::BalanceOf, Failure::Reject("rpc down".into()));
        assert_eq!(reader.refresh_bridged_balance(bed.account).await, None);
        assert!(!reader.bridged_balance(chains::BASE_SEPOLIA).unwrap().is_fresh());

        reader.refresh_bridged_balance(bed.account).await.unwrap();
        assert!(reader.bridged_balance(chains::BASE_SEPOLIA).unwrap().is_fresh());
    }

    #[tokio::test]
    async fn test_chain_change_makes_snapshots_stale() {
        let bed = TestBed::new();
        let reader = reader(&bed).await;
        reader.refresh_native_balance(bed.account).await.unwrap();
        reader.refresh_bridged_balance(bed.account).await.unwrap();

        bed.wallet.user_switches_to(chains::ZORA);

        assert!(!reader.native_balance(chains::BASE_SEPOLIA).unwrap().is_fresh());
        assert!(!reader.bridged_balance(chains::BASE_SEPOLIA).unwrap().is_fresh());
    }

    #[tokio::test]
    async fn test_mark_all_stale() {
        let bed = TestBed::new();
        let reader = reader(&bed).await;
        reader.refresh_native_balance(bed.account).await.unwrap();
        reader.mark_all_stale();
        assert!(!reader.native_balance(chains::BASE_SEPOLIA).unwrap().is_fresh());
    }
}
