//! In-memory injected wallet backed by a [`MockLedger`].

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use alloy::primitives::{Address, U256};
use async_trait::async_trait;
use freya_error::WalletError;
use freya_traits::{EventListener, ListenerId, ListenerRegistry, ProviderEvent, WalletProvider};

use crate::journal::Call;
use crate::ledger::MockLedger;

#[derive(Debug, Default)]
struct WalletState {
    accounts: Vec<Address>,
    known_chains: BTreeSet<u64>,
    connect_failure: Option<WalletError>,
    switch_failures: HashMap<u64, WalletError>,
    balance_failure: Option<WalletError>,
}

#[derive(Debug)]
struct WalletInner {
    ledger: MockLedger,
    state: Mutex<WalletState>,
    listeners: ListenerRegistry,
}

/// A scriptable [`WalletProvider`].
///
/// Switching chains moves the ledger's active chain and emits
/// `ChainChanged`, the way an injected browser wallet does.
#[derive(Debug, Clone)]
pub struct MockWallet {
    inner: Arc<WalletInner>,
}

impl MockWallet {
    /// Creates a wallet exposing `accounts` that knows `chains`
    pub fn new(
        ledger: MockLedger,
        accounts: Vec<Address>,
        chains: impl IntoIterator<Item = u64>,
    ) -> Self {
        let state = WalletState {
            accounts,
            known_chains: chains.into_iter().collect(),
            ..WalletState::default()
        };
        Self {
            inner: Arc::new(WalletInner {
                ledger,
                state: Mutex::new(state),
                listeners: ListenerRegistry::new(),
            }),
        }
    }

    /// The ledger this wallet signs against
    pub fn ledger(&self) -> &MockLedger {
        &self.inner.ledger
    }

    /// Replaces the exposed accounts and emits `AccountsChanged`
    pub fn set_accounts(&self, accounts: Vec<Address>) {
        self.lock().accounts = accounts.clone();
        self.inner.listeners.emit(&ProviderEvent::AccountsChanged(accounts));
    }

    /// Simulates the user picking another network inside the wallet
    pub fn user_switches_to(&self, chain_id: u64) {
        self.inner.ledger.set_active_chain(chain_id);
        self.inner.listeners.emit(&ProviderEvent::ChainChanged(chain_id));
    }

    /// Moves to `chain_id` without telling any listener
    pub fn drift_to(&self, chain_id: u64) {
        self.inner.ledger.set_active_chain(chain_id);
    }

    /// Makes every `request_accounts` fail with `error`
    pub fn fail_connect(&self, error: WalletError) {
        self.lock().connect_failure = Some(error);
    }

    /// Makes every switch to `chain_id` fail with `error`
    pub fn fail_switch_to(&self, chain_id: u64, error: WalletError) {
        self.lock().switch_failures.insert(chain_id, error);
    }

    /// Makes every `get_balance` fail with `error`
    pub fn fail_balance(&self, error: WalletError) {
        self.lock().balance_failure = Some(error);
    }

    /// Removes all injected failures
    pub fn clear_failures(&self) {
        let mut state = self.lock();
        state.connect_failure = None;
        state.switch_failures.clear();
        state.balance_failure = None;
    }

    /// Number of subscribed listeners
    pub fn listener_count(&self) -> usize {
        self.inner.listeners.len()
    }

    fn lock(&self) -> MutexGuard<'_, WalletState> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, call: Call) {
        self.inner.ledger.journal().record(call);
    }
}

#[async_trait]
impl WalletProvider for MockWallet {
    async fn request_accounts(&self) -> Result<Vec<Address>, WalletError> {
        self.record(Call::RequestAccounts);
        let state = self.lock();
        if let Some(error) = &state.connect_failure {
            return Err(error.clone());
        }
        if state.accounts.is_empty() {
            return Err(WalletError::NoAccounts);
        }
        Ok(state.accounts.clone())
    }

    async fn chain_id(&self) -> Result<u64, WalletError> {
        self.record(Call::ChainId);
        Ok(self.inner.ledger.active_chain())
    }

    async fn switch_chain(&self, chain_id: u64) -> Result<(), WalletError> {
        self.record(Call::SwitchChain(chain_id));
        {
            let state = self.lock();
            if let Some(error) = state.switch_failures.get(&chain_id) {
                return Err(error.clone());
            }
            if !state.known_chains.contains(&chain_id) {
                return Err(WalletError::UnrecognizedChain { chain_id });
            }
        }
        if self.inner.ledger.set_active_chain(chain_id) {
            self.inner.listeners.emit(&ProviderEvent::ChainChanged(chain_id));
        }
        Ok(())
    }

    async fn get_balance(&self, account: Address) -> Result<U256, WalletError> {
        let chain_id = self.inner.ledger.active_chain();
        self.record(Call::GetBalance { chain_id, account });
        if let Some(error) = &self.lock().balance_failure {
            return Err(error.clone());
        }
        Ok(self.inner.ledger.native_balance(chain_id, account))
    }

    fn add_listener(&self, listener: EventListener) -> ListenerId {
        self.inner.listeners.add(listener)
    }

    fn remove_listener(&self, id: ListenerId) -> bool {
        self.inner.listeners.remove(id)
    }
}
