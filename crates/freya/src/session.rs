//! Wallet session: account, active chain and the signer handle derived from them.
//!
//! The session subscribes to provider events when it connects. Every
//! `ChainChanged` or `AccountsChanged` tears the signer down and bumps the
//! epoch; [`WalletSession::signer`] re-derives a handle on demand.

use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};

use alloy::primitives::Address;
use freya_error::{FreyaError, Result, WalletError};
use freya_traits::{ListenerId, ProviderEvent, SignerHandle, WalletProvider};
use tokio::sync::watch;
use tracing::{debug, info};

use crate::registry::ChainDescriptor;

#[derive(Debug, Default)]
struct SessionState {
    account: Option<Address>,
    active_chain: Option<u64>,
    signer: Option<SignerHandle>,
    epoch: u64,
}

impl SessionState {
    fn invalidate(&mut self) -> u64 {
        self.signer = None;
        self.epoch += 1;
        self.epoch
    }
}

#[derive(Debug)]
struct Shared {
    state: RwLock<SessionState>,
    invalidations: watch::Sender<u64>,
}

impl Shared {
    fn read(&self) -> RwLockReadGuard<'_, SessionState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, SessionState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn on_event(&self, event: &ProviderEvent) {
        let epoch = {
            let mut state = self.write();
            match event {
                ProviderEvent::ChainChanged(chain_id) => {
                    info!(chain_id, "wallet chain changed");
                    state.active_chain = Some(*chain_id);
                }
                ProviderEvent::AccountsChanged(accounts) => {
                    info!(account = ?accounts.first(), "wallet accounts changed");
                    state.account = accounts.first().copied();
                }
            }
            state.invalidate()
        };
        self.invalidations.send_replace(epoch);
    }
}

/// The single connection to a wallet provider.
pub struct WalletSession {
    provider: Arc<dyn WalletProvider>,
    shared: Arc<Shared>,
    listener: Mutex<Option<ListenerId>>,
}

impl WalletSession {
    /// Creates a disconnected session
    pub fn new(provider: Arc<dyn WalletProvider>) -> Self {
        let (invalidations, _) = watch::channel(0);
        Self {
            provider,
            shared: Arc::new(Shared { state: RwLock::new(SessionState::default()), invalidations }),
            listener: Mutex::new(None),
        }
    }

    /// The underlying provider
    pub fn provider(&self) -> &Arc<dyn WalletProvider> {
        &self.provider
    }

    /// Requests accounts, records the first one and the current chain, and
    /// issues a signer for them.
    pub async fn connect(&self) -> Result<Address> {
        let accounts = self.provider.request_accounts().await.map_err(connect_error)?;
        let account = accounts
            .first()
            .copied()
            .ok_or_else(|| FreyaError::WalletUnavailable("wallet exposes no accounts".into()))?;
        let chain_id = self.provider.chain_id().await.map_err(connect_error)?;
        self.subscribe();

        let epoch = {
            let mut state = self.shared.write();
            state.account = Some(account);
            state.active_chain = Some(chain_id);
            let epoch = state.invalidate();
            state.signer = Some(SignerHandle::new(account, chain_id, epoch));
            epoch
        };
        self.shared.invalidations.send_replace(epoch);
        info!(%account, chain_id, "wallet connected");
        Ok(account)
    }

    /// Asks the wallet to move to `chain`.
    ///
    /// A refusal leaves the session usable on its previous chain.
    pub async fn switch_chain(&self, chain: &ChainDescriptor) -> Result<()> {
        debug!(chain = chain.id(), "requesting chain switch");
        self.provider
            .switch_chain(chain.numeric_id())
            .await
            .map_err(|e| switch_error(chain, e))?;

        let bumped = {
            let mut state = self.shared.write();
            if state.active_chain == Some(chain.numeric_id()) {
                None
            } else {
                state.active_chain = Some(chain.numeric_id());
                Some(state.invalidate())
            }
        };
        if let Some(epoch) = bumped {
            self.shared.invalidations.send_replace(epoch);
        }
        Ok(())
    }

    /// Returns a signer for the current account on the chain the provider
    /// reports right now, re-creating it if anything changed.
    pub async fn signer(&self) -> Result<SignerHandle> {
        if self.account().is_none() {
            return Err(FreyaError::NoSigner);
        }
        let reported = self
            .provider
            .chain_id()
            .await
            .map_err(|e| FreyaError::WalletUnavailable(e.to_string()))?;

        let (handle, bumped) = {
            let mut state = self.shared.write();
            let account = state.account.ok_or(FreyaError::NoSigner)?;
            let mut bumped = None;
            if state.active_chain != Some(reported) {
                debug!(reported, "provider chain differs from session chain");
                state.active_chain = Some(reported);
                bumped = Some(state.invalidate());
            }
            let (existing, epoch) = (state.signer, state.epoch);
            let handle = match existing {
                Some(handle) if handle.account() == account && handle.chain_id() == reported => handle,
                _ => {
                    let handle = SignerHandle::new(account, reported, epoch);
                    debug!(%account, chain_id = reported, epoch, "signer derived");
                    state.signer = Some(handle);
                    handle
                }
            };
            (handle, bumped)
        };
        if let Some(epoch) = bumped {
            self.shared.invalidations.send_replace(epoch);
        }
        Ok(handle)
    }

    /// Returns true while `handle` is the session's live signer
    pub fn is_current(&self, handle: &SignerHandle) -> bool {
        let state = self.shared.read();
        state.signer.as_ref() == Some(handle) && state.epoch == handle.epoch()
    }

    /// Unsubscribes from the provider and forgets account, chain and signer
    pub fn disconnect(&self) {
        self.unsubscribe();
        let epoch = {
            let mut state = self.shared.write();
            state.account = None;
            state.active_chain = None;
            state.invalidate()
        };
        self.shared.invalidations.send_replace(epoch);
        info!("wallet disconnected");
    }

    /// Connected account
    pub fn account(&self) -> Option<Address> {
        self.shared.read().account
    }

    /// Last known chain
    pub fn active_chain_id(&self) -> Option<u64> {
        self.shared.read().active_chain
    }

    /// Live signer, without consulting the provider
    pub fn current_signer(&self) -> Option<SignerHandle> {
        self.shared.read().signer
    }

    /// Invalidation counter
    pub fn epoch(&self) -> u64 {
        self.shared.read().epoch
    }

    /// Returns true once connected with an account
    pub fn is_connected(&self) -> bool {
        self.account().is_some()
    }

    /// Receives the new epoch after every invalidation
    pub fn invalidations(&self) -> watch::Receiver<u64> {
        self.shared.invalidations.subscribe()
    }

    fn subscribe(&self) {
        let mut slot = self.listener.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_some() {
            return;
        }
        let shared: Weak<Shared> = Arc::downgrade(&self.shared);
        let id = self.provider.add_listener(Arc::new(move |event: &ProviderEvent| {
            if let Some(shared) = shared.upgrade() {
                shared.on_event(event);
            }
        }));
        *slot = Some(id);
    }

    fn unsubscribe(&self) {
        let id = self.listener.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(id) = id {
            self.provider.remove_listener(id);
        }
    }
}

impl Drop for WalletSession {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl std::fmt::Debug for WalletSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.shared.read();
        f.debug_struct("WalletSession")
            .field("account", &state.account)
            .field("active_chain", &state.active_chain)
            .field("signer", &state.signer)
            .field("epoch", &state.epoch)
            .finish()
    }
}

fn connect_error(err: WalletError) -> FreyaError {
    match err {
        WalletError::UserRejected(reason) => FreyaError::UserRejected(reason),
        other => FreyaError::WalletUnavailable(other.to_string()),
    }
}

fn switch_error(chain: &ChainDescriptor, err: WalletError) -> FreyaError {
    match err {
        WalletError::UnrecognizedChain { .. } => {
            FreyaError::UnsupportedChain(format!("{} ({})", chain.name(), chain.id()))
        }
        other => FreyaError::SwitchRejected { chain: chain.id().to_string(), reason: other.to_string() },
    }
}
