//! In-memory SuperETH deployment spanning several chains.
//!
//! Writes are checked at submission (injected rejections, wrong network,
//! burn authorization) and applied at confirmation, so a test can hold a
//! transaction between the two with a [`Gate`]. A gate on a view method
//! parks the next call of that view instead.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use alloy::primitives::{keccak256, Address, U256};
use async_trait::async_trait;
use freya_error::ContractError;
use freya_traits::{BridgeToken, PendingTx, SignerHandle, TokenConnector, TxHash, TxReceipt};
use tokio::sync::{Notify, Semaphore};

use crate::journal::{Call, Journal, Method};

/// How an injected failure manifests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    /// The call is refused before a transaction exists
    Reject(String),
    /// The transaction is submitted but mined with a failed status
    Revert,
}

/// Holds a transaction between submission and confirmation, or a view call
/// before it returns.
#[derive(Debug)]
pub struct Gate {
    arrived: AtomicBool,
    reached: Notify,
    release: Semaphore,
}

impl Gate {
    fn new() -> Self {
        Self { arrived: AtomicBool::new(false), reached: Notify::new(), release: Semaphore::new(0) }
    }

    /// Resolves once a confirmation is parked at this gate
    pub async fn reached(&self) {
        if self.arrived.load(Ordering::SeqCst) {
            return;
        }
        self.reached.notified().await;
    }

    /// Lets the parked confirmation proceed
    pub fn release(&self) {
        self.release.add_permits(1);
    }

    async fn pass(&self) {
        self.arrived.store(true, Ordering::SeqCst);
        self.reached.notify_one();
        if let Ok(permit) = self.release.acquire().await {
            permit.forget();
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Effect {
    Deposit { chain_id: u64, account: Address, value: U256 },
    Withdraw { chain_id: u64, account: Address, amount: U256 },
    Burn { chain_id: u64, from: Address, amount: U256 },
    Mint { chain_id: u64, to: Address, amount: U256 },
}

impl Effect {
    fn chain_id(&self) -> u64 {
        match *self {
            Effect::Deposit { chain_id, .. }
            | Effect::Withdraw { chain_id, .. }
            | Effect::Burn { chain_id, .. }
            | Effect::Mint { chain_id, .. } => chain_id,
        }
    }

    fn method(&self) -> Method {
        match self {
            Effect::Deposit { .. } => Method::Deposit,
            Effect::Withdraw { .. } => Method::Withdraw,
            Effect::Burn { .. } => Method::Burn,
            Effect::Mint { .. } => Method::Mint,
        }
    }
}

#[derive(Debug)]
struct LedgerState {
    decimals: HashMap<u64, u8>,
    token: HashMap<(u64, Address), U256>,
    native: HashMap<(u64, Address), U256>,
    supply: HashMap<u64, U256>,
    failures: HashMap<Method, Failure>,
    gates: HashMap<Method, Arc<Gate>>,
    burn_authorized: bool,
    tx_counter: u64,
}

impl LedgerState {
    fn debit(
        balances: &mut HashMap<(u64, Address), U256>,
        key: (u64, Address),
        amount: U256,
    ) -> Option<()> {
        let balance = balances.entry(key).or_default();
        *balance = balance.checked_sub(amount)?;
        Some(())
    }

    fn credit(balances: &mut HashMap<(u64, Address), U256>, key: (u64, Address), amount: U256) {
        let balance = balances.entry(key).or_default();
        *balance = balance.saturating_add(amount);
    }

    fn apply(&mut self, effect: Effect) -> Option<()> {
        match effect {
            Effect::Deposit { chain_id, account, value } => {
                Self::debit(&mut self.native, (chain_id, account), value)?;
                Self::credit(&mut self.token, (chain_id, account), value);
                self.grow_supply(chain_id, value);
            }
            Effect::Withdraw { chain_id, account, amount } => {
                Self::debit(&mut self.token, (chain_id, account), amount)?;
                Self::credit(&mut self.native, (chain_id, account), amount);
                self.shrink_supply(chain_id, amount);
            }
            Effect::Burn { chain_id, from, amount } => {
                Self::debit(&mut self.token, (chain_id, from), amount)?;
                self.shrink_supply(chain_id, amount);
            }
            Effect::Mint { chain_id, to, amount } => {
                Self::credit(&mut self.token, (chain_id, to), amount);
                self.grow_supply(chain_id, amount);
            }
        }
        Some(())
    }

    fn grow_supply(&mut self, chain_id: u64, amount: U256) {
        let supply = self.supply.entry(chain_id).or_default();
        *supply = supply.saturating_add(amount);
    }

    fn shrink_supply(&mut self, chain_id: u64, amount: U256) {
        let supply = self.supply.entry(chain_id).or_default();
        *supply = supply.saturating_sub(amount);
    }
}

#[derive(Debug)]
struct LedgerInner {
    state: Mutex<LedgerState>,
    active_chain: AtomicU64,
    journal: Journal,
}

/// A multi-chain token ledger and [`TokenConnector`].
///
/// Cloning yields another handle to the same ledger.
#[derive(Debug, Clone)]
pub struct MockLedger {
    inner: Arc<LedgerInner>,
}

impl MockLedger {
    /// Token precision used when a chain has no explicit setting
    pub const DEFAULT_DECIMALS: u8 = 18;

    /// Creates an empty ledger whose wallet starts on `active_chain`
    pub fn new(journal: Journal, active_chain: u64) -> Self {
        let state = LedgerState {
            decimals: HashMap::new(),
            token: HashMap::new(),
            native: HashMap::new(),
            supply: HashMap::new(),
            failures: HashMap::new(),
            gates: HashMap::new(),
            burn_authorized: true,
            tx_counter: 0,
        };
        Self {
            inner: Arc::new(LedgerInner {
                state: Mutex::new(state),
                active_chain: AtomicU64::new(active_chain),
                journal,
            }),
        }
    }

    /// Journal shared with the wallet double
    pub fn journal(&self) -> &Journal {
        &self.inner.journal
    }

    /// Chain the wallet is currently on
    pub fn active_chain(&self) -> u64 {
        self.inner.active_chain.load(Ordering::SeqCst)
    }

    pub(crate) fn set_active_chain(&self, chain_id: u64) -> bool {
        self.inner.active_chain.swap(chain_id, Ordering::SeqCst) != chain_id
    }

    /// Sets the token precision on one chain
    pub fn set_decimals(&self, chain_id: u64, decimals: u8) {
        self.lock().decimals.insert(chain_id, decimals);
    }

    /// Token precision on one chain
    pub fn decimals(&self, chain_id: u64) -> u8 {
        self.lock().decimals.get(&chain_id).copied().unwrap_or(Self::DEFAULT_DECIMALS)
    }

    /// Seeds a bridged-token balance (also counted in supply)
    pub fn set_token_balance(&self, chain_id: u64, owner: Address, amount: U256) {
        let mut state = self.lock();
        let previous = state.token.insert((chain_id, owner), amount).unwrap_or_default();
        state.shrink_supply(chain_id, previous);
        state.grow_supply(chain_id, amount);
    }

    /// Bridged-token balance
    pub fn token_balance(&self, chain_id: u64, owner: Address) -> U256 {
        self.lock().token.get(&(chain_id, owner)).copied().unwrap_or_default()
    }

    /// Seeds a native-coin balance in wei
    pub fn set_native_balance(&self, chain_id: u64, owner: Address, wei: U256) {
        self.lock().native.insert((chain_id, owner), wei);
    }

    /// Native-coin balance in wei
    pub fn native_balance(&self, chain_id: u64, owner: Address) -> U256 {
        self.lock().native.get(&(chain_id, owner)).copied().unwrap_or_default()
    }

    /// Token supply on one chain
    pub fn total_supply(&self, chain_id: u64) -> U256 {
        self.lock().supply.get(&chain_id).copied().unwrap_or_default()
    }

    /// Makes the next call of `method` fail
    pub fn fail_next(&self, method: Method, failure: Failure) {
        self.lock().failures.insert(method, failure);
    }

    /// Parks the next confirmation of `method` (or the next call, for views)
    /// until the gate is released
    pub fn hold(&self, method: Method) -> Arc<Gate> {
        let gate = Arc::new(Gate::new());
        self.lock().gates.insert(method, Arc::clone(&gate));
        gate
    }

    /// Controls whether `crosschainBurn` accepts the caller
    pub fn set_burn_authorized(&self, authorized: bool) {
        self.lock().burn_authorized = authorized;
    }

    fn lock(&self) -> MutexGuard<'_, LedgerState> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn take_read_failure(&self, method: Method) -> Result<(), ContractError> {
        let reason = match self.lock().failures.remove(&method) {
            Some(Failure::Reject(reason)) => reason,
            Some(Failure::Revert) => "execution reverted".to_string(),
            None => return Ok(()),
        };
        Err(ContractError::Call { method: method.name().into(), reason })
    }

    fn submit(&self, signer: &SignerHandle, effect: Effect) -> Result<Box<dyn PendingTx>, ContractError> {
        let method = effect.method();
        let mut state = self.lock();
        let revert = match state.failures.remove(&method) {
            Some(Failure::Reject(reason)) => {
                return Err(ContractError::Submission { method: method.name().into(), reason });
            }
            Some(Failure::Revert) => true,
            None => false,
        };
        let active = self.active_chain();
        if active != signer.chain_id() {
            return Err(ContractError::Submission {
                method: method.name().into(),
                reason: format!(
                    "wallet is on chain {active:#x} but the transaction targets {:#x}",
                    signer.chain_id()
                ),
            });
        }
        if method == Method::Burn && !state.burn_authorized {
            return Err(ContractError::Submission {
                method: method.name().into(),
                reason: "execution reverted: Unauthorized".into(),
            });
        }
        state.tx_counter += 1;
        let tx_hash = TxHash(keccak256(state.tx_counter.to_be_bytes()));
        let gate = state.gates.remove(&method);
        Ok(Box::new(MockPending { ledger: self.clone(), tx_hash, effect, gate, revert }))
    }
}

impl TokenConnector for MockLedger {
    fn connect(
        &self,
        _address: Address,
        signer: &SignerHandle,
    ) -> Result<Arc<dyn BridgeToken>, ContractError> {
        self.journal().record(Call::Bind { chain_id: signer.chain_id(), account: signer.account() });
        Ok(Arc::new(MockToken { ledger: self.clone(), signer: *signer }))
    }
}

struct MockPending {
    ledger: MockLedger,
    tx_hash: TxHash,
    effect: Effect,
    gate: Option<Arc<Gate>>,
    revert: bool,
}

#[async_trait]
impl PendingTx for MockPending {
    fn tx_hash(&self) -> TxHash {
        self.tx_hash
    }

    async fn confirm(self: Box<Self>) -> Result<TxReceipt, ContractError> {
        if let Some(gate) = &self.gate {
            gate.pass().await;
        }
        let reverted = ContractError::Reverted { tx_hash: self.tx_hash.to_string() };
        if self.revert {
            return Err(reverted);
        }
        let block_number = {
            let mut state = self.ledger.lock();
            state.apply(self.effect).ok_or(reverted)?;
            state.tx_counter
        };
        self.ledger.journal().record(Call::Confirmed {
            chain_id: self.effect.chain_id(),
            method: self.effect.method(),
        });
        Ok(TxReceipt { tx_hash: self.tx_hash, block_number: Some(block_number) })
    }
}

/// The token contract as seen through one signer.
struct MockToken {
    ledger: MockLedger,
    signer: SignerHandle,
}

impl MockToken {
    async fn read(&self, method: Method) -> Result<(), ContractError> {
        self.ledger.journal().record(Call::Read { chain_id: self.signer.chain_id(), method });
        let gate = self.ledger.lock().gates.remove(&method);
        if let Some(gate) = gate {
            gate.pass().await;
        }
        self.ledger.take_read_failure(method)
    }
}

#[async_trait]
impl BridgeToken for MockToken {
    async fn name(&self) -> Result<String, ContractError> {
        self.read(Method::Metadata).await?;
        Ok("SuperETH".to_string())
    }

    async fn symbol(&self) -> Result<String, ContractError> {
        self.read(Method::Metadata).await?;
        Ok("sETH".to_string())
    }

    async fn decimals(&self) -> Result<u8, ContractError> {
        self.read(Method::Decimals).await?;
        Ok(self.ledger.decimals(self.signer.chain_id()))
    }

    async fn total_supply(&self) -> Result<U256, ContractError> {
        self.read(Method::Metadata).await?;
        Ok(self.ledger.total_supply(self.signer.chain_id()))
    }

    async fn balance_of(&self, owner: Address) -> Result<U256, ContractError> {
        self.read(Method::BalanceOf).await?;
        Ok(self.ledger.token_balance(self.signer.chain_id(), owner))
    }

    async fn deposit(&self, value: U256) -> Result<Box<dyn PendingTx>, ContractError> {
        let (chain_id, account) = (self.signer.chain_id(), self.signer.account());
        self.ledger.journal().record(Call::Deposit { chain_id, from: account, value });
        self.ledger.submit(&self.signer, Effect::Deposit { chain_id, account, value })
    }

    async fn withdraw(&self, amount: U256) -> Result<Box<dyn PendingTx>, ContractError> {
        let (chain_id, account) = (self.signer.chain_id(), self.signer.account());
        self.ledger.journal().record(Call::Withdraw { chain_id, from: account, amount });
        self.ledger.submit(&self.signer, Effect::Withdraw { chain_id, account, amount })
    }

    async fn crosschain_burn(
        &self,
        from: Address,
        amount: U256,
    ) -> Result<Box<dyn PendingTx>, ContractError> {
        let chain_id = self.signer.chain_id();
        self.ledger.journal().record(Call::Burn { chain_id, from, amount });
        self.ledger.submit(&self.signer, Effect::Burn { chain_id, from, amount })
    }

    async fn crosschain_mint(
        &self,
        to: Address,
        amount: U256,
    ) -> Result<Box<dyn PendingTx>, ContractError> {
        let chain_id = self.signer.chain_id();
        self.ledger.journal().record(Call::Mint { chain_id, to, amount });
        self.ledger.submit(&self.signer, Effect::Mint { chain_id, to, amount })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHAIN: u64 = 0x14913;

    fn signer() -> SignerHandle {
        SignerHandle::new(Address::repeat_byte(0x01), CHAIN, 1)
    }

    #[tokio::test]
    async fn test_deposit_moves_native_into_token() {
        let ledger = MockLedger::new(Journal::new(), CHAIN);
        let owner = signer().account();
        ledger.set_native_balance(CHAIN, owner, U256::from(10u64));
        let token = ledger.connect(Address::ZERO, &signer()).unwrap();

        token.deposit(U256::from(4u64)).await.unwrap().confirm().await.unwrap();

        assert_eq!(ledger.native_balance(CHAIN, owner), U256::from(6u64));
        assert_eq!(ledger.token_balance(CHAIN, owner), U256::from(4u64));
        assert_eq!(ledger.total_supply(CHAIN), U256::from(4u64));
    }

    #[tokio::test]
    async fn test_write_on_wrong_chain_is_rejected() {
        let ledger = MockLedger::new(Journal::new(), 0xA8F3C);
        let token = ledger.connect(Address::ZERO, &signer()).unwrap();
        let err = token.crosschain_mint(Address::ZERO, U256::from(1u64)).await.err().unwrap();
        assert!(matches!(err, ContractError::Submission { .. }));
    }

    #[tokio::test]
    async fn test_revert_leaves_balances_untouched() {
        let ledger = MockLedger::new(Journal::new(), CHAIN);
        let owner = signer().account();
        ledger.set_token_balance(CHAIN, owner, U256::from(5u64));
        ledger.fail_next(Method::Burn, Failure::Revert);
        let token = ledger.connect(Address::ZERO, &signer()).unwrap();

        let pending = token.crosschain_burn(owner, U256::from(5u64)).await.unwrap();
        assert!(matches!(pending.confirm().await, Err(ContractError::Reverted { .. })));
        assert_eq!(ledger.token_balance(CHAIN, owner), U256::from(5u64));
    }

    #[tokio::test]
    async fn test_overdrawn_burn_reverts() {
        let ledger = MockLedger::new(Journal::new(), CHAIN);
        let token = ledger.connect(Address::ZERO, &signer()).unwrap();
        let pending = token.crosschain_burn(signer().account(), U256::from(1u64)).await.unwrap();
        assert!(matches!(pending.confirm().await, Err(ContractError::Reverted { .. })));
    }

    #[tokio::test]
    async fn test_gate_parks_view_call() {
        let ledger = MockLedger::new(Journal::new(), CHAIN);
        ledger.set_decimals(CHAIN, 6);
        let gate = ledger.hold(Method::Decimals);
        let token = ledger.connect(Address::ZERO, &signer()).unwrap();

        let task = tokio::spawn(async move { token.decimals().await });
        gate.reached().await;
        assert!(!task.is_finished());

        gate.release();
        assert_eq!(task.await.unwrap().unwrap(), 6);
    }

    #[tokio::test]
    async fn test_gate_parks_confirmation() {
        let ledger = MockLedger::new(Journal::new(), CHAIN);
        let gate = ledger.hold(Method::Mint);
        let token = ledger.connect(Address::ZERO, &signer()).unwrap();
        let pending = token.crosschain_mint(Address::repeat_byte(2), U256::from(3u64)).await.unwrap();

        let task = tokio::spawn(pending.confirm());
        gate.reached().await;
        assert_eq!(ledger.token_balance(CHAIN, Address::repeat_byte(2)), U256::ZERO);

        gate.release();
        task.await.unwrap().unwrap();
        assert_eq!(ledger.token_balance(CHAIN, Address::repeat_byte(2)), U256::from(3u64));
    }
}
