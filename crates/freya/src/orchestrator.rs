//! Deposit, withdraw and burn/mint bridging across the configured chains.
//!
//! Every operation claims the single-flight tracker, narrates its phases, and
//! re-derives the signer right before each write so that a chain or account
//! change observed at any await point is never signed through.

use std::str::FromStr;
use std::sync::Arc;

use alloy::primitives::{Address, U256};
use freya_error::{AmountError, ContractError, FreyaError, Result, StuckTransfer};
use freya_traits::{
    SignerHandle, TokenAmount, TokenConnector, TxHash, TxReceipt, WalletProvider, NATIVE_DECIMALS,
};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, info};

use crate::balance::BalanceReader;
use crate::binding::ContractBinding;
use crate::config::FreyaConfig;
use crate::registry::{ChainDescriptor, ChainRegistry};
use crate::session::WalletSession;
use crate::status::{OperationGuard, OperationKind, OperationState, OperationStatus, OperationTracker};

/// A request to move `amount` from `source_chain` to `recipient` on `target_chain`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRequest {
    /// Amount in token units, e.g. `1.5`
    pub amount: TokenAmount,
    /// Hex id of the chain to burn on
    pub source_chain: String,
    /// Hex id of the chain to mint on
    pub target_chain: String,
    /// Address that receives the minted tokens
    pub recipient: String,
}

impl TransferRequest {
    /// Creates a request
    pub fn new(
        amount: TokenAmount,
        source_chain: impl Into<String>,
        target_chain: impl Into<String>,
        recipient: impl Into<String>,
    ) -> Self {
        Self {
            amount,
            source_chain: source_chain.into(),
            target_chain: target_chain.into(),
            recipient: recipient.into(),
        }
    }
}

/// Parses a `0x`-prefixed, 20-byte recipient address.
///
/// Mixed-case input must carry a valid EIP-55 checksum; all-lowercase and
/// all-uppercase input is accepted as is.
pub fn parse_recipient(text: &str) -> Result<Address> {
    let text = text.trim();
    if text.is_empty() {
        return Err(FreyaError::InvalidInput("recipient address is required".into()));
    }
    let digits = text.strip_prefix("0x").ok_or_else(|| {
        FreyaError::InvalidInput(format!("recipient '{text}' must start with 0x"))
    })?;
    if digits.len() != 40 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(FreyaError::InvalidInput(format!(
            "recipient '{text}' is not a 20-byte hex address"
        )));
    }
    let mixed_case = digits.chars().any(|c| c.is_ascii_lowercase())
        && digits.chars().any(|c| c.is_ascii_uppercase());
    let parsed = if mixed_case {
        Address::parse_checksummed(text, None).ok()
    } else {
        Address::from_str(text).ok()
    };
    parsed.ok_or_else(|| FreyaError::InvalidInput(format!("recipient '{text}' has a bad checksum")))
}

/// Result of a confirmed deposit or withdraw
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationReceipt {
    /// Deposit or withdraw
    pub kind: OperationKind,
    /// Chain the transaction was mined on
    pub chain_id: u64,
    /// Signing account
    pub account: Address,
    /// Transaction hash
    pub tx_hash: TxHash,
    /// Amount in base units
    pub amount: U256,
    /// Inclusion block, when reported
    pub block_number: Option<u64>,
}

/// Result of a completed bridge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeReceipt {
    /// Chain the tokens were burned on
    pub source_chain: u64,
    /// Chain the tokens were minted on
    pub target_chain: u64,
    /// Mint recipient
    pub recipient: Address,
    /// Burned and minted amount in base units
    pub amount: U256,
    /// Burn transaction
    pub burn_tx: TxHash,
    /// Mint transaction
    pub mint_tx: TxHash,
}

/// Drives deposit, withdraw and bridge for one wallet session.
#[derive(Debug)]
pub struct TransferOrchestrator {
    registry: ChainRegistry,
    session: Arc<WalletSession>,
    binding: ContractBinding,
    balances: BalanceReader,
    tracker: OperationTracker,
    default_route: (String, String),
}

impl TransferOrchestrator {
    /// Creates an orchestrator whose default route is Base Sepolia → Optimism
    /// Sepolia, or the first two catalogue chains when those are absent.
    pub fn new(
        registry: ChainRegistry,
        provider: Arc<dyn WalletProvider>,
        binding: ContractBinding,
    ) -> Self {
        let default_route = default_route(&registry);
        let session = Arc::new(WalletSession::new(provider));
        let balances = BalanceReader::new(Arc::clone(&session), binding.clone());
        Self {
            registry,
            session,
            binding,
            balances,
            tracker: OperationTracker::default(),
            default_route,
        }
    }

    /// Builds an orchestrator from a validated config
    pub fn from_config(
        config: &FreyaConfig,
        provider: Arc<dyn WalletProvider>,
        connector: Arc<dyn TokenConnector>,
    ) -> Result<Self> {
        config.validate()?;
        let binding = ContractBinding::new(config.contract_address()?, connector);
        let orchestrator = Self::new(config.registry()?, provider, binding)
            .with_default_route(&config.default_source, &config.default_target)?;
        Ok(orchestrator)
    }

    /// Replaces the route used by [`request`](Self::request)
    pub fn with_default_route(mut self, source: &str, target: &str) -> Result<Self> {
        let source = self.registry.require(source)?.id().to_string();
        let target = self.registry.require(target)?.id().to_string();
        self.default_route = (source, target);
        Ok(self)
    }

    // ============================================================================
    // Session
    // ============================================================================

    /// Connects the wallet and reads the initial balances
    pub async fn connect(&self) -> Result<Address> {
        let account = self.session.connect().await?;
        self.refresh_balances().await;
        Ok(account)
    }

    /// Re-reads native and bridged balances on the active chain
    pub async fn refresh_balances(&self) {
        if let Some(account) = self.session.account() {
            self.balances.refresh_native_balance(account).await;
            self.balances.refresh_bridged_balance(account).await;
        }
    }

    /// Moves the wallet to `chain_id` outside of any operation
    pub async fn switch_chain(&self, chain_id: &str) -> Result<()> {
        if self.tracker.is_busy() {
            return Err(FreyaError::OperationInProgress);
        }
        let chain = self.registry.require(chain_id)?;
        self.session.switch_chain(chain).await?;
        self.refresh_balances().await;
        Ok(())
    }

    /// Builds a request over the default route
    pub fn request(&self, amount: &str, recipient: &str) -> Result<TransferRequest> {
        let amount = TokenAmount::parse(amount)?;
        let (source, target) = &self.default_route;
        Ok(TransferRequest::new(amount, source.as_str(), target.as_str(), recipient))
    }

    // ============================================================================
    // Deposit / Withdraw
    // ============================================================================

    /// Wraps `amount` native ETH into SuperETH on the active chain.
    pub async fn deposit(&self, amount: &TokenAmount) -> Result<OperationReceipt> {
        let value = amount.to_base_units(NATIVE_DECIMALS)?;
        self.require_connected()?;
        let guard = self.tracker.begin(OperationKind::Deposit)?;
        guard.phase("Depositing...");
        match self.run_deposit(value).await {
            Ok(receipt) => {
                guard.succeed("Deposit successful!");
                self.refresh_balances().await;
                Ok(receipt)
            }
            Err(e) => Err(guard.fail(e)),
        }
    }

    async fn run_deposit(&self, value: U256) -> Result<OperationReceipt> {
        let signer = self.session.signer().await?;
        let contract = self.binding.bind(Some(&signer))?;
        let pending = contract.deposit(value).await.map_err(|e| tx_failed("Deposit", e))?;
        let receipt = pending.confirm().await.map_err(|e| tx_failed("Deposit", e))?;
        Ok(operation_receipt(OperationKind::Deposit, &signer, receipt, value))
    }

    /// Unwraps `amount` SuperETH into native ETH on the active chain.
    ///
    /// The amount is converted with the contract's decimals read at call time.
    pub async fn withdraw(&self, amount: &TokenAmount) -> Result<OperationReceipt> {
        if !amount.is_positive() {
            return Err(AmountError::NotPositive(amount.to_string()).into());
        }
        self.require_connected()?;
        let guard = self.tracker.begin(OperationKind::Withdraw)?;
        guard.phase("Withdrawing...");
        match self.run_withdraw(amount).await {
            Ok(receipt) => {
                guard.succeed("Withdraw successful!");
                self.refresh_balances().await;
                Ok(receipt)
            }
            Err(e) => Err(guard.fail(e)),
        }
    }

    async fn run_withdraw(&self, amount: &TokenAmount) -> Result<OperationReceipt> {
        let signer = self.session.signer().await?;
        let contract = self.binding.bind(Some(&signer))?;
        let decimals = contract.decimals().await.map_err(|e| tx_failed("Reading decimals", e))?;
        let value = amount.to_base_units(decimals)?;
        debug!(%amount, decimals, %value, "withdraw amount converted");
        self.ensure_current(&signer)?;
        let pending = contract.withdraw(value).await.map_err(|e| tx_failed("Withdraw", e))?;
        let receipt = pending.confirm().await.map_err(|e| tx_failed("Withdraw", e))?;
        Ok(operation_receipt(OperationKind::Withdraw, &signer, receipt, value))
    }

    // ============================================================================
    // Bridge
    // ============================================================================

    /// Burns on the source chain, then mints the same base-unit amount to the
    /// recipient on the target chain.
    ///
    /// Failures before the burn confirms leave funds untouched. Anything that
    /// stops the mint afterwards is reported as [`FreyaError::PostBurnStuck`].
    pub async fn bridge(&self, request: &TransferRequest) -> Result<BridgeReceipt> {
        if !request.amount.is_positive() {
            return Err(AmountError::NotPositive(request.amount.to_string()).into());
        }
        let recipient = parse_recipient(&request.recipient)?;
        let source = self.registry.require(&request.source_chain)?;
        let target = self.registry.require(&request.target_chain)?;
        self.require_connected()?;

        let guard = self.tracker.begin(OperationKind::Bridge)?;
        guard.phase("Starting bridging operation...");
        info!(
            source = source.id(),
            target = target.id(),
            %recipient,
            amount = %request.amount,
            "bridge requested"
        );
        match self.run_bridge(&guard, &request.amount, source, target, recipient).await {
            Ok(receipt) => {
                guard.succeed("Bridge successful!");
                self.refresh_balances().await;
                Ok(receipt)
            }
            Err(e) => Err(guard.fail(e)),
        }
    }

    async fn run_bridge(
        &self,
        guard: &OperationGuard<'_>,
        amount: &TokenAmount,
        source: &ChainDescriptor,
        target: &ChainDescriptor,
        recipient: Address,
    ) -> Result<BridgeReceipt> {
        guard.phase(format!("Switching to source chain {}...", source.name()));
        self.session.switch_chain(source).await?;

        guard.phase(format!("Burning on source chain {}...", source.name()));
        let (burn, converted) = self.burn_on_source(source, amount).await?;
        self.balances.mark_stale(source.numeric_id());
        guard.phase("Burn on source chain successful!");

        let stuck = StuckTransfer {
            source_chain: source.id().to_string(),
            target_chain: target.id().to_string(),
            recipient: recipient.to_checksum(None),
            amount: converted.to_string(),
            burn_tx: burn.tx_hash.to_string(),
            reason: String::new(),
        };
        guard.arm_post_burn(stuck.clone());

        let mint = self
            .mint_on_target(guard, target, recipient, converted)
            .await
            .map_err(|e| FreyaError::PostBurnStuck(Box::new(StuckTransfer { reason: e.to_string(), ..stuck })))?;

        Ok(BridgeReceipt {
            source_chain: source.numeric_id(),
            target_chain: target.numeric_id(),
            recipient,
            amount: converted,
            burn_tx: burn.tx_hash,
            mint_tx: mint.tx_hash,
        })
    }

    async fn burn_on_source(
        &self,
        source: &ChainDescriptor,
        amount: &TokenAmount,
    ) -> Result<(TxReceipt, U256)> {
        let signer = self.signer_on(source).await?;
        let contract = self.binding.bind(Some(&signer))?;
        let decimals = contract.decimals().await.map_err(|e| tx_failed("Reading decimals", e))?;
        let converted = amount.to_base_units(decimals)?;
        self.ensure_current(&signer)?;

        let pending = contract
            .crosschain_burn(signer.account(), converted)
            .await
            .map_err(|e| burn_failed(source, e))?;
        let tx_hash = pending.tx_hash();
        let receipt = pending.confirm().await.map_err(|e| match e {
            ContractError::Confirmation { .. } => FreyaError::TransactionFailed(format!(
                "Burn on {} could not be confirmed; check {tx_hash} before retrying: {e}",
                source.name()
            )),
            e => burn_failed(source, e),
        })?;
        info!(chain = source.id(), %tx_hash, %converted, "burn confirmed");
        Ok((receipt, converted))
    }

    async fn mint_on_target(
        &self,
        guard: &OperationGuard<'_>,
        target: &ChainDescriptor,
        recipient: Address,
        amount: U256,
    ) -> Result<TxReceipt> {
        guard.phase(format!("Switching to target chain {}...", target.name()));
        self.session.switch_chain(target).await?;

        guard.phase(format!("Minting on target chain {}...", target.name()));
        let signer = self.signer_on(target).await?;
        let contract = self.binding.bind(Some(&signer))?;
        let pending = contract
            .crosschain_mint(recipient, amount)
            .await
            .map_err(|e| tx_failed("Mint", e))?;
        let receipt = pending.confirm().await.map_err(|e| tx_failed("Mint", e))?;
        info!(chain = target.id(), tx_hash = %receipt.tx_hash, %recipient, "mint confirmed");
        guard.phase("Mint on target chain successful!");
        Ok(receipt)
    }

    /// Fresh signer, required to be on `chain`
    async fn signer_on(&self, chain: &ChainDescriptor) -> Result<SignerHandle> {
        let signer = self.session.signer().await?;
        if signer.chain_id() != chain.numeric_id() {
            return Err(FreyaError::SwitchRejected {
                chain: chain.id().to_string(),
                reason: format!("wallet moved to chain {:#x}", signer.chain_id()),
            });
        }
        Ok(signer)
    }

    /// Fails if the wallet changed chain or account since `signer` was derived
    fn ensure_current(&self, signer: &SignerHandle) -> Result<()> {
        if self.session.is_current(signer) {
            return Ok(());
        }
        let reason = match self.session.active_chain_id() {
            Some(chain_id) if chain_id != signer.chain_id() => {
                format!("wallet moved to chain {chain_id:#x} before the transaction was sent")
            }
            _ => "wallet account changed before the transaction was sent".to_string(),
        };
        Err(FreyaError::SwitchRejected { chain: format!("{:#x}", signer.chain_id()), reason })
    }

    fn require_connected(&self) -> Result<()> {
        if self.session.is_connected() {
            Ok(())
        } else {
            Err(FreyaError::NoSigner)
        }
    }

    // ============================================================================
    // Observation
    // ============================================================================

    /// Latest operation status
    pub fn status(&self) -> OperationStatus {
        self.tracker.status()
    }

    /// Live status updates
    pub fn subscribe(&self) -> watch::Receiver<OperationStatus> {
        self.tracker.subscribe()
    }

    /// Tracker state
    pub fn state(&self) -> OperationState {
        self.tracker.state()
    }

    /// Chain catalogue
    pub fn registry(&self) -> &ChainRegistry {
        &self.registry
    }

    /// Wallet session
    pub fn session(&self) -> &Arc<WalletSession> {
        &self.session
    }

    /// Balance cache
    pub fn balances(&self) -> &BalanceReader {
        &self.balances
    }

    /// Contract binding
    pub fn binding(&self) -> &ContractBinding {
        &self.binding
    }

    /// `(source, target)` hex ids used by [`request`](Self::request)
    pub fn default_route(&self) -> (&str, &str) {
        (&self.default_route.0, &self.default_route.1)
    }
}

fn default_route(registry: &ChainRegistry) -> (String, String) {
    let preferred = registry.find_chain("0x14913").zip(registry.find_chain("0xA8F3C"));
    let chains = registry.list_chains();
    let (source, target) = match preferred {
        Some(route) => route,
        None => match chains {
            [only] => (only, only),
            [first, second, ..] => (first, second),
            [] => return (String::new(), String::new()),
        },
    };
    (source.id().to_string(), target.id().to_string())
}

fn operation_receipt(
    kind: OperationKind,
    signer: &SignerHandle,
    receipt: TxReceipt,
    amount: U256,
) -> OperationReceipt {
    OperationReceipt {
        kind,
        chain_id: signer.chain_id(),
        account: signer.account(),
        tx_hash: receipt.tx_hash,
        amount,
        block_number: receipt.block_number,
    }
}

fn tx_failed(what: &str, err: ContractError) -> FreyaError {
    FreyaError::TransactionFailed(format!("{what} failed: {err}"))
}

fn burn_failed(source: &ChainDescriptor, err: ContractError) -> FreyaError {
    FreyaError::TransactionFailed(format!(
        "Burn failed on {} (likely not authorized); no funds were moved: {err}",
        source.name()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use freya_testing::EdgeCaseAddresses;

    #[test]
    fn test_parse_recipient_accepts_valid_forms() {
        let checksummed = parse_recipient(EdgeCaseAddresses::VALID).unwrap();
        let lower = parse_recipient(EdgeCaseAddresses::VALID_LOWERCASE).unwrap();
        assert_eq!(checksummed, lower);
        assert_eq!(parse_recipient(&format!(" {} ", EdgeCaseAddresses::VALID)).unwrap(), lower);
    }

    #[test]
    fn test_parse_recipient_rejects_invalid_forms() {
        for bad in EdgeCaseAddresses::invalid() {
            assert!(
                matches!(parse_recipient(bad), Err(FreyaError::InvalidInput(_))),
                "accepted {bad:?}"
            );
        }
    }

    #[test]
    fn test_default_route_prefers_base_to_optimism() {
        assert_eq!(
            default_route(&ChainRegistry::bundled()),
            ("0x14913".to_string(), "0xA8F3C".to_string())
        );
        let zora_only =
            ChainRegistry::new(vec![ChainDescriptor::new("0x7777777", "Zora", 0x7777777)]).unwrap();
        assert_eq!(default_route(&zora_only), ("0x7777777".to_string(), "0x7777777".to_string()));
    }

    #[test]
    fn test_burn_failure_message_says_nothing_moved() {
        let chain = ChainDescriptor::new("0x14913", "Base Sepolia", 0x14913);
        let err = burn_failed(
            &chain,
            ContractError::Submission { method: "crosschainBurn".into(), reason: "Unauthorized".into() },
        );
        let text = err.to_string();
        assert!(text.contains("Base Sepolia"));
        assert!(text.contains("likely not authorized"));
        assert!(text.contains("no funds were moved"));
        assert!(err.is_safely_retryable());
    }
}
