//! Catalogue of networks the bridged token is deployed on.

use std::collections::HashSet;

use freya_error::{FreyaError, Result};
use serde::{Deserialize, Serialize};

/// One supported network.
///
/// `id` is the hex chain id the wallet is asked to switch to; `numeric_id`
/// must be the same number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChainDescriptor {
    id: String,
    name: String,
    numeric_id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    rpc_url: Option<String>,
}

impl ChainDescriptor {
    /// Creates a descriptor without an RPC endpoint
    pub fn new(id: impl Into<String>, name: impl Into<String>, numeric_id: u64) -> Self {
        Self { id: id.into(), name: name.into(), numeric_id, rpc_url: None }
    }

    /// Attaches the JSON-RPC endpoint used by headless backends
    pub fn with_rpc_url(mut self, rpc_url: impl Into<String>) -> Self {
        self.rpc_url = Some(rpc_url.into());
        self
    }

    /// Hex chain id, e.g. `0x14913`
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Display name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Chain id as a number
    pub fn numeric_id(&self) -> u64 {
        self.numeric_id
    }

    /// JSON-RPC endpoint, if configured
    pub fn rpc_url(&self) -> Option<&str> {
        self.rpc_url.as_deref()
    }

    fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(FreyaError::Config(format!("chain {} has no name", self.id)));
        }
        match parse_hex_chain_id(&self.id) {
            Some(decoded) if decoded == self.numeric_id => Ok(()),
            Some(decoded) => Err(FreyaError::Config(format!(
                "chain {} ({}) declares numeric id {} but its hex id decodes to {}",
                self.name, self.id, self.numeric_id, decoded
            ))),
            None => Err(FreyaError::Config(format!(
                "chain {} has malformed hex id '{}'",
                self.name, self.id
            ))),
        }
    }
}

/// Parses a `0x`-prefixed hex chain id, case-insensitively.
pub fn parse_hex_chain_id(id: &str) -> Option<u64> {
    let id = id.trim();
    let digits = id.strip_prefix("0x").or_else(|| id.strip_prefix("0X"))?;
    if digits.is_empty() {
        return None;
    }
    u64::from_str_radix(digits, 16).ok()
}

/// Ordered, validated set of supported chains.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainRegistry {
    chains: Vec<ChainDescriptor>,
}

impl ChainRegistry {
    /// Builds a registry; fails on duplicates or hex/numeric mismatches
    pub fn new(chains: Vec<ChainDescriptor>) -> Result<Self> {
        if chains.is_empty() {
            return Err(FreyaError::Config("chain catalogue is empty".into()));
        }
        let mut seen = HashSet::new();
        for chain in &chains {
            chain.validate()?;
            if !seen.insert(chain.numeric_id) {
                return Err(FreyaError::Config(format!("chain {} is listed twice", chain.id)));
            }
        }
        Ok(Self { chains })
    }

    /// The networks SuperETH ships with
    pub fn bundled() -> Self {
        Self { chains: bundled_chains() }
    }

    /// All chains in display order
    pub fn list_chains(&self) -> &[ChainDescriptor] {
        &self.chains
    }

    /// Looks up a chain by hex id (case-insensitive)
    pub fn find_chain(&self, id: &str) -> Option<&ChainDescriptor> {
        parse_hex_chain_id(id).and_then(|numeric| self.find_by_numeric_id(numeric))
    }

    /// Looks up a chain by numeric id
    pub fn find_by_numeric_id(&self, numeric_id: u64) -> Option<&ChainDescriptor> {
        self.chains.iter().find(|chain| chain.numeric_id == numeric_id)
    }

    /// Like [`find_chain`](Self::find_chain) but fails with `UnsupportedChain`
    pub fn require(&self, id: &str) -> Result<&ChainDescriptor> {
        self.find_chain(id).ok_or_else(|| FreyaError::UnsupportedChain(id.to_string()))
    }

    /// Number of chains
    pub fn len(&self) -> usize {
        self.chains.len()
    }

    /// Always false for a constructed registry
    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }
}

impl Default for ChainRegistry {
    fn default() -> Self {
        Self::bundled()
    }
}

pub(crate) fn bundled_chains() -> Vec<ChainDescriptor> {
    vec![
        ChainDescriptor::new("0xA8F3C", "Optimism Sepolia", 0xA8F3C)
            .with_rpc_url("https://sepolia.optimism.io"),
        ChainDescriptor::new("0x14913", "Base Sepolia", 0x14913)
            .with_rpc_url("https://sepolia.base.org"),
        ChainDescriptor::new("0x7777777", "Zora", 0x7777777)
            .with_rpc_url("https://rpc.zora.energy"),
        ChainDescriptor::new("0x82", "Unichain", 0x82)
            .with_rpc_url("https://mainnet.unichain.org"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bundled_catalogue_order() {
        let registry = ChainRegistry::bundled();
        let names: Vec<&str> = registry.list_chains().iter().map(|c| c.name()).collect();
        assert_eq!(names, vec!["Optimism Sepolia", "Base Sepolia", "Zora", "Unichain"]);
    }

    #[test]
    fn test_bundled_catalogue_is_consistent() {
        let registry = ChainRegistry::bundled();
        assert_eq!(ChainRegistry::new(registry.list_chains().to_vec()), Ok(registry.clone()));
        assert_eq!(registry.find_chain("0x14913").map(|c| c.numeric_id()), Some(84243));
        assert_eq!(registry.find_chain("0xA8F3C").map(|c| c.numeric_id()), Some(692028));
        assert_eq!(registry.find_chain("0x7777777").map(|c| c.numeric_id()), Some(125269879));
        assert_eq!(registry.find_chain("0x82").map(|c| c.numeric_id()), Some(130));
    }

    #[test]
    fn test_find_chain_is_case_insensitive() {
        let registry = ChainRegistry::bundled();
        assert_eq!(registry.find_chain("0xa8f3c").map(|c| c.name()), Some("Optimism Sepolia"));
        assert_eq!(registry.find_chain("0XA8F3C").map(|c| c.name()), Some("Optimism Sepolia"));
        assert!(registry.find_chain("0x1").is_none());
        assert!(registry.find_chain("84243").is_none());
        assert!(registry.find_chain("").is_none());
    }

    #[test]
    fn test_require_unknown_chain() {
        let registry = ChainRegistry::bundled();
        assert_eq!(
            registry.require("0x1").err(),
            Some(FreyaError::UnsupportedChain("0x1".into()))
        );
    }

    #[test]
    fn test_rejects_mismatched_numeric_id() {
        // Decimal id that does not match its hex id
        let err = ChainRegistry::new(vec![ChainDescriptor::new("0x7777777", "Zora", 7777777)]);
        assert!(matches!(err, Err(FreyaError::Config(_))));
    }

    #[test]
    fn test_rejects_duplicates_and_empty() {
        let chain = ChainDescriptor::new("0x82", "Unichain", 130);
        assert!(ChainRegistry::new(vec![chain.clone(), chain]).is_err());
        assert!(ChainRegistry::new(vec![]).is_err());
        assert!(ChainRegistry::new(vec![ChainDescriptor::new("82", "Unichain", 130)]).is_err());
    }

    #[test]
    fn test_parse_hex_chain_id() {
        assert_eq!(parse_hex_chain_id(" 0x82 "), Some(130));
        assert_eq!(parse_hex_chain_id("0x"), None);
        assert_eq!(parse_hex_chain_id("0xzz"), None);
        assert_eq!(parse_hex_chain_id("130"), None);
    }
}
