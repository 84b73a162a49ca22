//! Configuration

use std::path::Path;
use std::str::FromStr;

use alloy::primitives::Address;
use freya_error::{FreyaError, Result};
use serde::{Deserialize, Serialize};

use crate::registry::{bundled_chains, ChainDescriptor, ChainRegistry};

/// Environment variable naming a JSON config file
pub const CONFIG_ENV: &str = "FREYA_CONFIG";

/// SuperETH address on every bundled chain
pub const DEFAULT_CONTRACT_ADDRESS: &str = "0xE55A698143bbb447F09b2628aAfE04991B764067";

/// Contract address, chain catalogue and default bridge route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreyaConfig {
    /// SuperETH address (same on every chain)
    pub contract_address: String,
    /// Supported chains in display order
    pub chains: Vec<ChainDescriptor>,
    /// Hex id preselected as the bridge source
    #[serde(default = "default_source")]
    pub default_source: String,
    /// Hex id preselected as the bridge target
    #[serde(default = "default_target")]
    pub default_target: String,
}

fn default_source() -> String {
    "0x14913".to_string()
}

fn default_target() -> String {
    "0xA8F3C".to_string()
}

impl Default for FreyaConfig {
    fn default() -> Self {
        Self {
            contract_address: DEFAULT_CONTRACT_ADDRESS.to_string(),
            chains: bundled_chains(),
            default_source: default_source(),
            default_target: default_target(),
        }
    }
}

impl FreyaConfig {
    /// Reads the file named by `FREYA_CONFIG`, or returns the bundled defaults
    pub fn load() -> Result<Self> {
        match std::env::var(CONFIG_ENV) {
            Ok(path) if !path.trim().is_empty() => Self::from_file(path.trim()),
            _ => Ok(Self::default()),
        }
    }

    /// Reads and validates a JSON config file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| FreyaError::Config(format!("reading {}: {e}", path.display())))?;
        let config: Self = serde_json::from_str(&json)
            .map_err(|e| FreyaError::Config(format!("parsing {}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Writes the config as pretty-printed JSON
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| FreyaError::Config(e.to_string()))?;
        std::fs::write(path, json)
            .map_err(|e| FreyaError::Config(format!("writing {}: {e}", path.display())))
    }

    /// Checks the address, the catalogue and the default route
    pub fn validate(&self) -> Result<()> {
        self.contract_address()?;
        let registry = self.registry()?;
        for id in [&self.default_source, &self.default_target] {
            if registry.find_chain(id).is_none() {
                return Err(FreyaError::Config(format!("default route names unknown chain {id}")));
            }
        }
        Ok(())
    }

    /// Parsed contract address
    pub fn contract_address(&self) -> Result<Address> {
        Address::from_str(self.contract_address.trim()).map_err(|e| {
            FreyaError::Config(format!("contract address '{}': {e}", self.contract_address))
        })
    }

    /// Validated chain registry
    pub fn registry(&self) -> Result<ChainRegistry> {
        ChainRegistry::new(self.chains.clone())
    }

    /// `(numeric id, rpc url)` for every chain with an endpoint
    pub fn endpoints(&self) -> Vec<(u64, String)> {
        self.chains
            .iter()
            .filter_map(|chain| chain.rpc_url().map(|url| (chain.numeric_id(), url.to_string())))
            .collect()
    }
}
