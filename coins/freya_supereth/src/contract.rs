//! SuperETH contract interface.
//!
//! An ERC-20 that wraps native ETH (`deposit`/`withdraw`) and implements the
//! ERC-7802 cross-chain mint/burn pair. The same address is used on every
//! supported chain.

use alloy::primitives::{address, Address};
use alloy::sol;

/// Address SuperETH is deployed at on every supported chain
pub const SUPERETH_ADDRESS: Address = address!("E55A698143bbb447F09b2628aAfE04991B764067");

sol! {
    #[sol(rpc)]
    #[allow(missing_docs)]
    contract SuperETH {
        event Deposited(address indexed user, uint256 amount);
        event Withdrawn(address indexed user, uint256 amount);
        event CrosschainMinted(address indexed to, uint256 amount);
        event CrosschainBurned(address indexed from, uint256 amount);

        function name() external view returns (string);
        function symbol() external view returns (string);
        function decimals() external view returns (uint8);
        function totalSupply() external view returns (uint256);
        function balanceOf(address account) external view returns (uint256);
        function transfer(address to, uint256 amount) external returns (bool);

        function deposit() external payable;
        function withdraw(uint256 amount) external;
        function crosschainMint(address to, uint256 amount) external;
        function crosschainBurn(address from, uint256 amount) external;
    }
}
