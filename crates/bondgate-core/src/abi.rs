//! ABI fragments for the two contract surfaces this client consumes.
//!
//! Calls are encoded with the generated [`SolCall`] types and dispatched as
//! raw calldata through the chain gateway; nothing here owns a provider.
//!
//! [`SolCall`]: alloy::sol_types::SolCall

use crate::error::MarketError;

/// Minimal ERC-20 surface: metadata, balances and spender authorization
pub mod erc20 {
    alloy::sol! {
        function decimals() external view returns (uint8);
        function symbol() external view returns (string);
        function balanceOf(address account) external view returns (uint256);
        function allowance(address owner, address spender) external view returns (uint256);
        function approve(address spender, uint256 amount) external returns (bool);
    }
}

/// Mint Club V2 bond surface: curve reads, mint/burn and token creation
pub mod bond {
    alloy::sol! {
        struct TokenParams {
            string name;
            string symbol;
        }

        struct BondParams {
            uint16 mintRoyalty;
            uint16 burnRoyalty;
            address reserveToken;
            uint128 maxSupply;
            uint128[] stepRanges;
            uint128[] stepPrices;
        }

        struct BondStep {
            uint128 rangeTo;
            uint128 price;
        }

        function creationFee() external view returns (uint256);
        function exists(address token) external view returns (bool);
        function getSteps(address token) external view returns (BondStep[] memory);
        function maxSupply(address token) external view returns (uint128);
        function priceForNextMint(address token) external view returns (uint128);
        function getReserveForToken(address token, uint256 tokensToMint)
            external view returns (uint256 reserveAmount, uint256 royalty);
        function getRefundForTokens(address token, uint256 tokensToBurn)
            external view returns (uint256 refundAmount, uint256 royalty);
        function mint(address token, uint256 tokensToMint, uint256 maxReserveAmount, address receiver)
            external returns (uint256);
        function burn(address token, uint256 tokensToBurn, uint256 minRefund, address receiver)
            external returns (uint256);
        function createToken(TokenParams tp, BondParams bp) external payable returns (address);
    }
}

/// Map an ABI decode failure on a read result to a contract-read error
pub fn decode_err(e: alloy::sol_types::Error) -> MarketError {
    MarketError::ContractRead(format!("response decode failed: {e}"))
}
