use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Regex for validating EVM wallet addresses
    /// `0x` followed by exactly 40 hex digits, either case
    /// - Valid: "0x742d35Cc6634C0532925a3b844Bc454e4438f44e"
    /// - Invalid: "742d35...", "0x123", "0xZZ..."
    pub static ref WALLET_ADDRESS_REGEX: Regex = Regex::new(r"^0x[a-fA-F0-9]{40}$").unwrap();
}

pub fn is_valid_wallet_address(address: &str) -> bool {
    WALLET_ADDRESS_REGEX.is_match(address)
}
