//! Identifier validation for query parameters.

use candid::Principal;

/// Solana public keys are 32 bytes.
const SOLANA_KEY_LEN: usize = 32;

/// `true` if `text` is a well-formed principal, checksum included.
pub fn is_valid_principal(text: &str) -> bool {
    Principal::from_text(text).is_ok()
}

/// `true` if `address` is base58 that decodes to a 32-byte public key.
pub fn is_valid_solana_address(address: &str) -> bool {
    bs58::decode(address)
        .into_vec()
        .is_ok_and(|bytes| bytes.len() == SOLANA_KEY_LEN)
}
