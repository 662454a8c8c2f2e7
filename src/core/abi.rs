//! Minimal ERC-20 / WETH calldata codec.
//!
//! Only the handful of static-argument calls the bot issues are covered, so
//! words are packed by hand instead of pulling in a full ABI encoder.

use ethers::types::{Address, Bytes, U256};
use sha3::{Digest, Keccak256};

use crate::core::errors::BotError;

/// Compute the first 4 bytes (function selector) from a signature string, e.g. "transfer(address,uint256)".
pub fn selector_from_signature(signature: &str) -> [u8; 4] {
    let mut keccak = Keccak256::new();
    keccak.update(signature.as_bytes());
    let out = keccak.finalize();
    [out[0], out[1], out[2], out[3]]
}

/// Left-pad an address into a 32-byte ABI word.
pub fn abi_word_address(addr: Address) -> [u8; 32] {
    let mut out = [0u8; 32];
    out[12..].copy_from_slice(addr.as_bytes());
    out
}

/// Encode a uint256 as a 32-byte big-endian ABI word.
pub fn abi_word_uint256(value: U256) -> [u8; 32] {
    let mut out = [0u8; 32];
    value.to_big_endian(&mut out);
    out
}

/// Pack a selector and ABI words contiguously into calldata.
pub fn abi_pack(selector: [u8; 4], words: &[[u8; 32]]) -> Bytes {
    let mut out = Vec::with_capacity(4 + 32 * words.len());
    out.extend_from_slice(&selector);
    for w in words {
        out.extend_from_slice(w);
    }
    Bytes::from(out)
}

pub fn encode_balance_of(owner: Address) -> Bytes {
    abi_pack(selector_from_signature("balanceOf(address)"), &[abi_word_address(owner)])
}

pub fn encode_decimals() -> Bytes {
    abi_pack(selector_from_signature("decimals()"), &[])
}

pub fn encode_allowance(owner: Address, spender: Address) -> Bytes {
    abi_pack(
        selector_from_signature("allowance(address,address)"),
        &[abi_word_address(owner), abi_word_address(spender)],
    )
}

pub fn encode_approve(spender: Address, amount: U256) -> Bytes {
    abi_pack(
        selector_from_signature("approve(address,uint256)"),
        &[abi_word_address(spender), abi_word_uint256(amount)],
    )
}

pub fn encode_transfer(to: Address, amount: U256) -> Bytes {
    abi_pack(
        selector_from_signature("transfer(address,uint256)"),
        &[abi_word_address(to), abi_word_uint256(amount)],
    )
}

/// WETH `deposit()`; the amount to wrap travels as the call value.
pub fn encode_weth_deposit() -> Bytes {
    abi_pack(selector_from_signature("deposit()"), &[])
}

/// Decode the first return word as uint256.
pub fn decode_uint256(data: &[u8]) -> Result<U256, BotError> {
    if data.len() < 32 {
        return Err(BotError::Blockchain(format!(
            "Expected a 32-byte return word, got {} bytes",
            data.len()
        )));
    }
    Ok(U256::from_big_endian(&data[..32]))
}

/// Decode an ERC-20 `decimals()` return value.
pub fn decode_decimals(data: &[u8]) -> Result<u8, BotError> {
    let word = decode_uint256(data)?;
    if word > U256::from(u8::MAX) {
        return Err(BotError::Blockchain(format!("decimals() out of range: {}", word)));
    }
    Ok(word.as_u32() as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector_from_signature() {
        assert_eq!(selector_from_signature("transfer(address,uint256)"), [0xa9, 0x05, 0x9c, 0xbb]);
        assert_eq!(selector_from_signature("approve(address,uint256)"), [0x09, 0x5e, 0xa7, 0xb3]);
        assert_eq!(selector_from_signature("balanceOf(address)"), [0x70, 0xa0, 0x82, 0x31]);
        assert_eq!(selector_from_signature("deposit()"), [0xd0, 0xe3, 0x0d, 0xb0]);
    }

    #[test]
    fn test_abi_word_address_padding() {
        let addr: Address = "0x1111111111111111111111111111111111111111".parse().unwrap();
        let word = abi_word_address(addr);
        assert!(word[..12].iter().all(|&b| b == 0));
        assert!(word[12..].iter().all(|&b| b == 0x11));
    }

    #[test]
    fn test_approve_layout() {
        let spender: Address = "0x2222222222222222222222222222222222222222".parse().unwrap();
        let data = encode_approve(spender, U256::MAX);
        assert_eq!(data.len(), 4 + 64);
        assert_eq!(&data[0..4], &[0x09, 0x5e, 0xa7, 0xb3]);
        assert_eq!(&data[16..36], spender.as_bytes());
        assert!(data[36..68].iter().all(|&b| b == 0xff));
    }

    #[test]
    fn test_decode_uint256_and_decimals() {
        let mut word = [0u8; 32];
        word[31] = 6;
        assert_eq!(decode_uint256(&word).unwrap(), U256::from(6));
        assert_eq!(decode_decimals(&word).unwrap(), 6);
        assert!(decode_uint256(&word[..10]).is_err());
        word[0] = 1;
        assert!(decode_decimals(&word).is_err());
    }
}
