//! The slice of the Crypto Devs ABI the page touches.
//!
//! Every function takes no arguments, so call data is the bare selector and
//! each return value is a single 32-byte word.

use alloy_primitives::{Address, U256, keccak256};
use cd_chain_client::DappError;

pub const OWNER: &str = "owner()";
pub const PRESALE_STARTED: &str = "preSaleStarted()";
/// Despite the name this returns the presale end timestamp.
pub const PRESALE_ENDED: &str = "preSaleEnded()";
pub const TOKEN_IDS: &str = "tokenIds()";
pub const START_PRESALE: &str = "startPresale()";
pub const PRESALE_MINT: &str = "preSaleMint()";
pub const MINT: &str = "mint()";

pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    let mut out = [0_u8; 4];
    out.copy_from_slice(&hash[..4]);
    out
}

pub fn encode_call(signature: &str) -> Vec<u8> {
    selector(signature).to_vec()
}

fn first_word(data: &[u8]) -> Result<&[u8], DappError> {
    if data.len() < 32 {
        return Err(DappError::Rpc(format!(
            "return data too short: {} bytes",
            data.len()
        )));
    }
    Ok(&data[..32])
}

pub fn decode_uint(data: &[u8]) -> Result<U256, DappError> {
    Ok(U256::from_be_slice(first_word(data)?))
}

pub fn decode_bool(data: &[u8]) -> Result<bool, DappError> {
    let value = decode_uint(data)?;
    if value == U256::ZERO {
        Ok(false)
    } else if value == U256::from(1_u8) {
        Ok(true)
    } else {
        Err(DappError::Rpc(format!("not a bool word: {value}")))
    }
}

pub fn decode_address(data: &[u8]) -> Result<Address, DappError> {
    let word = first_word(data)?;
    if word[..12].iter().any(|byte| *byte != 0) {
        return Err(DappError::Rpc("address word has dirty high bytes".to_owned()));
    }
    Ok(Address::from_slice(&word[12..]))
}

pub fn uint_word(value: U256) -> Vec<u8> {
    value.to_be_bytes::<32>().to_vec()
}

pub fn bool_word(value: bool) -> Vec<u8> {
    uint_word(U256::from(u8::from(value)))
}

pub fn address_word(address: Address) -> Vec<u8> {
    let mut word = vec![0_u8; 12];
    word.extend_from_slice(address.as_slice());
    word
}
