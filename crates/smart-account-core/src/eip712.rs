//! EIP-712 structured-data hashing primitives
//!
//! `hash = keccak256(0x19 || 0x01 || domainSeparator || structHash)`

use crate::abi::{AbiType, AbiValue, encode_params};
use crate::types::{address_word, keccak256, keccak256_concat, uint_word};
use crate::{Error, Result};
use alloy_primitives::{Address, B256, U256};
use serde::{Deserialize, Serialize};

/// Domain type with only chain id and verifying contract (Safe modules)
pub const DOMAIN_CHAIN_CONTRACT: &str = "EIP712Domain(uint256 chainId,address verifyingContract)";

/// Domain type with name and version (EntryPoint v0.8)
pub const DOMAIN_FULL: &str =
    "EIP712Domain(string name,string version,uint256 chainId,address verifyingContract)";

/// Largest value a `uint48` timestamp can hold
pub const MAX_UINT48: u64 = (1 << 48) - 1;

/// Type hash of an EIP-712 type string
pub fn type_hash(type_string: &str) -> B256 {
    keccak256(type_string.as_bytes())
}

/// Domain separator over `(chainId, verifyingContract)`
pub fn domain_separator(chain_id: U256, verifying_contract: Address) -> B256 {
    keccak256_concat(&[
        type_hash(DOMAIN_CHAIN_CONTRACT).as_slice(),
        uint_word(chain_id).as_slice(),
        address_word(&verifying_contract).as_slice(),
    ])
}

/// Domain separator over `(name, version, chainId, verifyingContract)`
pub fn named_domain_separator(
    name: &str,
    version: &str,
    chain_id: U256,
    verifying_contract: Address,
) -> B256 {
    keccak256_concat(&[
        type_hash(DOMAIN_FULL).as_slice(),
        keccak256(name.as_bytes()).as_slice(),
        keccak256(version.as_bytes()).as_slice(),
        uint_word(chain_id).as_slice(),
        address_word(&verifying_contract).as_slice(),
    ])
}

/// Final digest signed by the owners
pub fn typed_data_hash(domain_separator: &B256, struct_hash: &B256) -> B256 {
    keccak256_concat(&[
        [0x19u8, 0x01].as_slice(),
        domain_separator.as_slice(),
        struct_hash.as_slice(),
    ])
}

/// Hashed dynamic member, encoded as a `bytes32` word
pub fn hash_word(hash: B256) -> AbiValue {
    AbiValue::FixedBytes(hash.to_vec())
}

/// Encode a typed struct: type hash followed by each typed member
pub fn encode_struct(type_string: &str, types: &[AbiType], values: &[AbiValue]) -> Result<B256> {
    let mut all_types = vec![AbiType::FixedBytes(32)];
    all_types.extend_from_slice(types);
    let mut all_values = vec![hash_word(type_hash(type_string))];
    all_values.extend_from_slice(values);
    Ok(keccak256(encode_params(&all_types, &all_values)?))
}

// ============================================================================
// Validity Window
// ============================================================================

/// Time bounds folded into module-signed operations (`0/0` = always valid)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "WindowBounds")]
pub struct ValidityWindow {
    valid_after: u64,
    valid_until: u64,
}

/// Unchecked wire form; deserialization goes through [`ValidityWindow::new`]
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WindowBounds {
    valid_after: u64,
    valid_until: u64,
}

impl TryFrom<WindowBounds> for ValidityWindow {
    type Error = Error;

    fn try_from(bounds: WindowBounds) -> Result<Self> {
        Self::new(bounds.valid_after, bounds.valid_until)
    }
}

impl ValidityWindow {
    /// Create a window, rejecting bounds wider than 48 bits
    pub fn new(valid_after: u64, valid_until: u64) -> Result<Self> {
        for (name, value) in [("validAfter", valid_after), ("validUntil", valid_until)] {
            if value > MAX_UINT48 {
                return Err(Error::OutOfRange(format!(
                    "{} {} exceeds uint48",
                    name, value
                )));
            }
        }
        Ok(Self {
            valid_after,
            valid_until,
        })
    }

    /// Create a window from signed timestamps, rejecting negative bounds
    pub fn from_signed(valid_after: i64, valid_until: i64) -> Result<Self> {
        let after = u64::try_from(valid_after)
            .map_err(|_| Error::OutOfRange(format!("negative validAfter {}", valid_after)))?;
        let until = u64::try_from(valid_until)
            .map_err(|_| Error::OutOfRange(format!("negative validUntil {}", valid_until)))?;
        Self::new(after, until)
    }

    /// Window that is always valid
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Not valid before this unix timestamp
    pub fn valid_after(&self) -> u64 {
        self.valid_after
    }

    /// Not valid after this unix timestamp (0 = no expiry)
    pub fn valid_until(&self) -> u64 {
        self.valid_until
    }

    /// `uint48 validAfter || uint48 validUntil` (12 bytes)
    pub fn to_packed(&self) -> [u8; 12] {
        let mut out = [0u8; 12];
        out[..6].copy_from_slice(&self.valid_after.to_be_bytes()[2..]);
        out[6..].copy_from_slice(&self.valid_until.to_be_bytes()[2..]);
        out
    }
}
