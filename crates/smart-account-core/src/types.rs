//! Core types for smart account operations
//!
//! This module defines the primitive building blocks shared by every encoder in
//! the crate: the recoverable ECDSA signature, sub-calls with their call type,
//! and the keccak/word helpers used by the hashing code.

use crate::{Error, Result};
use alloy_primitives::{Address, B256, Bytes, U256};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tiny_keccak::{Hasher, Keccak};

/// Recoverable ECDSA signature (r, s, recovery id)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    /// R component (32 bytes)
    pub r: [u8; 32],
    /// S component (32 bytes), always in low-S form when produced by this crate
    pub s: [u8; 32],
    /// Recovery ID / y parity (0 or 1)
    pub recovery_id: u8,
}

impl Signature {
    /// Create a new signature
    pub fn new(r: [u8; 32], s: [u8; 32], recovery_id: u8) -> Self {
        Self { r, s, recovery_id }
    }

    /// Parse a 65-byte `r || s || v` signature, accepting v as 0/1 or 27/28
    pub fn from_rsv(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != 65 {
            return Err(Error::InvalidSignature(format!(
                "expected 65 bytes, got {}",
                bytes.len()
            )));
        }
        let recovery_id = match bytes[64] {
            0 | 27 => 0,
            1 | 28 => 1,
            v => return Err(Error::InvalidSignature(format!("invalid v value {}", v))),
        };

        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&bytes[..32]);
        s.copy_from_slice(&bytes[32..64]);
        Ok(Self { r, s, recovery_id })
    }

    /// Convert to bytes (r || s)
    pub fn to_bytes(&self) -> [u8; 64] {
        let mut bytes = [0u8; 64];
        bytes[..32].copy_from_slice(&self.r);
        bytes[32..].copy_from_slice(&self.s);
        bytes
    }

    /// Convert to the 65-byte `r || s || v` form with v = 27/28
    pub fn to_rsv(&self) -> [u8; 65] {
        let mut bytes = [0u8; 65];
        bytes[..32].copy_from_slice(&self.r);
        bytes[32..64].copy_from_slice(&self.s);
        bytes[64] = self.v();
        bytes
    }

    /// Get v value for legacy Ethereum signatures
    pub fn v(&self) -> u8 {
        self.recovery_id + 27
    }

    /// R as an integer
    pub fn r_u256(&self) -> U256 {
        U256::from_be_bytes(self.r)
    }

    /// S as an integer
    pub fn s_u256(&self) -> U256 {
        U256::from_be_bytes(self.s)
    }
}

/// How a sub-call is dispatched by the executing account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallType {
    /// Regular CALL
    #[default]
    Call,
    /// DELEGATECALL in the context of the account
    DelegateCall,
}

impl CallType {
    /// The operation flag used on-chain (0 = call, 1 = delegate call)
    pub fn as_u8(&self) -> u8 {
        match self {
            CallType::Call => 0,
            CallType::DelegateCall => 1,
        }
    }
}

impl fmt::Display for CallType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallType::Call => write!(f, "call"),
            CallType::DelegateCall => write!(f, "delegatecall"),
        }
    }
}

/// A single call executed by an account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubCall {
    /// Target contract or recipient
    pub to: Address,
    /// Native value in wei
    pub value: U256,
    /// Call data
    pub data: Bytes,
    /// Call type flag
    #[serde(default)]
    pub call_type: CallType,
}

impl SubCall {
    /// Create a regular call
    pub fn call(to: Address, value: U256, data: impl Into<Bytes>) -> Self {
        Self {
            to,
            value,
            data: data.into(),
            call_type: CallType::Call,
        }
    }

    /// Create a delegate call (never carries value)
    pub fn delegate_call(to: Address, data: impl Into<Bytes>) -> Self {
        Self {
            to,
            value: U256::ZERO,
            data: data.into(),
            call_type: CallType::DelegateCall,
        }
    }

    /// Create a plain value transfer
    pub fn transfer(to: Address, value: U256) -> Self {
        Self::call(to, value, Bytes::new())
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Keccak-256 of arbitrary bytes
pub fn keccak256(data: impl AsRef<[u8]>) -> B256 {
    let mut hasher = Keccak::v256();
    hasher.update(data.as_ref());
    let mut hash = [0u8; 32];
    hasher.finalize(&mut hash);
    B256::from(hash)
}

/// Keccak-256 over several slices without concatenating them first
pub fn keccak256_concat(parts: &[&[u8]]) -> B256 {
    let mut hasher = Keccak::v256();
    for part in parts {
        hasher.update(part);
    }
    let mut hash = [0u8; 32];
    hasher.finalize(&mut hash);
    B256::from(hash)
}

/// Left-pad an address to a 32-byte word
pub fn address_word(address: &Address) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[12..].copy_from_slice(address.as_slice());
    word
}

/// Big-endian 32-byte word of an integer
pub fn uint_word(value: U256) -> [u8; 32] {
    value.to_be_bytes::<32>()
}

/// Convert a raw byte field to an address, rejecting anything but 20 bytes
pub fn address_from_bytes(bytes: &[u8]) -> Result<Address> {
    if bytes.len() != 20 {
        return Err(Error::InvalidAddressLength(bytes.len()));
    }
    Ok(Address::from_slice(bytes))
}

/// Parse a hex address string (with or without checksum)
pub fn parse_address(s: &str) -> Result<Address> {
    Address::from_str(s).map_err(|e| Error::InvalidAddress(format!("{}: {}", s, e)))
}

/// Parse `0x`-prefixed (or bare) hex into bytes
pub fn parse_hex(s: &str) -> Result<Vec<u8>> {
    let s = s.strip_prefix("0x").unwrap_or(s);
    Ok(hex::decode(s)?)
}

/// Narrow a 256-bit integer into a u64 field
pub fn u256_to_u64(value: U256, field: &str) -> Result<u64> {
    u64::try_from(value)
        .map_err(|_| Error::OutOfRange(format!("{} {} does not fit in 64 bits", field, value)))
}

/// Narrow a 256-bit integer into a u128 field
pub fn u256_to_u128(value: U256, field: &str) -> Result<u128> {
    u128::try_from(value)
        .map_err(|_| Error::OutOfRange(format!("{} {} does not fit in 128 bits", field, value)))
}

pub(crate) mod bytes_hex {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format!("0x{}", hex::encode(bytes)))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let s = s.strip_prefix("0x").unwrap_or(&s);
        hex::decode(s).map_err(serde::de::Error::custom)
    }
}
