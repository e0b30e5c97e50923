//! # Contract ABI Codec
//!
//! Head/tail ABI encoding for the fixed vocabulary of parameter shapes the
//! account contracts use: addresses, unsigned integers, booleans, fixed and
//! dynamic byte strings, arrays and tuples.
//!
//! Static values are written inline as 32-byte words. Dynamic values (`bytes`,
//! `T[]`, and any tuple or fixed array containing one) write an offset word in
//! the head and their content in the tail; offsets are relative to the start of
//! the enclosing parameter block.
//!
//! Values are validated against their declared types before anything is
//! encoded, so a malformed parameter list never produces partial output.
//!
//! ```rust,ignore
//! use smart_account_core::abi::{encode_call, AbiType, AbiValue};
//!
//! let data = encode_call(
//!     "transfer",
//!     &[AbiType::Address, AbiType::uint256()],
//!     &[AbiValue::Address(recipient), AbiValue::Uint(amount)],
//! )?;
//! ```

use crate::types::{address_word, keccak256};
use crate::{Error, Result};
use alloy_primitives::{Address, U256};

/// Size of an ABI word
pub const WORD: usize = 32;

/// Parameter type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbiType {
    /// `address`
    Address,
    /// `uint<N>`, N in 8..=256 and a multiple of 8
    Uint(usize),
    /// `bool`
    Bool,
    /// `bytes`
    Bytes,
    /// `bytes<N>`, N in 1..=32
    FixedBytes(usize),
    /// `T[]`
    Array(Box<AbiType>),
    /// `T[N]`
    FixedArray(Box<AbiType>, usize),
    /// `(T1,T2,...)`
    Tuple(Vec<AbiType>),
}

impl AbiType {
    /// `uint256`
    pub fn uint256() -> Self {
        AbiType::Uint(256)
    }

    /// `T[]`
    pub fn array(inner: AbiType) -> Self {
        AbiType::Array(Box::new(inner))
    }

    /// `T[N]`
    pub fn fixed_array(inner: AbiType, len: usize) -> Self {
        AbiType::FixedArray(Box::new(inner), len)
    }

    /// Canonical type string used in function signatures
    pub fn canonical(&self) -> String {
        match self {
            AbiType::Address => "address".to_string(),
            AbiType::Uint(bits) => format!("uint{}", bits),
            AbiType::Bool => "bool".to_string(),
            AbiType::Bytes => "bytes".to_string(),
            AbiType::FixedBytes(n) => format!("bytes{}", n),
            AbiType::Array(inner) => format!("{}[]", inner.canonical()),
            AbiType::FixedArray(inner, n) => format!("{}[{}]", inner.canonical(), n),
            AbiType::Tuple(types) => format!("({})", canonical_list(types)),
        }
    }

    /// Whether the encoding of this type goes to the tail
    pub fn is_dynamic(&self) -> bool {
        match self {
            AbiType::Bytes | AbiType::Array(_) => true,
            AbiType::FixedArray(inner, _) => inner.is_dynamic(),
            AbiType::Tuple(types) => types.iter().any(AbiType::is_dynamic),
            _ => false,
        }
    }

    /// Bytes this type occupies in the head
    fn head_size(&self) -> usize {
        if self.is_dynamic() {
            return WORD;
        }
        match self {
            AbiType::FixedArray(inner, n) => inner.head_size() * n,
            AbiType::Tuple(types) => types.iter().map(AbiType::head_size).sum(),
            _ => WORD,
        }
    }
}

/// Parameter value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbiValue {
    Address(Address),
    Uint(U256),
    Bool(bool),
    Bytes(Vec<u8>),
    FixedBytes(Vec<u8>),
    Array(Vec<AbiValue>),
    FixedArray(Vec<AbiValue>),
    Tuple(Vec<AbiValue>),
}

impl AbiValue {
    /// Unsigned value from a possibly-negative integer
    pub fn uint_from_i128(value: i128) -> Result<Self> {
        if value < 0 {
            return Err(Error::OutOfRange(format!(
                "negative value {} for unsigned parameter",
                value
            )));
        }
        Ok(AbiValue::Uint(U256::from(value as u128)))
    }

    /// Unsigned value from a u64
    pub fn uint(value: u64) -> Self {
        AbiValue::Uint(U256::from(value))
    }

    /// Array of addresses
    pub fn address_array(addresses: &[Address]) -> Self {
        AbiValue::Array(addresses.iter().copied().map(AbiValue::Address).collect())
    }

    fn kind(&self) -> &'static str {
        match self {
            AbiValue::Address(_) => "address",
            AbiValue::Uint(_) => "uint",
            AbiValue::Bool(_) => "bool",
            AbiValue::Bytes(_) => "bytes",
            AbiValue::FixedBytes(_) => "fixed bytes",
            AbiValue::Array(_) => "array",
            AbiValue::FixedArray(_) => "fixed array",
            AbiValue::Tuple(_) => "tuple",
        }
    }
}

// ============================================================================
// Public API
// ============================================================================

/// Function selector: first four bytes of keccak256 of the signature
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    let mut out = [0u8; 4];
    out.copy_from_slice(&hash[..4]);
    out
}

/// Canonical function signature, e.g. `execute(address,uint256,bytes)`
pub fn function_signature(name: &str, types: &[AbiType]) -> String {
    format!("{}({})", name, canonical_list(types))
}

/// ABI-encode a parameter block
pub fn encode_params(types: &[AbiType], values: &[AbiValue]) -> Result<Vec<u8>> {
    if types.len() != values.len() {
        return Err(Error::ParameterCount {
            expected: types.len(),
            actual: values.len(),
        });
    }
    for (ty, value) in types.iter().zip(values) {
        check(ty, value)?;
    }
    encode_sequence(types.iter().zip(values))
}

/// Selector of `name(types...)` followed by the encoded parameters
pub fn encode_call(name: &str, types: &[AbiType], values: &[AbiValue]) -> Result<Vec<u8>> {
    let signature = function_signature(name, types);
    let mut encoded = selector(&signature).to_vec();
    encoded.extend(encode_params(types, values)?);
    Ok(encoded)
}

/// Pad a byte string on the right to a word boundary
pub fn pad_right(data: &[u8]) -> Vec<u8> {
    let mut out = data.to_vec();
    let padding = (WORD - (data.len() % WORD)) % WORD;
    out.extend(std::iter::repeat_n(0u8, padding));
    out
}

// ============================================================================
// Validation
// ============================================================================

fn check(ty: &AbiType, value: &AbiValue) -> Result<()> {
    match (ty, value) {
        (AbiType::Address, AbiValue::Address(_)) => Ok(()),
        (AbiType::Bool, AbiValue::Bool(_)) => Ok(()),
        (AbiType::Bytes, AbiValue::Bytes(_)) => Ok(()),
        (AbiType::Uint(bits), AbiValue::Uint(v)) => {
            if *bits == 0 || *bits > 256 || bits % 8 != 0 {
                return Err(Error::TypeMismatch {
                    expected: "uint8..uint256".into(),
                    actual: format!("uint{}", bits),
                });
            }
            if *bits < 256 && v.bit_len() > *bits {
                return Err(Error::OutOfRange(format!(
                    "{} does not fit in uint{}",
                    v, bits
                )));
            }
            Ok(())
        }
        (AbiType::FixedBytes(n), AbiValue::FixedBytes(b)) => {
            if *n == 0 || *n > WORD || b.len() != *n {
                return Err(Error::TypeMismatch {
                    expected: format!("bytes{}", n),
                    actual: format!("{} bytes", b.len()),
                });
            }
            Ok(())
        }
        (AbiType::Array(inner), AbiValue::Array(items)) => {
            items.iter().try_for_each(|item| check(inner, item))
        }
        (AbiType::FixedArray(inner, n), AbiValue::FixedArray(items)) => {
            if items.len() != *n {
                return Err(Error::ParameterCount {
                    expected: *n,
                    actual: items.len(),
                });
            }
            items.iter().try_for_each(|item| check(inner, item))
        }
        (AbiType::Tuple(types), AbiValue::Tuple(items)) => {
            if types.len() != items.len() {
                return Err(Error::ParameterCount {
                    expected: types.len(),
                    actual: items.len(),
                });
            }
            types
                .iter()
                .zip(items)
                .try_for_each(|(ty, item)| check(ty, item))
        }
        (ty, value) => Err(Error::TypeMismatch {
            expected: ty.canonical(),
            actual: value.kind().to_string(),
        }),
    }
}

// ============================================================================
// Encoding (inputs already validated)
// ============================================================================

fn encode_sequence<'a>(
    items: impl Iterator<Item = (&'a AbiType, &'a AbiValue)> + Clone,
) -> Result<Vec<u8>> {
    let head_len: usize = items.clone().map(|(ty, _)| ty.head_size()).sum();

    let mut head = Vec::with_capacity(head_len);
    let mut tail = Vec::new();

    for (ty, value) in items {
        if ty.is_dynamic() {
            head.extend_from_slice(&usize_word(head_len + tail.len()));
            tail.extend(encode_value(ty, value)?);
        } else {
            head.extend(encode_value(ty, value)?);
        }
    }

    head.extend(tail);
    Ok(head)
}

fn encode_value(ty: &AbiType, value: &AbiValue) -> Result<Vec<u8>> {
    let encoded = match (ty, value) {
        (AbiType::Address, AbiValue::Address(a)) => address_word(a).to_vec(),
        (AbiType::Uint(_), AbiValue::Uint(v)) => v.to_be_bytes::<32>().to_vec(),
        (AbiType::Bool, AbiValue::Bool(b)) => usize_word(*b as usize).to_vec(),
        (AbiType::FixedBytes(_), AbiValue::FixedBytes(b)) => pad_right(b),
        (AbiType::Bytes, AbiValue::Bytes(b)) => {
            let mut out = usize_word(b.len()).to_vec();
            out.extend(pad_right(b));
            out
        }
        (AbiType::Array(inner), AbiValue::Array(items)) => {
            let mut out = usize_word(items.len()).to_vec();
            out.extend(encode_sequence(std::iter::repeat(inner.as_ref()).zip(items))?);
            out
        }
        (AbiType::FixedArray(inner, _), AbiValue::FixedArray(items)) => {
            encode_sequence(std::iter::repeat(inner.as_ref()).zip(items))?
        }
        (AbiType::Tuple(types), AbiValue::Tuple(items)) => encode_sequence(types.iter().zip(items))?,
        (ty, value) => {
            return Err(Error::TypeMismatch {
                expected: ty.canonical(),
                actual: value.kind().to_string(),
            });
        }
    };
    Ok(encoded)
}

fn usize_word(value: usize) -> [u8; 32] {
    U256::from(value).to_be_bytes::<32>()
}

fn canonical_list(types: &[AbiType]) -> String {
    types
        .iter()
        .map(AbiType::canonical)
        .collect::<Vec<_>>()
        .join(",")
}
