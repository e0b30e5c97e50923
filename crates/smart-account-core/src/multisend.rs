//! MultiSend batch encoding
//!
//! The MultiSend contract expects transactions to be tightly packed, one after
//! another, with no word alignment:
//! - operation: 1 byte (0 = Call, 1 = DelegateCall)
//! - to: 20 bytes
//! - value: 32 bytes
//! - data length: 32 bytes
//! - data: variable length

use crate::abi::{AbiType, AbiValue, encode_call};
use crate::types::SubCall;
use crate::Result;
use alloy_primitives::{Address, U256};

/// Fixed header size of one packed entry
pub const ENTRY_HEADER_LEN: usize = 1 + 20 + 32 + 32;

/// Encodes a single sub-call in MultiSend packed format
pub fn encode_transaction(call: &SubCall) -> Vec<u8> {
    let mut encoded = Vec::with_capacity(ENTRY_HEADER_LEN + call.data.len());

    encoded.push(call.call_type.as_u8());
    encoded.extend_from_slice(call.to.as_slice());
    encoded.extend_from_slice(&call.value.to_be_bytes::<32>());
    encoded.extend_from_slice(&U256::from(call.data.len()).to_be_bytes::<32>());
    encoded.extend_from_slice(&call.data);

    encoded
}

/// Concatenates packed entries for every sub-call, in order
pub fn encode_multisend_data(calls: &[SubCall]) -> Vec<u8> {
    calls.iter().flat_map(encode_transaction).collect()
}

/// `multiSend(bytes)` call data wrapping the packed blob
pub fn encode_multisend_call(calls: &[SubCall]) -> Result<Vec<u8>> {
    encode_call(
        "multiSend",
        &[AbiType::Bytes],
        &[AbiValue::Bytes(encode_multisend_data(calls))],
    )
}

/// Single delegate call to the MultiSend contract executing every sub-call
pub fn build_batch_call(multisend: Address, calls: &[SubCall]) -> Result<SubCall> {
    Ok(SubCall::delegate_call(multisend, encode_multisend_call(calls)?))
}
