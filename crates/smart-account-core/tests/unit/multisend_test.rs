//! Unit tests for MultiSend batch packing

use alloy_primitives::{Address, U256};
use smart_account_core::{
    CallType, SubCall,
    multisend::{
        ENTRY_HEADER_LEN, build_batch_call, encode_multisend_call, encode_multisend_data,
        encode_transaction,
    },
    types::keccak256,
};

fn batch() -> Vec<SubCall> {
    vec![
        SubCall::transfer(Address::repeat_byte(0x01), U256::from(1)),
        SubCall::call(Address::repeat_byte(0x02), U256::from(2), vec![0xca, 0xfe]),
    ]
}

// hash from tests/vectors/reference_vectors.py
#[test]
fn test_packed_batch_reference() {
    let packed = encode_multisend_data(&batch());
    assert_eq!(packed.len(), 2 * ENTRY_HEADER_LEN + 2);
    assert_eq!(
        hex::encode(keccak256(&packed)),
        "8f8df3bb3c7ee1fcc02e5a94a74e7b20449c121fff51f5422e55307d627af225"
    );
}

#[test]
fn test_entries_are_not_word_aligned() {
    let call = SubCall::call(Address::repeat_byte(0x02), U256::ZERO, vec![0xff; 3]);
    let entry = encode_transaction(&call);
    assert_eq!(entry.len(), ENTRY_HEADER_LEN + 3);
    assert_eq!(entry[0], CallType::Call.as_u8());
    assert_eq!(&entry[1..21], Address::repeat_byte(0x02).as_slice());
    assert_eq!(entry[ENTRY_HEADER_LEN - 1], 3);
    assert_eq!(&entry[ENTRY_HEADER_LEN..], &[0xff; 3]);
}

#[test]
fn test_delegate_call_flag() {
    let entry = encode_transaction(&SubCall::delegate_call(Address::ZERO, vec![]));
    assert_eq!(entry[0], 1);
}

#[test]
fn test_order_is_preserved() {
    let calls = batch();
    let reversed: Vec<_> = calls.iter().rev().cloned().collect();
    assert_ne!(encode_multisend_data(&calls), encode_multisend_data(&reversed));
    assert_eq!(
        &encode_multisend_data(&calls)[..ENTRY_HEADER_LEN],
        encode_transaction(&calls[0]).as_slice()
    );
}

#[test]
fn test_empty_batch() {
    assert!(encode_multisend_data(&[]).is_empty());
    let call = encode_multisend_call(&[]).unwrap();
    // selector, offset, zero length
    assert_eq!(call.len(), 4 + 64);
}

#[test]
fn test_batch_call_is_delegate_call_to_multisend() {
    let multisend = Address::repeat_byte(0x38);
    let call = build_batch_call(multisend, &batch()).unwrap();
    assert_eq!(call.to, multisend);
    assert_eq!(call.call_type, CallType::DelegateCall);
    assert_eq!(call.value, U256::ZERO);
    assert_eq!(&call.data[..4], &[0x8d, 0x80, 0xff, 0x0a]);
}
