//! Unit tests for the EIP-7702 codec

use alloy_primitives::{Address, B256, U256, address, b256};
use smart_account_core::{
    Eip7702Transaction, Error, Simple7702Config, build_authorization_preimage,
    eip7702::{EIP7702_TX_TYPE, recover_transaction_signer, transaction_hash},
    sign_delegation_authorization,
    signer::{address_of, is_low_s, signing_key_from_bytes},
};

use crate::DEV_KEY;

fn dev_address() -> Address {
    address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266")
}

// ============================================================================
// Authorizations
// ============================================================================

// keccak(0x05 || rlp([1, delegatee, 0])), from tests/vectors/reference_vectors.py
#[test]
fn test_authorization_preimage_reference() {
    let delegatee = Simple7702Config::default().delegatee;
    assert_eq!(
        build_authorization_preimage(U256::from(1), delegatee, U256::ZERO).unwrap(),
        b256!("5ff19acadaf683f545b800216672c273bcb8563df38a3f451ad080f8b936979b")
    );
}

#[test]
fn test_authorization_counters_limited_to_64_bits() {
    let too_big = U256::from(u64::MAX) + U256::from(1);
    assert!(matches!(
        build_authorization_preimage(too_big, Address::ZERO, U256::ZERO),
        Err(Error::OutOfRange(_))
    ));
    assert!(matches!(
        build_authorization_preimage(U256::from(1), Address::ZERO, too_big),
        Err(Error::OutOfRange(_))
    ));
    assert!(build_authorization_preimage(U256::from(u64::MAX), Address::ZERO, U256::ZERO).is_ok());
}

#[test]
fn test_signed_authorization_recovers_to_key() {
    let key = signing_key_from_bytes(&DEV_KEY).unwrap();
    assert_eq!(address_of(&key), dev_address());

    let auth =
        sign_delegation_authorization(U256::from(1), Address::repeat_byte(9), U256::from(3), &key)
            .unwrap();
    assert_eq!(auth.recover_authority().unwrap(), dev_address());
    assert!(is_low_s(&auth.signature()));
    assert!(auth.y_parity <= 1);
}

#[test]
fn test_authorization_rpc_format() {
    let key = signing_key_from_bytes(&DEV_KEY).unwrap();
    let auth = sign_delegation_authorization(U256::from(10), Address::ZERO, U256::from(16), &key)
        .unwrap();
    let json = auth.to_rpc_format();
    assert_eq!(json["chainId"], "0xa");
    assert_eq!(json["nonce"], "0x10");
}

// ============================================================================
// Set-code transactions
// ============================================================================

#[test]
fn test_raw_transaction_round_trip() {
    let key = signing_key_from_bytes(&DEV_KEY).unwrap();
    let auth =
        sign_delegation_authorization(U256::from(1), Address::repeat_byte(9), U256::from(1), &key)
            .unwrap();

    let tx = Eip7702Transaction::new(U256::from(1), U256::ZERO, dev_address().as_slice())
        .unwrap()
        .with_fees(1_000_000_000, 30_000_000_000)
        .with_gas_limit(120_000)
        .with_call(U256::ZERO, vec![0x12, 0x34])
        .with_access(Address::repeat_byte(5), vec![B256::repeat_byte(6)])
        .with_authorization(auth);

    let raw = tx.build_raw_transaction(&key).unwrap();
    assert_eq!(raw[0], EIP7702_TX_TYPE);

    let (decoded, signature) = Eip7702Transaction::decode_signed(&raw).unwrap();
    assert_eq!(decoded, tx);
    assert!(is_low_s(&signature));
    assert_eq!(recover_transaction_signer(&raw).unwrap(), dev_address());
    assert_eq!(decoded.authorization_list[0].recover_authority().unwrap(), dev_address());
}

#[test]
fn test_signing_is_deterministic() {
    let key = signing_key_from_bytes(&DEV_KEY).unwrap();
    let tx = Eip7702Transaction::new(U256::from(1), U256::ZERO, &[0x11; 20]).unwrap();
    let a = tx.build_raw_transaction(&key).unwrap();
    let b = tx.build_raw_transaction(&key).unwrap();
    assert_eq!(a, b);
    assert_eq!(transaction_hash(&a), transaction_hash(&b));
}

#[test]
fn test_destination_must_be_20_bytes() {
    assert!(matches!(
        Eip7702Transaction::new(U256::from(1), U256::ZERO, &[0u8; 19]),
        Err(Error::InvalidAddressLength(19))
    ));
    assert!(Eip7702Transaction::new(U256::from(1), U256::ZERO, &[]).is_err());
}

#[test]
fn test_decode_rejects_other_types() {
    let key = signing_key_from_bytes(&DEV_KEY).unwrap();
    let mut raw = Eip7702Transaction::new(U256::from(1), U256::ZERO, &[0x11; 20])
        .unwrap()
        .build_raw_transaction(&key)
        .unwrap();
    raw[0] = 0x02;
    assert!(matches!(
        Eip7702Transaction::decode_signed(&raw),
        Err(Error::Deserialization(_))
    ));
}
