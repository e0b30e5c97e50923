//! Unit tests for operation hashing
//!
//! Reference hashes come from tests/vectors/reference_vectors.py, which
//! rebuilds EntryPoint `getUserOpHash` and the 4337 module's SafeOp hash with
//! its own keccak and encoding, for the same operation: sender
//! `0x1111..11`, nonce 0, call data `0xdeadbeef`, default gas values, chain 1.

use alloy_primitives::{Address, B256, U256, b256};
use smart_account_core::{
    EntryPointVersion, Error, SafeAccountConfig, UserOperation, UserOperationV6, UserOperationV7,
    UserOperationV8, ValidityWindow,
    config::{ENTRY_POINT_V06, ENTRY_POINT_V07, ENTRY_POINT_V08},
    hash_operation,
    safe::safe_operation_hash,
};

fn sender() -> Address {
    Address::repeat_byte(0x11)
}

fn call_data() -> Vec<u8> {
    vec![0xde, 0xad, 0xbe, 0xef]
}

fn chain() -> U256 {
    U256::from(1)
}

// ============================================================================
// EntryPoint hashes
// ============================================================================

#[test]
fn test_v06_reference_hash() {
    let op = UserOperationV6::new(sender(), U256::ZERO, call_data());
    assert_eq!(
        op.hash(ENTRY_POINT_V06, chain()).unwrap(),
        b256!("df1c41b2d487ed9292ef489094c2794a628cb8fc7424ed3560238450461d82c0")
    );
}

#[test]
fn test_v07_reference_hash() {
    let op = UserOperationV7::new(sender(), U256::ZERO, call_data());
    assert_eq!(
        op.hash(ENTRY_POINT_V07, chain()).unwrap(),
        b256!("d1d3d83ee5b3bb4a20af4f915568e927dabf0cb647b7b71d3d4b6f12bbd8cd91")
    );
}

#[test]
fn test_v08_reference_hash() {
    let op = UserOperationV8::new(sender(), U256::ZERO, call_data());
    assert_eq!(
        op.hash(ENTRY_POINT_V08, chain()).unwrap(),
        b256!("de9a6903f7e379c9748431c33cba8b7b21211e0d220b8faba1c6c4c46c4f7d92")
    );
}

#[test]
fn test_signature_excluded_from_hash() {
    let op: UserOperation = UserOperationV7::new(sender(), U256::ZERO, call_data()).into();
    let signed = op.clone().with_signature(vec![0xaa; 77]);
    assert_eq!(
        op.hash(ENTRY_POINT_V07, chain()).unwrap(),
        signed.hash(ENTRY_POINT_V07, chain()).unwrap()
    );
}

#[test]
fn test_every_field_feeds_hash() {
    let base = UserOperationV7::new(sender(), U256::ZERO, call_data());
    let reference = base.hash(ENTRY_POINT_V07, chain()).unwrap();

    let variants = [
        base.clone().with_gas_limits(1, 100000, 21000),
        base.clone().with_gas_prices(1, 0),
        base.clone().with_factory(Address::repeat_byte(2), vec![1]),
        base.clone().with_paymaster(Address::repeat_byte(3), 1, 1, vec![]),
        UserOperationV7::new(sender(), U256::from(1), call_data()),
        UserOperationV7::new(sender(), U256::ZERO, vec![]),
    ];
    for op in variants {
        assert_ne!(op.hash(ENTRY_POINT_V07, chain()).unwrap(), reference);
    }

    assert_ne!(base.hash(ENTRY_POINT_V07, U256::from(10)).unwrap(), reference);
    assert_ne!(base.hash(ENTRY_POINT_V06, chain()).unwrap(), reference);
}

#[test]
fn test_gas_over_128_bits_rejected() {
    let mut op = UserOperationV7::new(sender(), U256::ZERO, call_data());
    op.call_gas_limit = U256::MAX;
    assert!(matches!(
        op.hash(ENTRY_POINT_V07, chain()),
        Err(Error::OutOfRange(_))
    ));
}

#[test]
fn test_version_must_match_shape() {
    let op: UserOperation = UserOperationV6::new(sender(), U256::ZERO, call_data()).into();
    assert!(matches!(
        hash_operation(&op, ENTRY_POINT_V07, chain(), EntryPointVersion::V07),
        Err(Error::VersionMismatch { .. })
    ));
    assert_eq!(
        hash_operation(&op, ENTRY_POINT_V06, chain(), EntryPointVersion::V06).unwrap(),
        op.hash(ENTRY_POINT_V06, chain()).unwrap()
    );
}

// ============================================================================
// SafeOp hashes
// ============================================================================

#[test]
fn test_safe_op_reference_hash() {
    let config = SafeAccountConfig::v0_3_0();
    let op: UserOperation = UserOperationV7::new(sender(), U256::ZERO, call_data()).into();
    let hash = safe_operation_hash(
        &op,
        chain(),
        config.safe_4337_module,
        config.entry_point,
        ValidityWindow::unbounded(),
    )
    .unwrap();
    assert_eq!(
        hash,
        b256!("46617c06236ba7169871b3682d296c1ba0bbe928ffe681274654549749b86efb")
    );
}

#[test]
fn test_safe_op_differs_from_entry_point_hash() {
    let config = SafeAccountConfig::v0_3_0();
    let op: UserOperation = UserOperationV7::new(sender(), U256::ZERO, call_data()).into();
    let safe_hash: B256 = safe_operation_hash(
        &op,
        chain(),
        config.safe_4337_module,
        config.entry_point,
        ValidityWindow::unbounded(),
    )
    .unwrap();
    assert_ne!(safe_hash, op.hash(config.entry_point, chain()).unwrap());
}

#[test]
fn test_window_bounds_checked() {
    assert!(ValidityWindow::new(0, (1 << 48) - 1).is_ok());
    assert!(matches!(
        ValidityWindow::new(1 << 48, 0),
        Err(Error::OutOfRange(_))
    ));
    assert!(matches!(
        ValidityWindow::from_signed(-1, 0),
        Err(Error::OutOfRange(_))
    ));
}
