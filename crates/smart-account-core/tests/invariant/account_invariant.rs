//! Invariant tests for account derivation
//!
//! These tests verify properties that must always hold:
//! - Threshold is within `1..=owners`
//! - The address commits to owners, threshold, salt and configuration
//! - Derivation is a pure function of its inputs

use alloy_primitives::{Address, U256};
use proptest::prelude::*;
use smart_account_core::{
    Error, OwnerSet, SafeAccount, SafeAccountConfig, SignerIdentity, derive_address,
    safe::{ModuleOptions, PasskeyCoordinates},
};

fn plain(byte: u8) -> SignerIdentity {
    SignerIdentity::PlainKey(Address::repeat_byte(byte))
}

fn address_of(owners: Vec<SignerIdentity>, threshold: u64, salt: u64) -> Address {
    derive_address(
        &SafeAccountConfig::v0_3_0(),
        &OwnerSet::new(owners, threshold).unwrap(),
        U256::from(salt),
        &ModuleOptions::default(),
    )
    .unwrap()
}

// ============================================================================
// Owner Set Invariants
// ============================================================================

proptest! {
    /// An owner set exists iff 1 <= threshold <= owners
    #[test]
    fn threshold_within_owner_count(count in 0usize..6, threshold in 0u64..8) {
        let owners: Vec<_> = (0..count).map(|i| plain(i as u8 + 1)).collect();
        let result = OwnerSet::new(owners, threshold);
        if threshold >= 1 && threshold <= count as u64 {
            prop_assert!(result.is_ok());
        } else {
            let is_threshold_error = matches!(result, Err(Error::InvalidThreshold { .. }));
            prop_assert!(is_threshold_error);
        }
    }
}

#[test]
fn test_multiple_passkeys_rejected() {
    let passkey = |x: u64| {
        SignerIdentity::Passkey(PasskeyCoordinates {
            x: U256::from(x),
            y: U256::from(x),
        })
    };
    assert!(OwnerSet::new(vec![passkey(1), plain(2)], 1).is_ok());
    assert!(OwnerSet::new(vec![passkey(1), passkey(2)], 1).is_err());
}

// ============================================================================
// Address Invariants
// ============================================================================

#[test]
fn test_address_commits_to_every_input() {
    let reference = address_of(vec![plain(1), plain(2)], 1, 0);

    assert_eq!(reference, address_of(vec![plain(1), plain(2)], 1, 0));
    assert_ne!(reference, address_of(vec![plain(1), plain(2)], 2, 0));
    assert_ne!(reference, address_of(vec![plain(1), plain(2)], 1, 1));
    assert_ne!(reference, address_of(vec![plain(1), plain(3)], 1, 0));
    // owner order is part of the initializer
    assert_ne!(reference, address_of(vec![plain(2), plain(1)], 1, 0));
}

#[test]
fn test_address_commits_to_configuration() {
    let owners = OwnerSet::new(vec![plain(1)], 1).unwrap();
    let modules = ModuleOptions::default();
    let base = SafeAccountConfig::v0_3_0();

    let reference = derive_address(&base, &owners, U256::ZERO, &modules).unwrap();
    let other_singleton = base.clone().with_singleton(Address::repeat_byte(0x99));
    let other_factory = base
        .clone()
        .with_proxy_factory(Address::repeat_byte(0x98), base.proxy_creation_code.clone());

    assert_ne!(
        reference,
        derive_address(&other_singleton, &owners, U256::ZERO, &modules).unwrap()
    );
    assert_ne!(
        reference,
        derive_address(&other_factory, &owners, U256::ZERO, &modules).unwrap()
    );

    let with_extra_module = ModuleOptions {
        extra_modules: vec![Address::repeat_byte(0x77)],
        fallback_handler: None,
    };
    assert_ne!(
        reference,
        derive_address(&base, &owners, U256::ZERO, &with_extra_module).unwrap()
    );
}

#[test]
fn test_passkey_owner_changes_address() {
    let passkey = SignerIdentity::Passkey(PasskeyCoordinates {
        x: U256::from(1),
        y: U256::from(2),
    });
    let other = SignerIdentity::Passkey(PasskeyCoordinates {
        x: U256::from(1),
        y: U256::from(3),
    });
    assert_ne!(address_of(vec![passkey], 1, 0), address_of(vec![other], 1, 0));
}

#[test]
fn test_incomplete_configuration_rejected() {
    let owners = OwnerSet::new(vec![plain(1)], 1).unwrap();
    let config = SafeAccountConfig::v0_3_0().with_proxy_factory(Address::repeat_byte(1), vec![]);
    assert!(matches!(
        SafeAccount::new(config.clone(), owners.clone(), U256::ZERO),
        Err(Error::InvalidConfig(_))
    ));
    assert!(matches!(
        derive_address(&config, &owners, U256::ZERO, &ModuleOptions::default()),
        Err(Error::InvalidConfig(_))
    ));
}

proptest! {
    /// Every salt nonce yields a distinct address for the same owners
    #[test]
    fn salt_nonce_separates_addresses(a in any::<u64>(), b in any::<u64>()) {
        prop_assume!(a != b);
        prop_assert_ne!(address_of(vec![plain(1)], 1, a), address_of(vec![plain(1)], 1, b));
    }
}
