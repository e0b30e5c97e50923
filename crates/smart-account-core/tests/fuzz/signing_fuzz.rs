//! Fuzz tests for signing
//!
//! Every signature produced by the crate is canonical (low-S) and recovers
//! to the signing key, for any digest and any valid key.

use alloy_primitives::{B256, U256};
use proptest::prelude::*;
use smart_account_core::{
    Signature, ValidityWindow,
    signer::{
        SECP256K1_HALF_ORDER, address_of, is_low_s, recover_address, sign_hash,
        signing_key_from_bytes,
    },
};

// ============================================================================
// Strategies for generating test data
// ============================================================================

/// Generate a random 32-byte digest
fn digest_strategy() -> impl Strategy<Value = B256> {
    prop::array::uniform32(any::<u8>()).prop_map(B256::from)
}

/// Generate a valid private key (non-zero, below the group order)
fn key_strategy() -> impl Strategy<Value = [u8; 32]> {
    prop::array::uniform32(any::<u8>())
        .prop_filter("valid scalar", |bytes| signing_key_from_bytes(bytes).is_ok())
}

proptest! {
    /// Signatures are low-S and recover to the key's address
    #[test]
    fn signatures_are_canonical(key in key_strategy(), digest in digest_strategy()) {
        let key = signing_key_from_bytes(&key).unwrap();
        let signature = sign_hash(&key, &digest).unwrap();

        prop_assert!(is_low_s(&signature));
        prop_assert!(signature.s_u256() <= SECP256K1_HALF_ORDER);
        prop_assert!(signature.recovery_id <= 1);
        prop_assert_eq!(recover_address(&digest, &signature).unwrap(), address_of(&key));
    }

    /// Signing is deterministic (RFC 6979)
    #[test]
    fn signing_is_deterministic(key in key_strategy(), digest in digest_strategy()) {
        let key = signing_key_from_bytes(&key).unwrap();
        prop_assert_eq!(sign_hash(&key, &digest).unwrap(), sign_hash(&key, &digest).unwrap());
    }

    /// The 65-byte wire form survives a parse
    #[test]
    fn rsv_round_trip(key in key_strategy(), digest in digest_strategy()) {
        let key = signing_key_from_bytes(&key).unwrap();
        let signature = sign_hash(&key, &digest).unwrap();
        let parsed = Signature::from_rsv(&signature.to_rsv()).unwrap();
        prop_assert_eq!(parsed.r_u256(), signature.r_u256());
        prop_assert_eq!(parsed.s_u256(), signature.s_u256());
        prop_assert_eq!(parsed.v(), signature.v());
    }

    /// Validity windows accept exactly the 48-bit range
    #[test]
    fn window_bounds(after in any::<u64>(), until in any::<u64>()) {
        let fits = after < (1 << 48) && until < (1 << 48);
        prop_assert_eq!(ValidityWindow::new(after, until).is_ok(), fits);
        if fits {
            let packed = ValidityWindow::new(after, until).unwrap().to_packed();
            prop_assert_eq!(U256::from_be_slice(&packed[..6]), U256::from(after));
            prop_assert_eq!(U256::from_be_slice(&packed[6..]), U256::from(until));
        }
    }
}
