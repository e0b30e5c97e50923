//! End-to-end EIP-7702 delegated account flow
//!
//! The EOA signs a delegation to the account implementation, then either
//! submits it through a v0.8 operation or in a set-code transaction.

use alloy_primitives::{Address, U256};
use smart_account_core::{
    Eip7702Transaction, Signature, Simple7702Config, SubCall, UserOperation,
    config::{EIP7702_FACTORY_MARKER, ENTRY_POINT_V08},
    eip7702::recover_transaction_signer,
    signer::{address_of, recover_address, signing_key_from_bytes},
    simple7702::Simple7702Account,
};

use crate::{DEV_KEY, init_tracing};

#[test]
fn test_first_operation_with_authorization() {
    init_tracing();

    let key = signing_key_from_bytes(&DEV_KEY).unwrap();
    let account = Simple7702Account::from_key(Simple7702Config::default(), &key);
    let chain_id = U256::from(11155111);

    let auth = account.sign_authorization(chain_id, U256::ZERO, &key).unwrap();
    assert_eq!(auth.address, account.config().delegatee);
    assert_eq!(auth.recover_authority().unwrap(), account.address());

    let mut op = account
        .user_operation(
            &[SubCall::transfer(Address::repeat_byte(0x42), U256::from(1))],
            U256::ZERO,
            Some(auth.clone()),
        )
        .unwrap();
    assert_eq!(op.packed.factory, Some(EIP7702_FACTORY_MARKER));

    let hash = account.sign_operation(&mut op, chain_id, &key).unwrap();
    assert_eq!(hash, op.hash(ENTRY_POINT_V08, chain_id).unwrap());

    let signature = Signature::from_rsv(&op.packed.signature).unwrap();
    assert_eq!(recover_address(&hash, &signature).unwrap(), address_of(&key));

    let rpc = UserOperation::from(op).to_rpc_format();
    assert_eq!(rpc["eip7702Auth"]["address"], auth.address.to_string());
}

#[test]
fn test_authorization_changes_operation_hash() {
    let key = signing_key_from_bytes(&DEV_KEY).unwrap();
    let account = Simple7702Account::from_key(Simple7702Config::default(), &key);
    let calls = [SubCall::transfer(Address::repeat_byte(0x42), U256::from(1))];
    let chain_id = U256::from(1);

    let plain = account.user_operation(&calls, U256::ZERO, None).unwrap();
    let auth = account.sign_authorization(chain_id, U256::ZERO, &key).unwrap();
    let delegating = account.user_operation(&calls, U256::ZERO, Some(auth)).unwrap();

    assert_ne!(
        account.operation_hash(&plain, chain_id).unwrap(),
        account.operation_hash(&delegating, chain_id).unwrap()
    );
}

#[test]
fn test_delegation_by_set_code_transaction() {
    let key = signing_key_from_bytes(&DEV_KEY).unwrap();
    let account = Simple7702Account::from_key(Simple7702Config::default(), &key);
    let chain_id = U256::from(1);

    // the sender's own nonce advances before the authorization is applied
    let auth = account.sign_authorization(chain_id, U256::from(6), &key).unwrap();
    let raw = Eip7702Transaction::new(chain_id, U256::from(5), account.address().as_slice())
        .unwrap()
        .with_fees(1_000_000_000, 20_000_000_000)
        .with_authorization(auth)
        .build_raw_transaction(&key)
        .unwrap();

    assert_eq!(recover_transaction_signer(&raw).unwrap(), account.address());
    let (tx, _) = Eip7702Transaction::decode_signed(&raw).unwrap();
    assert_eq!(tx.authorization_list[0].nonce, 6);
    assert_eq!(tx.destination, account.address());
}
