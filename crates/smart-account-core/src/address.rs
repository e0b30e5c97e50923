//! Deterministic (CREATE2) address derivation
//!
//! `address = keccak256(0xff || deployer || salt || keccak256(init_code))[12:]`

use crate::types::{keccak256, keccak256_concat};
use alloy_primitives::{Address, B256};

/// CREATE2 address from a deployer, salt and init code hash
pub fn create2_address(deployer: &Address, salt: &B256, init_code_hash: &B256) -> Address {
    let hash = keccak256_concat(&[
        [0xffu8].as_slice(),
        deployer.as_slice(),
        salt.as_slice(),
        init_code_hash.as_slice(),
    ]);
    Address::from_slice(&hash[12..])
}

/// CREATE2 address from a deployer, salt and the full init code
pub fn create2_address_from_code(deployer: &Address, salt: &B256, init_code: &[u8]) -> Address {
    create2_address(deployer, salt, &keccak256(init_code))
}
