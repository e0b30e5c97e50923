//! Unit tests module
//!
//! Individual component tests:
//! - ABI codec and MultiSend packing
//! - Operation hashing
//! - Signature assembly
//! - EIP-7702 codec

pub mod eip7702_test;
pub mod hash_test;
pub mod multisend_test;
pub mod signature_test;
