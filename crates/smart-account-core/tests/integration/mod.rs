//! Integration tests module
//!
//! End-to-end flows from owner set to submitted payload:
//! - Safe accounts with the 4337 module
//! - EIP-7702 delegated accounts

pub mod delegated_flow_test;
