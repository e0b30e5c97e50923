//! Invariant tests module
//!
//! Critical guarantees that must always hold:
//! - Owner set bounds
//! - Address derivation sensitivity

pub mod account_invariant;
