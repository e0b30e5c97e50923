//! # Smart Account Core
//!
//! Derivation and encoding engine for counterfactual smart-contract accounts.
//!
//! ## Architecture
//!
//! This crate provides:
//! - **ABI Codec**: head/tail encoding for the parameter shapes the account contracts use
//! - **MultiSend Packing**: atomic batches of sub-calls executed by delegate call
//! - **Address Derivation**: CREATE2 addresses of accounts before deployment
//! - **Operation Hashing**: ERC-4337 v0.6/v0.7/v0.8 hashes and EIP-712 SafeOp hashes
//! - **Signature Assembly**: sorted multi-signer blobs with contract and passkey owners
//! - **EIP-7702**: delegation authorizations and set-code transaction envelopes
//! - **Bundler Client** (`rpc` feature): submission and inclusion polling
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use smart_account_core::config::SafeAccountConfig;
//! use smart_account_core::safe::{
//!     assemble_signatures, format_safe_signature, OwnerSet, SafeAccount, SignerIdentity,
//!     SignerSignaturePair,
//! };
//! use smart_account_core::{signer::sign_hash, SubCall, ValidityWindow};
//!
//! let owners = OwnerSet::new(vec![SignerIdentity::PlainKey(owner)], 1)?;
//! let account = SafeAccount::new(SafeAccountConfig::v0_3_0(), owners, U256::ZERO)?;
//!
//! // Counterfactual address, fundable before deployment
//! let address = account.address()?;
//!
//! // First operation deploys the account
//! let mut op = account.user_operation(&[SubCall::transfer(to, value)], U256::ZERO, false)?;
//! let window = ValidityWindow::unbounded();
//! let hash = account.operation_hash(&op, U256::from(1), window)?;
//!
//! let signature = sign_hash(&key, &hash)?;
//! let pair = SignerSignaturePair::new(SignerIdentity::PlainKey(owner), signature.to_rsv().to_vec());
//! let blob = assemble_signatures(&[pair], None, &account.config().webauthn)?;
//! op.set_signature(format_safe_signature(&window, &blob));
//! ```
//!
//! Every component except the bundler client is a pure function of its
//! inputs: no I/O, no shared state, no retries.

pub mod abi;
pub mod address;
pub mod config;
pub mod eip712;
pub mod eip7702;
pub mod error;
pub mod multisend;
pub mod safe;
pub mod signer;
pub mod simple7702;
pub mod types;
pub mod user_op;

#[cfg(feature = "rpc")]
pub mod bundler;

pub use config::{EntryPointVersion, SafeAccountConfig, Simple7702Config, WebAuthnConfig};
pub use eip712::ValidityWindow;
pub use eip7702::{
    Authorization, Eip7702Transaction, SignedAuthorization, build_authorization_preimage,
    sign_delegation_authorization,
};
pub use error::{Error, ErrorKind, Result};
pub use safe::{
    AccountContext, OwnerSet, SafeAccount, SignerIdentity, SignerSignaturePair,
    assemble_signatures, derive_address,
};
pub use types::{CallType, Signature, SubCall};
pub use user_op::{UserOperation, UserOperationV6, UserOperationV7, UserOperationV8, hash_operation};

#[cfg(feature = "rpc")]
pub use bundler::{
    BundlerClient, HttpTransport, JsonRpcBundler, Transport, UserOperationReceipt, wait_for_inclusion,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
