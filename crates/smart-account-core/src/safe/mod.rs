//! # Safe Smart Accounts
//!
//! Counterfactual Safe accounts driven by the 4337 module:
//! - initializer (`setup`) and factory (`createProxyWithNonce`) call data
//! - CREATE2 address derivation matching the proxy factory
//! - executor call data for single calls and MultiSend batches
//! - owner management call data
//! - SafeOp hashing ([`operation`]), passkey owners ([`webauthn`]) and
//!   multi-signer signature assembly ([`signature`])
//!
//! ## Example
//!
//! ```rust,ignore
//! use smart_account_core::safe::{OwnerSet, SafeAccount, SignerIdentity};
//! use smart_account_core::config::SafeAccountConfig;
//!
//! let owners = OwnerSet::new(vec![SignerIdentity::PlainKey(owner)], 1)?;
//! let account = SafeAccount::new(SafeAccountConfig::v0_3_0(), owners, U256::ZERO)?;
//!
//! let address = account.address()?;
//! let op = account.user_operation(&[SubCall::transfer(to, value)], U256::ZERO, false)?;
//! ```

pub mod operation;
pub mod signature;
pub mod webauthn;

use crate::abi::{AbiType, AbiValue, encode_call, selector};
use crate::address::create2_address;
use crate::config::{EntryPointVersion, SENTINEL_OWNERS, SafeAccountConfig};
use crate::eip712::ValidityWindow;
use crate::multisend::{build_batch_call, encode_multisend_call};
use crate::types::{SubCall, address_word, keccak256, keccak256_concat, uint_word};
use crate::user_op::{UserOperation, UserOperationV6, UserOperationV7, UserOperationV8};
use crate::{Error, Result};
use alloy_primitives::{Address, B256, U256};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub use operation::{SAFE_OP_TYPE_V6, SAFE_OP_TYPE_V7, safe_operation_hash};
pub use signature::{
    AccountContext, SignatureSlot, SignerSignaturePair, assemble_signatures,
    format_safe_signature, layout_signatures,
};
pub use webauthn::{PasskeyCoordinates, verifier_proxy_address};

// ============================================================================
// Signer identities and owner sets
// ============================================================================

/// Account owner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SignerIdentity {
    /// Externally owned key signing inline ECDSA
    PlainKey(Address),
    /// P-256 passkey verified through a WebAuthn signer contract
    Passkey(PasskeyCoordinates),
    /// Another contract account verifying via EIP-1271
    Contract(Address),
}

impl SignerIdentity {
    /// Whether signatures of this owner go through a verifier contract
    pub fn is_contract(&self) -> bool {
        !matches!(self, SignerIdentity::PlainKey(_))
    }
}

/// Owners and threshold of a Safe
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerSet {
    owners: Vec<SignerIdentity>,
    threshold: u64,
}

impl OwnerSet {
    /// Create an owner set, requiring `1 <= threshold <= owners.len()` and at
    /// most one passkey owner
    pub fn new(owners: Vec<SignerIdentity>, threshold: u64) -> Result<Self> {
        if threshold == 0 || threshold > owners.len() as u64 {
            return Err(Error::InvalidThreshold {
                threshold,
                owners: owners.len(),
            });
        }

        let passkeys = owners
            .iter()
            .filter(|o| matches!(o, SignerIdentity::Passkey(_)))
            .count();
        if passkeys > 1 {
            return Err(Error::InvalidConfig(format!(
                "at most one passkey owner can initialize an account, got {}",
                passkeys
            )));
        }

        Ok(Self { owners, threshold })
    }

    pub fn owners(&self) -> &[SignerIdentity] {
        &self.owners
    }

    pub fn threshold(&self) -> u64 {
        self.threshold
    }

    /// The passkey owner, if any
    pub fn passkey(&self) -> Option<PasskeyCoordinates> {
        self.owners.iter().find_map(|o| match o {
            SignerIdentity::Passkey(p) => Some(*p),
            _ => None,
        })
    }

    /// On-chain owner addresses at initialization (passkey = shared signer)
    pub fn initial_addresses(&self, shared_signer: Address) -> Vec<Address> {
        self.owners
            .iter()
            .map(|o| match o {
                SignerIdentity::PlainKey(a) | SignerIdentity::Contract(a) => *a,
                SignerIdentity::Passkey(_) => shared_signer,
            })
            .collect()
    }
}

/// Extra modules and handler overrides applied during setup
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleOptions {
    /// Modules enabled alongside the 4337 module
    #[serde(default)]
    pub extra_modules: Vec<Address>,
    /// Fallback handler (defaults to the 4337 module)
    #[serde(default)]
    pub fallback_handler: Option<Address>,
}

/// Which 4337 module executor the account calls
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Executor {
    /// `executeUserOp`
    #[default]
    ExecuteUserOp,
    /// `executeUserOpWithErrorString` (bubbles revert reasons)
    ExecuteUserOpWithErrorString,
}

impl Executor {
    fn name(&self) -> &'static str {
        match self {
            Executor::ExecuteUserOp => "executeUserOp",
            Executor::ExecuteUserOpWithErrorString => "executeUserOpWithErrorString",
        }
    }

    /// Function selector
    pub fn selector(&self) -> [u8; 4] {
        selector(&format!("{}(address,uint256,bytes,uint8)", self.name()))
    }
}

// ============================================================================
// Call data builders
// ============================================================================

/// `enableModules(address[])` executed by delegate call from `setup`
pub fn enable_modules_call_data(modules: &[Address]) -> Result<Vec<u8>> {
    encode_call(
        "enableModules",
        &[AbiType::array(AbiType::Address)],
        &[AbiValue::address_array(modules)],
    )
}

/// Safe `setup(...)` initializer
pub fn build_initializer_call_data(
    config: &SafeAccountConfig,
    owners: &OwnerSet,
    modules: &ModuleOptions,
) -> Result<Vec<u8>> {
    let mut enabled = vec![config.safe_4337_module];
    enabled.extend_from_slice(&modules.extra_modules);
    let enable_modules = enable_modules_call_data(&enabled)?;

    let (to, data) = match owners.passkey() {
        None => (config.module_setup, enable_modules),
        Some(passkey) => {
            let configure = webauthn::configure_call_data(&passkey, &config.webauthn)?;
            let batch = [
                SubCall::delegate_call(config.module_setup, enable_modules),
                SubCall::delegate_call(config.webauthn.shared_signer, configure),
            ];
            (config.multisend, encode_multisend_call(&batch)?)
        }
    };

    let owner_addresses = owners.initial_addresses(config.webauthn.shared_signer);
    let fallback_handler = modules.fallback_handler.unwrap_or(config.safe_4337_module);

    encode_call(
        "setup",
        &[
            AbiType::array(AbiType::Address),
            AbiType::uint256(),
            AbiType::Address,
            AbiType::Bytes,
            AbiType::Address,
            AbiType::Address,
            AbiType::uint256(),
            AbiType::Address,
        ],
        &[
            AbiValue::address_array(&owner_addresses),
            AbiValue::uint(owners.threshold()),
            AbiValue::Address(to),
            AbiValue::Bytes(data),
            AbiValue::Address(fallback_handler),
            AbiValue::Address(Address::ZERO),
            AbiValue::uint(0),
            AbiValue::Address(Address::ZERO),
        ],
    )
}

/// `createProxyWithNonce(singleton, initializer, saltNonce)`
pub fn build_factory_call_data(
    singleton: Address,
    initializer: &[u8],
    salt_nonce: U256,
) -> Result<Vec<u8>> {
    encode_call(
        "createProxyWithNonce",
        &[AbiType::Address, AbiType::Bytes, AbiType::uint256()],
        &[
            AbiValue::Address(singleton),
            AbiValue::Bytes(initializer.to_vec()),
            AbiValue::Uint(salt_nonce),
        ],
    )
}

/// Executor call for one sub-call, or a MultiSend batch for several
pub fn build_executor_call_data(
    executor: Executor,
    multisend: Address,
    calls: &[SubCall],
) -> Result<Vec<u8>> {
    let call = match calls {
        [] => {
            return Err(Error::ParameterCount {
                expected: 1,
                actual: 0,
            });
        }
        [single] => single.clone(),
        _ => build_batch_call(multisend, calls)?,
    };

    encode_call(
        executor.name(),
        &[
            AbiType::Address,
            AbiType::uint256(),
            AbiType::Bytes,
            AbiType::Uint(8),
        ],
        &[
            AbiValue::Address(call.to),
            AbiValue::Uint(call.value),
            AbiValue::Bytes(call.data.to_vec()),
            AbiValue::uint(call.call_type.as_u8() as u64),
        ],
    )
}

/// Counterfactual address for an initializer
///
/// `salt = keccak256(keccak256(initializer) || saltNonce)` and
/// `deployHash = keccak256(creationCode || uint256(singleton))`
pub fn derive_address_from_initializer(
    config: &SafeAccountConfig,
    initializer: &[u8],
    salt_nonce: U256,
) -> Result<Address> {
    config.validate()?;

    let salt = keccak256_concat(&[
        keccak256(initializer).as_slice(),
        uint_word(salt_nonce).as_slice(),
    ]);
    let deploy_hash = keccak256_concat(&[
        config.proxy_creation_code.as_slice(),
        address_word(&config.singleton).as_slice(),
    ]);

    Ok(create2_address(&config.proxy_factory, &salt, &deploy_hash))
}

/// Counterfactual address of a Safe with the given owners and salt nonce
pub fn derive_address(
    config: &SafeAccountConfig,
    owners: &OwnerSet,
    salt_nonce: U256,
    modules: &ModuleOptions,
) -> Result<Address> {
    let initializer = build_initializer_call_data(config, owners, modules)?;
    derive_address_from_initializer(config, &initializer, salt_nonce)
}

// ============================================================================
// Owner management
// ============================================================================

/// Entry preceding `owner` in the Safe owner linked list
pub fn previous_owner(owners: &[Address], owner: Address) -> Result<Address> {
    match owners.iter().position(|o| *o == owner) {
        Some(0) => Ok(SENTINEL_OWNERS),
        Some(i) => Ok(owners[i - 1]),
        None => Err(Error::InvalidConfig(format!("{} is not an owner", owner))),
    }
}

/// `addOwnerWithThreshold(owner, threshold)`
pub fn add_owner_call_data(owner: Address, threshold: u64) -> Result<Vec<u8>> {
    encode_call(
        "addOwnerWithThreshold",
        &[AbiType::Address, AbiType::uint256()],
        &[AbiValue::Address(owner), AbiValue::uint(threshold)],
    )
}

/// `removeOwner(prevOwner, owner, threshold)` against the current owner list
pub fn remove_owner_call_data(
    current_owners: &[Address],
    owner: Address,
    threshold: u64,
) -> Result<Vec<u8>> {
    let remaining = current_owners.len().saturating_sub(1);
    if threshold == 0 || threshold > remaining as u64 {
        return Err(Error::InvalidThreshold {
            threshold,
            owners: remaining,
        });
    }
    let prev = previous_owner(current_owners, owner)?;
    encode_call(
        "removeOwner",
        &[AbiType::Address, AbiType::Address, AbiType::uint256()],
        &[
            AbiValue::Address(prev),
            AbiValue::Address(owner),
            AbiValue::uint(threshold),
        ],
    )
}

/// `swapOwner(prevOwner, oldOwner, newOwner)` against the current owner list
pub fn swap_owner_call_data(
    current_owners: &[Address],
    old_owner: Address,
    new_owner: Address,
) -> Result<Vec<u8>> {
    let prev = previous_owner(current_owners, old_owner)?;
    encode_call(
        "swapOwner",
        &[AbiType::Address, AbiType::Address, AbiType::Address],
        &[
            AbiValue::Address(prev),
            AbiValue::Address(old_owner),
            AbiValue::Address(new_owner),
        ],
    )
}

/// `changeThreshold(threshold)`
pub fn change_threshold_call_data(threshold: u64) -> Result<Vec<u8>> {
    encode_call("changeThreshold", &[AbiType::uint256()], &[AbiValue::uint(threshold)])
}

// ============================================================================
// Safe Account
// ============================================================================

/// A Safe account frozen to one configuration, owner set and salt nonce
#[derive(Debug, Clone)]
pub struct SafeAccount {
    config: SafeAccountConfig,
    owners: OwnerSet,
    salt_nonce: U256,
    modules: ModuleOptions,
    executor: Executor,
}

impl SafeAccount {
    /// Create an account description, validating the configuration
    pub fn new(config: SafeAccountConfig, owners: OwnerSet, salt_nonce: U256) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            owners,
            salt_nonce,
            modules: ModuleOptions::default(),
            executor: Executor::default(),
        })
    }

    /// Set extra modules and fallback handler
    pub fn with_modules(mut self, modules: ModuleOptions) -> Self {
        self.modules = modules;
        self
    }

    /// Set the executor function used for call data
    pub fn with_executor(mut self, executor: Executor) -> Self {
        self.executor = executor;
        self
    }

    pub fn config(&self) -> &SafeAccountConfig {
        &self.config
    }

    pub fn owners(&self) -> &OwnerSet {
        &self.owners
    }

    /// Safe `setup` call data
    pub fn initializer(&self) -> Result<Vec<u8>> {
        build_initializer_call_data(&self.config, &self.owners, &self.modules)
    }

    /// Proxy factory call data
    pub fn factory_data(&self) -> Result<Vec<u8>> {
        build_factory_call_data(self.config.singleton, &self.initializer()?, self.salt_nonce)
    }

    /// `factory || factoryData`
    pub fn init_code(&self) -> Result<Vec<u8>> {
        let mut init_code = self.config.proxy_factory.to_vec();
        init_code.extend(self.factory_data()?);
        Ok(init_code)
    }

    /// Counterfactual account address
    pub fn address(&self) -> Result<Address> {
        let address =
            derive_address_from_initializer(&self.config, &self.initializer()?, self.salt_nonce)?;

        debug!(
            address = %address,
            owners = self.owners.owners().len(),
            threshold = self.owners.threshold(),
            salt_nonce = %self.salt_nonce,
            "Derived Safe account address"
        );

        Ok(address)
    }

    /// Executor call data for the given sub-calls
    pub fn call_data(&self, calls: &[SubCall]) -> Result<Vec<u8>> {
        build_executor_call_data(self.executor, self.config.multisend, calls)
    }

    /// Self-call wrapping owner-management call data
    pub fn self_call(&self, data: Vec<u8>) -> Result<SubCall> {
        Ok(SubCall::call(self.address()?, U256::ZERO, data))
    }

    /// Unsigned operation in this configuration's wire shape
    ///
    /// `deployed = false` attaches the deployment payload.
    pub fn user_operation(
        &self,
        calls: &[SubCall],
        nonce: U256,
        deployed: bool,
    ) -> Result<UserOperation> {
        let sender = self.address()?;
        let call_data = self.call_data(calls)?;

        let op = match self.config.version {
            EntryPointVersion::V06 => {
                let mut op = UserOperationV6::new(sender, nonce, call_data);
                if !deployed {
                    op = op.with_init_code(self.config.proxy_factory, &self.factory_data()?);
                }
                UserOperation::V6(op)
            }
            EntryPointVersion::V07 | EntryPointVersion::V08 => {
                let mut op = UserOperationV7::new(sender, nonce, call_data);
                if !deployed {
                    op = op.with_factory(self.config.proxy_factory, self.factory_data()?);
                }
                if self.config.version == EntryPointVersion::V07 {
                    UserOperation::V7(op)
                } else {
                    UserOperation::V8(UserOperationV8 {
                        packed: op,
                        eip7702_auth: None,
                    })
                }
            }
        };

        Ok(op)
    }

    /// SafeOp hash the owners sign
    pub fn operation_hash(
        &self,
        operation: &UserOperation,
        chain_id: U256,
        window: ValidityWindow,
    ) -> Result<B256> {
        safe_operation_hash(
            operation,
            chain_id,
            self.config.safe_4337_module,
            self.config.entry_point,
            window,
        )
    }
}
