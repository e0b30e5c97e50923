//! # ERC-4337 User Operations
//!
//! Pending operations in the three EntryPoint wire shapes, with their
//! canonical hashes:
//!
//! - v0.6: `keccak256(abi.encode(keccak256(pack(op)), entryPoint, chainId))`
//!   over unpacked gas fields and single `initCode`/`paymasterAndData` blobs
//! - v0.7: the same nested hash, with split factory/paymaster fields packed
//!   into `initCode`, `accountGasLimits`, `gasFees` and `paymasterAndData`
//! - v0.8: EIP-712 typed hash of the v0.7 packing under the
//!   `("ERC4337", "1", chainId, entryPoint)` domain
//!
//! Every field except `signature` feeds the hash, so changing any of them
//! after signing invalidates the signature.

use crate::abi::{AbiType, AbiValue, encode_params};
use crate::config::{EIP7702_FACTORY_MARKER, EntryPointVersion};
use crate::eip712::{hash_word, named_domain_separator, typed_data_hash};
use crate::eip7702::SignedAuthorization;
use crate::types::{bytes_hex, keccak256, u256_to_u128};
use crate::{Error, Result};
use alloy_primitives::{Address, B256, U256};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// EIP-712 type of the v0.8 packed operation
pub const PACKED_USER_OPERATION_TYPE: &str = "PackedUserOperation(address sender,uint256 nonce,bytes initCode,bytes callData,bytes32 accountGasLimits,uint256 preVerificationGas,bytes32 gasFees,bytes paymasterAndData)";

// ============================================================================
// Packing helpers
// ============================================================================

/// Pack two 128-bit values into one word (`high << 128 | low`)
pub fn pack_uint128_pair(high: U256, low: U256, field: &str) -> Result<B256> {
    let high = u256_to_u128(high, field)?;
    let low = u256_to_u128(low, field)?;
    let mut word = [0u8; 32];
    word[..16].copy_from_slice(&high.to_be_bytes());
    word[16..].copy_from_slice(&low.to_be_bytes());
    Ok(B256::from(word))
}

/// `verificationGasLimit << 128 | callGasLimit`
pub fn pack_account_gas_limits(verification_gas_limit: U256, call_gas_limit: U256) -> Result<B256> {
    pack_uint128_pair(verification_gas_limit, call_gas_limit, "accountGasLimits")
}

/// `maxPriorityFeePerGas << 128 | maxFeePerGas`
pub fn pack_gas_fees(max_priority_fee_per_gas: U256, max_fee_per_gas: U256) -> Result<B256> {
    pack_uint128_pair(max_priority_fee_per_gas, max_fee_per_gas, "gasFees")
}

/// `paymaster || uint128 verificationGas || uint128 postOpGas || data`
pub fn pack_paymaster_and_data(
    paymaster: Address,
    verification_gas_limit: U256,
    post_op_gas_limit: U256,
    data: &[u8],
) -> Result<Vec<u8>> {
    let gas = pack_uint128_pair(verification_gas_limit, post_op_gas_limit, "paymaster gas")?;
    let mut packed = paymaster.to_vec();
    packed.extend_from_slice(gas.as_slice());
    packed.extend_from_slice(data);
    Ok(packed)
}

fn hex_quantity(value: U256) -> String {
    format!("0x{:x}", value)
}

fn hex_bytes(data: &[u8]) -> String {
    format!("0x{}", hex::encode(data))
}

/// `keccak256(abi.encode(innerHash, entryPoint, chainId))`
fn entry_point_hash(inner: B256, entry_point: Address, chain_id: U256) -> Result<B256> {
    let encoded = encode_params(
        &[AbiType::FixedBytes(32), AbiType::Address, AbiType::uint256()],
        &[
            hash_word(inner),
            AbiValue::Address(entry_point),
            AbiValue::Uint(chain_id),
        ],
    )?;
    Ok(keccak256(encoded))
}

// ============================================================================
// v0.6
// ============================================================================

/// ERC-4337 UserOperation (v0.6 format)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserOperationV6 {
    /// Smart account address
    pub sender: Address,
    /// Anti-replay nonce
    pub nonce: U256,
    /// Factory address followed by factory call data (empty if deployed)
    #[serde(with = "bytes_hex")]
    pub init_code: Vec<u8>,
    /// Encoded call to execute
    #[serde(with = "bytes_hex")]
    pub call_data: Vec<u8>,
    pub call_gas_limit: U256,
    pub verification_gas_limit: U256,
    pub pre_verification_gas: U256,
    pub max_fee_per_gas: U256,
    pub max_priority_fee_per_gas: U256,
    /// Paymaster and data (empty if self-paying)
    #[serde(with = "bytes_hex")]
    pub paymaster_and_data: Vec<u8>,
    #[serde(with = "bytes_hex")]
    pub signature: Vec<u8>,
}

impl UserOperationV6 {
    /// Create a new UserOperation with placeholder gas values
    pub fn new(sender: Address, nonce: U256, call_data: Vec<u8>) -> Self {
        Self {
            sender,
            nonce,
            init_code: vec![],
            call_data,
            call_gas_limit: U256::from(100000),
            verification_gas_limit: U256::from(100000),
            pre_verification_gas: U256::from(21000),
            max_fee_per_gas: U256::ZERO,
            max_priority_fee_per_gas: U256::ZERO,
            paymaster_and_data: vec![],
            signature: vec![],
        }
    }

    /// Set init code for account deployment
    pub fn with_init_code(mut self, factory: Address, factory_data: &[u8]) -> Self {
        let mut init_code = factory.to_vec();
        init_code.extend_from_slice(factory_data);
        self.init_code = init_code;
        self
    }

    /// Set gas limits
    pub fn with_gas_limits(
        mut self,
        call_gas: u64,
        verification_gas: u64,
        pre_verification_gas: u64,
    ) -> Self {
        self.call_gas_limit = U256::from(call_gas);
        self.verification_gas_limit = U256::from(verification_gas);
        self.pre_verification_gas = U256::from(pre_verification_gas);
        self
    }

    /// Set gas prices
    pub fn with_gas_prices(mut self, max_fee: u128, max_priority_fee: u128) -> Self {
        self.max_fee_per_gas = U256::from(max_fee);
        self.max_priority_fee_per_gas = U256::from(max_priority_fee);
        self
    }

    /// Set paymaster
    pub fn with_paymaster(mut self, paymaster: Address, data: &[u8]) -> Self {
        let mut paymaster_and_data = paymaster.to_vec();
        paymaster_and_data.extend_from_slice(data);
        self.paymaster_and_data = paymaster_and_data;
        self
    }

    /// Calculate the UserOperation hash for signing
    pub fn hash(&self, entry_point: Address, chain_id: U256) -> Result<B256> {
        let packed = encode_params(
            &[
                AbiType::Address,
                AbiType::uint256(),
                AbiType::FixedBytes(32),
                AbiType::FixedBytes(32),
                AbiType::uint256(),
                AbiType::uint256(),
                AbiType::uint256(),
                AbiType::uint256(),
                AbiType::uint256(),
                AbiType::FixedBytes(32),
            ],
            &[
                AbiValue::Address(self.sender),
                AbiValue::Uint(self.nonce),
                hash_word(keccak256(&self.init_code)),
                hash_word(keccak256(&self.call_data)),
                AbiValue::Uint(self.call_gas_limit),
                AbiValue::Uint(self.verification_gas_limit),
                AbiValue::Uint(self.pre_verification_gas),
                AbiValue::Uint(self.max_fee_per_gas),
                AbiValue::Uint(self.max_priority_fee_per_gas),
                hash_word(keccak256(&self.paymaster_and_data)),
            ],
        )?;
        entry_point_hash(keccak256(packed), entry_point, chain_id)
    }

    /// Convert to JSON-RPC format
    pub fn to_rpc_format(&self) -> serde_json::Value {
        serde_json::json!({
            "sender": self.sender.to_string(),
            "nonce": hex_quantity(self.nonce),
            "initCode": hex_bytes(&self.init_code),
            "callData": hex_bytes(&self.call_data),
            "callGasLimit": hex_quantity(self.call_gas_limit),
            "verificationGasLimit": hex_quantity(self.verification_gas_limit),
            "preVerificationGas": hex_quantity(self.pre_verification_gas),
            "maxFeePerGas": hex_quantity(self.max_fee_per_gas),
            "maxPriorityFeePerGas": hex_quantity(self.max_priority_fee_per_gas),
            "paymasterAndData": hex_bytes(&self.paymaster_and_data),
            "signature": hex_bytes(&self.signature),
        })
    }
}

// ============================================================================
// v0.7
// ============================================================================

/// ERC-4337 UserOperation (v0.7 format)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserOperationV7 {
    pub sender: Address,
    pub nonce: U256,
    /// Account factory (None if deployed)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub factory: Option<Address>,
    #[serde(with = "bytes_hex", default)]
    pub factory_data: Vec<u8>,
    #[serde(with = "bytes_hex")]
    pub call_data: Vec<u8>,
    pub call_gas_limit: U256,
    pub verification_gas_limit: U256,
    pub pre_verification_gas: U256,
    pub max_fee_per_gas: U256,
    pub max_priority_fee_per_gas: U256,
    /// Sponsoring paymaster (None if self-paying)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paymaster: Option<Address>,
    #[serde(default)]
    pub paymaster_verification_gas_limit: U256,
    #[serde(default)]
    pub paymaster_post_op_gas_limit: U256,
    #[serde(with = "bytes_hex", default)]
    pub paymaster_data: Vec<u8>,
    #[serde(with = "bytes_hex")]
    pub signature: Vec<u8>,
}

impl UserOperationV7 {
    /// Create a new UserOperation with placeholder gas values
    pub fn new(sender: Address, nonce: U256, call_data: Vec<u8>) -> Self {
        Self {
            sender,
            nonce,
            factory: None,
            factory_data: vec![],
            call_data,
            call_gas_limit: U256::from(100000),
            verification_gas_limit: U256::from(100000),
            pre_verification_gas: U256::from(21000),
            max_fee_per_gas: U256::ZERO,
            max_priority_fee_per_gas: U256::ZERO,
            paymaster: None,
            paymaster_verification_gas_limit: U256::ZERO,
            paymaster_post_op_gas_limit: U256::ZERO,
            paymaster_data: vec![],
            signature: vec![],
        }
    }

    /// Set factory and factory data for account deployment
    pub fn with_factory(mut self, factory: Address, factory_data: Vec<u8>) -> Self {
        self.factory = Some(factory);
        self.factory_data = factory_data;
        self
    }

    /// Set gas limits
    pub fn with_gas_limits(
        mut self,
        call_gas: u64,
        verification_gas: u64,
        pre_verification_gas: u64,
    ) -> Self {
        self.call_gas_limit = U256::from(call_gas);
        self.verification_gas_limit = U256::from(verification_gas);
        self.pre_verification_gas = U256::from(pre_verification_gas);
        self
    }

    /// Set gas prices
    pub fn with_gas_prices(mut self, max_fee: u128, max_priority_fee: u128) -> Self {
        self.max_fee_per_gas = U256::from(max_fee);
        self.max_priority_fee_per_gas = U256::from(max_priority_fee);
        self
    }

    /// Set paymaster with its gas limits and data
    pub fn with_paymaster(
        mut self,
        paymaster: Address,
        verification_gas_limit: u64,
        post_op_gas_limit: u64,
        data: Vec<u8>,
    ) -> Self {
        self.paymaster = Some(paymaster);
        self.paymaster_verification_gas_limit = U256::from(verification_gas_limit);
        self.paymaster_post_op_gas_limit = U256::from(post_op_gas_limit);
        self.paymaster_data = data;
        self
    }

    /// `factory || factoryData`, empty without a factory
    pub fn init_code(&self) -> Vec<u8> {
        match self.factory {
            Some(factory) => {
                let mut init_code = factory.to_vec();
                init_code.extend_from_slice(&self.factory_data);
                init_code
            }
            None => Vec::new(),
        }
    }

    /// Packed `paymasterAndData`, empty without a paymaster
    pub fn paymaster_and_data(&self) -> Result<Vec<u8>> {
        match self.paymaster {
            Some(paymaster) => pack_paymaster_and_data(
                paymaster,
                self.paymaster_verification_gas_limit,
                self.paymaster_post_op_gas_limit,
                &self.paymaster_data,
            ),
            None => Ok(Vec::new()),
        }
    }

    /// Packed `accountGasLimits`
    pub fn account_gas_limits(&self) -> Result<B256> {
        pack_account_gas_limits(self.verification_gas_limit, self.call_gas_limit)
    }

    /// Packed `gasFees`
    pub fn gas_fees(&self) -> Result<B256> {
        pack_gas_fees(self.max_priority_fee_per_gas, self.max_fee_per_gas)
    }

    /// Words of the packed operation with a caller-chosen init code hash
    fn packed_words(&self, init_code_hash: B256) -> Result<(Vec<AbiType>, Vec<AbiValue>)> {
        let types = vec![
            AbiType::Address,
            AbiType::uint256(),
            AbiType::FixedBytes(32),
            AbiType::FixedBytes(32),
            AbiType::FixedBytes(32),
            AbiType::uint256(),
            AbiType::FixedBytes(32),
            AbiType::FixedBytes(32),
        ];
        let values = vec![
            AbiValue::Address(self.sender),
            AbiValue::Uint(self.nonce),
            hash_word(init_code_hash),
            hash_word(keccak256(&self.call_data)),
            hash_word(self.account_gas_limits()?),
            AbiValue::Uint(self.pre_verification_gas),
            hash_word(self.gas_fees()?),
            hash_word(keccak256(self.paymaster_and_data()?)),
        ];
        Ok((types, values))
    }

    /// Calculate the UserOperation hash for signing
    pub fn hash(&self, entry_point: Address, chain_id: U256) -> Result<B256> {
        let (types, values) = self.packed_words(keccak256(self.init_code()))?;
        let packed = encode_params(&types, &values)?;
        entry_point_hash(keccak256(packed), entry_point, chain_id)
    }

    /// Convert to JSON-RPC format
    pub fn to_rpc_format(&self) -> serde_json::Value {
        let mut value = serde_json::json!({
            "sender": self.sender.to_string(),
            "nonce": hex_quantity(self.nonce),
            "callData": hex_bytes(&self.call_data),
            "callGasLimit": hex_quantity(self.call_gas_limit),
            "verificationGasLimit": hex_quantity(self.verification_gas_limit),
            "preVerificationGas": hex_quantity(self.pre_verification_gas),
            "maxFeePerGas": hex_quantity(self.max_fee_per_gas),
            "maxPriorityFeePerGas": hex_quantity(self.max_priority_fee_per_gas),
            "signature": hex_bytes(&self.signature),
        });

        if let Some(factory) = self.factory {
            value["factory"] = serde_json::json!(factory.to_string());
            value["factoryData"] = serde_json::json!(hex_bytes(&self.factory_data));
        }
        if let Some(paymaster) = self.paymaster {
            value["paymaster"] = serde_json::json!(paymaster.to_string());
            value["paymasterVerificationGasLimit"] =
                serde_json::json!(hex_quantity(self.paymaster_verification_gas_limit));
            value["paymasterPostOpGasLimit"] =
                serde_json::json!(hex_quantity(self.paymaster_post_op_gas_limit));
            value["paymasterData"] = serde_json::json!(hex_bytes(&self.paymaster_data));
        }

        value
    }
}

// ============================================================================
// v0.8
// ============================================================================

/// ERC-4337 UserOperation (v0.8 format): v0.7 fields plus an optional
/// EIP-7702 authorization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserOperationV8 {
    #[serde(flatten)]
    pub packed: UserOperationV7,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eip7702_auth: Option<SignedAuthorization>,
}

impl UserOperationV8 {
    /// Create a new UserOperation with placeholder gas values
    pub fn new(sender: Address, nonce: U256, call_data: Vec<u8>) -> Self {
        Self {
            packed: UserOperationV7::new(sender, nonce, call_data),
            eip7702_auth: None,
        }
    }

    /// Attach a delegation authorization; the factory becomes the 7702 marker
    pub fn with_authorization(mut self, authorization: SignedAuthorization) -> Self {
        if self.packed.factory.is_none() {
            self.packed.factory = Some(EIP7702_FACTORY_MARKER);
        }
        self.eip7702_auth = Some(authorization);
        self
    }

    /// Init code hash, substituting the delegatee for the 7702 marker
    fn init_code_hash(&self) -> Result<B256> {
        match self.packed.factory {
            Some(factory) if factory == EIP7702_FACTORY_MARKER => {
                let auth = self.eip7702_auth.as_ref().ok_or_else(|| {
                    Error::InvalidConfig("7702 factory marker without an authorization".into())
                })?;
                let mut init_code = auth.address.to_vec();
                init_code.extend_from_slice(&self.packed.factory_data);
                Ok(keccak256(init_code))
            }
            _ => Ok(keccak256(self.packed.init_code())),
        }
    }

    /// EIP-712 hash of the packed operation
    pub fn hash(&self, entry_point: Address, chain_id: U256) -> Result<B256> {
        let (mut types, mut values) = self.packed.packed_words(self.init_code_hash()?)?;
        types.insert(0, AbiType::FixedBytes(32));
        values.insert(0, hash_word(keccak256(PACKED_USER_OPERATION_TYPE.as_bytes())));

        let struct_hash = keccak256(encode_params(&types, &values)?);
        let domain = named_domain_separator("ERC4337", "1", chain_id, entry_point);
        Ok(typed_data_hash(&domain, &struct_hash))
    }

    /// Convert to JSON-RPC format
    pub fn to_rpc_format(&self) -> serde_json::Value {
        let mut value = self.packed.to_rpc_format();
        if let Some(auth) = &self.eip7702_auth {
            value["eip7702Auth"] = auth.to_rpc_format();
        }
        value
    }
}

// ============================================================================
// Versioned operation
// ============================================================================

/// A pending operation in one of the supported wire shapes
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum UserOperation {
    V6(UserOperationV6),
    V7(UserOperationV7),
    V8(UserOperationV8),
}

impl UserOperation {
    /// Wire shape of this operation
    pub fn version(&self) -> EntryPointVersion {
        match self {
            UserOperation::V6(_) => EntryPointVersion::V06,
            UserOperation::V7(_) => EntryPointVersion::V07,
            UserOperation::V8(_) => EntryPointVersion::V08,
        }
    }

    pub fn sender(&self) -> Address {
        match self {
            UserOperation::V6(op) => op.sender,
            UserOperation::V7(op) => op.sender,
            UserOperation::V8(op) => op.packed.sender,
        }
    }

    pub fn nonce(&self) -> U256 {
        match self {
            UserOperation::V6(op) => op.nonce,
            UserOperation::V7(op) => op.nonce,
            UserOperation::V8(op) => op.packed.nonce,
        }
    }

    pub fn call_data(&self) -> &[u8] {
        match self {
            UserOperation::V6(op) => &op.call_data,
            UserOperation::V7(op) => &op.call_data,
            UserOperation::V8(op) => &op.packed.call_data,
        }
    }

    /// Deployment payload as a single blob
    pub fn init_code(&self) -> Vec<u8> {
        match self {
            UserOperation::V6(op) => op.init_code.clone(),
            UserOperation::V7(op) => op.init_code(),
            UserOperation::V8(op) => op.packed.init_code(),
        }
    }

    /// Sponsorship payload as a single blob
    pub fn paymaster_and_data(&self) -> Result<Vec<u8>> {
        match self {
            UserOperation::V6(op) => Ok(op.paymaster_and_data.clone()),
            UserOperation::V7(op) => op.paymaster_and_data(),
            UserOperation::V8(op) => op.packed.paymaster_and_data(),
        }
    }

    pub fn signature(&self) -> &[u8] {
        match self {
            UserOperation::V6(op) => &op.signature,
            UserOperation::V7(op) => &op.signature,
            UserOperation::V8(op) => &op.packed.signature,
        }
    }

    /// Populate the signature field (the only field that may change after hashing)
    pub fn set_signature(&mut self, signature: Vec<u8>) {
        match self {
            UserOperation::V6(op) => op.signature = signature,
            UserOperation::V7(op) => op.signature = signature,
            UserOperation::V8(op) => op.packed.signature = signature,
        }
    }

    /// Builder form of [`UserOperation::set_signature`]
    pub fn with_signature(mut self, signature: Vec<u8>) -> Self {
        self.set_signature(signature);
        self
    }

    /// Canonical hash recomputed by the EntryPoint
    pub fn hash(&self, entry_point: Address, chain_id: U256) -> Result<B256> {
        let hash = match self {
            UserOperation::V6(op) => op.hash(entry_point, chain_id)?,
            UserOperation::V7(op) => op.hash(entry_point, chain_id)?,
            UserOperation::V8(op) => op.hash(entry_point, chain_id)?,
        };

        debug!(
            version = %self.version(),
            sender = %self.sender(),
            hash = %hash,
            "Computed user operation hash"
        );

        Ok(hash)
    }

    /// Convert to JSON-RPC format
    pub fn to_rpc_format(&self) -> serde_json::Value {
        match self {
            UserOperation::V6(op) => op.to_rpc_format(),
            UserOperation::V7(op) => op.to_rpc_format(),
            UserOperation::V8(op) => op.to_rpc_format(),
        }
    }
}

impl From<UserOperationV6> for UserOperation {
    fn from(op: UserOperationV6) -> Self {
        UserOperation::V6(op)
    }
}

impl From<UserOperationV7> for UserOperation {
    fn from(op: UserOperationV7) -> Self {
        UserOperation::V7(op)
    }
}

impl From<UserOperationV8> for UserOperation {
    fn from(op: UserOperationV8) -> Self {
        UserOperation::V8(op)
    }
}

/// Hash an operation for an EntryPoint of a declared version
pub fn hash_operation(
    operation: &UserOperation,
    entry_point: Address,
    chain_id: U256,
    version: EntryPointVersion,
) -> Result<B256> {
    if operation.version() != version {
        return Err(Error::VersionMismatch {
            expected: version.to_string(),
            actual: operation.version().to_string(),
        });
    }
    operation.hash(entry_point, chain_id)
}
