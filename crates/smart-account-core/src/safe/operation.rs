//! SafeOp hashing
//!
//! The 4337 module does not sign the EntryPoint hash. Owners sign an EIP-712
//! `SafeOp` under the domain `(chainId, module)`, which adds the validity
//! window and the EntryPoint to the operation fields.

use crate::abi::{AbiType, AbiValue};
use crate::eip712::{ValidityWindow, domain_separator, encode_struct, hash_word, typed_data_hash};
use crate::types::keccak256;
use crate::user_op::{UserOperation, UserOperationV7};
use crate::Result;
use alloy_primitives::{Address, B256, U256};
use tracing::debug;

/// SafeOp schema of module v0.2.0 (EntryPoint v0.6)
pub const SAFE_OP_TYPE_V6: &str = "SafeOp(address safe,uint256 nonce,bytes initCode,bytes callData,uint256 callGasLimit,uint256 verificationGasLimit,uint256 preVerificationGas,uint256 maxFeePerGas,uint256 maxPriorityFeePerGas,bytes paymasterAndData,uint48 validAfter,uint48 validUntil,address entryPoint)";

/// SafeOp schema of module v0.3.0 (EntryPoint v0.7 and later)
pub const SAFE_OP_TYPE_V7: &str = "SafeOp(address safe,uint256 nonce,bytes initCode,bytes callData,uint128 verificationGasLimit,uint128 callGasLimit,uint256 preVerificationGas,uint128 maxPriorityFeePerGas,uint128 maxFeePerGas,bytes paymasterAndData,uint48 validAfter,uint48 validUntil,address entryPoint)";

fn hashed(data: &[u8]) -> AbiValue {
    hash_word(keccak256(data))
}

fn packed_struct_hash(
    op: &UserOperationV7,
    entry_point: Address,
    window: &ValidityWindow,
) -> Result<B256> {
    encode_struct(
        SAFE_OP_TYPE_V7,
        &[
            AbiType::Address,
            AbiType::uint256(),
            AbiType::FixedBytes(32),
            AbiType::FixedBytes(32),
            AbiType::Uint(128),
            AbiType::Uint(128),
            AbiType::uint256(),
            AbiType::Uint(128),
            AbiType::Uint(128),
            AbiType::FixedBytes(32),
            AbiType::Uint(48),
            AbiType::Uint(48),
            AbiType::Address,
        ],
        &[
            AbiValue::Address(op.sender),
            AbiValue::Uint(op.nonce),
            hashed(&op.init_code()),
            hashed(&op.call_data),
            AbiValue::Uint(op.verification_gas_limit),
            AbiValue::Uint(op.call_gas_limit),
            AbiValue::Uint(op.pre_verification_gas),
            AbiValue::Uint(op.max_priority_fee_per_gas),
            AbiValue::Uint(op.max_fee_per_gas),
            hashed(&op.paymaster_and_data()?),
            AbiValue::uint(window.valid_after()),
            AbiValue::uint(window.valid_until()),
            AbiValue::Address(entry_point),
        ],
    )
}

/// EIP-712 hash of the SafeOp for an operation
///
/// v0.8 operations use the v0.7 schema; their authorization is not part of
/// the SafeOp.
pub fn safe_operation_hash(
    operation: &UserOperation,
    chain_id: U256,
    module: Address,
    entry_point: Address,
    window: ValidityWindow,
) -> Result<B256> {
    let struct_hash = match operation {
        UserOperation::V6(op) => encode_struct(
            SAFE_OP_TYPE_V6,
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
                AbiType::Uint(48),
                AbiType::Uint(48),
                AbiType::Address,
            ],
            &[
                AbiValue::Address(op.sender),
                AbiValue::Uint(op.nonce),
                hashed(&op.init_code),
                hashed(&op.call_data),
                AbiValue::Uint(op.call_gas_limit),
                AbiValue::Uint(op.verification_gas_limit),
                AbiValue::Uint(op.pre_verification_gas),
                AbiValue::Uint(op.max_fee_per_gas),
                AbiValue::Uint(op.max_priority_fee_per_gas),
                hashed(&op.paymaster_and_data),
                AbiValue::uint(window.valid_after()),
                AbiValue::uint(window.valid_until()),
                AbiValue::Address(entry_point),
            ],
        )?,
        UserOperation::V7(op) => packed_struct_hash(op, entry_point, &window)?,
        UserOperation::V8(op) => packed_struct_hash(&op.packed, entry_point, &window)?,
    };

    let hash = typed_data_hash(&domain_separator(chain_id, module), &struct_hash);

    debug!(
        version = %operation.version(),
        safe = %operation.sender(),
        hash = %hash,
        "Computed SafeOp hash"
    );

    Ok(hash)
}
