//! EIP-7702 delegated EOA accounts
//!
//! The EOA delegates its code to a minimal account implementation, then
//! executes through EntryPoint v0.8. The first operation carries the signed
//! authorization; its signature is the EOA's own 65-byte ECDSA signature over
//! the v0.8 hash.

use crate::abi::{AbiType, AbiValue, encode_call};
use crate::config::Simple7702Config;
use crate::eip7702::{SignedAuthorization, sign_delegation_authorization};
use crate::signer::{address_of, sign_hash};
use crate::types::{CallType, SubCall};
use crate::user_op::UserOperationV8;
use crate::{Error, Result};
use alloy_primitives::{Address, B256, U256};
use k256::ecdsa::SigningKey;

/// `execute(address,uint256,bytes)`
pub fn execute_call_data(call: &SubCall) -> Result<Vec<u8>> {
    encode_call(
        "execute",
        &[AbiType::Address, AbiType::uint256(), AbiType::Bytes],
        &[
            AbiValue::Address(call.to),
            AbiValue::Uint(call.value),
            AbiValue::Bytes(call.data.to_vec()),
        ],
    )
}

/// `executeBatch((address,uint256,bytes)[])`
pub fn execute_batch_call_data(calls: &[SubCall]) -> Result<Vec<u8>> {
    let call_type = AbiType::Tuple(vec![AbiType::Address, AbiType::uint256(), AbiType::Bytes]);
    let values = calls
        .iter()
        .map(|c| {
            AbiValue::Tuple(vec![
                AbiValue::Address(c.to),
                AbiValue::Uint(c.value),
                AbiValue::Bytes(c.data.to_vec()),
            ])
        })
        .collect();
    encode_call("executeBatch", &[AbiType::array(call_type)], &[AbiValue::Array(values)])
}

/// EOA account delegated to a Simple7702 implementation
#[derive(Debug, Clone)]
pub struct Simple7702Account {
    config: Simple7702Config,
    account: Address,
}

impl Simple7702Account {
    pub fn new(config: Simple7702Config, account: Address) -> Self {
        Self { config, account }
    }

    /// Account controlled by a private key
    pub fn from_key(config: Simple7702Config, key: &SigningKey) -> Self {
        Self::new(config, address_of(key))
    }

    pub fn address(&self) -> Address {
        self.account
    }

    pub fn config(&self) -> &Simple7702Config {
        &self.config
    }

    /// Call data for one call or a batch; delegate calls are not supported
    pub fn call_data(&self, calls: &[SubCall]) -> Result<Vec<u8>> {
        if calls.iter().any(|c| c.call_type == CallType::DelegateCall) {
            return Err(Error::InvalidConfig(
                "delegated accounts cannot execute delegate calls".into(),
            ));
        }
        match calls {
            [] => Err(Error::ParameterCount {
                expected: 1,
                actual: 0,
            }),
            [single] => execute_call_data(single),
            _ => execute_batch_call_data(calls),
        }
    }

    /// Sign the delegation of this account to the configured implementation
    pub fn sign_authorization(
        &self,
        chain_id: U256,
        account_nonce: U256,
        key: &SigningKey,
    ) -> Result<SignedAuthorization> {
        sign_delegation_authorization(chain_id, self.config.delegatee, account_nonce, key)
    }

    /// Unsigned operation, carrying the authorization if given
    pub fn user_operation(
        &self,
        calls: &[SubCall],
        nonce: U256,
        authorization: Option<SignedAuthorization>,
    ) -> Result<UserOperationV8> {
        let op = UserOperationV8::new(self.account, nonce, self.call_data(calls)?);
        Ok(match authorization {
            Some(auth) => op.with_authorization(auth),
            None => op,
        })
    }

    /// EntryPoint v0.8 hash
    pub fn operation_hash(&self, operation: &UserOperationV8, chain_id: U256) -> Result<B256> {
        operation.hash(self.config.entry_point, chain_id)
    }

    /// Hash and sign, storing the 65-byte signature in the operation
    pub fn sign_operation(
        &self,
        operation: &mut UserOperationV8,
        chain_id: U256,
        key: &SigningKey,
    ) -> Result<B256> {
        let hash = self.operation_hash(operation, chain_id)?;
        operation.packed.signature = sign_hash(key, &hash)?.to_rsv().to_vec();
        Ok(hash)
    }
}
