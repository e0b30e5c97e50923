//! # EIP-7702 Delegation Codec
//!
//! Delegation authorizations and type-4 (set-code) transaction envelopes.
//!
//! - authorization hash: `keccak256(0x05 || rlp([chain_id, address, nonce]))`
//! - signing hash: `keccak256(0x04 || rlp([chain_id, nonce, max_priority_fee_per_gas,
//!   max_fee_per_gas, gas_limit, destination, value, data, access_list, authorization_list]))`
//! - raw transaction: `0x04 || rlp([..fields, y_parity, r, s])`
//!
//! ```rust,ignore
//! use smart_account_core::eip7702::{sign_delegation_authorization, Eip7702Transaction};
//!
//! let auth = sign_delegation_authorization(U256::from(1), delegatee, U256::ZERO, &key)?;
//! let raw = Eip7702Transaction::new(U256::from(1), U256::from(1), eoa.as_slice())?
//!     .with_fees(1_000_000_000, 30_000_000_000)
//!     .with_authorization(auth)
//!     .build_raw_transaction(&key)?;
//! ```

use crate::signer::{recover_address, sign_hash};
use crate::types::{address_from_bytes, keccak256, u256_to_u64};
use crate::{Error, Result, Signature};
use alloy_primitives::{Address, B256, Bytes, U256};
use alloy_rlp::{Decodable, Encodable, Header, RlpDecodable, RlpEncodable};
use k256::ecdsa::SigningKey;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Prefix byte of the authorization signing pre-image
pub const AUTHORIZATION_MAGIC: u8 = 0x05;

/// Typed-transaction byte of a set-code transaction
pub const EIP7702_TX_TYPE: u8 = 0x04;

// ============================================================================
// Authorization
// ============================================================================

/// Unsigned delegation tuple `[chain_id, address, nonce]`
#[derive(Debug, Clone, PartialEq, Eq, RlpEncodable, RlpDecodable, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Authorization {
    /// Chain the delegation is valid on (0 = any chain)
    pub chain_id: u64,
    /// Delegatee contract whose code the account adopts
    pub address: Address,
    /// Current transaction count of the authorizing account
    pub nonce: u64,
}

impl Authorization {
    /// Create an authorization, checking both counters fit in 64 bits
    pub fn new(chain_id: U256, address: Address, nonce: U256) -> Result<Self> {
        Ok(Self {
            chain_id: u256_to_u64(chain_id, "chain id")?,
            address,
            nonce: u256_to_u64(nonce, "nonce")?,
        })
    }

    /// `keccak256(0x05 || rlp(self))`
    pub fn signature_hash(&self) -> B256 {
        let mut encoded = vec![AUTHORIZATION_MAGIC];
        self.encode(&mut encoded);
        keccak256(&encoded)
    }

    /// Attach a signature
    pub fn into_signed(self, signature: &Signature) -> SignedAuthorization {
        SignedAuthorization {
            chain_id: self.chain_id,
            address: self.address,
            nonce: self.nonce,
            y_parity: signature.recovery_id,
            r: signature.r_u256(),
            s: signature.s_u256(),
        }
    }
}

/// Signed delegation tuple `[chain_id, address, nonce, y_parity, r, s]`
#[derive(Debug, Clone, PartialEq, Eq, RlpEncodable, RlpDecodable, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedAuthorization {
    pub chain_id: u64,
    pub address: Address,
    pub nonce: u64,
    pub y_parity: u8,
    pub r: U256,
    pub s: U256,
}

impl SignedAuthorization {
    /// The unsigned tuple
    pub fn authorization(&self) -> Authorization {
        Authorization {
            chain_id: self.chain_id,
            address: self.address,
            nonce: self.nonce,
        }
    }

    /// The recoverable signature
    pub fn signature(&self) -> Signature {
        Signature::new(
            self.r.to_be_bytes::<32>(),
            self.s.to_be_bytes::<32>(),
            self.y_parity,
        )
    }

    /// Recover the account that signed this authorization
    pub fn recover_authority(&self) -> Result<Address> {
        recover_address(&self.authorization().signature_hash(), &self.signature())
    }

    /// JSON-RPC representation (`eip7702Auth`)
    pub fn to_rpc_format(&self) -> serde_json::Value {
        serde_json::json!({
            "chainId": format!("0x{:x}", self.chain_id),
            "address": self.address.to_string(),
            "nonce": format!("0x{:x}", self.nonce),
            "yParity": format!("0x{:x}", self.y_parity),
            "r": format!("0x{:x}", self.r),
            "s": format!("0x{:x}", self.s),
        })
    }
}

/// `keccak256(0x05 || rlp([chain_id, delegatee, nonce]))`
pub fn build_authorization_preimage(chain_id: U256, delegatee: Address, nonce: U256) -> Result<B256> {
    Ok(Authorization::new(chain_id, delegatee, nonce)?.signature_hash())
}

/// Sign a delegation of the key's account to `delegatee`
pub fn sign_delegation_authorization(
    chain_id: U256,
    delegatee: Address,
    nonce: U256,
    key: &SigningKey,
) -> Result<SignedAuthorization> {
    let authorization = Authorization::new(chain_id, delegatee, nonce)?;
    let signature = sign_hash(key, &authorization.signature_hash())?;

    debug!(
        chain_id = authorization.chain_id,
        delegatee = %delegatee,
        nonce = authorization.nonce,
        "Signed delegation authorization"
    );

    Ok(authorization.into_signed(&signature))
}

// ============================================================================
// Set-Code Transaction
// ============================================================================

/// Access list entry (EIP-2930)
#[derive(Debug, Clone, PartialEq, Eq, RlpEncodable, RlpDecodable)]
pub struct AccessListItem {
    pub address: Address,
    pub storage_keys: Vec<B256>,
}

/// Unsigned type-4 transaction
#[derive(Debug, Clone, PartialEq, Eq, RlpEncodable, RlpDecodable)]
pub struct Eip7702Transaction {
    pub chain_id: u64,
    pub nonce: u64,
    pub max_priority_fee_per_gas: u128,
    pub max_fee_per_gas: u128,
    pub gas_limit: u64,
    pub destination: Address,
    pub value: U256,
    pub data: Bytes,
    pub access_list: Vec<AccessListItem>,
    pub authorization_list: Vec<SignedAuthorization>,
}

impl Eip7702Transaction {
    /// Create a transaction to `destination`, which must be exactly 20 bytes
    pub fn new(chain_id: U256, nonce: U256, destination: &[u8]) -> Result<Self> {
        Ok(Self {
            chain_id: u256_to_u64(chain_id, "chain id")?,
            nonce: u256_to_u64(nonce, "nonce")?,
            max_priority_fee_per_gas: 0,
            max_fee_per_gas: 0,
            gas_limit: 100_000,
            destination: address_from_bytes(destination)?,
            value: U256::ZERO,
            data: Bytes::new(),
            access_list: Vec::new(),
            authorization_list: Vec::new(),
        })
    }

    /// Set priority and max fee per gas
    pub fn with_fees(mut self, max_priority_fee_per_gas: u128, max_fee_per_gas: u128) -> Self {
        self.max_priority_fee_per_gas = max_priority_fee_per_gas;
        self.max_fee_per_gas = max_fee_per_gas;
        self
    }

    /// Set gas limit
    pub fn with_gas_limit(mut self, gas_limit: u64) -> Self {
        self.gas_limit = gas_limit;
        self
    }

    /// Set value and call data
    pub fn with_call(mut self, value: U256, data: impl Into<Bytes>) -> Self {
        self.value = value;
        self.data = data.into();
        self
    }

    /// Append an access list entry
    pub fn with_access(mut self, address: Address, storage_keys: Vec<B256>) -> Self {
        self.access_list.push(AccessListItem {
            address,
            storage_keys,
        });
        self
    }

    /// Append a signed authorization
    pub fn with_authorization(mut self, authorization: SignedAuthorization) -> Self {
        self.authorization_list.push(authorization);
        self
    }

    /// `keccak256(0x04 || rlp(fields))`
    pub fn signing_hash(&self) -> B256 {
        let mut encoded = vec![EIP7702_TX_TYPE];
        self.encode(&mut encoded);
        keccak256(&encoded)
    }

    /// Encode the transaction with signature
    pub fn encode_signed(&self, signature: &Signature) -> Vec<u8> {
        let mut stream = alloy_rlp::BytesMut::new();

        Header {
            list: true,
            payload_length: self.rlp_payload_length() + signature_rlp_length(signature),
        }
        .encode(&mut stream);

        self.chain_id.encode(&mut stream);
        self.nonce.encode(&mut stream);
        self.max_priority_fee_per_gas.encode(&mut stream);
        self.max_fee_per_gas.encode(&mut stream);
        self.gas_limit.encode(&mut stream);
        self.destination.encode(&mut stream);
        self.value.encode(&mut stream);
        self.data.encode(&mut stream);
        self.access_list.encode(&mut stream);
        self.authorization_list.encode(&mut stream);

        signature.recovery_id.encode(&mut stream);
        signature.r_u256().encode(&mut stream);
        signature.s_u256().encode(&mut stream);

        let mut result = vec![EIP7702_TX_TYPE];
        result.extend_from_slice(&stream);
        result
    }

    /// Sign and serialize, ready for `eth_sendRawTransaction`
    pub fn build_raw_transaction(&self, key: &SigningKey) -> Result<Vec<u8>> {
        let signature = sign_hash(key, &self.signing_hash())?;
        let raw = self.encode_signed(&signature);

        debug!(
            tx_hash = %transaction_hash(&raw),
            authorizations = self.authorization_list.len(),
            "Built set-code transaction"
        );

        Ok(raw)
    }

    /// Parse a signed envelope back into its fields and signature
    pub fn decode_signed(raw: &[u8]) -> Result<(Self, Signature)> {
        let Some((&tx_type, mut buf)) = raw.split_first() else {
            return Err(Error::Deserialization("empty transaction".into()));
        };
        if tx_type != EIP7702_TX_TYPE {
            return Err(Error::Deserialization(format!(
                "expected transaction type 0x04, got 0x{:02x}",
                tx_type
            )));
        }

        let header = Header::decode(&mut buf)?;
        if !header.list || header.payload_length != buf.len() {
            return Err(Error::Deserialization("malformed transaction list".into()));
        }

        let tx = Self {
            chain_id: Decodable::decode(&mut buf)?,
            nonce: Decodable::decode(&mut buf)?,
            max_priority_fee_per_gas: Decodable::decode(&mut buf)?,
            max_fee_per_gas: Decodable::decode(&mut buf)?,
            gas_limit: Decodable::decode(&mut buf)?,
            destination: Decodable::decode(&mut buf)?,
            value: Decodable::decode(&mut buf)?,
            data: Decodable::decode(&mut buf)?,
            access_list: Decodable::decode(&mut buf)?,
            authorization_list: Decodable::decode(&mut buf)?,
        };
        let y_parity = u8::decode(&mut buf)?;
        let r = U256::decode(&mut buf)?;
        let s = U256::decode(&mut buf)?;

        if !buf.is_empty() {
            return Err(Error::Deserialization("trailing transaction bytes".into()));
        }

        Ok((
            tx,
            Signature::new(r.to_be_bytes::<32>(), s.to_be_bytes::<32>(), y_parity),
        ))
    }

    fn rlp_payload_length(&self) -> usize {
        self.chain_id.length()
            + self.nonce.length()
            + self.max_priority_fee_per_gas.length()
            + self.max_fee_per_gas.length()
            + self.gas_limit.length()
            + self.destination.length()
            + self.value.length()
            + self.data.length()
            + self.access_list.length()
            + self.authorization_list.length()
    }
}

fn signature_rlp_length(sig: &Signature) -> usize {
    sig.recovery_id.length() + sig.r_u256().length() + sig.s_u256().length()
}

/// Hash of a serialized typed transaction
pub fn transaction_hash(raw: &[u8]) -> B256 {
    keccak256(raw)
}

/// Recover the sender of a signed set-code transaction
pub fn recover_transaction_signer(raw: &[u8]) -> Result<Address> {
    let (tx, signature) = Eip7702Transaction::decode_signed(raw)?;
    recover_address(&tx.signing_hash(), &signature)
}
