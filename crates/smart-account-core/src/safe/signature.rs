//! Multi-signer signature assembly
//!
//! Safe verifies owner signatures as one blob:
//!
//! ```text
//! | slot 0 (65) | slot 1 (65) | ... | slot N-1 (65) | len || payload | len || payload | ...
//! ```
//!
//! Slots are ordered by ascending signer address. An inline ECDSA slot holds
//! `r || s || v`. A contract slot holds the verifier address as a word, the
//! offset of its payload (from the start of the blob) and a `0x00` type byte;
//! the payload itself lives in the trailer as a length word followed by the
//! raw bytes.

use super::SignerIdentity;
use super::webauthn::{dummy_webauthn_signature, verifier_proxy_address};
use crate::config::WebAuthnConfig;
use crate::eip712::ValidityWindow;
use crate::types::{address_word, uint_word};
use crate::{Error, Result};
use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Size of one fixed signature slot
pub const SLOT_LEN: usize = 65;

/// Type byte of a contract signature slot
pub const CONTRACT_SIGNATURE_TYPE: u8 = 0x00;

/// Whether the account is being created by this operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountContext {
    /// First operation: passkeys are verified by the shared signer
    Initialization,
    /// Deployed account: passkeys are verified by their own signer proxy
    Deployed,
}

/// One owner's raw signature
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignerSignaturePair {
    pub signer: SignerIdentity,
    #[serde(with = "crate::types::bytes_hex")]
    pub signature: Vec<u8>,
    /// Force contract (EIP-1271) verification for a plain key
    #[serde(default)]
    pub is_contract_signature: bool,
}

impl SignerSignaturePair {
    pub fn new(signer: SignerIdentity, signature: Vec<u8>) -> Self {
        Self {
            signer,
            signature,
            is_contract_signature: false,
        }
    }

    /// Mark the signature as a contract signature
    pub fn as_contract_signature(mut self) -> Self {
        self.is_contract_signature = true;
        self
    }

    fn is_contract(&self) -> bool {
        self.is_contract_signature || self.signer.is_contract()
    }
}

/// One laid-out slot and its trailer fragment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureSlot {
    /// Resolved signer address (the sort key)
    pub signer: Address,
    pub slot: [u8; SLOT_LEN],
    /// `len || payload` for contract signatures, empty for inline ones
    pub trailer: Vec<u8>,
}

/// On-chain address verifying a signer's signatures
pub fn resolve_signer(
    identity: &SignerIdentity,
    context: Option<AccountContext>,
    webauthn: &WebAuthnConfig,
) -> Result<Address> {
    match identity {
        SignerIdentity::PlainKey(address) | SignerIdentity::Contract(address) => Ok(*address),
        SignerIdentity::Passkey(passkey) => match context {
            Some(AccountContext::Initialization) => Ok(webauthn.shared_signer),
            Some(AccountContext::Deployed) => verifier_proxy_address(passkey, webauthn),
            None => Err(Error::AmbiguousSigner(
                "passkey signer requires an explicit account context".into(),
            )),
        },
    }
}

/// Sort pairings by resolved signer and compute each slot and trailer
pub fn layout_signatures(
    pairs: &[SignerSignaturePair],
    context: Option<AccountContext>,
    webauthn: &WebAuthnConfig,
) -> Result<Vec<SignatureSlot>> {
    let mut resolved = pairs
        .iter()
        .map(|pair| Ok((resolve_signer(&pair.signer, context, webauthn)?, pair)))
        .collect::<Result<Vec<_>>>()?;
    resolved.sort_by_key(|(signer, _)| *signer);

    if let Some(pair) = resolved.windows(2).find(|w| w[0].0 == w[1].0) {
        return Err(Error::InvalidConfig(format!("duplicate signer {}", pair[0].0)));
    }

    let (slots, _) = resolved.into_iter().try_fold(
        (Vec::with_capacity(pairs.len()), SLOT_LEN * pairs.len()),
        |(mut slots, offset), (signer, pair)| {
            let (slot, trailer) = if pair.is_contract() {
                contract_slot(signer, offset, &pair.signature)
            } else {
                (inline_slot(&pair.signature)?, Vec::new())
            };
            let next = offset + trailer.len();
            slots.push(SignatureSlot {
                signer,
                slot,
                trailer,
            });
            Ok::<_, Error>((slots, next))
        },
    )?;

    Ok(slots)
}

/// Serialize every slot followed by every trailer fragment
pub fn assemble_signatures(
    pairs: &[SignerSignaturePair],
    context: Option<AccountContext>,
    webauthn: &WebAuthnConfig,
) -> Result<Vec<u8>> {
    let slots = layout_signatures(pairs, context, webauthn)?;

    let mut out: Vec<u8> = slots.iter().flat_map(|s| s.slot).collect();
    for slot in &slots {
        out.extend_from_slice(&slot.trailer);
    }

    debug!(
        signers = slots.len(),
        length = out.len(),
        "Assembled multi-signer signature"
    );

    Ok(out)
}

/// `uint48 validAfter || uint48 validUntil || signatures`
pub fn format_safe_signature(window: &ValidityWindow, signatures: &[u8]) -> Vec<u8> {
    let mut out = window.to_packed().to_vec();
    out.extend_from_slice(signatures);
    out
}

fn inline_slot(signature: &[u8]) -> Result<[u8; SLOT_LEN]> {
    signature.try_into().map_err(|_| {
        Error::InvalidSignature(format!(
            "inline signature must be {} bytes, got {}",
            SLOT_LEN,
            signature.len()
        ))
    })
}

fn contract_slot(signer: Address, offset: usize, payload: &[u8]) -> ([u8; SLOT_LEN], Vec<u8>) {
    let mut slot = [0u8; SLOT_LEN];
    slot[..32].copy_from_slice(&address_word(&signer));
    slot[32..64].copy_from_slice(&uint_word(U256::from(offset)));
    slot[64] = CONTRACT_SIGNATURE_TYPE;

    let mut trailer = uint_word(U256::from(payload.len())).to_vec();
    trailer.extend_from_slice(payload);
    (slot, trailer)
}

/// ECDSA signature of realistic size for gas estimation
pub fn dummy_ecdsa_signature() -> [u8; SLOT_LEN] {
    let mut sig = [0u8; SLOT_LEN];
    sig[..15].fill(0xff);
    sig[15] = 0xf0;
    sig[32] = 0x7a;
    sig[33..64].fill(0xaa);
    sig[64] = 0x1c;
    sig
}

/// Assembled dummy signatures for every owner, for gas estimation
pub fn dummy_signatures(
    owners: &[SignerIdentity],
    context: Option<AccountContext>,
    webauthn: &WebAuthnConfig,
) -> Result<Vec<u8>> {
    let pairs = owners
        .iter()
        .map(|owner| {
            let signature = match owner {
                SignerIdentity::Passkey(_) => dummy_webauthn_signature()?,
                SignerIdentity::PlainKey(_) | SignerIdentity::Contract(_) => {
                    dummy_ecdsa_signature().to_vec()
                }
            };
            Ok(SignerSignaturePair::new(*owner, signature))
        })
        .collect::<Result<Vec<_>>>()?;
    assemble_signatures(&pairs, context, webauthn)
}
