//! secp256k1 signing and recovery
//!
//! Point arithmetic and nonce generation are delegated to `k256`; this module
//! only fixes the canonical form. Every signature leaving [`sign_hash`] has
//! `s <= n/2`, with the recovery id flipped whenever `s` had to be negated.

use crate::types::keccak256;
use crate::{Error, Result, Signature};
use alloy_primitives::{Address, B256, U256, uint};
use k256::FieldBytes;
use k256::ecdsa::{RecoveryId, Signature as EcdsaSignature, SigningKey, VerifyingKey};
use k256::elliptic_curve::sec1::{FromEncodedPoint, ToEncodedPoint};

/// Half of the secp256k1 group order
pub const SECP256K1_HALF_ORDER: U256 =
    uint!(0x7fffffffffffffffffffffffffffffff5d576e7357a4501ddfe92f46681b20a0_U256);

/// Parse a 32-byte private key
pub fn signing_key_from_bytes(bytes: &[u8]) -> Result<SigningKey> {
    if bytes.len() != 32 {
        return Err(Error::Crypto(format!(
            "Invalid private key: expected 32 bytes, got {}",
            bytes.len()
        )));
    }
    SigningKey::from_bytes(FieldBytes::from_slice(bytes))
        .map_err(|e| Error::Crypto(format!("Invalid private key: {}", e)))
}

/// Sign a 32-byte digest, returning a low-S recoverable signature
pub fn sign_hash(key: &SigningKey, hash: &B256) -> Result<Signature> {
    let (signature, recovery_id) = key
        .sign_prehash_recoverable(hash.as_slice())
        .map_err(|e| Error::Crypto(format!("Signing failed: {}", e)))?;

    let (signature, recovery_id) = match signature.normalize_s() {
        Some(normalized) => (
            normalized,
            RecoveryId::new(!recovery_id.is_y_odd(), recovery_id.is_x_reduced()),
        ),
        None => (signature, recovery_id),
    };

    let bytes = signature.to_bytes();
    let mut r = [0u8; 32];
    let mut s = [0u8; 32];
    r.copy_from_slice(&bytes[..32]);
    s.copy_from_slice(&bytes[32..]);

    Ok(Signature::new(r, s, recovery_id.to_byte()))
}

/// Recover the signer address of a digest
pub fn recover_address(hash: &B256, signature: &Signature) -> Result<Address> {
    let ecdsa = EcdsaSignature::from_slice(&signature.to_bytes())
        .map_err(|e| Error::InvalidSignature(e.to_string()))?;
    let recovery_id = RecoveryId::from_byte(signature.recovery_id).ok_or_else(|| {
        Error::InvalidSignature(format!("invalid recovery id {}", signature.recovery_id))
    })?;

    let key = VerifyingKey::recover_from_prehash(hash.as_slice(), &ecdsa, recovery_id)
        .map_err(|e| Error::Crypto(format!("Recovery failed: {}", e)))?;

    Ok(verifying_key_to_address(&key))
}

/// Address controlled by a private key
pub fn address_of(key: &SigningKey) -> Address {
    verifying_key_to_address(key.verifying_key())
}

/// Address of an uncompressed, compressed or raw 64-byte public key
pub fn public_key_to_address(public_key: &[u8]) -> Result<Address> {
    let raw = match public_key.len() {
        33 => {
            let point = k256::EncodedPoint::from_bytes(public_key)
                .map_err(|e| Error::Crypto(format!("Invalid public key: {}", e)))?;
            let affine: k256::AffinePoint =
                Option::from(k256::AffinePoint::from_encoded_point(&point))
                    .ok_or_else(|| Error::Crypto("Failed to decompress public key".into()))?;
            affine.to_encoded_point(false).as_bytes()[1..].to_vec()
        }
        65 => public_key[1..].to_vec(),
        64 => public_key.to_vec(),
        len => {
            return Err(Error::Crypto(format!("Invalid public key length: {}", len)));
        }
    };

    Ok(Address::from_slice(&keccak256(&raw)[12..]))
}

/// Whether `s` is in the lower half of the group order
pub fn is_low_s(signature: &Signature) -> bool {
    signature.s_u256() <= SECP256K1_HALF_ORDER
}

fn verifying_key_to_address(key: &VerifyingKey) -> Address {
    let point = key.to_encoded_point(false);
    Address::from_slice(&keccak256(&point.as_bytes()[1..])[12..])
}
