//! Passkey (WebAuthn / P-256) owners
//!
//! A passkey owner is represented on-chain by a signer proxy deployed by the
//! signer factory. Before the account exists, the shared signer stands in for
//! it and is configured during `setup`.

use crate::abi::{AbiType, AbiValue, encode_call, encode_params};
use crate::address::create2_address_from_code;
use crate::config::WebAuthnConfig;
use crate::{Error, Result};
use alloy_primitives::{Address, B256, U256};
use serde::{Deserialize, Serialize};

/// Length of a base64url-encoded 32-byte challenge
const CHALLENGE_LEN: usize = 43;

const CLIENT_DATA_PREFIX: &str = r#"{"type":"webauthn.get","challenge":""#;

/// Public key of a P-256 passkey
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PasskeyCoordinates {
    pub x: U256,
    pub y: U256,
}

/// `configure((x, y, verifiers))` on the shared signer
pub fn configure_call_data(passkey: &PasskeyCoordinates, config: &WebAuthnConfig) -> Result<Vec<u8>> {
    encode_call(
        "configure",
        &[AbiType::Tuple(vec![
            AbiType::uint256(),
            AbiType::uint256(),
            AbiType::Uint(176),
        ])],
        &[AbiValue::Tuple(vec![
            AbiValue::Uint(passkey.x),
            AbiValue::Uint(passkey.y),
            AbiValue::Uint(config.verifiers()),
        ])],
    )
}

/// Address of the signer proxy the factory deploys for this passkey
pub fn verifier_proxy_address(passkey: &PasskeyCoordinates, config: &WebAuthnConfig) -> Result<Address> {
    if config.signer_proxy_creation_code.is_empty() {
        return Err(Error::InvalidConfig(
            "signer proxy creation code is required to resolve a deployed passkey owner; \
             set it with `with_signer_proxy_creation_code` or sign as the proxy's contract address"
                .into(),
        ));
    }

    let constructor_args = encode_params(
        &[
            AbiType::Address,
            AbiType::uint256(),
            AbiType::uint256(),
            AbiType::Uint(176),
        ],
        &[
            AbiValue::Address(config.signer_singleton),
            AbiValue::Uint(passkey.x),
            AbiValue::Uint(passkey.y),
            AbiValue::Uint(config.verifiers()),
        ],
    )?;

    let mut init_code = config.signer_proxy_creation_code.clone();
    init_code.extend(constructor_args);

    Ok(create2_address_from_code(&config.signer_factory, &B256::ZERO, &init_code))
}

/// Client data JSON fields following the challenge, without the closing brace
///
/// The verifier rebuilds `clientDataJSON` from the challenge it computes
/// itself, so only the remaining fields travel in the signature.
pub fn extract_client_data_fields(client_data_json: &str) -> Result<String> {
    let malformed = || Error::InvalidSignature(format!("malformed client data: {}", client_data_json));

    let rest = client_data_json
        .strip_prefix(CLIENT_DATA_PREFIX)
        .ok_or_else(malformed)?;
    if rest.len() < CHALLENGE_LEN {
        return Err(malformed());
    }
    let (challenge, rest) = rest.split_at(CHALLENGE_LEN);
    let is_base64url = challenge
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
    if !is_base64url {
        return Err(malformed());
    }

    let fields = rest
        .strip_prefix("\",")
        .and_then(|r| r.strip_suffix('}'))
        .ok_or_else(malformed)?;
    Ok(fields.to_string())
}

/// `abi.encode(bytes authenticatorData, bytes clientDataFields, uint256[2] rs)`
pub fn encode_webauthn_signature(
    authenticator_data: &[u8],
    client_data_fields: &str,
    r: U256,
    s: U256,
) -> Result<Vec<u8>> {
    encode_params(
        &[
            AbiType::Bytes,
            AbiType::Bytes,
            AbiType::fixed_array(AbiType::uint256(), 2),
        ],
        &[
            AbiValue::Bytes(authenticator_data.to_vec()),
            AbiValue::Bytes(client_data_fields.as_bytes().to_vec()),
            AbiValue::FixedArray(vec![AbiValue::Uint(r), AbiValue::Uint(s)]),
        ],
    )
}

/// Passkey signature of realistic size for gas estimation
pub fn dummy_webauthn_signature() -> Result<Vec<u8>> {
    let mut authenticator_data = vec![0xfe; 32];
    authenticator_data.push(0x04);
    authenticator_data.extend_from_slice(&[0xff; 4]);

    encode_webauthn_signature(
        &authenticator_data,
        r#""origin":"https://safe.global","crossOrigin":false"#,
        U256::MAX,
        U256::MAX,
    )
}
