//! Unit tests for multi-signer signature assembly

use alloy_primitives::{Address, U256};
use smart_account_core::{
    AccountContext, Error, SignerIdentity, SignerSignaturePair, ValidityWindow, WebAuthnConfig,
    assemble_signatures,
    safe::{
        PasskeyCoordinates, format_safe_signature, layout_signatures,
        signature::{SLOT_LEN, dummy_signatures},
        verifier_proxy_address,
        webauthn::{encode_webauthn_signature, extract_client_data_fields},
    },
};

fn plain(byte: u8) -> SignerSignaturePair {
    SignerSignaturePair::new(
        SignerIdentity::PlainKey(Address::repeat_byte(byte)),
        vec![byte; SLOT_LEN],
    )
}

fn passkey() -> PasskeyCoordinates {
    PasskeyCoordinates {
        x: U256::from(0x1234),
        y: U256::from(0x5678),
    }
}

fn webauthn_with_code() -> WebAuthnConfig {
    WebAuthnConfig::default().with_signer_proxy_creation_code(vec![0x60, 0x80, 0x60, 0x40])
}

#[test]
fn test_mixed_blob_reference_layout() {
    let pairs = [
        plain(0x30),
        SignerSignaturePair::new(
            SignerIdentity::Contract(Address::repeat_byte(0x10)),
            vec![0xab, 0xcd],
        ),
    ];
    let blob = assemble_signatures(&pairs, None, &WebAuthnConfig::default()).unwrap();

    let expected = [
        // contract slot: padded address, offset 130, type 0
        format!("{:0>64}", "10".repeat(20)),
        format!("{:064x}", 130),
        "00".to_string(),
        // inline slot
        "30".repeat(SLOT_LEN),
        // trailer: length word then unpadded payload
        format!("{:064x}", 2),
        "abcd".to_string(),
    ]
    .concat();

    assert_eq!(hex::encode(&blob), expected);
}

#[test]
fn test_input_order_does_not_matter() {
    let config = WebAuthnConfig::default();
    let contract = SignerSignaturePair::new(
        SignerIdentity::Contract(Address::repeat_byte(0x20)),
        vec![7; 40],
    );
    let a = assemble_signatures(&[plain(0x30), contract.clone(), plain(0x10)], None, &config)
        .unwrap();
    let b = assemble_signatures(&[contract, plain(0x10), plain(0x30)], None, &config).unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_deployed_passkey_resolves_to_signer_proxy() {
    let config = webauthn_with_code();
    let pair = SignerSignaturePair::new(SignerIdentity::Passkey(passkey()), vec![0x01; 100]);

    let slots = layout_signatures(&[pair], Some(AccountContext::Deployed), &config).unwrap();
    let proxy = verifier_proxy_address(&passkey(), &config).unwrap();

    assert_eq!(slots[0].signer, proxy);
    assert_ne!(proxy, config.shared_signer);
    assert_eq!(&slots[0].slot[12..32], proxy.as_slice());
    assert_eq!(slots[0].trailer.len(), 32 + 100);
}

#[test]
fn test_deployed_passkey_without_creation_code() {
    let pair = SignerSignaturePair::new(SignerIdentity::Passkey(passkey()), vec![0x01; 10]);
    let err = assemble_signatures(
        &[pair],
        Some(AccountContext::Deployed),
        &WebAuthnConfig::default(),
    )
    .unwrap_err();
    assert!(matches!(err, Error::InvalidConfig(_)));
}

#[test]
fn test_deployed_passkey_matches_contract_owner() {
    let config = webauthn_with_code();
    let proxy = verifier_proxy_address(&passkey(), &config).unwrap();
    let payload = vec![0x42; 64];

    let as_passkey = assemble_signatures(
        &[plain(1), SignerSignaturePair::new(SignerIdentity::Passkey(passkey()), payload.clone())],
        Some(AccountContext::Deployed),
        &config,
    )
    .unwrap();
    let as_contract = assemble_signatures(
        &[plain(1), SignerSignaturePair::new(SignerIdentity::Contract(proxy), payload)],
        None,
        &WebAuthnConfig::default(),
    )
    .unwrap();

    assert_eq!(as_passkey, as_contract);
}

#[test]
fn test_context_irrelevant_for_plain_keys() {
    let config = WebAuthnConfig::default();
    let pairs = [plain(1), plain(2)];
    assert_eq!(
        assemble_signatures(&pairs, None, &config).unwrap(),
        assemble_signatures(&pairs, Some(AccountContext::Deployed), &config).unwrap()
    );
}

#[test]
fn test_safe_signature_field() {
    let window = ValidityWindow::new(0x0102, 0x0a0b0c).unwrap();
    let field = format_safe_signature(&window, &[0xff; SLOT_LEN]);
    assert_eq!(hex::encode(&field[..12]), "0000000001020000000a0b0c");
    assert_eq!(field.len(), 12 + SLOT_LEN);
}

#[test]
fn test_dummy_passkey_signature_in_initialization() {
    let owners = [
        SignerIdentity::PlainKey(Address::repeat_byte(0xee)),
        SignerIdentity::Passkey(passkey()),
    ];
    let blob = dummy_signatures(
        &owners,
        Some(AccountContext::Initialization),
        &WebAuthnConfig::default(),
    )
    .unwrap();
    assert!(blob.len() > 2 * SLOT_LEN + 32);
}

// ============================================================================
// WebAuthn payloads
// ============================================================================

#[test]
fn test_client_data_fields_extracted() {
    let challenge = "A".repeat(43);
    let json = format!(
        r#"{{"type":"webauthn.get","challenge":"{}","origin":"https://example.org","crossOrigin":false}}"#,
        challenge
    );
    assert_eq!(
        extract_client_data_fields(&json).unwrap(),
        r#""origin":"https://example.org","crossOrigin":false"#
    );
}

#[test]
fn test_client_data_wrong_challenge_length() {
    let json = r#"{"type":"webauthn.get","challenge":"short","origin":"x"}"#;
    assert!(matches!(
        extract_client_data_fields(json),
        Err(Error::InvalidSignature(_))
    ));
}

#[test]
fn test_webauthn_signature_layout() {
    let encoded = encode_webauthn_signature(&[0xaa; 37], "x", U256::from(1), U256::from(2)).unwrap();
    // two offsets then the inline uint256[2]
    assert_eq!(U256::from_be_slice(&encoded[..32]), U256::from(128));
    assert_eq!(U256::from_be_slice(&encoded[64..96]), U256::from(1));
    assert_eq!(U256::from_be_slice(&encoded[96..128]), U256::from(2));
}
