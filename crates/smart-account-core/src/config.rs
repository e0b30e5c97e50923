//! # Deployment Configuration
//!
//! Contract addresses and byte code for each supported account-standard
//! version. Configurations are plain values handed to every derivation call;
//! nothing in the crate reads process-wide defaults.
//!
//! ```rust,ignore
//! use smart_account_core::config::SafeAccountConfig;
//!
//! let config = SafeAccountConfig::v0_3_0()
//!     .with_entry_point(custom_entry_point);
//! let json = serde_json::to_string(&config)?;
//! ```

use crate::types::bytes_hex;
use crate::{Error, Result};
use alloy_primitives::{Address, U256, address};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Constants
// ============================================================================

/// ERC-4337 EntryPoint v0.6 address (same on most chains)
pub const ENTRY_POINT_V06: Address = address!("5FF137D4b0FDCD49DcA30c7CF57E578a026d2789");

/// ERC-4337 EntryPoint v0.7 address
pub const ENTRY_POINT_V07: Address = address!("0000000071727De22E5E9d8BAf0edAc6f37da032");

/// ERC-4337 EntryPoint v0.8 address
pub const ENTRY_POINT_V08: Address = address!("4337084D9E255Ff0702461CF8895CE9E3b5Ff108");

/// Factory marker that tells a v0.8 entry point the account is an EIP-7702 delegated EOA
pub const EIP7702_FACTORY_MARKER: Address = address!("7702000000000000000000000000000000000000");

/// Sentinel head of the Safe owner linked list
pub const SENTINEL_OWNERS: Address = address!("0000000000000000000000000000000000000001");

/// Default RIP-7212 P-256 verification precompile
pub const P256_PRECOMPILE: Address = address!("0000000000000000000000000000000000000100");

/// SafeProxy creation code (Safe v1.4.1 proxy factory)
pub const SAFE_PROXY_CREATION_CODE: &[u8] = &alloy_primitives::hex!("608060405234801561001057600080fd5b506040516101e63803806101e68339818101604052602081101561003357600080fd5b8101908080519060200190929190505050600073ffffffffffffffffffffffffffffffffffffffff168173ffffffffffffffffffffffffffffffffffffffff1614156100ca576040517f08c379a00000000000000000000000000000000000000000000000000000000081526004018080602001828103825260228152602001806101c46022913960400191505060405180910390fd5b806000806101000a81548173ffffffffffffffffffffffffffffffffffffffff021916908373ffffffffffffffffffffffffffffffffffffffff1602179055505060ab806101196000396000f3fe608060405273ffffffffffffffffffffffffffffffffffffffff600054167fa619486e0000000000000000000000000000000000000000000000000000000060003514156050578060005260206000f35b3660008037600080366000845af43d6000803e60008114156070573d6000fd5b3d6000f3fea264697066735822122003d1488ee65e08fa41e58e888a9865554c535f2c77126a82cb4c0f917f31441364736f6c63430007060033496e76616c69642073696e676c65746f6e20616464726573732070726f7669646564");

// ============================================================================
// Entry Point Version
// ============================================================================

/// EntryPoint version, which fixes the wire shape of a pending operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum EntryPointVersion {
    /// ERC-4337 v0.6 (single init code and paymaster blobs, unpacked gas fields)
    V06,
    /// ERC-4337 v0.7 (split factory/paymaster fields, packed gas words)
    #[default]
    V07,
    /// ERC-4337 v0.8 (v0.7 packing, EIP-712 hash, EIP-7702 authorization)
    V08,
}

impl EntryPointVersion {
    /// Canonical EntryPoint address for this version
    pub fn default_entry_point(&self) -> Address {
        match self {
            EntryPointVersion::V06 => ENTRY_POINT_V06,
            EntryPointVersion::V07 => ENTRY_POINT_V07,
            EntryPointVersion::V08 => ENTRY_POINT_V08,
        }
    }
}

impl fmt::Display for EntryPointVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryPointVersion::V06 => write!(f, "v0.6"),
            EntryPointVersion::V07 => write!(f, "v0.7"),
            EntryPointVersion::V08 => write!(f, "v0.8"),
        }
    }
}

impl FromStr for EntryPointVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().trim_start_matches(['v', 'V']) {
            "0.6" | "0.6.0" => Ok(EntryPointVersion::V06),
            "0.7" | "0.7.0" => Ok(EntryPointVersion::V07),
            "0.8" | "0.8.0" => Ok(EntryPointVersion::V08),
            _ => Err(Error::UnsupportedVersion(s.to_string())),
        }
    }
}

// ============================================================================
// WebAuthn Configuration
// ============================================================================

/// Contracts used to verify passkey (P-256) owners
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebAuthnConfig {
    /// Shared signer used while the account is being initialized
    pub shared_signer: Address,
    /// Factory deploying per-owner signer proxies
    pub signer_factory: Address,
    /// Singleton behind every signer proxy
    pub signer_singleton: Address,
    /// RIP-7212 precompile address (0 to disable)
    pub precompile: Address,
    /// Solidity P-256 verifier used when the precompile is unavailable
    pub fallback_verifier: Address,
    /// Signer proxy creation code; required to resolve deployed signer addresses
    #[serde(with = "bytes_hex", default)]
    pub signer_proxy_creation_code: Vec<u8>,
}

impl WebAuthnConfig {
    /// Packed `uint176` verifiers value: `precompile << 160 | fallback_verifier`
    pub fn verifiers(&self) -> U256 {
        (U256::from_be_slice(self.precompile.as_slice()) << 160)
            | U256::from_be_slice(self.fallback_verifier.as_slice())
    }

    /// Set the signer proxy creation code
    pub fn with_signer_proxy_creation_code(mut self, code: Vec<u8>) -> Self {
        self.signer_proxy_creation_code = code;
        self
    }

    /// Set the precompile address
    pub fn with_precompile(mut self, precompile: Address) -> Self {
        self.precompile = precompile;
        self
    }
}

impl Default for WebAuthnConfig {
    fn default() -> Self {
        Self {
            shared_signer: address!("fD90FAd33ee8b58f32c00aceEad1358e4AFC23f9"),
            signer_factory: address!("F7488fFbe67327ac9f37D5F722d83Fc900852Fbf"),
            signer_singleton: address!("270D7E4a57E6322f336261f3EaE2BADe72E68D72"),
            precompile: P256_PRECOMPILE,
            fallback_verifier: address!("445a0683e494ea0c5AF3E83c5159fBE47Cf9e765"),
            signer_proxy_creation_code: Vec::new(),
        }
    }
}

// ============================================================================
// Safe Account Configuration
// ============================================================================

/// Deployment table for Safe accounts with the 4337 module
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SafeAccountConfig {
    /// EntryPoint version (selects the operation wire shape)
    pub version: EntryPointVersion,
    /// EntryPoint contract address
    pub entry_point: Address,
    /// Safe 4337 module (also the fallback handler)
    pub safe_4337_module: Address,
    /// Helper enabling modules by delegate call during setup
    pub module_setup: Address,
    /// Safe singleton (logic contract)
    pub singleton: Address,
    /// Safe proxy factory
    pub proxy_factory: Address,
    /// Proxy creation byte code used by the factory
    #[serde(with = "bytes_hex")]
    pub proxy_creation_code: Vec<u8>,
    /// MultiSend contract for batches
    pub multisend: Address,
    /// MultiSendCallOnly contract
    pub multisend_call_only: Address,
    /// Passkey verification contracts
    #[serde(default)]
    pub webauthn: WebAuthnConfig,
}

impl SafeAccountConfig {
    /// Safe 4337 module v0.2.0 against EntryPoint v0.6
    pub fn v0_2_0() -> Self {
        Self {
            version: EntryPointVersion::V06,
            entry_point: ENTRY_POINT_V06,
            safe_4337_module: address!("a581c4A4DB7175302464fF3C06380BC3270b4037"),
            module_setup: address!("8EcD4ec46D4D2a6B64fE960B3D64e8B94B2234eb"),
            ..Self::common(EntryPointVersion::V06)
        }
    }

    /// Safe 4337 module v0.3.0 against EntryPoint v0.7
    pub fn v0_3_0() -> Self {
        Self {
            version: EntryPointVersion::V07,
            entry_point: ENTRY_POINT_V07,
            safe_4337_module: address!("75cf11467937ce3F2f357CE24ffc3DBF8fD5c226"),
            module_setup: address!("2dd68b007B46fBe91B9A7c3EDa5A7a1063cB5b47"),
            ..Self::common(EntryPointVersion::V07)
        }
    }

    fn common(version: EntryPointVersion) -> Self {
        Self {
            version,
            entry_point: version.default_entry_point(),
            safe_4337_module: Address::ZERO,
            module_setup: Address::ZERO,
            singleton: address!("29fcB43b46531BcA003ddC8FCB67FFE91900C762"),
            proxy_factory: address!("4e1DCf7AD4e460CfD30791CCC4F9c8a4f820ec67"),
            proxy_creation_code: SAFE_PROXY_CREATION_CODE.to_vec(),
            multisend: address!("38869bf66a61cF6bDB996A6aE40D5853Fd43B526"),
            multisend_call_only: address!("9641d764fc13c8B624c04430C7356C1C7C8102e2"),
            webauthn: WebAuthnConfig::default(),
        }
    }

    /// Override the EntryPoint address
    pub fn with_entry_point(mut self, entry_point: Address) -> Self {
        self.entry_point = entry_point;
        self
    }

    /// Override the Safe singleton
    pub fn with_singleton(mut self, singleton: Address) -> Self {
        self.singleton = singleton;
        self
    }

    /// Override the proxy factory and its creation code
    pub fn with_proxy_factory(mut self, factory: Address, creation_code: Vec<u8>) -> Self {
        self.proxy_factory = factory;
        self.proxy_creation_code = creation_code;
        self
    }

    /// Override the passkey contracts
    pub fn with_webauthn(mut self, webauthn: WebAuthnConfig) -> Self {
        self.webauthn = webauthn;
        self
    }

    /// Check that every field needed for derivation is populated
    pub fn validate(&self) -> Result<()> {
        if self.proxy_creation_code.is_empty() {
            return Err(Error::InvalidConfig("proxy creation code is empty".into()));
        }
        let required = [
            ("entry point", self.entry_point),
            ("4337 module", self.safe_4337_module),
            ("module setup", self.module_setup),
            ("singleton", self.singleton),
            ("proxy factory", self.proxy_factory),
        ];
        for (name, addr) in required {
            if addr.is_zero() {
                return Err(Error::InvalidConfig(format!("{} address is zero", name)));
            }
        }
        Ok(())
    }
}

impl Default for SafeAccountConfig {
    fn default() -> Self {
        Self::v0_3_0()
    }
}

// ============================================================================
// Simple 7702 Account Configuration
// ============================================================================

/// Deployment table for EIP-7702 delegated accounts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Simple7702Config {
    /// EntryPoint contract address (v0.8)
    pub entry_point: Address,
    /// Delegation target implementing the account logic
    pub delegatee: Address,
}

impl Default for Simple7702Config {
    fn default() -> Self {
        Self {
            entry_point: ENTRY_POINT_V08,
            delegatee: address!("e6Cae83BdE06E4c305530e199D7217f42808555B"),
        }
    }
}
