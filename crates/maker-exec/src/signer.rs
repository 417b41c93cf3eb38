//! Envelope signing and key management.
//!
//! The gateway signs the serialized order payload with a secp256k1 key
//! and the venue verifies it against the quoting authority's address.
//!
//! Security notes:
//! - Private keys live inside `PrivateKeySigner`, which handles secure memory.
//! - Keys are loaded once at startup; no runtime key rotation.
//! - Never log private key material.

use std::path::PathBuf;
use std::sync::Arc;

use alloy::primitives::Address;
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::SignerSync;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use zeroize::Zeroizing;

use crate::error::ExecError;

/// Source of the private key.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum KeySource {
    /// Load from environment variable (development).
    EnvVar { var_name: String },
    /// Load from file (production, recommend 0600 permissions).
    File { path: PathBuf },
}

/// Key management errors.
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),

    #[error("Failed to decode hex: {0}")]
    HexDecode(#[from] hex::FromHexError),

    #[error("Invalid private key: {0}")]
    InvalidKey(String),

    #[error("Invalid authority address: {0}")]
    InvalidAuthority(String),

    #[error("Authority mismatch: expected {expected}, got {actual}")]
    AuthorityMismatch { expected: Address, actual: Address },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Signs serialized order envelopes on behalf of the quoting authority.
pub trait EnvelopeSigner: Send + Sync {
    /// Sign the serialized envelope message. 65-byte recoverable signature.
    fn sign(&self, message: &[u8]) -> Result<Vec<u8>, ExecError>;

    /// Address the venue verifies the signature against.
    fn authority(&self) -> String;
}

pub type DynSigner = Arc<dyn EnvelopeSigner>;

/// Key-backed signer used for live submission.
pub struct WalletSigner {
    signer: PrivateKeySigner,
}

impl WalletSigner {
    /// Load the key from the configured source and verify the derived
    /// authority address.
    ///
    /// # Errors
    /// Returns `KeyError` if:
    /// - Environment variable not found
    /// - File read fails
    /// - Hex decoding fails
    /// - Private key is invalid
    /// - Derived authority does not match the expected one
    pub fn load(source: &KeySource, expected_authority: Option<&str>) -> Result<Self, KeyError> {
        // Parse hex key from string (supports 0x prefix and whitespace trimming)
        fn parse_hex_key(hex_str: &str) -> Result<Zeroizing<Vec<u8>>, KeyError> {
            let trimmed = hex_str.trim().trim_start_matches("0x");
            Ok(Zeroizing::new(hex::decode(trimmed)?))
        }

        let secret_bytes: Zeroizing<Vec<u8>> = match source {
            KeySource::EnvVar { var_name } => {
                let hex = std::env::var(var_name)
                    .map_err(|_| KeyError::EnvVarNotFound(var_name.clone()))?;
                parse_hex_key(&hex)?
            }
            KeySource::File { path } => {
                let content = std::fs::read_to_string(path)?;
                parse_hex_key(&content)?
            }
        };

        let signer = PrivateKeySigner::from_slice(&secret_bytes)
            .map_err(|e| KeyError::InvalidKey(e.to_string()))?;

        if let Some(expected) = expected_authority {
            let expected: Address = expected
                .parse()
                .map_err(|_| KeyError::InvalidAuthority(expected.to_string()))?;
            if signer.address() != expected {
                return Err(KeyError::AuthorityMismatch {
                    expected,
                    actual: signer.address(),
                });
            }
        }

        Ok(Self { signer })
    }

    /// Load from raw bytes (test-only, no environment variable dependency).
    #[cfg(test)]
    pub fn from_bytes(secret_bytes: &[u8]) -> Result<Self, KeyError> {
        let signer = PrivateKeySigner::from_slice(secret_bytes)
            .map_err(|e| KeyError::InvalidKey(e.to_string()))?;
        Ok(Self { signer })
    }
}

impl EnvelopeSigner for WalletSigner {
    fn sign(&self, message: &[u8]) -> Result<Vec<u8>, ExecError> {
        let signature = self
            .signer
            .sign_message_sync(message)
            .map_err(|e| ExecError::Signing(e.to_string()))?;
        Ok(signature.as_bytes().to_vec())
    }

    fn authority(&self) -> String {
        self.signer.address().to_string()
    }
}

/// Signer for dry runs. Produces an all-zero signature the venue would
/// reject, so it only pairs with a mock gateway.
pub struct NoopSigner;

impl EnvelopeSigner for NoopSigner {
    fn sign(&self, _message: &[u8]) -> Result<Vec<u8>, ExecError> {
        Ok(vec![0u8; 65])
    }

    fn authority(&self) -> String {
        "unsigned".to_string()
    }
}
