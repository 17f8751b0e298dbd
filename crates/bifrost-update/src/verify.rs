//! Artifact integrity and authenticity checks

use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use sha2::{Digest, Sha256};

use crate::error::{Result, UpdateError};

/// Lowercase hex SHA-256 of `bytes`
pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Check `bytes` against an expected hex SHA-256.
///
/// An empty expectation never matches.
pub fn verify_checksum(bytes: &[u8], expected_hex: &str) -> Result<()> {
    let actual = sha256_hex(bytes);
    let expected = expected_hex.trim();

    if expected.is_empty() || !actual.eq_ignore_ascii_case(expected) {
        return Err(UpdateError::ChecksumMismatch {
            expected: expected.to_string(),
            actual,
        });
    }
    Ok(())
}

/// Verify a hex-encoded ed25519 signature over the raw artifact bytes
pub fn verify_signature(
    bytes: &[u8],
    signature_hex: &str,
    public_key: Option<&VerifyingKey>,
) -> Result<()> {
    let public_key = public_key.ok_or(UpdateError::NoPublicKey)?;

    let raw = hex::decode(signature_hex.trim())
        .map_err(|e| UpdateError::signature_invalid(format!("invalid signature format: {}", e)))?;
    let raw: [u8; 64] = raw.try_into().map_err(|raw: Vec<u8>| {
        UpdateError::signature_invalid(format!(
            "signature must be 64 bytes, got {}",
            raw.len()
        ))
    })?;

    public_key
        .verify(bytes, &Signature::from_bytes(&raw))
        .map_err(|_| UpdateError::signature_invalid("signature does not match artifact"))
}

/// Decode a hex-encoded ed25519 public key
pub fn parse_public_key(hex_key: &str) -> Result<VerifyingKey> {
    let raw = hex::decode(hex_key.trim())
        .map_err(|e| UpdateError::config(format!("public key is not valid hex: {}", e)))?;
    let raw: [u8; 32] = raw
        .try_into()
        .map_err(|_| UpdateError::config("Ed25519 public key must decode to 32 bytes"))?;
    VerifyingKey::from_bytes(&raw)
        .map_err(|_| UpdateError::config("invalid Ed25519 public key bytes"))
}
