//! License cryptographic signing
//!
//! ECDSA over secp256k1 with a SHA-256 digest of the canonical license
//! bytes. Signatures travel as base64 of the 64-byte compact encoding.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use rand::RngCore;
use secp256k1::{ecdsa::Signature, Message, PublicKey, Secp256k1, SecretKey};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::license::payload::LicensePayload;

/// Signing and key handling errors
#[derive(Debug, Error)]
pub enum SigningError {
    #[error("Invalid key encoding: {0}")]
    InvalidKeyEncoding(String),

    #[error("Invalid key: {0}")]
    InvalidKey(#[from] secp256k1::Error),

    #[error("Failed to serialize license: {0}")]
    Serialization(#[from] serde_json::Error),
}

fn digest(payload: &LicensePayload) -> Result<Message, SigningError> {
    let canonical = payload.canonical_bytes()?;
    let hash = Sha256::digest(&canonical);
    Ok(Message::from_digest_slice(hash.as_slice())?)
}

/// Sign a license payload, returning the base64 signature
pub fn sign_license(
    payload: &LicensePayload,
    secret_key: &SecretKey,
) -> Result<String, SigningError> {
    let secp = Secp256k1::signing_only();
    let message = digest(payload)?;
    let signature = secp.sign_ecdsa(&message, secret_key);
    Ok(BASE64.encode(signature.serialize_compact()))
}

/// Sign a license payload in place
pub fn sign_license_in_place(
    payload: &mut LicensePayload,
    secret_key: &SecretKey,
) -> Result<(), SigningError> {
    payload.signature = sign_license(payload, secret_key)?;
    Ok(())
}

/// Verify the signature stored in a license payload
///
/// Any failure (bad base64, malformed signature, serialization problem,
/// key mismatch) reports `false`.
pub fn verify_license_signature(payload: &LicensePayload, public_key: &PublicKey) -> bool {
    let Ok(bytes) = BASE64.decode(payload.signature.trim()) else {
        return false;
    };
    if bytes.len() != 64 {
        return false;
    }
    let Ok(signature) = Signature::from_compact(&bytes) else {
        return false;
    };
    let Ok(message) = digest(payload) else {
        return false;
    };

    let secp = Secp256k1::verification_only();
    secp.verify_ecdsa(&message, &signature, public_key).is_ok()
}

/// Parse a hex-encoded public key (compressed or uncompressed)
pub fn parse_public_key(hex_key: &str) -> Result<PublicKey, SigningError> {
    let bytes = hex::decode(hex_key.trim())
        .map_err(|e| SigningError::InvalidKeyEncoding(e.to_string()))?;
    Ok(PublicKey::from_slice(&bytes)?)
}

/// Parse a hex-encoded 32-byte secret key
pub fn parse_secret_key(hex_key: &str) -> Result<SecretKey, SigningError> {
    let bytes = hex::decode(hex_key.trim())
        .map_err(|e| SigningError::InvalidKeyEncoding(e.to_string()))?;
    Ok(SecretKey::from_slice(&bytes)?)
}

/// Generate a fresh signing key pair
pub fn generate_keypair() -> (SecretKey, PublicKey) {
    let secp = Secp256k1::signing_only();
    let mut rng = rand::thread_rng();
    loop {
        let mut bytes = [0u8; 32];
        rng.fill_bytes(&mut bytes);
        // Out-of-range scalars are astronomically rare; draw again
        if let Ok(secret_key) = SecretKey::from_slice(&bytes) {
            let public_key = PublicKey::from_secret_key(&secp, &secret_key);
            return (secret_key, public_key);
        }
    }
}

/// Hex encoding of a compressed public key
pub fn public_key_hex(public_key: &PublicKey) -> String {
    hex::encode(public_key.serialize())
}

/// Hex encoding of a secret key
pub fn secret_key_hex(secret_key: &SecretKey) -> String {
    hex::encode(secret_key.secret_bytes())
}
