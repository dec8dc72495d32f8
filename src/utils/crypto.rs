// Cryptographic helpers for at-rest encryption and identity fingerprints

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Key, Nonce,
};
use anyhow::{anyhow, Context, Result};
use base64::{engine::general_purpose, Engine as _};
use rand::RngCore;
use serde::{de::DeserializeOwned, Serialize};
use sha2::{Digest, Sha256};

/// Nonce size for AES-256-GCM encryption (96 bits)
pub const NONCE_SIZE: usize = 12;

/// Encryption key size for AES-256 (256 bits)
pub const ENCRYPTION_KEY_SIZE: usize = 32;

/// Generic encryption function for any serializable data using AES-256-GCM
///
/// # Arguments
///
/// * `data` - The data to encrypt (must implement Serialize)
/// * `key` - The encryption key (must be 32 bytes for AES-256)
///
/// # Returns
///
/// A Base64URL-encoded string containing the nonce + ciphertext
///
/// # Errors
///
/// Returns an error if:
/// - Serialization fails
/// - Key length is invalid
/// - AES encryption fails
pub fn encrypt_data<T: Serialize>(data: &T, key: &[u8]) -> Result<String> {
    if key.len() != ENCRYPTION_KEY_SIZE {
        return Err(anyhow!(
            "Invalid key length: expected {ENCRYPTION_KEY_SIZE} bytes, got {}",
            key.len()
        ));
    }

    let json_data = serde_json::to_string(data).context("Failed to serialize data")?;

    let mut nonce_bytes = [0u8; NONCE_SIZE];
    rand::rng().fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
    let ciphertext = cipher
        .encrypt(nonce, json_data.as_bytes())
        .map_err(|e| anyhow!("AES encryption failed: {e}"))?;

    // nonce || ciphertext
    let mut combined = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    combined.extend_from_slice(&nonce_bytes);
    combined.extend_from_slice(&ciphertext);

    Ok(general_purpose::URL_SAFE_NO_PAD.encode(&combined))
}

/// Generic decryption function for any deserializable data using AES-256-GCM
///
/// # Errors
///
/// Returns an error if:
/// - Key length is invalid
/// - Base64 decoding fails
/// - Data length is invalid
/// - AES decryption fails (wrong key or tampered data)
/// - Deserialization fails
pub fn decrypt_data<T: DeserializeOwned>(encrypted_data: &str, key: &[u8]) -> Result<T> {
    if key.len() != ENCRYPTION_KEY_SIZE {
        return Err(anyhow!(
            "Invalid key length: expected {ENCRYPTION_KEY_SIZE} bytes, got {}",
            key.len()
        ));
    }

    let combined = general_purpose::URL_SAFE_NO_PAD
        .decode(encrypted_data)
        .context("Failed to decode base64 data")?;

    if combined.len() < NONCE_SIZE {
        return Err(anyhow!("Invalid data length"));
    }

    let (nonce_bytes, ciphertext) = combined.split_at(NONCE_SIZE);
    let nonce = Nonce::from_slice(nonce_bytes);

    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
    let plaintext = cipher
        .decrypt(nonce, ciphertext)
        .map_err(|e| anyhow!("AES decryption failed: {e}"))?;

    let data: T = serde_json::from_slice(&plaintext)
        .context("Failed to deserialize data from decrypted JSON")?;

    Ok(data)
}

/// Derive a 32-byte encryption key from arbitrary key material with SHA-256
#[must_use]
pub fn derive_encryption_key(input_key: &[u8]) -> [u8; ENCRYPTION_KEY_SIZE] {
    let digest = Sha256::digest(input_key);
    let mut encryption_key = [0u8; ENCRYPTION_KEY_SIZE];
    encryption_key.copy_from_slice(&digest);
    encryption_key
}

/// Lower-case hex SHA-256 of the input
#[must_use]
pub fn sha256_hex(input: &str) -> String {
    Sha256::digest(input.as_bytes())
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_encrypt_decrypt_round_trip() {
        let key = derive_encryption_key(b"device-secret");
        let mut entries = BTreeMap::new();
        entries.insert("jwtToken".to_string(), "abc.def.ghi".to_string());

        let encrypted = encrypt_data(&entries, &key).unwrap();
        assert!(!encrypted.contains("jwtToken"));

        let decrypted: BTreeMap<String, String> = decrypt_data(&encrypted, &key).unwrap();
        assert_eq!(decrypted, entries);
    }

    #[test]
    fn test_decrypt_with_wrong_key_fails() {
        let key = derive_encryption_key(b"right");
        let wrong = derive_encryption_key(b"wrong");

        let encrypted = encrypt_data(&"payload", &key).unwrap();
        assert!(decrypt_data::<String>(&encrypted, &wrong).is_err());
    }

    #[test]
    fn test_invalid_key_length_rejected() {
        assert!(encrypt_data(&"payload", b"short").is_err());
        assert!(decrypt_data::<String>("AAAA", b"short").is_err());
    }

    #[test]
    fn test_truncated_ciphertext_rejected() {
        let key = derive_encryption_key(b"k");
        assert!(decrypt_data::<String>("AAAA", &key).is_err());
    }

    #[test]
    fn test_derive_encryption_key_is_deterministic() {
        assert_eq!(derive_encryption_key(b"a"), derive_encryption_key(b"a"));
        assert_ne!(derive_encryption_key(b"a"), derive_encryption_key(b"b"));
    }

    #[test]
    fn test_sha256_hex_known_vector() {
        assert_eq!(
            sha256_hex("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
