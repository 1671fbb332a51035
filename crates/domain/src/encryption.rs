//! Reversible encryption of personally identifying fields.
//!
//! Ciphertexts are URL-safe base64 of `nonce || AES-256-GCM(plaintext)`, so
//! they can be stored in a text column and tampering is detected on decrypt.

use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, AeadCore, KeyInit, OsRng},
};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE;
use thiserror::Error;

/// Required key length in bytes.
pub const KEY_LEN: usize = 32;

const NONCE_LEN: usize = 12;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncryptionError {
    #[error("encryption key must be {KEY_LEN} bytes long, got {0}")]
    InvalidKeyLength(usize),

    #[error("ciphertext is not valid base64")]
    Encoding,

    #[error("ciphertext too short")]
    Truncated,

    #[error("encryption failed")]
    Encrypt,

    /// Wrong key or tampered ciphertext.
    #[error("decryption failed")]
    Decrypt,

    #[error("decrypted value is not valid UTF-8")]
    Utf8,
}

/// Symmetric encrypt/decrypt pair for a single protected field.
pub trait FieldEncryptor: Send + Sync {
    fn encrypt(&self, plaintext: &str) -> Result<String, EncryptionError>;

    fn decrypt(&self, ciphertext: &str) -> Result<String, EncryptionError>;
}

/// AES-256-GCM field encryptor with a random nonce per value.
#[derive(Clone)]
pub struct AesGcmEncryptor {
    cipher: Aes256Gcm,
}

impl AesGcmEncryptor {
    /// Builds an encryptor from a raw 32 byte key.
    pub fn new(key: &[u8]) -> Result<Self, EncryptionError> {
        if key.len() != KEY_LEN {
            return Err(EncryptionError::InvalidKeyLength(key.len()));
        }
        let cipher = Aes256Gcm::new_from_slice(key)
            .map_err(|_| EncryptionError::InvalidKeyLength(key.len()))?;
        Ok(Self { cipher })
    }
}

impl std::fmt::Debug for AesGcmEncryptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AesGcmEncryptor").finish_non_exhaustive()
    }
}

impl FieldEncryptor for AesGcmEncryptor {
    fn encrypt(&self, plaintext: &str) -> Result<String, EncryptionError> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let sealed = self
            .cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|_| EncryptionError::Encrypt)?;

        let mut out = Vec::with_capacity(NONCE_LEN + sealed.len());
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&sealed);
        Ok(URL_SAFE.encode(out))
    }

    fn decrypt(&self, ciphertext: &str) -> Result<String, EncryptionError> {
        let raw = URL_SAFE
            .decode(ciphertext)
            .map_err(|_| EncryptionError::Encoding)?;
        if raw.len() < NONCE_LEN {
            return Err(EncryptionError::Truncated);
        }

        let (nonce, sealed) = raw.split_at(NONCE_LEN);
        let plain = self
            .cipher
            .decrypt(Nonce::from_slice(nonce), sealed)
            .map_err(|_| EncryptionError::Decrypt)?;
        String::from_utf8(plain).map_err(|_| EncryptionError::Utf8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &[u8; 32] = b"0123456789abcdef0123456789abcdef";

    #[test]
    fn encrypt_then_decrypt() {
        let enc = AesGcmEncryptor::new(KEY).unwrap();
        let sealed = enc.encrypt("breeder@example.com").unwrap();

        assert_ne!(sealed, "breeder@example.com");
        assert_eq!(enc.decrypt(&sealed).unwrap(), "breeder@example.com");
    }

    #[test]
    fn nonces_differ_per_call() {
        let enc = AesGcmEncryptor::new(KEY).unwrap();
        assert_ne!(enc.encrypt("same").unwrap(), enc.encrypt("same").unwrap());
    }

    #[test]
    fn rejects_short_keys() {
        assert_eq!(
            AesGcmEncryptor::new(b"short").unwrap_err(),
            EncryptionError::InvalidKeyLength(5)
        );
    }

    #[test]
    fn wrong_key_fails_to_decrypt() {
        let enc = AesGcmEncryptor::new(KEY).unwrap();
        let other = AesGcmEncryptor::new(b"fedcba9876543210fedcba9876543210").unwrap();
        let sealed = enc.encrypt("secret").unwrap();

        assert_eq!(other.decrypt(&sealed).unwrap_err(), EncryptionError::Decrypt);
    }

    #[test]
    fn garbage_input_is_rejected() {
        let enc = AesGcmEncryptor::new(KEY).unwrap();
        assert_eq!(enc.decrypt("%%%").unwrap_err(), EncryptionError::Encoding);
        assert_eq!(enc.decrypt("AAAA").unwrap_err(), EncryptionError::Truncated);
    }
}
