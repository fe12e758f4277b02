//! A128GCM / A192GCM / A256GCM (spec §4.4.2): AES-GCM with a 96-bit IV,
//! AAD bound to the protected header, and a 128-bit tag.

use openssl::symm::{decrypt_aead, encrypt_aead, Cipher};

use crate::error::JoseError;
use crate::jwe::jwe_content_encryption::JweContentEncryption;

const IV_LEN: usize = 12;
const TAG_LEN: usize = 16;

#[derive(Debug, Eq, PartialEq, Copy, Clone)]
pub enum AesGcmJweEncryption {
    A128Gcm,
    A192Gcm,
    A256Gcm,
}

impl AesGcmJweEncryption {
    fn cipher(&self) -> Cipher {
        match self {
            Self::A128Gcm => Cipher::aes_128_gcm(),
            Self::A192Gcm => Cipher::aes_192_gcm(),
            Self::A256Gcm => Cipher::aes_256_gcm(),
        }
    }
}

impl JweContentEncryption for AesGcmJweEncryption {
    fn name(&self) -> &str {
        match self {
            Self::A128Gcm => "A128GCM",
            Self::A192Gcm => "A192GCM",
            Self::A256Gcm => "A256GCM",
        }
    }

    fn key_len(&self) -> usize {
        match self {
            Self::A128Gcm => 16,
            Self::A192Gcm => 24,
            Self::A256Gcm => 32,
        }
    }

    fn iv_len(&self) -> usize {
        IV_LEN
    }

    fn encrypt(
        &self,
        key: &[u8],
        iv: &[u8],
        aad: &[u8],
        plaintext: &[u8],
    ) -> Result<(Vec<u8>, Vec<u8>), JoseError> {
        if key.len() != self.key_len() {
            return Err(JoseError::InvalidKeyLength(anyhow::anyhow!(
                "{} requires a {}-byte CEK, got {}",
                self.name(),
                self.key_len(),
                key.len()
            )));
        }
        let mut tag = vec![0u8; TAG_LEN];
        let ciphertext = encrypt_aead(self.cipher(), key, Some(iv), aad, plaintext, &mut tag)
            .map_err(JoseError::from)?;
        Ok((ciphertext, tag))
    }

    fn decrypt(
        &self,
        key: &[u8],
        iv: &[u8],
        aad: &[u8],
        ciphertext: &[u8],
        tag: &[u8],
    ) -> Result<Vec<u8>, JoseError> {
        if key.len() != self.key_len() || tag.len() != TAG_LEN {
            return Err(JoseError::DecryptionFailed);
        }
        decrypt_aead(self.cipher(), key, Some(iv), aad, ciphertext, tag)
            .map_err(|_| JoseError::DecryptionFailed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util;

    #[test]
    fn round_trips() {
        let enc = AesGcmJweEncryption::A128Gcm;
        let key = util::rand_bytes(enc.key_len());
        let iv = util::rand_bytes(enc.iv_len());
        let aad = b"protected-header-bytes";
        let plaintext = b"the true sign and seal of plenipotentiary power";

        let (ciphertext, tag) = enc.encrypt(&key, &iv, aad, plaintext).unwrap();
        let recovered = enc.decrypt(&key, &iv, aad, &ciphertext, &tag).unwrap();
        assert_eq!(recovered, plaintext.to_vec());
    }

    #[test]
    fn tampered_aad_is_rejected() {
        let enc = AesGcmJweEncryption::A256Gcm;
        let key = util::rand_bytes(enc.key_len());
        let iv = util::rand_bytes(enc.iv_len());
        let (ciphertext, tag) = enc.encrypt(&key, &iv, b"aad-one", b"plaintext").unwrap();
        assert!(enc.decrypt(&key, &iv, b"aad-two", &ciphertext, &tag).is_err());
    }

    #[test]
    fn rejects_wrong_key_length() {
        let enc = AesGcmJweEncryption::A128Gcm;
        let key = vec![0u8; 8];
        assert!(enc.encrypt(&key, &vec![0u8; 12], b"", b"x").is_err());
    }
}
