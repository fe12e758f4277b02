//! A128GCMKW / A192GCMKW / A256GCMKW (spec §4.4.1): a random CEK
//! encrypted with AES-GCM under the recipient's symmetric key; the GCM
//! IV and tag ride in the `iv`/`tag` header claims rather than the
//! compact encrypted-key segment's own framing.

use std::borrow::Cow;
use std::ops::Deref;

use openssl::symm::{decrypt_aead, encrypt_aead, Cipher};

use crate::error::JoseError;
use crate::jwe::jwe_algorithm::{check_oct_jwk_for_key_management, JweAlgorithm, JweDecrypter, JweEncrypter};
use crate::jwe::jwe_header::{self, JweHeader};
use crate::jwk::Jwk;
use crate::util;

const IV_LEN: usize = 12;
const TAG_LEN: usize = 16;

#[derive(Debug, Eq, PartialEq, Copy, Clone)]
pub enum AesgcmkwJweAlgorithm {
    A128gcmkw,
    A192gcmkw,
    A256gcmkw,
}

impl AesgcmkwJweAlgorithm {
    fn key_len(&self) -> usize {
        match self {
            Self::A128gcmkw => 16,
            Self::A192gcmkw => 24,
            Self::A256gcmkw => 32,
        }
    }

    fn cipher(&self) -> Cipher {
        match self {
            Self::A128gcmkw => Cipher::aes_128_gcm(),
            Self::A192gcmkw => Cipher::aes_192_gcm(),
            Self::A256gcmkw => Cipher::aes_256_gcm(),
        }
    }

    pub fn encrypter_from_bytes(&self, key: impl AsRef<[u8]>) -> Result<AesgcmkwJweEncrypter, JoseError> {
        let key = key.as_ref().to_vec();
        self.check_key_len(&key)?;
        Ok(AesgcmkwJweEncrypter { algorithm: *self, private_key: key, key_id: None })
    }

    pub fn decrypter_from_bytes(&self, key: impl AsRef<[u8]>) -> Result<AesgcmkwJweDecrypter, JoseError> {
        let key = key.as_ref().to_vec();
        self.check_key_len(&key)?;
        Ok(AesgcmkwJweDecrypter { algorithm: *self, private_key: key, key_id: None })
    }

    pub fn encrypter_from_jwk(&self, jwk: &Jwk) -> Result<AesgcmkwJweEncrypter, JoseError> {
        check_oct_jwk_for_key_management(jwk, self.name()).map_err(JoseError::from_anyhow_key)?;
        let key = jwk.parameter_bytes("k").map_err(JoseError::from_anyhow_key)?;
        self.check_key_len(&key)?;
        Ok(AesgcmkwJweEncrypter { algorithm: *self, private_key: key, key_id: jwk.key_id().map(str::to_string) })
    }

    pub fn decrypter_from_jwk(&self, jwk: &Jwk) -> Result<AesgcmkwJweDecrypter, JoseError> {
        check_oct_jwk_for_key_management(jwk, self.name()).map_err(JoseError::from_anyhow_key)?;
        let key = jwk.parameter_bytes("k").map_err(JoseError::from_anyhow_key)?;
        self.check_key_len(&key)?;
        Ok(AesgcmkwJweDecrypter { algorithm: *self, private_key: key, key_id: jwk.key_id().map(str::to_string) })
    }

    fn check_key_len(&self, key: &[u8]) -> Result<(), JoseError> {
        if key.len() != self.key_len() {
            return Err(JoseError::InvalidKeyLength(anyhow::anyhow!(
                "{} requires a {}-byte key, got {}",
                self.name(),
                self.key_len(),
                key.len()
            )));
        }
        Ok(())
    }
}

impl JweAlgorithm for AesgcmkwJweAlgorithm {
    fn name(&self) -> &str {
        match self {
            Self::A128gcmkw => "A128GCMKW",
            Self::A192gcmkw => "A192GCMKW",
            Self::A256gcmkw => "A256GCMKW",
        }
    }
}

impl Deref for AesgcmkwJweAlgorithm {
    type Target = dyn JweAlgorithm;

    fn deref(&self) -> &Self::Target {
        self
    }
}

#[derive(Debug, Clone)]
pub struct AesgcmkwJweEncrypter {
    algorithm: AesgcmkwJweAlgorithm,
    private_key: Vec<u8>,
    key_id: Option<String>,
}

impl JweEncrypter for AesgcmkwJweEncrypter {
    fn algorithm(&self) -> &dyn JweAlgorithm {
        &self.algorithm
    }

    fn key_id(&self) -> Option<&str> {
        self.key_id.as_deref()
    }

    fn encrypt(
        &self,
        header: &mut JweHeader,
        key_len: usize,
    ) -> Result<(Cow<[u8]>, Option<Vec<u8>>), JoseError> {
        let cek = util::rand_bytes(key_len);
        let iv = util::rand_bytes(IV_LEN);

        let mut tag = vec![0u8; TAG_LEN];
        let encrypted_key =
            encrypt_aead(self.algorithm.cipher(), &self.private_key, Some(&iv), b"", &cek, &mut tag)
                .map_err(JoseError::from)?;

        jwe_header::set_claim_base64(header, "iv", &iv)?;
        jwe_header::set_claim_base64(header, "tag", &tag)?;

        Ok((Cow::Owned(cek), Some(encrypted_key)))
    }
}

#[derive(Debug, Clone)]
pub struct AesgcmkwJweDecrypter {
    algorithm: AesgcmkwJweAlgorithm,
    private_key: Vec<u8>,
    key_id: Option<String>,
}

impl JweDecrypter for AesgcmkwJweDecrypter {
    fn algorithm(&self) -> &dyn JweAlgorithm {
        &self.algorithm
    }

    fn key_id(&self) -> Option<&str> {
        self.key_id.as_deref()
    }

    fn decrypt(
        &self,
        header: &JweHeader,
        encrypted_key: Option<&[u8]>,
        key_len: usize,
    ) -> Result<Cow<[u8]>, JoseError> {
        let encrypted_key = encrypted_key.ok_or(JoseError::DecryptionFailed)?;

        let iv = header.claim_base64("iv").map_err(|_| JoseError::DecryptionFailed)?
            .ok_or(JoseError::DecryptionFailed)?;
        let tag = header.claim_base64("tag").map_err(|_| JoseError::DecryptionFailed)?
            .ok_or(JoseError::DecryptionFailed)?;
        if iv.len() != IV_LEN || tag.len() != TAG_LEN {
            return Err(JoseError::DecryptionFailed);
        }

        let cek = decrypt_aead(self.algorithm.cipher(), &self.private_key, Some(&iv), b"", encrypted_key, &tag)
            .map_err(|_| JoseError::DecryptionFailed)?;

        if cek.len() != key_len {
            return Err(JoseError::DecryptionFailed);
        }

        Ok(Cow::Owned(cek))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encrypt_and_decrypt_round_trip() {
        let kek = vec![3u8; 16];
        let encrypter = AesgcmkwJweAlgorithm::A128gcmkw.encrypter_from_bytes(&kek).unwrap();
        let decrypter = AesgcmkwJweAlgorithm::A128gcmkw.decrypter_from_bytes(&kek).unwrap();

        let mut header = JweHeader::new();
        let (cek, encrypted_key) = encrypter.encrypt(&mut header, 32).unwrap();
        let encrypted_key = encrypted_key.unwrap();

        let recovered = decrypter.decrypt(&header, Some(&encrypted_key), 32).unwrap();
        assert_eq!(&cek[..], &recovered[..]);
    }

    #[test]
    fn missing_iv_is_rejected() {
        let kek = vec![3u8; 16];
        let decrypter = AesgcmkwJweAlgorithm::A128gcmkw.decrypter_from_bytes(&kek).unwrap();
        let header = JweHeader::new();
        assert!(decrypter.decrypt(&header, Some(&[0u8; 32]), 32).is_err());
    }
}
