//! A128KW / A192KW / A256KW (spec §4.4.1): a random CEK wrapped under
//! the recipient's symmetric key with AES Key Wrap (RFC 3394).

use std::borrow::Cow;
use std::ops::Deref;

use openssl::aes::{unwrap_key, wrap_key, AesKey};

use crate::error::JoseError;
use crate::jwe::jwe_algorithm::{check_oct_jwk_for_key_management, JweAlgorithm, JweDecrypter, JweEncrypter};
use crate::jwe::jwe_header::JweHeader;
use crate::jwk::Jwk;
use crate::util;

#[derive(Debug, Eq, PartialEq, Copy, Clone)]
pub enum AeskwJweAlgorithm {
    A128kw,
    A192kw,
    A256kw,
}

impl AeskwJweAlgorithm {
    fn key_len(&self) -> usize {
        match self {
            Self::A128kw => 16,
            Self::A192kw => 24,
            Self::A256kw => 32,
        }
    }

    pub fn encrypter_from_bytes(&self, key: impl AsRef<[u8]>) -> Result<AeskwJweEncrypter, JoseError> {
        let key = key.as_ref().to_vec();
        self.check_key_len(&key)?;
        Ok(AeskwJweEncrypter { algorithm: *self, private_key: key, key_id: None })
    }

    pub fn decrypter_from_bytes(&self, key: impl AsRef<[u8]>) -> Result<AeskwJweDecrypter, JoseError> {
        let key = key.as_ref().to_vec();
        self.check_key_len(&key)?;
        Ok(AeskwJweDecrypter { algorithm: *self, private_key: key, key_id: None })
    }

    pub fn encrypter_from_jwk(&self, jwk: &Jwk) -> Result<AeskwJweEncrypter, JoseError> {
        check_oct_jwk_for_key_management(jwk, self.name()).map_err(JoseError::from_anyhow_key)?;
        let key = jwk.parameter_bytes("k").map_err(JoseError::from_anyhow_key)?;
        self.check_key_len(&key)?;
        Ok(AeskwJweEncrypter { algorithm: *self, private_key: key, key_id: jwk.key_id().map(str::to_string) })
    }

    pub fn decrypter_from_jwk(&self, jwk: &Jwk) -> Result<AeskwJweDecrypter, JoseError> {
        check_oct_jwk_for_key_management(jwk, self.name()).map_err(JoseError::from_anyhow_key)?;
        let key = jwk.parameter_bytes("k").map_err(JoseError::from_anyhow_key)?;
        self.check_key_len(&key)?;
        Ok(AeskwJweDecrypter { algorithm: *self, private_key: key, key_id: jwk.key_id().map(str::to_string) })
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

impl JweAlgorithm for AeskwJweAlgorithm {
    fn name(&self) -> &str {
        match self {
            Self::A128kw => "A128KW",
            Self::A192kw => "A192KW",
            Self::A256kw => "A256KW",
        }
    }
}

impl Deref for AeskwJweAlgorithm {
    type Target = dyn JweAlgorithm;

    fn deref(&self) -> &Self::Target {
        self
    }
}

#[derive(Debug, Clone)]
pub struct AeskwJweEncrypter {
    algorithm: AeskwJweAlgorithm,
    private_key: Vec<u8>,
    key_id: Option<String>,
}

impl JweEncrypter for AeskwJweEncrypter {
    fn algorithm(&self) -> &dyn JweAlgorithm {
        &self.algorithm
    }

    fn key_id(&self) -> Option<&str> {
        self.key_id.as_deref()
    }

    fn encrypt(
        &self,
        _header: &mut JweHeader,
        key_len: usize,
    ) -> Result<(Cow<[u8]>, Option<Vec<u8>>), JoseError> {
        let cek = util::rand_bytes(key_len);
        let aes = AesKey::new_encrypt(&self.private_key)
            .map_err(|_| JoseError::ProviderError(anyhow::anyhow!("failed to set AES-KW encryption key")))?;
        let mut wrapped = vec![0u8; key_len + 8];
        let written = wrap_key(&aes, None, &mut wrapped, &cek)
            .map_err(|_| JoseError::ProviderError(anyhow::anyhow!("failed to wrap the CEK")))?;
        wrapped.truncate(written);
        Ok((Cow::Owned(cek), Some(wrapped)))
    }
}

#[derive(Debug, Clone)]
pub struct AeskwJweDecrypter {
    algorithm: AeskwJweAlgorithm,
    private_key: Vec<u8>,
    key_id: Option<String>,
}

impl JweDecrypter for AeskwJweDecrypter {
    fn algorithm(&self) -> &dyn JweAlgorithm {
        &self.algorithm
    }

    fn key_id(&self) -> Option<&str> {
        self.key_id.as_deref()
    }

    fn decrypt(
        &self,
        _header: &JweHeader,
        encrypted_key: Option<&[u8]>,
        key_len: usize,
    ) -> Result<Cow<[u8]>, JoseError> {
        let encrypted_key = encrypted_key.ok_or(JoseError::DecryptionFailed)?;
        let aes =
            AesKey::new_decrypt(&self.private_key).map_err(|_| JoseError::DecryptionFailed)?;
        let mut cek = vec![0u8; key_len];
        let written =
            unwrap_key(&aes, None, &mut cek, encrypted_key).map_err(|_| JoseError::DecryptionFailed)?;
        if written != key_len {
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
        let kek = vec![9u8; 16];
        let encrypter = AeskwJweAlgorithm::A128kw.encrypter_from_bytes(&kek).unwrap();
        let decrypter = AeskwJweAlgorithm::A128kw.decrypter_from_bytes(&kek).unwrap();

        let mut header = JweHeader::new();
        let (cek, encrypted_key) = encrypter.encrypt(&mut header, 32).unwrap();
        let encrypted_key = encrypted_key.unwrap();

        let recovered = decrypter.decrypt(&header, Some(&encrypted_key), 32).unwrap();
        assert_eq!(&cek[..], &recovered[..]);
    }

    #[test]
    fn tampered_wrapped_key_is_rejected() {
        let kek = vec![9u8; 16];
        let encrypter = AeskwJweAlgorithm::A128kw.encrypter_from_bytes(&kek).unwrap();
        let decrypter = AeskwJweAlgorithm::A128kw.decrypter_from_bytes(&kek).unwrap();

        let mut header = JweHeader::new();
        let (_cek, encrypted_key) = encrypter.encrypt(&mut header, 32).unwrap();
        let mut encrypted_key = encrypted_key.unwrap();
        encrypted_key[0] ^= 0xFF;

        assert!(decrypter.decrypt(&header, Some(&encrypted_key), 32).is_err());
    }
}
