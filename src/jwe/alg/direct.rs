//! `dir` (spec §4.4.1): the CEK is the key material itself; the
//! encrypted-key segment is empty.

use std::borrow::Cow;
use std::ops::Deref;

use crate::error::JoseError;
use crate::jwe::jwe_algorithm::{check_oct_jwk_for_key_management, JweAlgorithm, JweDecrypter, JweEncrypter};
use crate::jwe::jwe_header::JweHeader;
use crate::jwk::Jwk;

#[derive(Debug, Eq, PartialEq, Copy, Clone)]
pub struct DirectJweAlgorithm;

pub const DIR: DirectJweAlgorithm = DirectJweAlgorithm;

impl DirectJweAlgorithm {
    pub fn encrypter_from_bytes(&self, key: impl AsRef<[u8]>) -> Result<DirectJweEncrypter, JoseError> {
        Ok(DirectJweEncrypter { key: key.as_ref().to_vec(), key_id: None })
    }

    pub fn decrypter_from_bytes(&self, key: impl AsRef<[u8]>) -> Result<DirectJweDecrypter, JoseError> {
        Ok(DirectJweDecrypter { key: key.as_ref().to_vec(), key_id: None })
    }

    pub fn encrypter_from_jwk(&self, jwk: &Jwk) -> Result<DirectJweEncrypter, JoseError> {
        check_oct_jwk_for_key_management(jwk, self.name()).map_err(JoseError::from_anyhow_key)?;
        let key = jwk.parameter_bytes("k").map_err(JoseError::from_anyhow_key)?;
        Ok(DirectJweEncrypter { key, key_id: jwk.key_id().map(str::to_string) })
    }

    pub fn decrypter_from_jwk(&self, jwk: &Jwk) -> Result<DirectJweDecrypter, JoseError> {
        check_oct_jwk_for_key_management(jwk, self.name()).map_err(JoseError::from_anyhow_key)?;
        let key = jwk.parameter_bytes("k").map_err(JoseError::from_anyhow_key)?;
        Ok(DirectJweDecrypter { key, key_id: jwk.key_id().map(str::to_string) })
    }
}

impl JweAlgorithm for DirectJweAlgorithm {
    fn name(&self) -> &str {
        "dir"
    }
}

impl Deref for DirectJweAlgorithm {
    type Target = dyn JweAlgorithm;

    fn deref(&self) -> &Self::Target {
        self
    }
}

#[derive(Debug, Clone)]
pub struct DirectJweEncrypter {
    key: Vec<u8>,
    key_id: Option<String>,
}

impl JweEncrypter for DirectJweEncrypter {
    fn algorithm(&self) -> &dyn JweAlgorithm {
        &DIR
    }

    fn key_id(&self) -> Option<&str> {
        self.key_id.as_deref()
    }

    fn encrypt(
        &self,
        _header: &mut JweHeader,
        key_len: usize,
    ) -> Result<(Cow<[u8]>, Option<Vec<u8>>), JoseError> {
        if self.key.len() != key_len {
            return Err(JoseError::InvalidKeyLength(anyhow::anyhow!(
                "dir requires a {}-byte key for this enc, got {}",
                key_len,
                self.key.len()
            )));
        }
        Ok((Cow::Borrowed(&self.key), None))
    }
}

#[derive(Debug, Clone)]
pub struct DirectJweDecrypter {
    key: Vec<u8>,
    key_id: Option<String>,
}

impl JweDecrypter for DirectJweDecrypter {
    fn algorithm(&self) -> &dyn JweAlgorithm {
        &DIR
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
        if encrypted_key.map_or(false, |k| !k.is_empty()) {
            return Err(JoseError::DecryptionFailed);
        }
        if self.key.len() != key_len {
            return Err(JoseError::InvalidKeyLength(anyhow::anyhow!(
                "dir requires a {}-byte key for this enc, got {}",
                key_len,
                self.key.len()
            )));
        }
        Ok(Cow::Borrowed(&self.key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encrypt_and_decrypt_round_trip() {
        let key = vec![7u8; 32];
        let encrypter = DIR.encrypter_from_bytes(&key).unwrap();
        let decrypter = DIR.decrypter_from_bytes(&key).unwrap();

        let mut header = JweHeader::new();
        let (cek, encrypted_key) = encrypter.encrypt(&mut header, 32).unwrap();
        assert!(encrypted_key.is_none());

        let recovered = decrypter.decrypt(&header, encrypted_key.as_deref(), 32).unwrap();
        assert_eq!(&cek[..], &recovered[..]);
    }
}
