//! PBES2-HS256+A128KW / PBES2-HS384+A192KW / PBES2-HS512+A256KW
//! (spec §4.4.1, §4.5): a KEK is derived from a password via PBKDF2
//! over a salt formatted as `alg_identifier || 0x00 || raw_salt`, then
//! used to AES-KW wrap a random CEK. `p2s` carries the raw salt, `p2c`
//! the iteration count; decryption enforces the configured iteration
//! policy bounds to block DoS via an inflated `p2c`.

use std::borrow::Cow;
use std::convert::TryFrom;
use std::ops::Deref;

use openssl::aes::{unwrap_key, wrap_key, AesKey};

use crate::config::JoseConfig;
use crate::error::JoseError;
use crate::jwe::jwe_algorithm::{JweAlgorithm, JweDecrypter, JweEncrypter};
use crate::jwe::jwe_header::JweHeader;
use crate::jwk::Jwk;
use crate::util::hash::HashAlgorithm;
use crate::util::{self, pbkdf2};

const MIN_SALT_LEN: usize = 8;
const DEFAULT_SALT_LEN: usize = 8;
const DEFAULT_ITER_COUNT: u32 = 1000;

#[derive(Debug, Eq, PartialEq, Copy, Clone)]
pub enum Pbes2HmacAeskwJweAlgorithm {
    Pbes2Hs256A128kw,
    Pbes2Hs384A192kw,
    Pbes2Hs512A256kw,
}

impl Pbes2HmacAeskwJweAlgorithm {
    fn hash_algorithm(&self) -> HashAlgorithm {
        match self {
            Self::Pbes2Hs256A128kw => HashAlgorithm::Sha256,
            Self::Pbes2Hs384A192kw => HashAlgorithm::Sha384,
            Self::Pbes2Hs512A256kw => HashAlgorithm::Sha512,
        }
    }

    fn derived_key_len(&self) -> usize {
        match self {
            Self::Pbes2Hs256A128kw => 16,
            Self::Pbes2Hs384A192kw => 24,
            Self::Pbes2Hs512A256kw => 32,
        }
    }

    pub fn encrypter_from_bytes(&self, password: impl AsRef<[u8]>) -> Result<Pbes2HmacAeskwJweEncrypter, JoseError> {
        let password = password.as_ref().to_vec();
        if password.is_empty() {
            return Err(JoseError::InvalidKeyLength(anyhow::anyhow!("the password must not be empty")));
        }
        Ok(Pbes2HmacAeskwJweEncrypter {
            algorithm: *self,
            password,
            salt_len: DEFAULT_SALT_LEN,
            iter_count: DEFAULT_ITER_COUNT,
            key_id: None,
        })
    }

    pub fn decrypter_from_bytes(&self, password: impl AsRef<[u8]>) -> Result<Pbes2HmacAeskwJweDecrypter, JoseError> {
        let password = password.as_ref().to_vec();
        if password.is_empty() {
            return Err(JoseError::InvalidKeyLength(anyhow::anyhow!("the password must not be empty")));
        }
        Ok(Pbes2HmacAeskwJweDecrypter {
            algorithm: *self,
            password,
            key_id: None,
            config: JoseConfig::default(),
        })
    }

    pub fn encrypter_from_jwk(&self, jwk: &Jwk) -> Result<Pbes2HmacAeskwJweEncrypter, JoseError> {
        check_jwk(self, jwk)?;
        let password = jwk.parameter_bytes("k").map_err(JoseError::from_anyhow_key)?;
        let mut encrypter = self.encrypter_from_bytes(password)?;
        encrypter.key_id = jwk.key_id().map(str::to_string);
        Ok(encrypter)
    }

    pub fn decrypter_from_jwk(&self, jwk: &Jwk) -> Result<Pbes2HmacAeskwJweDecrypter, JoseError> {
        check_jwk(self, jwk)?;
        let password = jwk.parameter_bytes("k").map_err(JoseError::from_anyhow_key)?;
        let mut decrypter = self.decrypter_from_bytes(password)?;
        decrypter.key_id = jwk.key_id().map(str::to_string);
        Ok(decrypter)
    }

    fn formatted_salt(&self, raw_salt: &[u8]) -> Vec<u8> {
        util::concat(&[self.name().as_bytes(), &[0], raw_salt])
    }
}

fn check_jwk(alg: &Pbes2HmacAeskwJweAlgorithm, jwk: &Jwk) -> Result<(), JoseError> {
    (|| -> anyhow::Result<()> {
        if jwk.key_type() != "oct" {
            anyhow::bail!("a {} key must have kty=oct, found {}", alg.name(), jwk.key_type());
        }
        if !jwk.is_for_key_operation("deriveKey") {
            anyhow::bail!("a {} key's key_ops must contain deriveKey", alg.name());
        }
        Ok(())
    })()
    .map_err(JoseError::from_anyhow_key)
}

impl JweAlgorithm for Pbes2HmacAeskwJweAlgorithm {
    fn name(&self) -> &str {
        match self {
            Self::Pbes2Hs256A128kw => "PBES2-HS256+A128KW",
            Self::Pbes2Hs384A192kw => "PBES2-HS384+A192KW",
            Self::Pbes2Hs512A256kw => "PBES2-HS512+A256KW",
        }
    }
}

impl Deref for Pbes2HmacAeskwJweAlgorithm {
    type Target = dyn JweAlgorithm;

    fn deref(&self) -> &Self::Target {
        self
    }
}

#[derive(Debug, Clone)]
pub struct Pbes2HmacAeskwJweEncrypter {
    algorithm: Pbes2HmacAeskwJweAlgorithm,
    password: Vec<u8>,
    salt_len: usize,
    iter_count: u32,
    key_id: Option<String>,
}

impl Pbes2HmacAeskwJweEncrypter {
    pub fn set_salt_len(&mut self, salt_len: usize) -> Result<(), JoseError> {
        if salt_len < MIN_SALT_LEN {
            return Err(JoseError::InvalidSalt(anyhow::anyhow!(
                "salt_len must be at least {} bytes, got {}",
                MIN_SALT_LEN,
                salt_len
            )));
        }
        self.salt_len = salt_len;
        Ok(())
    }

    pub fn set_iter_count(&mut self, iter_count: u32) -> Result<(), JoseError> {
        if iter_count < 1 {
            return Err(JoseError::InvalidIterationCount(anyhow::anyhow!(
                "iter_count must be at least 1"
            )));
        }
        self.iter_count = iter_count;
        Ok(())
    }
}

impl JweEncrypter for Pbes2HmacAeskwJweEncrypter {
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
        let raw_salt = match header.claim_base64("p2s").map_err(JoseError::from_anyhow_malformed)? {
            Some(val) => {
                if val.len() < MIN_SALT_LEN {
                    return Err(JoseError::InvalidSalt(anyhow::anyhow!(
                        "p2s must decode to at least {} bytes, got {}",
                        MIN_SALT_LEN,
                        val.len()
                    )));
                }
                val
            }
            None => {
                let salt = util::rand_bytes(self.salt_len);
                header.set_claim(
                    "p2s",
                    Some(serde_json::Value::String(util::encode_base64_urlsafe_nopad(&salt))),
                )?;
                salt
            }
        };

        let p2c = match header.claim_u64("p2c").map_err(JoseError::from_anyhow_malformed)? {
            Some(val) => u32::try_from(val).map_err(|_| {
                JoseError::InvalidIterationCount(anyhow::anyhow!("p2c overflowed a u32: {}", val))
            })?,
            None => {
                header.set_claim(
                    "p2c",
                    Some(serde_json::Value::Number(self.iter_count.into())),
                )?;
                self.iter_count
            }
        };

        let salt = self.algorithm.formatted_salt(&raw_salt);
        let kek = pbkdf2::derive(self.algorithm.hash_algorithm(), &self.password, &salt, p2c, self.algorithm.derived_key_len())?;

        let cek = util::rand_bytes(key_len);
        let aes = AesKey::new_encrypt(&kek)
            .map_err(|_| JoseError::ProviderError(anyhow::anyhow!("failed to set AES-KW encryption key")))?;
        let mut wrapped = vec![0u8; key_len + 8];
        let written = wrap_key(&aes, None, &mut wrapped, &cek)
            .map_err(|_| JoseError::ProviderError(anyhow::anyhow!("failed to wrap the CEK")))?;
        wrapped.truncate(written);

        Ok((Cow::Owned(cek), Some(wrapped)))
    }
}

#[derive(Debug, Clone)]
pub struct Pbes2HmacAeskwJweDecrypter {
    algorithm: Pbes2HmacAeskwJweAlgorithm,
    password: Vec<u8>,
    key_id: Option<String>,
    config: JoseConfig,
}

impl Pbes2HmacAeskwJweDecrypter {
    pub fn with_config(mut self, config: JoseConfig) -> Self {
        self.config = config;
        self
    }
}

impl JweDecrypter for Pbes2HmacAeskwJweDecrypter {
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

        let raw_salt = header
            .claim_base64("p2s")
            .map_err(JoseError::from_anyhow_malformed)?
            .ok_or_else(|| JoseError::InvalidSalt(anyhow::anyhow!("the \"p2s\" header claim is required")))?;
        if raw_salt.len() < MIN_SALT_LEN {
            return Err(JoseError::InvalidSalt(anyhow::anyhow!(
                "p2s must decode to at least {} bytes, got {}",
                MIN_SALT_LEN,
                raw_salt.len()
            )));
        }

        let p2c = header
            .claim_u64("p2c")
            .map_err(JoseError::from_anyhow_malformed)?
            .ok_or_else(|| JoseError::InvalidIterationCount(anyhow::anyhow!("the \"p2c\" header claim is required")))?;
        let p2c = u32::try_from(p2c).map_err(|_| {
            JoseError::IterationPolicyExceeded(anyhow::anyhow!("p2c {} overflowed a u32", p2c))
        })?;

        if p2c < self.config.min_pbes2_iterations || p2c > self.config.max_pbes2_iterations {
            return Err(JoseError::IterationPolicyExceeded(anyhow::anyhow!(
                "p2c {} is outside the policy window [{}, {}]",
                p2c,
                self.config.min_pbes2_iterations,
                self.config.max_pbes2_iterations
            )));
        }

        let salt = self.algorithm.formatted_salt(&raw_salt);
        let kek = pbkdf2::derive(self.algorithm.hash_algorithm(), &self.password, &salt, p2c, self.algorithm.derived_key_len())?;

        let aes = AesKey::new_decrypt(&kek).map_err(|_| JoseError::DecryptionFailed)?;
        let mut cek = vec![0u8; key_len];
        let written = unwrap_key(&aes, None, &mut cek, encrypted_key).map_err(|_| JoseError::DecryptionFailed)?;
        if written != key_len {
            return Err(JoseError::DecryptionFailed);
        }

        Ok(Cow::Owned(cek))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jwe::jwe_header::JweHeader;

    #[test]
    fn encrypt_and_decrypt_round_trip() {
        let alg = Pbes2HmacAeskwJweAlgorithm::Pbes2Hs256A128kw;
        let password = b"Thus from my lips, by yours, my sin is purged.";

        let encrypter = alg.encrypter_from_bytes(&password[..]).unwrap();
        let decrypter = alg.decrypter_from_bytes(&password[..]).unwrap();

        let mut header = JweHeader::new();
        let (cek, encrypted_key) = encrypter.encrypt(&mut header, 32).unwrap();
        let encrypted_key = encrypted_key.unwrap();

        let recovered = decrypter.decrypt(&header, Some(&encrypted_key), 32).unwrap();
        assert_eq!(&cek[..], &recovered[..]);
    }

    /// RFC 7517 Appendix C: the password, salt, and iteration count used
    /// to encrypt the example RSA private key must derive the published
    /// KEK. Pinning this catches a `formatted_salt`/PBKDF2 bug that a
    /// random-salt round-trip test can't, since encrypt and decrypt in
    /// this module share the same derivation code and would round-trip
    /// green even with a non-interoperable salt format.
    #[test]
    fn rfc7517_appendix_c_matches_published_derived_key() {
        let alg = Pbes2HmacAeskwJweAlgorithm::Pbes2Hs256A128kw;
        let password = b"Thus from my lips, by yours, my sin is purged.";
        let raw_salt: [u8; 16] =
            [217, 96, 147, 112, 150, 117, 70, 247, 127, 8, 155, 137, 174, 42, 80, 215];
        let iter_count = 4096;

        let formatted_salt = alg.formatted_salt(&raw_salt);
        assert_eq!(
            formatted_salt,
            vec![
                80, 66, 69, 83, 50, 45, 72, 83, 50, 53, 54, 43, 65, 49, 50, 56, 75, 87, 0, 217,
                96, 147, 112, 150, 117, 70, 247, 127, 8, 155, 137, 174, 42, 80, 215
            ]
        );

        let kek =
            pbkdf2::derive(alg.hash_algorithm(), &password[..], &formatted_salt, iter_count, alg.derived_key_len())
                .unwrap();
        assert_eq!(
            kek,
            vec![110, 171, 169, 92, 129, 92, 109, 117, 233, 242, 116, 233, 170, 14, 24, 75]
        );
    }

    #[test]
    fn rejects_short_salt() {
        let alg = Pbes2HmacAeskwJweAlgorithm::Pbes2Hs256A128kw;
        let password = b"password";
        let decrypter = alg.decrypter_from_bytes(&password[..]).unwrap();

        let mut header = JweHeader::new();
        header
            .set_claim("p2s", Some(serde_json::json!(util::encode_base64_urlsafe_nopad(b"short"))))
            .unwrap();
        header.set_claim("p2c", Some(serde_json::json!(1000))).unwrap();

        assert!(decrypter.decrypt(&header, Some(&[0u8; 40]), 32).is_err());
    }

    #[test]
    fn rejects_iteration_count_above_policy() {
        let alg = Pbes2HmacAeskwJweAlgorithm::Pbes2Hs256A128kw;
        let password = b"password";
        let decrypter = alg.decrypter_from_bytes(&password[..]).unwrap();

        let mut header = JweHeader::new();
        header
            .set_claim("p2s", Some(serde_json::json!(util::encode_base64_urlsafe_nopad(&[1u8; 8]))))
            .unwrap();
        header.set_claim("p2c", Some(serde_json::json!(10_000_000))).unwrap();

        let err = decrypter.decrypt(&header, Some(&[0u8; 40]), 32).unwrap_err();
        assert!(matches!(err, JoseError::IterationPolicyExceeded(_)));
    }
}
