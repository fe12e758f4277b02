//! `RSA-OAEP`, `RSA-OAEP-256`, and the deprecated `RSA1_5` (spec §4.4.1):
//! a random CEK RSA-encrypted under the recipient's public key.
//!
//! `RSA1_5` unwrap is a classic Bleichenbacher padding oracle: on any
//! unwrap failure, or a recovered key of the wrong length, this returns
//! a freshly generated random CEK of the correct length rather than an
//! error, so a timing or branching difference can never tell an
//! attacker whether the padding was valid (RFC 7518 §4.3, the "random
//! CEK fallback" countermeasure). `RSA1_5` is also gated behind
//! [`JoseConfig::allow_rsa1_5`] since it cannot be used safely as a
//! general-purpose decryption oracle.

use std::borrow::Cow;
use std::ops::Deref;

use openssl::encrypt::{Decrypter, Encrypter};
use openssl::hash::MessageDigest;
use openssl::pkey::{PKey, Private, Public};
use openssl::rsa::Padding;

use crate::config::JoseConfig;
use crate::error::JoseError;
use crate::jwe::jwe_algorithm::{JweAlgorithm, JweDecrypter, JweEncrypter};
use crate::jwe::jwe_header::JweHeader;
use crate::jws::alg::rsassa::{rsa_private_from_jwk, rsa_public_from_jwk};
use crate::jwk::Jwk;
use crate::util;

const MIN_MODULUS_BITS: u32 = 2048;

#[derive(Debug, Eq, PartialEq, Copy, Clone)]
pub enum RsaesJweAlgorithm {
    Rsa1_5,
    RsaOaep,
    RsaOaep256,
}

impl RsaesJweAlgorithm {
    fn padding(&self) -> Padding {
        match self {
            Self::Rsa1_5 => Padding::PKCS1,
            Self::RsaOaep | Self::RsaOaep256 => Padding::PKCS1_OAEP,
        }
    }

    fn oaep_digest(&self) -> Option<MessageDigest> {
        match self {
            Self::Rsa1_5 => None,
            Self::RsaOaep => Some(MessageDigest::sha1()),
            Self::RsaOaep256 => Some(MessageDigest::sha256()),
        }
    }

    fn check_modulus(&self, bits: u32) -> Result<(), JoseError> {
        if bits < MIN_MODULUS_BITS {
            return Err(JoseError::InvalidKeyLength(anyhow::anyhow!(
                "{} requires an RSA modulus of at least {} bits, got {}",
                self.name(),
                MIN_MODULUS_BITS,
                bits
            )));
        }
        Ok(())
    }

    pub fn encrypter_from_jwk(&self, jwk: &Jwk) -> Result<RsaesJweEncrypter, JoseError> {
        check_jwk(self, jwk)?;
        let rsa = rsa_public_from_jwk(jwk).map_err(JoseError::from_anyhow_key)?;
        self.check_modulus(rsa.size() * 8)?;
        let pkey = PKey::from_rsa(rsa).map_err(JoseError::from)?;
        Ok(RsaesJweEncrypter { algorithm: *self, public_key: pkey, key_id: jwk.key_id().map(str::to_string) })
    }

    pub fn decrypter_from_jwk(&self, jwk: &Jwk) -> Result<RsaesJweDecrypter, JoseError> {
        check_jwk(self, jwk)?;
        let rsa = rsa_private_from_jwk(jwk).map_err(JoseError::from_anyhow_key)?;
        self.check_modulus(rsa.size() * 8)?;
        let pkey = PKey::from_rsa(rsa).map_err(JoseError::from)?;
        Ok(RsaesJweDecrypter {
            algorithm: *self,
            private_key: pkey,
            key_id: jwk.key_id().map(str::to_string),
            config: JoseConfig::default(),
        })
    }
}

fn check_jwk(alg: &RsaesJweAlgorithm, jwk: &Jwk) -> Result<(), JoseError> {
    if jwk.key_type() != "RSA" {
        return Err(JoseError::KeyTypeMismatch(anyhow::anyhow!(
            "{} requires kty=RSA, found {}",
            alg.name(),
            jwk.key_type()
        )));
    }
    Ok(())
}

impl JweAlgorithm for RsaesJweAlgorithm {
    fn name(&self) -> &str {
        match self {
            Self::Rsa1_5 => "RSA1_5",
            Self::RsaOaep => "RSA-OAEP",
            Self::RsaOaep256 => "RSA-OAEP-256",
        }
    }
}

impl Deref for RsaesJweAlgorithm {
    type Target = dyn JweAlgorithm;

    fn deref(&self) -> &Self::Target {
        self
    }
}

#[derive(Clone)]
pub struct RsaesJweEncrypter {
    algorithm: RsaesJweAlgorithm,
    public_key: PKey<Public>,
    key_id: Option<String>,
}

impl JweEncrypter for RsaesJweEncrypter {
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

        let mut encrypter = Encrypter::new(&self.public_key).map_err(JoseError::from)?;
        encrypter.set_rsa_padding(self.algorithm.padding()).map_err(JoseError::from)?;
        if let Some(digest) = self.algorithm.oaep_digest() {
            encrypter.set_rsa_oaep_md(digest).map_err(JoseError::from)?;
            encrypter.set_rsa_mgf1_md(digest).map_err(JoseError::from)?;
        }
        let buf_len = encrypter.encrypt_len(&cek).map_err(JoseError::from)?;
        let mut encrypted = vec![0u8; buf_len];
        let written = encrypter.encrypt(&cek, &mut encrypted).map_err(JoseError::from)?;
        encrypted.truncate(written);

        Ok((Cow::Owned(cek), Some(encrypted)))
    }
}

#[derive(Clone)]
pub struct RsaesJweDecrypter {
    algorithm: RsaesJweAlgorithm,
    private_key: PKey<Private>,
    key_id: Option<String>,
    config: JoseConfig,
}

impl RsaesJweDecrypter {
    pub fn with_config(mut self, config: JoseConfig) -> Self {
        self.config = config;
        self
    }
}

impl JweDecrypter for RsaesJweDecrypter {
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

        if matches!(self.algorithm, RsaesJweAlgorithm::Rsa1_5) && !self.config.allow_rsa1_5 {
            return Err(JoseError::UnsupportedAlgorithm(anyhow::anyhow!(
                "RSA1_5 is disabled by policy; enable JoseConfig::allow_rsa1_5 to accept it"
            )));
        }

        let rsa = self.private_key.rsa().map_err(JoseError::from)?;

        if matches!(self.algorithm, RsaesJweAlgorithm::Rsa1_5) {
            let mut recovered = vec![0u8; rsa.size() as usize];
            let result = rsa.private_decrypt(encrypted_key, &mut recovered, self.algorithm.padding());
            let cek = match result {
                Ok(written) if written == key_len => recovered[..written].to_vec(),
                _ => util::rand_bytes(key_len),
            };
            return Ok(Cow::Owned(cek));
        }

        let digest = self.algorithm.oaep_digest().expect("OAEP variants always carry a digest");
        let mut decrypter = Decrypter::new(&self.private_key).map_err(JoseError::from)?;
        decrypter.set_rsa_padding(self.algorithm.padding()).map_err(JoseError::from)?;
        decrypter.set_rsa_oaep_md(digest).map_err(JoseError::from)?;
        decrypter.set_rsa_mgf1_md(digest).map_err(JoseError::from)?;

        let result = (|| -> Result<Vec<u8>, ()> {
            let buf_len = decrypter.decrypt_len(encrypted_key).map_err(|_| ())?;
            let mut out = vec![0u8; buf_len];
            let written = decrypter.decrypt(encrypted_key, &mut out).map_err(|_| ())?;
            out.truncate(written);
            Ok(out)
        })();

        match result {
            Ok(out) if out.len() == key_len => Ok(Cow::Owned(out)),
            _ => Err(JoseError::DecryptionFailed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use openssl::rsa::Rsa;

    fn jwk_pair() -> (Jwk, Jwk) {
        let rsa = Rsa::generate(2048).unwrap();
        let mut private = Jwk::new("RSA");
        private.set_parameter("n", Some(serde_json::json!(util::encode_base64_urlsafe_nopad(rsa.n().to_vec())))).unwrap();
        private.set_parameter("e", Some(serde_json::json!(util::encode_base64_urlsafe_nopad(rsa.e().to_vec())))).unwrap();
        private.set_parameter("d", Some(serde_json::json!(util::encode_base64_urlsafe_nopad(rsa.d().to_vec())))).unwrap();
        private.set_parameter("p", Some(serde_json::json!(util::encode_base64_urlsafe_nopad(rsa.p().unwrap().to_vec())))).unwrap();
        private.set_parameter("q", Some(serde_json::json!(util::encode_base64_urlsafe_nopad(rsa.q().unwrap().to_vec())))).unwrap();
        private.set_parameter("dp", Some(serde_json::json!(util::encode_base64_urlsafe_nopad(rsa.dmp1().unwrap().to_vec())))).unwrap();
        private.set_parameter("dq", Some(serde_json::json!(util::encode_base64_urlsafe_nopad(rsa.dmq1().unwrap().to_vec())))).unwrap();
        private.set_parameter("qi", Some(serde_json::json!(util::encode_base64_urlsafe_nopad(rsa.iqmp().unwrap().to_vec())))).unwrap();

        let mut public = Jwk::new("RSA");
        public.set_parameter("n", private.parameter("n").cloned()).unwrap();
        public.set_parameter("e", private.parameter("e").cloned()).unwrap();

        (private, public)
    }

    #[test]
    fn oaep_round_trips() {
        let (private, public) = jwk_pair();
        let encrypter = RsaesJweAlgorithm::RsaOaep.encrypter_from_jwk(&public).unwrap();
        let decrypter = RsaesJweAlgorithm::RsaOaep.decrypter_from_jwk(&private).unwrap();

        let mut header = JweHeader::new();
        let (cek, encrypted_key) = encrypter.encrypt(&mut header, 32).unwrap();
        let encrypted_key = encrypted_key.unwrap();

        let recovered = decrypter.decrypt(&header, Some(&encrypted_key), 32).unwrap();
        assert_eq!(&cek[..], &recovered[..]);
    }

    #[test]
    fn oaep256_round_trips() {
        let (private, public) = jwk_pair();
        let encrypter = RsaesJweAlgorithm::RsaOaep256.encrypter_from_jwk(&public).unwrap();
        let decrypter = RsaesJweAlgorithm::RsaOaep256.decrypter_from_jwk(&private).unwrap();

        let mut header = JweHeader::new();
        let (cek, encrypted_key) = encrypter.encrypt(&mut header, 32).unwrap();
        let encrypted_key = encrypted_key.unwrap();

        let recovered = decrypter.decrypt(&header, Some(&encrypted_key), 32).unwrap();
        assert_eq!(&cek[..], &recovered[..]);
    }

    #[test]
    fn rsa1_5_disabled_by_default() {
        let (private, _public) = jwk_pair();
        let decrypter = RsaesJweAlgorithm::Rsa1_5.decrypter_from_jwk(&private).unwrap();

        let header = JweHeader::new();
        assert!(decrypter.decrypt(&header, Some(&[0u8; 256]), 32).is_err());
    }

    #[test]
    fn rsa1_5_falls_back_to_random_cek_on_bad_ciphertext() {
        let (private, _public) = jwk_pair();
        let decrypter = RsaesJweAlgorithm::Rsa1_5.decrypter_from_jwk(&private).unwrap().with_config(JoseConfig {
            allow_rsa1_5: true,
            ..JoseConfig::default()
        });

        let header = JweHeader::new();
        let recovered = decrypter.decrypt(&header, Some(&[0u8; 256]), 32).unwrap();
        assert_eq!(recovered.len(), 32);
    }
}
