//! HS256 / HS384 / HS512 (spec §4.3): HMAC-SHA2 over a symmetric key at
//! least as long as the hash output.

use std::ops::Deref;

use anyhow::bail;

use crate::error::JoseError;
use crate::jwk::Jwk;
use crate::jws::jws_algorithm::{JwsAlgorithm, JwsSigner, JwsVerifier};
use crate::util::hash::{hmac, HashAlgorithm};
use crate::util::{self, constant_time_eq};

#[derive(Debug, Eq, PartialEq, Copy, Clone)]
pub enum HmacJwsAlgorithm {
    Hs256,
    Hs384,
    Hs512,
}

impl HmacJwsAlgorithm {
    pub fn signer_from_bytes(&self, key: impl AsRef<[u8]>) -> Result<HmacJwsSigner, JoseError> {
        let key = key.as_ref().to_vec();
        self.check_key_length(&key)?;
        Ok(HmacJwsSigner { algorithm: *self, private_key: key, key_id: None })
    }

    pub fn verifier_from_bytes(&self, key: impl AsRef<[u8]>) -> Result<HmacJwsVerifier, JoseError> {
        let key = key.as_ref().to_vec();
        self.check_key_length(&key)?;
        Ok(HmacJwsVerifier { algorithm: *self, private_key: key, key_id: None })
    }

    fn check_key_length(&self, key: &[u8]) -> Result<(), JoseError> {
        if key.len() < self.hash_algorithm().output_len() {
            return Err(JoseError::InvalidKeyLength(anyhow::anyhow!(
                "{} requires a key at least {} bytes long, got {}",
                self.name(),
                self.hash_algorithm().output_len(),
                key.len()
            )));
        }
        Ok(())
    }

    fn hash_algorithm(&self) -> HashAlgorithm {
        match self {
            Self::Hs256 => HashAlgorithm::Sha256,
            Self::Hs384 => HashAlgorithm::Sha384,
            Self::Hs512 => HashAlgorithm::Sha512,
        }
    }
}

impl JwsAlgorithm for HmacJwsAlgorithm {
    fn name(&self) -> &str {
        match self {
            Self::Hs256 => "HS256",
            Self::Hs384 => "HS384",
            Self::Hs512 => "HS512",
        }
    }

    fn key_type(&self) -> &str {
        "oct"
    }

    fn signature_len(&self) -> usize {
        self.hash_algorithm().output_len()
    }

    fn signer_from_jwk(&self, jwk: &Jwk) -> Result<Box<dyn JwsSigner>, JoseError> {
        check_jwk(self, jwk)?;
        let key = jwk.parameter_bytes("k").map_err(JoseError::from_anyhow_key)?;
        let mut signer = self.signer_from_bytes(&key)?;
        signer.key_id = jwk.key_id().map(str::to_string);
        Ok(Box::new(signer))
    }

    fn verifier_from_jwk(&self, jwk: &Jwk) -> Result<Box<dyn JwsVerifier>, JoseError> {
        check_jwk(self, jwk)?;
        let key = jwk.parameter_bytes("k").map_err(JoseError::from_anyhow_key)?;
        let mut verifier = self.verifier_from_bytes(&key)?;
        verifier.key_id = jwk.key_id().map(str::to_string);
        Ok(Box::new(verifier))
    }
}

fn check_jwk(alg: &HmacJwsAlgorithm, jwk: &Jwk) -> Result<(), JoseError> {
    (|| -> anyhow::Result<()> {
        if jwk.key_type() != "oct" {
            bail!("a {} key must have kty=oct, found {}", alg.name(), jwk.key_type());
        }
        if let Some(use_) = jwk.key_use() {
            if use_ != "sig" {
                bail!("a {} key's \"use\" must be sig, found {}", alg.name(), use_);
            }
        }
        if let Some(jwk_alg) = jwk.algorithm() {
            if jwk_alg != alg.name() {
                bail!("JWK alg {} does not match {}", jwk_alg, alg.name());
            }
        }
        Ok(())
    })()
    .map_err(JoseError::from_anyhow_key)
}

impl Deref for HmacJwsAlgorithm {
    type Target = dyn JwsAlgorithm;

    fn deref(&self) -> &Self::Target {
        self
    }
}

#[derive(Debug, Clone)]
pub struct HmacJwsSigner {
    algorithm: HmacJwsAlgorithm,
    private_key: Vec<u8>,
    key_id: Option<String>,
}

impl JwsSigner for HmacJwsSigner {
    fn algorithm(&self) -> &dyn JwsAlgorithm {
        &self.algorithm
    }

    fn key_id(&self) -> Option<&str> {
        self.key_id.as_deref()
    }

    fn sign(&self, message: &[u8]) -> Result<Vec<u8>, JoseError> {
        hmac(self.algorithm.hash_algorithm(), &self.private_key, message)
    }
}

#[derive(Debug, Clone)]
pub struct HmacJwsVerifier {
    algorithm: HmacJwsAlgorithm,
    private_key: Vec<u8>,
    key_id: Option<String>,
}

impl JwsVerifier for HmacJwsVerifier {
    fn algorithm(&self) -> &dyn JwsAlgorithm {
        &self.algorithm
    }

    fn key_id(&self) -> Option<&str> {
        self.key_id.as_deref()
    }

    fn verify(&self, message: &[u8], signature: &[u8]) -> Result<(), JoseError> {
        let expected = hmac(self.algorithm.hash_algorithm(), &self.private_key, message)?;
        if constant_time_eq(&expected, signature) {
            Ok(())
        } else {
            Err(JoseError::SignatureInvalid)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // RFC 7519 §3.1 / RFC 7515 Appendix A.1: the exact HS256 compact JWS,
    // matched byte-for-byte against the published signature. The encoded
    // header and payload segments are taken verbatim from the RFC (not
    // re-derived from JSON) since the signing input is defined over those
    // exact octets, CRLFs included.
    #[test]
    fn rfc7519_hs256_vector() {
        let key = b"\x03\x23\x35\x4b\x2b\x0f\xa5\xbc\x83\x7e\x06\x65\x77\x7b\xa6\x8f\
                     \x5a\xb3\x28\xe6\xf0\x54\xc9\x28\xa9\x0f\x84\xb2\xd2\x50\x2e\xbf\
                     \xd3\xfb\x5a\x92\xd2\x06\x47\xef\x96\x8a\xb4\xc3\x77\x62\x3d\x22";

        let header_b64 = "eyJ0eXAiOiJKV1QiLCJhbGciOiJIUzI1NiJ9";
        let payload_b64 =
            "eyJpc3MiOiJqb2UiLA0KICJleHAiOjEzMDA4MTkzODAsDQogImh0dHA6Ly9leGFtcGxlLmNvbS9pc19yb290Ijp0cnVlfQ";
        let signing_input = format!("{}.{}", header_b64, payload_b64);

        let signer = HmacJwsAlgorithm::Hs256.signer_from_bytes(&key[..]).unwrap();
        let signature = signer.sign(signing_input.as_bytes()).unwrap();
        assert_eq!(
            util::encode_base64_urlsafe_nopad(&signature),
            "dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk"
        );

        let verifier = HmacJwsAlgorithm::Hs256.verifier_from_bytes(&key[..]).unwrap();
        assert!(verifier.verify(signing_input.as_bytes(), &signature).is_ok());
    }

    #[test]
    fn rejects_too_short_key() {
        assert!(HmacJwsAlgorithm::Hs256.signer_from_bytes(vec![0u8; 16]).is_err());
    }

    #[test]
    fn rejects_tampered_signature() {
        let signer = HmacJwsAlgorithm::Hs256.signer_from_bytes(vec![0u8; 32]).unwrap();
        let verifier = HmacJwsAlgorithm::Hs256.verifier_from_bytes(vec![0u8; 32]).unwrap();
        let mut sig = signer.sign(b"hello").unwrap();
        sig[0] ^= 0xFF;
        assert!(verifier.verify(b"hello", &sig).is_err());
    }
}
