//! PS256 / PS384 / PS512 (spec §4.3): RSASSA-PSS with MGF1 and a salt
//! length equal to the hash length, over an RSA key of at least 2048
//! bits.

use std::ops::Deref;

use openssl::hash::MessageDigest;
use openssl::pkey::{PKey, Private, Public};
use openssl::rsa::Rsa;
use openssl::rsa::Padding;
use openssl::sign::{RsaPssSaltlen, Signer, Verifier};

use crate::error::JoseError;
use crate::jwk::Jwk;
use crate::jws::alg::rsassa::{rsa_private_from_jwk, rsa_public_from_jwk};
use crate::jws::jws_algorithm::{JwsAlgorithm, JwsSigner, JwsVerifier};

const MIN_MODULUS_BITS: u32 = 2048;

#[derive(Debug, Eq, PartialEq, Copy, Clone)]
pub enum RsaPssJwsAlgorithm {
    Ps256,
    Ps384,
    Ps512,
}

impl RsaPssJwsAlgorithm {
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

    fn message_digest(&self) -> MessageDigest {
        match self {
            Self::Ps256 => MessageDigest::sha256(),
            Self::Ps384 => MessageDigest::sha384(),
            Self::Ps512 => MessageDigest::sha512(),
        }
    }

    fn salt_len(&self) -> i32 {
        match self {
            Self::Ps256 => 32,
            Self::Ps384 => 48,
            Self::Ps512 => 64,
        }
    }
}

impl JwsAlgorithm for RsaPssJwsAlgorithm {
    fn name(&self) -> &str {
        match self {
            Self::Ps256 => "PS256",
            Self::Ps384 => "PS384",
            Self::Ps512 => "PS512",
        }
    }

    fn key_type(&self) -> &str {
        "RSA"
    }

    fn signature_len(&self) -> usize {
        0
    }

    fn signer_from_jwk(&self, jwk: &Jwk) -> Result<Box<dyn JwsSigner>, JoseError> {
        if jwk.key_type() != "RSA" {
            return Err(JoseError::KeyTypeMismatch(anyhow::anyhow!(
                "{} requires kty=RSA, found {}",
                self.name(),
                jwk.key_type()
            )));
        }
        let rsa = rsa_private_from_jwk(jwk).map_err(JoseError::from_anyhow_key)?;
        self.check_modulus(rsa.size() * 8)?;
        let pkey = PKey::from_rsa(rsa).map_err(JoseError::from)?;
        Ok(Box::new(RsaPssJwsSigner {
            algorithm: *self,
            private_key: pkey,
            key_id: jwk.key_id().map(str::to_string),
        }))
    }

    fn verifier_from_jwk(&self, jwk: &Jwk) -> Result<Box<dyn JwsVerifier>, JoseError> {
        if jwk.key_type() != "RSA" {
            return Err(JoseError::KeyTypeMismatch(anyhow::anyhow!(
                "{} requires kty=RSA, found {}",
                self.name(),
                jwk.key_type()
            )));
        }
        let rsa = rsa_public_from_jwk(jwk).map_err(JoseError::from_anyhow_key)?;
        self.check_modulus(rsa.size() * 8)?;
        let pkey = PKey::from_rsa(rsa).map_err(JoseError::from)?;
        Ok(Box::new(RsaPssJwsVerifier {
            algorithm: *self,
            public_key: pkey,
            key_id: jwk.key_id().map(str::to_string),
        }))
    }
}

impl Deref for RsaPssJwsAlgorithm {
    type Target = dyn JwsAlgorithm;

    fn deref(&self) -> &Self::Target {
        self
    }
}

#[derive(Clone)]
pub struct RsaPssJwsSigner {
    algorithm: RsaPssJwsAlgorithm,
    private_key: PKey<Private>,
    key_id: Option<String>,
}

impl RsaPssJwsSigner {
    pub fn from_der(algorithm: RsaPssJwsAlgorithm, der: &[u8]) -> Result<Self, JoseError> {
        let rsa = Rsa::private_key_from_der(der).map_err(JoseError::from)?;
        algorithm.check_modulus(rsa.size() * 8)?;
        let pkey = PKey::from_rsa(rsa).map_err(JoseError::from)?;
        Ok(RsaPssJwsSigner { algorithm, private_key: pkey, key_id: None })
    }
}

impl JwsSigner for RsaPssJwsSigner {
    fn algorithm(&self) -> &dyn JwsAlgorithm {
        &self.algorithm
    }

    fn key_id(&self) -> Option<&str> {
        self.key_id.as_deref()
    }

    fn sign(&self, message: &[u8]) -> Result<Vec<u8>, JoseError> {
        let mut signer = Signer::new(self.algorithm.message_digest(), &self.private_key)
            .map_err(JoseError::from)?;
        signer.set_rsa_padding(Padding::PKCS1_PSS).map_err(JoseError::from)?;
        signer
            .set_rsa_mgf1_md(self.algorithm.message_digest())
            .map_err(JoseError::from)?;
        signer
            .set_rsa_pss_saltlen(RsaPssSaltlen::custom(self.algorithm.salt_len()))
            .map_err(JoseError::from)?;
        signer.update(message).map_err(JoseError::from)?;
        Ok(signer.sign_to_vec().map_err(JoseError::from)?)
    }
}

#[derive(Clone)]
pub struct RsaPssJwsVerifier {
    algorithm: RsaPssJwsAlgorithm,
    public_key: PKey<Public>,
    key_id: Option<String>,
}

impl RsaPssJwsVerifier {
    pub fn from_der(algorithm: RsaPssJwsAlgorithm, der: &[u8]) -> Result<Self, JoseError> {
        let rsa = Rsa::public_key_from_der(der).map_err(JoseError::from)?;
        algorithm.check_modulus(rsa.size() * 8)?;
        let pkey = PKey::from_rsa(rsa).map_err(JoseError::from)?;
        Ok(RsaPssJwsVerifier { algorithm, public_key: pkey, key_id: None })
    }
}

impl JwsVerifier for RsaPssJwsVerifier {
    fn algorithm(&self) -> &dyn JwsAlgorithm {
        &self.algorithm
    }

    fn key_id(&self) -> Option<&str> {
        self.key_id.as_deref()
    }

    fn verify(&self, message: &[u8], signature: &[u8]) -> Result<(), JoseError> {
        let mut verifier = Verifier::new(self.algorithm.message_digest(), &self.public_key)
            .map_err(JoseError::from)?;
        verifier.set_rsa_padding(Padding::PKCS1_PSS).map_err(JoseError::from)?;
        verifier
            .set_rsa_mgf1_md(self.algorithm.message_digest())
            .map_err(JoseError::from)?;
        verifier
            .set_rsa_pss_saltlen(RsaPssSaltlen::custom(self.algorithm.salt_len()))
            .map_err(JoseError::from)?;
        verifier.update(message).map_err(JoseError::from)?;
        match verifier.verify(signature) {
            Ok(true) => Ok(()),
            Ok(false) | Err(_) => Err(JoseError::SignatureInvalid),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_and_verify_round_trips() {
        let rsa = Rsa::generate(2048).unwrap();
        let private_der = rsa.private_key_to_der().unwrap();
        let public_der = rsa.public_key_to_der().unwrap();

        let signer = RsaPssJwsSigner::from_der(RsaPssJwsAlgorithm::Ps256, &private_der).unwrap();
        let verifier =
            RsaPssJwsVerifier::from_der(RsaPssJwsAlgorithm::Ps256, &public_der).unwrap();

        let signature = signer.sign(b"hello pss").unwrap();
        assert!(verifier.verify(b"hello pss", &signature).is_ok());
    }
}
