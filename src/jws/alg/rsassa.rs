//! RS256 / RS384 / RS512 (spec §4.3): RSASSA-PKCS1-v1_5 over an RSA key
//! whose modulus is at least 2048 bits.

use std::ops::Deref;

use anyhow::bail;
use openssl::hash::MessageDigest;
use openssl::pkey::{PKey, Private, Public};
use openssl::rsa::Rsa;
use openssl::sign::{Signer, Verifier};

use crate::error::JoseError;
use crate::jwk::Jwk;
use crate::jws::jws_algorithm::{JwsAlgorithm, JwsSigner, JwsVerifier};

const MIN_MODULUS_BITS: u32 = 2048;

#[derive(Debug, Eq, PartialEq, Copy, Clone)]
pub enum RsaJwsAlgorithm {
    Rs256,
    Rs384,
    Rs512,
}

impl RsaJwsAlgorithm {
    pub fn signer_from_der(&self, der: &[u8]) -> Result<RsaJwsSigner, JoseError> {
        let rsa = Rsa::private_key_from_der(der).map_err(JoseError::from)?;
        self.check_modulus(rsa.size() * 8)?;
        let pkey = PKey::from_rsa(rsa).map_err(JoseError::from)?;
        Ok(RsaJwsSigner { algorithm: *self, private_key: pkey, key_id: None })
    }

    pub fn verifier_from_der(&self, der: &[u8]) -> Result<RsaJwsVerifier, JoseError> {
        let rsa = Rsa::public_key_from_der(der).map_err(JoseError::from)?;
        self.check_modulus(rsa.size() * 8)?;
        let pkey = PKey::from_rsa(rsa).map_err(JoseError::from)?;
        Ok(RsaJwsVerifier { algorithm: *self, public_key: pkey, key_id: None })
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

    fn message_digest(&self) -> MessageDigest {
        match self {
            Self::Rs256 => MessageDigest::sha256(),
            Self::Rs384 => MessageDigest::sha384(),
            Self::Rs512 => MessageDigest::sha512(),
        }
    }
}

impl JwsAlgorithm for RsaJwsAlgorithm {
    fn name(&self) -> &str {
        match self {
            Self::Rs256 => "RS256",
            Self::Rs384 => "RS384",
            Self::Rs512 => "RS512",
        }
    }

    fn key_type(&self) -> &str {
        "RSA"
    }

    fn signature_len(&self) -> usize {
        // Fixed at construction time from the key's modulus; callers that
        // need the length ahead of a concrete key should consult the
        // signer/verifier instance instead.
        0
    }

    fn signer_from_jwk(&self, jwk: &Jwk) -> Result<Box<dyn JwsSigner>, JoseError> {
        check_jwk(self, jwk)?;
        let rsa = rsa_private_from_jwk(jwk).map_err(JoseError::from_anyhow_key)?;
        self.check_modulus(rsa.size() * 8)?;
        let pkey = PKey::from_rsa(rsa).map_err(JoseError::from)?;
        let mut signer = RsaJwsSigner { algorithm: *self, private_key: pkey, key_id: None };
        signer.key_id = jwk.key_id().map(str::to_string);
        Ok(Box::new(signer))
    }

    fn verifier_from_jwk(&self, jwk: &Jwk) -> Result<Box<dyn JwsVerifier>, JoseError> {
        check_jwk(self, jwk)?;
        let rsa = rsa_public_from_jwk(jwk).map_err(JoseError::from_anyhow_key)?;
        self.check_modulus(rsa.size() * 8)?;
        let pkey = PKey::from_rsa(rsa).map_err(JoseError::from)?;
        let mut verifier = RsaJwsVerifier { algorithm: *self, public_key: pkey, key_id: None };
        verifier.key_id = jwk.key_id().map(str::to_string);
        Ok(Box::new(verifier))
    }
}

fn check_jwk(alg: &RsaJwsAlgorithm, jwk: &Jwk) -> Result<(), JoseError> {
    if jwk.key_type() != "RSA" {
        return Err(JoseError::KeyTypeMismatch(anyhow::anyhow!(
            "{} requires kty=RSA, found {}",
            alg.name(),
            jwk.key_type()
        )));
    }
    Ok(())
}

pub(crate) fn rsa_public_from_jwk(jwk: &Jwk) -> anyhow::Result<Rsa<Public>> {
    use openssl::bn::BigNum;
    let n = BigNum::from_slice(&jwk.parameter_bytes("n")?)?;
    let e = BigNum::from_slice(&jwk.parameter_bytes("e")?)?;
    Ok(Rsa::from_public_components(n, e)?)
}

pub(crate) fn rsa_private_from_jwk(jwk: &Jwk) -> anyhow::Result<Rsa<Private>> {
    use openssl::bn::BigNum;
    let n = BigNum::from_slice(&jwk.parameter_bytes("n")?)?;
    let e = BigNum::from_slice(&jwk.parameter_bytes("e")?)?;
    let d = BigNum::from_slice(&jwk.parameter_bytes("d")?)?;
    let p = BigNum::from_slice(&jwk.parameter_bytes("p")?)?;
    let q = BigNum::from_slice(&jwk.parameter_bytes("q")?)?;
    let dp = BigNum::from_slice(&jwk.parameter_bytes("dp")?)?;
    let dq = BigNum::from_slice(&jwk.parameter_bytes("dq")?)?;
    let qi = BigNum::from_slice(&jwk.parameter_bytes("qi")?)?;
    Ok(Rsa::from_private_components(n, e, d, p, q, dp, dq, qi)?)
}

impl Deref for RsaJwsAlgorithm {
    type Target = dyn JwsAlgorithm;

    fn deref(&self) -> &Self::Target {
        self
    }
}

#[derive(Clone)]
pub struct RsaJwsSigner {
    algorithm: RsaJwsAlgorithm,
    private_key: PKey<Private>,
    key_id: Option<String>,
}

impl JwsSigner for RsaJwsSigner {
    fn algorithm(&self) -> &dyn JwsAlgorithm {
        &self.algorithm
    }

    fn key_id(&self) -> Option<&str> {
        self.key_id.as_deref()
    }

    fn sign(&self, message: &[u8]) -> Result<Vec<u8>, JoseError> {
        let mut signer = Signer::new(self.algorithm.message_digest(), &self.private_key)
            .map_err(JoseError::from)?;
        signer.update(message).map_err(JoseError::from)?;
        Ok(signer.sign_to_vec().map_err(JoseError::from)?)
    }
}

#[derive(Clone)]
pub struct RsaJwsVerifier {
    algorithm: RsaJwsAlgorithm,
    public_key: PKey<Public>,
    key_id: Option<String>,
}

impl JwsVerifier for RsaJwsVerifier {
    fn algorithm(&self) -> &dyn JwsAlgorithm {
        &self.algorithm
    }

    fn key_id(&self) -> Option<&str> {
        self.key_id.as_deref()
    }

    fn verify(&self, message: &[u8], signature: &[u8]) -> Result<(), JoseError> {
        let mut verifier = Verifier::new(self.algorithm.message_digest(), &self.public_key)
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

    fn generate_keypair() -> (Rsa<Private>, Rsa<Public>) {
        let rsa = Rsa::generate(2048).unwrap();
        let public_der = rsa.public_key_to_der().unwrap();
        let public = Rsa::public_key_from_der(&public_der).unwrap();
        (rsa, public)
    }

    #[test]
    fn sign_and_verify_round_trips() {
        let (private, _public) = generate_keypair();
        let private_der = private.private_key_to_der().unwrap();
        let public_der = private.public_key_to_der().unwrap();

        let signer = RsaJwsAlgorithm::Rs256.signer_from_der(&private_der).unwrap();
        let verifier = RsaJwsAlgorithm::Rs256.verifier_from_der(&public_der).unwrap();

        let signature = signer.sign(b"hello jws").unwrap();
        assert!(verifier.verify(b"hello jws", &signature).is_ok());
    }

    #[test]
    fn rejects_small_modulus() {
        let rsa = Rsa::generate(1024).unwrap();
        let der = rsa.private_key_to_der().unwrap();
        assert!(RsaJwsAlgorithm::Rs256.signer_from_der(&der).is_err());
    }
}
