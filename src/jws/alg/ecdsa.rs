//! ES256 / ES384 / ES512 (spec §4.3): ECDSA over the named NIST curve
//! matching the algorithm, with the DER signature the provider returns
//! transcoded to the fixed-width `R || S` form the JWS wire format
//! requires.

use std::ops::Deref;

use openssl::bn::BigNum;
use openssl::ec::{EcGroup, EcKey};
use openssl::ecdsa::EcdsaSig;
use openssl::hash::MessageDigest;
use openssl::nid::Nid;
use openssl::pkey::{PKey, Private, Public};
use openssl::sign::{Signer, Verifier};

use crate::config::JoseConfig;
use crate::error::JoseError;
use crate::jwk::Jwk;
use crate::jws::jws_algorithm::{JwsAlgorithm, JwsSigner, JwsVerifier};

#[derive(Debug, Eq, PartialEq, Copy, Clone)]
pub enum EcdsaJwsAlgorithm {
    Es256,
    Es384,
    Es512,
}

impl EcdsaJwsAlgorithm {
    fn curve_nid(&self) -> Nid {
        match self {
            Self::Es256 => Nid::X9_62_PRIME256V1,
            Self::Es384 => Nid::SECP384R1,
            Self::Es512 => Nid::SECP521R1,
        }
    }

    fn curve_name(&self) -> &str {
        match self {
            Self::Es256 => "P-256",
            Self::Es384 => "P-384",
            Self::Es512 => "P-521",
        }
    }

    /// Fixed-width byte length of a single coordinate (and thus of `R`
    /// or `S`) for this curve.
    fn coordinate_len(&self) -> usize {
        match self {
            Self::Es256 => 32,
            Self::Es384 => 48,
            Self::Es512 => 66,
        }
    }

    fn message_digest(&self) -> MessageDigest {
        match self {
            Self::Es256 => MessageDigest::sha256(),
            Self::Es384 => MessageDigest::sha384(),
            Self::Es512 => MessageDigest::sha512(),
        }
    }

    /// The group order, as a hex string, used to reject non-canonical
    /// (high-S) signatures when `ecdsa_require_low_s` is enabled.
    fn order_hex(&self) -> &str {
        match self {
            Self::Es256 => "FFFFFFFF00000000FFFFFFFFFFFFFFFFBCE6FAADA7179E84F3B9CAC2FC632551",
            Self::Es384 => {
                "FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFC7634D81F4372DDF581A0DB248B0A77AECEC196ACCC52973"
            }
            Self::Es512 => {
                "01FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFA51868783BF2F966B7FCC0148F709A5D03BB5C9B8899C47AEBB6FB71E91386409"
            }
        }
    }

    pub fn signer_from_der(&self, der: &[u8]) -> Result<EcdsaJwsSigner, JoseError> {
        let ec_key = EcKey::private_key_from_der(der).map_err(JoseError::from)?;
        self.check_curve(&ec_key)?;
        let pkey = PKey::from_ec_key(ec_key).map_err(JoseError::from)?;
        Ok(EcdsaJwsSigner { algorithm: *self, private_key: pkey, key_id: None })
    }

    pub fn verifier_from_der(&self, der: &[u8]) -> Result<EcdsaJwsVerifier, JoseError> {
        let ec_key = EcKey::public_key_from_der(der).map_err(JoseError::from)?;
        self.check_curve(&ec_key)?;
        let pkey = PKey::from_ec_key(ec_key).map_err(JoseError::from)?;
        Ok(EcdsaJwsVerifier {
            algorithm: *self,
            public_key: pkey,
            key_id: None,
            config: JoseConfig::default(),
        })
    }

    fn check_curve<T>(&self, key: &EcKey<T>) -> Result<(), JoseError>
    where
        T: openssl::pkey::HasParams,
    {
        let expected = self.curve_nid();
        match key.group().curve_name() {
            Some(actual) if actual == expected => Ok(()),
            Some(_) | None => Err(JoseError::KeyTypeMismatch(anyhow::anyhow!(
                "{} requires an EC key on {}",
                self.name(),
                self.curve_name()
            ))),
        }
    }
}

impl JwsAlgorithm for EcdsaJwsAlgorithm {
    fn name(&self) -> &str {
        match self {
            Self::Es256 => "ES256",
            Self::Es384 => "ES384",
            Self::Es512 => "ES512",
        }
    }

    fn key_type(&self) -> &str {
        "EC"
    }

    fn signature_len(&self) -> usize {
        self.coordinate_len() * 2
    }

    fn signer_from_jwk(&self, jwk: &Jwk) -> Result<Box<dyn JwsSigner>, JoseError> {
        let ec_key = ec_private_from_jwk(self, jwk)?;
        self.check_curve(&ec_key)?;
        let pkey = PKey::from_ec_key(ec_key).map_err(JoseError::from)?;
        Ok(Box::new(EcdsaJwsSigner {
            algorithm: *self,
            private_key: pkey,
            key_id: jwk.key_id().map(str::to_string),
        }))
    }

    fn verifier_from_jwk(&self, jwk: &Jwk) -> Result<Box<dyn JwsVerifier>, JoseError> {
        let ec_key = ec_public_from_jwk(self, jwk)?;
        self.check_curve(&ec_key)?;
        let pkey = PKey::from_ec_key(ec_key).map_err(JoseError::from)?;
        Ok(Box::new(EcdsaJwsVerifier {
            algorithm: *self,
            public_key: pkey,
            key_id: jwk.key_id().map(str::to_string),
            config: JoseConfig::default(),
        }))
    }
}

fn ec_group(alg: &EcdsaJwsAlgorithm) -> Result<EcGroup, JoseError> {
    EcGroup::from_curve_name(alg.curve_nid()).map_err(|err| JoseError::from(err))
}

fn ec_public_from_jwk(alg: &EcdsaJwsAlgorithm, jwk: &Jwk) -> Result<EcKey<Public>, JoseError> {
    if jwk.key_type() != "EC" {
        return Err(JoseError::KeyTypeMismatch(anyhow::anyhow!(
            "{} requires kty=EC, found {}",
            alg.name(),
            jwk.key_type()
        )));
    }
    (|| -> anyhow::Result<EcKey<Public>> {
        let group = ec_group(alg)?;
        let x = BigNum::from_slice(&jwk.parameter_bytes("x")?)?;
        let y = BigNum::from_slice(&jwk.parameter_bytes("y")?)?;
        let mut ctx = openssl::bn::BigNumContext::new()?;
        let mut point = openssl::ec::EcPoint::new(&group)?;
        point.set_affine_coordinates_gfp(&group, &x, &y, &mut ctx)?;
        Ok(EcKey::from_public_key(&group, &point)?)
    })()
    .map_err(JoseError::from_anyhow_key)
}

fn ec_private_from_jwk(alg: &EcdsaJwsAlgorithm, jwk: &Jwk) -> Result<EcKey<Private>, JoseError> {
    if jwk.key_type() != "EC" {
        return Err(JoseError::KeyTypeMismatch(anyhow::anyhow!(
            "{} requires kty=EC, found {}",
            alg.name(),
            jwk.key_type()
        )));
    }
    (|| -> anyhow::Result<EcKey<Private>> {
        let group = ec_group(alg)?;
        let d = BigNum::from_slice(&jwk.parameter_bytes("d")?)?;
        let x = BigNum::from_slice(&jwk.parameter_bytes("x")?)?;
        let y = BigNum::from_slice(&jwk.parameter_bytes("y")?)?;
        let mut ctx = openssl::bn::BigNumContext::new()?;
        let mut point = openssl::ec::EcPoint::new(&group)?;
        point.set_affine_coordinates_gfp(&group, &x, &y, &mut ctx)?;
        Ok(EcKey::from_private_components(&group, &d, &point)?)
    })()
    .map_err(JoseError::from_anyhow_key)
}

impl Deref for EcdsaJwsAlgorithm {
    type Target = dyn JwsAlgorithm;

    fn deref(&self) -> &Self::Target {
        self
    }
}

#[derive(Clone)]
pub struct EcdsaJwsSigner {
    algorithm: EcdsaJwsAlgorithm,
    private_key: PKey<Private>,
    key_id: Option<String>,
}

impl JwsSigner for EcdsaJwsSigner {
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
        let der = signer.sign_to_vec().map_err(JoseError::from)?;

        let sig = EcdsaSig::from_der(&der).map_err(JoseError::from)?;
        let coordinate_len = self.algorithm.coordinate_len();
        let mut fixed = Vec::with_capacity(coordinate_len * 2);
        fixed.extend(left_pad(&sig.r().to_vec(), coordinate_len));
        fixed.extend(left_pad(&sig.s().to_vec(), coordinate_len));
        Ok(fixed)
    }
}

#[derive(Clone)]
pub struct EcdsaJwsVerifier {
    algorithm: EcdsaJwsAlgorithm,
    public_key: PKey<Public>,
    key_id: Option<String>,
    config: JoseConfig,
}

impl EcdsaJwsVerifier {
    /// Applies `config.ecdsa_require_low_s`: when set, signatures whose
    /// `S` exceeds half the group order are rejected as non-canonical,
    /// closing off the classic ECDSA signature-malleability class.
    pub fn with_config(mut self, config: JoseConfig) -> Self {
        self.config = config;
        self
    }

    fn check_low_s(&self, s_bytes: &[u8]) -> anyhow::Result<()> {
        let s = BigNum::from_slice(s_bytes)?;
        let order = BigNum::from_hex_str(self.algorithm.order_hex())?;
        let mut half_order = BigNum::new()?;
        half_order.rshift1(&order)?;
        if s > half_order {
            anyhow::bail!("signature S is not canonical (low-S required)");
        }
        Ok(())
    }
}

impl JwsVerifier for EcdsaJwsVerifier {
    fn algorithm(&self) -> &dyn JwsAlgorithm {
        &self.algorithm
    }

    fn key_id(&self) -> Option<&str> {
        self.key_id.as_deref()
    }

    fn verify(&self, message: &[u8], signature: &[u8]) -> Result<(), JoseError> {
        let coordinate_len = self.algorithm.coordinate_len();
        if signature.len() != coordinate_len * 2 {
            return Err(JoseError::SignatureInvalid);
        }

        let (r_bytes, s_bytes) = signature.split_at(coordinate_len);

        if self.config.ecdsa_require_low_s && self.check_low_s(s_bytes).is_err() {
            return Err(JoseError::SignatureInvalid);
        }

        let result = (|| -> anyhow::Result<bool> {
            let r = BigNum::from_slice(r_bytes)?;
            let s = BigNum::from_slice(s_bytes)?;
            let sig = EcdsaSig::from_private_components(r, s)?;
            let der = sig.to_der()?;

            let mut verifier = Verifier::new(self.algorithm.message_digest(), &self.public_key)?;
            verifier.update(message)?;
            Ok(verifier.verify(&der)?)
        })();

        match result {
            Ok(true) => Ok(()),
            Ok(false) | Err(_) => Err(JoseError::SignatureInvalid),
        }
    }
}

fn left_pad(bytes: &[u8], width: usize) -> Vec<u8> {
    if bytes.len() >= width {
        return bytes[bytes.len() - width..].to_vec();
    }
    let mut out = vec![0u8; width - bytes.len()];
    out.extend_from_slice(bytes);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_and_verify_round_trips_p256() {
        let group = EcGroup::from_curve_name(Nid::X9_62_PRIME256V1).unwrap();
        let key = EcKey::generate(&group).unwrap();
        let private_der = key.private_key_to_der().unwrap();
        let public_der = key.public_key_to_der().unwrap();

        let signer = EcdsaJwsAlgorithm::Es256.signer_from_der(&private_der).unwrap();
        let verifier = EcdsaJwsAlgorithm::Es256.verifier_from_der(&public_der).unwrap();

        let signature = signer.sign(b"hello es256").unwrap();
        assert_eq!(signature.len(), 64);
        assert!(verifier.verify(b"hello es256", &signature).is_ok());
    }

    #[test]
    fn rejects_wrong_curve() {
        let group = EcGroup::from_curve_name(Nid::SECP384R1).unwrap();
        let key = EcKey::generate(&group).unwrap();
        let der = key.private_key_to_der().unwrap();
        assert!(EcdsaJwsAlgorithm::Es256.signer_from_der(&der).is_err());
    }

    #[test]
    fn rejects_wrong_length_signature() {
        let group = EcGroup::from_curve_name(Nid::X9_62_PRIME256V1).unwrap();
        let key = EcKey::generate(&group).unwrap();
        let public_der = key.public_key_to_der().unwrap();
        let verifier = EcdsaJwsAlgorithm::Es256.verifier_from_der(&public_der).unwrap();
        assert!(verifier.verify(b"x", &[0u8; 10]).is_err());
    }

    #[test]
    fn low_s_policy_rejects_high_s_signature() {
        let group = EcGroup::from_curve_name(Nid::X9_62_PRIME256V1).unwrap();
        let key = EcKey::generate(&group).unwrap();
        let private_der = key.private_key_to_der().unwrap();
        let public_der = key.public_key_to_der().unwrap();

        let signer = EcdsaJwsAlgorithm::Es256.signer_from_der(&private_der).unwrap();
        let lenient = EcdsaJwsAlgorithm::Es256.verifier_from_der(&public_der).unwrap();
        let mut config = JoseConfig::default();
        config.ecdsa_require_low_s = true;
        let strict = EcdsaJwsAlgorithm::Es256.verifier_from_der(&public_der).unwrap().with_config(config);

        let mut signature = signer.sign(b"hello es256").unwrap();

        // Force the signature into its (order - s) malleable twin: equally
        // valid cryptographically, but guaranteed non-canonical (high-S),
        // regardless of which half the freshly generated signature landed in.
        let order = BigNum::from_hex_str(EcdsaJwsAlgorithm::Es256.order_hex()).unwrap();
        let coordinate_len = EcdsaJwsAlgorithm::Es256.coordinate_len();
        let mut half_order = BigNum::new().unwrap();
        half_order.rshift1(&order).unwrap();
        let s = BigNum::from_slice(&signature[coordinate_len..]).unwrap();
        let high_s = if s > half_order {
            s
        } else {
            let mut flipped = BigNum::new().unwrap();
            flipped.checked_sub(&order, &s).unwrap();
            flipped
        };
        let padded = left_pad(&high_s.to_vec(), coordinate_len);
        signature[coordinate_len..].copy_from_slice(&padded);

        assert!(lenient.verify(b"hello es256", &signature).is_ok());
        assert!(strict.verify(b"hello es256", &signature).is_err());
    }
}
