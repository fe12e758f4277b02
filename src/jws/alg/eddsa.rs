//! EdDSA (spec §4.3): Ed25519 over an OKP key, producing a fixed
//! 64-byte signature.

use std::ops::Deref;

use openssl::pkey::{Id, PKey, Private, Public};
use openssl::sign::{Signer, Verifier};

use crate::error::JoseError;
use crate::jwk::Jwk;
use crate::jws::jws_algorithm::{JwsAlgorithm, JwsSigner, JwsVerifier};

const SIGNATURE_LEN: usize = 64;

#[derive(Debug, Eq, PartialEq, Copy, Clone)]
pub struct EddsaJwsAlgorithm;

pub const EDDSA: EddsaJwsAlgorithm = EddsaJwsAlgorithm;

impl EddsaJwsAlgorithm {
    pub fn signer_from_der(&self, der: &[u8]) -> Result<EddsaJwsSigner, JoseError> {
        let pkey = PKey::private_key_from_der(der).map_err(JoseError::from)?;
        check_ed25519(&pkey)?;
        Ok(EddsaJwsSigner { private_key: pkey, key_id: None })
    }

    pub fn verifier_from_der(&self, der: &[u8]) -> Result<EddsaJwsVerifier, JoseError> {
        let pkey = PKey::public_key_from_der(der).map_err(JoseError::from)?;
        check_ed25519(&pkey)?;
        Ok(EddsaJwsVerifier { public_key: pkey, key_id: None })
    }
}

fn check_ed25519<T>(pkey: &PKey<T>) -> Result<(), JoseError> {
    if pkey.id() != Id::ED25519 {
        return Err(JoseError::KeyTypeMismatch(anyhow::anyhow!(
            "EdDSA requires an Ed25519 key, found {:?}",
            pkey.id()
        )));
    }
    Ok(())
}

impl JwsAlgorithm for EddsaJwsAlgorithm {
    fn name(&self) -> &str {
        "EdDSA"
    }

    fn key_type(&self) -> &str {
        "OKP"
    }

    fn signature_len(&self) -> usize {
        SIGNATURE_LEN
    }

    fn signer_from_jwk(&self, jwk: &Jwk) -> Result<Box<dyn JwsSigner>, JoseError> {
        check_okp_ed25519(jwk)?;
        let d = jwk.parameter_bytes("d").map_err(JoseError::from_anyhow_key)?;
        let pkey = PKey::private_key_from_raw_bytes(&d, Id::ED25519).map_err(JoseError::from)?;
        Ok(Box::new(EddsaJwsSigner { private_key: pkey, key_id: jwk.key_id().map(str::to_string) }))
    }

    fn verifier_from_jwk(&self, jwk: &Jwk) -> Result<Box<dyn JwsVerifier>, JoseError> {
        check_okp_ed25519(jwk)?;
        let x = jwk.parameter_bytes("x").map_err(JoseError::from_anyhow_key)?;
        let pkey = PKey::public_key_from_raw_bytes(&x, Id::ED25519).map_err(JoseError::from)?;
        Ok(Box::new(EddsaJwsVerifier { public_key: pkey, key_id: jwk.key_id().map(str::to_string) }))
    }
}

fn check_okp_ed25519(jwk: &Jwk) -> Result<(), JoseError> {
    if jwk.key_type() != "OKP" {
        return Err(JoseError::KeyTypeMismatch(anyhow::anyhow!(
            "EdDSA requires kty=OKP, found {}",
            jwk.key_type()
        )));
    }
    match jwk.curve() {
        Some("Ed25519") => Ok(()),
        other => Err(JoseError::KeyTypeMismatch(anyhow::anyhow!(
            "EdDSA requires crv=Ed25519, found {:?}",
            other
        ))),
    }
}

impl Deref for EddsaJwsAlgorithm {
    type Target = dyn JwsAlgorithm;

    fn deref(&self) -> &Self::Target {
        self
    }
}

#[derive(Clone)]
pub struct EddsaJwsSigner {
    private_key: PKey<Private>,
    key_id: Option<String>,
}

impl JwsSigner for EddsaJwsSigner {
    fn algorithm(&self) -> &dyn JwsAlgorithm {
        &EDDSA
    }

    fn key_id(&self) -> Option<&str> {
        self.key_id.as_deref()
    }

    fn sign(&self, message: &[u8]) -> Result<Vec<u8>, JoseError> {
        let mut signer = Signer::new_without_digest(&self.private_key).map_err(JoseError::from)?;
        Ok(signer.sign_oneshot_to_vec(message).map_err(JoseError::from)?)
    }
}

#[derive(Clone)]
pub struct EddsaJwsVerifier {
    public_key: PKey<Public>,
    key_id: Option<String>,
}

impl JwsVerifier for EddsaJwsVerifier {
    fn algorithm(&self) -> &dyn JwsAlgorithm {
        &EDDSA
    }

    fn key_id(&self) -> Option<&str> {
        self.key_id.as_deref()
    }

    fn verify(&self, message: &[u8], signature: &[u8]) -> Result<(), JoseError> {
        if signature.len() != SIGNATURE_LEN {
            return Err(JoseError::SignatureInvalid);
        }
        let mut verifier =
            Verifier::new_without_digest(&self.public_key).map_err(JoseError::from)?;
        match verifier.verify_oneshot(signature, message) {
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
        let pkey = PKey::generate_ed25519().unwrap();
        let private_der = pkey.private_key_to_der().unwrap();
        let public_der = pkey.public_key_to_der().unwrap();

        let signer = EDDSA.signer_from_der(&private_der).unwrap();
        let verifier = EDDSA.verifier_from_der(&public_der).unwrap();

        let signature = signer.sign(b"hello eddsa").unwrap();
        assert_eq!(signature.len(), 64);
        assert!(verifier.verify(b"hello eddsa", &signature).is_ok());
    }

    #[test]
    fn rejects_wrong_length_signature() {
        let pkey = PKey::generate_ed25519().unwrap();
        let public_der = pkey.public_key_to_der().unwrap();
        let verifier = EDDSA.verifier_from_der(&public_der).unwrap();
        assert!(verifier.verify(b"x", &[0u8; 10]).is_err());
    }
}
