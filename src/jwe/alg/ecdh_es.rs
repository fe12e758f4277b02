//! `ECDH-ES`, `ECDH-ES+A128KW`, `ECDH-ES+A192KW`, `ECDH-ES+A256KW`
//! (spec §4.4.1): Elliptic Curve Diffie-Hellman Ephemeral Static key
//! agreement, concatenated with Concat-KDF (NIST SP 800-56A, SHA-256)
//! to derive either the CEK directly (`ECDH-ES`) or a KEK that wraps a
//! randomly generated CEK with AES Key Wrap (the `+A*KW` variants).
//!
//! The sender generates a fresh EC key pair per message and carries its
//! public half in the `epk` header claim; `apu`/`apv` (party info) are
//! zero-length when absent, per RFC 7518 §4.6.

use std::borrow::Cow;
use std::ops::Deref;

use openssl::bn::{BigNum, BigNumContext};
use openssl::derive::Deriver;
use openssl::ec::{EcGroup, EcKey, EcPoint};
use openssl::nid::Nid;
use openssl::pkey::{PKey, Private, Public};
use serde_json::{Map, Value};

use crate::error::JoseError;
use crate::jwe::alg::aeskw;
use crate::jwe::jwe_algorithm::{JweAlgorithm, JweDecrypter, JweEncrypter};
use crate::jwe::jwe_header::JweHeader;
use crate::jwk::Jwk;
use crate::util::{self, hash::HashAlgorithm};

#[derive(Debug, Eq, PartialEq, Copy, Clone)]
pub enum EcdhEsJweAlgorithm {
    EcdhEs,
    EcdhEsA128kw,
    EcdhEsA192kw,
    EcdhEsA256kw,
}

impl EcdhEsJweAlgorithm {
    /// `None` for the direct variant (the derived key *is* the CEK);
    /// `Some(wrap_key_bits)` for the `+A*KW` variants.
    fn wrap_key_bits(&self) -> Option<usize> {
        match self {
            Self::EcdhEs => None,
            Self::EcdhEsA128kw => Some(128),
            Self::EcdhEsA192kw => Some(192),
            Self::EcdhEsA256kw => Some(256),
        }
    }

    fn aeskw_algorithm(&self) -> Option<aeskw::AeskwJweAlgorithm> {
        match self {
            Self::EcdhEs => None,
            Self::EcdhEsA128kw => Some(aeskw::AeskwJweAlgorithm::A128kw),
            Self::EcdhEsA192kw => Some(aeskw::AeskwJweAlgorithm::A192kw),
            Self::EcdhEsA256kw => Some(aeskw::AeskwJweAlgorithm::A256kw),
        }
    }

    pub fn encrypter_from_jwk(&self, jwk: &Jwk) -> Result<EcdhEsJweEncrypter, JoseError> {
        let public_key = ec_public_from_jwk(jwk)?;
        Ok(EcdhEsJweEncrypter {
            algorithm: *self,
            public_key,
            key_id: jwk.key_id().map(str::to_string),
        })
    }

    pub fn decrypter_from_jwk(&self, jwk: &Jwk) -> Result<EcdhEsJweDecrypter, JoseError> {
        let private_key = ec_private_from_jwk(jwk)?;
        Ok(EcdhEsJweDecrypter {
            algorithm: *self,
            private_key,
            key_id: jwk.key_id().map(str::to_string),
        })
    }
}

impl JweAlgorithm for EcdhEsJweAlgorithm {
    fn name(&self) -> &str {
        match self {
            Self::EcdhEs => "ECDH-ES",
            Self::EcdhEsA128kw => "ECDH-ES+A128KW",
            Self::EcdhEsA192kw => "ECDH-ES+A192KW",
            Self::EcdhEsA256kw => "ECDH-ES+A256KW",
        }
    }
}

impl Deref for EcdhEsJweAlgorithm {
    type Target = dyn JweAlgorithm;

    fn deref(&self) -> &Self::Target {
        self
    }
}

fn curve_group(crv: &str) -> Result<(EcGroup, Nid), JoseError> {
    let nid = match crv {
        "P-256" => Nid::X9_62_PRIME256V1,
        "P-384" => Nid::SECP384R1,
        "P-521" => Nid::SECP521R1,
        other => {
            return Err(JoseError::KeyTypeMismatch(anyhow::anyhow!(
                "ECDH-ES does not support curve {}",
                other
            )))
        }
    };
    let group = EcGroup::from_curve_name(nid).map_err(JoseError::from)?;
    Ok((group, nid))
}

fn curve_name(nid: Nid) -> &'static str {
    match nid {
        Nid::X9_62_PRIME256V1 => "P-256",
        Nid::SECP384R1 => "P-384",
        Nid::SECP521R1 => "P-521",
        _ => unreachable!("curve_group only returns recognized curves"),
    }
}

fn ec_public_from_jwk(jwk: &Jwk) -> Result<EcKey<Public>, JoseError> {
    if jwk.key_type() != "EC" {
        return Err(JoseError::KeyTypeMismatch(anyhow::anyhow!(
            "ECDH-ES requires kty=EC, found {}",
            jwk.key_type()
        )));
    }
    (|| -> anyhow::Result<EcKey<Public>> {
        let crv = jwk.curve().ok_or_else(|| anyhow::anyhow!("the \"crv\" JWK parameter is required"))?;
        let (group, _) = curve_group(crv).map_err(|err| anyhow::anyhow!(err.to_string()))?;
        let x = BigNum::from_slice(&jwk.parameter_bytes("x")?)?;
        let y = BigNum::from_slice(&jwk.parameter_bytes("y")?)?;
        let mut ctx = BigNumContext::new()?;
        let mut point = EcPoint::new(&group)?;
        point.set_affine_coordinates_gfp(&group, &x, &y, &mut ctx)?;
        Ok(EcKey::from_public_key(&group, &point)?)
    })()
    .map_err(JoseError::from_anyhow_key)
}

fn ec_private_from_jwk(jwk: &Jwk) -> Result<EcKey<Private>, JoseError> {
    if jwk.key_type() != "EC" {
        return Err(JoseError::KeyTypeMismatch(anyhow::anyhow!(
            "ECDH-ES requires kty=EC, found {}",
            jwk.key_type()
        )));
    }
    (|| -> anyhow::Result<EcKey<Private>> {
        let crv = jwk.curve().ok_or_else(|| anyhow::anyhow!("the \"crv\" JWK parameter is required"))?;
        let (group, _) = curve_group(crv).map_err(|err| anyhow::anyhow!(err.to_string()))?;
        let d = BigNum::from_slice(&jwk.parameter_bytes("d")?)?;
        let x = BigNum::from_slice(&jwk.parameter_bytes("x")?)?;
        let y = BigNum::from_slice(&jwk.parameter_bytes("y")?)?;
        let mut ctx = BigNumContext::new()?;
        let mut point = EcPoint::new(&group)?;
        point.set_affine_coordinates_gfp(&group, &x, &y, &mut ctx)?;
        Ok(EcKey::from_private_components(&group, &d, &point)?)
    })()
    .map_err(JoseError::from_anyhow_key)
}

fn ec_key_to_jwk(public: &EcKey<Public>, nid: Nid) -> Result<Map<String, Value>, JoseError> {
    (|| -> anyhow::Result<Map<String, Value>> {
        let group = public.group();
        let mut ctx = BigNumContext::new()?;
        let mut x = BigNum::new()?;
        let mut y = BigNum::new()?;
        public.public_key().affine_coordinates_gfp(group, &x, &y, &mut ctx)?;

        let coordinate_len = match nid {
            Nid::X9_62_PRIME256V1 => 32,
            Nid::SECP384R1 => 48,
            Nid::SECP521R1 => 66,
            _ => unreachable!(),
        };

        let mut map = Map::new();
        map.insert("kty".to_string(), Value::String("EC".to_string()));
        map.insert("crv".to_string(), Value::String(curve_name(nid).to_string()));
        map.insert("x".to_string(), Value::String(util::encode_base64_urlsafe_nopad(left_pad(&x.to_vec(), coordinate_len))));
        map.insert("y".to_string(), Value::String(util::encode_base64_urlsafe_nopad(left_pad(&y.to_vec(), coordinate_len))));
        Ok(map)
    })()
    .map_err(JoseError::from_anyhow_provider)
}

fn left_pad(bytes: &[u8], width: usize) -> Vec<u8> {
    if bytes.len() >= width {
        return bytes[bytes.len() - width..].to_vec();
    }
    let mut out = vec![0u8; width - bytes.len()];
    out.extend_from_slice(bytes);
    out
}

fn agree(private_key: &EcKey<Private>, public_key: &EcKey<Public>) -> Result<Vec<u8>, JoseError> {
    let private_pkey = PKey::from_ec_key(private_key.clone()).map_err(JoseError::from)?;
    let public_pkey = PKey::from_ec_key(public_key.clone()).map_err(JoseError::from)?;
    let mut deriver = Deriver::new(&private_pkey).map_err(JoseError::from)?;
    deriver.set_peer(&public_pkey).map_err(JoseError::from)?;
    deriver.derive_to_vec().map_err(JoseError::from)
}

fn length_prefixed(data: &[u8]) -> Vec<u8> {
    util::concat(&[&util::u32_be_bytes(data.len() as u32), data])
}

/// Concat-KDF (NIST SP 800-56A §5.8.1) over SHA-256, looping the 32-bit
/// big-endian counter until `key_data_len` bytes have been produced.
fn concat_kdf(z: &[u8], other_info: &[u8], key_data_len: usize) -> Result<Vec<u8>, JoseError> {
    let mut derived = Vec::with_capacity(key_data_len + HashAlgorithm::Sha256.output_len());
    let mut counter: u32 = 1;
    while derived.len() < key_data_len {
        let input = util::concat(&[&util::u32_be_bytes(counter), z, other_info]);
        derived.extend_from_slice(&HashAlgorithm::Sha256.digest(&input)?);
        counter += 1;
    }
    derived.truncate(key_data_len);
    Ok(derived)
}

fn other_info(algorithm_id: &[u8], apu: &[u8], apv: &[u8], key_data_len_bits: u32) -> Vec<u8> {
    util::concat(&[
        &length_prefixed(algorithm_id),
        &length_prefixed(apu),
        &length_prefixed(apv),
        &util::u32_be_bytes(key_data_len_bits),
    ])
}

fn party_info(header: &JweHeader, name: &str) -> Result<Vec<u8>, JoseError> {
    Ok(header.claim_base64(name).map_err(JoseError::from_anyhow_malformed)?.unwrap_or_default())
}

#[derive(Debug, Clone)]
pub struct EcdhEsJweEncrypter {
    algorithm: EcdhEsJweAlgorithm,
    public_key: EcKey<Public>,
    key_id: Option<String>,
}

impl JweEncrypter for EcdhEsJweEncrypter {
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
        let group = self.public_key.group();
        let nid = group.curve_name().ok_or_else(|| {
            JoseError::ProviderError(anyhow::anyhow!("EC group has no curve name"))
        })?;

        let ephemeral = EcKey::generate(group).map_err(JoseError::from)?;
        let ephemeral_public = EcKey::from_public_key(group, ephemeral.public_key()).map_err(JoseError::from)?;
        let epk = ec_key_to_jwk(&ephemeral_public, nid)?;
        header.set_claim("epk", Some(Value::Object(epk)))?;

        let apu = party_info(header, "apu")?;
        let apv = party_info(header, "apv")?;

        let z = agree(&ephemeral, &self.public_key)?;

        match self.algorithm.wrap_key_bits() {
            None => {
                let enc = header.content_encryption().ok_or_else(|| {
                    JoseError::MalformedEncoding(anyhow::anyhow!("\"enc\" must be set before ECDH-ES direct key agreement"))
                })?;
                let info = other_info(enc.as_bytes(), &apu, &apv, (key_len as u32) * 8);
                let cek = concat_kdf(&z, &info, key_len)?;
                Ok((Cow::Owned(cek), None))
            }
            Some(wrap_bits) => {
                let aeskw_alg = self.algorithm.aeskw_algorithm().expect("wrap variant always has an aeskw alg");
                let info = other_info(self.algorithm.name().as_bytes(), &apu, &apv, wrap_bits as u32);
                let kek = concat_kdf(&z, &info, (wrap_bits / 8) as usize)?;
                let encrypter = aeskw_alg.encrypter_from_bytes(&kek)?;
                encrypter.encrypt(header, key_len)
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct EcdhEsJweDecrypter {
    algorithm: EcdhEsJweAlgorithm,
    private_key: EcKey<Private>,
    key_id: Option<String>,
}

impl JweDecrypter for EcdhEsJweDecrypter {
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
        let epk = match header.claim("epk") {
            Some(Value::Object(map)) => Jwk::from_map(map.clone())?,
            _ => {
                return Err(JoseError::MalformedEncoding(anyhow::anyhow!(
                    "the \"epk\" header claim is required for ECDH-ES"
                )))
            }
        };
        let peer_public = ec_public_from_jwk(&epk)?;

        let apu = party_info(header, "apu")?;
        let apv = party_info(header, "apv")?;

        let z = agree(&self.private_key, &peer_public)?;

        match self.algorithm.wrap_key_bits() {
            None => {
                let enc = header.content_encryption().ok_or(JoseError::DecryptionFailed)?;
                let info = other_info(enc.as_bytes(), &apu, &apv, (key_len as u32) * 8);
                Ok(Cow::Owned(concat_kdf(&z, &info, key_len)?))
            }
            Some(wrap_bits) => {
                let aeskw_alg = self.algorithm.aeskw_algorithm().expect("wrap variant always has an aeskw alg");
                let info = other_info(self.algorithm.name().as_bytes(), &apu, &apv, wrap_bits as u32);
                let kek = concat_kdf(&z, &info, (wrap_bits / 8) as usize)?;
                let decrypter = aeskw_alg.decrypter_from_bytes(&kek)?;
                decrypter.decrypt(header, encrypted_key, key_len)
            }
        }
    }
}
