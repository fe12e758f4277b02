//! The capability traits a concrete signing algorithm family
//! (`alg::hmac`, `alg::rsassa`, ...) implements, and the shared compact
//! serialization logic (spec §4.3 "Signing input construction").

use anyhow::bail;
use serde_json::{Map, Value};

use crate::error::JoseError;
use crate::jwk::Jwk;
use crate::util;

/// A JWS signing algorithm family, e.g. `HS256` or `ES384`.
pub trait JwsAlgorithm {
    /// The `alg` header parameter value, e.g. `"HS256"`.
    fn name(&self) -> &str;

    /// The `kty` this algorithm's key material must carry.
    fn key_type(&self) -> &str;

    /// The fixed signature length this algorithm produces, in bytes.
    fn signature_len(&self) -> usize;

    fn signer_from_jwk(&self, jwk: &Jwk) -> Result<Box<dyn JwsSigner>, JoseError>;

    fn verifier_from_jwk(&self, jwk: &Jwk) -> Result<Box<dyn JwsVerifier>, JoseError>;
}

pub trait JwsSigner {
    fn algorithm(&self) -> &dyn JwsAlgorithm;

    fn key_id(&self) -> Option<&str>;

    /// Sign the exact signing-input bytes received
    /// (`ASCII(protected_b64) || '.' || ASCII(payload_b64)`); never a
    /// re-serialization.
    fn sign(&self, message: &[u8]) -> Result<Vec<u8>, JoseError>;

    /// Assemble the three-segment compact JWS: encode `header` and
    /// `payload`, build the signing input, sign it, and append the
    /// base64url signature.
    ///
    /// Honors RFC 7797 unencoded payload: when `header["b64"] ==
    /// false`, `b64` must also be listed in `crit`, and `payload` is
    /// embedded as raw UTF-8 (and must not contain `.`).
    fn serialize_compact(
        &self,
        header: &Map<String, Value>,
        payload: &[u8],
    ) -> Result<String, JoseError> {
        (|| -> anyhow::Result<String> {
            let b64 = payload_is_base64_encoded(header)?;

            let payload_segment;
            let payload_str: &str = if b64 {
                payload_segment = util::encode_base64_urlsafe_nopad(payload);
                &payload_segment
            } else {
                match std::str::from_utf8(payload) {
                    Ok(val) => {
                        if val.contains('.') {
                            bail!("an unencoded JWS payload must not contain '.'");
                        }
                        val
                    }
                    Err(err) => bail!("an unencoded JWS payload must be valid UTF-8: {}", err),
                }
            };

            let header_json = serde_json::to_vec(header)?;
            let header_segment = util::encode_base64_urlsafe_nopad(header_json);

            let mut signing_input =
                String::with_capacity(header_segment.len() + 1 + payload_str.len());
            signing_input.push_str(&header_segment);
            signing_input.push('.');
            signing_input.push_str(payload_str);

            let signature = self.sign(signing_input.as_bytes())?;
            let signature_segment = util::encode_base64_urlsafe_nopad(signature);

            let mut compact = signing_input;
            compact.push('.');
            compact.push_str(&signature_segment);

            Ok(compact)
        })()
        .map_err(JoseError::from_anyhow_malformed)
    }
}

pub trait JwsVerifier {
    fn algorithm(&self) -> &dyn JwsAlgorithm;

    fn key_id(&self) -> Option<&str>;

    /// Verify `signature` over `message` in constant time. Any failure,
    /// structural or cryptographic, must surface as a single opaque
    /// kind ([`JoseError::SignatureInvalid`]).
    fn verify(&self, message: &[u8], signature: &[u8]) -> Result<(), JoseError>;

    /// Split a compact JWS into its three segments, check the `alg`
    /// and `kid` header claims match this verifier, verify the
    /// signature, and return the decoded payload.
    fn deserialize_compact(
        &self,
        header: &Map<String, Value>,
        input: &str,
    ) -> Result<Vec<u8>, JoseError> {
        let dot_positions: Vec<usize> = input
            .char_indices()
            .filter(|(_, c)| *c == '.')
            .map(|(i, _)| i)
            .collect();
        if dot_positions.len() != 2 {
            return Err(JoseError::MalformedEncoding(anyhow::anyhow!(
                "a compact JWS must contain exactly two '.' separators, found {}",
                dot_positions.len()
            )));
        }

        (|| -> anyhow::Result<()> {
            let expected_alg = self.algorithm().name();
            match header.get("alg") {
                Some(Value::String(val)) if val == expected_alg => {}
                Some(Value::String(val)) => {
                    bail!("alg header claim {} does not match verifier alg {}", val, expected_alg)
                }
                Some(_) => bail!("the \"alg\" header claim must be a string"),
                None => bail!("the \"alg\" header claim is required"),
            }

            match (self.key_id(), header.get("kid")) {
                (Some(expected), Some(Value::String(actual))) if expected == actual => {}
                (None, _) => {}
                (Some(_), actual) => bail!("kid header claim mismatch: {:?}", actual),
            }

            Ok(())
        })()
        .map_err(JoseError::from_anyhow_malformed)?;

        let b64 = payload_is_base64_encoded(header).map_err(JoseError::from_anyhow_malformed)?;

        let signing_input = &input[..dot_positions[1]];
        let payload_segment = &input[(dot_positions[0] + 1)..dot_positions[1]];
        let payload = if b64 {
            util::decode_base64_urlsafe_nopad(payload_segment)?
        } else {
            payload_segment.as_bytes().to_vec()
        };

        let signature_segment = &input[(dot_positions[1] + 1)..];
        let signature = util::decode_base64_urlsafe_nopad(signature_segment)?;

        self.verify(signing_input.as_bytes(), &signature)?;

        Ok(payload)
    }
}

fn payload_is_base64_encoded(header: &Map<String, Value>) -> anyhow::Result<bool> {
    match header.get("b64") {
        Some(Value::Bool(false)) => match header.get("crit") {
            Some(Value::Array(vals)) if vals.iter().any(|v| v == "b64") => Ok(false),
            _ => bail!("a \"b64: false\" header claim must be listed in \"crit\""),
        },
        Some(Value::Bool(true)) | None => Ok(true),
        Some(_) => bail!("the \"b64\" header claim must be a boolean"),
    }
}
