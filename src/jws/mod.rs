//! JSON Web Signature (JWS) support.

pub mod alg;
mod jws_algorithm;
mod jws_context;
mod jws_header;

use once_cell::sync::Lazy;

use crate::error::JoseError;

pub use jws_algorithm::{JwsAlgorithm, JwsSigner, JwsVerifier};
pub use jws_context::JwsContext;
pub use jws_header::JwsHeader;

pub use crate::jws::alg::hmac::HmacJwsAlgorithm::Hs256 as HS256;
pub use crate::jws::alg::hmac::HmacJwsAlgorithm::Hs384 as HS384;
pub use crate::jws::alg::hmac::HmacJwsAlgorithm::Hs512 as HS512;

pub use crate::jws::alg::rsassa::RsaJwsAlgorithm::Rs256 as RS256;
pub use crate::jws::alg::rsassa::RsaJwsAlgorithm::Rs384 as RS384;
pub use crate::jws::alg::rsassa::RsaJwsAlgorithm::Rs512 as RS512;

pub use crate::jws::alg::rsassa_pss::RsaPssJwsAlgorithm::Ps256 as PS256;
pub use crate::jws::alg::rsassa_pss::RsaPssJwsAlgorithm::Ps384 as PS384;
pub use crate::jws::alg::rsassa_pss::RsaPssJwsAlgorithm::Ps512 as PS512;

pub use crate::jws::alg::ecdsa::EcdsaJwsAlgorithm::Es256 as ES256;
pub use crate::jws::alg::ecdsa::EcdsaJwsAlgorithm::Es384 as ES384;
pub use crate::jws::alg::ecdsa::EcdsaJwsAlgorithm::Es512 as ES512;

pub use crate::jws::alg::eddsa::EDDSA;

static DEFAULT_CONTEXT: Lazy<JwsContext> = Lazy::new(JwsContext::new);

/// Return a compact JWS for `payload` under `header`, signed by `signer`.
pub fn serialize_compact(
    payload: &[u8],
    header: &JwsHeader,
    signer: &dyn JwsSigner,
) -> Result<String, JoseError> {
    DEFAULT_CONTEXT.serialize_compact(payload, header, signer)
}

/// As [`serialize_compact`], choosing the signer per-message via `selector`.
pub fn serialize_compact_with_selector<'a, F>(
    payload: &[u8],
    header: &JwsHeader,
    selector: F,
) -> Result<String, JoseError>
where
    F: Fn(&JwsHeader) -> Option<&'a dyn JwsSigner>,
{
    DEFAULT_CONTEXT.serialize_compact_with_selector(payload, header, selector)
}

/// Verify a compact JWS with `verifier`, returning the payload and the
/// parsed header.
pub fn deserialize_compact(
    input: &str,
    verifier: &dyn JwsVerifier,
) -> Result<(Vec<u8>, JwsHeader), JoseError> {
    DEFAULT_CONTEXT.deserialize_compact(input, verifier)
}

/// As [`deserialize_compact`], choosing the verifier once the header is
/// known via `selector`.
pub fn deserialize_compact_with_selector<'a, F>(
    input: &str,
    selector: F,
) -> Result<(Vec<u8>, JwsHeader), JoseError>
where
    F: Fn(&JwsHeader) -> Result<Option<&'a dyn JwsVerifier>, JoseError>,
{
    DEFAULT_CONTEXT.deserialize_compact_with_selector(input, selector)
}

#[cfg(test)]
mod tests {
    use anyhow::Result;

    use super::*;
    use crate::header::JoseHeader;

    #[test]
    fn test_jws_compact_serialization() -> Result<()> {
        let mut header = JwsHeader::new();
        header.set_token_type("JWT");

        let key = vec![1u8; 32];
        let signer = HS256.signer_from_bytes(&key)?;
        let verifier = HS256.verifier_from_bytes(&key)?;

        let payload = b"test payload!";
        let jws = serialize_compact(payload, &header, &signer)?;
        let (decoded_payload, decoded_header) = deserialize_compact(&jws, &verifier)?;

        assert_eq!(decoded_payload, payload);
        assert_eq!(decoded_header.algorithm(), Some("HS256"));

        Ok(())
    }
}
