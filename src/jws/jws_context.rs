//! Algorithm dispatch and compact serialization orchestration for JWS
//! (spec §4.3, component 4 "Algorithm registry & dispatch").

use crate::error::JoseError;
use crate::header::JoseHeader;
use crate::jws::jws_algorithm::{JwsSigner, JwsVerifier};
use crate::jws::jws_header::JwsHeader;

/// A stateless JWS engine. Safe to share across threads/callers
/// (spec §5): it holds no mutable state of its own.
#[derive(Debug, Default, Clone, Copy)]
pub struct JwsContext;

impl JwsContext {
    pub fn new() -> Self {
        JwsContext
    }

    /// Build the three-segment compact JWS for `payload` under `header`,
    /// using `signer`.
    pub fn serialize_compact(
        &self,
        payload: &[u8],
        header: &JwsHeader,
        signer: &dyn JwsSigner,
    ) -> Result<String, JoseError> {
        let mut claims = header.claims_set().clone();
        claims.insert("alg".to_string(), signer.algorithm().name().into());
        if let Some(kid) = signer.key_id() {
            claims.insert("kid".to_string(), kid.into());
        }
        signer.serialize_compact(&claims, payload)
    }

    /// Build the compact JWS, selecting the signer per-message via
    /// `selector` (e.g. to sign with whichever key a `kid` hint points
    /// to).
    pub fn serialize_compact_with_selector<'a, F>(
        &self,
        payload: &[u8],
        header: &JwsHeader,
        selector: F,
    ) -> Result<String, JoseError>
    where
        F: Fn(&JwsHeader) -> Option<&'a dyn JwsSigner>,
    {
        let signer = selector(header).ok_or_else(|| {
            JoseError::UnsupportedAlgorithm(anyhow::anyhow!(
                "no signer was selected for alg {:?}",
                header.algorithm()
            ))
        })?;
        self.serialize_compact(payload, header, signer)
    }

    /// Verify and decode a compact JWS using `verifier`. Returns the
    /// payload and the parsed header on success.
    pub fn deserialize_compact(
        &self,
        input: &str,
        verifier: &dyn JwsVerifier,
    ) -> Result<(Vec<u8>, JwsHeader), JoseError> {
        let dots: Vec<usize> = input.char_indices().filter(|(_, c)| *c == '.').map(|(i, _)| i).collect();
        if dots.len() != 2 {
            return Err(JoseError::MalformedEncoding(anyhow::anyhow!(
                "a compact JWS must have exactly two '.' separators, found {}",
                dots.len()
            )));
        }
        let header_segment = &input[..dots[0]];
        let header = JwsHeader::from_segment(header_segment)?;
        let payload = verifier.deserialize_compact(header.claims_set(), input)?;
        Ok((payload, header))
    }

    /// As [`Self::deserialize_compact`], but the verifier is chosen
    /// per-message via `selector` once the header is known (e.g. to
    /// look a key up by `kid`).
    pub fn deserialize_compact_with_selector<'a, F>(
        &self,
        input: &str,
        selector: F,
    ) -> Result<(Vec<u8>, JwsHeader), JoseError>
    where
        F: Fn(&JwsHeader) -> Result<Option<&'a dyn JwsVerifier>, JoseError>,
    {
        let dots: Vec<usize> = input.char_indices().filter(|(_, c)| *c == '.').map(|(i, _)| i).collect();
        if dots.len() != 2 {
            return Err(JoseError::MalformedEncoding(anyhow::anyhow!(
                "a compact JWS must have exactly two '.' separators, found {}",
                dots.len()
            )));
        }
        let header_segment = &input[..dots[0]];
        let header = JwsHeader::from_segment(header_segment)?;
        let verifier = selector(&header)?.ok_or_else(|| {
            JoseError::UnsupportedAlgorithm(anyhow::anyhow!(
                "no verifier was selected for alg {:?}",
                header.algorithm()
            ))
        })?;
        let payload = verifier.deserialize_compact(header.claims_set(), input)?;
        Ok((payload, header))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jws::alg::hmac::HmacJwsAlgorithm;

    #[test]
    fn round_trips_through_compact_serialization() {
        let ctx = JwsContext::new();
        let key = vec![0u8; 32];
        let signer = HmacJwsAlgorithm::Hs256.signer_from_bytes(&key).unwrap();
        let verifier = HmacJwsAlgorithm::Hs256.verifier_from_bytes(&key).unwrap();

        let mut header = JwsHeader::new();
        header.set_token_type("JWT");

        let compact = ctx.serialize_compact(b"hello", &header, &signer).unwrap();
        assert_eq!(compact.matches('.').count(), 2);

        let (payload, parsed) = ctx.deserialize_compact(&compact, &verifier).unwrap();
        assert_eq!(payload, b"hello");
        assert_eq!(parsed.algorithm(), Some("HS256"));
    }

    #[test]
    fn tampered_signature_is_rejected() {
        let ctx = JwsContext::new();
        let key = vec![0u8; 32];
        let signer = HmacJwsAlgorithm::Hs256.signer_from_bytes(&key).unwrap();
        let verifier = HmacJwsAlgorithm::Hs256.verifier_from_bytes(&key).unwrap();

        let header = JwsHeader::new();
        let mut compact = ctx.serialize_compact(b"hello", &header, &signer).unwrap();
        let last = compact.len() - 1;
        let mutated_char = if compact.as_bytes()[last] == b'A' { 'B' } else { 'A' };
        compact.replace_range(last.., &mutated_char.to_string());

        assert!(ctx.deserialize_compact(&compact, &verifier).is_err());
    }

    #[test]
    fn wrong_segment_count_is_rejected() {
        let ctx = JwsContext::new();
        let verifier = HmacJwsAlgorithm::Hs256.verifier_from_bytes(vec![0u8; 32]).unwrap();
        assert!(ctx.deserialize_compact("a.b.c.d", &verifier).is_err());
    }
}
