//! The JWT facade (spec §4.6): classifies a compact token into
//! `PlainJwt` / `SignedJwt` / `EncryptedJwt` by its `alg` header claim,
//! then orchestrates the JWS/JWE core to recover its
//! [`JwtClaimsSet`](claims::JwtClaimsSet).
//!
//! Claims are reachable only through [`SignedJwt::verify`] /
//! [`EncryptedJwt::decrypt`] (or, gated by policy,
//! [`PlainJwt::into_claims`]): there is no accessor on the
//! pre-verification types that returns a claim set, so the type system
//! enforces the `parsed` vs. `verified`/`decrypted` state split spec
//! §4.6 calls for.

pub mod claims;
pub mod handler;

pub use claims::JwtClaimsSet;
pub use handler::JwtHandler;

use crate::config::JoseConfig;
use crate::error::JoseError;
use crate::header::{self, PlainHeader};
use crate::header::{KEY_MANAGEMENT_ALGORITHMS, SIGNING_ALGORITHMS};
use crate::jwe::{JweContext, JweDecrypter, JweEncrypter, JweHeader};
use crate::jws::{JwsContext, JwsHeader, JwsSigner, JwsVerifier};

/// The tagged classification of a compact token (spec §4.6, §4.7).
#[derive(Debug, Clone)]
pub enum ClassifiedJwt {
    Plain(PlainJwt),
    Signed(SignedJwt),
    Encrypted(EncryptedJwt),
}

/// An `alg: none` token: header and payload are parsed, but nothing
/// about it has been authenticated.
#[derive(Debug, Clone)]
pub struct PlainJwt {
    header: PlainHeader,
    payload: Vec<u8>,
}

impl PlainJwt {
    pub fn header(&self) -> &PlainHeader {
        &self.header
    }

    /// Recover the claim set. Fails unless `config.allow_none` is
    /// explicitly set (spec §8 negative scenario; Design Notes open
    /// question (a)): an unsigned, unencrypted token carries no
    /// integrity guarantee, so the default must not hand claims to a
    /// caller who has not opted in.
    pub fn into_claims(self, config: &JoseConfig) -> Result<JwtClaimsSet, JoseError> {
        if !config.allow_none {
            return Err(JoseError::UnsupportedAlgorithm(anyhow::anyhow!(
                "alg: none is rejected unless JoseConfig::allow_none is set"
            )));
        }
        JwtClaimsSet::from_bytes(&self.payload)
    }
}

/// A token whose `alg` names a JWS signing algorithm; not yet
/// verified.
#[derive(Debug, Clone)]
pub struct SignedJwt {
    compact: String,
    header: JwsHeader,
}

impl SignedJwt {
    pub fn header(&self) -> &JwsHeader {
        &self.header
    }

    /// Verify with the default [`JwsContext`] and recover the claim set.
    pub fn verify(&self, verifier: &dyn JwsVerifier) -> Result<VerifiedJwt, JoseError> {
        self.verify_with_context(&JwsContext::new(), verifier)
    }

    pub fn verify_with_context(
        &self,
        context: &JwsContext,
        verifier: &dyn JwsVerifier,
    ) -> Result<VerifiedJwt, JoseError> {
        let (payload, header) = context.deserialize_compact(&self.compact, verifier)?;
        let claims = JwtClaimsSet::from_bytes(&payload)?;
        Ok(VerifiedJwt { header, claims })
    }
}

/// A token whose `alg` names a JWE key-management algorithm; not yet
/// decrypted.
#[derive(Debug, Clone)]
pub struct EncryptedJwt {
    compact: String,
    header: JweHeader,
}

impl EncryptedJwt {
    pub fn header(&self) -> &JweHeader {
        &self.header
    }

    /// Decrypt with the default [`JweContext`] and recover the claim set.
    pub fn decrypt(&self, decrypter: &dyn JweDecrypter) -> Result<DecryptedJwt, JoseError> {
        self.decrypt_with_context(&JweContext::new(), decrypter)
    }

    pub fn decrypt_with_context(
        &self,
        context: &JweContext,
        decrypter: &dyn JweDecrypter,
    ) -> Result<DecryptedJwt, JoseError> {
        let (payload, header) = context.deserialize_compact(&self.compact, decrypter)?;
        let claims = JwtClaimsSet::from_bytes(&payload)?;
        Ok(DecryptedJwt { header, claims })
    }
}

/// A signed token whose signature has been verified; its claim set is
/// trustworthy to the extent the verifier's key is.
#[derive(Debug, Clone)]
pub struct VerifiedJwt {
    header: JwsHeader,
    claims: JwtClaimsSet,
}

impl VerifiedJwt {
    pub fn header(&self) -> &JwsHeader {
        &self.header
    }

    pub fn claims(&self) -> &JwtClaimsSet {
        &self.claims
    }

    pub fn into_claims(self) -> JwtClaimsSet {
        self.claims
    }
}

/// An encrypted token whose ciphertext has been decrypted and
/// authenticated.
#[derive(Debug, Clone)]
pub struct DecryptedJwt {
    header: JweHeader,
    claims: JwtClaimsSet,
}

impl DecryptedJwt {
    pub fn header(&self) -> &JweHeader {
        &self.header
    }

    pub fn claims(&self) -> &JwtClaimsSet {
        &self.claims
    }

    pub fn into_claims(self) -> JwtClaimsSet {
        self.claims
    }
}

/// Classify a compact token string by its `alg` header claim (spec
/// §4.6). Segment count is checked against the variant the `alg`
/// selects; a mismatch is `MalformedEncoding`, same as any other
/// structural violation (spec §7 closed taxonomy has no separate
/// "malformed token" kind).
pub fn classify_compact(input: &str) -> Result<ClassifiedJwt, JoseError> {
    let dots: Vec<usize> =
        input.char_indices().filter(|(_, c)| *c == '.').map(|(i, _)| i).collect();
    let first_dot = *dots.first().ok_or_else(|| {
        JoseError::MalformedEncoding(anyhow::anyhow!("a compact token must contain at least one '.'"))
    })?;

    let header_segment = &input[..first_dot];
    let claims = header::parse_segment(header_segment)?;
    let alg = header::peek_algorithm(&claims)?;

    if alg == "none" {
        require_dot_count(&dots, 2, "PlainJWT")?;
        let signature_segment = &input[(dots[1] + 1)..];
        if !signature_segment.is_empty() {
            return Err(JoseError::MalformedEncoding(anyhow::anyhow!(
                "a PlainJWT's signature segment must be empty"
            )));
        }
        let header = PlainHeader::from_segment(header_segment)?;
        let payload_segment = &input[(dots[0] + 1)..dots[1]];
        let payload = crate::util::decode_base64_urlsafe_nopad(payload_segment)?;
        return Ok(ClassifiedJwt::Plain(PlainJwt { header, payload }));
    }

    if SIGNING_ALGORITHMS.contains(&alg) {
        require_dot_count(&dots, 2, "SignedJWT")?;
        let header = JwsHeader::from_segment(header_segment)?;
        return Ok(ClassifiedJwt::Signed(SignedJwt { compact: input.to_string(), header }));
    }

    if KEY_MANAGEMENT_ALGORITHMS.contains(&alg) {
        require_dot_count(&dots, 4, "EncryptedJWT")?;
        let header = JweHeader::from_segment(header_segment)?;
        return Ok(ClassifiedJwt::Encrypted(EncryptedJwt { compact: input.to_string(), header }));
    }

    // header::parse_segment + a reparse by the concrete header type
    // above would already have rejected an unknown alg; this arm only
    // guards against classify() and this function's alg set drifting
    // apart.
    Err(JoseError::UnsupportedAlgorithm(anyhow::anyhow!(
        "unrecognized \"alg\" header claim: {}",
        alg
    )))
}

fn require_dot_count(dots: &[usize], expected: usize, variant: &str) -> Result<(), JoseError> {
    if dots.len() != expected {
        return Err(JoseError::MalformedEncoding(anyhow::anyhow!(
            "a {} must have exactly {} '.' separators, found {}",
            variant,
            expected,
            dots.len()
        )));
    }
    Ok(())
}

/// Build an `alg: none` compact token. Fails unless `config.allow_none`
/// (mirrors the read-side policy gate so a producer cannot silently
/// mint tokens a default-configured consumer will refuse).
pub fn encode_unsecured(
    claims: &JwtClaimsSet,
    header: &PlainHeader,
    config: &JoseConfig,
) -> Result<String, JoseError> {
    if !config.allow_none {
        return Err(JoseError::UnsupportedAlgorithm(anyhow::anyhow!(
            "alg: none is rejected unless JoseConfig::allow_none is set"
        )));
    }
    let header_b64 = header.to_base64()?;
    let payload_b64 = crate::util::encode_base64_urlsafe_nopad(claims.to_bytes()?);
    Ok(format!("{}.{}.", header_b64, payload_b64))
}

/// Build a compact JWS carrying `claims` as its payload.
pub fn encode_with_signer(
    claims: &JwtClaimsSet,
    header: &JwsHeader,
    signer: &dyn JwsSigner,
) -> Result<String, JoseError> {
    crate::jws::serialize_compact(&claims.to_bytes()?, header, signer)
}

/// Build a compact JWE carrying `claims` as its payload.
pub fn encode_with_encrypter(
    claims: &JwtClaimsSet,
    header: &JweHeader,
    encrypter: &dyn JweEncrypter,
) -> Result<String, JoseError> {
    crate::jwe::serialize_compact(&claims.to_bytes()?, header, encrypter)
}

#[cfg(test)]
mod tests {
    use anyhow::Result;

    use super::*;
    use crate::header::JoseHeader;
    use crate::jwe::{A128GCMKW, DIR};
    use crate::jws::HS256;
    use crate::util;

    #[test]
    fn classifies_signed_jwt_and_verifies() -> Result<()> {
        let key = vec![0u8; 32];
        let signer = HS256.signer_from_bytes(&key)?;
        let verifier = HS256.verifier_from_bytes(&key)?;

        let mut header = JwsHeader::new();
        header.set_token_type("JWT");

        let mut claims = JwtClaimsSet::new();
        claims.set_subject("1234567890");
        claims.set_issued_at(1_516_239_022);

        let compact = encode_with_signer(&claims, &header, &signer)?;

        match classify_compact(&compact)? {
            ClassifiedJwt::Signed(jwt) => {
                assert_eq!(jwt.header().algorithm(), Some("HS256"));
                let verified = jwt.verify(&verifier)?;
                assert_eq!(verified.claims().subject(), Some("1234567890"));
                assert_eq!(verified.claims().issued_at()?, Some(1_516_239_022));
            }
            other => panic!("expected Signed, got {:?}", other),
        }
        Ok(())
    }

    #[test]
    fn classifies_encrypted_jwt_and_decrypts() -> Result<()> {
        let key = util::rand_bytes(16);
        let encrypter = A128GCMKW.encrypter_from_bytes(&key)?;
        let decrypter = A128GCMKW.decrypter_from_bytes(&key)?;

        let mut header = JweHeader::new();
        header.set_content_encryption("A128GCM");

        let mut claims = JwtClaimsSet::new();
        claims.set_issuer("issuer");

        let compact = encode_with_encrypter(&claims, &header, &encrypter)?;

        match classify_compact(&compact)? {
            ClassifiedJwt::Encrypted(jwt) => {
                let decrypted = jwt.decrypt(&decrypter)?;
                assert_eq!(decrypted.claims().issuer(), Some("issuer"));
            }
            other => panic!("expected Encrypted, got {:?}", other),
        }
        Ok(())
    }

    #[test]
    fn plain_jwt_rejected_by_default_policy() -> Result<()> {
        let header = PlainHeader::new();
        let claims = JwtClaimsSet::new();
        let config = JoseConfig::default();

        let compact = encode_unsecured(&claims, &header, &JoseConfig { allow_none: true, ..config })?;

        match classify_compact(&compact)? {
            ClassifiedJwt::Plain(jwt) => {
                assert!(jwt.into_claims(&config).is_err());
            }
            other => panic!("expected Plain, got {:?}", other),
        }
        Ok(())
    }

    #[test]
    fn plain_jwt_accepted_when_explicitly_allowed() -> Result<()> {
        let header = PlainHeader::new();
        let mut claims = JwtClaimsSet::new();
        claims.set_subject("anonymous");
        let config = JoseConfig { allow_none: true, ..JoseConfig::default() };

        let compact = encode_unsecured(&claims, &header, &config)?;

        match classify_compact(&compact)? {
            ClassifiedJwt::Plain(jwt) => {
                let claims = jwt.into_claims(&config)?;
                assert_eq!(claims.subject(), Some("anonymous"));
            }
            other => panic!("expected Plain, got {:?}", other),
        }
        Ok(())
    }

    #[test]
    fn cross_variant_isolation_jws_never_parses_as_jwe() -> Result<()> {
        let key = vec![0u8; 32];
        let signer = HS256.signer_from_bytes(&key)?;
        let header = JwsHeader::new();
        let claims = JwtClaimsSet::new();
        let compact = encode_with_signer(&claims, &header, &signer)?;

        match classify_compact(&compact)? {
            ClassifiedJwt::Signed(_) => {}
            other => panic!("expected Signed, got {:?}", other),
        }
        Ok(())
    }

    #[test]
    fn wrong_segment_count_for_alg_is_rejected() {
        // alg HS256 (a signing alg) wearing a 5-segment JWE shape.
        let header_b64 = util::encode_base64_urlsafe_nopad(r#"{"alg":"HS256"}"#);
        let bogus = format!("{}.a.b.c.d", header_b64);
        assert!(classify_compact(&bogus).is_err());
    }

    #[test]
    fn missing_dot_is_malformed() {
        assert!(classify_compact("no-dots-here").is_err());
    }
}
