//! The shared header model (spec §3 `JOSEHeader`, §4.2 parsing).
//!
//! A header is parsed once, from a base64url JSON segment, into a
//! [`HeaderMap`]. [`JwsHeader`](crate::jws::JwsHeader) and
//! [`JweHeader`](crate::jwe::JweHeader) wrap a `HeaderMap` with
//! alg-family-specific typed accessors; both share the common-attribute
//! accessors exposed by the [`JoseHeader`] trait.

use std::collections::HashSet;

use anyhow::bail;
use serde_json::{Map, Value};

use crate::error::JoseError;
use crate::util;

/// Algorithm identifiers that select the JWS signing family (spec §4.3).
pub const SIGNING_ALGORITHMS: &[&str] = &[
    "HS256", "HS384", "HS512", "RS256", "RS384", "RS512", "PS256", "PS384", "PS512", "ES256",
    "ES384", "ES512", "EdDSA",
];

/// Algorithm identifiers that select the JWE key-management family
/// (spec §4.4.1).
pub const KEY_MANAGEMENT_ALGORITHMS: &[&str] = &[
    "dir",
    "RSA1_5",
    "RSA-OAEP",
    "RSA-OAEP-256",
    "A128KW",
    "A192KW",
    "A256KW",
    "A128GCMKW",
    "A192GCMKW",
    "A256GCMKW",
    "ECDH-ES",
    "ECDH-ES+A128KW",
    "ECDH-ES+A192KW",
    "ECDH-ES+A256KW",
    "PBES2-HS256+A128KW",
    "PBES2-HS384+A192KW",
    "PBES2-HS512+A256KW",
];

/// Content-encryption identifiers recognized for the JWE `enc` header
/// (spec §4.4.2).
pub const CONTENT_ENCRYPTION_ALGORITHMS: &[&str] = &[
    "A128CBC-HS256",
    "A192CBC-HS384",
    "A256CBC-HS512",
    "A128GCM",
    "A192GCM",
    "A256GCM",
];

/// The result of classifying a parsed header's `alg` value (spec §4.2).
#[derive(Debug, Eq, PartialEq, Copy, Clone)]
pub enum HeaderKind {
    /// `alg == "none"`.
    Plain,
    /// `alg` names a JWS signing algorithm.
    Signing,
    /// `alg` names a JWE key-management algorithm.
    KeyManagement,
}

/// Classify a header's algorithm, enforcing the `crit` contract along
/// the way: every entry of `crit` must name a parameter this header
/// itself carries, otherwise the token is rejected with
/// [`JoseError::UnsupportedCritical`] (spec §4.2, §3 invariant).
///
/// `known_extensions` lists header parameter names beyond the common
/// set and the alg-specific set that the caller's layer understands
/// (JWS callers pass the JWS-specific set, JWE callers the JWE-specific
/// set).
pub fn classify(claims: &Map<String, Value>, known_extensions: &[&str]) -> Result<HeaderKind, JoseError> {
    let alg = match claims.get("alg") {
        Some(Value::String(val)) => val.as_str(),
        Some(_) => {
            return Err(JoseError::MalformedEncoding(anyhow::anyhow!(
                "the \"alg\" header claim must be a string"
            )))
        }
        None => {
            return Err(JoseError::MalformedEncoding(anyhow::anyhow!(
                "the \"alg\" header claim is required"
            )))
        }
    };

    check_critical(claims, known_extensions)?;

    if alg == "none" {
        return Ok(HeaderKind::Plain);
    }
    if SIGNING_ALGORITHMS.contains(&alg) {
        return Ok(HeaderKind::Signing);
    }
    if KEY_MANAGEMENT_ALGORITHMS.contains(&alg) {
        return Ok(HeaderKind::KeyManagement);
    }

    Err(JoseError::UnsupportedAlgorithm(anyhow::anyhow!(
        "unrecognized \"alg\" header claim: {}",
        alg
    )))
}

fn check_critical(claims: &Map<String, Value>, known_extensions: &[&str]) -> Result<(), JoseError> {
    let crit = match claims.get("crit") {
        Some(Value::Array(vals)) => vals,
        Some(_) => {
            return Err(JoseError::MalformedEncoding(anyhow::anyhow!(
                "the \"crit\" header claim must be an array"
            )))
        }
        None => return Ok(()),
    };

    let known: HashSet<&str> = COMMON_HEADER_CLAIMS
        .iter()
        .copied()
        .chain(known_extensions.iter().copied())
        .collect();

    for entry in crit {
        match entry {
            Value::String(name) => {
                if !known.contains(name.as_str()) || !claims.contains_key(name) {
                    return Err(JoseError::UnsupportedCritical(anyhow::anyhow!(
                        "unrecognized critical header parameter: {}",
                        name
                    )));
                }
            }
            _ => {
                return Err(JoseError::MalformedEncoding(anyhow::anyhow!(
                    "entries of \"crit\" must be strings"
                )))
            }
        }
    }

    Ok(())
}

const COMMON_HEADER_CLAIMS: &[&str] = &[
    "alg", "typ", "cty", "kid", "jku", "jwk", "x5u", "x5c", "x5t", "x5t#S256", "crit",
];

/// Read the `alg` header claim without validating `crit`, for the
/// top-level dispatch that must know which concrete header type
/// (`PlainHeader`, `JwsHeader`, `JweHeader`) owns the authoritative
/// `crit` extension set before re-parsing for real (spec §4.2, §4.6).
pub(crate) fn peek_algorithm(claims: &Map<String, Value>) -> Result<&str, JoseError> {
    match claims.get("alg") {
        Some(Value::String(val)) => Ok(val.as_str()),
        Some(_) => Err(JoseError::MalformedEncoding(anyhow::anyhow!(
            "the \"alg\" header claim must be a string"
        ))),
        None => Err(JoseError::MalformedEncoding(anyhow::anyhow!(
            "the \"alg\" header claim is required"
        ))),
    }
}

/// Parse a base64url header segment into its claim map.
pub fn parse_segment(segment: &str) -> Result<Map<String, Value>, JoseError> {
    let bytes = util::decode_base64_urlsafe_nopad(segment)?;
    let value: Value = serde_json::from_slice(&bytes)
        .map_err(|err| JoseError::MalformedEncoding(anyhow::Error::from(err)))?;
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(JoseError::MalformedEncoding(anyhow::anyhow!(
            "a JOSE header must be a JSON object"
        ))),
    }
}

/// Common accessors shared by [`crate::jws::JwsHeader`] and
/// [`crate::jwe::JweHeader`].
pub trait JoseHeader {
    /// The `alg` header claim.
    fn algorithm(&self) -> Option<&str>;

    /// The `typ` header claim.
    fn token_type(&self) -> Option<&str>;

    /// The `cty` header claim.
    fn content_type(&self) -> Option<&str>;

    /// The `kid` header claim.
    fn key_id(&self) -> Option<&str>;

    /// The names listed in the `crit` header claim.
    fn critical(&self) -> Option<Vec<&str>>;

    /// An arbitrary header claim by name, including ones without a
    /// typed accessor.
    fn claim(&self, name: &str) -> Option<&Value>;

    /// The raw claim map, for serialization.
    fn claims_set(&self) -> &Map<String, Value>;
}

/// A mutable claim map backing a header builder; frozen into an
/// immutable header once construction completes (spec §3 lifecycle).
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct HeaderMap {
    claims: Map<String, Value>,
}

impl HeaderMap {
    pub fn new() -> Self {
        HeaderMap { claims: Map::new() }
    }

    pub fn from_map(claims: Map<String, Value>) -> Self {
        HeaderMap { claims }
    }

    pub fn claims(&self) -> &Map<String, Value> {
        &self.claims
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.claims.get(name)
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.claims.insert(name.into(), value.into());
    }

    pub fn remove(&mut self, name: &str) {
        self.claims.remove(name);
    }

    pub fn get_string(&self, name: &str) -> anyhow::Result<Option<&str>> {
        match self.claims.get(name) {
            Some(Value::String(val)) => Ok(Some(val.as_str())),
            Some(val) => bail!("the \"{}\" header claim must be a string, found {:?}", name, val),
            None => Ok(None),
        }
    }

    pub fn get_base64(&self, name: &str) -> anyhow::Result<Option<Vec<u8>>> {
        util::parse_base64_field(&self.claims, name)
    }

    pub fn get_u64(&self, name: &str) -> anyhow::Result<Option<u64>> {
        match self.claims.get(name) {
            Some(Value::Number(val)) => match val.as_u64() {
                Some(val) => Ok(Some(val)),
                None => bail!("the \"{}\" header claim overflowed a u64", name),
            },
            Some(val) => bail!("the \"{}\" header claim must be a number, found {:?}", name, val),
            None => Ok(None),
        }
    }

    pub fn get_string_array(&self, name: &str) -> anyhow::Result<Option<Vec<String>>> {
        match self.claims.get(name) {
            Some(Value::Array(vals)) => {
                let mut out = Vec::with_capacity(vals.len());
                for val in vals {
                    match val {
                        Value::String(val) => out.push(val.clone()),
                        _ => bail!("entries of \"{}\" must be strings", name),
                    }
                }
                Ok(Some(out))
            }
            Some(val) => bail!("the \"{}\" header claim must be an array, found {:?}", name, val),
            None => Ok(None),
        }
    }

    pub fn to_json_bytes(&self) -> Result<Vec<u8>, JoseError> {
        serde_json::to_vec(&self.claims)
            .map_err(|err| JoseError::MalformedEncoding(anyhow::Error::from(err)))
    }

    pub fn to_base64(&self) -> Result<String, JoseError> {
        Ok(util::encode_base64_urlsafe_nopad(self.to_json_bytes()?))
    }
}

/// The `Plain` variant of `JOSEHeader` (spec §3): a frozen header whose
/// `alg` is always `"none"`. Carried by [`crate::jwt::PlainJwt`]; its
/// payload is never authenticated, so the JWT facade only exposes the
/// claims behind an explicit policy check (spec §8 negative scenario).
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct PlainHeader {
    map: HeaderMap,
}

impl PlainHeader {
    /// A fresh plain header with `alg: none` already set.
    pub fn new() -> Self {
        let mut map = HeaderMap::new();
        map.set("alg", "none");
        PlainHeader { map }
    }

    /// Parse and classify a protected header segment, rejecting it
    /// unless `alg == "none"`.
    pub fn from_segment(segment: &str) -> Result<Self, JoseError> {
        let claims = parse_segment(segment)?;
        match classify(&claims, &[])? {
            HeaderKind::Plain => Ok(PlainHeader { map: HeaderMap::from_map(claims) }),
            HeaderKind::Signing | HeaderKind::KeyManagement => {
                Err(JoseError::UnsupportedAlgorithm(anyhow::anyhow!(
                    "a plain header must carry alg: none"
                )))
            }
        }
    }

    pub fn set_token_type(&mut self, typ: &str) {
        self.map.set("typ", typ.to_string());
    }

    pub fn set_content_type(&mut self, cty: &str) {
        self.map.set("cty", cty.to_string());
    }

    pub fn set_claim(&mut self, name: &str, value: Option<Value>) -> Result<(), JoseError> {
        match value {
            Some(value) => self.map.set(name, value),
            None => self.map.remove(name),
        }
        Ok(())
    }

    pub fn to_base64(&self) -> Result<String, JoseError> {
        self.map.to_base64()
    }
}

impl JoseHeader for PlainHeader {
    fn algorithm(&self) -> Option<&str> {
        match self.map.get("alg") {
            Some(Value::String(val)) => Some(val),
            _ => None,
        }
    }

    fn token_type(&self) -> Option<&str> {
        match self.map.get("typ") {
            Some(Value::String(val)) => Some(val),
            _ => None,
        }
    }

    fn content_type(&self) -> Option<&str> {
        match self.map.get("cty") {
            Some(Value::String(val)) => Some(val),
            _ => None,
        }
    }

    fn key_id(&self) -> Option<&str> {
        match self.map.get("kid") {
            Some(Value::String(val)) => Some(val),
            _ => None,
        }
    }

    fn critical(&self) -> Option<Vec<&str>> {
        match self.map.get("crit") {
            Some(Value::Array(vals)) => Some(vals.iter().filter_map(|v| v.as_str()).collect()),
            _ => None,
        }
    }

    fn claim(&self, name: &str) -> Option<&Value> {
        self.map.get(name)
    }

    fn claims_set(&self) -> &Map<String, Value> {
        self.map.claims()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(json: Value) -> Map<String, Value> {
        match json {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn classifies_plain() {
        let claims = obj(json!({"alg": "none"}));
        assert_eq!(classify(&claims, &[]).unwrap(), HeaderKind::Plain);
    }

    #[test]
    fn classifies_signing() {
        let claims = obj(json!({"alg": "HS256"}));
        assert_eq!(classify(&claims, &[]).unwrap(), HeaderKind::Signing);
    }

    #[test]
    fn classifies_key_management() {
        let claims = obj(json!({"alg": "dir", "enc": "A128GCM"}));
        assert_eq!(classify(&claims, &["enc"]).unwrap(), HeaderKind::KeyManagement);
    }

    #[test]
    fn rejects_unknown_alg() {
        let claims = obj(json!({"alg": "bogus"}));
        assert!(classify(&claims, &[]).is_err());
    }

    #[test]
    fn rejects_unrecognized_critical_parameter() {
        let claims = obj(json!({"alg": "HS256", "crit": ["b64"]}));
        assert!(classify(&claims, &[]).is_err());
    }

    #[test]
    fn accepts_recognized_critical_parameter_present_in_header() {
        let claims = obj(json!({"alg": "HS256", "b64": false, "crit": ["b64"]}));
        assert_eq!(classify(&claims, &["b64"]).unwrap(), HeaderKind::Signing);
    }

    #[test]
    fn plain_header_round_trips() {
        let mut header = PlainHeader::new();
        header.set_token_type("JWT");
        let segment = header.to_base64().unwrap();

        let parsed = PlainHeader::from_segment(&segment).unwrap();
        assert_eq!(parsed.algorithm(), Some("none"));
        assert_eq!(parsed.token_type(), Some("JWT"));
    }

    #[test]
    fn plain_header_rejects_non_none_alg() {
        let segment = util::encode_base64_urlsafe_nopad(r#"{"alg":"HS256"}"#);
        assert!(PlainHeader::from_segment(&segment).is_err());
    }

    #[test]
    fn peek_algorithm_reads_without_crit_check() {
        let claims = obj(json!({"alg": "dir", "crit": ["enc"], "enc": "A128GCM"}));
        assert_eq!(peek_algorithm(&claims).unwrap(), "dir");
    }
}
