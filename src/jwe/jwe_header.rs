//! The JWE protected header: `alg`, `enc`, and the key-management
//! parameters (`epk`, `apu`, `apv`, `p2s`, `p2c`, `iv`, `tag`, `zip`)
//! (spec §3, §4.4).

use serde_json::Value;

use crate::error::JoseError;
use crate::header::{self, HeaderKind, HeaderMap, JoseHeader};
use crate::util;

/// Header parameter names beyond the common set that JWE recognizes
/// for the `crit` contract.
pub const JWE_HEADER_EXTENSIONS: &[&str] = &[
    "enc", "zip", "epk", "apu", "apv", "p2s", "p2c", "iv", "tag",
];

#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct JweHeader {
    map: HeaderMap,
}

impl JweHeader {
    pub fn new() -> Self {
        JweHeader { map: HeaderMap::new() }
    }

    /// Parse and classify a protected header segment, rejecting it if
    /// `alg` does not name a JWE key-management algorithm, or if `enc`
    /// is missing (spec §3 invariant: "For JWE, `enc` is always
    /// present").
    pub fn from_segment(segment: &str) -> Result<Self, JoseError> {
        let claims = header::parse_segment(segment)?;
        match header::classify(&claims, JWE_HEADER_EXTENSIONS)? {
            HeaderKind::KeyManagement => {}
            HeaderKind::Plain => {
                return Err(JoseError::UnsupportedAlgorithm(anyhow::anyhow!(
                    "a JWE header must not carry alg: none"
                )))
            }
            HeaderKind::Signing => {
                return Err(JoseError::UnsupportedAlgorithm(anyhow::anyhow!(
                    "a JWS alg was presented where a JWE alg was expected"
                )))
            }
        }
        if !matches!(claims.get("enc"), Some(Value::String(_))) {
            return Err(JoseError::MalformedEncoding(anyhow::anyhow!(
                "the \"enc\" header claim is required for JWE"
            )));
        }
        Ok(JweHeader { map: HeaderMap::from_map(claims) })
    }

    pub fn set_algorithm(&mut self, alg: &str) {
        self.map.set("alg", alg.to_string());
    }

    pub fn set_content_encryption(&mut self, enc: &str) {
        self.map.set("enc", enc.to_string());
    }

    pub fn content_encryption(&self) -> Option<&str> {
        match self.map.get("enc") {
            Some(Value::String(val)) => Some(val),
            _ => None,
        }
    }

    pub fn set_compression(&mut self, zip: &str) {
        self.map.set("zip", zip.to_string());
    }

    pub fn compression(&self) -> Option<&str> {
        match self.map.get("zip") {
            Some(Value::String(val)) => Some(val),
            _ => None,
        }
    }

    pub fn set_token_type(&mut self, typ: &str) {
        self.map.set("typ", typ.to_string());
    }

    pub fn set_key_id(&mut self, kid: &str) {
        self.map.set("kid", kid.to_string());
    }

    pub fn set_claim(&mut self, name: &str, value: Option<Value>) -> Result<(), JoseError> {
        match value {
            Some(value) => self.map.set(name, value),
            None => self.map.remove(name),
        }
        Ok(())
    }

    pub fn claim(&self, name: &str) -> Option<&Value> {
        self.map.get(name)
    }

    pub fn claim_base64(&self, name: &str) -> anyhow::Result<Option<Vec<u8>>> {
        self.map.get_base64(name)
    }

    pub fn claim_u64(&self, name: &str) -> anyhow::Result<Option<u64>> {
        self.map.get_u64(name)
    }

    pub fn to_base64(&self) -> Result<String, JoseError> {
        self.map.to_base64()
    }

    pub fn to_json_bytes(&self) -> Result<Vec<u8>, JoseError> {
        self.map.to_json_bytes()
    }
}

impl JoseHeader for JweHeader {
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

    fn claims_set(&self) -> &serde_json::Map<String, Value> {
        self.map.claims()
    }
}

/// Encode `bytes` into `header[name]` as a base64url string.
pub fn set_claim_base64(header: &mut JweHeader, name: &str, bytes: &[u8]) -> Result<(), JoseError> {
    header.set_claim(name, Some(Value::String(util::encode_base64_urlsafe_nopad(bytes))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requires_enc() {
        let segment = util::encode_base64_urlsafe_nopad(r#"{"alg":"dir"}"#);
        assert!(JweHeader::from_segment(&segment).is_err());
    }

    #[test]
    fn parses_valid_header() {
        let segment = util::encode_base64_urlsafe_nopad(r#"{"alg":"dir","enc":"A128GCM"}"#);
        let header = JweHeader::from_segment(&segment).unwrap();
        assert_eq!(header.algorithm(), Some("dir"));
        assert_eq!(header.content_encryption(), Some("A128GCM"));
    }
}
