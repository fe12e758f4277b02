//! The JWS protected header: built by a builder, then frozen and
//! carried immutably through signing/verification (spec §3 lifecycle).

use serde_json::Value;

use crate::error::JoseError;
use crate::header::{self, HeaderKind, HeaderMap, JoseHeader};

/// Header parameter names beyond the common set that JWS recognizes
/// for the `crit` contract (spec §3; RFC 7797 `b64`).
pub const JWS_HEADER_EXTENSIONS: &[&str] = &["b64"];

#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct JwsHeader {
    map: HeaderMap,
}

impl JwsHeader {
    pub fn new() -> Self {
        JwsHeader { map: HeaderMap::new() }
    }

    /// Parse and classify a protected header segment, rejecting it if
    /// `alg` does not name a JWS signing algorithm.
    pub fn from_segment(segment: &str) -> Result<Self, JoseError> {
        let claims = header::parse_segment(segment)?;
        match header::classify(&claims, JWS_HEADER_EXTENSIONS)? {
            HeaderKind::Signing => Ok(JwsHeader { map: HeaderMap::from_map(claims) }),
            HeaderKind::Plain => Err(JoseError::UnsupportedAlgorithm(anyhow::anyhow!(
                "a JWS header must not carry alg: none"
            ))),
            HeaderKind::KeyManagement => Err(JoseError::UnsupportedAlgorithm(anyhow::anyhow!(
                "a JWE alg was presented where a JWS alg was expected"
            ))),
        }
    }

    pub fn set_algorithm(&mut self, alg: &str) {
        self.map.set("alg", alg.to_string());
    }

    pub fn set_token_type(&mut self, typ: &str) {
        self.map.set("typ", typ.to_string());
    }

    pub fn set_content_type(&mut self, cty: &str) {
        self.map.set("cty", cty.to_string());
    }

    pub fn set_key_id(&mut self, kid: &str) {
        self.map.set("kid", kid.to_string());
    }

    pub fn set_critical(&mut self, names: &[&str]) {
        self.map.set(
            "crit",
            Value::Array(names.iter().map(|n| Value::String(n.to_string())).collect()),
        );
    }

    pub fn set_base64_encoded_payload(&mut self, b64: bool) {
        self.map.set("b64", b64);
    }

    pub fn set_claim(&mut self, name: &str, value: Option<Value>) -> Result<(), JoseError> {
        match value {
            Some(value) => self.map.set(name, value),
            None => self.map.remove(name),
        }
        Ok(())
    }
}

impl JoseHeader for JwsHeader {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util;

    #[test]
    fn builds_and_round_trips_through_a_segment() {
        let mut header = JwsHeader::new();
        header.set_algorithm("HS256");
        header.set_token_type("JWT");

        let segment = util::encode_base64_urlsafe_nopad(
            serde_json::to_vec(header.claims_set()).unwrap(),
        );
        let parsed = JwsHeader::from_segment(&segment).unwrap();
        assert_eq!(parsed.algorithm(), Some("HS256"));
        assert_eq!(parsed.token_type(), Some("JWT"));
    }

    #[test]
    fn rejects_jwe_alg() {
        let segment = util::encode_base64_urlsafe_nopad(r#"{"alg":"dir","enc":"A128GCM"}"#);
        assert!(JwsHeader::from_segment(&segment).is_err());
    }
}
