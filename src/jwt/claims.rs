//! `JWTClaimsSet` (spec §3): the claim map carried as a JWS/JWE payload,
//! with typed accessors for the registered claims and verbatim
//! preservation of everything else.
//!
//! This is a data container only. Issuer/audience/expiry *policy*
//! (clock skew, equality rules, acceptable issuers) is deliberately an
//! external collaborator's concern (spec §1 Non-goals); the accessors
//! here only decode the registered claims to their natural type.

use anyhow::bail;
use serde_json::{Map, Number, Value};

use crate::error::JoseError;

/// A JWT claim set: either freshly built by a caller, or recovered
/// from a verified/decrypted payload.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct JwtClaimsSet {
    claims: Map<String, Value>,
}

impl JwtClaimsSet {
    pub fn new() -> Self {
        JwtClaimsSet { claims: Map::new() }
    }

    /// Parse a JWS/JWE payload as a JWT claim set. The payload must be
    /// a UTF-8 JSON object.
    pub fn from_bytes(payload: &[u8]) -> Result<Self, JoseError> {
        let value: Value = serde_json::from_slice(payload)
            .map_err(|err| JoseError::MalformedEncoding(anyhow::Error::from(err)))?;
        match value {
            Value::Object(claims) => Ok(JwtClaimsSet { claims }),
            _ => Err(JoseError::MalformedEncoding(anyhow::anyhow!(
                "a JWT claims set must be a JSON object"
            ))),
        }
    }

    /// Serialize to the bytes carried as a JWS/JWE payload.
    pub fn to_bytes(&self) -> Result<Vec<u8>, JoseError> {
        serde_json::to_vec(&self.claims)
            .map_err(|err| JoseError::MalformedEncoding(anyhow::Error::from(err)))
    }

    pub fn issuer(&self) -> Option<&str> {
        self.string_claim("iss")
    }

    pub fn set_issuer(&mut self, iss: impl Into<String>) {
        self.claims.insert("iss".to_string(), Value::String(iss.into()));
    }

    pub fn subject(&self) -> Option<&str> {
        self.string_claim("sub")
    }

    pub fn set_subject(&mut self, sub: impl Into<String>) {
        self.claims.insert("sub".to_string(), Value::String(sub.into()));
    }

    /// `aud` per RFC 7519 §4.1.3 may be a single string or an array of
    /// strings; both forms are normalized to a vector here.
    pub fn audience(&self) -> anyhow::Result<Option<Vec<&str>>> {
        match self.claims.get("aud") {
            Some(Value::String(val)) => Ok(Some(vec![val.as_str()])),
            Some(Value::Array(vals)) => {
                let mut out = Vec::with_capacity(vals.len());
                for val in vals {
                    match val {
                        Value::String(val) => out.push(val.as_str()),
                        _ => bail!("entries of \"aud\" must be strings"),
                    }
                }
                Ok(Some(out))
            }
            Some(val) => bail!("\"aud\" must be a string or array of strings, found {:?}", val),
            None => Ok(None),
        }
    }

    /// Sets `aud` as a single string when `aud` has one entry, or a
    /// JSON array otherwise, matching the common wire convention.
    pub fn set_audience(&mut self, aud: &[&str]) {
        let value = match aud {
            [single] => Value::String((*single).to_string()),
            many => Value::Array(many.iter().map(|a| Value::String((*a).to_string())).collect()),
        };
        self.claims.insert("aud".to_string(), value);
    }

    /// `exp` as a RFC 7519 NumericDate: seconds since the Unix epoch.
    pub fn expires_at(&self) -> anyhow::Result<Option<i64>> {
        self.numeric_date_claim("exp")
    }

    pub fn set_expires_at(&mut self, exp: i64) {
        self.set_numeric_date("exp", exp);
    }

    pub fn not_before(&self) -> anyhow::Result<Option<i64>> {
        self.numeric_date_claim("nbf")
    }

    pub fn set_not_before(&mut self, nbf: i64) {
        self.set_numeric_date("nbf", nbf);
    }

    pub fn issued_at(&self) -> anyhow::Result<Option<i64>> {
        self.numeric_date_claim("iat")
    }

    pub fn set_issued_at(&mut self, iat: i64) {
        self.set_numeric_date("iat", iat);
    }

    pub fn jwt_id(&self) -> Option<&str> {
        self.string_claim("jti")
    }

    pub fn set_jwt_id(&mut self, jti: impl Into<String>) {
        self.claims.insert("jti".to_string(), Value::String(jti.into()));
    }

    /// Any claim by name, registered or not.
    pub fn claim(&self, name: &str) -> Option<&Value> {
        self.claims.get(name)
    }

    /// Set, or remove when `value` is `None`, an arbitrary claim.
    pub fn set_claim(&mut self, name: &str, value: Option<Value>) {
        match value {
            Some(value) => {
                self.claims.insert(name.to_string(), value);
            }
            None => {
                self.claims.remove(name);
            }
        }
    }

    pub fn claims_set(&self) -> &Map<String, Value> {
        &self.claims
    }

    fn string_claim(&self, name: &str) -> Option<&str> {
        match self.claims.get(name) {
            Some(Value::String(val)) => Some(val.as_str()),
            _ => None,
        }
    }

    fn numeric_date_claim(&self, name: &str) -> anyhow::Result<Option<i64>> {
        match self.claims.get(name) {
            Some(Value::Number(val)) => match val.as_i64() {
                Some(val) => Ok(Some(val)),
                None => bail!("\"{}\" NumericDate overflowed an i64", name),
            },
            Some(val) => bail!("\"{}\" must be a NumericDate, found {:?}", name, val),
            None => Ok(None),
        }
    }

    fn set_numeric_date(&mut self, name: &str, value: i64) {
        self.claims.insert(name.to_string(), Value::Number(Number::from(value)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn round_trips_registered_and_unknown_claims() {
        let mut claims = JwtClaimsSet::new();
        claims.set_issuer("issuer");
        claims.set_subject("1234567890");
        claims.set_audience(&["service-a"]);
        claims.set_expires_at(1_516_239_022);
        claims.set_claim("name", Some(json!("John Doe")));

        let bytes = claims.to_bytes().unwrap();
        let parsed = JwtClaimsSet::from_bytes(&bytes).unwrap();

        assert_eq!(parsed.issuer(), Some("issuer"));
        assert_eq!(parsed.subject(), Some("1234567890"));
        assert_eq!(parsed.audience().unwrap(), Some(vec!["service-a"]));
        assert_eq!(parsed.expires_at().unwrap(), Some(1_516_239_022));
        assert_eq!(parsed.claim("name"), Some(&json!("John Doe")));
    }

    #[test]
    fn audience_accepts_array_form() {
        let mut claims = JwtClaimsSet::new();
        claims.set_claim("aud", Some(json!(["a", "b"])));
        assert_eq!(claims.audience().unwrap(), Some(vec!["a", "b"]));
    }

    #[test]
    fn rejects_non_object_payload() {
        assert!(JwtClaimsSet::from_bytes(b"\"not an object\"").is_err());
    }
}
