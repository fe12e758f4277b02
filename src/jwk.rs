//! JSON Web Key parsing (RFC 7517).
//!
//! This module only understands the wire format well enough to hand key
//! material to the JWS/JWE algorithm builders (`signer_from_jwk`,
//! `encrypter_from_jwk`, ...). Fetching JWK *sets* from a `jku`, caching,
//! or rotation policy are external-collaborator concerns (spec §1) and
//! live outside this crate.

use anyhow::bail;
use serde_json::{Map, Value};

use crate::error::JoseError;
use crate::util;

/// A single JSON Web Key.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Jwk {
    params: Map<String, Value>,
}

impl Jwk {
    /// Build an empty key of the given `kty` (`oct`, `RSA`, `EC`, `OKP`).
    pub fn new(kty: &str) -> Self {
        let mut params = Map::new();
        params.insert("kty".to_string(), Value::String(kty.to_string()));
        Jwk { params }
    }

    pub fn from_map(params: Map<String, Value>) -> Result<Self, JoseError> {
        if !matches!(params.get("kty"), Some(Value::String(_))) {
            return Err(JoseError::MalformedEncoding(anyhow::anyhow!(
                "a JWK must carry a string \"kty\" parameter"
            )));
        }
        Ok(Jwk { params })
    }

    pub fn from_bytes(input: impl AsRef<[u8]>) -> Result<Self, JoseError> {
        let value: Value = serde_json::from_slice(input.as_ref())
            .map_err(|err| JoseError::MalformedEncoding(anyhow::Error::from(err)))?;
        match value {
            Value::Object(map) => Self::from_map(map),
            _ => Err(JoseError::MalformedEncoding(anyhow::anyhow!(
                "a JWK must be a JSON object"
            ))),
        }
    }

    /// The `kty` parameter: `oct`, `RSA`, `EC`, or `OKP`.
    pub fn key_type(&self) -> &str {
        match self.params.get("kty") {
            Some(Value::String(val)) => val,
            _ => unreachable!("constructors enforce a string kty"),
        }
    }

    /// The `use` parameter (`sig` or `enc`), if present.
    pub fn key_use(&self) -> Option<&str> {
        match self.params.get("use") {
            Some(Value::String(val)) => Some(val),
            _ => None,
        }
    }

    pub fn set_key_use(&mut self, key_use: &str) {
        self.params.insert("use".to_string(), Value::String(key_use.to_string()));
    }

    /// The `key_ops` parameter.
    pub fn key_operations(&self) -> Option<Vec<&str>> {
        match self.params.get("key_ops") {
            Some(Value::Array(vals)) => Some(
                vals.iter()
                    .filter_map(|v| v.as_str())
                    .collect(),
            ),
            _ => None,
        }
    }

    pub fn is_for_key_operation(&self, operation: &str) -> bool {
        match self.key_operations() {
            Some(ops) => ops.iter().any(|op| *op == operation),
            None => true,
        }
    }

    /// The `alg` parameter, if present.
    pub fn algorithm(&self) -> Option<&str> {
        match self.params.get("alg") {
            Some(Value::String(val)) => Some(val),
            _ => None,
        }
    }

    /// The `kid` parameter, if present.
    pub fn key_id(&self) -> Option<&str> {
        match self.params.get("kid") {
            Some(Value::String(val)) => Some(val),
            _ => None,
        }
    }

    /// An arbitrary JWK member by name.
    pub fn parameter(&self, name: &str) -> Option<&Value> {
        self.params.get(name)
    }

    pub fn set_parameter(&mut self, name: &str, value: Option<Value>) -> Result<(), JoseError> {
        match value {
            Some(value) => {
                self.params.insert(name.to_string(), value);
            }
            None => {
                self.params.remove(name);
            }
        }
        Ok(())
    }

    /// Decode a base64url-encoded byte-string member (`k`, `x`, `y`, `d`, ...).
    pub fn parameter_bytes(&self, name: &str) -> anyhow::Result<Vec<u8>> {
        match self.params.get(name) {
            Some(Value::String(val)) => {
                Ok(util::decode_base64_urlsafe_nopad(val).map_err(anyhow::Error::from)?)
            }
            Some(val) => bail!("the \"{}\" JWK parameter must be a string, found {:?}", name, val),
            None => bail!("the \"{}\" JWK parameter is required", name),
        }
    }

    pub fn curve(&self) -> Option<&str> {
        match self.params.get("crv") {
            Some(Value::String(val)) => Some(val),
            _ => None,
        }
    }
}
