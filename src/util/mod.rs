//! Byte primitives: base64url codec, constant-time comparison,
//! concatenation, and the hash/HMAC wrapper over the host crypto
//! provider.

pub mod hash;
pub mod pbkdf2;

use anyhow::bail;
use openssl::rand::rand_bytes as openssl_rand_bytes;

use crate::error::JoseError;

pub use hash::HashAlgorithm;

/// Encode `input` as unpadded, URL-safe base64 (RFC 4648 §5).
pub fn encode_base64_urlsafe_nopad(input: impl AsRef<[u8]>) -> String {
    base64::encode_config(input, base64::URL_SAFE_NO_PAD)
}

/// Decode unpadded, URL-safe base64.
///
/// Fails with [`JoseError::MalformedEncoding`] on any character outside
/// the alphabet or on an input whose length is `1 (mod 4)`.
pub fn decode_base64_urlsafe_nopad(input: impl AsRef<[u8]>) -> Result<Vec<u8>, JoseError> {
    let input = input.as_ref();
    if input.len() % 4 == 1 {
        return Err(JoseError::MalformedEncoding(anyhow::anyhow!(
            "base64url input length must not be congruent to 1 modulo 4: {} bytes",
            input.len()
        )));
    }
    base64::decode_config(input, base64::URL_SAFE_NO_PAD)
        .map_err(|err| JoseError::MalformedEncoding(anyhow::Error::from(err)))
}

/// Fill a freshly allocated buffer of `len` bytes with bytes from the
/// host's cryptographically secure random source.
pub fn rand_bytes(len: usize) -> Vec<u8> {
    let mut buf = vec![0; len];
    openssl_rand_bytes(&mut buf).expect("the host RNG must not fail");
    buf
}

/// Concatenate any number of byte slices, silently skipping empty ones.
pub fn concat(parts: &[&[u8]]) -> Vec<u8> {
    let total: usize = parts.iter().map(|p| p.len()).sum();
    let mut out = Vec::with_capacity(total);
    for part in parts {
        if !part.is_empty() {
            out.extend_from_slice(part);
        }
    }
    out
}

/// Return `src[offset..offset + len]` as an owned `Vec<u8>`.
///
/// Panics on out-of-bounds access: per the data model, that is an
/// implementation bug, never a user-triggerable error.
pub fn sub_array(src: &[u8], offset: usize, len: usize) -> Vec<u8> {
    src[offset..offset + len].to_vec()
}

/// Compare two byte slices in constant time with respect to their
/// *content*. Unequal lengths are rejected up front (which is itself
/// observable, but carries no information about content, only about
/// caller-supplied framing that is already public).
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff: u8 = 0;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

/// Encode `value` as a 32-bit big-endian integer.
pub fn u32_be_bytes(value: u32) -> [u8; 4] {
    value.to_be_bytes()
}

/// Encode `value` (a bit count) as a 64-bit big-endian integer, as used
/// for the `AL` field of AES-CBC-HMAC authenticated encryption.
pub fn u64_be_bytes(value: u64) -> [u8; 8] {
    value.to_be_bytes()
}

pub(crate) fn parse_base64_field(
    obj: &serde_json::Map<String, serde_json::Value>,
    name: &str,
) -> anyhow::Result<Option<Vec<u8>>> {
    match obj.get(name) {
        Some(serde_json::Value::String(val)) => {
            Ok(Some(decode_base64_urlsafe_nopad(val).map_err(anyhow::Error::from)?))
        }
        Some(val) => bail!("the \"{}\" header claim must be a string, found {:?}", name, val),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base64url_roundtrip() {
        for input in [&b""[..], b"f", b"fo", b"foo", b"foob", b"fooba", b"foobar"] {
            let encoded = encode_base64_urlsafe_nopad(input);
            assert!(!encoded.contains('='));
            let decoded = decode_base64_urlsafe_nopad(&encoded).unwrap();
            assert_eq!(decoded, input);
        }
    }

    #[test]
    fn base64url_rejects_bad_length() {
        assert!(decode_base64_urlsafe_nopad("a").is_err());
        assert!(decode_base64_urlsafe_nopad("abcde").is_err());
    }

    #[test]
    fn base64url_rejects_bad_alphabet() {
        assert!(decode_base64_urlsafe_nopad("a+b/").is_err());
    }

    #[test]
    fn concat_skips_empty_segments() {
        let out = concat(&[b"a", b"", b"b"]);
        assert_eq!(out, b"ab");
    }

    #[test]
    fn constant_time_eq_matches_equality() {
        assert!(constant_time_eq(b"abc", b"abc"));
        assert!(!constant_time_eq(b"abc", b"abd"));
        assert!(!constant_time_eq(b"abc", b"ab"));
    }
}
