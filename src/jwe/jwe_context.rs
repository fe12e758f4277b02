//! The JWE orchestration engine (spec §4.3/§4.4): assembles and
//! disassembles the 5-segment compact serialization, dispatching to
//! the key-management algorithm named by `alg`, the content-encryption
//! method named by `enc`, and the optional `zip` compression stage.

use crate::config::JoseConfig;
use crate::error::JoseError;
use crate::jwe::enc::{aescbc_hmac::AesCbcHmacJweEncryption, aesgcm::AesGcmJweEncryption};
use crate::jwe::jwe_algorithm::{JweAlgorithm, JweDecrypter, JweEncrypter};
use crate::jwe::jwe_compression::JweCompression;
use crate::jwe::jwe_content_encryption::JweContentEncryption;
use crate::jwe::jwe_header::JweHeader;
use crate::jwe::zip::deflate::DEF;
use crate::util;

/// A stateless engine over the JWE compact serialization. Thread-safe;
/// holds only an immutable policy [`JoseConfig`] (spec §5: "an
/// explicitly configured provider handle, not global mutable state").
#[derive(Debug, Clone, Default)]
pub struct JweContext {
    config: JoseConfig,
}

impl JweContext {
    pub fn new() -> Self {
        JweContext { config: JoseConfig::default() }
    }

    pub fn with_config(config: JoseConfig) -> Self {
        JweContext { config }
    }

    pub fn config(&self) -> &JoseConfig {
        &self.config
    }

    pub fn serialize_compact(
        &self,
        payload: &[u8],
        header: &JweHeader,
        encrypter: &dyn JweEncrypter,
    ) -> Result<String, JoseError> {
        self.encrypt_with(header.clone(), payload, encrypter)
    }

    pub fn serialize_compact_with_selector<'a, F>(
        &self,
        payload: &[u8],
        header: &JweHeader,
        selector: F,
    ) -> Result<String, JoseError>
    where
        F: Fn(&JweHeader) -> Option<&'a dyn JweEncrypter>,
    {
        let encrypter = selector(header).ok_or_else(|| {
            JoseError::UnsupportedAlgorithm(anyhow::anyhow!("the selector returned no encrypter for this header"))
        })?;
        self.encrypt_with(header.clone(), payload, encrypter)
    }

    fn encrypt_with(
        &self,
        mut header: JweHeader,
        payload: &[u8],
        encrypter: &dyn JweEncrypter,
    ) -> Result<String, JoseError> {
        header.set_algorithm(encrypter.algorithm().name());
        if let Some(kid) = encrypter.key_id() {
            header.set_key_id(kid);
        }

        let enc_name = header.content_encryption().ok_or_else(|| {
            JoseError::MalformedEncoding(anyhow::anyhow!("the \"enc\" header claim must be set before encrypting"))
        })?.to_string();
        let content_enc = content_encryption_by_name(&enc_name)?;

        let (cek, encrypted_key) = encrypter.encrypt(&mut header, content_enc.key_len())?;

        let plaintext = match header.compression() {
            Some(zip_name) => {
                let compression = compression_by_name(zip_name)?;
                compression.compress(payload)?
            }
            None => payload.to_vec(),
        };

        let protected_b64 = header.to_base64()?;
        let aad = protected_b64.as_bytes();

        let iv = util::rand_bytes(content_enc.iv_len());
        let (ciphertext, tag) = content_enc.encrypt(&cek, &iv, aad, &plaintext)?;

        let encrypted_key_b64 = match encrypted_key {
            Some(bytes) => util::encode_base64_urlsafe_nopad(&bytes),
            None => String::new(),
        };

        Ok(format!(
            "{}.{}.{}.{}.{}",
            protected_b64,
            encrypted_key_b64,
            util::encode_base64_urlsafe_nopad(&iv),
            util::encode_base64_urlsafe_nopad(&ciphertext),
            util::encode_base64_urlsafe_nopad(&tag),
        ))
    }

    pub fn deserialize_compact(
        &self,
        input: &str,
        decrypter: &dyn JweDecrypter,
    ) -> Result<(Vec<u8>, JweHeader), JoseError> {
        let (header, cek_input, parts) = self.parse_compact(input)?;

        match header.algorithm() {
            Some(alg) if alg == decrypter.algorithm().name() => {}
            _ => {
                return Err(JoseError::UnsupportedAlgorithm(anyhow::anyhow!(
                    "the decrypter's algorithm does not match the \"alg\" header claim"
                )))
            }
        }

        self.decrypt_with(&header, cek_input.as_deref(), &parts, decrypter)
    }

    pub fn deserialize_compact_with_selector<'a, F>(
        &self,
        input: &str,
        selector: F,
    ) -> Result<(Vec<u8>, JweHeader), JoseError>
    where
        F: Fn(&JweHeader) -> Result<Option<&'a dyn JweDecrypter>, JoseError>,
    {
        let (header, cek_input, parts) = self.parse_compact(input)?;
        let decrypter = selector(&header)?.ok_or_else(|| {
            JoseError::UnsupportedAlgorithm(anyhow::anyhow!("the selector returned no decrypter for this header"))
        })?;
        self.decrypt_with(&header, cek_input.as_deref(), &parts, decrypter)
    }

    fn parse_compact<'s>(
        &self,
        input: &'s str,
    ) -> Result<(JweHeader, Option<Vec<u8>>, [&'s str; 5]), JoseError> {
        let segments: Vec<&str> = input.split('.').collect();
        if segments.len() != 5 {
            return Err(JoseError::MalformedEncoding(anyhow::anyhow!(
                "a JWE compact serialization must have 5 segments, found {}",
                segments.len()
            )));
        }
        let parts = [segments[0], segments[1], segments[2], segments[3], segments[4]];

        let header = JweHeader::from_segment(parts[0])?;
        let cek_input = if parts[1].is_empty() {
            None
        } else {
            Some(util::decode_base64_urlsafe_nopad(parts[1])?)
        };

        Ok((header, cek_input, parts))
    }

    fn decrypt_with(
        &self,
        header: &JweHeader,
        encrypted_key: Option<&[u8]>,
        parts: &[&str; 5],
        decrypter: &dyn JweDecrypter,
    ) -> Result<(Vec<u8>, JweHeader), JoseError> {
        let enc_name = header.content_encryption().ok_or_else(|| {
            JoseError::UnsupportedEncryption(anyhow::anyhow!("the \"enc\" header claim is required"))
        })?;
        let content_enc = content_encryption_by_name(enc_name)?;

        let cek = decrypter.decrypt(header, encrypted_key, content_enc.key_len())?;

        let iv = util::decode_base64_urlsafe_nopad(parts[2])?;
        let ciphertext = util::decode_base64_urlsafe_nopad(parts[3])?;
        let tag = util::decode_base64_urlsafe_nopad(parts[4])?;
        let aad = parts[0].as_bytes();

        let plaintext = content_enc.decrypt(&cek, &iv, aad, &ciphertext, &tag)?;

        let payload = match header.compression() {
            Some(zip_name) => {
                let compression = compression_by_name(zip_name)?;
                compression.decompress(&plaintext, self.config.max_decompressed_size)?
            }
            None => plaintext,
        };

        Ok((payload, header.clone()))
    }
}

fn content_encryption_by_name(name: &str) -> Result<Box<dyn JweContentEncryption>, JoseError> {
    let enc: Box<dyn JweContentEncryption> = match name {
        "A128CBC-HS256" => Box::new(AesCbcHmacJweEncryption::A128CbcHs256),
        "A192CBC-HS384" => Box::new(AesCbcHmacJweEncryption::A192CbcHs384),
        "A256CBC-HS512" => Box::new(AesCbcHmacJweEncryption::A256CbcHs512),
        "A128GCM" => Box::new(AesGcmJweEncryption::A128Gcm),
        "A192GCM" => Box::new(AesGcmJweEncryption::A192Gcm),
        "A256GCM" => Box::new(AesGcmJweEncryption::A256Gcm),
        other => {
            return Err(JoseError::UnsupportedEncryption(anyhow::anyhow!(
                "unrecognized \"enc\" value: {}",
                other
            )))
        }
    };
    Ok(enc)
}

fn compression_by_name(name: &str) -> Result<Box<dyn JweCompression>, JoseError> {
    match name {
        "DEF" => Ok(Box::new(DEF)),
        other => Err(JoseError::UnsupportedAlgorithm(anyhow::anyhow!(
            "unrecognized \"zip\" value: {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use serde_json::Value;

    use super::*;
    use crate::header::JoseHeader;
    use crate::jwe::alg::direct::DIR;

    #[test]
    fn compact_round_trips_every_content_encryption() -> Result<()> {
        let context = JweContext::new();

        for enc in [
            "A128CBC-HS256",
            "A192CBC-HS384",
            "A256CBC-HS512",
            "A128GCM",
            "A192GCM",
            "A256GCM",
        ] {
            let mut src_header = JweHeader::new();
            src_header.set_content_encryption(enc);
            src_header.set_token_type("JWT");
            let src_payload = b"test payload!";

            let key = match enc {
                "A128CBC-HS256" => util::rand_bytes(32),
                "A192CBC-HS384" => util::rand_bytes(48),
                "A256CBC-HS512" => util::rand_bytes(64),
                "A128GCM" => util::rand_bytes(16),
                "A192GCM" => util::rand_bytes(24),
                "A256GCM" => util::rand_bytes(32),
                _ => unreachable!(),
            };

            let encrypter = DIR.encrypter_from_bytes(&key)?;
            let jwe = context.serialize_compact(src_payload, &src_header, &encrypter)?;

            let decrypter = DIR.decrypter_from_bytes(&key)?;
            let (dst_payload, dst_header) = context.deserialize_compact(&jwe, &decrypter)?;

            src_header.set_claim("alg", Some(Value::String(DIR.name().to_string())))?;
            assert_eq!(src_header, dst_header);
            assert_eq!(src_payload.to_vec(), dst_payload);
        }

        Ok(())
    }

    #[test]
    fn compression_round_trips() -> Result<()> {
        let context = JweContext::new();
        let key = util::rand_bytes(32);

        let mut header = JweHeader::new();
        header.set_content_encryption("A256GCM");
        header.set_compression("DEF");
        let payload = b"the quick brown fox jumps over the lazy dog".repeat(50);

        let encrypter = DIR.encrypter_from_bytes(&key)?;
        let jwe = context.serialize_compact(&payload, &header, &encrypter)?;

        let decrypter = DIR.decrypter_from_bytes(&key)?;
        let (recovered, _) = context.deserialize_compact(&jwe, &decrypter)?;
        assert_eq!(recovered, payload);

        Ok(())
    }

    #[test]
    fn mismatched_algorithm_is_rejected() -> Result<()> {
        let context = JweContext::new();
        let key = util::rand_bytes(32);

        let mut header = JweHeader::new();
        header.set_content_encryption("A256GCM");
        let encrypter = DIR.encrypter_from_bytes(&key)?;
        let jwe = context.serialize_compact(b"hello", &header, &encrypter)?;

        let wrong_key = util::rand_bytes(16);
        let wrong_decrypter =
            crate::jwe::alg::aeskw::AeskwJweAlgorithm::A128kw.decrypter_from_bytes(&wrong_key)?;
        assert!(context.deserialize_compact(&jwe, &wrong_decrypter).is_err());

        Ok(())
    }

    #[test]
    fn malformed_segment_count_is_rejected() {
        let context = JweContext::new();
        let key = util::rand_bytes(32);
        let decrypter = DIR.decrypter_from_bytes(&key).unwrap();
        assert!(context.deserialize_compact("a.b.c", &decrypter).is_err());
    }
}
