//! JSON Web Encryption (JWE) (RFC 7516), compact serialization.

pub mod alg;
pub mod enc;
mod jwe_algorithm;
mod jwe_compression;
mod jwe_content_encryption;
mod jwe_context;
mod jwe_header;
pub mod zip;

use once_cell::sync::Lazy;

use crate::error::JoseError;

pub use jwe_algorithm::{JweAlgorithm, JweDecrypter, JweEncrypter};
pub use jwe_compression::JweCompression;
pub use jwe_content_encryption::JweContentEncryption;
pub use jwe_context::JweContext;
pub use jwe_header::JweHeader;

pub use alg::direct::DIR;

use alg::aesgcmkw::AesgcmkwJweAlgorithm;
pub use AesgcmkwJweAlgorithm::A128gcmkw as A128GCMKW;
pub use AesgcmkwJweAlgorithm::A192gcmkw as A192GCMKW;
pub use AesgcmkwJweAlgorithm::A256gcmkw as A256GCMKW;

use alg::aeskw::AeskwJweAlgorithm;
pub use AeskwJweAlgorithm::A128kw as A128KW;
pub use AeskwJweAlgorithm::A192kw as A192KW;
pub use AeskwJweAlgorithm::A256kw as A256KW;

use alg::ecdh_es::EcdhEsJweAlgorithm;
pub use EcdhEsJweAlgorithm::EcdhEs as ECDH_ES;
pub use EcdhEsJweAlgorithm::EcdhEsA128kw as ECDH_ES_A128KW;
pub use EcdhEsJweAlgorithm::EcdhEsA192kw as ECDH_ES_A192KW;
pub use EcdhEsJweAlgorithm::EcdhEsA256kw as ECDH_ES_A256KW;

use alg::pbes2_hmac_aeskw::Pbes2HmacAeskwJweAlgorithm;
pub use Pbes2HmacAeskwJweAlgorithm::Pbes2Hs256A128kw as PBES2_HS256_A128KW;
pub use Pbes2HmacAeskwJweAlgorithm::Pbes2Hs384A192kw as PBES2_HS384_A192KW;
pub use Pbes2HmacAeskwJweAlgorithm::Pbes2Hs512A256kw as PBES2_HS512_A256KW;

use alg::rsaes::RsaesJweAlgorithm;
#[allow(deprecated)]
pub use RsaesJweAlgorithm::Rsa1_5 as RSA1_5;
pub use RsaesJweAlgorithm::RsaOaep as RSA_OAEP;
pub use RsaesJweAlgorithm::RsaOaep256 as RSA_OAEP_256;

static DEFAULT_CONTEXT: Lazy<JweContext> = Lazy::new(JweContext::new);

/// Encrypt `payload` under `encrypter`, returning the 5-segment compact
/// serialization (spec §4.4).
pub fn serialize_compact(
    payload: &[u8],
    header: &JweHeader,
    encrypter: &dyn JweEncrypter,
) -> Result<String, JoseError> {
    DEFAULT_CONTEXT.serialize_compact(payload, header, encrypter)
}

/// As [`serialize_compact`], but the encrypter is chosen by `selector`
/// once the header is known (e.g. to pick a key by `kid`).
pub fn serialize_compact_with_selector<'a, F>(
    payload: &[u8],
    header: &JweHeader,
    selector: F,
) -> Result<String, JoseError>
where
    F: Fn(&JweHeader) -> Option<&'a dyn JweEncrypter>,
{
    DEFAULT_CONTEXT.serialize_compact_with_selector(payload, header, selector)
}

/// Decrypt a 5-segment compact serialization with `decrypter`.
pub fn deserialize_compact(
    input: &str,
    decrypter: &dyn JweDecrypter,
) -> Result<(Vec<u8>, JweHeader), JoseError> {
    DEFAULT_CONTEXT.deserialize_compact(input, decrypter)
}

/// As [`deserialize_compact`], but the decrypter is chosen by `selector`
/// once the protected header has been parsed.
pub fn deserialize_compact_with_selector<'a, F>(
    input: &str,
    selector: F,
) -> Result<(Vec<u8>, JweHeader), JoseError>
where
    F: Fn(&JweHeader) -> Result<Option<&'a dyn JweDecrypter>, JoseError>,
{
    DEFAULT_CONTEXT.deserialize_compact_with_selector(input, selector)
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use serde_json::Value;

    use super::*;
    use crate::header::JoseHeader;
    use crate::util;

    #[test]
    fn test_jwe_compact_serialization() -> Result<()> {
        for enc in ["A128CBC-HS256", "A256GCM"] {
            let mut src_header = JweHeader::new();
            src_header.set_content_encryption(enc);
            src_header.set_token_type("JWT");
            let src_payload = b"test payload!";

            let key = match enc {
                "A128CBC-HS256" => util::rand_bytes(32),
                "A256GCM" => util::rand_bytes(32),
                _ => unreachable!(),
            };

            let encrypter = DIR.encrypter_from_bytes(&key)?;
            let jwe = serialize_compact(src_payload, &src_header, &encrypter)?;

            let decrypter = DIR.decrypter_from_bytes(&key)?;
            let (dst_payload, dst_header) = deserialize_compact(&jwe, &decrypter)?;

            src_header.set_claim("alg", Some(Value::String(DIR.name().to_string())))?;
            assert_eq!(src_header, dst_header);
            assert_eq!(src_payload.to_vec(), dst_payload);
        }

        Ok(())
    }

    #[test]
    fn selector_picks_encrypter_and_decrypter_by_kid() -> Result<()> {
        let key_a = util::rand_bytes(32);
        let key_b = util::rand_bytes(32);

        let encrypter_a = DIR.encrypter_from_bytes(&key_a)?;
        let _encrypter_b = DIR.encrypter_from_bytes(&key_b)?;

        let mut header = JweHeader::new();
        header.set_content_encryption("A256GCM");

        let jwe = serialize_compact_with_selector(b"hi", &header, |_| Some(&encrypter_a as &dyn JweEncrypter))?;

        let decrypter_a = DIR.decrypter_from_bytes(&key_a)?;
        let (payload, _) = deserialize_compact_with_selector(&jwe, |_| Ok(Some(&decrypter_a as &dyn JweDecrypter)))?;
        assert_eq!(payload, b"hi".to_vec());

        Ok(())
    }
}
