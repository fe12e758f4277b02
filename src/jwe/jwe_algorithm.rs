//! The capability traits a concrete key-management algorithm family
//! (`alg::direct`, `alg::rsaes`, ...) implements (spec §4.4.1).

use std::borrow::Cow;

use crate::error::JoseError;
use crate::jwe::jwe_header::JweHeader;
use crate::jwk::Jwk;

/// A JWE key-management algorithm family, e.g. `dir` or `ECDH-ES+A128KW`.
pub trait JweAlgorithm {
    /// The `alg` header parameter value.
    fn name(&self) -> &str;
}

pub trait JweEncrypter {
    fn algorithm(&self) -> &dyn JweAlgorithm;

    fn key_id(&self) -> Option<&str>;

    /// Produce the CEK and, if this algorithm wraps it, the encrypted
    /// key segment. `key_len` is the CEK length `enc` requires. May
    /// write algorithm-specific parameters (`epk`, `p2s`, `p2c`, `iv`,
    /// `tag`) into `header`.
    ///
    /// Returns `(cek, encrypted_key)`; `encrypted_key` is `None` for
    /// `dir` and the ECDH-ES direct variant, whose encrypted-key
    /// segment is empty.
    fn encrypt(
        &self,
        header: &mut JweHeader,
        key_len: usize,
    ) -> Result<(Cow<[u8]>, Option<Vec<u8>>), JoseError>;
}

pub trait JweDecrypter {
    fn algorithm(&self) -> &dyn JweAlgorithm;

    fn key_id(&self) -> Option<&str>;

    /// Recover the CEK from `encrypted_key` (or, for `dir`/ECDH-ES
    /// direct, derive it without one) given the algorithm parameters
    /// recorded in `header`.
    fn decrypt(
        &self,
        header: &JweHeader,
        encrypted_key: Option<&[u8]>,
        key_len: usize,
    ) -> Result<Cow<[u8]>, JoseError>;
}

/// Helper shared by the `_from_jwk` constructors: confirm a symmetric
/// JWK is usable for key-wrapping/derivation before extracting `k`.
pub(crate) fn check_oct_jwk_for_key_management(jwk: &Jwk, expected_alg: &str) -> anyhow::Result<()> {
    use anyhow::bail;

    if jwk.key_type() != "oct" {
        bail!("a {} key must have kty=oct, found {}", expected_alg, jwk.key_type());
    }
    if let Some(use_) = jwk.key_use() {
        if use_ != "enc" {
            bail!("a {} key's \"use\" must be enc, found {}", expected_alg, use_);
        }
    }
    if let Some(jwk_alg) = jwk.algorithm() {
        if jwk_alg != expected_alg {
            bail!("JWK alg {} does not match {}", jwk_alg, expected_alg);
        }
    }
    Ok(())
}
