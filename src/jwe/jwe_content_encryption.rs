//! The content-encryption stage selected by the `enc` header claim
//! (spec §4.4.2).

use crate::error::JoseError;

pub trait JweContentEncryption {
    /// The `enc` header parameter value, e.g. `"A128GCM"`.
    fn name(&self) -> &str;

    /// Required CEK length in bytes.
    fn key_len(&self) -> usize;

    /// Required IV length in bytes (12 for GCM, 16 for CBC-HMAC).
    fn iv_len(&self) -> usize;

    /// Authenticated-encrypt `plaintext` under `key`/`iv` with `aad`
    /// bound in. Returns `(ciphertext, tag)`.
    fn encrypt(
        &self,
        key: &[u8],
        iv: &[u8],
        aad: &[u8],
        plaintext: &[u8],
    ) -> Result<(Vec<u8>, Vec<u8>), JoseError>;

    /// Verify `tag` over `aad || iv || ciphertext` (and, for CBC-HMAC,
    /// `AL`) before touching padding, then decrypt. Any authentication
    /// failure collapses to [`JoseError::DecryptionFailed`].
    fn decrypt(
        &self,
        key: &[u8],
        iv: &[u8],
        aad: &[u8],
        ciphertext: &[u8],
        tag: &[u8],
    ) -> Result<Vec<u8>, JoseError>;
}
