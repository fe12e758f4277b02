//! The closed error taxonomy returned by every public entry point.
//!
//! Internal code builds up context with `anyhow::bail!` inside a private
//! closure and maps the resulting `anyhow::Error` to one of these variants
//! at the public API boundary. Cryptographic verification failures are
//! always collapsed to [`JoseError::SignatureInvalid`] or
//! [`JoseError::DecryptionFailed`] before they leave the crate, so that a
//! caller can never distinguish a padding failure from a MAC failure, or a
//! bad signature from a malformed key, through the error type alone.

use thiserror::Error;

/// Alias for a `Result` with the error type [`JoseError`].
pub type JoseResult<T> = Result<T, JoseError>;

#[derive(Debug, Error)]
pub enum JoseError {
    /// Segment count wrong, base64url invalid, JSON invalid, or a header
    /// field has the wrong JSON type.
    #[error("Malformed encoding: {0}")]
    MalformedEncoding(#[source] anyhow::Error),

    /// `alg` or `enc` is not recognized, or is disabled by policy
    /// (e.g. `none` without `allow_none`, or RSA1_5 without `allow_rsa1_5`).
    #[error("Unsupported algorithm: {0}")]
    UnsupportedAlgorithm(#[source] anyhow::Error),

    /// `enc` names a content encryption method this build does not implement.
    #[error("Unsupported encryption method: {0}")]
    UnsupportedEncryption(#[source] anyhow::Error),

    /// `crit` names a header parameter this implementation does not
    /// understand.
    #[error("Unsupported critical header parameter: {0}")]
    UnsupportedCritical(#[source] anyhow::Error),

    /// The supplied key material does not match what `alg` requires
    /// (e.g. an RSA key presented for ES256, or an EC key on the wrong
    /// curve).
    #[error("Key type mismatch: {0}")]
    KeyTypeMismatch(#[source] anyhow::Error),

    /// A symmetric key is shorter than `alg` requires, or an RSA modulus
    /// is smaller than the minimum bit length.
    #[error("Invalid key length: {0}")]
    InvalidKeyLength(#[source] anyhow::Error),

    /// JWS signature verification failed. Never distinguishes *why*.
    #[error("Signature verification failed")]
    SignatureInvalid,

    /// JWE authentication-tag check or key unwrap failed. Never
    /// distinguishes *why* (collapses padding errors, MAC errors, and
    /// unwrap integrity-check failures into one kind).
    #[error("Decryption failed")]
    DecryptionFailed,

    /// PBES2 salt shorter than the 8-byte minimum.
    #[error("Invalid PBES2 salt: {0}")]
    InvalidSalt(#[source] anyhow::Error),

    /// PBES2/PBKDF2 iteration count is zero, or otherwise structurally
    /// invalid (distinct from the policy bound, see
    /// [`JoseError::IterationPolicyExceeded`]).
    #[error("Invalid iteration count: {0}")]
    InvalidIterationCount(#[source] anyhow::Error),

    /// `p2c` falls outside the configured
    /// `[min_pbes2_iterations, max_pbes2_iterations]` window.
    #[error("PBES2 iteration count outside policy bounds: {0}")]
    IterationPolicyExceeded(#[source] anyhow::Error),

    /// Decompressing a `zip: DEF` payload would exceed the configured
    /// size ceiling.
    #[error("Decompressed payload exceeds the configured size limit")]
    CompressionExpansionLimit,

    /// The host cryptography provider failed for a reason not
    /// attributable to caller input (allocation failure, provider bug).
    #[error("Cryptography provider error: {0}")]
    ProviderError(#[source] anyhow::Error),
}

impl JoseError {
    pub(crate) fn from_anyhow_malformed(err: anyhow::Error) -> Self {
        match err.downcast::<JoseError>() {
            Ok(err) => err,
            Err(err) => JoseError::MalformedEncoding(err),
        }
    }

    pub(crate) fn from_anyhow_key(err: anyhow::Error) -> Self {
        match err.downcast::<JoseError>() {
            Ok(err) => err,
            Err(err) => JoseError::KeyTypeMismatch(err),
        }
    }

    pub(crate) fn from_anyhow_provider(err: anyhow::Error) -> Self {
        match err.downcast::<JoseError>() {
            Ok(err) => err,
            Err(err) => JoseError::ProviderError(err),
        }
    }
}

impl From<openssl::error::ErrorStack> for JoseError {
    fn from(err: openssl::error::ErrorStack) -> Self {
        JoseError::ProviderError(anyhow::Error::from(err))
    }
}
