//! A JOSE (JSON Object Signing and Encryption) library: JWS, JWE, and
//! the JWT wrapper over compact serialization.
//!
//! The crate is layered bottom-up, each layer depending only on the
//! ones before it:
//!
//! - [`util`] — base64url codec, constant-time comparison, PBKDF2.
//! - [`header`] — the shared protected-header model and `alg`/`crit`
//!   classification.
//! - [`jwk`] — JSON Web Key parsing for key material input.
//! - [`jws`] — compact JWS signing and verification.
//! - [`jwe`] — compact JWE key management and content encryption.
//! - [`jwt`] — classifies a compact token as plain/signed/encrypted
//!   and exposes its claim set once verified or decrypted.
//!
//! Every public entry point returns [`JoseError`]; there are no
//! panics on malformed caller input, and no exceptions escape the host
//! cryptography provider unwrapped.

pub mod config;
pub mod error;
pub mod header;
pub mod jwe;
pub mod jwk;
pub mod jws;
pub mod jwt;
pub mod util;

pub use config::JoseConfig;
pub use error::{JoseError, JoseResult};
