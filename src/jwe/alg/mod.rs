//! JWE key-management algorithm families, selected by the `alg` header
//! claim (spec §4.4.1).

pub mod aesgcmkw;
pub mod aeskw;
pub mod direct;
pub mod ecdh_es;
pub mod pbes2_hmac_aeskw;
pub mod rsaes;
