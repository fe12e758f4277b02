//! One module per JWS signing algorithm family, each exposing an
//! alg-selector enum plus its `Signer`/`Verifier` pair.

pub mod ecdsa;
pub mod eddsa;
pub mod hmac;
pub mod rsassa;
pub mod rsassa_pss;
