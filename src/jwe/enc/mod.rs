//! One module per content-encryption family selected by `enc`.

pub mod aescbc_hmac;
pub mod aesgcm;
