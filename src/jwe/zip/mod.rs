//! JWE `zip` compression algorithms.

pub mod deflate;
