//! The optional `zip` compression stage applied to the plaintext before
//! content encryption (spec §4.4.3).

use crate::error::JoseError;

pub trait JweCompression {
    /// The `zip` header parameter value, e.g. `"DEF"`.
    fn name(&self) -> &str;

    fn compress(&self, data: &[u8]) -> Result<Vec<u8>, JoseError>;

    /// Inflate `data`, refusing to produce more than `max_size` bytes
    /// (spec §4.4.3: the implementer must bound the inflated size to
    /// defeat compression bombs).
    fn decompress(&self, data: &[u8], max_size: usize) -> Result<Vec<u8>, JoseError>;
}
