//! `zip: DEF` — raw DEFLATE (RFC 1951), bounded on inflate to defeat
//! compression bombs.

use std::io::{Read, Write};

use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use flate2::Compression;

use crate::error::JoseError;
use crate::jwe::jwe_compression::JweCompression;

#[derive(Debug, Eq, PartialEq, Copy, Clone)]
pub struct DeflateJweCompression;

pub const DEF: DeflateJweCompression = DeflateJweCompression;

impl JweCompression for DeflateJweCompression {
    fn name(&self) -> &str {
        "DEF"
    }

    fn compress(&self, data: &[u8]) -> Result<Vec<u8>, JoseError> {
        let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).map_err(|err| JoseError::ProviderError(anyhow::Error::from(err)))?;
        encoder
            .finish()
            .map_err(|err| JoseError::ProviderError(anyhow::Error::from(err)))
    }

    fn decompress(&self, data: &[u8], max_size: usize) -> Result<Vec<u8>, JoseError> {
        let mut decoder = DeflateDecoder::new(data);
        let mut out = Vec::new();
        let mut chunk = [0u8; 8192];
        loop {
            let read = decoder
                .read(&mut chunk)
                .map_err(|err| JoseError::ProviderError(anyhow::Error::from(err)))?;
            if read == 0 {
                break;
            }
            out.extend_from_slice(&chunk[..read]);
            if out.len() > max_size {
                return Err(JoseError::CompressionExpansionLimit);
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips() {
        let data = b"the quick brown fox jumps over the lazy dog".repeat(20);
        let compressed = DEF.compress(&data).unwrap();
        let decompressed = DEF.decompress(&compressed, 10_000).unwrap();
        assert_eq!(decompressed, data);
    }

    #[test]
    fn enforces_decompressed_size_ceiling() {
        let data = vec![0u8; 1_000_000];
        let compressed = DEF.compress(&data).unwrap();
        assert!(DEF.decompress(&compressed, 1_000).is_err());
    }
}
