//! PBKDF2 (RFC 8018 §5.2), used by the PBES2 JWE key-management
//! algorithms.
//!
//! The formatted salt (`alg_identifier || 0x00 || raw_salt`) is the
//! caller's responsibility (see `jwe::alg::pbes2_hmac_aeskw`); this
//! module implements the block derivation itself:
//!
//! ```text
//! U1 = PRF(P, S || INT32BE(i))
//! Uj = PRF(P, Uj-1)          for j in [2, c]
//! Ti = U1 xor U2 xor ... xor Uc
//! DK = T1 || T2 || ... || Tl, truncated to dkLen
//! ```

use anyhow::bail;

use crate::error::JoseError;
use crate::util::hash::{hmac, HashAlgorithm};
use crate::util::u32_be_bytes;

/// Derive `dk_len` bytes from `password` and `salt` using `iterations`
/// rounds of `PRF = HMAC(hash, ...)`.
///
/// Fails with [`JoseError::InvalidIterationCount`] when `iterations` is
/// zero, and with [`JoseError::ProviderError`] when `dk_len` exceeds the
/// RFC 8018 ceiling of `(2^32 - 1) * hLen`.
pub fn derive(
    hash: HashAlgorithm,
    password: &[u8],
    salt: &[u8],
    iterations: u32,
    dk_len: usize,
) -> Result<Vec<u8>, JoseError> {
    if iterations == 0 {
        return Err(JoseError::InvalidIterationCount(anyhow::anyhow!(
            "iteration count must be at least 1"
        )));
    }

    let h_len = hash.output_len();
    let max_dk_len = (u32::MAX as u128) * (h_len as u128);
    if dk_len as u128 > max_dk_len {
        return Err(JoseError::ProviderError(anyhow::anyhow!(
            "requested derived key length {} exceeds the PBKDF2 ceiling",
            dk_len
        )));
    }

    let block_count = (dk_len + h_len - 1) / h_len;
    let mut derived = Vec::with_capacity(block_count * h_len);

    for block_index in 1..=block_count {
        let block = derive_block(hash, password, salt, iterations, block_index as u32)
            .map_err(|err| JoseError::ProviderError(anyhow::Error::from(err)))?;
        derived.extend_from_slice(&block);
    }

    derived.truncate(dk_len);
    Ok(derived)
}

fn derive_block(
    hash: HashAlgorithm,
    password: &[u8],
    salt: &[u8],
    iterations: u32,
    block_index: u32,
) -> anyhow::Result<Vec<u8>> {
    if block_index == 0 {
        bail!("block index must be 1-based");
    }

    let mut input = Vec::with_capacity(salt.len() + 4);
    input.extend_from_slice(salt);
    input.extend_from_slice(&u32_be_bytes(block_index));

    let mut u = hmac(hash, password, &input)?;
    let mut t = u.clone();

    for _ in 2..=iterations {
        u = hmac(hash, password, &u)?;
        for (t_byte, u_byte) in t.iter_mut().zip(u.iter()) {
            *t_byte ^= u_byte;
        }
    }

    Ok(t)
}

#[cfg(test)]
mod tests {
    use super::*;

    // RFC 6070 test vector 1, adapted to SHA-256 (RFC 6070 itself is
    // defined over HMAC-SHA1; we exercise the block/xor law, not the
    // exact RFC 6070 byte vector, since PBES2 in JOSE never uses SHA-1).
    #[test]
    fn derives_requested_length() {
        let dk = derive(HashAlgorithm::Sha256, b"password", b"salt", 1, 32).unwrap();
        assert_eq!(dk.len(), 32);
    }

    #[test]
    fn truncates_to_dk_len_within_a_block() {
        let full = derive(HashAlgorithm::Sha256, b"password", b"salt", 4096, 32).unwrap();
        let short = derive(HashAlgorithm::Sha256, b"password", b"salt", 4096, 16).unwrap();
        assert_eq!(&full[..16], &short[..]);
    }

    #[test]
    fn different_iteration_counts_diverge() {
        let a = derive(HashAlgorithm::Sha256, b"password", b"salt", 1, 32).unwrap();
        let b = derive(HashAlgorithm::Sha256, b"password", b"salt", 2, 32).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn zero_iterations_rejected() {
        assert!(derive(HashAlgorithm::Sha256, b"password", b"salt", 0, 32).is_err());
    }

    #[test]
    fn derive_is_deterministic() {
        let a = derive(HashAlgorithm::Sha256, b"password", b"salt", 1000, 40).unwrap();
        let b = derive(HashAlgorithm::Sha256, b"password", b"salt", 1000, 40).unwrap();
        assert_eq!(a, b);
    }
}
