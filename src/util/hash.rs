//! The hash-algorithm wrapper shared by HMAC-based JWS and the PBES2/
//! Concat-KDF derivations.

use openssl::hash::{Hasher, MessageDigest};

use crate::error::JoseError;

#[derive(Debug, Eq, PartialEq, Copy, Clone)]
pub enum HashAlgorithm {
    Sha256,
    Sha384,
    Sha512,
}

impl HashAlgorithm {
    pub fn name(&self) -> &str {
        match self {
            Self::Sha256 => "SHA-256",
            Self::Sha384 => "SHA-384",
            Self::Sha512 => "SHA-512",
        }
    }

    pub fn message_digest(&self) -> MessageDigest {
        match self {
            Self::Sha256 => MessageDigest::sha256(),
            Self::Sha384 => MessageDigest::sha384(),
            Self::Sha512 => MessageDigest::sha512(),
        }
    }

    pub fn output_len(&self) -> usize {
        match self {
            Self::Sha256 => 32,
            Self::Sha384 => 48,
            Self::Sha512 => 64,
        }
    }

    pub fn digest(&self, input: &[u8]) -> Result<Vec<u8>, JoseError> {
        let mut hasher = Hasher::new(self.message_digest())?;
        hasher.update(input)?;
        Ok(hasher.finish()?.to_vec())
    }
}

/// Compute `HMAC(key, message)` using the given hash as the underlying
/// primitive.
pub fn hmac(hash: HashAlgorithm, key: &[u8], message: &[u8]) -> Result<Vec<u8>, JoseError> {
    use openssl::pkey::PKey;
    use openssl::sign::Signer;

    let pkey = PKey::hmac(key)?;
    let mut signer = Signer::new(hash.message_digest(), &pkey)?;
    signer.update(message)?;
    Ok(signer.sign_to_vec()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hmac_sha256_output_length() {
        let mac = hmac(HashAlgorithm::Sha256, b"key", b"message").unwrap();
        assert_eq!(mac.len(), HashAlgorithm::Sha256.output_len());
    }
}
