//! A128CBC-HS256 / A192CBC-HS384 / A256CBC-HS512 (spec §4.4.2): the CEK
//! is split into a MAC half and an AES-CBC encryption half; the
//! authentication tag is the first half of an HMAC computed over
//! `AAD || IV || ciphertext || AL`, where `AL` is the AAD bit-length as
//! a 64-bit big-endian integer.

use openssl::symm::{Cipher, Crypter, Mode};

use crate::error::JoseError;
use crate::jwe::jwe_content_encryption::JweContentEncryption;
use crate::util;
use crate::util::hash::{hmac, HashAlgorithm};

#[derive(Debug, Eq, PartialEq, Copy, Clone)]
pub enum AesCbcHmacJweEncryption {
    A128CbcHs256,
    A192CbcHs384,
    A256CbcHs512,
}

impl AesCbcHmacJweEncryption {
    fn cipher(&self) -> Cipher {
        match self {
            Self::A128CbcHs256 => Cipher::aes_128_cbc(),
            Self::A192CbcHs384 => Cipher::aes_192_cbc(),
            Self::A256CbcHs512 => Cipher::aes_256_cbc(),
        }
    }

    fn hash_algorithm(&self) -> HashAlgorithm {
        match self {
            Self::A128CbcHs256 => HashAlgorithm::Sha256,
            Self::A192CbcHs384 => HashAlgorithm::Sha384,
            Self::A256CbcHs512 => HashAlgorithm::Sha512,
        }
    }

    fn enc_key_len(&self) -> usize {
        match self {
            Self::A128CbcHs256 => 16,
            Self::A192CbcHs384 => 24,
            Self::A256CbcHs512 => 32,
        }
    }

    fn tag_len(&self) -> usize {
        self.enc_key_len()
    }

    fn split_key<'a>(&self, key: &'a [u8]) -> anyhow::Result<(&'a [u8], &'a [u8])> {
        let half = self.enc_key_len();
        if key.len() != half * 2 {
            anyhow::bail!(
                "{} requires a {}-byte CEK, got {}",
                self.name(),
                half * 2,
                key.len()
            );
        }
        Ok((&key[..half], &key[half..]))
    }

    fn compute_tag(&self, mac_key: &[u8], aad: &[u8], iv: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>, JoseError> {
        let al = util::u64_be_bytes((aad.len() as u64) * 8);
        let mac_input = util::concat(&[aad, iv, ciphertext, &al]);
        let mac = hmac(self.hash_algorithm(), mac_key, &mac_input)?;
        Ok(mac[..self.tag_len()].to_vec())
    }
}

impl JweContentEncryption for AesCbcHmacJweEncryption {
    fn name(&self) -> &str {
        match self {
            Self::A128CbcHs256 => "A128CBC-HS256",
            Self::A192CbcHs384 => "A192CBC-HS384",
            Self::A256CbcHs512 => "A256CBC-HS512",
        }
    }

    fn key_len(&self) -> usize {
        self.enc_key_len() * 2
    }

    fn iv_len(&self) -> usize {
        16
    }

    fn encrypt(
        &self,
        key: &[u8],
        iv: &[u8],
        aad: &[u8],
        plaintext: &[u8],
    ) -> Result<(Vec<u8>, Vec<u8>), JoseError> {
        let (mac_key, enc_key) =
            self.split_key(key).map_err(|err| JoseError::InvalidKeyLength(err))?;

        let mut crypter = Crypter::new(self.cipher(), Mode::Encrypt, enc_key, Some(iv))
            .map_err(JoseError::from)?;
        crypter.pad(true);
        let mut ciphertext = vec![0u8; plaintext.len() + self.cipher().block_size()];
        let mut count = crypter.update(plaintext, &mut ciphertext).map_err(JoseError::from)?;
        count += crypter.finalize(&mut ciphertext[count..]).map_err(JoseError::from)?;
        ciphertext.truncate(count);

        let tag = self.compute_tag(mac_key, aad, iv, &ciphertext)?;
        Ok((ciphertext, tag))
    }

    fn decrypt(
        &self,
        key: &[u8],
        iv: &[u8],
        aad: &[u8],
        ciphertext: &[u8],
        tag: &[u8],
    ) -> Result<Vec<u8>, JoseError> {
        let (mac_key, enc_key) = self.split_key(key).map_err(|_| JoseError::DecryptionFailed)?;

        let expected_tag = self.compute_tag(mac_key, aad, iv, ciphertext)?;
        if !util::constant_time_eq(&expected_tag, tag) {
            return Err(JoseError::DecryptionFailed);
        }

        let mut crypter = Crypter::new(self.cipher(), Mode::Decrypt, enc_key, Some(iv))
            .map_err(|_| JoseError::DecryptionFailed)?;
        crypter.pad(true);
        let mut plaintext = vec![0u8; ciphertext.len() + self.cipher().block_size()];
        let mut count = crypter
            .update(ciphertext, &mut plaintext)
            .map_err(|_| JoseError::DecryptionFailed)?;
        count += crypter
            .finalize(&mut plaintext[count..])
            .map_err(|_| JoseError::DecryptionFailed)?;
        plaintext.truncate(count);

        Ok(plaintext)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // RFC 7518 Appendix B.1: A128CBC-HS256 test vector.
    #[test]
    fn rfc7518_appendix_b1_vector() {
        let enc = AesCbcHmacJweEncryption::A128CbcHs256;

        let mac_key: Vec<u8> = (0u8..16).collect();
        let enc_key: Vec<u8> = (16u8..32).collect();
        let key = util::concat(&[&mac_key, &enc_key]);

        let iv: Vec<u8> = (0u8..16).collect();

        let plaintext = b"Live long and prosper.";
        let aad = b"eyJhbGciOiJBMTI4Q0JDLUhTMjU2In0";

        let (ciphertext, tag) = enc.encrypt(&key, &iv, aad, plaintext).unwrap();

        let expected_ciphertext: [u8; 32] = [
            40, 57, 83, 181, 119, 33, 133, 148, 198, 185, 243, 24, 152, 230, 6, 75, 129, 223, 127,
            19, 210, 82, 183, 230, 168, 33, 215, 104, 143, 112, 56, 102,
        ];
        assert_eq!(ciphertext, expected_ciphertext.to_vec());

        let expected_tag: [u8; 16] = [
            83, 73, 191, 98, 104, 205, 211, 128, 201, 189, 199, 133, 32, 38, 194, 85,
        ];
        assert_eq!(tag, expected_tag.to_vec());

        let recovered = enc.decrypt(&key, &iv, aad, &ciphertext, &tag).unwrap();
        assert_eq!(recovered, plaintext.to_vec());
    }

    #[test]
    fn tampered_tag_is_rejected() {
        let enc = AesCbcHmacJweEncryption::A128CbcHs256;
        let key = util::rand_bytes(32);
        let iv = util::rand_bytes(16);
        let (ciphertext, mut tag) = enc.encrypt(&key, &iv, b"aad", b"hello world").unwrap();
        tag[0] ^= 0xFF;
        assert!(enc.decrypt(&key, &iv, b"aad", &ciphertext, &tag).is_err());
    }

    #[test]
    fn tampered_ciphertext_is_rejected_before_any_plaintext_is_returned() {
        let enc = AesCbcHmacJweEncryption::A128CbcHs256;
        let key = util::rand_bytes(32);
        let iv = util::rand_bytes(16);
        let (mut ciphertext, tag) = enc.encrypt(&key, &iv, b"aad", b"hello world!!!!!").unwrap();
        ciphertext[0] ^= 0xFF;
        assert!(enc.decrypt(&key, &iv, b"aad", &ciphertext, &tag).is_err());
    }
}
