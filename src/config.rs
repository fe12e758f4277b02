//! Caller-facing configuration. Passed explicitly into engines at
//! construction; the core never reads environment variables or files.

/// Policy knobs recognized by the JOSE core (spec §6).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JoseConfig {
    /// Upper bound on PBES2 `p2c`. Default `1_000_000`.
    pub max_pbes2_iterations: u32,
    /// Lower bound on PBES2 `p2c`. Default `1000`.
    pub min_pbes2_iterations: u32,
    /// Ceiling on inflated `zip: DEF` payload size. Default `250_000`.
    pub max_decompressed_size: usize,
    /// Whether `alg: RSA1_5` is accepted. Deprecated; default `false`.
    pub allow_rsa1_5: bool,
    /// Whether `alg: none` is accepted by verification/decryption APIs.
    /// Default `false`.
    pub allow_none: bool,
    /// Upper bound on symmetric key size, in bits, accepted by key
    /// builders. `None` means no cap beyond what each algorithm itself
    /// requires.
    pub max_symmetric_key_bits: Option<u32>,
    /// Whether ECDSA signing enforces a low-S signature and verification
    /// rejects a high-S one (BIP-62 style malleability hardening).
    pub ecdsa_require_low_s: bool,
}

impl Default for JoseConfig {
    fn default() -> Self {
        JoseConfig {
            max_pbes2_iterations: 1_000_000,
            min_pbes2_iterations: 1_000,
            max_decompressed_size: 250_000,
            allow_rsa1_5: false,
            allow_none: false,
            max_symmetric_key_bits: None,
            ecdsa_require_low_s: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_policy() {
        let config = JoseConfig::default();
        assert_eq!(config.max_pbes2_iterations, 1_000_000);
        assert_eq!(config.min_pbes2_iterations, 1_000);
        assert_eq!(config.max_decompressed_size, 250_000);
        assert!(!config.allow_rsa1_5);
        assert!(!config.allow_none);
    }
}
