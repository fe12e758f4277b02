//! The handler/visitor seam (spec §4.7): consumers receive a
//! classified token through three entry points rather than testing the
//! [`ClassifiedJwt`] variant themselves with runtime reflection.

use crate::jwt::{ClassifiedJwt, EncryptedJwt, PlainJwt, SignedJwt};

/// A capability object dispatched to by tag, not by runtime type test.
pub trait JwtHandler {
    type Output;

    fn on_plain(&mut self, jwt: PlainJwt) -> Self::Output;

    fn on_signed(&mut self, jwt: SignedJwt) -> Self::Output;

    fn on_encrypted(&mut self, jwt: EncryptedJwt) -> Self::Output;
}

impl ClassifiedJwt {
    /// Route this classification to the matching entry point of
    /// `handler`.
    pub fn dispatch<H: JwtHandler>(self, handler: &mut H) -> H::Output {
        match self {
            ClassifiedJwt::Plain(jwt) => handler.on_plain(jwt),
            ClassifiedJwt::Signed(jwt) => handler.on_signed(jwt),
            ClassifiedJwt::Encrypted(jwt) => handler.on_encrypted(jwt),
        }
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;

    use super::*;
    use crate::jws::HS256;
    use crate::jwt;
    use crate::jwt::JwtClaimsSet;

    struct KindRecorder {
        kind: &'static str,
    }

    impl JwtHandler for KindRecorder {
        type Output = &'static str;

        fn on_plain(&mut self, _jwt: PlainJwt) -> Self::Output {
            "plain"
        }

        fn on_signed(&mut self, _jwt: SignedJwt) -> Self::Output {
            "signed"
        }

        fn on_encrypted(&mut self, _jwt: EncryptedJwt) -> Self::Output {
            "encrypted"
        }
    }

    #[test]
    fn dispatches_signed_token_to_on_signed() -> Result<()> {
        let key = vec![0u8; 32];
        let signer = HS256.signer_from_bytes(&key)?;
        let mut header = crate::jws::JwsHeader::new();
        header.set_token_type("JWT");

        let compact = jwt::encode_with_signer(&JwtClaimsSet::new(), &header, &signer)?;
        let classified = jwt::classify_compact(&compact)?;

        let mut recorder = KindRecorder { kind: "" };
        let outcome = classified.dispatch(&mut recorder);
        recorder.kind = outcome;
        assert_eq!(recorder.kind, "signed");
        Ok(())
    }
}
