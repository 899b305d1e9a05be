//! Signed, tamper-evident claim tokens.
//!
//! Session cookies and invite codes are both HS256 tokens over a small
//! claim map. Expiry is optional: with `token_expiry_hours = 0` tokens are
//! issued without `exp` and verification does not demand one.

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

pub type Claims = Map<String, Value>;

#[derive(Clone)]
pub struct TokenSigner {
    encoding: EncodingKey,
    decoding: DecodingKey,
    expiry: Option<Duration>,
}

impl TokenSigner {
    #[must_use]
    pub fn new(secret: &str, expiry_hours: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            expiry: (expiry_hours > 0).then(|| Duration::hours(expiry_hours)),
        }
    }

    /// Encode a claim map into an opaque signed token, stamped with `iat`
    /// (and `exp` when expiry is configured).
    pub fn issue(&self, claims: &Claims) -> Result<String> {
        let now = Utc::now();

        let mut payload = claims.clone();
        payload.insert("iat".to_string(), now.timestamp().into());
        if let Some(expiry) = self.expiry {
            payload.insert("exp".to_string(), (now + expiry).timestamp().into());
        }

        encode(&Header::default(), &payload, &self.encoding)
            .map_err(|e| Error::Internal(format!("failed to sign token: {e}")))
    }

    /// Decode and check a token, returning its claims. Any mismatch —
    /// signature, shape, expiry — is `InvalidToken`.
    pub fn verify(&self, token: &str) -> Result<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.required_spec_claims.clear();
        validation.validate_exp = self.expiry.is_some();

        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|_| Error::InvalidToken)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(pairs: &[(&str, &str)]) -> Claims {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), Value::from(*v)))
            .collect()
    }

    #[test]
    fn test_round_trip_preserves_claims() {
        let signer = TokenSigner::new("secret", 0);
        let issued = claims(&[("name", "gdritter"), ("password", "pw1")]);

        let token = signer.issue(&issued).unwrap();
        let verified = signer.verify(&token).unwrap();

        assert_eq!(verified.get("name"), issued.get("name"));
        assert_eq!(verified.get("password"), issued.get("password"));
        assert!(verified.contains_key("iat"));
    }

    #[test]
    fn test_tampered_token_fails() {
        let signer = TokenSigner::new("secret", 0);
        let token = signer.issue(&claims(&[("name", "gdritter")])).unwrap();

        // Flip one byte of the signature segment.
        let mut bytes = token.into_bytes();
        let last = bytes.len() - 1;
        bytes[last] = if bytes[last] == b'A' { b'B' } else { b'A' };
        let tampered = String::from_utf8(bytes).unwrap();

        assert!(matches!(
            signer.verify(&tampered),
            Err(Error::InvalidToken)
        ));
    }

    #[test]
    fn test_wrong_secret_fails() {
        let signer = TokenSigner::new("secret", 0);
        let other = TokenSigner::new("another-secret", 0);

        let token = signer.issue(&claims(&[("name", "gdritter")])).unwrap();
        assert!(matches!(other.verify(&token), Err(Error::InvalidToken)));
    }

    #[test]
    fn test_garbage_is_invalid() {
        let signer = TokenSigner::new("secret", 0);
        assert!(matches!(
            signer.verify("not-a-token"),
            Err(Error::InvalidToken)
        ));
    }

    #[test]
    fn test_expired_token_rejected_when_expiry_configured() {
        let signer = TokenSigner::new("secret", 1);

        let mut payload = claims(&[("name", "gdritter")]);
        payload.insert(
            "exp".to_string(),
            (Utc::now() - Duration::hours(2)).timestamp().into(),
        );
        let stale = encode(
            &Header::default(),
            &payload,
            &EncodingKey::from_secret(b"secret"),
        )
        .unwrap();

        assert!(matches!(signer.verify(&stale), Err(Error::InvalidToken)));
    }

    #[test]
    fn test_unexpired_baseline_accepts_tokens_without_exp() {
        let issuer = TokenSigner::new("secret", 0);
        let verifier = TokenSigner::new("secret", 0);

        let token = issuer.issue(&claims(&[("name", "gdritter")])).unwrap();
        assert!(verifier.verify(&token).is_ok());
    }
}
