use axum::extract::FromRef;
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use thiserror::Error;
use time::OffsetDateTime;
use tracing::debug;

use super::claims::{Claims, TokenSubject};
use crate::{config::JwtConfig, state::AppState};

/// The only accepted signing algorithm. The header's `alg` is never trusted.
const ALGORITHM: Algorithm = Algorithm::HS256;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,
    #[error("invalid token signature")]
    InvalidSignature,
    #[error("token expired")]
    Expired,
    #[error("token audience or issuer mismatch")]
    ClaimMismatch,
    #[error("failed to encode token: {0}")]
    Encoding(String),
}

/// Signs and verifies HS256 compact tokens with the process-wide secret.
#[derive(Clone)]
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    audience: String,
    issuer: Option<String>,
    ttl_seconds: i64,
}

impl FromRef<AppState> for TokenCodec {
    fn from_ref(state: &AppState) -> Self {
        state.tokens.clone()
    }
}

impl TokenCodec {
    pub fn new(cfg: &JwtConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            audience: cfg.audience.clone(),
            issuer: cfg.issuer.clone(),
            ttl_seconds: cfg.ttl_seconds,
        }
    }

    pub fn claims_for(
        &self,
        subject: &TokenSubject,
        ttl_seconds: i64,
    ) -> Result<Claims, TokenError> {
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let exp = now
            .checked_add(ttl_seconds)
            .ok_or_else(|| TokenError::Encoding(format!("ttl of {ttl_seconds}s overflows exp")))?;
        Ok(Claims {
            sub: subject.user_id.to_string(),
            email: subject.email.clone(),
            name: subject.name.clone(),
            picture: subject.picture.clone(),
            iat: now,
            exp,
            aud: self.audience.clone(),
            iss: self.issuer.clone(),
        })
    }

    pub fn sign(&self, claims: &Claims) -> Result<String, TokenError> {
        encode(&Header::new(ALGORITHM), claims, &self.encoding)
            .map_err(|e| TokenError::Encoding(e.to_string()))
    }

    /// Issues a token with the configured time-to-live.
    pub fn issue(&self, subject: &TokenSubject) -> Result<String, TokenError> {
        self.issue_with_ttl(subject, self.ttl_seconds)
    }

    pub fn issue_with_ttl(
        &self,
        subject: &TokenSubject,
        ttl_seconds: i64,
    ) -> Result<String, TokenError> {
        let token = self.sign(&self.claims_for(subject, ttl_seconds)?)?;
        debug!(user_id = subject.user_id, ttl_seconds, "jwt signed");
        Ok(token)
    }

    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        self.verify_at(token, OffsetDateTime::now_utc().unix_timestamp())
    }

    /// Signature is checked before the payload is parsed; expiry is checked last.
    fn verify_at(&self, token: &str, now: i64) -> Result<Claims, TokenError> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation()).map_err(classify)?;
        if now >= data.claims.exp {
            return Err(TokenError::Expired);
        }
        debug!(sub = %data.claims.sub, "jwt verified");
        Ok(data.claims)
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(ALGORITHM);
        // exp is compared without leeway in verify_at
        validation.validate_exp = false;
        validation.set_audience(std::slice::from_ref(&self.audience));
        if let Some(issuer) = &self.issuer {
            validation.set_issuer(std::slice::from_ref(issuer));
        }
        validation
    }
}

fn classify(err: jsonwebtoken::errors::Error) -> TokenError {
    match err.kind() {
        ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => TokenError::InvalidSignature,
        ErrorKind::ExpiredSignature => TokenError::Expired,
        ErrorKind::InvalidAudience | ErrorKind::InvalidIssuer => TokenError::ClaimMismatch,
        _ => TokenError::Malformed,
    }
}

#[cfg(test)]
mod tests {
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};

    use super::*;

    fn jwt_config(secret: &str) -> JwtConfig {
        JwtConfig {
            secret: secret.into(),
            issuer: Some("test-issuer".into()),
            audience: "test-aud".into(),
            ttl_seconds: 300,
        }
    }

    fn subject() -> TokenSubject {
        TokenSubject {
            user_id: 42,
            email: "a@x.com".into(),
            name: Some("Ada".into()),
            picture: None,
        }
    }

    #[test]
    fn sign_and_verify_returns_issued_claims() {
        let codec = TokenCodec::new(&jwt_config("dev-secret"));
        let claims = codec.claims_for(&subject(), 300).expect("claims");
        let token = codec.sign(&claims).expect("sign");
        assert_eq!(codec.verify(&token).expect("verify"), claims);
        assert_eq!(claims.sub, "42");
        assert_eq!(claims.exp - claims.iat, 300);
    }

    #[test]
    fn token_has_three_unpadded_segments() {
        let codec = TokenCodec::new(&jwt_config("dev-secret"));
        let token = codec.issue(&subject()).expect("issue");
        let parts: Vec<&str> = token.split('.').collect();
        assert_eq!(parts.len(), 3);
        assert!(!token.contains('='));
        let header = URL_SAFE_NO_PAD.decode(parts[0]).expect("header b64");
        let header: serde_json::Value = serde_json::from_slice(&header).expect("header json");
        assert_eq!(header["alg"], "HS256");
    }

    #[test]
    fn optional_claims_are_omitted() {
        let codec = TokenCodec::new(&JwtConfig {
            issuer: None,
            ..jwt_config("dev-secret")
        });
        let mut s = subject();
        s.name = None;
        let token = codec.issue(&s).expect("issue");
        let payload = token.split('.').nth(1).expect("payload");
        let payload: serde_json::Value =
            serde_json::from_slice(&URL_SAFE_NO_PAD.decode(payload).expect("b64")).expect("json");
        assert!(payload.get("name").is_none());
        assert!(payload.get("iss").is_none());
        assert!(payload.get("picture").is_none());
        assert_eq!(codec.verify(&token).expect("verify").iss, None);
    }

    #[test]
    fn any_flipped_signature_bit_is_rejected() {
        let codec = TokenCodec::new(&jwt_config("dev-secret"));
        let token = codec.issue(&subject()).expect("issue");
        let (message, signature) = token.rsplit_once('.').expect("three parts");
        let raw = URL_SAFE_NO_PAD.decode(signature).expect("sig b64");

        for bit in 0..raw.len() * 8 {
            let mut tampered = raw.clone();
            tampered[bit / 8] ^= 1 << (bit % 8);
            let forged = format!("{}.{}", message, URL_SAFE_NO_PAD.encode(&tampered));
            assert_eq!(
                codec.verify(&forged).unwrap_err(),
                TokenError::InvalidSignature,
                "bit {bit}"
            );
        }
    }

    #[test]
    fn already_expired_token_is_rejected() {
        let codec = TokenCodec::new(&jwt_config("dev-secret"));
        let token = codec.issue_with_ttl(&subject(), -1).expect("issue");
        assert_eq!(codec.verify(&token).unwrap_err(), TokenError::Expired);
    }

    #[test]
    fn overflowing_ttl_is_an_encoding_error() {
        let codec = TokenCodec::new(&jwt_config("dev-secret"));
        assert!(matches!(
            codec.issue_with_ttl(&subject(), i64::MAX),
            Err(TokenError::Encoding(_))
        ));
    }

    #[test]
    fn expiry_boundary_is_exclusive() {
        let codec = TokenCodec::new(&jwt_config("dev-secret"));
        let claims = codec.claims_for(&subject(), 60).expect("claims");
        let token = codec.sign(&claims).expect("sign");
        assert!(codec.verify_at(&token, claims.exp - 1).is_ok());
        assert_eq!(
            codec.verify_at(&token, claims.exp).unwrap_err(),
            TokenError::Expired
        );
    }

    #[test]
    fn different_secret_fails_signature() {
        let issuer = TokenCodec::new(&jwt_config("secret-one"));
        let verifier = TokenCodec::new(&jwt_config("secret-two"));
        let token = issuer.issue(&subject()).expect("issue");
        assert_eq!(
            verifier.verify(&token).unwrap_err(),
            TokenError::InvalidSignature
        );
    }

    #[test]
    fn missing_segment_is_malformed() {
        let codec = TokenCodec::new(&jwt_config("dev-secret"));
        let token = codec.issue(&subject()).expect("issue");
        let (two_parts, _) = token.rsplit_once('.').expect("three parts");
        assert_eq!(codec.verify(two_parts).unwrap_err(), TokenError::Malformed);
        assert_eq!(codec.verify("").unwrap_err(), TokenError::Malformed);
        assert_eq!(codec.verify("not-a-token").unwrap_err(), TokenError::Malformed);
    }

    #[test]
    fn signed_garbage_payload_is_malformed() {
        let codec = TokenCodec::new(&jwt_config("dev-secret"));
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(b"definitely not json");
        let message = format!("{header}.{payload}");
        let signature = jsonwebtoken::crypto::sign(
            message.as_bytes(),
            &EncodingKey::from_secret(b"dev-secret"),
            Algorithm::HS256,
        )
        .expect("sign");
        let token = format!("{message}.{signature}");
        assert_eq!(codec.verify(&token).unwrap_err(), TokenError::Malformed);
    }

    #[test]
    fn other_algorithms_are_refused() {
        let codec = TokenCodec::new(&jwt_config("dev-secret"));
        let claims = codec.claims_for(&subject(), 300).expect("claims");
        let hs512 = encode(
            &Header::new(Algorithm::HS512),
            &claims,
            &EncodingKey::from_secret(b"dev-secret"),
        )
        .expect("sign");
        assert_eq!(
            codec.verify(&hs512).unwrap_err(),
            TokenError::InvalidSignature
        );

        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims).expect("json"));
        let unsigned = format!("{header}.{payload}.");
        assert!(codec.verify(&unsigned).is_err());
    }

    #[test]
    fn verify_rejects_wrong_audience() {
        let good = TokenCodec::new(&jwt_config("same-secret"));
        let other = TokenCodec::new(&JwtConfig {
            audience: "other-aud".into(),
            ..jwt_config("same-secret")
        });
        let token = good.issue(&subject()).expect("issue");
        assert_eq!(other.verify(&token).unwrap_err(), TokenError::ClaimMismatch);
    }
}
