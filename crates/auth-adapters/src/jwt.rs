//! HS256 JWT implementation of `TokenIssuer`.

use chrono::{Duration, Utc};
use domains::{DomainError, DomainResult, IssuedToken, Role, TokenClaims, TokenIssuer};
use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use uuid::Uuid;

pub struct JwtTokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
    validation: Validation,
}

impl JwtTokenIssuer {
    pub fn new(secret: &[u8], ttl_hours: i64) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl: Duration::hours(ttl_hours),
            validation,
        }
    }
}

impl TokenIssuer for JwtTokenIssuer {
    fn issue(&self, user_id: Uuid, role: Role) -> DomainResult<IssuedToken> {
        let now = Utc::now();
        let expires_at = now + self.ttl;
        let claims = TokenClaims {
            sub: user_id,
            role,
            exp: expires_at.timestamp(),
            iat: now.timestamp(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| DomainError::internal(format!("token signing failed: {e}")))?;
        Ok(IssuedToken { token, expires_at })
    }

    fn verify(&self, token: &str) -> DomainResult<TokenClaims> {
        decode::<TokenClaims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                let reason = match e.kind() {
                    ErrorKind::ExpiredSignature => "token expired",
                    ErrorKind::InvalidSignature => "token signature invalid",
                    _ => "token malformed",
                };
                tracing::debug!(error = %e, reason, "rejected bearer token");
                DomainError::Unauthorized(reason.to_string())
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_token_verifies() {
        let issuer = JwtTokenIssuer::new(b"test-secret-test-secret", 1);
        let user = Uuid::now_v7();
        let issued = issuer.issue(user, Role::Gm).unwrap();
        let claims = issuer.verify(&issued.token).unwrap();
        assert_eq!(claims.sub, user);
        assert_eq!(claims.role, Role::Gm);
        assert!(issued.expires_at > Utc::now());
    }

    #[test]
    fn token_from_other_secret_is_rejected() {
        let issued = JwtTokenIssuer::new(b"secret-one-secret-one", 1)
            .issue(Uuid::now_v7(), Role::Player)
            .unwrap();
        let err = JwtTokenIssuer::new(b"secret-two-secret-two", 1).verify(&issued.token).unwrap_err();
        assert!(matches!(err, DomainError::Unauthorized(_)));
    }

    #[test]
    fn expired_token_is_rejected() {
        let issuer = JwtTokenIssuer::new(b"test-secret-test-secret", -1);
        let issued = issuer.issue(Uuid::now_v7(), Role::Player).unwrap();
        assert_eq!(
            issuer.verify(&issued.token).unwrap_err(),
            DomainError::Unauthorized("token expired".into())
        );
    }
}
