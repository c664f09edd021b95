//! Bearer token decoding.

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};

use crate::{JwtClaims, TokenValidationError, validate_claims};

/// Decode + verify a bearer token into claims.
pub trait JwtValidator: Send + Sync {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, TokenValidationError>;
}

/// HMAC-SHA256 validator sharing its secret with the login service.
pub struct Hs256JwtValidator {
    key: DecodingKey,
    validation: Validation,
}

impl Hs256JwtValidator {
    pub fn new(secret: Vec<u8>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Time window is checked by `validate_claims` against our own claim names.
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        Self {
            key: DecodingKey::from_secret(&secret),
            validation,
        }
    }
}

impl JwtValidator for Hs256JwtValidator {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, TokenValidationError> {
        let data = decode::<JwtClaims>(token, &self.key, &self.validation)
            .map_err(|e| TokenValidationError::Malformed(e.to_string()))?;
        validate_claims(&data.claims, now)?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Role;
    use chrono::Duration;
    use jsonwebtoken::{EncodingKey, Header, encode};
    use minimart_core::UserId;

    fn mint(secret: &[u8], claims: &JwtClaims) -> String {
        encode(&Header::new(Algorithm::HS256), claims, &EncodingKey::from_secret(secret)).unwrap()
    }

    fn claims() -> JwtClaims {
        let now = Utc::now();
        JwtClaims {
            sub: UserId::from_raw(7),
            username: "manager".to_string(),
            role: Role::manager(),
            issued_at: now - Duration::seconds(5),
            expires_at: now + Duration::minutes(10),
        }
    }

    #[test]
    fn round_trips_a_signed_token() {
        let v = Hs256JwtValidator::new(b"secret".to_vec());
        let c = claims();
        let decoded = v.validate(&mint(b"secret", &c), Utc::now()).unwrap();
        assert_eq!(decoded, c);
    }

    #[test]
    fn rejects_wrong_secret() {
        let v = Hs256JwtValidator::new(b"secret".to_vec());
        let token = mint(b"other", &claims());
        assert!(matches!(
            v.validate(&token, Utc::now()),
            Err(TokenValidationError::Malformed(_))
        ));
    }

    #[test]
    fn rejects_expired_token() {
        let v = Hs256JwtValidator::new(b"secret".to_vec());
        let c = claims();
        let later = c.expires_at + Duration::seconds(1);
        assert_eq!(
            v.validate(&mint(b"secret", &c), later),
            Err(TokenValidationError::Expired)
        );
    }
}
