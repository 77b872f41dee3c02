// Bearer-token verification for protected routes
//
// Session issuance (login, registration, refresh) lives in a separate
// identity service; this API only verifies the tokens it is handed.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// JWT claims structure issued by the identity service
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i32, // user_id
    pub role: String,
    pub exp: i64,
    pub iat: i64,
}

/// Authenticated user extractor for protected routes
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: i32,
    pub role: String,
}

impl AuthenticatedUser {
    pub fn is_staff(&self) -> bool {
        self.role == "admin" || self.role == "staff"
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Extract Authorization header
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .ok_or_else(|| ApiError::Unauthorized("Missing Authorization header".to_string()))?
            .to_str()
            .map_err(|_| ApiError::Unauthorized("Invalid Authorization header".to_string()))?;

        // Verify Bearer token format
        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| ApiError::Unauthorized("Invalid Authorization header".to_string()))?;

        let jwt_secret = std::env::var("JWT_SECRET")
            .map_err(|_| ApiError::InternalError("JWT_SECRET not configured".to_string()))?;

        let claims = decode::<Claims>(
            token,
            &DecodingKey::from_secret(jwt_secret.as_bytes()),
            &Validation::default(),
        )
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                ApiError::Unauthorized("Token expired".to_string())
            }
            _ => ApiError::Unauthorized("Invalid token".to_string()),
        })?;

        Ok(AuthenticatedUser {
            user_id: claims.sub,
            role: claims.role,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use jsonwebtoken::{encode, EncodingKey, Header};

    fn make_token(secret: &str, exp_offset: i64) -> String {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: 42,
            role: "customer".to_string(),
            iat: now,
            exp: now + exp_offset,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .expect("token encodes")
    }

    #[test]
    fn test_valid_token_round_trip() {
        let secret = "test-secret";
        let token = make_token(secret, 900);

        let claims = decode::<Claims>(
            &token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )
        .expect("token decodes")
        .claims;

        assert_eq!(claims.sub, 42);
        assert_eq!(claims.role, "customer");
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let secret = "test-secret";
        let token = make_token(secret, -3600);

        let result = decode::<Claims>(
            &token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let token = make_token("test-secret", 900);

        let result = decode::<Claims>(
            &token,
            &DecodingKey::from_secret(b"other-secret"),
            &Validation::default(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_is_staff() {
        let admin = AuthenticatedUser {
            user_id: 1,
            role: "admin".to_string(),
        };
        let customer = AuthenticatedUser {
            user_id: 2,
            role: "customer".to_string(),
        };
        assert!(admin.is_staff());
        assert!(!customer.is_staff());
    }
}
