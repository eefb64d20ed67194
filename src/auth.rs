//! Access control: turns a bearer token into a [`Principal`].
//!
//! Tokens are issued by the external auth service with the shared HS256
//! secret. The token only identifies the caller; role and approval are read
//! from the user directory on every request so an admin decision takes
//! effect immediately.

use actix_web::dev::Payload;
use actix_web::http::header::AUTHORIZATION;
use actix_web::{web, FromRequest, HttpRequest};
use chrono::{Duration, Utc};
use futures::future::LocalBoxFuture;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::user::{Principal, Role};
use crate::errors::AppError;
use crate::state::AppState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Clone)]
pub struct TokenVerifier {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    /// Signs a token the way the auth service does. Used by tooling and tests.
    pub fn issue(&self, user_id: Uuid, role: Role, ttl: Duration) -> Result<String, DomainError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id,
            role,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| DomainError::Internal(format!("token signing failed: {}", e)))
    }

    pub fn verify(&self, token: &str) -> Result<Claims, DomainError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                log::debug!("rejected bearer token: {}", e);
                DomainError::Unauthorized("Unauthorized - Invalid token".to_string())
            })
    }
}

fn bearer_token(req: &HttpRequest) -> Option<String> {
    req.headers()
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

impl FromRequest for Principal {
    type Error = AppError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let state = req.app_data::<web::Data<AppState>>().cloned();
        let token = bearer_token(req);

        Box::pin(async move {
            let state = state
                .ok_or_else(|| AppError::Internal("application state not configured".into()))?;
            let token =
                token.ok_or_else(|| DomainError::Unauthorized("No token provided".to_string()))?;
            let claims = state.tokens.verify(&token)?;

            let users = state.users.clone();
            let user = web::block(move || users.find_by_id(claims.sub))
                .await??
                .ok_or_else(|| {
                    DomainError::Unauthorized("Unauthorized - Invalid token".to_string())
                })?;
            Ok(Principal::from_user(&user))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"0123456789abcdef0123456789abcdef";

    #[test]
    fn issued_token_verifies() {
        let verifier = TokenVerifier::new(SECRET);
        let user = Uuid::new_v4();
        let token = verifier.issue(user, Role::Farmer, Duration::hours(1)).unwrap();

        let claims = verifier.verify(&token).unwrap();
        assert_eq!(claims.sub, user);
        assert_eq!(claims.role, Role::Farmer);
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let other = TokenVerifier::new(b"ffffffffffffffffffffffffffffffff");
        let token = other
            .issue(Uuid::new_v4(), Role::Buyer, Duration::hours(1))
            .unwrap();
        assert!(matches!(
            TokenVerifier::new(SECRET).verify(&token),
            Err(DomainError::Unauthorized(_))
        ));
    }

    #[test]
    fn expired_token_is_rejected() {
        let verifier = TokenVerifier::new(SECRET);
        let token = verifier
            .issue(Uuid::new_v4(), Role::Buyer, Duration::hours(-2))
            .unwrap();
        assert!(verifier.verify(&token).is_err());
    }

    #[test]
    fn bearer_prefix_is_required() {
        let req = actix_web::test::TestRequest::default()
            .insert_header((AUTHORIZATION, "Token abc"))
            .to_http_request();
        assert!(bearer_token(&req).is_none());

        let req = actix_web::test::TestRequest::default()
            .insert_header((AUTHORIZATION, "Bearer abc"))
            .to_http_request();
        assert_eq!(bearer_token(&req).as_deref(), Some("abc"));
    }
}
