use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use tracing::warn;

use super::jwt::{TokenCodec, TokenError};
use crate::error::ApiError;

/// Caller authenticated by a bearer token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: i64,
    pub email: String,
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    TokenCodec: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::unauthorized("No token provided"))?;

        let token = bearer_token(header)
            .ok_or_else(|| ApiError::unauthorized("Invalid Authorization header"))?;

        let claims = TokenCodec::from_ref(state).verify(token)?;

        let Some(id) = claims.user_id() else {
            warn!(sub = %claims.sub, "token subject is not a user id");
            return Err(TokenError::Malformed.into());
        };

        Ok(AuthUser {
            id,
            email: claims.email,
        })
    }
}

/// Accepts `Bearer <token>` with any casing of the scheme.
fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}
