// src/utils/jwt.rs

use std::time::{SystemTime, UNIX_EPOCH};

use axum::{
    body::Body,
    extract::{FromRequestParts, State},
    http::{Request, header, request::Parts},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::{config::Config, error::AppError};

/// JWT Claims structure.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Claims {
    /// Subject - Stores the User ID (as string).
    pub sub: String,
    /// User's role, copied from the account.
    pub role: String,
    /// Expiration time as Unix timestamp.
    pub exp: usize,
}

/// The authenticated caller, passed explicitly into every core operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub learner_id: i64,
    pub role: String,
}

impl TryFrom<&Claims> for Session {
    type Error = AppError;

    fn try_from(claims: &Claims) -> Result<Self, Self::Error> {
        let learner_id = claims
            .sub
            .parse::<i64>()
            .map_err(|_| AppError::AuthError("Invalid token subject".to_string()))?;

        Ok(Session {
            learner_id,
            role: claims.role.clone(),
        })
    }
}

/// Reads the `Claims` injected by `auth_middleware`.
impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let claims = parts
            .extensions
            .get::<Claims>()
            .ok_or_else(|| AppError::AuthError("Missing session".to_string()))?;

        Session::try_from(claims)
    }
}

/// Signs a new JWT for the user.
///
/// Arguments:
/// * `id`: User ID.
/// * `role`: User role.
pub fn sign_jwt(
    id: i64,
    role: &str,
    secret: &str,
    expiration_seconds: u64,
) -> Result<String, AppError> {
    // Calculate expiration: current time + expiration_seconds
    let expiration = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| AppError::InternalServerError(e.to_string()))?
        .as_secs() as usize
        + expiration_seconds as usize;

    let claims = Claims {
        sub: id.to_string(),
        role: role.to_owned(),
        exp: expiration,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::InternalServerError(e.to_string()))
}

/// Verifies and decodes a JWT string.
///
/// Returns the `Claims` if valid, otherwise returns an `AppError`.
pub fn verify_jwt(token: &str, secret: &str) -> Result<Claims, AppError> {
    let token_data = decode(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::AuthError("Invalid token".to_string()))?;

    Ok(token_data.claims)
}

/// Axum Middleware: Authentication.
///
/// Intercepts requests, validates the 'Authorization: Bearer <token>' header.
/// If valid, injects `Claims` into the request extensions for handlers to use.
/// If invalid, returns 401 Unauthorized.
pub async fn auth_middleware(
    State(config): State<Config>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    let token = match auth_header {
        Some(header) if header.starts_with("Bearer ") => &header[7..],
        _ => return Err(AppError::AuthError("Missing bearer token".to_string())),
    };

    let claims = verify_jwt(token, &config.jwt_secret)?;
    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_then_verify_yields_session() {
        let token = sign_jwt(42, "user", "secret", 60).unwrap();
        let claims = verify_jwt(&token, "secret").unwrap();
        let session = Session::try_from(&claims).unwrap();
        assert_eq!(session.learner_id, 42);
        assert_eq!(session.role, "user");
    }

    #[test]
    fn test_verify_rejects_wrong_secret() {
        let token = sign_jwt(1, "user", "secret", 60).unwrap();
        assert!(matches!(
            verify_jwt(&token, "other"),
            Err(AppError::AuthError(_))
        ));
    }

    #[test]
    fn test_non_numeric_subject_is_rejected() {
        let claims = Claims {
            sub: "abc".to_string(),
            role: "user".to_string(),
            exp: usize::MAX,
        };
        assert!(Session::try_from(&claims).is_err());
    }
}
