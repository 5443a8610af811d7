//! JWT authentication extractor
//!
//! `AuthUser` validates the bearer token from the Authorization header and
//! hands the verified principal to handlers. Tenant membership is NOT
//! checked here; that happens when the request binds a security context.

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts, StatusCode},
    response::{IntoResponse, Response},
};
use jsonwebtoken::errors::ErrorKind;

use crate::domain::Principal;
use crate::error::AppError;
use crate::jwt::JwtManager;

/// Authenticated caller extracted from the access token
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub principal: Principal,
}

/// Authentication errors
#[derive(Debug, Clone)]
pub enum AuthError {
    /// No Authorization header present
    MissingToken,
    /// Invalid Authorization header format
    InvalidHeader(String),
    /// Token validation failed
    InvalidToken,
    /// Token has expired
    TokenExpired,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let message = match self {
            AuthError::MissingToken => "Missing authorization token",
            AuthError::InvalidHeader(_) => "Invalid authorization header",
            AuthError::InvalidToken => "Invalid token",
            AuthError::TokenExpired => "Token has expired",
        };

        let body = serde_json::json!({
            "error": "unauthorized",
            "message": message,
        });

        (StatusCode::UNAUTHORIZED, axum::Json(body)).into_response()
    }
}

/// Extract and validate Bearer token from Authorization header
pub(crate) fn extract_bearer_token(headers: &axum::http::HeaderMap) -> Result<&str, AuthError> {
    let auth_header = headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingToken)?
        .to_str()
        .map_err(|_| AuthError::InvalidHeader("Invalid header encoding".to_string()))?;

    if !auth_header.starts_with("Bearer ") {
        return Err(AuthError::InvalidHeader(
            "Authorization header must use Bearer scheme".to_string(),
        ));
    }

    Ok(&auth_header[7..])
}

/// Map a token verification failure onto the auth error taxonomy,
/// keeping expiry distinguishable from forgery.
pub(crate) fn classify_verification_error(err: AppError) -> AuthError {
    match err {
        AppError::Jwt(e) if matches!(e.kind(), ErrorKind::ExpiredSignature) => {
            AuthError::TokenExpired
        }
        _ => AuthError::InvalidToken,
    }
}

/// Axum extractor for authenticated users
///
/// # Example
///
/// ```ignore
/// async fn protected_handler(
///     auth: AuthUser,
///     State(state): State<AppState>,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", auth.principal.display_name)
/// }
/// ```
impl<S> FromRequestParts<S> for AuthUser
where
    JwtManager: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = extract_bearer_token(&parts.headers)?;
        let jwt_manager = JwtManager::from_ref(state);

        let claims = jwt_manager
            .verify_access_token(token)
            .map_err(classify_verification_error)?;
        let principal = claims.principal().map_err(|_| AuthError::InvalidToken)?;

        Ok(AuthUser { principal })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderMap, HeaderValue};

    #[test]
    fn test_extract_bearer_token() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc.def.ghi"));

        assert_eq!(extract_bearer_token(&headers).unwrap(), "abc.def.ghi");
    }

    #[test]
    fn test_missing_header() {
        let headers = HeaderMap::new();
        assert!(matches!(
            extract_bearer_token(&headers),
            Err(AuthError::MissingToken)
        ));
    }

    #[test]
    fn test_wrong_scheme() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic dXNlcg=="));

        assert!(matches!(
            extract_bearer_token(&headers),
            Err(AuthError::InvalidHeader(_))
        ));
    }

    #[test]
    fn test_expired_token_classified_separately() {
        let expired: AppError = jsonwebtoken::errors::Error::from(ErrorKind::ExpiredSignature).into();
        assert!(matches!(
            classify_verification_error(expired),
            AuthError::TokenExpired
        ));

        let forged: AppError = jsonwebtoken::errors::Error::from(ErrorKind::InvalidSignature).into();
        assert!(matches!(
            classify_verification_error(forged),
            AuthError::InvalidToken
        ));
    }

    #[test]
    fn test_auth_error_status() {
        for err in [
            AuthError::MissingToken,
            AuthError::InvalidHeader("bad".to_string()),
            AuthError::InvalidToken,
            AuthError::TokenExpired,
        ] {
            assert_eq!(err.into_response().status(), StatusCode::UNAUTHORIZED);
        }
    }
}
