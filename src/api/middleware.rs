//! API middleware
//!
//! Session authentication: `require_auth` resolves the bearer token or
//! `session` cookie to a user and stores it in the request extensions, where
//! handlers pick it up through the [`AuthenticatedUser`] extractor.

use axum::{
    extract::{FromRequestParts, OptionalFromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use std::convert::Infallible;
use std::sync::Arc;

use crate::config::UploadConfig;
use crate::models::{Envelope, FailureKind, User};
use crate::services::{CampaignService, UserService};

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub user_service: Arc<UserService>,
    pub campaign_service: Arc<CampaignService>,
    pub upload_config: Arc<UploadConfig>,
}

/// Authenticated user extracted from request
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = Envelope;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or_else(unauthorized)
    }
}

impl<S> OptionalFromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        Ok(parts.extensions.get::<AuthenticatedUser>().cloned())
    }
}

fn unauthorized() -> Envelope {
    Envelope::failure(
        "Unauthorized",
        FailureKind::Unauthorized,
        ["Authentication failed"],
    )
}

/// Session token from `Authorization: Bearer ..`, falling back to the `session` cookie
fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    if let Some(auth_header) = headers.get(header::AUTHORIZATION) {
        if let Ok(auth_str) = auth_header.to_str() {
            if let Some(token) = auth_str.strip_prefix("Bearer ") {
                return Some(token.trim().to_string());
            }
        }
    }

    if let Some(cookie_header) = headers.get(header::COOKIE) {
        if let Ok(cookie_str) = cookie_header.to_str() {
            for cookie in cookie_str.split(';') {
                if let Some(token) = cookie.trim().strip_prefix("session=") {
                    return Some(token.to_string());
                }
            }
        }
    }

    None
}

/// Authentication middleware
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, Envelope> {
    let token = extract_session_token(request.headers()).ok_or_else(unauthorized)?;

    let user = state
        .user_service
        .validate_session(&token)
        .await
        .map_err(|e| {
            tracing::error!(error = ?e, "session validation failed");
            Envelope::failure(
                "Session validation failed",
                FailureKind::Internal,
                [e.to_string()],
            )
        })?
        .ok_or_else(unauthorized)?;

    tracing::debug!(user_id = user.id, "request authenticated");
    request.extensions_mut().insert(AuthenticatedUser(user));
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with(name: header::HeaderName, value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(name, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_extract_session_token_from_bearer() {
        let headers = headers_with(header::AUTHORIZATION, "Bearer test-token-123");
        assert_eq!(extract_session_token(&headers), Some("test-token-123".to_string()));
    }

    #[test]
    fn test_extract_session_token_from_cookie() {
        let headers = headers_with(header::COOKIE, "theme=dark; session=test-token-456");
        assert_eq!(extract_session_token(&headers), Some("test-token-456".to_string()));
    }

    #[test]
    fn test_extract_session_token_bearer_priority() {
        let mut headers = headers_with(header::AUTHORIZATION, "Bearer bearer-token");
        headers.insert(header::COOKIE, HeaderValue::from_static("session=cookie-token"));
        assert_eq!(extract_session_token(&headers), Some("bearer-token".to_string()));
    }

    #[test]
    fn test_extract_session_token_none() {
        assert!(extract_session_token(&HeaderMap::new()).is_none());

        let basic = headers_with(header::AUTHORIZATION, "Basic abc");
        assert!(extract_session_token(&basic).is_none());
    }

    #[tokio::test]
    async fn test_authenticated_user_extractor() {
        let (mut parts, _) = axum::http::Request::new(()).into_parts();

        let missing = <AuthenticatedUser as FromRequestParts<()>>::from_request_parts(&mut parts, &())
            .await
            .unwrap_err();
        assert_eq!(missing.meta.code, 401);

        let optional =
            <AuthenticatedUser as OptionalFromRequestParts<()>>::from_request_parts(&mut parts, &())
                .await
                .unwrap();
        assert!(optional.is_none());

        let user = User::new(
            "Ada".to_string(),
            "Engineer".to_string(),
            "ada@example.com".to_string(),
            "hash".to_string(),
        );
        parts.extensions.insert(AuthenticatedUser(user));

        let found = <AuthenticatedUser as FromRequestParts<()>>::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert_eq!(found.0.email, "ada@example.com");
    }
}
