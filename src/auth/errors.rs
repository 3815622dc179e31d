//! Authentication error types.

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;

use super::cookie::{REFRESH_COOKIE_NAME, clear_cookie};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthErrorKind {
    NotAuthenticated,
    InvalidToken,
    TokenRevoked,
}

/// Rejection for requests that need an identity. Returns JSON and may clear
/// the refresh-token cookie.
#[derive(Debug)]
pub struct ApiAuthError {
    kind: AuthErrorKind,
    /// `Some(secure)` clears the refresh-token cookie
    clear_refresh_cookie: Option<bool>,
}

impl ApiAuthError {
    pub fn new(kind: AuthErrorKind) -> Self {
        Self {
            kind,
            clear_refresh_cookie: None,
        }
    }

    pub fn not_authenticated() -> Self {
        Self::new(AuthErrorKind::NotAuthenticated)
    }

    /// Also clear the refresh-token cookie in the response.
    pub fn clearing_cookie(mut self, secure: bool) -> Self {
        self.clear_refresh_cookie = Some(secure);
        self
    }

    fn message(&self) -> &'static str {
        match self.kind {
            AuthErrorKind::NotAuthenticated => "Not authenticated",
            AuthErrorKind::InvalidToken => "Invalid or expired token",
            AuthErrorKind::TokenRevoked => "Token has been revoked",
        }
    }
}

impl IntoResponse for ApiAuthError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            error: &'static str,
        }

        let mut response = (
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse {
                error: self.message(),
            }),
        )
            .into_response();

        if let Some(secure) = self.clear_refresh_cookie {
            if let Ok(value) = HeaderValue::from_str(&clear_cookie(REFRESH_COOKIE_NAME, secure)) {
                response.headers_mut().append(header::SET_COOKIE, value);
            }
        }

        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unauthorized_without_cookie() {
        let response = ApiAuthError::not_authenticated().into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().get(header::SET_COOKIE).is_none());
    }

    #[test]
    fn test_clearing_cookie() {
        let response = ApiAuthError::new(AuthErrorKind::TokenRevoked)
            .clearing_cookie(false)
            .into_response();

        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap();
        assert!(cookie.starts_with("refreshToken=;"));
        assert!(cookie.contains("Max-Age=0"));
    }
}
