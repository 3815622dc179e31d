//! The security filter chain.
//!
//! Filters run in a fixed order inside a single middleware. Each one may let
//! the request continue, bypass the remaining filters, or answer it directly.
//! Response side effects queued along the way (cookie clearing) are applied to
//! whichever response the request ends up with.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{HeaderValue, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::debug;

use super::authentication;
use super::authorization::authorize;
use super::cookie::set_cookie_name;
use super::errors::ApiAuthError;
use super::policy::PathPolicy;
use super::types::Identity;
use crate::cli::ClientIpHeader;
use crate::db::Database;
use crate::impl_has_auth_backend;
use crate::jwt::JwtConfig;
use crate::rate_limit::RateLimitConfig;

/// One stage of the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityFilter {
    /// Exempt paths skip every later filter
    Exemptions,
    /// Verify the bearer token and install the identity context
    Authorization,
    /// Login, refresh and logout endpoints
    Authentication,
    /// Reject anything that reached this point without an identity
    RequireIdentity,
}

/// Exemptions first, then authorization before authentication, then the access rule.
pub const DEFAULT_FILTER_ORDER: [SecurityFilter; 4] = [
    SecurityFilter::Exemptions,
    SecurityFilter::Authorization,
    SecurityFilter::Authentication,
    SecurityFilter::RequireIdentity,
];

/// Decision of a single filter.
pub enum Flow {
    Continue(Request),
    Bypass(Request),
    Respond(Response),
}

/// Response mutations queued by filters.
#[derive(Debug, Default)]
pub struct ResponseEffects {
    cookies: Vec<(String, String)>,
}

impl ResponseEffects {
    /// Queue a `Set-Cookie` header; a later value for the same cookie replaces it.
    pub fn set_cookie(&mut self, name: &str, value: String) {
        self.cookies.retain(|(existing, _)| existing != name);
        self.cookies.push((name.to_string(), value));
    }

    /// Append queued cookies to `response`, skipping any cookie the response
    /// already sets itself.
    pub fn apply(self, response: &mut Response) {
        let already_set: Vec<String> = response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .filter_map(set_cookie_name)
            .map(str::to_string)
            .collect();

        for (name, value) in self.cookies {
            if already_set.contains(&name) {
                continue;
            }
            if let Ok(value) = HeaderValue::from_str(&value) {
                response.headers_mut().append(header::SET_COOKIE, value);
            }
        }
    }
}

/// Shared state of the chain.
#[derive(Clone)]
pub struct SecurityState {
    pub db: Database,
    pub jwt: Arc<JwtConfig>,
    pub secure_cookies: bool,
    pub policy: Arc<PathPolicy>,
    pub rate_limit: Arc<RateLimitConfig>,
    pub ip_header: Option<ClientIpHeader>,
    pub filters: Arc<[SecurityFilter]>,
}

impl_has_auth_backend!(SecurityState);

impl SecurityFilter {
    pub async fn apply(
        self,
        state: &SecurityState,
        mut request: Request,
        effects: &mut ResponseEffects,
    ) -> Flow {
        match self {
            SecurityFilter::Exemptions => {
                if state.policy.is_exempt(request.uri().path()) {
                    debug!(path = %request.uri().path(), "Exempt path, skipping security chain");
                    Flow::Bypass(request)
                } else {
                    Flow::Continue(request)
                }
            }
            SecurityFilter::Authorization => {
                let outcome = authorize(state, request.headers(), effects).await;
                if let Some(identity) = outcome.into_identity() {
                    request.extensions_mut().insert(identity);
                }
                Flow::Continue(request)
            }
            SecurityFilter::Authentication => authentication::intercept(state, request).await,
            SecurityFilter::RequireIdentity => {
                if request.extensions().get::<Identity>().is_some() {
                    Flow::Continue(request)
                } else {
                    debug!(path = %request.uri().path(), "Rejecting unauthenticated request");
                    Flow::Respond(ApiAuthError::not_authenticated().into_response())
                }
            }
        }
    }
}

/// Middleware running the configured filters in order.
pub async fn security_chain(
    State(state): State<SecurityState>,
    request: Request,
    next: Next,
) -> Response {
    let mut effects = ResponseEffects::default();
    let mut request = request;

    for filter in state.filters.iter().copied() {
        match filter.apply(&state, request, &mut effects).await {
            Flow::Continue(next_request) => request = next_request,
            Flow::Bypass(next_request) => {
                request = next_request;
                break;
            }
            Flow::Respond(mut response) => {
                effects.apply(&mut response);
                return response;
            }
        }
    }

    let mut response = next.run(request).await;
    effects.apply(&mut response);
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    fn set_cookies(response: &Response) -> Vec<String> {
        response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect()
    }

    #[test]
    fn test_effects_replace_same_cookie() {
        let mut effects = ResponseEffects::default();
        effects.set_cookie("refreshToken", "refreshToken=a".to_string());
        effects.set_cookie("refreshToken", "refreshToken=b".to_string());
        effects.set_cookie("other", "other=c".to_string());

        let mut response = StatusCode::OK.into_response();
        effects.apply(&mut response);

        assert_eq!(
            set_cookies(&response),
            vec!["refreshToken=b".to_string(), "other=c".to_string()]
        );
    }

    #[test]
    fn test_response_cookie_wins_over_queued_clear() {
        let mut effects = ResponseEffects::default();
        effects.set_cookie("refreshToken", "refreshToken=; Max-Age=0".to_string());

        let mut response = (
            [(header::SET_COOKIE, "refreshToken=new; Max-Age=60")],
            StatusCode::OK,
        )
            .into_response();
        effects.apply(&mut response);

        assert_eq!(
            set_cookies(&response),
            vec!["refreshToken=new; Max-Age=60".to_string()]
        );
    }

    #[test]
    fn test_default_order() {
        assert_eq!(DEFAULT_FILTER_ORDER[0], SecurityFilter::Exemptions);
        assert_eq!(
            DEFAULT_FILTER_ORDER.last(),
            Some(&SecurityFilter::RequireIdentity)
        );
        let authz = DEFAULT_FILTER_ORDER
            .iter()
            .position(|f| *f == SecurityFilter::Authorization);
        let authn = DEFAULT_FILTER_ORDER
            .iter()
            .position(|f| *f == SecurityFilter::Authentication);
        assert!(authz < authn);
    }
}
