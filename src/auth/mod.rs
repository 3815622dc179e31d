//! Stateless JWT authentication for the HTTP API.
//!
//! Every request runs through an ordered chain of security filters: path
//! exemptions, bearer token authorization, the token endpoints (login,
//! refresh, logout) and finally the access rule. Access tokens are stateless;
//! refresh tokens are only valid while their revocation-store entry exists.

mod authentication;
mod authorization;
mod bearer;
mod chain;
mod cookie;
mod cors;
mod errors;
mod extractors;
mod ip;
mod policy;
mod state;
mod types;

pub use authentication::{LOGIN_PATH, LOGOUT_PATH, REFRESH_PATH};
pub use authorization::{AuthorizationOutcome, RejectReason, authorize, load_principal};
pub use bearer::{PresentedToken, TokenSource, extract_token, strip_scheme};
pub use chain::{
    DEFAULT_FILTER_ORDER, Flow, ResponseEffects, SecurityFilter, SecurityState, security_chain,
};
pub use cookie::{REFRESH_COOKIE_NAME, clear_cookie, get_cookie, refresh_token_cookie};
pub use cors::cors_layer;
pub use errors::{ApiAuthError, AuthErrorKind};
pub use extractors::Authenticated;
pub use ip::extract_client_ip;
pub use policy::{DEFAULT_EXEMPT_PATTERNS, PathPolicy};
pub use state::HasAuthBackend;
pub use types::{Identity, Principal, PrincipalLookup};
