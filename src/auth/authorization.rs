//! Bearer token verification and identity installation.
//!
//! Fails open: a missing, invalid or revoked token leaves the request
//! anonymous and the access rule further down the chain decides. An invalid
//! token additionally gets its refresh cookie cleared and its revocation entry
//! purged.

use axum::http::HeaderMap;
use tracing::{debug, error, info, warn};

use super::bearer::{PresentedToken, extract_token};
use super::chain::ResponseEffects;
use super::cookie::{REFRESH_COOKIE_NAME, clear_cookie};
use super::state::HasAuthBackend;
use super::types::{Identity, Principal, PrincipalLookup};
use crate::db::Database;
use crate::jwt::{Claims, JwtError, TokenType};

/// Why a presented token was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Bad signature, malformed or expired
    Invalid,
    /// Well-formed refresh token without an active revocation entry
    Revoked,
}

/// What the authorization step concluded for one request.
#[derive(Debug, Clone)]
pub enum AuthorizationOutcome {
    /// No token presented
    Anonymous,
    /// Token refused; cookie cleared and store entry purged
    Rejected(RejectReason),
    /// The revocation store could not be consulted
    StoreUnavailable,
    /// Token valid but no enabled user for its subject
    PrincipalNotFound,
    /// Token valid but the user lookup failed
    PrincipalLookupFailed,
    Authenticated(Identity),
}

impl AuthorizationOutcome {
    pub fn identity(&self) -> Option<&Identity> {
        match self {
            Self::Authenticated(identity) => Some(identity),
            _ => None,
        }
    }

    pub fn into_identity(self) -> Option<Identity> {
        match self {
            Self::Authenticated(identity) => Some(identity),
            _ => None,
        }
    }
}

/// Verify the bearer token of a request and resolve its principal.
pub async fn authorize<S>(
    state: &S,
    headers: &HeaderMap,
    effects: &mut ResponseEffects,
) -> AuthorizationOutcome
where
    S: HasAuthBackend + Send + Sync,
{
    let Some(presented) = extract_token(headers) else {
        return AuthorizationOutcome::Anonymous;
    };

    let claims = match verify(state, &presented).await {
        Ok(claims) => claims,
        Err(Verification::Rejected(reason)) => {
            reject(state, &presented, reason, effects).await;
            return AuthorizationOutcome::Rejected(reason);
        }
        Err(Verification::StoreUnavailable) => return AuthorizationOutcome::StoreUnavailable,
    };

    match load_principal(state.db(), &claims.sub).await {
        PrincipalLookup::Found(principal) => {
            debug!(subject = %claims.sub, "Identity established");
            AuthorizationOutcome::Authenticated(Identity { principal, claims })
        }
        PrincipalLookup::NotFound => {
            info!(subject = %claims.sub, "Token subject has no enabled user");
            AuthorizationOutcome::PrincipalNotFound
        }
        PrincipalLookup::Failed(e) => {
            warn!(subject = %claims.sub, error = %e, "Principal lookup failed");
            AuthorizationOutcome::PrincipalLookupFailed
        }
    }
}

enum Verification {
    Rejected(RejectReason),
    StoreUnavailable,
}

async fn verify<S>(state: &S, presented: &PresentedToken) -> Result<Claims, Verification>
where
    S: HasAuthBackend + Send + Sync,
{
    let token = presented.value();

    let claims = state.jwt().validate_token(token).map_err(|e| {
        match &e {
            JwtError::Decoding(inner) => {
                debug!(source = ?presented.source, error = %inner, "Token failed verification")
            }
            other => warn!(source = ?presented.source, error = %other, "Token failed verification"),
        }
        Verification::Rejected(RejectReason::Invalid)
    })?;

    if claims.token_type == TokenType::Refresh {
        match state.db().revocations().refresh_token_subject(token).await {
            Ok(Some(subject)) if subject == claims.sub => {}
            Ok(_) => {
                debug!(subject = %claims.sub, "Refresh token is not active");
                return Err(Verification::Rejected(RejectReason::Revoked));
            }
            Err(e) => {
                error!(error = %e, "Failed to check refresh token");
                return Err(Verification::StoreUnavailable);
            }
        }
    }

    Ok(claims)
}

/// Clear the client's refresh cookie and purge the token's store entry.
async fn reject<S>(
    state: &S,
    presented: &PresentedToken,
    reason: RejectReason,
    effects: &mut ResponseEffects,
) where
    S: HasAuthBackend + Send + Sync,
{
    info!(source = ?presented.source, reason = ?reason, "Rejected bearer token");

    effects.set_cookie(
        REFRESH_COOKIE_NAME,
        clear_cookie(REFRESH_COOKIE_NAME, state.secure_cookies()),
    );

    if let Err(e) = state
        .db()
        .revocations()
        .revoke_refresh_token(presented.value())
        .await
    {
        error!(error = %e, "Failed to purge refresh token entry");
    }
}

/// Load the enabled user behind a token subject.
pub async fn load_principal(db: &Database, subject: &str) -> PrincipalLookup {
    match db.users().get_by_uuid(subject).await {
        Ok(Some(user)) if user.enabled => PrincipalLookup::Found(Principal::from(user)),
        Ok(_) => PrincipalLookup::NotFound,
        Err(e) => PrincipalLookup::Failed(e.to_string()),
    }
}
