//! Token endpoints handled inside the security chain.
//!
//! - POST `/api/auth/login` - Check email/password, issue access + refresh token
//! - POST `/api/auth/refresh` - Rotate the refresh token from the cookie
//! - POST `/api/auth/logout` - Revoke the refresh token and clear the cookie

use axum::{
    Json,
    extract::{FromRequest, Request},
    http::{HeaderMap, Method, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use super::authorization::load_principal;
use super::bearer::strip_scheme;
use super::chain::{Flow, SecurityState};
use super::cookie::{REFRESH_COOKIE_NAME, clear_cookie, get_cookie, refresh_token_cookie};
use super::errors::{ApiAuthError, AuthErrorKind};
use super::ip::extract_client_ip;
use super::types::PrincipalLookup;
use crate::api::{ApiError, ResultExt};
use crate::password::verify_password;

pub const LOGIN_PATH: &str = "/api/auth/login";
pub const REFRESH_PATH: &str = "/api/auth/refresh";
pub const LOGOUT_PATH: &str = "/api/auth/logout";

enum Endpoint {
    Login,
    Refresh,
    Logout,
}

impl Endpoint {
    fn of(request: &Request) -> Option<Self> {
        if request.method() != Method::POST {
            return None;
        }
        match request.uri().path() {
            LOGIN_PATH => Some(Endpoint::Login),
            REFRESH_PATH => Some(Endpoint::Refresh),
            LOGOUT_PATH => Some(Endpoint::Logout),
            _ => None,
        }
    }
}

/// Answer token endpoint requests; everything else continues down the chain.
pub async fn intercept(state: &SecurityState, request: Request) -> Flow {
    let response = match Endpoint::of(&request) {
        Some(Endpoint::Login) => login(state, request).await.into_response(),
        Some(Endpoint::Refresh) => match refresh(state, request.headers()).await {
            Ok(response) | Err(response) => response,
        },
        Some(Endpoint::Logout) => logout(state, request.headers()).await,
        None => return Flow::Continue(request),
    };
    Flow::Respond(response)
}

#[derive(Deserialize)]
struct LoginRequest {
    email: String,
    password: String,
}

#[derive(Serialize)]
struct TokenResponse {
    access_token: String,
    token_type: &'static str,
    expires_in: u64,
    username: String,
}

async fn login(state: &SecurityState, request: Request) -> Result<Response, ApiError> {
    let client_ip = extract_client_ip(&request, state.ip_header.as_ref());
    if !state.rate_limit.check_login(client_ip.as_deref()) {
        warn!(ip = ?client_ip, "Login rate limit exceeded");
        return Err(ApiError::too_many_requests(
            "Too many login attempts. Please wait before trying again.",
        ));
    }

    let Json(payload) = Json::<LoginRequest>::from_request(request, &())
        .await
        .map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;

    let email = payload.email.trim();
    let user = state
        .db
        .users()
        .get_by_email(email)
        .await
        .db_err("Failed to get user")?;

    let Some(user) = user.filter(|u| u.enabled) else {
        info!(ip = ?client_ip, "Login for unknown or disabled account");
        return Err(ApiError::unauthorized("Invalid email or password"));
    };

    let stored_hash = user.password_hash.clone();
    let password = payload.password;
    let verified = tokio::task::spawn_blocking(move || verify_password(&password, &stored_hash))
        .await
        .internal_err("Password verification task failed")?;

    if !verified {
        info!(user = %user.uuid, ip = ?client_ip, "Login with wrong password");
        return Err(ApiError::unauthorized("Invalid email or password"));
    }

    info!(user = %user.uuid, "Login succeeded");
    issue_tokens(state, &user.uuid, &user.username).await
}

/// Sign an access/refresh pair and record the refresh token as active.
async fn issue_tokens(
    state: &SecurityState,
    user_uuid: &str,
    username: &str,
) -> Result<Response, ApiError> {
    let access = state
        .jwt
        .generate_access_token(user_uuid, username)
        .internal_err("Failed to generate access token")?;
    let refresh = state
        .jwt
        .generate_refresh_token(user_uuid, username)
        .internal_err("Failed to generate refresh token")?;

    state
        .db
        .revocations()
        .activate_refresh_token(&refresh.token, user_uuid, refresh.duration)
        .await
        .db_err("Failed to store refresh token")?;

    let cookie = refresh_token_cookie(&refresh.token, refresh.duration, state.secure_cookies);
    let bearer = format!("Bearer {}", access.token);

    Ok((
        [(header::AUTHORIZATION, bearer), (header::SET_COOKIE, cookie)],
        Json(TokenResponse {
            access_token: access.token,
            token_type: "Bearer",
            expires_in: access.duration,
            username: username.to_string(),
        }),
    )
        .into_response())
}

async fn refresh(state: &SecurityState, headers: &HeaderMap) -> Result<Response, Response> {
    let rejected = |kind: AuthErrorKind| {
        ApiAuthError::new(kind)
            .clearing_cookie(state.secure_cookies)
            .into_response()
    };

    let raw = get_cookie(headers, REFRESH_COOKIE_NAME)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiAuthError::not_authenticated().into_response())?;
    let token = strip_scheme(raw);

    let claims = state
        .jwt
        .validate_refresh_token(token)
        .map_err(|_| rejected(AuthErrorKind::InvalidToken))?;

    let subject = state
        .db
        .revocations()
        .refresh_token_subject(token)
        .await
        .db_err("Failed to check refresh token")
        .map_err(IntoResponse::into_response)?;

    if subject.as_deref() != Some(claims.sub.as_str()) {
        debug!(subject = %claims.sub, "Refresh with inactive token");
        return Err(rejected(AuthErrorKind::TokenRevoked));
    }

    // Rotation: the presented token is spent whatever happens next. Only the
    // request whose delete removed the entry may issue a new pair.
    let revoked = state
        .db
        .revocations()
        .revoke_refresh_token(token)
        .await
        .db_err("Failed to revoke refresh token")
        .map_err(IntoResponse::into_response)?;

    if !revoked {
        debug!(subject = %claims.sub, "Refresh token already rotated");
        return Err(rejected(AuthErrorKind::TokenRevoked));
    }

    let principal = match load_principal(&state.db, &claims.sub).await {
        PrincipalLookup::Found(principal) => principal,
        PrincipalLookup::NotFound => return Err(rejected(AuthErrorKind::NotAuthenticated)),
        PrincipalLookup::Failed(e) => {
            error!(subject = %claims.sub, error = %e, "Principal lookup failed during refresh");
            return Err(ApiError::internal("Database error").into_response());
        }
    };

    info!(user = %principal.uuid, "Refresh token rotated");
    issue_tokens(state, &principal.uuid, &principal.username)
        .await
        .map_err(IntoResponse::into_response)
}

async fn logout(state: &SecurityState, headers: &HeaderMap) -> Response {
    if let Some(raw) = get_cookie(headers, REFRESH_COOKIE_NAME).filter(|v| !v.is_empty()) {
        match state
            .db
            .revocations()
            .revoke_refresh_token(strip_scheme(raw))
            .await
        {
            Ok(removed) => debug!(removed, "Logout"),
            Err(e) => error!(error = %e, "Failed to revoke refresh token on logout"),
        }
    }

    (
        StatusCode::NO_CONTENT,
        [(
            header::SET_COOKIE,
            clear_cookie(REFRESH_COOKIE_NAME, state.secure_cookies),
        )],
    )
        .into_response()
}
