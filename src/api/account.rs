//! Identity of the caller.
//!
//! - GET `/api/auth/me` - Principal and token details of the current identity

use axum::{Json, Router, routing::get};
use serde::Serialize;

use crate::auth::{Authenticated, Principal};
use crate::jwt::TokenType;

pub fn router() -> Router {
    Router::new().route("/me", get(me))
}

#[derive(Serialize)]
struct MeResponse {
    #[serde(flatten)]
    principal: Principal,
    subject: String,
    token_type: TokenType,
    expires_at: u64,
}

async fn me(Authenticated(identity): Authenticated) -> Json<MeResponse> {
    Json(MeResponse {
        subject: identity.claims.sub,
        token_type: identity.claims.token_type,
        expires_at: identity.claims.exp,
        principal: identity.principal,
    })
}
