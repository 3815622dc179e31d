//! Identity context types.

use serde::Serialize;

use crate::db::{User, UserRole};
use crate::jwt::Claims;

/// The authenticated principal behind a verified token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    #[serde(skip)]
    pub id: i64,
    pub uuid: String,
    pub username: String,
    pub email: String,
    pub role: UserRole,
}

impl From<User> for Principal {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            uuid: user.uuid,
            username: user.username,
            email: user.email,
            role: user.role,
        }
    }
}

/// Result of loading the principal for a token subject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrincipalLookup {
    Found(Principal),
    /// No enabled user with that subject
    NotFound,
    /// The user store could not answer
    Failed(String),
}

/// Per-request identity context. Lives in the request extensions and is
/// dropped with the request.
#[derive(Debug, Clone)]
pub struct Identity {
    pub principal: Principal,
    /// Claims of the token that established this identity
    pub claims: Claims,
}

impl Identity {
    pub fn subject(&self) -> &str {
        &self.claims.sub
    }
}
