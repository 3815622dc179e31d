mod account;
mod error;
mod users;

use axum::Router;

use crate::db::Database;

pub use error::{ApiError, ResultExt};
pub use users::UsersState;

/// Create the API router.
///
/// Login, refresh and logout under `/api/auth` are answered by the security
/// chain and have no routes here.
pub fn create_api_router(db: Database) -> Router {
    let users_state = users::UsersState { db };

    Router::new()
        .nest("/api/user", users::router(users_state))
        .nest("/api/auth", account::router())
}
