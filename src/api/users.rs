//! Account registration.
//!
//! - POST `/api/user/signup` - Create an enabled user with a hashed password

use axum::{Json, Router, extract::State, http::StatusCode, response::IntoResponse, routing::post};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::error::{ApiError, ResultExt};
use crate::db::{Database, NewUser, UserRole};
use crate::password::{MIN_PASSWORD_LENGTH, hash_password};

const MAX_USERNAME_LENGTH: usize = 32;
const MAX_EMAIL_LENGTH: usize = 254;
const MAX_PASSWORD_LENGTH: usize = 128;

#[derive(Clone)]
pub struct UsersState {
    pub db: Database,
}

pub fn router(state: UsersState) -> Router {
    Router::new()
        .route("/signup", post(signup))
        .with_state(state)
}

#[derive(Deserialize)]
struct SignupRequest {
    email: String,
    username: String,
    password: String,
}

#[derive(Serialize)]
struct SignupResponse {
    uuid: String,
    username: String,
    email: String,
}

fn validate_username(username: &str) -> Result<(), ApiError> {
    if username.is_empty() {
        return Err(ApiError::bad_request("Username cannot be empty"));
    }

    if username.len() > MAX_USERNAME_LENGTH {
        return Err(ApiError::bad_request(format!(
            "Username cannot be longer than {} characters",
            MAX_USERNAME_LENGTH
        )));
    }

    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(ApiError::bad_request(
            "Username can only contain letters, numbers, and underscores",
        ));
    }

    Ok(())
}

fn validate_email(email: &str) -> Result<(), ApiError> {
    let valid = email.len() <= MAX_EMAIL_LENGTH
        && !email.chars().any(char::is_whitespace)
        && email
            .split_once('@')
            .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));

    if !valid {
        return Err(ApiError::bad_request("Invalid email address"));
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<(), ApiError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(ApiError::bad_request(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LENGTH
        )));
    }
    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(ApiError::bad_request(format!(
            "Password cannot be longer than {} bytes",
            MAX_PASSWORD_LENGTH
        )));
    }
    Ok(())
}

async fn signup(
    State(state): State<UsersState>,
    Json(payload): Json<SignupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let email = payload.email.trim();
    let username = payload.username.trim();

    validate_email(email)?;
    validate_username(username)?;
    validate_password(&payload.password)?;

    let taken = state
        .db
        .users()
        .is_taken(email, username)
        .await
        .db_err("Failed to check account availability")?;

    if taken {
        return Err(ApiError::conflict("Email or username is already taken"));
    }

    let password = payload.password;
    let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .internal_err("Password hashing task failed")?
        .internal_err("Failed to hash password")?;

    let uuid = uuid::Uuid::new_v4().to_string();

    let created = state
        .db
        .users()
        .create(NewUser {
            uuid: &uuid,
            username,
            email,
            password_hash: &password_hash,
            role: UserRole::User,
        })
        .await;

    match created {
        Ok(_) => {}
        // Lost a race against a concurrent signup
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            return Err(ApiError::conflict("Email or username is already taken"));
        }
        Err(e) => return Err(ApiError::db_error("Failed to create user", e)),
    }

    info!(user = %uuid, "User signed up");

    Ok((
        StatusCode::CREATED,
        Json(SignupResponse {
            uuid,
            username: username.to_string(),
            email: email.to_string(),
        }),
    ))
}
