use axum::{extract::rejection::JsonRejection, extract::State, response::Response, Json};
use serde::{Deserialize, Serialize};
use tower_cookies::Cookies;
use tracing::info;

use crate::auth::password::{hash_password, verify_password, MIN_PASSWORD_LEN};
use crate::auth::AuthUser;
use crate::models::{NewUser, Role, User, UserSummary};
use crate::state::AppState;
use crate::utils::error::{AppError, AppResult};
use crate::utils::response::{created, empty_success, success};

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct SessionPayload {
    pub user: UserSummary,
    pub token: String,
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn start_session(state: &AppState, cookies: &Cookies, user: &User) -> AppResult<SessionPayload> {
    let token = state.tokens.issue(user)?;
    state.session_cookie().set(cookies, token.clone());
    Ok(SessionPayload {
        user: UserSummary::from(user),
        token,
    })
}

pub async fn register(
    State(state): State<AppState>,
    cookies: Cookies,
    body: Result<Json<RegisterRequest>, JsonRejection>,
) -> AppResult<Response> {
    let Json(req) = body?;
    let name = req.name.trim();
    let email = normalize_email(&req.email);

    if name.is_empty() || email.is_empty() || req.password.is_empty() {
        return Err(AppError::ValidationError(
            "Name, email and password are required".to_string(),
        ));
    }
    if req.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::ValidationError(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    if state.users.find_by_email(&email).await?.is_some() {
        return Err(AppError::Conflict("Email is already registered".to_string()));
    }

    let user = state
        .users
        .create(NewUser {
            name: name.to_string(),
            email,
            password_hash: hash_password(&req.password)?,
            role: Role::User,
        })
        .await?;

    info!(user_id = %user.id, "User registered");

    let payload = start_session(&state, &cookies, &user)?;
    Ok(created(payload, "Account created"))
}

pub async fn login(
    State(state): State<AppState>,
    cookies: Cookies,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> AppResult<Response> {
    let Json(req) = body?;
    let email = normalize_email(&req.email);

    if email.is_empty() || req.password.is_empty() {
        return Err(AppError::ValidationError(
            "Email and password are required".to_string(),
        ));
    }

    let invalid = || AppError::AuthError("Invalid credentials".to_string());

    let user = state.users.find_by_email(&email).await?.ok_or_else(invalid)?;
    if !verify_password(&req.password, &user.password_hash)? {
        return Err(invalid());
    }

    info!(user_id = %user.id, role = user.role.as_str(), "User logged in");

    let payload = start_session(&state, &cookies, &user)?;
    Ok(success(payload, "Logged in"))
}

pub async fn logout(State(state): State<AppState>, cookies: Cookies) -> Response {
    state.session_cookie().clear(&cookies);
    empty_success("Logged out")
}

/// Revokes every token issued to the caller so far.
pub async fn logout_all(
    user: AuthUser,
    State(state): State<AppState>,
    cookies: Cookies,
) -> AppResult<Response> {
    state.users.bump_token_version(user.id).await?;
    state.session_cookie().clear(&cookies);

    info!(user_id = %user.id, "All sessions revoked");
    Ok(empty_success("Logged out of all sessions"))
}

pub async fn me(user: AuthUser) -> Response {
    success(user, "Current user")
}
