use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    extract::{Query, State},
    response::Response,
    Json,
};
use serde::Deserialize;

use crate::auth::AuthUser;
use crate::models::{ProfileChanges, Role, UserProfile};
use crate::state::AppState;
use crate::utils::error::{AppError, AppResult};
use crate::utils::response::success;

#[derive(Debug, Default, Deserialize)]
pub struct UsersQuery {
    pub role: Option<String>,
}

/// Admin directory, used to pick agents when browsing their queues.
pub async fn list_users(
    user: AuthUser,
    State(state): State<AppState>,
    query: Result<Query<UsersQuery>, QueryRejection>,
) -> AppResult<Response> {
    let Query(query) = query?;

    if user.role != Role::Admin {
        return Err(AppError::Forbidden("Only admins can list users".to_string()));
    }

    let role = match query.role.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => Some(raw.parse::<Role>().map_err(AppError::ValidationError)?),
    };

    let users = state.users.list(role).await?;
    Ok(success(users, "Users retrieved"))
}

pub async fn get_profile(user: AuthUser, State(state): State<AppState>) -> AppResult<Response> {
    let profile = state
        .users
        .find_by_id(user.id)
        .await?
        .map(UserProfile::from)
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    Ok(success(profile, "Profile retrieved"))
}

pub async fn update_profile(
    user: AuthUser,
    State(state): State<AppState>,
    body: Result<Json<ProfileChanges>, JsonRejection>,
) -> AppResult<Response> {
    let Json(mut changes) = body?;

    if let Some(name) = changes.name.as_mut() {
        *name = name.trim().to_string();
        if name.is_empty() {
            return Err(AppError::ValidationError("Name cannot be empty".to_string()));
        }
    }

    let updated = state.users.update_profile(user.id, changes).await?;
    Ok(success(UserProfile::from(updated), "Profile updated"))
}
