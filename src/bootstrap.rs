use tracing::info;

use crate::auth::password::hash_password;
use crate::config::SeedUser;
use crate::models::{NewUser, User};
use crate::state::AppState;
use crate::utils::error::AppResult;

/// Registration only ever creates USER accounts, so staff accounts are
/// provisioned here at startup. Re-running refreshes name, password and role.
pub async fn seed_user(state: &AppState, seed: &SeedUser) -> AppResult<User> {
    let user = state
        .users
        .upsert(NewUser {
            name: seed.name.clone(),
            email: seed.email.clone(),
            password_hash: hash_password(&seed.password)?,
            role: seed.role,
        })
        .await?;

    info!(user_id = %user.id, email = %user.email, role = user.role.as_str(), "Seed user ready");
    Ok(user)
}
