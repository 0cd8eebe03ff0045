pub mod password;
pub mod session;
pub mod token;

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts, HeaderMap},
};
use serde::Serialize;
use tower_cookies::Cookies;
use uuid::Uuid;

use crate::models::{Role, User};
use crate::state::AppState;
use crate::utils::error::AppError;

pub use session::{SessionCookie, SESSION_COOKIE};
pub use token::{Claims, TokenService};

/// The caller behind a verified session. Role is taken from the user row,
/// not the token, so promotions and demotions apply immediately.
#[derive(Debug, Clone, Serialize)]
pub struct AuthUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl From<&User> for AuthUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
        }
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if scheme.eq_ignore_ascii_case("bearer") && !token.trim().is_empty() {
        Some(token.trim().to_string())
    } else {
        None
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);

        let token = match bearer_token(&parts.headers) {
            Some(token) => token,
            None => {
                let cookies = Cookies::from_request_parts(parts, &state)
                    .await
                    .map_err(|(_, msg)| AppError::InternalServerError(msg.to_string()))?;
                cookies
                    .get(SESSION_COOKIE)
                    .map(|c| c.value().to_string())
                    .filter(|v| !v.is_empty())
                    .ok_or_else(|| AppError::AuthError("Not authenticated".to_string()))?
            }
        };

        let claims = state.tokens.verify(&token)?;

        let user = state
            .users
            .find_by_id(claims.sub)
            .await?
            .ok_or_else(|| AppError::AuthError("Not authenticated".to_string()))?;

        if user.token_version != claims.ver {
            return Err(AppError::AuthError("Session has been revoked".to_string()));
        }

        Ok(AuthUser::from(&user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_bearer_token_parsing() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(bearer_token(&headers).as_deref(), Some("abc.def"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("bearer xyz"));
        assert_eq!(bearer_token(&headers).as_deref(), Some("xyz"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic Zm9vOmJhcg=="));
        assert_eq!(bearer_token(&headers), None);
    }
}
