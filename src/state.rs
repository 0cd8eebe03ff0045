use std::sync::Arc;

use chrono::Duration;
use sqlx::PgPool;

use crate::auth::{SessionCookie, TokenService};
use crate::config::Config;
use crate::repository::{
    CommentRepository, HealthCheckRepository, PgCommentRepository, PgHealthCheck,
    PgTicketRepository, PgUserRepository, TicketRepository, UserRepository,
};
use crate::uploads::UploadStore;

/// Everything a handler needs, cloned into each request.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub health: Arc<dyn HealthCheckRepository>,
    pub users: Arc<dyn UserRepository>,
    pub tickets: Arc<dyn TicketRepository>,
    pub comments: Arc<dyn CommentRepository>,
    pub tokens: Arc<TokenService>,
    pub uploads: Arc<UploadStore>,
}

/// Storage backends wired into [`AppState`].
pub struct Repositories {
    pub health: Arc<dyn HealthCheckRepository>,
    pub users: Arc<dyn UserRepository>,
    pub tickets: Arc<dyn TicketRepository>,
    pub comments: Arc<dyn CommentRepository>,
}

impl Repositories {
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            health: Arc::new(PgHealthCheck::new(pool.clone())),
            users: Arc::new(PgUserRepository::new(pool.clone())),
            tickets: Arc::new(PgTicketRepository::new(pool.clone())),
            comments: Arc::new(PgCommentRepository::new(pool)),
        }
    }
}

impl AppState {
    pub fn new(config: Config, repos: Repositories) -> Self {
        let tokens = TokenService::new(
            &config.auth_secret,
            Duration::days(config.session_ttl_days),
        );
        let uploads = UploadStore::new(config.upload_dir.clone());

        Self {
            config: Arc::new(config),
            health: repos.health,
            users: repos.users,
            tickets: repos.tickets,
            comments: repos.comments,
            tokens: Arc::new(tokens),
            uploads: Arc::new(uploads),
        }
    }

    pub fn session_cookie(&self) -> SessionCookie {
        SessionCookie {
            secure: self.config.production,
            max_age_secs: self.tokens.ttl().num_seconds(),
        }
    }
}
