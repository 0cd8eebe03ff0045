//! Storage seams. Handlers only see these traits; the Postgres
//! implementations live in [`postgres`].

pub mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use crate::lifecycle::Scope;
use crate::models::{
    CommentView, NewComment, NewTicket, NewUser, ProfileChanges, Role, Ticket, TicketChanges,
    TicketFilter, TicketView, User, UserSummary,
};
use crate::utils::error::AppResult;

pub use postgres::{PgCommentRepository, PgHealthCheck, PgTicketRepository, PgUserRepository};

#[async_trait]
pub trait HealthCheckRepository: Send + Sync {
    async fn check_db(&self) -> bool;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Fails with a conflict when the email is taken.
    async fn create(&self, new_user: NewUser) -> AppResult<User>;
    /// Creates the account or overwrites name, password and role of the existing one.
    async fn upsert(&self, new_user: NewUser) -> AppResult<User>;
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>>;
    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>>;
    async fn list(&self, role: Option<Role>) -> AppResult<Vec<UserSummary>>;
    async fn update_profile(&self, id: Uuid, changes: ProfileChanges) -> AppResult<User>;
    async fn set_avatar(&self, id: Uuid, avatar_url: &str) -> AppResult<User>;
    async fn bump_token_version(&self, id: Uuid) -> AppResult<()>;
}

#[async_trait]
pub trait TicketRepository: Send + Sync {
    async fn create(&self, new_ticket: NewTicket) -> AppResult<Ticket>;
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Ticket>>;
    async fn find_view(&self, id: Uuid) -> AppResult<Option<TicketView>>;
    /// Non-closed tickets inside `scope`, narrowed by `filter`, newest first.
    async fn list_open(&self, scope: Scope, filter: &TicketFilter) -> AppResult<Vec<TicketView>>;
    async fn list_closed_by_creator(&self, creator_id: Uuid) -> AppResult<Vec<TicketView>>;
    /// Sets the assignee only if the ticket is still unassigned (or already
    /// assigned to `agent_id`) and not closed. `None` when the guard failed.
    async fn claim(&self, id: Uuid, agent_id: Uuid) -> AppResult<Option<Ticket>>;
    /// Applies status/priority changes unless the ticket is closed.
    async fn update(&self, id: Uuid, changes: &TicketChanges) -> AppResult<Option<Ticket>>;
    /// RESOLVED -> CLOSED. `None` when the ticket was not resolved.
    async fn close(&self, id: Uuid) -> AppResult<Option<Ticket>>;
}

#[async_trait]
pub trait CommentRepository: Send + Sync {
    /// Conflict when the ticket is CLOSED at write time.
    async fn create(&self, new_comment: NewComment) -> AppResult<CommentView>;
    /// Oldest first.
    async fn list_for_ticket(&self, ticket_id: Uuid) -> AppResult<Vec<CommentView>>;
}
