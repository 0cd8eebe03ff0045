//! Ticket lifecycle rules: who may see a ticket, and which transitions each
//! role may drive. Handlers call these after loading the row and before
//! writing anything back.

use uuid::Uuid;

use crate::auth::AuthUser;
use crate::models::{Role, Ticket, TicketChanges, TicketStatus};
use crate::utils::error::{AppError, AppResult};

/// The slice of open tickets a caller is allowed to list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Tickets the caller filed.
    Creator(Uuid),
    /// Unassigned tickets plus the ones already assigned to this agent.
    AgentQueue(Uuid),
    All,
}

impl Scope {
    pub fn for_user(user: &AuthUser) -> Self {
        match user.role {
            Role::User => Scope::Creator(user.id),
            Role::Agent => Scope::AgentQueue(user.id),
            Role::Admin => Scope::All,
        }
    }

    pub fn admits(&self, ticket: &Ticket) -> bool {
        match *self {
            Scope::Creator(id) => ticket.creator_id == id,
            Scope::AgentQueue(id) => ticket.assignee_id.map_or(true, |a| a == id),
            Scope::All => true,
        }
    }
}

fn ensure_open(ticket: &Ticket) -> AppResult<()> {
    if ticket.is_closed() {
        return Err(AppError::Conflict("Ticket is closed".to_string()));
    }
    Ok(())
}

/// Read access for detail pages and comment threads. Staff may open any
/// ticket; a plain user only their own.
pub fn ensure_can_view(user: &AuthUser, ticket: &Ticket) -> AppResult<()> {
    if user.role == Role::User && ticket.creator_id != user.id {
        return Err(AppError::Forbidden("Not allowed to access this ticket".to_string()));
    }
    Ok(())
}

pub fn ensure_can_claim(user: &AuthUser, ticket: &Ticket) -> AppResult<()> {
    if !user.role.is_staff() {
        return Err(AppError::Forbidden("Only agents can claim tickets".to_string()));
    }
    ensure_open(ticket)?;
    match ticket.assignee_id {
        Some(assignee) if assignee != user.id => Err(AppError::Conflict(
            "Ticket is already assigned to another agent".to_string(),
        )),
        _ => Ok(()),
    }
}

pub fn ensure_can_edit(user: &AuthUser, ticket: &Ticket, changes: &TicketChanges) -> AppResult<()> {
    if !user.role.is_staff() {
        return Err(AppError::Forbidden("Not allowed to edit tickets".to_string()));
    }
    ensure_open(ticket)?;
    if user.role == Role::Agent && !Scope::AgentQueue(user.id).admits(ticket) {
        return Err(AppError::Forbidden(
            "Ticket is assigned to another agent".to_string(),
        ));
    }
    if changes.status == Some(TicketStatus::Closed) {
        return Err(AppError::Forbidden(
            "Closing is confirmed by the requester".to_string(),
        ));
    }
    Ok(())
}

/// Closing is the requester's confirmation, so staff never close, even
/// tickets they filed themselves.
pub fn ensure_can_close(user: &AuthUser, ticket: &Ticket) -> AppResult<()> {
    if user.role != Role::User {
        return Err(AppError::Forbidden(
            "Only requesters can confirm closure".to_string(),
        ));
    }
    if ticket.creator_id != user.id {
        return Err(AppError::Forbidden(
            "Only the requester can close this ticket".to_string(),
        ));
    }
    if ticket.status != TicketStatus::Resolved {
        return Err(AppError::ValidationError(
            "Only resolved tickets can be closed".to_string(),
        ));
    }
    Ok(())
}

pub fn ensure_can_comment(user: &AuthUser, ticket: &Ticket) -> AppResult<()> {
    ensure_can_view(user, ticket)?;
    ensure_open(ticket)
}
