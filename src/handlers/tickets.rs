use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    extract::{Path, Query, State},
    response::Response,
    Json,
};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::lifecycle::{self, Scope};
use crate::models::{
    Category, NewTicket, Priority, Ticket, TicketChanges, TicketDetail, TicketFilter, TicketView,
};
use crate::state::AppState;
use crate::utils::error::{AppError, AppResult};
use crate::utils::response::{created, success};

#[derive(Debug, Deserialize)]
pub struct CreateTicketRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub priority: Option<Priority>,
    pub category: Option<Category>,
}

pub(crate) async fn load_ticket(state: &AppState, id: Uuid) -> AppResult<Ticket> {
    state
        .tickets
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Ticket not found".to_string()))
}

async fn load_view(state: &AppState, id: Uuid) -> AppResult<TicketView> {
    state
        .tickets
        .find_view(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Ticket not found".to_string()))
}

/// Open tickets the caller may see, newest first.
pub async fn list_tickets(
    user: AuthUser,
    State(state): State<AppState>,
    query: Result<Query<TicketFilter>, QueryRejection>,
) -> AppResult<Response> {
    let Query(filter) = query?;
    let tickets = state
        .tickets
        .list_open(Scope::for_user(&user), &filter)
        .await?;
    Ok(success(tickets, "Tickets retrieved"))
}

/// The caller's own closed tickets.
pub async fn ticket_history(user: AuthUser, State(state): State<AppState>) -> AppResult<Response> {
    let tickets = state.tickets.list_closed_by_creator(user.id).await?;
    Ok(success(tickets, "Ticket history retrieved"))
}

pub async fn create_ticket(
    user: AuthUser,
    State(state): State<AppState>,
    body: Result<Json<CreateTicketRequest>, JsonRejection>,
) -> AppResult<Response> {
    let Json(req) = body?;
    let title = req.title.trim();
    let description = req.description.trim();

    if title.is_empty() || description.is_empty() {
        return Err(AppError::ValidationError(
            "Title and description are required".to_string(),
        ));
    }

    let ticket = state
        .tickets
        .create(NewTicket {
            title: title.to_string(),
            description: description.to_string(),
            priority: req.priority.unwrap_or_default(),
            category: req.category.unwrap_or_default(),
            creator_id: user.id,
        })
        .await?;

    info!(ticket_id = %ticket.id, creator_id = %user.id, priority = ?ticket.priority, "Ticket created");
    Ok(created(ticket, "Ticket created"))
}

pub async fn get_ticket(
    user: AuthUser,
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> AppResult<Response> {
    let Path(id) = path?;
    let view = load_view(&state, id).await?;
    lifecycle::ensure_can_view(&user, &view.ticket)?;

    let comments = state.comments.list_for_ticket(id).await?;
    Ok(success(TicketDetail { view, comments }, "Ticket retrieved"))
}

/// Staff edit of status and priority.
pub async fn update_ticket(
    user: AuthUser,
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
    body: Result<Json<TicketChanges>, JsonRejection>,
) -> AppResult<Response> {
    let Path(id) = path?;
    let Json(changes) = body?;

    let ticket = load_ticket(&state, id).await?;
    lifecycle::ensure_can_edit(&user, &ticket, &changes)?;

    if changes.is_empty() {
        return Err(AppError::ValidationError(
            "Nothing to update: provide status or priority".to_string(),
        ));
    }

    let updated = state
        .tickets
        .update(id, &changes)
        .await?
        .ok_or_else(|| AppError::Conflict("Ticket is closed".to_string()))?;

    info!(
        ticket_id = %id,
        actor_id = %user.id,
        from = ?ticket.status,
        to = ?updated.status,
        priority = ?updated.priority,
        "Ticket updated"
    );
    Ok(success(updated, "Ticket updated"))
}

/// An agent or admin takes an unassigned ticket.
pub async fn claim_ticket(
    user: AuthUser,
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> AppResult<Response> {
    let Path(id) = path?;

    let ticket = load_ticket(&state, id).await?;
    lifecycle::ensure_can_claim(&user, &ticket)?;

    // Another agent may have won between the read and this write.
    state.tickets.claim(id, user.id).await?.ok_or_else(|| {
        AppError::Conflict("Ticket is already assigned to another agent".to_string())
    })?;

    info!(ticket_id = %id, agent_id = %user.id, "Ticket claimed");

    let view = load_view(&state, id).await?;
    Ok(success(view, "Ticket assigned"))
}

/// The requester confirms a resolved ticket.
pub async fn close_ticket(
    user: AuthUser,
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> AppResult<Response> {
    let Path(id) = path?;

    let ticket = load_ticket(&state, id).await?;
    lifecycle::ensure_can_close(&user, &ticket)?;

    let closed = state.tickets.close(id).await?.ok_or_else(|| {
        AppError::ValidationError("Only resolved tickets can be closed".to_string())
    })?;

    info!(ticket_id = %id, creator_id = %user.id, "Ticket closed");
    Ok(success(closed, "Ticket closed"))
}
