use axum::{
    extract::rejection::{JsonRejection, PathRejection},
    extract::{Path, State},
    response::Response,
    Json,
};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::handlers::tickets::load_ticket;
use crate::lifecycle;
use crate::models::NewComment;
use crate::state::AppState;
use crate::utils::error::{AppError, AppResult};
use crate::utils::response::{created, success};

#[derive(Debug, Deserialize)]
pub struct CreateCommentRequest {
    #[serde(default)]
    pub content: String,
    /// URL previously returned by the upload endpoint.
    #[serde(alias = "imageUrl")]
    pub image_url: Option<String>,
}

pub async fn list_comments(
    user: AuthUser,
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> AppResult<Response> {
    let Path(ticket_id) = path?;

    let ticket = load_ticket(&state, ticket_id).await?;
    lifecycle::ensure_can_view(&user, &ticket)?;

    let comments = state.comments.list_for_ticket(ticket_id).await?;
    Ok(success(comments, "Comments retrieved"))
}

pub async fn add_comment(
    user: AuthUser,
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
    body: Result<Json<CreateCommentRequest>, JsonRejection>,
) -> AppResult<Response> {
    let Path(ticket_id) = path?;
    let Json(req) = body?;

    let content = req.content.trim();
    if content.is_empty() {
        return Err(AppError::ValidationError("Comment cannot be empty".to_string()));
    }

    let ticket = load_ticket(&state, ticket_id).await?;
    lifecycle::ensure_can_comment(&user, &ticket)?;

    let image_url = req
        .image_url
        .map(|url| url.trim().to_string())
        .filter(|url| !url.is_empty());

    let comment = state
        .comments
        .create(NewComment {
            ticket_id,
            author_id: user.id,
            content: content.to_string(),
            image_url,
        })
        .await?;

    info!(
        ticket_id = %ticket_id,
        comment_id = %comment.id,
        author_id = %user.id,
        with_image = comment.image_url.is_some(),
        "Comment added"
    );
    Ok(created(comment, "Comment added"))
}
