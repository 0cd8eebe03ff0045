use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Comment {
    pub id: Uuid,
    pub ticket_id: Uuid,
    pub author_id: Uuid,
    pub content: String,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentAuthor {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentView {
    pub id: Uuid,
    pub content: String,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub author: CommentAuthor,
}

impl CommentView {
    pub fn new(comment: Comment, author_name: String) -> Self {
        Self {
            id: comment.id,
            content: comment.content,
            image_url: comment.image_url,
            created_at: comment.created_at,
            author: CommentAuthor { name: author_name },
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewComment {
    pub ticket_id: Uuid,
    pub author_id: Uuid,
    pub content: String,
    pub image_url: Option<String>,
}
