use axum::{
    body::Bytes,
    extract::multipart::MultipartRejection,
    extract::{Multipart, State},
    response::Response,
};
use serde::Serialize;
use tracing::info;

use crate::auth::AuthUser;
use crate::state::AppState;
use crate::uploads::is_image;
use crate::utils::error::{AppError, AppResult};
use crate::utils::response::{created, success};

const FILE_FIELD: &str = "file";

#[derive(Debug, Serialize)]
pub struct UploadPayload {
    pub url: String,
}

struct ImageField {
    file_name: Option<String>,
    bytes: Bytes,
}

/// Pulls the `file` part out of the form and checks it is an image.
async fn read_image(mut multipart: Multipart) -> AppResult<ImageField> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        if !is_image(field.content_type()) {
            return Err(AppError::ValidationError("Only images are allowed".to_string()));
        }
        let file_name = field.file_name().map(str::to_string);
        let bytes = field.bytes().await?;
        if bytes.is_empty() {
            return Err(AppError::ValidationError("Uploaded file is empty".to_string()));
        }
        return Ok(ImageField { file_name, bytes });
    }

    Err(AppError::ValidationError("No file received".to_string()))
}

pub async fn upload_image(
    user: AuthUser,
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> AppResult<Response> {
    let image = read_image(multipart?).await?;
    let url = state
        .uploads
        .save_image(image.file_name.as_deref(), &image.bytes)
        .await?;

    info!(user_id = %user.id, url = %url, "Image uploaded");
    Ok(created(UploadPayload { url }, "File uploaded"))
}

pub async fn upload_avatar(
    user: AuthUser,
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> AppResult<Response> {
    let image = read_image(multipart?).await?;
    let url = state
        .uploads
        .save_avatar(user.id, image.file_name.as_deref(), &image.bytes)
        .await?;

    state.users.set_avatar(user.id, &url).await?;

    info!(user_id = %user.id, url = %url, "Avatar updated");
    Ok(success(UploadPayload { url }, "Avatar updated"))
}
