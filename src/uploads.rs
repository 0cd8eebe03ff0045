use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::info;
use uuid::Uuid;

use crate::utils::error::AppResult;

/// Public prefix under which stored files are served.
pub const PUBLIC_PREFIX: &str = "/uploads";

const AVATAR_DIR: &str = "avatars";
const DEFAULT_EXTENSION: &str = "png";

/// Writes uploaded images below a root directory and hands back their public URL.
#[derive(Debug, Clone)]
pub struct UploadStore {
    root: PathBuf,
}

impl UploadStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Stores an attachment under a random name.
    pub async fn save_image(&self, original_name: Option<&str>, bytes: &[u8]) -> AppResult<String> {
        let file_name = format!(
            "{}.{}",
            Uuid::new_v4().simple(),
            extension_of(original_name)
        );
        self.write(&file_name, bytes).await
    }

    /// Stores a user's avatar, replacing any previous one with the same extension.
    pub async fn save_avatar(
        &self,
        user_id: Uuid,
        original_name: Option<&str>,
        bytes: &[u8],
    ) -> AppResult<String> {
        let file_name = format!(
            "{}/avatar-{}.{}",
            AVATAR_DIR,
            user_id,
            extension_of(original_name)
        );
        self.write(&file_name, bytes).await
    }

    async fn write(&self, relative: &str, bytes: &[u8]) -> AppResult<String> {
        let path = self.root.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&path, bytes).await?;

        info!(path = %path.display(), size = bytes.len(), "Stored upload");
        Ok(format!("{}/{}", PUBLIC_PREFIX, relative))
    }
}

pub fn is_image(content_type: Option<&str>) -> bool {
    content_type.is_some_and(|ct| ct.starts_with("image/"))
}

/// Extensions `ServeDir` will hand back with an image content type.
const IMAGE_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "gif", "webp"];

/// Lowercased extension of the client file name when it is a known image
/// type, `png` otherwise.
fn extension_of(original_name: Option<&str>) -> String {
    original_name
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or_else(|| DEFAULT_EXTENSION.to_string())
}
