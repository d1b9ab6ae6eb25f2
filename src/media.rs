use std::path::PathBuf;

use base64::{engine::general_purpose::STANDARD, Engine};
use log::{error, info, warn};
use uuid::Uuid;

use crate::{
    constants::{IMAGE_EXTENSIONS, MEDIA_URL, RECIPE_IMAGE_DIR},
    error::ApiError,
};

#[derive(Debug, Clone, PartialEq)]
pub struct DecodedImage {
    pub bytes: Vec<u8>,
    pub extension: String,
}

/// Decodes `data:image/<ext>;base64,<payload>`.
pub fn decode_data_uri(value: &str) -> Result<DecodedImage, ApiError> {
    let invalid = || ApiError::validation("Image must be a base64 encoded data URI");

    let rest = value.trim().strip_prefix("data:image/").ok_or_else(invalid)?;
    let (extension, payload) = rest.split_once(";base64,").ok_or_else(invalid)?;
    let extension = extension.to_ascii_lowercase();

    if !IMAGE_EXTENSIONS.contains(&extension.as_str()) {
        return Err(ApiError::validation(format!(
            "Unsupported image type {extension}"
        )));
    }

    let bytes = STANDARD.decode(payload.trim()).map_err(|_| invalid())?;
    if bytes.is_empty() {
        return Err(ApiError::validation("Image may not be empty"));
    }

    Ok(DecodedImage { bytes, extension })
}

/// Stores uploaded recipe images under the media root.
#[derive(Debug, Clone)]
pub struct ImageStore {
    root: PathBuf,
}

impl ImageStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Writes the image and returns its public path.
    pub async fn save(&self, image: &DecodedImage) -> Result<String, ApiError> {
        let directory = self.root.join(RECIPE_IMAGE_DIR);
        let file_name = format!("{}.{}", Uuid::new_v4(), image.extension);

        tokio::fs::create_dir_all(&directory)
            .await
            .map_err(|e| storage_error(&directory, e))?;

        let path = directory.join(&file_name);
        tokio::fs::write(&path, &image.bytes)
            .await
            .map_err(|e| storage_error(&path, e))?;

        info!("Stored image {}", path.display());
        Ok(format!("{MEDIA_URL}{RECIPE_IMAGE_DIR}/{file_name}"))
    }

    /// Deletes an image previously returned by `save`. Paths outside the
    /// image directory are ignored, as are files that are already gone.
    pub async fn remove(&self, url: &str) {
        let Some(file_name) = url
            .strip_prefix(MEDIA_URL)
            .and_then(|rest| rest.strip_prefix(RECIPE_IMAGE_DIR))
            .and_then(|rest| rest.strip_prefix('/'))
        else {
            return;
        };
        if file_name.is_empty() || file_name.contains(|c| c == '/' || c == '\\') || file_name.starts_with('.') {
            return;
        }

        let path = self.root.join(RECIPE_IMAGE_DIR).join(file_name);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => info!("Removed image {}", path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove {}: {e}", path.display()),
        }
    }
}

fn storage_error(path: &std::path::Path, e: std::io::Error) -> ApiError {
    error!("Failed to write {}: {e}", path.display());
    ApiError::Internal(String::from("Failed to store image"))
}
