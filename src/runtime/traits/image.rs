// ABOUTME: Image operations trait for container runtimes.
// ABOUTME: List and remove locally stored images.

use super::shared_types::ImageSummary;
use async_trait::async_trait;

/// Image operations: list, remove.
#[async_trait]
pub trait ImageOps: Send + Sync {
    /// List images in local storage.
    async fn list_images(&self) -> Result<Vec<ImageSummary>, ImageError>;

    /// Remove an image by ID or reference.
    async fn remove_image(&self, reference: &str, force: bool) -> Result<(), ImageError>;
}

/// Errors from image operations.
#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("image not found: {0}")]
    NotFound(String),

    #[error("image in use, cannot remove: {0}")]
    InUse(String),

    #[error("runtime error: {0}")]
    Runtime(String),
}
