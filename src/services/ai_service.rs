use crate::error::ClassifyError;
use crate::models::EncodedImage;

/// Trait for vision-capable completion backends (OpenRouter, test stubs, etc.)
#[async_trait::async_trait]
pub trait VisionModel: Send + Sync {
    /// Send one image with the classification prompt and return the raw
    /// completion text.
    async fn complete(&self, image: &EncodedImage) -> Result<String, ClassifyError>;
}
