use std::sync::Arc;

use crate::error::ClassifyError;
use crate::models::{ClassificationResult, ImageUpload};
use crate::services::normalizer::{self, ExtractionTier};
use crate::services::VisionModel;

/// Runs one classification: encode the upload, ask the model once,
/// normalize whatever comes back. Holds no per-request state.
pub struct ClassificationHandler {
    model: Arc<dyn VisionModel>,
}

impl ClassificationHandler {
    pub fn new(model: Arc<dyn VisionModel>) -> Self {
        Self { model }
    }

    pub async fn classify(&self, upload: Option<ImageUpload>) -> Result<ClassificationResult, ClassifyError> {
        let upload = match upload {
            Some(upload) if !upload.is_empty() => upload,
            _ => {
                log::warn!("⚠️ Classification requested without an image");
                return Err(ClassifyError::MissingInput);
            }
        };

        log::info!(
            "📸 Classifying image: {} bytes, type={}, name={:?}",
            upload.len(),
            upload.mime_type,
            upload.file_name
        );

        if !upload.is_image() {
            log::warn!("⚠️ Declared type '{}' is not an image, forwarding anyway", upload.mime_type);
        }

        let image = upload.encode();
        let raw = self.model.complete(&image).await?;

        let (result, tier) = normalizer::normalize_with_tier(&raw);
        match tier {
            ExtractionTier::Strict => log::debug!("✅ Parsed model output as JSON"),
            ExtractionTier::Embedded => log::warn!("⚠️ Model output was not pure JSON, used embedded object"),
            ExtractionTier::KeywordFallback => log::warn!("⚠️ Could not parse model output, fell back to keyword match"),
        }

        log::info!(
            "♻️ Classified as {} (confidence {:.2})",
            result.category,
            result.confidence
        );

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EncodedImage;
    use std::sync::Mutex;

    /// Replays a canned answer and records what it was sent.
    struct StubModel {
        reply: fn() -> Result<String, ClassifyError>,
        seen: Mutex<Vec<EncodedImage>>,
    }

    impl StubModel {
        fn new(reply: fn() -> Result<String, ClassifyError>) -> Arc<Self> {
            Arc::new(Self {
                reply,
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait::async_trait]
    impl VisionModel for StubModel {
        async fn complete(&self, image: &EncodedImage) -> Result<String, ClassifyError> {
            self.seen.lock().unwrap().push(image.clone());
            (self.reply)()
        }
    }

    fn png(bytes: &[u8]) -> Option<ImageUpload> {
        Some(ImageUpload::new(bytes.to_vec(), Some("image/png"), Some("item.png")))
    }

    #[tokio::test]
    async fn test_classify_normalizes_model_output() {
        let stub = StubModel::new(|| {
            Ok(r#"{"category":"plastic","confidence":0.92,"reasoning":"bottle shape"}"#.to_string())
        });
        let handler = ClassificationHandler::new(stub.clone());

        let result = handler.classify(png(b"abc")).await.unwrap();

        assert_eq!(result.category, "Plastic");
        assert_eq!(result.confidence, 0.92);
        assert_eq!(result.reasoning, "bottle shape");

        let seen = stub.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].data_url(), "data:image/png;base64,YWJj");
    }

    #[tokio::test]
    async fn test_missing_image_is_rejected_without_model_call() {
        let stub = StubModel::new(|| Ok("Metal".to_string()));
        let handler = ClassificationHandler::new(stub.clone());

        let err = handler.classify(None).await.unwrap_err();
        assert!(matches!(err, ClassifyError::MissingInput));

        let err = handler.classify(png(b"")).await.unwrap_err();
        assert!(matches!(err, ClassifyError::MissingInput));

        assert!(stub.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_non_image_type_is_forwarded() {
        let stub = StubModel::new(|| Ok("looks like paper".to_string()));
        let handler = ClassificationHandler::new(stub.clone());

        let upload = ImageUpload::new(b"%PDF".to_vec(), Some("application/pdf"), None);
        let result = handler.classify(Some(upload)).await.unwrap();

        assert_eq!(result.category, "Paper");
        assert_eq!(stub.seen.lock().unwrap()[0].mime_type, "application/pdf");
    }

    #[tokio::test]
    async fn test_model_errors_propagate_unchanged() {
        let stub = StubModel::new(|| Err(ClassifyError::Throttled));
        let handler = ClassificationHandler::new(stub.clone());

        let err = handler.classify(png(b"abc")).await.unwrap_err();

        assert!(matches!(err, ClassifyError::Throttled));
        assert_eq!(stub.seen.lock().unwrap().len(), 1);
    }
}
