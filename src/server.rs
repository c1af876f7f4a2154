use std::sync::Arc;

use axum::{
    extract::{multipart::MultipartRejection, DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};

use crate::error::ClassifyError;
use crate::handlers::ClassificationHandler;
use crate::models::{ClassificationResult, ImageUpload};

/// Multipart form field carrying the image file.
pub const IMAGE_FIELD: &str = "image";

/// Headroom on top of the image ceiling for boundaries and part headers.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub struct AppState {
    pub handler: Arc<ClassificationHandler>,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for ClassifyError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let body = if self.is_server_error() {
            ErrorBody {
                error: "Failed to classify image".to_string(),
                details: Some(self.to_string()),
            }
        } else {
            ErrorBody {
                error: self.to_string(),
                details: None,
            }
        };

        (status, Json(body)).into_response()
    }
}

pub fn create_router(handler: Arc<ClassificationHandler>, max_image_bytes: usize) -> Router {
    let state = Arc::new(AppState { handler });

    Router::new()
        .route("/", get(root_handler))
        .route("/classify", post(classify_handler))
        .route("/health", get(health_check))
        .layer(DefaultBodyLimit::max(max_image_bytes.saturating_add(MULTIPART_OVERHEAD)))
        .layer(cors_layer())
        .with_state(state)
}

/// Any origin, method and header. Preflight `OPTIONS` requests are answered
/// here with an empty body and never reach a handler.
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
}

async fn classify_handler(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ClassificationResult>, ClassifyError> {
    log::info!("🔔 Classification request received");

    let upload = match multipart {
        Ok(multipart) => read_image_field(multipart).await?,
        Err(rejection) => {
            log::warn!("⚠️ Request is not multipart form data: {}", rejection);
            None
        }
    };

    match state.handler.classify(upload).await {
        Ok(result) => Ok(Json(result)),
        Err(e) => {
            log::error!("❌ Classification failed: {}", e);
            Err(e)
        }
    }
}

/// Pull the first `image` part out of the form; other parts are skipped.
async fn read_image_field(mut multipart: Multipart) -> Result<Option<ImageUpload>, ClassifyError> {
    while let Some(field) = multipart.next_field().await.map_err(|e| {
        log::error!("❌ Failed to read multipart field: {}", e);
        ClassifyError::Internal(format!("Failed to read upload: {}", e))
    })? {
        if field.name() != Some(IMAGE_FIELD) {
            log::debug!("Skipping form field {:?}", field.name());
            continue;
        }

        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await.map_err(|e| {
            log::error!("❌ Failed to read image bytes: {}", e);
            ClassifyError::Internal(format!("Failed to read upload: {}", e))
        })?;

        return Ok(Some(ImageUpload::new(
            bytes.to_vec(),
            content_type.as_deref(),
            file_name.as_deref(),
        )));
    }

    Ok(None)
}

async fn root_handler() -> &'static str {
    "Waste Classifier - POST an image to /classify as multipart field 'image'"
}

async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EncodedImage;
    use crate::services::VisionModel;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Method, Request};
    use tower::ServiceExt;

    const BOUNDARY: &str = "X-TEST-BOUNDARY";

    struct FixedModel(fn() -> Result<String, ClassifyError>);

    #[async_trait::async_trait]
    impl VisionModel for FixedModel {
        async fn complete(&self, _image: &EncodedImage) -> Result<String, ClassifyError> {
            (self.0)()
        }
    }

    fn app(reply: fn() -> Result<String, ClassifyError>) -> Router {
        let handler = Arc::new(ClassificationHandler::new(Arc::new(FixedModel(reply))));
        create_router(handler, 1024 * 1024)
    }

    fn multipart_request(field: &str, content: &[u8]) -> Request<Body> {
        let mut body = Vec::new();
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"item.jpg\"\r\n",
                field
            )
            .as_bytes(),
        );
        body.extend_from_slice(b"Content-Type: image/jpeg\r\n\r\n");
        body.extend_from_slice(content);
        body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());

        Request::builder()
            .method(Method::POST)
            .uri("/classify")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .header(header::ORIGIN, "https://ui.example.com")
            .body(Body::from(body))
            .unwrap()
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn assert_cors(response: &Response) {
        assert_eq!(
            response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "*"
        );
    }

    #[tokio::test]
    async fn test_classify_success() {
        let app = app(|| {
            Ok(r#"Sure! {"category":"glass","confidence":1.4,"reasoning":"clear bottle"}"#.to_string())
        });

        let response = app.oneshot(multipart_request("image", b"jpeg-bytes")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_cors(&response);

        let body = json_body(response).await;
        assert_eq!(body["category"], "Glass");
        assert_eq!(body["confidence"], 1.0);
        assert_eq!(body["reasoning"], "clear bottle");
    }

    #[tokio::test]
    async fn test_missing_image_field_is_bad_request() {
        let app = app(|| Ok("Metal".to_string()));

        let response = app.oneshot(multipart_request("file", b"jpeg-bytes")).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_cors(&response);
        assert_eq!(json_body(response).await, serde_json::json!({ "error": "No image provided" }));
    }

    #[tokio::test]
    async fn test_non_multipart_body_is_bad_request() {
        let app = app(|| Ok("Metal".to_string()));

        let request = Request::builder()
            .method(Method::POST)
            .uri("/classify")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{}"))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_rate_limit_is_429() {
        let app = app(|| Err(ClassifyError::Throttled));

        let response = app.oneshot(multipart_request("image", b"jpeg-bytes")).await.unwrap();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        let body = json_body(response).await;
        assert!(body["error"].as_str().unwrap().starts_with("Rate limit exceeded"));
        assert!(body.get("details").is_none());
    }

    #[tokio::test]
    async fn test_quota_exhausted_is_402() {
        let app = app(|| Err(ClassifyError::QuotaExceeded));

        let response = app.oneshot(multipart_request("image", b"jpeg-bytes")).await.unwrap();

        assert_eq!(response.status(), StatusCode::PAYMENT_REQUIRED);
        let body = json_body(response).await;
        assert!(body["error"].as_str().unwrap().starts_with("AI credits exhausted"));
    }

    #[tokio::test]
    async fn test_configuration_error_is_500_with_details() {
        let app = app(|| {
            Err(ClassifyError::Configuration(
                "OPENROUTER_API_KEY is not configured".to_string(),
            ))
        });

        let response = app.oneshot(multipart_request("image", b"jpeg-bytes")).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_cors(&response);
        let body = json_body(response).await;
        assert!(body["error"].is_string());
        assert!(body["details"].as_str().unwrap().contains("OPENROUTER_API_KEY"));
    }

    #[tokio::test]
    async fn test_preflight_gets_cors_headers_and_empty_body() {
        let app = app(|| panic!("preflight must not reach the model"));

        let request = Request::builder()
            .method(Method::OPTIONS)
            .uri("/classify")
            .header(header::ORIGIN, "https://ui.example.com")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "authorization, content-type")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_cors(&response);
        assert!(response
            .headers()
            .contains_key(header::ACCESS_CONTROL_ALLOW_METHODS));

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(bytes.is_empty());
    }

    #[tokio::test]
    async fn test_health() {
        let app = app(|| Ok(String::new()));

        let request = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }
}
