use serde::{Deserialize, Serialize};

use super::ai_service::VisionModel;
use crate::config::Config;
use crate::error::ClassifyError;
use crate::models::{EncodedImage, WasteCategory};

pub const TEMPERATURE: f64 = 0.3;

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: MessageBody,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum MessageBody {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum ContentPart {
    Text {
        #[serde(rename = "type")]
        content_type: String,
        text: String,
    },
    ImageUrl {
        #[serde(rename = "type")]
        content_type: String,
        image_url: ImageData,
    },
}

#[derive(Debug, Serialize)]
struct ImageData {
    url: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f64,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    #[serde(default)]
    message: Option<MessageContent>,
}

#[derive(Debug, Deserialize)]
struct MessageContent {
    #[serde(default)]
    content: Option<String>,
}

fn system_prompt() -> String {
    format!(
        "You are a waste classification expert. Classify the item in the image into exactly one of \
         these categories: {}. Respond ONLY with a JSON object with the keys \"category\", \
         \"confidence\" (a number between 0 and 1) and \"reasoning\" (one short sentence). \
         Do not add any other text.",
        WasteCategory::label_list()
    )
}

fn user_prompt() -> String {
    format!(
        "Classify this waste item into one of these categories: {}. \
         Give your confidence level and a brief reasoning.",
        WasteCategory::label_list()
    )
}

/// OpenRouter-compatible chat completion client for image classification.
pub struct AiGatewayClient {
    api_key: Option<String>,
    model: String,
    endpoint: String,
    client: reqwest::Client,
}

impl AiGatewayClient {
    pub fn new(api_key: Option<String>, model: String, endpoint: String) -> Self {
        Self {
            api_key,
            model,
            endpoint,
            client: reqwest::Client::new(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.api_key.clone(),
            config.model.clone(),
            config.endpoint.clone(),
        )
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn build_request(&self, image: &EncodedImage) -> ChatRequest {
        let messages = vec![
            ChatMessage {
                role: "system".to_string(),
                content: MessageBody::Text(system_prompt()),
            },
            ChatMessage {
                role: "user".to_string(),
                content: MessageBody::Parts(vec![
                    ContentPart::Text {
                        content_type: "text".to_string(),
                        text: user_prompt(),
                    },
                    ContentPart::ImageUrl {
                        content_type: "image_url".to_string(),
                        image_url: ImageData {
                            url: image.data_url(),
                        },
                    },
                ]),
            },
        ];

        ChatRequest {
            model: self.model.clone(),
            messages,
            temperature: TEMPERATURE,
        }
    }
}

/// Map a non-success status; the body is only logged.
fn status_error(status: u16, body: &str) -> ClassifyError {
    log::error!("❌ AI gateway error ({}): {}", status, body);
    match status {
        429 => ClassifyError::Throttled,
        402 => ClassifyError::QuotaExceeded,
        other => ClassifyError::upstream(Some(other), format!("AI gateway returned status {}", other)),
    }
}

#[async_trait::async_trait]
impl VisionModel for AiGatewayClient {
    async fn complete(&self, image: &EncodedImage) -> Result<String, ClassifyError> {
        // Checked before anything goes over the network
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            ClassifyError::Configuration("OPENROUTER_API_KEY is not configured".to_string())
        })?;

        let request = self.build_request(image);

        log::info!("🤖 Sending request to AI gateway with model: {}", self.model);
        log::debug!("📤 Encoded image size: {} bytes", image.base64.len());

        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .header("HTTP-Referer", "https://github.com/waste-classifier")
            .header("X-Title", "Waste Classifier")
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                log::error!("❌ AI gateway request failed: {}", e);
                ClassifyError::upstream(None, "Failed to reach AI gateway")
            })?;

        let status = response.status();
        log::debug!("📥 AI gateway response status: {}", status);

        if !status.is_success() {
            // An unreadable body must not hide a 429 or 402
            let error_text = response.text().await.unwrap_or_default();
            return Err(status_error(status.as_u16(), &error_text));
        }

        let response_text = response.text().await.map_err(|e| {
            log::error!("❌ Failed to read AI gateway response: {}", e);
            ClassifyError::upstream(Some(status.as_u16()), "Failed to read AI gateway response")
        })?;

        let chat_response: ChatResponse = serde_json::from_str(&response_text).map_err(|e| {
            log::error!("❌ Unexpected AI gateway response ({}): {}", e, response_text);
            ClassifyError::upstream(Some(status.as_u16()), "Malformed AI gateway response")
        })?;

        let content = chat_response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| {
                log::error!("❌ AI gateway returned no content: {}", response_text);
                ClassifyError::EmptyResponse
            })?;

        log::info!("💬 AI response content: {}", content);
        Ok(content)
    }
}
