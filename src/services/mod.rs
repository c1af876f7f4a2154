pub mod ai_service;
pub mod gateway; // OpenRouter-compatible AI gateway
pub mod normalizer;

pub use ai_service::VisionModel;
pub use gateway::AiGatewayClient;
