use std::env;

pub const DEFAULT_MODEL: &str = "google/gemini-2.5-flash";
pub const DEFAULT_ENDPOINT: &str = "https://openrouter.ai/api/v1/chat/completions";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct Config {
    /// Bearer credential for the AI gateway. Absent means every
    /// classification fails with a configuration error.
    pub api_key: Option<String>,
    pub model: String,
    pub endpoint: String,
    pub bind_addr: String,
    pub max_image_bytes: usize,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup (the environment in production, a map in tests).
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup("OPENROUTER_API_KEY").filter(|k| !k.trim().is_empty());
        if api_key.is_none() {
            log::warn!("⚠️ OPENROUTER_API_KEY not set, every classification will fail until it is configured");
        }

        let max_image_bytes = match lookup("MAX_IMAGE_BYTES") {
            Some(raw) => raw.trim().parse::<usize>().unwrap_or_else(|_| {
                log::warn!("⚠️ Invalid MAX_IMAGE_BYTES '{}', using default {}", raw, DEFAULT_MAX_IMAGE_BYTES);
                DEFAULT_MAX_IMAGE_BYTES
            }),
            None => DEFAULT_MAX_IMAGE_BYTES,
        };

        Self {
            api_key,
            model: lookup("OPENROUTER_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            endpoint: lookup("OPENROUTER_URL").unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            bind_addr: lookup("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            max_image_bytes,
        }
    }
}
