use base64::{engine::general_purpose, Engine};
use serde::Serialize;

/// Waste classes the model may answer with. Order matters: the keyword
/// fallback scans in this order and defaults to the first entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WasteCategory {
    Plastic,
    Paper,
    Glass,
    Metal,
    Organic,
}

impl WasteCategory {
    pub const ALL: [WasteCategory; 5] = [
        WasteCategory::Plastic,
        WasteCategory::Paper,
        WasteCategory::Glass,
        WasteCategory::Metal,
        WasteCategory::Organic,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            WasteCategory::Plastic => "Plastic",
            WasteCategory::Paper => "Paper",
            WasteCategory::Glass => "Glass",
            WasteCategory::Metal => "Metal",
            WasteCategory::Organic => "Organic",
        }
    }

    /// Case-insensitive lookup against the canonical labels
    pub fn from_label(s: &str) -> Option<Self> {
        let needle = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|c| c.label().to_lowercase() == needle)
    }

    /// "Plastic, Paper, Glass, Metal, Organic" for prompts
    pub fn label_list() -> String {
        Self::ALL
            .iter()
            .map(|c| c.label())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Outcome returned to the caller. `category` stays a string because an
/// unrecognised label from the model is passed through as-is.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationResult {
    pub category: String,
    pub confidence: f64,
    pub reasoning: String,
}

/// Image as received from the caller, before encoding.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub bytes: Vec<u8>,
    pub mime_type: String,
    pub file_name: Option<String>,
}

impl ImageUpload {
    pub fn new(bytes: Vec<u8>, mime_type: Option<&str>, file_name: Option<&str>) -> Self {
        let mime_type = match mime_type {
            Some(m) if !m.trim().is_empty() => m.trim().to_string(),
            _ => guess_mime_type(file_name.unwrap_or_default()).to_string(),
        };

        Self {
            bytes,
            mime_type,
            file_name: file_name.map(str::to_string),
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }

    pub fn encode(&self) -> EncodedImage {
        EncodedImage {
            mime_type: self.mime_type.clone(),
            base64: general_purpose::STANDARD.encode(&self.bytes),
        }
    }
}

/// Inline, self-describing form of an image ready for a completion request.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedImage {
    pub mime_type: String,
    pub base64: String,
}

impl EncodedImage {
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.base64)
    }
}

fn guess_mime_type(file_name: &str) -> &'static str {
    let lower = file_name.to_lowercase();
    if lower.ends_with(".png") {
        "image/png"
    } else if lower.ends_with(".webp") {
        "image/webp"
    } else if lower.ends_with(".gif") {
        "image/gif"
    } else if lower.ends_with(".heic") {
        "image/heic"
    } else if lower.ends_with(".bmp") {
        "image/bmp"
    } else {
        "image/jpeg" // jpg, jpeg and anything unknown
    }
}
