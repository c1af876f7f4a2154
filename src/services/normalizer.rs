use serde::Deserialize;
use serde_json::Value;

use crate::models::{ClassificationResult, WasteCategory};

pub const DEFAULT_CONFIDENCE: f64 = 0.8;
pub const FALLBACK_CONFIDENCE: f64 = 0.75;
pub const FALLBACK_REASONING_CHARS: usize = 200;
pub const DEFAULT_REASONING: &str = "Classification based on visual analysis of the item.";

/// Which extraction step produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionTier {
    Strict,
    Embedded,
    KeywordFallback,
}

/// Loosely typed shape of what the model is asked to produce. Only
/// `category` must be a string; the others are validated afterwards.
#[derive(Debug, Deserialize)]
struct RawClassification {
    category: String,
    #[serde(default)]
    confidence: Option<Value>,
    #[serde(default)]
    reasoning: Option<Value>,
}

/// Turn raw completion text into a result, reporting which step produced
/// it. Never fails: unparseable text still yields a keyword-based guess.
pub fn normalize_with_tier(raw: &str) -> (ClassificationResult, ExtractionTier) {
    if let Some(parsed) = parse_object(raw.trim()) {
        return (finish(parsed), ExtractionTier::Strict);
    }

    if let Some(parsed) = extract_json(raw).and_then(parse_object) {
        return (finish(parsed), ExtractionTier::Embedded);
    }

    (keyword_fallback(raw), ExtractionTier::KeywordFallback)
}

/// Parse `text` as a JSON object with a string `category`. Arrays and
/// scalars never match, even though serde would map a sequence onto the
/// struct fields.
fn parse_object(text: &str) -> Option<RawClassification> {
    match serde_json::from_str::<Value>(text) {
        Ok(value @ Value::Object(_)) => serde_json::from_value(value).ok(),
        _ => None,
    }
}

/// First `{` through last `}`, if any.
fn extract_json(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if start < end {
        Some(&text[start..=end])
    } else {
        None
    }
}

fn keyword_fallback(raw: &str) -> ClassificationResult {
    let lower = raw.to_lowercase();
    let category = WasteCategory::ALL
        .into_iter()
        .find(|c| lower.contains(&c.label().to_lowercase()))
        .unwrap_or(WasteCategory::ALL[0]);

    ClassificationResult {
        category: category.label().to_string(),
        confidence: FALLBACK_CONFIDENCE,
        reasoning: raw.chars().take(FALLBACK_REASONING_CHARS).collect(),
    }
}

fn finish(parsed: RawClassification) -> ClassificationResult {
    let category = match WasteCategory::from_label(&parsed.category) {
        Some(c) => c.label().to_string(),
        None => {
            log::warn!("⚠️ Model returned unknown category '{}', passing it through", parsed.category);
            parsed.category
        }
    };

    ClassificationResult {
        category,
        confidence: clamp_confidence(parsed.confidence.as_ref()),
        reasoning: reasoning_or_default(parsed.reasoning),
    }
}

fn clamp_confidence(value: Option<&Value>) -> f64 {
    let number = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    match number {
        Some(n) if !n.is_nan() => n.clamp(0.0, 1.0),
        _ => DEFAULT_CONFIDENCE,
    }
}

fn reasoning_or_default(value: Option<Value>) -> String {
    match value {
        Some(Value::String(s)) if !s.trim().is_empty() => s,
        _ => DEFAULT_REASONING.to_string(),
    }
}
