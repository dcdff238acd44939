// src/suggestions.rs
use crate::enhancements::{Caption, ColorGrade, SceneMarker};
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SuggestionParseError {
    #[error("Empty input")]
    EmptyInput,
    #[error("No JSON found in response")]
    NoJsonFound,
    #[error("Failed to parse JSON: {0}")]
    JsonParseError(#[from] serde_json::Error),
}

/// Model output is often wrapped in prose or markdown fences. Cut out the
/// outermost JSON value (object or array) before parsing.
fn extract_json(raw: &str) -> Result<&str, SuggestionParseError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(SuggestionParseError::EmptyInput);
    }

    let object_start = trimmed.find('{');
    let array_start = trimmed.find('[');

    let (start, is_array) = match (object_start, array_start) {
        (Some(o), Some(a)) => {
            if a < o {
                (a, true)
            } else {
                (o, false)
            }
        }
        (None, Some(a)) => (a, true),
        (Some(o), None) => (o, false),
        (None, None) => return Err(SuggestionParseError::NoJsonFound),
    };
    let end = if is_array {
        trimmed.rfind(']')
    } else {
        trimmed.rfind('}')
    };
    let end = end.ok_or(SuggestionParseError::NoJsonFound)?;

    if start > end {
        return Err(SuggestionParseError::NoJsonFound);
    }
    Ok(&trimmed[start..=end])
}

fn parse_value(raw: &str) -> Result<Value, SuggestionParseError> {
    let json_str = extract_json(raw)?;
    Ok(serde_json::from_str(json_str)?)
}

// Accept either a bare array or an object wrapping one under `key`.
fn entries<'a>(value: &'a Value, key: &str) -> Vec<&'a Value> {
    match value {
        Value::Array(items) => items.iter().collect(),
        Value::Object(map) => map
            .get(key)
            .and_then(Value::as_array)
            .map(|items| items.iter().collect())
            .unwrap_or_default(),
        _ => vec![],
    }
}

fn field_f64(entry: &Value, key: &str, fallback: f64) -> f64 {
    entry.get(key).and_then(Value::as_f64).unwrap_or(fallback)
}

/// Parse a caption list. Every field is validated individually: an entry
/// without text is dropped, malformed timestamps fall back to zero-length
/// at the start position. These are advisory results; wrong types must
/// never leak into the state.
pub fn parse_caption_list(raw: &str) -> Result<Vec<Caption>, SuggestionParseError> {
    let value = parse_value(raw)?;
    let captions = entries(&value, "captions")
        .into_iter()
        .filter_map(|entry| {
            let text = entry.get("text").and_then(Value::as_str)?;
            let start = field_f64(entry, "start", 0.0).max(0.0);
            let end = field_f64(entry, "end", start).max(start);
            Some(Caption {
                text: text.to_string(),
                start,
                end,
            })
        })
        .collect();
    Ok(captions)
}

/// Parse a detected-scene list. A scene without a valid start is dropped;
/// a missing end collapses to the start; the label is optional.
pub fn parse_scene_list(raw: &str) -> Result<Vec<SceneMarker>, SuggestionParseError> {
    let value = parse_value(raw)?;
    let scenes = entries(&value, "scenes")
        .into_iter()
        .filter_map(|entry| {
            let start = entry.get("start").and_then(Value::as_f64)?;
            let start = start.max(0.0);
            let end = field_f64(entry, "end", start).max(start);
            let label = entry
                .get("label")
                .and_then(Value::as_str)
                .map(|s| s.to_string());
            Some(SceneMarker { start, end, label })
        })
        .collect();
    Ok(scenes)
}

/// Parse suggested grading parameters. Each field falls back to its neutral
/// default and is clamped to a sane range, so a half-garbled suggestion
/// still yields a safe grade.
pub fn parse_color_grade(raw: &str) -> Result<ColorGrade, SuggestionParseError> {
    let value = parse_value(raw)?;
    let entry = match &value {
        Value::Object(map) => map
            .get("color_grade")
            .filter(|v| v.is_object())
            .unwrap_or(&value),
        _ => return Err(SuggestionParseError::NoJsonFound),
    };

    let neutral = ColorGrade::default();
    Ok(ColorGrade {
        brightness: field_f64(entry, "brightness", neutral.brightness).clamp(-1.0, 1.0),
        contrast: field_f64(entry, "contrast", neutral.contrast).clamp(0.0, 2.0),
        saturation: field_f64(entry, "saturation", neutral.saturation).clamp(0.0, 2.0),
        temperature: field_f64(entry, "temperature", neutral.temperature).clamp(-1.0, 1.0),
        tint: field_f64(entry, "tint", neutral.tint).clamp(-1.0, 1.0),
    })
}
