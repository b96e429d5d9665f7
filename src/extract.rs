use serde::Deserialize;
use serde_json::Value;

use crate::error::{Result, TapeError};

/// First completion out of the upstream envelope. Absent `choices`,
/// `message`, or `content` all collapse into `EmptyCompletion` so the
/// caller can substitute its default.
pub fn completion_text(envelope: &Value) -> Result<String> {
    let content = envelope
        .get("choices")
        .and_then(|c| c.get(0))
        .and_then(|choice| choice.get("message"))
        .and_then(|message| message.get("content"))
        .and_then(|content| content.as_str())
        .unwrap_or("");

    if content.trim().is_empty() {
        return Err(TapeError::EmptyCompletion);
    }
    Ok(content.to_string())
}

/// Models often wrap machine-readable output in a markdown fence.
fn strip_fences(text: &str) -> String {
    text.replace("```json", "").replace("```", "").trim().to_string()
}

/// Variety list out of a completion. Any failure falls back to
/// `["Standard"]`; at most 5 entries survive.
pub fn parse_varieties(completion: &str) -> Vec<String> {
    let cleaned = strip_fences(completion);
    match serde_json::from_str::<Vec<String>>(&cleaned) {
        Ok(varieties) if !varieties.is_empty() => varieties.into_iter().take(5).collect(),
        _ => vec!["Standard".to_string()],
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeatherReading {
    pub temperature: String,
    pub humidity: String,
}

impl Default for WeatherReading {
    fn default() -> Self {
        WeatherReading {
            temperature: "15-25".to_string(),
            humidity: "60%".to_string(),
        }
    }
}

/// Weather JSON out of a completion, with each field individually
/// defaulted. Never fails.
pub fn parse_weather(completion: &str) -> WeatherReading {
    let cleaned = strip_fences(completion);
    let value: Value = match serde_json::from_str(&cleaned) {
        Ok(v) => v,
        Err(_) => return WeatherReading::default(),
    };
    let defaults = WeatherReading::default();
    WeatherReading {
        temperature: value
            .get("temperature")
            .and_then(|t| t.as_str())
            .filter(|t| !t.is_empty())
            .unwrap_or(&defaults.temperature)
            .to_string(),
        humidity: value
            .get("humidity")
            .and_then(|h| h.as_str())
            .filter(|h| !h.is_empty())
            .unwrap_or(&defaults.humidity)
            .to_string(),
    }
}

/// Chart-ready timeline the simulation prompt asks the model to embed
/// as a fenced JSON block.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct TimelineData {
    pub stages: Vec<String>,
    pub durations: Vec<f64>,
    #[serde(default)]
    pub milestones: Vec<String>,
}

impl Default for TimelineData {
    fn default() -> Self {
        TimelineData {
            stages: vec![
                "Seedling".to_string(),
                "Vegetative".to_string(),
                "Flowering".to_string(),
                "Mature".to_string(),
            ],
            durations: vec![2.0, 4.0, 3.0, 2.0],
            milestones: vec![
                "Germination".to_string(),
                "Leaf development".to_string(),
                "Bud formation".to_string(),
                "Full growth".to_string(),
            ],
        }
    }
}

/// Pulls the first ```json fenced block and parses it as timeline
/// data. Absent or unparsable blocks fall back to defaults.
pub fn timeline_block(completion: &str) -> TimelineData {
    let Some(start) = completion.find("```json") else {
        return TimelineData::default();
    };
    let body = &completion[start + "```json".len()..];
    let Some(end) = body.find("```") else {
        return TimelineData::default();
    };
    match serde_json::from_str::<TimelineData>(body[..end].trim()) {
        Ok(data) if !data.stages.is_empty() && data.stages.len() == data.durations.len() => {
            let mut data = data;
            if data.milestones.is_empty() {
                data.milestones = data
                    .stages
                    .iter()
                    .map(|s| format!("Reach {} stage", s))
                    .collect();
            }
            data
        }
        _ => TimelineData::default(),
    }
}
